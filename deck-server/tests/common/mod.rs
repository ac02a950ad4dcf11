//! Shared helpers for deck-server integration tests.

pub mod server;

pub use server::TestServer;
