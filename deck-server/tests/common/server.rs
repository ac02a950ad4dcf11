//! Test server harness for integration tests.
//!
//! Spins up the real view router on a random port with an in-memory store
//! and a short autosave quiet period.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use deck_core::{StyleResolver, TemplateRegistry, ThemeRegistry, DEFAULT_THEME_ID};
use deck_protocol::{AutosaveConfig, MemoryStore};
use deck_server::AppState;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Autosave quiet period used by the test server.
pub const TEST_QUIET_PERIOD: Duration = Duration::from_millis(100);

/// A test server instance with control handles.
pub struct TestServer {
    addr: SocketAddr,
    store: Arc<MemoryStore>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server on a random available port.
    ///
    /// # Panics
    ///
    /// Panics if no port is available or server fails to bind.
    pub async fn start() -> Self {
        let port = portpicker::pick_unused_port().expect("no available port");
        let addr = SocketAddr::from(([127, 0, 0, 1], port));

        let store = Arc::new(MemoryStore::new());
        let resolver = StyleResolver::new(
            Arc::new(TemplateRegistry::builtin()),
            Arc::new(ThemeRegistry::builtin()),
        );
        let state = AppState::new(
            resolver,
            Arc::clone(&store) as Arc<dyn deck_protocol::SnapshotStore>,
            AutosaveConfig {
                quiet_period: TEST_QUIET_PERIOD,
            },
            DEFAULT_THEME_ID,
        );
        let app = deck_server::routes(state);

        let listener = TcpListener::bind(addr).await.expect("failed to bind");
        let actual_addr = listener.local_addr().expect("failed to get local addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("server error");
        });

        tokio::time::sleep(Duration::from_millis(10)).await;

        Self {
            addr: actual_addr,
            store,
            shutdown_tx: Some(shutdown_tx),
            handle,
        }
    }

    /// WebSocket URL for a view of `presentation` with `slides` slides.
    pub fn view_url(&self, presentation: &str, slides: usize) -> String {
        format!(
            "ws://{}/ws?presentation={presentation}&slides={slides}",
            self.addr
        )
    }

    /// HTTP URL for a path.
    #[allow(dead_code)]
    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Server address.
    #[allow(dead_code)]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Snapshot store backing every view.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Gracefully shut down the server.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = tokio::time::timeout(Duration::from_secs(5), self.handle).await;
    }
}
