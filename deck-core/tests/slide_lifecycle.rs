//! Slide lifecycle tests across registry, snapshot and restoration.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use deck_core::{
    ContentKind, ElementContent, ElementId, ElementRegistry, ElementType, IdSource, NewElement,
    ObjectFit, Position, RestorationLoader, ResolvedSlot, SlideSnapshot, StyleResolver,
    TemplateRegistry, TemplateRenderer, ThemeOverrides, ThemeRegistry,
};

fn at(row: &str, column: &str) -> NewElement {
    NewElement {
        position: Some(Position::parse(row, column).expect("position")),
        ..NewElement::default()
    }
}

#[test]
fn restoration_round_trip_keeps_ids_positions_and_payloads() {
    let ids = IdSource::new();
    let mut registry = ElementRegistry::new(1, "V1-image-text", ids.clone());

    // Inserted out of type order on purpose.
    let chart = registry
        .insert(
            ElementContent::chart_config(serde_json::json!({"type": "bar", "data": [1, 2, 3]})),
            at("4/16", "3/31"),
        )
        .expect("chart");
    let first_image = registry
        .insert(
            ElementContent::Image {
                url: "https://cdn.example.com/a.png".to_string(),
                alt: "First".to_string(),
                object_fit: ObjectFit::Contain,
            },
            at("4/17", "3/17"),
        )
        .expect("image");
    let text = registry
        .insert(
            ElementContent::text("<p>Notes</p>", ContentKind::Html),
            at("17/18", "3/31"),
        )
        .expect("text");
    let second_image = registry
        .insert(ElementContent::image("https://cdn.example.com/b.png"), at("1/3", "1/3"))
        .expect("image");

    let json = SlideSnapshot::capture(&registry).to_json().expect("serialize");
    let snapshot = SlideSnapshot::from_json(&json).expect("deserialize");

    let mut restored = ElementRegistry::new(0, "C1-text", ids);
    let report = RestorationLoader::load(&mut restored, 1, snapshot);
    assert!(report.is_clean());
    assert_eq!(report.restored, 4);

    let order: Vec<_> = restored.list().iter().map(|e| e.id.clone()).collect();
    assert_eq!(
        order,
        vec![
            text.id.clone(),
            first_image.id.clone(),
            second_image.id.clone(),
            chart.id.clone()
        ]
    );
    for original in [&chart, &first_image, &text, &second_image] {
        let back = restored.get(&original.id).expect("restored element");
        assert_eq!(back, original);
    }
    assert_eq!(restored.layout(), "V1-image-text");
}

#[test]
fn ids_stay_monotonic_after_restore() {
    let ids = IdSource::new();
    let mut registry = ElementRegistry::new(0, "C1-text", ids.clone());
    let mut snapshot = SlideSnapshot::empty("C1-text");
    snapshot.diagrams.push(deck_core::Element::new(
        ElementId::from_raw("diagram-41"),
        ElementContent::diagram_svg("<svg/>"),
        ElementType::Diagram.default_position(),
    ).into());
    RestorationLoader::load(&mut registry, 0, snapshot);

    let next = registry
        .insert(ElementContent::infographic("<svg/>"), NewElement::default())
        .expect("insert");
    assert_eq!(next.id.as_str(), "infographic-42");
    assert_eq!(ids.peek(), 43);
}

#[test]
fn insert_delete_insert_yields_distinct_ids() {
    let mut registry = ElementRegistry::new(0, "C1-text", IdSource::new());
    let a = registry
        .insert(ElementContent::image("a"), NewElement::default())
        .expect("a")
        .id;
    let b = registry
        .insert(ElementContent::image("b"), NewElement::default())
        .expect("b")
        .id;
    let c = registry
        .insert(ElementContent::image("c"), NewElement::default())
        .expect("c")
        .id;
    registry.delete(&b);
    let d = registry
        .insert(ElementContent::image("d"), NewElement::default())
        .expect("d")
        .id;

    assert_ne!(d, a);
    assert_ne!(d, b);
    assert_ne!(d, c);
    assert_eq!(registry.len(), 3);
}

struct DivRenderer;

impl TemplateRenderer for DivRenderer {
    fn template_id(&self) -> &str {
        "C1-text"
    }

    fn render(&self, slots: &[ResolvedSlot], content: &serde_json::Value) -> String {
        let mut html = String::new();
        for slot in slots {
            let style: String = slot
                .style
                .properties
                .iter()
                .map(|(k, v)| format!("{k}:{v};"))
                .collect();
            let text = content
                .get(&slot.name)
                .and_then(serde_json::Value::as_str)
                .or(slot.default_content.as_deref())
                .unwrap_or_default();
            let _ = write!(
                html,
                r#"<div data-slot="{}" style="grid-row:{};grid-column:{};{style}">{text}</div>"#,
                slot.name, slot.position.grid_row, slot.position.grid_column
            );
        }
        html
    }
}

#[test]
fn renderer_consumes_resolved_slots() {
    let resolver = StyleResolver::new(
        Arc::new(TemplateRegistry::builtin()),
        Arc::new(ThemeRegistry::builtin()),
    );
    let renderer = DivRenderer;
    let slots = resolver.resolve_template(
        renderer.template_id(),
        "corporate-blue",
        &ThemeOverrides::default(),
        &BTreeMap::new(),
    );
    let content = serde_json::json!({"title": "Quarterly review"});

    let html = renderer.render(&slots, &content);
    assert_eq!(html, renderer.render(&slots, &content));
    assert!(html.contains(r#"data-slot="title" style="grid-row:2/4;grid-column:3/31;"#));
    assert!(html.contains(">Quarterly review</div>"));
    assert!(html.contains("color:#1E3A8A;"));
}
