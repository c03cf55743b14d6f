//! Observer and renderer wired together through the channel messenger.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use json_handle_lib::observer::{Delivery, Header, ResponseInfo};
use json_handle_lib::protocol::Response;
use json_handle_lib::{
    serve_renderer, NullSink, Observer, ObserverConfig, PageContent, Recovery, Renderer, Settings,
    Status, TabId, TabRegistry,
};

struct Harness {
    registry: Arc<TabRegistry>,
    observer: Observer<TabRegistry>,
}

impl Harness {
    fn new() -> Self {
        let registry = Arc::new(TabRegistry::new(Duration::from_secs(3)));
        let observer = Observer::new(registry.clone(), ObserverConfig::default());
        Self { registry, observer }
    }

    fn open(&self, tab: TabId, renderer: Renderer) -> Arc<Mutex<Renderer>> {
        let renderer = Arc::new(Mutex::new(renderer));
        tokio::spawn(serve_renderer(renderer.clone(), self.registry.connect(tab)));
        renderer
    }
}

fn json_response(tab: TabId, url: &str) -> ResponseInfo {
    ResponseInfo {
        url: url.into(),
        response_headers: vec![Header::new("Content-Type", "application/json")],
        tab_id: tab,
    }
}

#[tokio::test(start_paused = true)]
async fn json_response_is_detected_rendered_and_searchable() {
    let h = Harness::new();
    let url = "https://api.example.com/items";
    let renderer = h.open(1, Renderer::new(PageContent::raw(url, r#"{"a":1,"b":[1,2,3]}"#), NullSink));

    let delivery = h.observer.on_response(&json_response(1, url)).unwrap().await.unwrap();
    assert_eq!(delivery, Delivery::Delivered(Response::status(Status::Processed)));

    let mut r = renderer.lock();
    assert_eq!(r.recovery(), Some(Recovery::Direct));
    assert_eq!(r.view().top_level_rows().len(), 2);
    assert_eq!(r.search_now("b"), 1);
    let hit = r.search().current().unwrap();
    assert_eq!(r.view().row(hit).unwrap().key.as_deref(), Some("b"));
}

#[tokio::test(start_paused = true)]
async fn repeated_responses_dispatch_once() {
    let h = Harness::new();
    let url = "https://api.example.com/items";
    h.open(1, Renderer::new(PageContent::raw(url, "[1]"), NullSink));

    let first = h.observer.on_response(&json_response(1, url)).unwrap();
    // still waiting out the dispatch delay
    assert!(h.observer.on_response(&json_response(1, url)).is_none());
    assert!(matches!(first.await.unwrap(), Delivery::Delivered(_)));
    // delivered and recorded
    assert!(h.observer.on_response(&json_response(1, url)).is_none());

    tokio::time::advance(Duration::from_secs(31)).await;
    let again = h.observer.on_response(&json_response(1, url)).unwrap().await.unwrap();
    // the renderer already processed the page
    assert_eq!(again, Delivery::Delivered(Response::status(Status::Skipped)));
}

#[tokio::test(start_paused = true)]
async fn page_without_renderer_cools_down_then_recovers() {
    let h = Harness::new();
    let url = "https://x/data.json";

    let failed = h.observer.on_response(&json_response(2, url)).unwrap().await.unwrap();
    assert!(matches!(failed, Delivery::Failed(_)));
    assert!(h.observer.on_response(&json_response(2, url)).is_none());

    h.open(2, Renderer::new(PageContent::raw(url, r#"{"ok":true}"#), NullSink));
    tokio::time::advance(Duration::from_secs(5)).await;
    let delivered = h.observer.on_response(&json_response(2, url)).unwrap().await.unwrap();
    assert_eq!(delivered, Delivery::Delivered(Response::status(Status::Processed)));
}

#[test]
fn collapsed_content_is_searchable() {
    let body = r#"{"meta":{"n":1},"rows":[{"id":1},{"id":2},{"id":3,"tag":"rare"}]}"#;
    let mut r = Renderer::new(PageContent::raw("https://x/a.json", body), NullSink)
        .with_settings(Settings { collapse_threshold: 2, ..Settings::default() });
    assert_eq!(r.check_for_json(false), Status::Processed);

    let rows = r.view().rows().iter().find(|row| row.key.as_deref() == Some("rows")).unwrap().id;
    let rows_block = r.view().ancestors(rows + 1)[0];
    assert!(r.view().block(rows_block).unwrap().collapsed);

    assert_eq!(r.search_now("rare"), 1);
    let hit = r.search().current().unwrap();
    assert!(r.view().is_visible(hit));
    assert!(!r.view().block(rows_block).unwrap().collapsed);
    assert_eq!(r.view().row(hit).unwrap().display_path, "root.rows[2].tag");
}

#[test]
fn commented_response_is_trimmed() {
    let mut r = Renderer::new(
        PageContent::raw("https://x/a", r#"<!--prefix-->{"x":1}<!--suffix-->"#),
        NullSink,
    );
    assert_eq!(r.check_for_json(false), Status::Processed);
    assert_eq!(r.recovery(), Some(Recovery::Trimmed));
    assert_eq!(r.json_data(), Some(serde_json::json!({"x": 1})));

    assert_eq!(r.check_for_json(false), Status::Skipped);
    assert_eq!(r.check_for_json(true), Status::Processed);
}
