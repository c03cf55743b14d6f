use std::time::Duration;

use super::*;
use crate::messenger::TabRegistry;

fn observer() -> (Arc<TabRegistry>, Observer<TabRegistry>) {
    let registry = Arc::new(TabRegistry::new(Duration::from_secs(1)));
    (registry.clone(), Observer::new(registry, ObserverConfig::default()))
}

fn update(tab: TabId, url: &str, status: &str) -> TabUpdate {
    TabUpdate { tab_id: tab, url: url.into(), status: status.into() }
}

#[tokio::test(start_paused = true)]
async fn non_json_response_is_ignored() {
    let (_, obs) = observer();
    let html = ResponseInfo {
        url: "https://x/index.html".into(),
        response_headers: vec![Header::new("Content-Type", "text/html")],
        tab_id: 1,
    };
    assert!(obs.on_response(&html).is_none());
}

#[tokio::test(start_paused = true)]
async fn response_forwards_url_and_content_type() {
    let (registry, obs) = observer();
    let mut inbox = registry.connect(1);
    let response = ResponseInfo {
        url: "https://x/data".into(),
        response_headers: vec![Header::new("Content-Type", "application/json")],
        tab_id: 1,
    };
    let handle = obs.on_response(&response).unwrap();

    let envelope = inbox.recv().await.unwrap();
    assert_eq!(
        envelope.request,
        Request::CheckForJson {
            url: Some("https://x/data".into()),
            content_type: Some("application/json".into()),
            force: false,
        }
    );
    envelope.reply.send(crate::protocol::Response::status(crate::protocol::Status::Processed)).unwrap();
    assert!(matches!(handle.await.unwrap(), Delivery::Delivered(_)));
}

#[tokio::test(start_paused = true)]
async fn tab_update_needs_completion_and_json_url() {
    let (_, obs) = observer();
    assert!(obs.on_tab_updated(&update(1, "https://x/a.json", "loading")).is_none());
    assert!(obs.on_tab_updated(&update(1, "https://x/about", "complete")).is_none());

    // nothing listens on tab 1, so the delivery fails and the tab cools down
    let outcome = obs.on_tab_updated(&update(1, "https://x/a.json", "complete")).unwrap();
    assert_eq!(outcome.await.unwrap(), Delivery::Failed(crate::error::DeliveryError::NoReceiver(1)));
    assert!(obs.on_tab_activated(&update(1, "https://x/a.json", "complete")).is_none());

    obs.on_tab_removed(1);
    assert!(obs.on_tab_activated(&update(1, "https://x/a.json", "complete")).is_some());
}
