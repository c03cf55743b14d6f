use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::*;
use crate::protocol::Status;

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<(TabId, Request)>>,
    fail: AtomicBool,
}

impl Recorder {
    fn calls(&self) -> usize {
        self.calls.lock().len()
    }
}

impl TabMessenger for Recorder {
    fn send(
        &self,
        tab: TabId,
        request: Request,
    ) -> impl Future<Output = Result<Response, DeliveryError>> + Send {
        self.calls.lock().push((tab, request));
        let fail = self.fail.load(Ordering::SeqCst);
        async move {
            if fail {
                Err(DeliveryError::NoReceiver(tab))
            } else {
                Ok(Response::status(Status::Processed))
            }
        }
    }
}

fn check(url: &str) -> Request {
    Request::CheckForJson { url: Some(url.into()), content_type: None, force: false }
}

fn dispatcher() -> (Arc<Recorder>, Dispatcher<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let dispatcher = Dispatcher::new(recorder.clone(), ObserverConfig::default());
    (recorder, dispatcher)
}

const URL: &str = "https://x/api/items";

#[tokio::test(start_paused = true)]
async fn one_delivery_per_tab_and_url() {
    let (recorder, d) = dispatcher();

    let handle = d.try_dispatch(7, check(URL), URL).unwrap();
    assert_eq!(d.try_dispatch(7, check(URL), URL).unwrap_err(), Rejected::InFlight);

    let outcome = handle.await.unwrap();
    assert_eq!(outcome, Delivery::Delivered(Response::status(Status::Processed)));
    assert_eq!(d.state().lock().detected_len(), 1);
    assert_eq!(d.state().lock().in_flight_len(), 0);

    assert_eq!(d.try_dispatch(7, check(URL), URL).unwrap_err(), Rejected::AlreadyDetected);
    assert_eq!(recorder.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn delivery_waits_for_the_dispatch_delay() {
    let (recorder, d) = dispatcher();
    let handle = d.try_dispatch(1, check(URL), URL).unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(recorder.calls(), 0);

    handle.await.unwrap();
    assert_eq!(recorder.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn detection_expires_after_ttl() {
    let (recorder, d) = dispatcher();
    d.try_dispatch(1, check(URL), URL).unwrap().await.unwrap();

    tokio::time::advance(Duration::from_secs(31)).await;
    d.try_dispatch(1, check(URL), URL).unwrap().await.unwrap();
    assert_eq!(recorder.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn different_urls_and_tabs_are_independent() {
    let (recorder, d) = dispatcher();
    let a = d.try_dispatch(1, check(URL), URL).unwrap();
    let b = d.try_dispatch(1, check("https://x/other.json"), "https://x/other.json").unwrap();
    let c = d.try_dispatch(2, check(URL), URL).unwrap();
    for h in [a, b, c] {
        h.await.unwrap();
    }
    assert_eq!(recorder.calls(), 3);
    assert_eq!(d.state().lock().detected_len(), 3);
}

#[tokio::test(start_paused = true)]
async fn failure_starts_a_cooldown() {
    let (recorder, d) = dispatcher();
    recorder.fail.store(true, Ordering::SeqCst);

    let outcome = d.try_dispatch(3, check(URL), URL).unwrap().await.unwrap();
    assert_eq!(outcome, Delivery::Failed(DeliveryError::NoReceiver(3)));
    assert_eq!(d.state().lock().detected_len(), 0);
    assert_eq!(d.state().lock().failures_len(), 1);

    // any URL in that tab waits out the cooldown
    let other = "https://x/b.json";
    assert_eq!(d.try_dispatch(3, check(other), other).unwrap_err(), Rejected::CoolingDown);

    recorder.fail.store(false, Ordering::SeqCst);
    tokio::time::advance(Duration::from_secs(5)).await;
    let outcome = d.try_dispatch(3, check(URL), URL).unwrap().await.unwrap();
    assert!(matches!(outcome, Delivery::Delivered(_)));
    assert_eq!(recorder.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn events_without_a_tab_are_rejected() {
    let (recorder, d) = dispatcher();
    assert_eq!(d.try_dispatch(NO_TAB, check(URL), URL).unwrap_err(), Rejected::NoTab);
    assert_eq!(recorder.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn closing_a_tab_mid_flight_records_nothing() {
    let (recorder, d) = dispatcher();
    let handle = d.try_dispatch(4, check(URL), URL).unwrap();
    d.forget_tab(4);

    // a new dispatch is allowed straight away; the old one still runs
    let again = d.try_dispatch(4, check(URL), URL).unwrap();
    d.forget_tab(4);

    handle.await.unwrap();
    again.await.unwrap();
    assert_eq!(recorder.calls(), 2);
    let state = d.state().lock();
    assert_eq!(state.detected_len(), 0);
    assert_eq!(state.in_flight_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn forget_tab_clears_detection_and_cooldown() {
    let (recorder, d) = dispatcher();
    d.try_dispatch(5, check(URL), URL).unwrap().await.unwrap();
    recorder.fail.store(true, Ordering::SeqCst);
    let other = "https://x/c.json";
    d.try_dispatch(5, check(other), other).unwrap().await.unwrap();

    d.forget_tab(5);
    assert_eq!(d.state().lock().detected_len(), 0);
    assert_eq!(d.state().lock().failures_len(), 0);
    assert!(d.try_dispatch(5, check(URL), URL).is_ok());
}

#[tokio::test(start_paused = true)]
async fn stale_task_leaves_newer_dispatch_pending() {
    let (recorder, d) = dispatcher();
    let stale = d.try_dispatch(7, check(URL), URL).unwrap();
    d.forget_tab(7);

    tokio::time::advance(Duration::from_millis(300)).await;
    let fresh = d.try_dispatch(7, check(URL), URL).unwrap();

    // the first task ends while the second is still waiting out its delay
    stale.await.unwrap();
    assert_eq!(recorder.calls(), 1);
    assert_eq!(d.state().lock().in_flight_len(), 1);
    assert_eq!(d.state().lock().detected_len(), 0);
    assert_eq!(d.try_dispatch(7, check(URL), URL).unwrap_err(), Rejected::InFlight);

    fresh.await.unwrap();
    assert_eq!(recorder.calls(), 2);
    assert_eq!(d.state().lock().in_flight_len(), 0);
    assert_eq!(d.try_dispatch(7, check(URL), URL).unwrap_err(), Rejected::AlreadyDetected);
}
