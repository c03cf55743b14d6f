use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::ObserverConfig;
use crate::error::DeliveryError;
use crate::messenger::{TabId, TabMessenger, NO_TAB};
use crate::observer::cache::TimedCache;
use crate::protocol::{Request, Response};

type DetectionKey = (TabId, String);

/// Why a dispatch was not scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    /// The event does not belong to a real tab.
    NoTab,
    /// This tab and URL were delivered to within the TTL.
    AlreadyDetected,
    /// A delivery for this tab and URL is already scheduled.
    InFlight,
    /// The tab recently failed a delivery.
    CoolingDown,
}

/// Outcome of one scheduled delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Delivered(Response),
    Failed(DeliveryError),
}

/// Per-observer bookkeeping: what was delivered, what is pending, what failed.
#[derive(Debug)]
pub struct DispatchState {
    detected: TimedCache<DetectionKey>,
    failures: TimedCache<TabId>,
    /// Pending deliveries, each tagged with the sequence number of its dispatch.
    in_flight: HashMap<DetectionKey, u64>,
    next_seq: u64,
}

impl DispatchState {
    pub fn new(config: &ObserverConfig) -> Self {
        Self {
            detected: TimedCache::new(config.detection_ttl, config.detection_capacity),
            failures: TimedCache::new(config.failure_cooldown, config.detection_capacity),
            in_flight: HashMap::new(),
            next_seq: 0,
        }
    }

    pub fn detected_len(&self) -> usize {
        self.detected.len()
    }

    pub fn failures_len(&self) -> usize {
        self.failures.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    fn forget_tab(&mut self, tab: TabId) {
        self.detected.retain(|(t, _)| *t != tab);
        self.in_flight.retain(|(t, _), _| *t != tab);
        self.failures.remove(&tab);
    }
}

/// Schedules delayed `checkForJSON` deliveries with dedup and failure cooldown.
///
/// At most one delivery per (tab, URL) is pending at a time: the key goes into
/// the in-flight map when scheduled, and only the attempt that put it there
/// removes it.
/// A failed attempt is never retried by a timer; the next qualifying browser
/// event after the cooldown is what triggers another try.
pub struct Dispatcher<M> {
    messenger: Arc<M>,
    config: ObserverConfig,
    state: Arc<Mutex<DispatchState>>,
}

impl<M: TabMessenger> Dispatcher<M> {
    pub fn new(messenger: Arc<M>, config: ObserverConfig) -> Self {
        let state = Arc::new(Mutex::new(DispatchState::new(&config)));
        Self { messenger, config, state }
    }

    pub fn state(&self) -> &Arc<Mutex<DispatchState>> {
        &self.state
    }

    /// Schedule delivery of `payload` to `tab`, keyed by `identity_url`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn try_dispatch(
        &self,
        tab: TabId,
        payload: Request,
        identity_url: &str,
    ) -> Result<JoinHandle<Delivery>, Rejected> {
        if tab == NO_TAB || tab < 0 {
            return Err(Rejected::NoTab);
        }
        let key: DetectionKey = (tab, identity_url.to_string());
        let now = Instant::now();
        let seq = {
            let mut state = self.state.lock();
            if state.in_flight.contains_key(&key) {
                debug!(tab, url = identity_url, "delivery already pending");
                return Err(Rejected::InFlight);
            }
            if state.detected.is_fresh(&key, now) {
                debug!(tab, url = identity_url, "already delivered recently");
                return Err(Rejected::AlreadyDetected);
            }
            if state.failures.is_fresh(&tab, now) {
                debug!(tab, "tab is cooling down after a failed delivery");
                return Err(Rejected::CoolingDown);
            }
            state.next_seq += 1;
            let seq = state.next_seq;
            state.in_flight.insert(key.clone(), seq);
            seq
        };

        let messenger = self.messenger.clone();
        let state = self.state.clone();
        let delay = self.config.dispatch_delay;
        Ok(tokio::spawn(async move {
            sleep(delay).await;
            let result = messenger.send(tab, payload).await;

            let mut state = state.lock();
            // the tab was closed while we waited, and the key may since belong
            // to a newer dispatch: record nothing
            if state.in_flight.get(&key) != Some(&seq) {
                return match result {
                    Ok(resp) => Delivery::Delivered(resp),
                    Err(e) => Delivery::Failed(e),
                };
            }
            state.in_flight.remove(&key);
            let now = Instant::now();
            match result {
                Ok(resp) => {
                    state.detected.insert(key.clone(), now);
                    info!(tab, url = %key.1, "delivered checkForJSON");
                    Delivery::Delivered(resp)
                }
                Err(e) => {
                    state.failures.insert(tab, now);
                    warn!(tab, url = %key.1, "delivery failed: {}", e);
                    Delivery::Failed(e)
                }
            }
        }))
    }

    /// Drop everything known about `tab`.
    pub fn forget_tab(&self, tab: TabId) {
        self.state.lock().forget_tab(tab);
        debug!(tab, "purged tab state");
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
