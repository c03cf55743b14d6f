//! The session-long background side: watches responses and tab events and asks
//! the renderer of a tab to look for JSON when the metadata suggests it.

pub mod cache;
pub mod dispatch;
pub mod heuristic;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::ObserverConfig;
use crate::messenger::{TabId, TabMessenger};
use crate::protocol::Request;

pub use cache::TimedCache;
pub use dispatch::{Delivery, DispatchState, Dispatcher, Rejected};
pub use heuristic::{
    is_likely_json_content_type, is_likely_json_response, is_likely_json_url, Header,
    ResponseInfo, TabUpdate,
};

pub struct Observer<M> {
    dispatcher: Dispatcher<M>,
}

impl<M: TabMessenger> Observer<M> {
    pub fn new(messenger: Arc<M>, config: ObserverConfig) -> Self {
        Self { dispatcher: Dispatcher::new(messenger, config) }
    }

    pub fn dispatcher(&self) -> &Dispatcher<M> {
        &self.dispatcher
    }

    /// A network response finished loading.
    pub fn on_response(&self, response: &ResponseInfo) -> Option<JoinHandle<Delivery>> {
        if !is_likely_json_response(response) {
            return None;
        }
        debug!(tab = response.tab_id, url = %response.url, "response looks like JSON");
        let request = Request::CheckForJson {
            url: Some(response.url.clone()),
            content_type: response.content_type().map(str::to_string),
            force: false,
        };
        self.dispatch(response.tab_id, request, &response.url)
    }

    /// A tab finished navigating.
    pub fn on_tab_updated(&self, update: &TabUpdate) -> Option<JoinHandle<Delivery>> {
        if !update.is_complete() || !is_likely_json_url(&update.url) {
            return None;
        }
        debug!(tab = update.tab_id, url = %update.url, "navigation completed on JSON-like URL");
        self.dispatch(update.tab_id, url_check(&update.url), &update.url)
    }

    /// A tab was brought to the foreground; `update` is its current state.
    pub fn on_tab_activated(&self, update: &TabUpdate) -> Option<JoinHandle<Delivery>> {
        if !update.is_complete() || !is_likely_json_url(&update.url) {
            return None;
        }
        self.dispatch(update.tab_id, url_check(&update.url), &update.url)
    }

    pub fn on_tab_removed(&self, tab: TabId) {
        self.dispatcher.forget_tab(tab);
    }

    fn dispatch(&self, tab: TabId, request: Request, url: &str) -> Option<JoinHandle<Delivery>> {
        match self.dispatcher.try_dispatch(tab, request, url) {
            Ok(handle) => Some(handle),
            Err(reason) => {
                debug!(tab, url, ?reason, "dispatch skipped");
                None
            }
        }
    }
}

fn url_check(url: &str) -> Request {
    Request::CheckForJson { url: Some(url.to_string()), content_type: None, force: false }
}

#[cfg(test)]
#[path = "observer_tests.rs"]
mod tests;
