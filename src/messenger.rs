//! Request/response delivery between the observer and per-tab renderers.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

use crate::error::DeliveryError;
use crate::protocol::{Request, Response};
use crate::renderer::Renderer;

/// Browser tab identifier.
pub type TabId = i64;

/// Sentinel for requests that do not belong to any tab.
pub const NO_TAB: TabId = -1;

const INBOX_CAPACITY: usize = 16;

/// A request on its way to a renderer, with the slot its answer goes into.
#[derive(Debug)]
pub struct Envelope {
    pub request: Request,
    pub reply: oneshot::Sender<Response>,
}

/// Sends one request to the renderer of `tab` and waits for its answer.
///
/// Implementations bound the wait and report an absent renderer as
/// [`DeliveryError::NoReceiver`] instead of hanging.
pub trait TabMessenger: Send + Sync + 'static {
    fn send(
        &self,
        tab: TabId,
        request: Request,
    ) -> impl Future<Output = Result<Response, DeliveryError>> + Send;
}

/// Routes requests to renderer inboxes over tokio channels.
#[derive(Debug)]
pub struct TabRegistry {
    tabs: RwLock<HashMap<TabId, mpsc::Sender<Envelope>>>,
    timeout: Duration,
}

impl TabRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self { tabs: RwLock::new(HashMap::new()), timeout }
    }

    /// Register the renderer of `tab`; a previous renderer for the tab is replaced.
    pub fn connect(&self, tab: TabId) -> mpsc::Receiver<Envelope> {
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        self.tabs.write().insert(tab, tx);
        debug!(tab, "renderer connected");
        rx
    }

    pub fn disconnect(&self, tab: TabId) {
        if self.tabs.write().remove(&tab).is_some() {
            debug!(tab, "renderer disconnected");
        }
    }

    pub fn is_connected(&self, tab: TabId) -> bool {
        self.tabs.read().get(&tab).is_some_and(|tx| !tx.is_closed())
    }
}

impl TabMessenger for TabRegistry {
    fn send(
        &self,
        tab: TabId,
        request: Request,
    ) -> impl Future<Output = Result<Response, DeliveryError>> + Send {
        // Limit scope of read guard so it's dropped before await
        let inbox = self.tabs.read().get(&tab).cloned();
        let timeout = self.timeout;
        async move {
            let inbox = inbox.ok_or(DeliveryError::NoReceiver(tab))?;
            let (reply, answer) = oneshot::channel();
            inbox
                .send(Envelope { request, reply })
                .await
                .map_err(|_| DeliveryError::NoReceiver(tab))?;
            match tokio::time::timeout(timeout, answer).await {
                Ok(Ok(response)) => Ok(response),
                Ok(Err(_)) => Err(DeliveryError::Dropped(tab)),
                Err(_) => Err(DeliveryError::Timeout(tab)),
            }
        }
    }
}

impl<M: TabMessenger> TabMessenger for Arc<M> {
    fn send(
        &self,
        tab: TabId,
        request: Request,
    ) -> impl Future<Output = Result<Response, DeliveryError>> + Send {
        self.as_ref().send(tab, request)
    }
}

/// Answer every request arriving in `inbox` until all senders are gone.
pub async fn serve_renderer(renderer: Arc<Mutex<Renderer>>, mut inbox: mpsc::Receiver<Envelope>) {
    while let Some(Envelope { request, reply }) = inbox.recv().await {
        trace!(?request, "renderer received request");
        let response = renderer.lock().handle(request);
        // the caller may have timed out already
        let _ = reply.send(response);
    }
    debug!("renderer inbox closed");
}

#[cfg(test)]
#[path = "messenger_tests.rs"]
mod tests;
