//! Request/response correlation between the injected facade and the
//! background context.
//!
//! Calls are correlated by request id through a pending map, never by
//! ordering: responses may arrive in any order relative to their requests.
//! Every wait is bounded by the configured timeout, and dropping the
//! background endpoint fails all in-flight calls instead of leaving them
//! hanging.

use crate::error::ChannelError;
use dapp_bridge_core::{DappRequest, DappResponse, SenderTab, WalletPush};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::{mpsc, oneshot};
use tracing::{trace, warn};
use uuid::Uuid;

/// A request and the tab it originated from, as seen by the background.
#[derive(Debug)]
pub struct RoutedRequest {
    pub request: DappRequest,
    pub tab: SenderTab,
}

struct Shared {
    pending: Mutex<HashMap<Uuid, oneshot::Sender<DappResponse>>>,
    pushes: Mutex<HashMap<u64, mpsc::UnboundedSender<WalletPush>>>,
    timeout: Duration,
}

/// Facade-side handle. Cheap to clone; one per provider instance is typical.
#[derive(Clone)]
pub struct DappChannel {
    shared: Arc<Shared>,
    to_background: mpsc::UnboundedSender<RoutedRequest>,
}

/// Background-side endpoint. Dropping it disconnects every in-flight call.
pub struct BackgroundEndpoint {
    requests: mpsc::UnboundedReceiver<RoutedRequest>,
    shared: Arc<Shared>,
}

/// Creates a connected channel pair.
pub fn channel(timeout: Duration) -> (DappChannel, BackgroundEndpoint) {
    let (to_background, requests) = mpsc::unbounded_channel();
    let shared = Arc::new(Shared {
        pending: Mutex::new(HashMap::new()),
        pushes: Mutex::new(HashMap::new()),
        timeout,
    });
    (
        DappChannel { shared: Arc::clone(&shared), to_background },
        BackgroundEndpoint { requests, shared },
    )
}

impl DappChannel {
    /// Sends `request` to the background and waits for its response, bounded
    /// by the channel timeout.
    pub async fn send(
        &self,
        request: DappRequest,
        tab: SenderTab,
    ) -> Result<DappResponse, ChannelError> {
        let request_id = request.request_id();
        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().insert(request_id, tx);

        if self.to_background.send(RoutedRequest { request, tab }).is_err() {
            self.shared.pending.lock().remove(&request_id);
            return Err(ChannelError::Disconnected);
        }
        trace!(target: "bridge::channel", %request_id, "request routed to background");

        match tokio::time::timeout(self.shared.timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            // the sender side was dropped without answering
            Ok(Err(_)) => Err(ChannelError::Disconnected),
            Err(_) => {
                self.shared.pending.lock().remove(&request_id);
                Err(ChannelError::Timeout(self.shared.timeout))
            }
        }
    }

    /// Registers a push listener for `tab_id`, replacing any previous one.
    pub fn subscribe_pushes(&self, tab_id: u64) -> mpsc::UnboundedReceiver<WalletPush> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared.pushes.lock().insert(tab_id, tx);
        rx
    }

    /// Removes the push listener for `tab_id`.
    pub fn unsubscribe_pushes(&self, tab_id: u64) {
        self.shared.pushes.lock().remove(&tab_id);
    }
}

impl BackgroundEndpoint {
    /// Next routed request, or `None` once all facade handles are gone.
    pub async fn recv(&mut self) -> Option<RoutedRequest> {
        self.requests.recv().await
    }

    /// Completes the in-flight call matching the response's request id.
    ///
    /// A response with no matching pending call is dropped with a warning;
    /// this is how late responses after a timeout and duplicate deliveries
    /// die.
    pub fn respond(&self, response: DappResponse) {
        let request_id = response.request_id();
        match self.shared.pending.lock().remove(&request_id) {
            Some(tx) => {
                // receiver gone means the caller timed out; nothing to do
                let _ = tx.send(response);
            }
            None => {
                warn!(target: "bridge::channel", %request_id, "response for unknown request id dropped");
            }
        }
    }

    /// Delivers an unsolicited push to the listener for `tab_id`, if any.
    pub fn push(&self, tab_id: u64, push: WalletPush) {
        let mut pushes = self.shared.pushes.lock();
        if let Some(tx) = pushes.get(&tab_id) {
            if tx.send(push).is_err() {
                pushes.remove(&tab_id);
            }
        }
    }
}

impl Drop for BackgroundEndpoint {
    fn drop(&mut self) {
        // fail everything still waiting rather than leaving it to time out
        self.shared.pending.lock().clear();
    }
}
