use futures_channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::changes::Change;
use crate::sitemap::SitemapEntry;

/// Remote work requested by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncRequest {
    Lock,
    Unlock { reload: bool },
    Save { changes: Vec<Change> },
}

/// Remote outcomes the controller has to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Saved { count: usize },
    SaveFailed,
    Reloaded { roots: Vec<SitemapEntry> },
}

/// Creates the two ends connecting a controller with its sync worker.
pub fn channel() -> (SyncHandle, SyncEndpoint) {
    let (request_sender, request_receiver) = mpsc::unbounded();
    let (event_sender, event_receiver) = mpsc::unbounded();
    (
        SyncHandle {
            requests: request_sender,
            events: event_receiver,
        },
        SyncEndpoint {
            requests: request_receiver,
            events: event_sender,
        },
    )
}

/// Controller side: enqueues requests, never waits for them.
#[derive(Debug)]
pub struct SyncHandle {
    requests: UnboundedSender<SyncRequest>,
    events: UnboundedReceiver<SyncEvent>,
}

impl SyncHandle {
    pub fn request(&self, request: SyncRequest) {
        debug!("Queueing sync request {:?}", request);
        if let Err(send_err) = self.requests.unbounded_send(request) {
            debug!("Sync worker is gone, dropping request: {}", send_err);
        }
    }

    pub fn try_next_event(&mut self) -> Option<SyncEvent> {
        self.events.try_next().ok().flatten()
    }
}

/// Worker side: drains requests in order and reports outcomes.
#[derive(Debug)]
pub struct SyncEndpoint {
    requests: UnboundedReceiver<SyncRequest>,
    events: UnboundedSender<SyncEvent>,
}

impl SyncEndpoint {
    pub fn try_next_request(&mut self) -> Option<SyncRequest> {
        self.requests.try_next().ok().flatten()
    }

    pub fn send_event(&self, event: SyncEvent) {
        if let Err(send_err) = self.events.unbounded_send(event) {
            debug!("Controller is gone, dropping sync event: {}", send_err);
        }
    }
}
