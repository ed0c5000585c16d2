use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::sync::{RemoteError, SitemapService, SyncEndpoint, SyncEvent, SyncRequest};
use crate::ui::{Control, EditorUi};

const ERROR_TITLE: &str = "Error";

/// Executes queued [`SyncRequest`]s against a [`SitemapService`], one at a
/// time and in the order they were queued.
pub struct SyncWorker<S> {
    service: S,
    ui: Rc<dyn EditorUi>,
    uri: String,
    endpoint: SyncEndpoint,
}

impl<S: SitemapService> SyncWorker<S> {
    pub fn new(service: S, ui: Rc<dyn EditorUi>, uri: impl Into<String>, endpoint: SyncEndpoint) -> Self {
        Self {
            service,
            ui,
            uri: uri.into(),
            endpoint,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Handles every request queued so far and returns how many there were.
    pub async fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Some(request) = self.endpoint.try_next_request() {
            self.handle(request).await;
            handled += 1;
        }
        if handled > 0 {
            debug!("Processed {} sync requests", handled);
        }
        handled
    }

    async fn handle(&self, request: SyncRequest) {
        match request {
            SyncRequest::Lock => self.lock().await,
            SyncRequest::Unlock { reload } => self.unlock(reload).await,
            SyncRequest::Save { changes } => {
                let count = changes.len();
                match self.service.save(&self.uri, &changes).await {
                    Ok(()) => {
                        info!("Saved {} changes to '{}'", count, self.uri);
                        self.endpoint.send_event(SyncEvent::Saved { count });
                    }
                    Err(err) => {
                        self.report("Could not save", &err);
                        self.endpoint.send_event(SyncEvent::SaveFailed);
                    }
                }
            }
        }
    }

    async fn lock(&self) {
        let result = self.service.lock(&self.uri).await;

        self.ui.set_enabled(Control::Save, true);
        self.ui.set_enabled(Control::Reset, true);
        self.ui.set_enabled(Control::Undo, true);

        match result {
            Ok(()) => info!("Locked '{}'", self.uri),
            Err(err) => self.report("Could not lock", &err),
        }
    }

    async fn unlock(&self, reload: bool) {
        if let Err(err) = self.service.unlock(&self.uri).await {
            self.report("Could not unlock", &err);
            return;
        }
        info!("Unlocked '{}'", self.uri);

        if !reload {
            return;
        }
        match self.service.load_roots(&self.uri).await {
            Ok(roots) => self.endpoint.send_event(SyncEvent::Reloaded { roots }),
            Err(err) => self.report("Could not reload", &err),
        }
    }

    fn report(&self, action: &str, err: &RemoteError) {
        warn!("{} '{}': {}", action, self.uri, err);
        self.ui
            .show_error(ERROR_TITLE, &format!("{} '{}': {}", action, self.uri, err));
    }
}
