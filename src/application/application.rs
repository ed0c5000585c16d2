use std::rc::Rc;

use snafu::prelude::*;
use tracing::{debug, info, warn};

use crate::application::RuntimeConfig;
use crate::config::edit_script::{EditScript, ScriptError, ScriptStep};
use crate::config::sitemap_source::{SitemapSource, SitemapSourceError};
use crate::controller::{ControllerError, SitemapController};
use crate::sitemap::{SitemapEntry, SitemapTree};
use crate::sync::{
    JournalError, LocalSitemapService, RemoteError, SitemapService, SyncWorker, channel,
};
use crate::ui::{ConsoleChangePrinter, ConsoleUi, render_tree};

pub struct Application;

impl Application {
    /// Replays an edit script against a sitemap backed by the local service.
    pub async fn run(runtime_config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let config: RuntimeConfig = runtime_config.into();
        let source = SitemapSource::read(&config.sitemap)
            .await
            .context(SitemapSourceSnafu)?;
        let script = EditScript::read(&config.script).await.context(ScriptSnafu)?;
        let uri = script
            .uri
            .clone()
            .unwrap_or_else(|| config.sitemap.display().to_string());

        debug!(
            "Editing '{}': {} top-level entries below '{}'",
            uri,
            source.entries().len(),
            source.root()
        );

        let root_path = source.root().to_string();
        let mut service = LocalSitemapService::open(
            uri.as_str(),
            source.into_tree(),
            config.state_dir.clone(),
        )
        .await
        .context(ServiceSnafu)?;
        if let Some(owner) = config.owner {
            service = service.with_owner(owner);
        }
        let roots = service.load_roots(&uri).await.context(InitialLoadSnafu)?;

        let ui = Rc::new(ConsoleUi::new());
        let (handle, endpoint) = channel();
        let mut controller = SitemapController::new(uri.as_str(), ui.clone(), handle);
        controller.set_tree(SitemapTree::with_root_path(root_path, roots));
        if controller.tree().is_empty() {
            warn!("Sitemap '{}' has no entries", controller.uri());
        }
        controller.add_listener(Box::new(ConsoleChangePrinter::new()));
        let mut worker = SyncWorker::new(service, ui.clone(), uri.as_str(), endpoint);

        for (idx, step) in script.steps.iter().enumerate() {
            debug!("Step {}: {:?}", idx + 1, step);
            if let Err(source) = run_step(&mut controller, &ui, step) {
                discard_changes(&mut controller, &mut worker).await;
                return Err(source).context(StepSnafu { index: idx + 1 });
            }
            settle(&mut controller, &mut worker).await;
        }

        discard_changes(&mut controller, &mut worker).await;
        info!(
            "Finished {} steps on '{}' (fingerprint {:016x})",
            script.steps.len(),
            controller.uri(),
            controller.tree().fingerprint()
        );
        debug!(
            "Session state kept in {}",
            worker.service().state_dir().display()
        );
        Ok(())
    }
}

fn run_step(
    controller: &mut SitemapController,
    ui: &ConsoleUi,
    step: &ScriptStep,
) -> Result<(), ControllerError> {
    match step {
        ScriptStep::Create {
            path,
            title,
            vfs_reference,
            properties,
        } => {
            let mut entry = SitemapEntry::new(path.as_str());
            if let Some(title) = title {
                entry = entry.with_title(title.trim());
            }
            if let Some(vfs_reference) = vfs_reference {
                entry = entry.with_vfs_reference(vfs_reference.trim());
            }
            let entry = properties
                .iter()
                .fold(entry, |entry, (key, value)| {
                    entry.with_property(key.as_str(), value.as_str())
                });
            controller.create(entry)
        }
        ScriptStep::Edit {
            path,
            title,
            vfs_reference,
            properties,
        } => controller.edit(
            path,
            title.as_deref(),
            vfs_reference.as_deref(),
            properties.clone(),
        ),
        ScriptStep::Move {
            path,
            destination,
            position,
        } => controller.move_entry(path, destination, *position),
        ScriptStep::Delete { path } => controller.delete(path),
        ScriptStep::Undo => {
            if !controller.undo()? {
                info!("Nothing to undo");
            }
            Ok(())
        }
        ScriptStep::Redo => {
            if !controller.redo()? {
                info!("Nothing to redo");
            }
            Ok(())
        }
        ScriptStep::Commit => {
            if !controller.commit()? {
                info!("Nothing to commit");
            }
            Ok(())
        }
        ScriptStep::Reset => {
            controller.reset();
            Ok(())
        }
        ScriptStep::Print => {
            print!("{}", render_tree(controller.tree()));
            println!("{}", ui.render_controls());
            Ok(())
        }
    }
}

/// Lets the worker and the controller exchange requests and outcomes until
/// neither has anything left to do.
async fn settle<S: SitemapService>(controller: &mut SitemapController, worker: &mut SyncWorker<S>) {
    loop {
        let served = worker.process_pending().await;
        let handled = controller.process_sync_events();
        if served == 0 && handled == 0 {
            break;
        }
    }
    debug!(
        "Sync settled for '{}' (dirty: {}, saving: {})",
        controller.uri(),
        controller.is_dirty(),
        controller.is_saving()
    );
}

/// Drops uncommitted changes so the lock is not left behind.
async fn discard_changes<S: SitemapService>(
    controller: &mut SitemapController,
    worker: &mut SyncWorker<S>,
) {
    settle(controller, worker).await;
    if controller.is_dirty() {
        warn!(
            "Discarding {} uncommitted changes to '{}'",
            controller.changes().len(),
            controller.uri()
        );
        controller.reset();
        settle(controller, worker).await;
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Failed to load the sitemap"))]
    SitemapSourceError { source: SitemapSourceError },
    #[snafu(display("Failed to load the edit script"))]
    ScriptError { source: ScriptError },
    #[snafu(display("Failed to open the sitemap service"))]
    ServiceError { source: JournalError },
    #[snafu(display("Failed to load the saved sitemap"))]
    InitialLoadError { source: RemoteError },
    #[snafu(display("Step {} of the edit script failed", index))]
    StepError {
        index: usize,
        source: ControllerError,
    },
}
