//! Synchronization of an edit session with the sitemap service.
//!
//! The controller only queues [`SyncRequest`]s; a [`SyncWorker`] serves them
//! one after another and reports [`SyncEvent`]s back.

mod journal;
mod local;
mod request;
mod service;
mod worker;

pub use journal::{Journal, JournalError};
pub use local::LocalSitemapService;
pub use request::{SyncEndpoint, SyncEvent, SyncHandle, SyncRequest, channel};
pub use service::{RemoteError, SitemapService};
pub use worker::SyncWorker;

#[cfg(test)]
pub(crate) use worker::tests::FakeService;
