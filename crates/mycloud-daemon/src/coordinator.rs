//! Fetch-cycle coordination and the latest-snapshot slot.

use chrono::{DateTime, Utc};
use mycloud_nas::NasApi;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::{watch, Mutex};
use tracing::debug;

use crate::error::UpdateFailed;
use crate::snapshot::{self, Snapshot};

/// Outcome bookkeeping for fetch cycles.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateStatus {
    /// Whether the most recent cycle succeeded.
    pub last_update_success: bool,
    /// Error text of the most recent cycle, if it failed.
    pub last_error: Option<String>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    /// Total cycles run.
    pub cycles: u64,
    /// Total cycles that failed.
    pub failures: u64,
}

/// Owns the client handle and publishes one snapshot per successful cycle.
///
/// The client mutex is held for a whole cycle, so cycles never overlap no
/// matter who triggers them. A failed cycle leaves the published snapshot
/// untouched.
///
/// The session counts as held from the first `open()` attempt until
/// `close()`; closing is a no-op outside a session, so every exit path may
/// call it.
pub struct Coordinator {
    client: Mutex<Box<dyn NasApi>>,
    session: AtomicBool,
    extended: bool,
    latest: watch::Sender<Option<Arc<Snapshot>>>,
    status: RwLock<UpdateStatus>,
}

impl Coordinator {
    /// Creates a coordinator around an unopened client.
    pub fn new(client: Box<dyn NasApi>, extended: bool) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            client: Mutex::new(client),
            session: AtomicBool::new(false),
            extended,
            latest,
            status: RwLock::new(UpdateStatus::default()),
        }
    }

    /// Opens the client session.
    pub async fn open(&self) -> mycloud_nas::Result<()> {
        let mut client = self.client.lock().await;
        self.session.store(true, Ordering::SeqCst);
        client.open().await
    }

    /// Closes the client session if one was opened.
    pub async fn close(&self) -> mycloud_nas::Result<()> {
        let mut client = self.client.lock().await;
        if !self.session.swap(false, Ordering::SeqCst) {
            debug!("No open session to close");
            return Ok(());
        }
        client.close().await
    }

    /// Runs one fetch cycle and publishes its snapshot.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, UpdateFailed> {
        let client = self.client.lock().await;
        let started = Utc::now();
        let result = snapshot::fetch(client.as_ref(), self.extended).await;

        let mut status = self.status.write().unwrap();
        status.cycles += 1;
        status.last_attempt = Some(started);

        match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.latest.send_replace(Some(snapshot.clone()));
                status.last_update_success = true;
                status.last_error = None;
                status.last_success = Some(snapshot.fetched_at);
                debug!(
                    "Fetched snapshot: {} disks, {} volumes",
                    snapshot.system_info.disks.len(),
                    snapshot.system_info.volumes.len()
                );
                Ok(snapshot)
            }
            Err(e) => {
                let failed = UpdateFailed::from(e);
                status.last_update_success = false;
                status.last_error = Some(failed.0.clone());
                status.failures += 1;
                debug!("Fetch cycle failed: {}", failed);
                Err(failed)
            }
        }
    }

    /// Returns the most recently published snapshot.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.latest.borrow().clone()
    }

    /// Subscribes to snapshot publications.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.latest.subscribe()
    }

    /// Returns a copy of the cycle bookkeeping.
    pub fn status(&self) -> UpdateStatus {
        self.status.read().unwrap().clone()
    }
}
