use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::warn;

use super::Handler;
use super::Query;
use super::Search;
use crate::Device;
use crate::Error;
use crate::Package;
use crate::Record;
use crate::Result;
use crate::Track;
use crate::Worker;

const DEFAULT_CHANGE_CAPACITY: usize = 1024;

/// In-process manager holding the latest version of each record.
///
/// Searches replay the current contents, then (in monitor mode) follow every
/// [`publish`](Self::publish). [`terminate`](Self::terminate) breaks all
/// current and future searches with [`Error::Manager`].
pub struct LocalStore<R: Record> {
    name: &'static str,
    entries: RwLock<HashMap<R::Key, R>>,
    changes: broadcast::Sender<R>,
    terminated: watch::Sender<Option<String>>,
}

impl<R: Record> LocalStore<R> {
    pub fn new(name: &'static str) -> Self {
        Self::with_capacity(name, DEFAULT_CHANGE_CAPACITY)
    }

    /// `capacity` bounds the change backlog of a slow search before it
    /// falls back to a full replay.
    pub fn with_capacity(
        name: &'static str,
        capacity: usize,
    ) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));
        let (terminated, _) = watch::channel(None);
        Self {
            name,
            entries: RwLock::new(HashMap::new()),
            changes,
            terminated,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stores `record`, replacing any previous version, and pushes it to
    /// every monitoring search.
    pub fn publish(
        &self,
        record: R,
    ) {
        let mut entries = self.entries.write();
        entries.insert(record.key(), record.clone());
        // No live search is not an error.
        let _ = self.changes.send(record);
    }

    pub fn get(
        &self,
        key: &R::Key,
    ) -> Option<R> {
        self.entries.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Ends every search with an error carrying `reason`.
    pub fn terminate(
        &self,
        reason: impl Into<String>,
    ) {
        self.terminated.send_replace(Some(reason.into()));
    }

    fn check_terminated(&self) -> Result<()> {
        match self.terminated.borrow().as_ref() {
            Some(reason) => Err(Error::manager(self.name, reason.clone())),
            None => Ok(()),
        }
    }

    fn contents(&self) -> Vec<R> {
        self.entries.read().values().cloned().collect()
    }
}

#[async_trait]
impl<R: Record> Search<R> for LocalStore<R> {
    async fn search(
        &self,
        query: Query,
        handler: Handler<R>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        // Subscribe before checking so a concurrent terminate is never lost.
        let mut terminated = self.terminated.subscribe();
        self.check_terminated()?;

        // Subscribe under the entries lock so no publish falls between the
        // snapshot and the change stream.
        let (mut changes, existing) = {
            let entries = self.entries.read();
            let existing: Vec<R> = entries.values().cloned().collect();
            (self.changes.subscribe(), existing)
        };

        debug!(store = self.name, records = existing.len(), monitor = query.monitor, "search started");
        for record in existing {
            handler.handle(record).await?;
        }
        if !query.monitor {
            return Ok(());
        }

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!(store = self.name, "search cancelled");
                    return Ok(());
                }
                msg = changes.recv() => match msg {
                    Ok(record) => handler.handle(record).await?,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(store = self.name, skipped, "search lagged, replaying contents");
                        for record in self.contents() {
                            handler.handle(record).await?;
                        }
                    }
                    Err(RecvError::Closed) => return Ok(()),
                },
                res = terminated.changed() => {
                    if res.is_err() {
                        return Ok(());
                    }
                    self.check_terminated()?;
                }
            }
        }
    }
}

/// Local job scheduler with independent device and worker streams.
pub struct LocalJobManager {
    pub devices: LocalStore<Device>,
    pub workers: LocalStore<Worker>,
}

impl LocalJobManager {
    pub fn new() -> Self {
        Self {
            devices: LocalStore::new("job.devices"),
            workers: LocalStore::new("job.workers"),
        }
    }
}

impl Default for LocalJobManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Search<Device> for LocalJobManager {
    async fn search(
        &self,
        query: Query,
        handler: Handler<Device>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        self.devices.search(query, handler, shutdown).await
    }
}

#[async_trait]
impl Search<Worker> for LocalJobManager {
    async fn search(
        &self,
        query: Query,
        handler: Handler<Worker>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        self.workers.search(query, handler, shutdown).await
    }
}

/// Local build store with independent track and package streams.
pub struct LocalBuildStore {
    pub tracks: LocalStore<Track>,
    pub packages: LocalStore<Package>,
}

impl LocalBuildStore {
    pub fn new() -> Self {
        Self {
            tracks: LocalStore::new("build.tracks"),
            packages: LocalStore::new("build.packages"),
        }
    }
}

impl Default for LocalBuildStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Search<Track> for LocalBuildStore {
    async fn search(
        &self,
        query: Query,
        handler: Handler<Track>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        self.tracks.search(query, handler, shutdown).await
    }
}

#[async_trait]
impl Search<Package> for LocalBuildStore {
    async fn search(
        &self,
        query: Query,
        handler: Handler<Package>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        self.packages.search(query, handler, shutdown).await
    }
}
