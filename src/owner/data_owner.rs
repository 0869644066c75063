use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::sync::Mutex;
use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::metrics::UPSERTS_TOTAL;
use crate::Data;
use crate::Error;
use crate::Generation;
use crate::Record;
use crate::Result;

/// Sole owner of the aggregated [`Data`].
///
/// One exclusive lock backs both entry points: [`read`](Self::read) for the
/// consumption loop and [`write`](Self::write) for the subscription tasks.
/// Every completed write bumps a revision counter published on a `watch`
/// channel, which wakes all parties parked in
/// [`DataGuard::wait_for_change`].
#[derive(Clone)]
pub struct DataOwner {
    data: Arc<Mutex<Data>>,
    revision: Arc<watch::Sender<u64>>,
    generation: Generation,
}

/// Read-mode scope over [`Data`]. The exclusive region is held until the
/// guard is dropped or handed to [`wait_for_change`](Self::wait_for_change).
pub struct DataGuard {
    guard: OwnedMutexGuard<Data>,
    owner: DataOwner,
}

impl DataOwner {
    pub fn new() -> Self {
        let generation = Generation::new();
        let (revision, _rx) = watch::channel(0);
        Self {
            data: Arc::new(Mutex::new(Data::new(generation.clone()))),
            revision: Arc::new(revision),
            generation,
        }
    }

    /// Enters the exclusive region in read mode.
    pub async fn read(&self) -> DataGuard {
        DataGuard {
            guard: self.data.clone().lock_owned().await,
            owner: self.clone(),
        }
    }

    /// Runs `f` inside the exclusive region, then wakes every waiter before
    /// releasing it.
    pub async fn write<F, T>(
        &self,
        f: F,
    ) -> T
    where
        F: FnOnce(&mut Data) -> T,
    {
        let mut data = self.data.lock().await;
        let result = f(&mut data);
        self.revision.send_modify(|revision| *revision = revision.wrapping_add(1));
        drop(data);
        result
    }

    /// Inserts `record` into its domain collection or replaces the entry with
    /// the same key. Returns `true` when the key was new.
    pub async fn upsert<R: Record>(
        &self,
        record: R,
    ) -> bool {
        let key = record.key();
        let inserted = self.write(|data| data.upsert(record)).await;

        let kind = if inserted { "insert" } else { "replace" };
        UPSERTS_TOTAL.with_label_values(&[R::DOMAIN.as_str(), kind]).inc();
        trace!(domain = %R::DOMAIN, ?key, kind, "upserted record");

        inserted
    }

    /// Lock-free handle on the loop generation.
    pub fn generation(&self) -> Generation {
        self.generation.clone()
    }

    /// Number of writes completed so far.
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }
}

impl Default for DataOwner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DataOwner {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("DataOwner")
            .field("revision", &self.revision())
            .field("generation", &self.generation.get())
            .finish()
    }
}

impl DataGuard {
    /// Releases the exclusive region, parks until some write signals, then
    /// re-enters the region.
    ///
    /// The change subscription is taken while the region is still held, so a
    /// write landing between the release and the park is never missed. A
    /// signal sent while nobody waits is not remembered.
    ///
    /// Returns [`Error::Shutdown`] with the region released once `shutdown`
    /// is cancelled.
    pub async fn wait_for_change(
        self,
        shutdown: &CancellationToken,
    ) -> Result<DataGuard> {
        let DataGuard { guard, owner } = self;
        let mut changes = owner.revision.subscribe();
        drop(guard);

        tokio::select! {
            _ = shutdown.cancelled() => return Err(Error::Shutdown),
            res = changes.changed() => res.map_err(|_| Error::SignalChannelClosed)?,
        }

        Ok(owner.read().await)
    }
}

impl Deref for DataGuard {
    type Target = Data;

    fn deref(&self) -> &Data {
        &self.guard
    }
}

impl fmt::Debug for DataGuard {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("DataGuard").field("data", &*self.guard).finish()
    }
}
