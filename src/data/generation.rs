use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::Error;
use crate::Result;

/// Round counter of the consumption loop.
///
/// Advanced once before every update round and never by writers. Readable
/// without holding the exclusive region, so outer surfaces can long-poll on it
/// through [`Generation::after`].
#[derive(Debug, Clone)]
pub struct Generation {
    tx: Arc<watch::Sender<u64>>,
}

impl Generation {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> u64 {
        *self.tx.borrow()
    }

    /// Advances by one and returns the new value.
    pub(crate) fn update(&self) -> u64 {
        let mut current = 0;
        self.tx.send_modify(|generation| {
            *generation += 1;
            current = *generation;
        });
        current
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }

    /// Waits until the generation is strictly greater than `id` and returns it.
    pub async fn after(
        &self,
        id: u64,
        shutdown: &CancellationToken,
    ) -> Result<u64> {
        let mut rx = self.tx.subscribe();
        tokio::select! {
            _ = shutdown.cancelled() => Err(Error::Shutdown),
            res = rx.wait_for(|generation| *generation > id) => {
                res.map(|generation| *generation).map_err(|_| Error::SignalChannelClosed)
            }
        }
    }
}

impl Default for Generation {
    fn default() -> Self {
        Self::new()
    }
}
