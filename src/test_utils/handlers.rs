use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::Error;
use crate::Handler;
use crate::Record;
use crate::RecordHandler;
use crate::Result;

/// Forwards every handled record into an unbounded channel.
pub struct ChannelHandler<R: Record> {
    tx: mpsc::UnboundedSender<R>,
}

impl<R: Record> ChannelHandler<R> {
    pub fn new() -> (Handler<R>, mpsc::UnboundedReceiver<R>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl<R: Record> RecordHandler<R> for ChannelHandler<R> {
    async fn handle(
        &self,
        record: R,
    ) -> Result<()> {
        self.tx.send(record).map_err(|e| Error::Handler(e.to_string()))
    }
}

/// Accepts `limit` records, then rejects every following one.
pub struct LimitedHandler {
    limit: usize,
    seen: AtomicUsize,
}

impl LimitedHandler {
    pub fn new(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            limit,
            seen: AtomicUsize::new(0),
        })
    }

    pub fn seen(&self) -> usize {
        self.seen.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R: Record> RecordHandler<R> for LimitedHandler {
    async fn handle(
        &self,
        _record: R,
    ) -> Result<()> {
        let seen = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
        if seen > self.limit {
            return Err(Error::Handler(format!("limit {} reached", self.limit)));
        }
        Ok(())
    }
}
