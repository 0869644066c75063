use std::marker::PhantomData;
use std::mem;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::constants::*;
use crate::metrics::ACTIVE_SUBSCRIPTIONS;
use crate::metrics::SUBSCRIPTION_EXITS_TOTAL;
use crate::DataOwner;
use crate::Device;
use crate::Domain;
use crate::Handler;
use crate::Managers;
use crate::Package;
use crate::Query;
use crate::Record;
use crate::RecordHandler;
use crate::Replay;
use crate::Report;
use crate::Result;
use crate::Search;
use crate::Subject;
use crate::Trace;
use crate::Track;
use crate::WatchConfig;
use crate::Worker;

/// Lifecycle of one manager subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchState {
    Running,
    /// Waiting out the backoff before re-subscribing
    Restarting { attempt: usize },
    /// The manager ended the stream without an error
    Finished,
    /// The manager ended the stream with an error; the domain view is frozen
    Failed(String),
    Cancelled,
}

impl WatchState {
    pub fn is_alive(&self) -> bool {
        matches!(self, WatchState::Running | WatchState::Restarting { .. })
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            WatchState::Running => "running",
            WatchState::Restarting { .. } => "restarting",
            WatchState::Finished => "finished",
            WatchState::Failed(_) => "failed",
            WatchState::Cancelled => "cancelled",
        }
    }
}

/// Observer of a running subscription.
#[derive(Debug, Clone)]
pub struct WatchHandle {
    stream: &'static str,
    domain: Domain,
    state: watch::Receiver<WatchState>,
}

impl WatchHandle {
    pub fn stream(&self) -> &'static str {
        self.stream
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn state(&self) -> WatchState {
        self.state.borrow().clone()
    }

    pub fn is_alive(&self) -> bool {
        self.state.borrow().is_alive()
    }

    /// Waits until the subscription has stopped and returns its final state.
    pub async fn stopped(&self) -> WatchState {
        let mut state = self.state.clone();
        let final_state = match state.wait_for(|s| !s.is_alive()).await {
            Ok(s) => s.clone(),
            // The task is gone; its last published state is final.
            Err(_) => self.state(),
        };
        final_state
    }

    /// Waits for the next state transition and returns the new state.
    ///
    /// Transitions published in quick succession may collapse into the latest
    /// one. Returns `None` once the subscription task is gone and its final
    /// state has been observed.
    pub async fn changed(&mut self) -> Option<WatchState> {
        if self.state.changed().await.is_err() {
            return None;
        }
        let state = self.state.borrow_and_update().clone();
        Some(state)
    }
}

/// Record handler upserting every delivered record through the owner.
pub struct UpsertHandler<R> {
    owner: DataOwner,
    _record: PhantomData<fn(R)>,
}

impl<R: Record> UpsertHandler<R> {
    pub fn new(owner: DataOwner) -> Self {
        Self {
            owner,
            _record: PhantomData,
        }
    }
}

#[async_trait]
impl<R: Record> RecordHandler<R> for UpsertHandler<R> {
    async fn handle(
        &self,
        record: R,
    ) -> Result<()> {
        self.owner.upsert(record).await;
        Ok(())
    }
}

#[derive(Default)]
struct SupervisorState {
    handles: Option<Vec<WatchHandle>>,
    tasks: Vec<JoinHandle<()>>,
    token: Option<CancellationToken>,
}

/// Runs one subscription task per present manager stream.
///
/// Streams are fully independent: a stalled or failed stream never delays
/// another one beyond the briefly held exclusive region of each upsert.
pub struct WatchSupervisor {
    owner: DataOwner,
    config: WatchConfig,
    state: Mutex<SupervisorState>,
}

impl WatchSupervisor {
    pub fn new(
        owner: DataOwner,
        config: WatchConfig,
    ) -> Self {
        Self {
            owner,
            config,
            state: Mutex::new(SupervisorState::default()),
        }
    }

    /// Spawns the subscriptions for every manager present in `managers`.
    ///
    /// Idempotent: later calls return the handles of the first one.
    /// Must be called from within a tokio runtime.
    pub fn start(
        &self,
        managers: &Managers,
        shutdown: &CancellationToken,
    ) -> Vec<WatchHandle> {
        let mut state = self.state.lock();
        if let Some(handles) = &state.handles {
            return handles.clone();
        }

        let token = shutdown.child_token();
        let mut handles = Vec::new();
        let mut tasks = Vec::new();
        let mut spawned = |(handle, task): (WatchHandle, JoinHandle<()>)| {
            handles.push(handle);
            tasks.push(task);
        };

        if let Some(job) = &managers.job {
            spawned(self.spawn_stream::<Device, _>(STREAM_JOB_DEVICES, job.clone(), &token));
            spawned(self.spawn_stream::<Worker, _>(STREAM_JOB_WORKERS, job.clone(), &token));
        }
        if let Some(build) = &managers.build {
            spawned(self.spawn_stream::<Track, _>(STREAM_BUILD_TRACKS, build.clone(), &token));
            spawned(self.spawn_stream::<Package, _>(STREAM_BUILD_PACKAGES, build.clone(), &token));
        }
        if let Some(subject) = &managers.subject {
            spawned(self.spawn_stream::<Subject, _>(STREAM_SUBJECT, subject.clone(), &token));
        }
        if let Some(trace) = &managers.trace {
            spawned(self.spawn_stream::<Trace, _>(STREAM_TRACE, trace.clone(), &token));
        }
        if let Some(report) = &managers.report {
            spawned(self.spawn_stream::<Report, _>(STREAM_REPORT, report.clone(), &token));
        }
        if let Some(replay) = &managers.replay {
            spawned(self.spawn_stream::<Replay, _>(STREAM_REPLAY, replay.clone(), &token));
        }

        info!(
            managers = ?managers.present(),
            streams = handles.len(),
            "watch supervisor started"
        );

        state.handles = Some(handles.clone());
        state.tasks = tasks;
        state.token = Some(token);
        handles
    }

    /// Handles of the running subscriptions; empty before [`start`](Self::start).
    pub fn handles(&self) -> Vec<WatchHandle> {
        self.state.lock().handles.clone().unwrap_or_default()
    }

    /// Cancels every subscription and waits up to `grace` for the tasks to
    /// stop, aborting the stragglers.
    pub async fn stop(
        &self,
        grace: Duration,
    ) {
        let (token, mut tasks) = {
            let mut state = self.state.lock();
            (state.token.clone(), mem::take(&mut state.tasks))
        };
        if let Some(token) = token {
            token.cancel();
        }
        if tasks.is_empty() {
            return;
        }

        if timeout(grace, join_all(tasks.iter_mut())).await.is_err() {
            warn!(?grace, "subscriptions did not stop in time, aborting");
            for task in &tasks {
                task.abort();
            }
        }
        info!("watch supervisor stopped");
    }

    fn spawn_stream<R, S>(
        &self,
        stream: &'static str,
        source: Arc<S>,
        token: &CancellationToken,
    ) -> (WatchHandle, JoinHandle<()>)
    where
        R: Record,
        S: Search<R> + ?Sized,
    {
        let (state_tx, state_rx) = watch::channel(WatchState::Running);
        let handler: Handler<R> = Arc::new(UpsertHandler::<R>::new(self.owner.clone()));
        let config = self.config.clone();
        let token = token.clone();

        let task = tokio::spawn(async move {
            ACTIVE_SUBSCRIPTIONS.inc();
            let state = run_stream(stream, source, handler, &config, &token, &state_tx).await;
            ACTIVE_SUBSCRIPTIONS.dec();
            state_tx.send_replace(state);
        });

        let handle = WatchHandle {
            stream,
            domain: R::DOMAIN,
            state: state_rx,
        };
        (handle, task)
    }
}

/// Drives one stream until it stops for good and returns its final state.
///
/// A failed stream is left stopped unless the restart policy allows another
/// attempt.
async fn run_stream<R, S>(
    stream: &'static str,
    source: Arc<S>,
    handler: Handler<R>,
    config: &WatchConfig,
    token: &CancellationToken,
    state_tx: &watch::Sender<WatchState>,
) -> WatchState
where
    R: Record,
    S: Search<R> + ?Sized,
{
    let mut restarts = 0;
    loop {
        debug!(stream, restarts, "subscribing");
        let result = tokio::select! {
            _ = token.cancelled() => Ok(()),
            res = source.search(Query::monitor(), handler.clone(), token.clone()) => res,
        };

        if token.is_cancelled() {
            debug!(stream, "subscription cancelled");
            return WatchState::Cancelled;
        }

        let state = match result {
            Ok(()) => WatchState::Finished,
            Err(e) => WatchState::Failed(e.to_string()),
        };
        SUBSCRIPTION_EXITS_TOTAL.with_label_values(&[stream, state.outcome()]).inc();

        if !should_restart(&state, config, restarts) {
            match &state {
                WatchState::Failed(error) => {
                    warn!(stream, %error, "subscription failed; no further updates for this stream")
                }
                _ => warn!(stream, "subscription ended; no further updates for this stream"),
            }
            return state;
        }
        if let WatchState::Failed(error) = &state {
            warn!(stream, %error, "subscription failed");
        }

        restarts += 1;
        let delay = config.restart.delay_for(restarts);
        info!(stream, attempt = restarts, ?delay, "restarting subscription");
        state_tx.send_replace(WatchState::Restarting { attempt: restarts });
        tokio::select! {
            _ = token.cancelled() => return WatchState::Cancelled,
            _ = sleep(delay) => {}
        }
        state_tx.send_replace(WatchState::Running);
    }
}

/// Only failed streams are retried, and only while the restart policy allows.
pub(crate) fn should_restart(
    state: &WatchState,
    config: &WatchConfig,
    restarts: usize,
) -> bool {
    matches!(state, WatchState::Failed(_)) && config.restart_on_error && config.restart.allows(restarts)
}
