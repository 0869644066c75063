use std::time::Instant;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing::trace;

use crate::metrics::init_metrics;
use crate::metrics::GENERATION_GAUGE;
use crate::metrics::UPDATE_DURATION_MS;
use crate::metrics::UPDATE_FAILURES_TOTAL;
use crate::Data;
use crate::DataOwner;
use crate::Error;
use crate::Managers;
use crate::Result;
use crate::WatchConfig;
use crate::WatchHandle;
use crate::WatchSupervisor;

/// Callback invoked once per round with the complete snapshot.
///
/// It runs while the exclusive region is held: writers wait until it returns,
/// so `data` never changes underneath it. It must not call back into the
/// owner. Errors are logged and the loop carries on.
#[async_trait]
pub trait UpdateHandler: Send {
    async fn update(
        &mut self,
        managers: &Managers,
        data: &Data,
    ) -> Result<()>;
}

#[async_trait]
impl<F> UpdateHandler for F
where
    F: FnMut(&Managers, &Data) -> Result<()> + Send,
{
    async fn update(
        &mut self,
        managers: &Managers,
        data: &Data,
    ) -> Result<()> {
        self(managers, data)
    }
}

/// Consumption loop over the live snapshot.
///
/// ## Example
/// ```rust,ignore
/// let monitor = Monitor::new(managers, DataOwner::new(), settings.watch.clone());
/// monitor
///     .run(
///         |_: &Managers, data: &Data| {
///             info!(devices = data.devices.len(), "round");
///             Ok(())
///         },
///         shutdown.clone(),
///     )
///     .await?;
/// ```
pub struct Monitor {
    managers: Managers,
    owner: DataOwner,
    config: WatchConfig,
    supervisor: WatchSupervisor,
}

impl Monitor {
    pub fn new(
        managers: Managers,
        owner: DataOwner,
        config: WatchConfig,
    ) -> Self {
        let supervisor = WatchSupervisor::new(owner.clone(), config.clone());
        Self {
            managers,
            owner,
            config,
            supervisor,
        }
    }

    pub fn managers(&self) -> &Managers {
        &self.managers
    }

    pub fn owner(&self) -> &DataOwner {
        &self.owner
    }

    /// Starts the manager subscriptions; repeated calls are no-ops.
    pub fn start_watchers(
        &self,
        shutdown: &CancellationToken,
    ) -> Vec<WatchHandle> {
        self.supervisor.start(&self.managers, shutdown)
    }

    pub fn watch_handles(&self) -> Vec<WatchHandle> {
        self.supervisor.handles()
    }

    /// Runs rounds until `shutdown` is cancelled.
    ///
    /// Each round advances the generation by one, hands the snapshot to
    /// `update`, then parks until the next write. Writes that land during a
    /// round are deferred to the park point and show up in the next round.
    pub async fn run<U>(
        &self,
        mut update: U,
        shutdown: CancellationToken,
    ) -> Result<()>
    where
        U: UpdateHandler,
    {
        init_metrics();
        self.start_watchers(&shutdown);

        let mut data = self.owner.read().await;
        info!(managers = ?self.managers.present(), "monitor loop started");

        let result = loop {
            let generation = data.generation().update();
            GENERATION_GAUGE.set(generation as i64);

            let started = Instant::now();
            if let Err(e) = update.update(&self.managers, &data).await {
                UPDATE_FAILURES_TOTAL.inc();
                error!(generation, error = %e, "update callback failed");
            }
            UPDATE_DURATION_MS.observe(started.elapsed().as_secs_f64() * 1000.0);

            trace!(generation, "waiting for change");
            data = match data.wait_for_change(&shutdown).await {
                Ok(data) => data,
                Err(Error::Shutdown) => break Ok(()),
                Err(e) => break Err(e),
            };
        };

        info!("monitor loop stopping");
        self.supervisor.stop(self.config.shutdown_timeout()).await;
        result
    }
}
