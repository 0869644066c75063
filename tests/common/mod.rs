use std::sync::Arc;
use std::time::Duration;

use robot_monitor::Data;
use robot_monitor::DataOwner;
use robot_monitor::Domain;
use robot_monitor::Managers;
use robot_monitor::Monitor;
use robot_monitor::Result;
use robot_monitor::UpdateHandler;
use robot_monitor::WatchConfig;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(3);

/// What one update round observed.
#[derive(Debug, Clone)]
pub struct Round {
    pub generation: u64,
    pub counts: Vec<(Domain, usize)>,
    pub device_names: Vec<(String, String)>,
}

impl Round {
    pub fn count(
        &self,
        domain: Domain,
    ) -> usize {
        self.counts
            .iter()
            .find(|(d, _)| *d == domain)
            .map(|(_, len)| *len)
            .unwrap_or_default()
    }
}

pub fn recorder() -> (impl UpdateHandler + 'static, mpsc::UnboundedReceiver<Round>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let update = move |_: &Managers, data: &Data| -> Result<()> {
        let mut device_names: Vec<(String, String)> =
            data.devices.iter().map(|d| (d.id.clone(), d.name.clone())).collect();
        device_names.sort();
        let _ = tx.send(Round {
            generation: data.generation().get(),
            counts: data.counts(),
            device_names,
        });
        Ok(())
    };
    (update, rx)
}

pub fn spawn_monitor<U>(
    managers: Managers,
    watch: WatchConfig,
    update: U,
    shutdown: &CancellationToken,
) -> (Arc<Monitor>, JoinHandle<Result<()>>)
where
    U: UpdateHandler + 'static,
{
    let monitor = Arc::new(Monitor::new(managers, DataOwner::new(), watch));
    let run = {
        let monitor = monitor.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { monitor.run(update, shutdown).await })
    };
    (monitor, run)
}

pub async fn round_where<F>(
    rx: &mut mpsc::UnboundedReceiver<Round>,
    predicate: F,
) -> Round
where
    F: Fn(&Round) -> bool,
{
    loop {
        let round = timeout(WAIT_TIMEOUT, rx.recv())
            .await
            .expect("timed out waiting for a round")
            .expect("monitor loop ended");
        if predicate(&round) {
            return round;
        }
    }
}

pub async fn stop(
    shutdown: &CancellationToken,
    run: JoinHandle<Result<()>>,
) {
    shutdown.cancel();
    let result = timeout(WAIT_TIMEOUT, run).await.expect("monitor did not stop in time");
    assert!(result.expect("monitor task panicked").is_ok());
}
