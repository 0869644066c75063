use std::time::Duration;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::Data;
use crate::DataGuard;
use crate::DataOwner;

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(3);

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}

/// Parks on the owner until `predicate` holds, returning the read scope.
pub async fn wait_for_data<F>(
    owner: &DataOwner,
    predicate: F,
) -> DataGuard
where
    F: Fn(&Data) -> bool,
{
    let token = CancellationToken::new();
    let mut guard = owner.read().await;
    while !predicate(&guard) {
        guard = timeout(WAIT_TIMEOUT, guard.wait_for_change(&token))
            .await
            .expect("timed out waiting for data")
            .expect("wait_for_change failed");
    }
    guard
}
