use robot_monitor::BackoffPolicy;
use robot_monitor::Device;
use robot_monitor::Domain;
use robot_monitor::LocalManagers;
use robot_monitor::Trace;
use robot_monitor::WatchConfig;
use robot_monitor::WatchState;
use robot_monitor::STREAM_TRACE;
use robot_monitor::SUBSCRIPTION_EXITS_TOTAL;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::common::recorder;
use crate::common::round_where;
use crate::common::spawn_monitor;
use crate::common::stop;
use crate::common::WAIT_TIMEOUT;
use crate::enable_logger;

#[tokio::test]
async fn test_terminated_stream_freezes_its_view_while_others_flow() {
    enable_logger();
    let fleet = LocalManagers::new();
    let shutdown = CancellationToken::new();
    let (update, mut rounds) = recorder();
    let (monitor, run) = spawn_monitor(fleet.managers(), WatchConfig::default(), update, &shutdown);

    fleet.traces.publish(Trace::new("tr1"));
    round_where(&mut rounds, |r| r.count(Domain::Trace) == 1).await;

    let trace = monitor
        .watch_handles()
        .into_iter()
        .find(|h| h.stream() == STREAM_TRACE)
        .unwrap();
    fleet.traces.terminate("trace backend lost");
    let state = timeout(WAIT_TIMEOUT, trace.stopped()).await.unwrap();
    assert!(matches!(state, WatchState::Failed(ref msg) if msg.contains("trace backend lost")));

    fleet.traces.publish(Trace::new("tr2"));
    fleet.job.devices.publish(Device::new("d1"));
    let round = round_where(&mut rounds, |r| r.count(Domain::Device) == 1).await;
    assert_eq!(round.count(Domain::Trace), 1);

    let alive = monitor.watch_handles().iter().filter(|h| h.is_alive()).count();
    assert_eq!(alive, 7);

    stop(&shutdown, run).await;
}

#[tokio::test]
async fn test_restart_policy_gives_up_after_max_retries() {
    let fleet = LocalManagers::new();
    fleet.traces.terminate("down for maintenance");
    let failed_before = SUBSCRIPTION_EXITS_TOTAL
        .with_label_values(&[STREAM_TRACE, "failed"])
        .get();

    let watch = WatchConfig {
        restart_on_error: true,
        restart: BackoffPolicy {
            max_retries: 2,
            base_delay_ms: 1,
            max_delay_ms: 4,
        },
        ..WatchConfig::default()
    };
    let shutdown = CancellationToken::new();
    let (update, _rounds) = recorder();
    let (monitor, run) = spawn_monitor(fleet.managers(), watch, update, &shutdown);

    // the loop starts the subscriptions before its first round
    let trace = loop {
        if let Some(h) = monitor.watch_handles().into_iter().find(|h| h.stream() == STREAM_TRACE) {
            break h;
        }
        tokio::task::yield_now().await;
    };
    let state = timeout(WAIT_TIMEOUT, trace.stopped()).await.unwrap();
    assert!(matches!(state, WatchState::Failed(_)));

    let failed_after = SUBSCRIPTION_EXITS_TOTAL
        .with_label_values(&[STREAM_TRACE, "failed"])
        .get();
    assert!(failed_after >= failed_before + 3);

    stop(&shutdown, run).await;
}
