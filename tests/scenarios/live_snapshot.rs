use robot_monitor::Device;
use robot_monitor::Domain;
use robot_monitor::LocalManagers;
use robot_monitor::Managers;
use robot_monitor::Package;
use robot_monitor::Replay;
use robot_monitor::Report;
use robot_monitor::Subject;
use robot_monitor::Trace;
use robot_monitor::Track;
use robot_monitor::WatchConfig;
use robot_monitor::Worker;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::common::recorder;
use crate::common::round_where;
use crate::common::spawn_monitor;
use crate::common::stop;
use crate::common::WAIT_TIMEOUT;
use crate::enable_logger;

#[tokio::test]
async fn test_full_fleet_populates_every_domain() {
    enable_logger();
    let fleet = LocalManagers::new();
    let shutdown = CancellationToken::new();
    let (update, mut rounds) = recorder();
    let (_monitor, run) = spawn_monitor(fleet.managers(), WatchConfig::default(), update, &shutdown);

    fleet.job.devices.publish(Device::new("d1"));
    fleet.job.workers.publish(Worker::new("w1"));
    fleet.build.tracks.publish(Track::new("t1"));
    fleet.build.packages.publish(Package::new("p1"));
    fleet.subjects.publish(Subject::new("s1"));
    fleet.traces.publish(Trace::new("tr1"));
    fleet.reports.publish(Report::new("r1"));
    fleet.replays.publish(Replay::new("rp1"));

    let round = round_where(&mut rounds, |r| Domain::ALL.iter().all(|d| r.count(*d) == 1)).await;
    assert!(round.generation >= 1);

    stop(&shutdown, run).await;
}

#[tokio::test]
async fn test_replaced_record_keeps_single_entry_with_latest_value() {
    let fleet = LocalManagers::new();
    let shutdown = CancellationToken::new();
    let (update, mut rounds) = recorder();
    let (_monitor, run) = spawn_monitor(fleet.managers(), WatchConfig::default(), update, &shutdown);

    fleet.job.devices.publish(Device::new("1").with_name("first"));
    round_where(&mut rounds, |r| r.count(Domain::Device) == 1).await;
    fleet.job.devices.publish(Device::new("1").with_name("second"));

    let round = round_where(&mut rounds, |r| {
        r.device_names == vec![("1".to_string(), "second".to_string())]
    })
    .await;
    assert_eq!(round.count(Domain::Device), 1);

    stop(&shutdown, run).await;
}

#[tokio::test]
async fn test_absent_managers_leave_their_domains_empty() {
    let fleet = LocalManagers::new();
    let shutdown = CancellationToken::new();
    let (update, mut rounds) = recorder();
    let managers = Managers::new().with_job(fleet.job.clone());
    let (monitor, run) = spawn_monitor(managers, WatchConfig::default(), update, &shutdown);

    fleet.job.devices.publish(Device::new("d1"));
    fleet.traces.publish(Trace::new("never-watched"));

    let round = round_where(&mut rounds, |r| r.count(Domain::Device) == 1).await;
    for domain in [Domain::Track, Domain::Package, Domain::Subject, Domain::Trace, Domain::Report, Domain::Replay] {
        assert_eq!(round.count(domain), 0, "{domain} should stay empty");
    }
    assert_eq!(monitor.watch_handles().len(), 2);

    stop(&shutdown, run).await;
}

#[tokio::test]
async fn test_generation_can_be_awaited_from_outside() {
    let fleet = LocalManagers::new();
    let shutdown = CancellationToken::new();
    let (update, mut rounds) = recorder();
    let (monitor, run) = spawn_monitor(fleet.managers(), WatchConfig::default(), update, &shutdown);

    let first = round_where(&mut rounds, |_| true).await.generation;
    let generation = monitor.owner().generation();
    let waiter = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { generation.after(first, &shutdown).await })
    };

    fleet.subjects.publish(Subject::new("s1"));
    let next = timeout(WAIT_TIMEOUT, waiter).await.unwrap().unwrap().unwrap();
    assert!(next > first);

    stop(&shutdown, run).await;
}
