use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::test_utils::ChannelHandler;
use crate::test_utils::LimitedHandler;
use crate::test_utils::WAIT_TIMEOUT;
use crate::Device;
use crate::Error;
use crate::Trace;
use crate::Worker;

#[tokio::test]
async fn test_search_all_replays_current_contents_and_returns() {
    let store = LocalStore::<Device>::new("devices");
    store.publish(Device::new("1"));
    store.publish(Device::new("2"));
    store.publish(Device::new("1").with_name("renamed"));

    let (handler, mut rx) = ChannelHandler::new();
    store.search(Query::all(), handler, CancellationToken::new()).await.unwrap();

    let mut ids = Vec::new();
    while let Ok(device) = rx.try_recv() {
        ids.push(device.id);
    }
    ids.sort();
    assert_eq!(ids, vec!["1", "2"]);
    assert_eq!(store.get(&"1".to_string()).unwrap().name, "renamed");
}

#[tokio::test]
async fn test_monitor_search_follows_published_records() {
    let store = Arc::new(LocalStore::<Worker>::new("workers"));
    store.publish(Worker::new("existing"));

    let (handler, mut rx) = ChannelHandler::new();
    let token = CancellationToken::new();
    let search = {
        let store = store.clone();
        let token = token.clone();
        tokio::spawn(async move { store.search(Query::monitor(), handler, token).await })
    };

    assert_eq!(timeout(WAIT_TIMEOUT, rx.recv()).await.unwrap().unwrap().id, "existing");

    store.publish(Worker::new("new"));
    assert_eq!(timeout(WAIT_TIMEOUT, rx.recv()).await.unwrap().unwrap().id, "new");
    assert!(!search.is_finished());

    token.cancel();
    let result = timeout(WAIT_TIMEOUT, search).await.unwrap().unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_terminate_breaks_running_search_with_manager_error() {
    let store = Arc::new(LocalStore::<Trace>::new("trace"));
    let (handler, mut rx) = ChannelHandler::new();
    let search = {
        let store = store.clone();
        tokio::spawn(async move {
            store.search(Query::monitor(), handler, CancellationToken::new()).await
        })
    };

    store.publish(Trace::new("t"));
    assert_eq!(timeout(WAIT_TIMEOUT, rx.recv()).await.unwrap().unwrap().id, "t");

    store.terminate("backend gone");
    let result = timeout(WAIT_TIMEOUT, search).await.unwrap().unwrap();
    match result {
        Err(Error::Manager { stream, message }) => {
            assert_eq!(stream, "trace");
            assert_eq!(message, "backend gone");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_search_on_terminated_store_fails_immediately() {
    let store = LocalStore::<Trace>::new("trace");
    store.terminate("down");

    let (handler, _rx) = ChannelHandler::new();
    let result = store.search(Query::monitor(), handler, CancellationToken::new()).await;
    assert!(matches!(result, Err(Error::Manager { .. })));
}

#[tokio::test]
async fn test_handler_error_ends_search() {
    let store = LocalStore::<Device>::new("devices");
    store.publish(Device::new("1"));
    store.publish(Device::new("2"));

    let limited = LimitedHandler::new(1);
    let handler: Handler<Device> = limited.clone();
    let result = store.search(Query::monitor(), handler, CancellationToken::new()).await;

    assert!(matches!(result, Err(Error::Handler(_))));
    assert_eq!(limited.seen(), 2);
}

#[tokio::test]
async fn test_lagging_search_replays_full_contents() {
    let store = Arc::new(LocalStore::<Device>::with_capacity("devices", 2));
    let (handler, mut rx) = ChannelHandler::new();
    let token = CancellationToken::new();

    // hold the search back by publishing before it polls the change stream
    let search = {
        let store = store.clone();
        let token = token.clone();
        tokio::spawn(async move { store.search(Query::monitor(), handler, token).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    for i in 0..10 {
        store.publish(Device::new(i.to_string()));
    }

    let mut seen = std::collections::HashSet::new();
    while seen.len() < 10 {
        let device = timeout(WAIT_TIMEOUT, rx.recv()).await.unwrap().unwrap();
        seen.insert(device.id);
    }

    token.cancel();
    assert!(timeout(WAIT_TIMEOUT, search).await.unwrap().unwrap().is_ok());
}

#[tokio::test]
async fn test_local_job_manager_streams_are_independent() {
    let job = LocalJobManager::new();
    job.devices.publish(Device::new("d"));
    job.workers.publish(Worker::new("w"));

    let (devices, mut device_rx) = ChannelHandler::<Device>::new();
    let (workers, mut worker_rx) = ChannelHandler::<Worker>::new();
    Search::<Device>::search(&job, Query::all(), devices, CancellationToken::new())
        .await
        .unwrap();
    Search::<Worker>::search(&job, Query::all(), workers, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(device_rx.try_recv().unwrap().id, "d");
    assert!(device_rx.try_recv().is_err());
    assert_eq!(worker_rx.try_recv().unwrap().id, "w");
}

#[test]
fn test_managers_present_lists_only_set_entries() {
    let managers = Managers::new()
        .with_job(Arc::new(LocalJobManager::new()))
        .with_trace(Arc::new(LocalStore::<Trace>::new("trace")));

    assert_eq!(managers.present(), vec!["job", "trace"]);
    assert!(!managers.is_empty());
    assert!(Managers::default().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_terminate_racing_search_start_always_ends_search() {
    for i in 0..200 {
        let store = Arc::new(LocalStore::<Trace>::new("trace"));
        let (handler, _rx) = ChannelHandler::new();
        let search = {
            let store = store.clone();
            tokio::spawn(async move {
                store.search(Query::monitor(), handler, CancellationToken::new()).await
            })
        };
        if i % 2 == 0 {
            tokio::task::yield_now().await;
        }
        store.terminate("gone");

        let result = timeout(WAIT_TIMEOUT, search).await.unwrap().unwrap();
        assert!(matches!(result, Err(Error::Manager { .. })), "round {i}: {result:?}");
    }
}
