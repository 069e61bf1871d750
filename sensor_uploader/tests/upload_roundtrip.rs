//! End-to-end uploads against the in-process reference receiver.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;

use sensor_uploader::clock::FixedClock;
use sensor_uploader::device::StaticDeviceId;
use sensor_uploader::receiver::{self, ReceiverState, SUBMIT_PATH};
use sensor_uploader::{
    Collector, CollectorHandle, CollectorSettings, Command, LocationFix, NonFinitePolicy, Notification, SendFailure,
    SensorEvent, UploadClient,
};

const NOW: i64 = 1_700_000_000;

async fn spawn_receiver(state: ReceiverState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(receiver::serve(listener, state));
    format!("http://{}{}", addr, SUBMIT_PATH)
}

fn start_collector(
    endpoint: &str,
    settings: CollectorSettings,
) -> (CollectorHandle, UnboundedReceiver<Notification>, tokio::task::JoinHandle<()>) {
    let client = UploadClient::new(endpoint).unwrap();
    let (collector, handle, notifications) = Collector::new(
        settings,
        client,
        Arc::new(StaticDeviceId::new("phone-1")),
        Box::new(FixedClock(NOW)),
    );
    let task = collector.spawn();
    (handle, notifications, task)
}

async fn push(handle: &CollectorHandle, event: SensorEvent) {
    handle.command(Command::Sensor(event)).await.unwrap();
}

async fn linear(handle: &CollectorHandle, x: f32, y: f32, z: f32) {
    push(handle, SensorEvent::LinearAcceleration { x, y, z }).await;
}

/// Skip start/stop notices and return the first send outcome
async fn next_send_outcome(notifications: &mut UnboundedReceiver<Notification>) -> Notification {
    loop {
        let notification = tokio::time::timeout(Duration::from_secs(5), notifications.recv())
            .await
            .expect("no notification within 5s")
            .expect("collector closed");
        match notification {
            Notification::SendSucceeded | Notification::SendFailed(_) => return notification,
            _ => continue,
        }
    }
}

#[tokio::test]
async fn test_collected_samples_reach_endpoint() {
    let state = ReceiverState::new();
    let endpoint = spawn_receiver(state.clone()).await;
    let (handle, mut notifications, task) = start_collector(&endpoint, CollectorSettings::default());

    push(&handle, SensorEvent::Gravity { x: 0.0, y: 0.0, z: 9.8 }).await;
    push(&handle, SensorEvent::Location(LocationFix::new(52.5, 13.25))).await;
    handle.start().await.unwrap();
    linear(&handle, 0.0, 0.0, 9.8).await;
    linear(&handle, 1.0, 0.0, 0.0).await;
    linear(&handle, 0.0, 0.5, -2.0).await;
    handle.stop().await.unwrap();
    handle.send().await.unwrap();

    assert_eq!(next_send_outcome(&mut notifications).await, Notification::SendSucceeded);

    let batches = state.batches();
    assert_eq!(batches.len(), 1);
    let batch = &batches[0];
    assert_eq!(batch.device_id, "phone-1");
    assert_eq!(batch.data.len(), 3);
    assert!(batch.data.iter().all(|r| r.time == NOW + 7200));
    assert_eq!(batch.data[0].lat, Some(52.5));
    assert_eq!(batch.data[0].lon, Some(13.25));
    assert_eq!(batch.data[2].accz, Some(-2.0));

    let vertical = batch.data[2].vert_acc.unwrap();
    assert!((vertical + 2.0).abs() < 1e-5);

    drop(handle);
    task.await.unwrap();
}

#[tokio::test]
async fn test_empty_buffer_sends_empty_data() {
    let state = ReceiverState::new();
    let endpoint = spawn_receiver(state.clone()).await;
    let (handle, mut notifications, task) = start_collector(&endpoint, CollectorSettings::default());

    handle
        .command(Command::Send {
            device_id: Some("override-id".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(next_send_outcome(&mut notifications).await, Notification::SendSucceeded);

    let batches = state.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].device_id, "override-id");
    assert!(batches[0].data.is_empty());

    drop(handle);
    task.await.unwrap();
}

#[tokio::test]
async fn test_non_200_reports_failure() {
    let state = ReceiverState::responding_with(StatusCode::INTERNAL_SERVER_ERROR);
    let endpoint = spawn_receiver(state.clone()).await;
    let (handle, mut notifications, task) = start_collector(&endpoint, CollectorSettings::default());

    handle.send().await.unwrap();

    let outcome = next_send_outcome(&mut notifications).await;
    assert_eq!(outcome, Notification::SendFailed(SendFailure::Status(500)));
    assert_eq!(outcome.message(), "Failed to send data");

    // The body still arrived and decoded
    assert_eq!(state.batches().len(), 1);

    drop(handle);
    task.await.unwrap();
}

#[tokio::test]
async fn test_created_is_not_success() {
    let state = ReceiverState::responding_with(StatusCode::CREATED);
    let endpoint = spawn_receiver(state).await;
    let (handle, mut notifications, task) = start_collector(&endpoint, CollectorSettings::default());

    handle.send().await.unwrap();
    assert_eq!(
        next_send_outcome(&mut notifications).await,
        Notification::SendFailed(SendFailure::Status(201))
    );

    drop(handle);
    task.await.unwrap();
}

#[tokio::test]
async fn test_unreachable_endpoint_reports_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let endpoint = format!("http://127.0.0.1:{}{}", port, SUBMIT_PATH);
    let (handle, mut notifications, task) = start_collector(&endpoint, CollectorSettings::default());

    handle.send().await.unwrap();

    let outcome = next_send_outcome(&mut notifications).await;
    assert_eq!(outcome, Notification::SendFailed(SendFailure::Transport));
    assert_eq!(outcome.message(), "Error sending data");

    drop(handle);
    task.await.unwrap();
}

#[tokio::test]
async fn test_sample_before_gravity_fails_encoding() {
    let state = ReceiverState::new();
    let endpoint = spawn_receiver(state.clone()).await;
    let (handle, mut notifications, task) = start_collector(&endpoint, CollectorSettings::default());

    handle.start().await.unwrap();
    linear(&handle, 0.1, 0.2, 0.3).await;
    handle.send().await.unwrap();

    let outcome = next_send_outcome(&mut notifications).await;
    assert_eq!(outcome, Notification::SendFailed(SendFailure::Encoding));
    assert_eq!(outcome.message(), "JSON Error");
    assert!(state.batches().is_empty());

    drop(handle);
    task.await.unwrap();
}

#[tokio::test]
async fn test_null_policy_sends_non_finite_as_null() {
    let state = ReceiverState::new();
    let endpoint = spawn_receiver(state.clone()).await;
    let settings = CollectorSettings {
        non_finite: NonFinitePolicy::Null,
        ..CollectorSettings::default()
    };
    let (handle, mut notifications, task) = start_collector(&endpoint, settings);

    handle.start().await.unwrap();
    linear(&handle, 0.1, 0.2, 0.3).await;
    handle.send().await.unwrap();

    assert_eq!(next_send_outcome(&mut notifications).await, Notification::SendSucceeded);

    let batches = state.batches();
    let record = &batches[0].data[0];
    assert_eq!(record.accx, Some(0.1));
    assert_eq!(record.vert_acc, None);
    assert!(record.to_sample().vertical_acc().is_nan());

    drop(handle);
    task.await.unwrap();
}

#[tokio::test]
async fn test_upload_uses_snapshot_taken_at_send() {
    let state = ReceiverState::new();
    let endpoint = spawn_receiver(state.clone()).await;
    let (handle, mut notifications, task) = start_collector(&endpoint, CollectorSettings::default());

    push(&handle, SensorEvent::Gravity { x: 0.0, y: 0.0, z: 9.8 }).await;
    handle.start().await.unwrap();
    linear(&handle, 1.0, 0.0, 0.0).await;
    linear(&handle, 2.0, 0.0, 0.0).await;
    handle.stop().await.unwrap();
    handle.send().await.unwrap();

    // A new session clears the buffer while the upload may still be running
    handle.start().await.unwrap();
    linear(&handle, 9.0, 9.0, 9.0).await;

    assert_eq!(next_send_outcome(&mut notifications).await, Notification::SendSucceeded);

    let batches = state.batches();
    let xs: Vec<Option<f32>> = batches[0].data.iter().map(|r| r.accx).collect();
    assert_eq!(xs, vec![Some(1.0), Some(2.0)]);

    let status = handle.status().await.unwrap();
    assert_eq!(status.sample_count, 1);

    drop(handle);
    task.await.unwrap();
}
