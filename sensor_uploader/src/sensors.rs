use serde_json::Value;
use std::future::Future;
use tokio::process;
use tokio::time::{interval, Duration};

use crate::collector::{Command, CollectorHandle};
use crate::error::{UResult, UploaderError};
use crate::types::{LocationFix, SensorEvent};

/// Where host sensor readings come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorSource {
    /// Termux:API (`termux-sensor`, `termux-location`)
    Termux,
    /// Synthetic readings for desktop runs
    Mock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VectorSensor {
    LinearAcceleration,
    Gravity,
}

impl VectorSensor {
    fn termux_name(self) -> &'static str {
        match self {
            VectorSensor::LinearAcceleration => "Linear Acceleration",
            VectorSensor::Gravity => "Gravity",
        }
    }

    fn event(self, [x, y, z]: [f32; 3]) -> SensorEvent {
        match self {
            VectorSensor::LinearAcceleration => SensorEvent::LinearAcceleration { x, y, z },
            VectorSensor::Gravity => SensorEvent::Gravity { x, y, z },
        }
    }
}

/// Consecutive empty reads before a source that never produced a value
/// is treated as absent
const MAX_EMPTY_READS: u32 = 10;

pub async fn linear_acceleration_loop(handle: CollectorHandle, source: SensorSource, interval_ms: u64) {
    vector_loop(handle, VectorSensor::LinearAcceleration, source, interval_ms).await
}

pub async fn gravity_loop(handle: CollectorHandle, source: SensorSource, interval_ms: u64) {
    vector_loop(handle, VectorSensor::Gravity, source, interval_ms).await
}

async fn vector_loop(handle: CollectorHandle, sensor: VectorSensor, source: SensorSource, interval_ms: u64) {
    match source {
        SensorSource::Mock => {
            let mut tick = 0u64;
            run_vector_source(handle, sensor, interval_ms, move || {
                tick += 1;
                let t = tick as f32 * interval_ms as f32 / 1000.0;
                async move { Ok(Some(mock_vector(sensor, t))) }
            })
            .await
        }
        SensorSource::Termux => {
            run_vector_source(handle, sensor, interval_ms, move || read_termux_sensor(sensor.termux_name())).await
        }
    }
}

async fn run_vector_source<F, Fut>(handle: CollectorHandle, sensor: VectorSensor, interval_ms: u64, mut read: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = UResult<Option<[f32; 3]>>>,
{
    let mut interval = interval(Duration::from_millis(interval_ms));
    let mut started = false;
    let mut empty_reads = 0u32;
    let mut sample_count = 0u64;

    loop {
        interval.tick().await;

        let values = match read().await {
            Ok(Some(values)) => values,
            Ok(None) => {
                empty_reads += 1;
                if !started && empty_reads >= MAX_EMPTY_READS {
                    let err = UploaderError::SensorUnavailable(format!(
                        "{}: no readings after {} attempts",
                        sensor.termux_name(),
                        MAX_EMPTY_READS
                    ));
                    report_sensor_absent(&handle, err).await;
                    return;
                }
                continue;
            }
            Err(e) if !started => {
                report_sensor_absent(&handle, e).await;
                return;
            }
            Err(e) => {
                log::debug!("[{}] read failed: {}", sensor.termux_name(), e);
                continue;
            }
        };
        started = true;
        empty_reads = 0;

        if handle.push_event(sensor.event(values)) {
            sample_count += 1;
            if sample_count % 500 == 0 {
                log::debug!("[{}] {} samples", sensor.termux_name(), sample_count);
            }
        } else if handle.is_closed() {
            log::info!("[{}] Collector gone after {} samples", sensor.termux_name(), sample_count);
            break;
        }
    }
}

/// Both motion sensors are required: losing either disables sample processing
async fn report_sensor_absent(handle: &CollectorHandle, err: UploaderError) {
    log::warn!("{}, stream not started", err);
    if handle.command(Command::SensorsAvailable(false)).await.is_err() {
        log::debug!("Collector gone before sensor absence could be reported");
    }
}

pub async fn location_loop(handle: CollectorHandle, source: SensorSource, interval_ms: u64) {
    let mut interval = interval(Duration::from_millis(interval_ms));
    let mut fix_count = 0u64;
    let mut empty_reads = 0u32;

    loop {
        interval.tick().await;

        let fix = match source {
            SensorSource::Mock => mock_location(fix_count),
            SensorSource::Termux => match read_termux_location().await {
                Ok(Some(fix)) => fix,
                Ok(None) => {
                    empty_reads += 1;
                    if fix_count == 0 && empty_reads >= MAX_EMPTY_READS {
                        // Samples keep the (0, 0) default location
                        log::warn!("[location] no fix after {} attempts, stream not started", MAX_EMPTY_READS);
                        return;
                    }
                    continue;
                }
                Err(e) => {
                    log::warn!("{}, stream not started", e);
                    return;
                }
            },
        };
        empty_reads = 0;

        if handle.push_event(SensorEvent::Location(fix)) {
            fix_count += 1;
            log::trace!("[location] fix {} at {:.5},{:.5}", fix_count, fix.latitude, fix.longitude);
        } else if handle.is_closed() {
            log::info!("[location] Collector gone after {} fixes", fix_count);
            break;
        }
    }
}

async fn read_termux_sensor(name: &str) -> UResult<Option<[f32; 3]>> {
    let output = process::Command::new("termux-sensor")
        .args(["-n", "1", "-s", name])
        .output()
        .await
        .map_err(|e| UploaderError::SensorUnavailable(format!("{}: {}", name, e)))?;
    Ok(parse_sensor_output(&String::from_utf8_lossy(&output.stdout)))
}

async fn read_termux_location() -> UResult<Option<LocationFix>> {
    let output = process::Command::new("termux-location")
        .args(["-p", "gps", "-r", "once"])
        .output()
        .await
        .map_err(|e| UploaderError::SensorUnavailable(format!("location: {}", e)))?;
    Ok(parse_location_output(&String::from_utf8_lossy(&output.stdout)))
}

/// Extract the first `values` triple from termux-sensor JSON output.
///
/// Example: `{"LSM6DSO Linear Acceleration": {"values": [0.1, -0.2, 0.05]}}`
pub fn parse_sensor_output(output: &str) -> Option<[f32; 3]> {
    let json: Value = serde_json::from_str(output.trim()).ok()?;

    json.as_object()?.values().find_map(|sensor| {
        let values = sensor.get("values")?.as_array()?;
        if values.len() < 3 {
            return None;
        }
        Some([
            values[0].as_f64()? as f32,
            values[1].as_f64()? as f32,
            values[2].as_f64()? as f32,
        ])
    })
}

/// Example: `{"latitude": 52.37, "longitude": 4.89, "altitude": 3.0, ...}`
pub fn parse_location_output(output: &str) -> Option<LocationFix> {
    let json: Value = serde_json::from_str(output.trim()).ok()?;
    Some(LocationFix::new(
        json.get("latitude")?.as_f64()?,
        json.get("longitude")?.as_f64()?,
    ))
}

fn mock_vector(sensor: VectorSensor, t: f32) -> [f32; 3] {
    use std::f32::consts::PI;

    match sensor {
        // Walking-like bounce along gravity plus slight sway
        VectorSensor::LinearAcceleration => [
            (t * 2.0 * PI).sin() * 0.3,
            (t * 2.0 * PI).cos() * 0.2,
            (t * 4.0 * PI).sin() * 1.5,
        ],
        // Phone held slightly tilted
        VectorSensor::Gravity => [0.4, 1.2 + (t * 0.2).sin() * 0.05, 9.72],
    }
}

fn mock_location(seq: u64) -> LocationFix {
    let seq = seq as f64;
    LocationFix::new(37.7749 + seq * 0.00001, -122.4194 + seq * 0.00001)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::collector::{Collector, CollectorSettings};
    use crate::device::StaticDeviceId;
    use crate::upload::UploadClient;
    use std::sync::Arc;

    #[test]
    fn test_parse_sensor_output() {
        let output = r#"{
  "LSM6DSO Linear Acceleration": {
    "values": [0.125, -0.5, 9.75]
  }
}"#;
        assert_eq!(parse_sensor_output(output), Some([0.125, -0.5, 9.75]));
    }

    #[test]
    fn test_parse_sensor_output_rejects_garbage() {
        assert_eq!(parse_sensor_output(""), None);
        assert_eq!(parse_sensor_output("{}"), None);
        assert_eq!(parse_sensor_output(r#"{"Gravity": {"values": [1.0]}}"#), None);
    }

    #[test]
    fn test_parse_location_output() {
        let output = r#"{"latitude": 52.3702, "longitude": 4.8952, "altitude": 2.0, "accuracy": 8.0}"#;
        assert_eq!(parse_location_output(output), Some(LocationFix::new(52.3702, 4.8952)));
        assert_eq!(parse_location_output(r#"{"latitude": 1.0}"#), None);
    }

    #[test]
    fn test_mock_gravity_is_nonzero() {
        let [x, y, z] = mock_vector(VectorSensor::Gravity, 0.0);
        assert!((x * x + y * y + z * z).sqrt() > 9.0);
    }

    fn spawn_collector() -> (CollectorHandle, tokio::task::JoinHandle<()>) {
        let client = UploadClient::new("http://127.0.0.1:9/submit_data").unwrap();
        let (collector, handle, _notifications) = Collector::new(
            CollectorSettings::default(),
            client,
            Arc::new(StaticDeviceId::new("host")),
            Box::new(FixedClock(0)),
        );
        (handle, collector.spawn())
    }

    #[tokio::test]
    async fn test_silent_gravity_sensor_disables_collection() {
        let (handle, task) = spawn_collector();

        // termux-sensor prints `{}` for a sensor the device lacks
        tokio::time::timeout(
            Duration::from_secs(2),
            run_vector_source(handle.clone(), VectorSensor::Gravity, 1, || async { Ok(None) }),
        )
        .await
        .expect("absent source kept polling");

        handle.start().await.unwrap();
        handle
            .command(Command::Sensor(SensorEvent::LinearAcceleration { x: 0.1, y: 0.2, z: 0.3 }))
            .await
            .unwrap();

        let status = handle.status().await.unwrap();
        assert!(!status.sensors_enabled);
        assert_eq!(status.sample_count, 0);
        assert!(handle.live_readout().is_none());

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_sensor_binary_disables_collection() {
        let (handle, task) = spawn_collector();

        run_vector_source(handle.clone(), VectorSensor::LinearAcceleration, 1, || async {
            Err(UploaderError::SensorUnavailable("Linear Acceleration: not found".to_string()))
        })
        .await;

        let status = handle.status().await.unwrap();
        assert!(!status.sensors_enabled);

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_sporadic_empty_reads_keep_stream_running() {
        let (handle, task) = spawn_collector();

        let mut calls = 0u32;
        let source = run_vector_source(handle.clone(), VectorSensor::Gravity, 1, move || {
            calls += 1;
            let call = calls;
            async move {
                if call <= 3 {
                    Ok(None)
                } else {
                    Ok(Some([0.0, 0.0, 9.8]))
                }
            }
        });
        assert!(tokio::time::timeout(Duration::from_millis(200), source).await.is_err());

        let status = handle.status().await.unwrap();
        assert!(status.sensors_enabled);
        assert_eq!(status.gravity, [0.0, 0.0, 9.8]);

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_mock_loops_feed_collector() {
        let client = UploadClient::new("http://127.0.0.1:9/submit_data").unwrap();
        let (collector, handle, _notifications) = Collector::new(
            CollectorSettings::default(),
            client,
            Arc::new(StaticDeviceId::new("mock")),
            Box::new(FixedClock(0)),
        );
        let task = collector.spawn();

        let gravity = tokio::spawn(gravity_loop(handle.clone(), SensorSource::Mock, 5));
        let linear = tokio::spawn(linear_acceleration_loop(handle.clone(), SensorSource::Mock, 5));
        let mut updates = handle.readout_updates();

        tokio::time::timeout(Duration::from_secs(2), updates.changed())
            .await
            .expect("no readout within 2s")
            .unwrap();
        assert!(handle.live_readout().is_some());

        gravity.abort();
        linear.abort();
        drop(updates);
        drop(handle);
        let _ = task.await;
    }
}
