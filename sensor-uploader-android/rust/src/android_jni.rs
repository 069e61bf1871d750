use crate::error::{throw_java_exception, BResult, BridgeError};
use jni::objects::{JClass, JString};
use jni::sys::{jboolean, jdouble, jfloat, jfloatArray, jint, jstring, JNI_TRUE};
use jni::JNIEnv;
use sensor_uploader::clock::SystemClock;
use sensor_uploader::device;
use sensor_uploader::{
    Collector, CollectorHandle, CollectorSettings, Command, LiveReadout, LocationFix, Notification, SensorEvent,
    UploadClient, UploaderConfig,
};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Runtime;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

// Global bridge - stored as static to persist across JNI calls.
// The runtime outlives every bridge so retired collectors can finish their uploads.
lazy_static::lazy_static! {
    static ref GLOBAL_BRIDGE: Mutex<Option<Arc<Bridge>>> = Mutex::new(None);
    static ref RUNTIME: Result<Runtime, String> = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("sensor-uploader")
        .enable_all()
        .build()
        .map_err(|e| e.to_string());
}

fn runtime() -> BResult<&'static Runtime> {
    RUNTIME
        .as_ref()
        .map_err(|e| BridgeError::Internal(format!("Failed to start runtime: {}", e)))
}

/// Collector on the shared runtime, driven from Java threads
pub struct Bridge {
    handle: CollectorHandle,
    /// Oldest first; receivers of replaced collectors stay until drained
    notifications: Mutex<Vec<UnboundedReceiver<Notification>>>,
    _collector: JoinHandle<()>,
}

impl Bridge {
    pub fn new(config: &UploaderConfig) -> BResult<Self> {
        config.validate()?;

        let client = UploadClient::new(&config.endpoint)?;
        let (collector, handle, notifications) = Collector::new(
            CollectorSettings::from(config),
            client,
            device::provider_for(config),
            Box::new(SystemClock),
        );
        let collector_task = runtime()?.spawn(collector.run());

        Ok(Bridge {
            handle,
            notifications: Mutex::new(vec![notifications]),
            _collector: collector_task,
        })
    }

    pub fn start(&self) -> BResult<()> {
        Ok(self.handle.blocking_command(Command::Start)?)
    }

    pub fn stop(&self) -> BResult<()> {
        Ok(self.handle.blocking_command(Command::Stop)?)
    }

    /// Sensor callbacks never block; events are dropped under backpressure
    pub fn push(&self, event: SensorEvent) -> bool {
        self.handle.push_event(event)
    }

    pub fn set_sensors_available(&self, enabled: bool) -> BResult<()> {
        Ok(self.handle.blocking_command(Command::SensorsAvailable(enabled))?)
    }

    pub fn send(&self, device_id: Option<String>) -> BResult<()> {
        Ok(self.handle.blocking_command(Command::Send { device_id })?)
    }

    pub fn live_readout(&self) -> Option<LiveReadout> {
        self.handle.live_readout()
    }

    pub fn poll_notification(&self) -> BResult<Option<Notification>> {
        let mut receivers = self.lock_notifications()?;

        let mut next = None;
        receivers.retain_mut(|rx| {
            if next.is_some() {
                return true;
            }
            match rx.try_recv() {
                Ok(notification) => {
                    next = Some(notification);
                    true
                }
                Err(TryRecvError::Empty) => true,
                Err(TryRecvError::Disconnected) => false,
            }
        });
        Ok(next)
    }

    pub fn sample_count(&self) -> BResult<usize> {
        Ok(self.handle.blocking_status()?.sample_count)
    }

    /// Take over the pending notifications of a replaced bridge
    fn adopt_notifications(&self, previous: &Bridge) -> BResult<()> {
        let mut inherited = std::mem::take(&mut *previous.lock_notifications()?);
        let mut receivers = self.lock_notifications()?;
        inherited.append(&mut receivers);
        *receivers = inherited;
        Ok(())
    }

    fn lock_notifications(&self) -> BResult<MutexGuard<'_, Vec<UnboundedReceiver<Notification>>>> {
        self.notifications
            .lock()
            .map_err(|_| BridgeError::Internal("Failed to acquire notification lock".to_string()))
    }
}

/// Install a new bridge. The previous collector keeps running until its
/// in-flight uploads finish; their outcomes are still delivered.
fn replace_bridge(config: &UploaderConfig) -> BResult<()> {
    let bridge = Bridge::new(config)?;

    let previous = {
        let mut guard = GLOBAL_BRIDGE
            .lock()
            .map_err(|_| BridgeError::Internal("Failed to acquire global bridge lock".to_string()))?;
        let previous = guard.take();
        if let Some(previous) = &previous {
            bridge.adopt_notifications(previous)?;
        }
        *guard = Some(Arc::new(bridge));
        previous
    };
    drop(previous);

    Ok(())
}

/// Get or create the bridge with default settings
fn get_bridge() -> BResult<Arc<Bridge>> {
    let mut guard = GLOBAL_BRIDGE
        .lock()
        .map_err(|_| BridgeError::Internal("Failed to acquire global bridge lock".to_string()))?;

    match guard.as_ref() {
        Some(bridge) => Ok(Arc::clone(bridge)),
        None => {
            let bridge = Arc::new(Bridge::new(&UploaderConfig::default())?);
            *guard = Some(Arc::clone(&bridge));
            Ok(bridge)
        }
    }
}

fn status_code(env: &mut JNIEnv, result: BResult<()>) -> jint {
    match result {
        Ok(()) => 0,
        Err(e) => {
            let _ = throw_java_exception(env, &e);
            -1
        }
    }
}

fn new_java_string(env: &mut JNIEnv, value: &str) -> jstring {
    match env.new_string(value) {
        Ok(jstr) => jstr.into_raw(),
        Err(_) => {
            let _ = throw_java_exception(env, &BridgeError::Jni("Failed to create Java string".to_string()));
            std::ptr::null_mut()
        }
    }
}

/// JNI: Replace the collector with one posting to `endpoint`.
/// Buffered samples of the previous collector are discarded; its uploads complete.
/// Returns: 0 on success, -1 on error (throws Java exception)
#[no_mangle]
pub extern "C" fn Java_com_example_sensoruploader_JniBinding_configure(
    mut env: JNIEnv,
    _class: JClass,
    endpoint: JString,
) -> jint {
    let result = configure_impl(&mut env, &endpoint);
    status_code(&mut env, result)
}

fn configure_impl(env: &mut JNIEnv, endpoint: &JString) -> BResult<()> {
    let endpoint: String = env.get_string(endpoint)?.into();
    let config = UploaderConfig {
        endpoint,
        ..UploaderConfig::default()
    };
    replace_bridge(&config)?;

    log::info!("Collector configured for {}", config.endpoint);
    Ok(())
}

/// JNI: Start button
/// Returns: 0 on success, -1 on error (throws Java exception)
#[no_mangle]
pub extern "C" fn Java_com_example_sensoruploader_JniBinding_startCollection(
    mut env: JNIEnv,
    _class: JClass,
) -> jint {
    let result = get_bridge().and_then(|bridge| bridge.start());
    status_code(&mut env, result)
}

/// JNI: Stop button
/// Returns: 0 on success, -1 on error (throws Java exception)
#[no_mangle]
pub extern "C" fn Java_com_example_sensoruploader_JniBinding_stopCollection(
    mut env: JNIEnv,
    _class: JClass,
) -> jint {
    let result = get_bridge().and_then(|bridge| bridge.stop());
    status_code(&mut env, result)
}

/// JNI: Linear acceleration callback (m/s², gravity removed)
/// Returns: 1 if queued, 0 if dropped, -1 on error
#[no_mangle]
pub extern "C" fn Java_com_example_sensoruploader_JniBinding_pushLinearAcceleration(
    mut env: JNIEnv,
    _class: JClass,
    x: jfloat,
    y: jfloat,
    z: jfloat,
) -> jint {
    push_event(&mut env, SensorEvent::LinearAcceleration { x, y, z })
}

/// JNI: Gravity callback (m/s²)
/// Returns: 1 if queued, 0 if dropped, -1 on error
#[no_mangle]
pub extern "C" fn Java_com_example_sensoruploader_JniBinding_pushGravity(
    mut env: JNIEnv,
    _class: JClass,
    x: jfloat,
    y: jfloat,
    z: jfloat,
) -> jint {
    push_event(&mut env, SensorEvent::Gravity { x, y, z })
}

/// JNI: Location callback (degrees)
/// Returns: 1 if queued, 0 if dropped, -1 on error
#[no_mangle]
pub extern "C" fn Java_com_example_sensoruploader_JniBinding_pushLocation(
    mut env: JNIEnv,
    _class: JClass,
    latitude: jdouble,
    longitude: jdouble,
) -> jint {
    push_event(&mut env, SensorEvent::Location(LocationFix::new(latitude, longitude)))
}

fn push_event(env: &mut JNIEnv, event: SensorEvent) -> jint {
    match get_bridge() {
        Ok(bridge) => bridge.push(event) as jint,
        Err(e) => {
            let _ = throw_java_exception(env, &e);
            -1
        }
    }
}

/// JNI: Sensors registered (onResume) or released (onPause)
/// Returns: 0 on success, -1 on error (throws Java exception)
#[no_mangle]
pub extern "C" fn Java_com_example_sensoruploader_JniBinding_setSensorsAvailable(
    mut env: JNIEnv,
    _class: JClass,
    enabled: jboolean,
) -> jint {
    let result = get_bridge().and_then(|bridge| bridge.set_sensors_available(enabled == JNI_TRUE));
    status_code(&mut env, result)
}

/// JNI: Send button. A null `deviceId` falls back to the host identifier.
/// Returns: 0 once the upload is dispatched, -1 on error (throws Java exception)
#[no_mangle]
pub extern "C" fn Java_com_example_sensoruploader_JniBinding_sendData(
    mut env: JNIEnv,
    _class: JClass,
    device_id: JString,
) -> jint {
    let result = send_data_impl(&mut env, &device_id);
    status_code(&mut env, result)
}

fn send_data_impl(env: &mut JNIEnv, device_id: &JString) -> BResult<()> {
    let device_id: Option<String> = if device_id.is_null() {
        None
    } else {
        Some(env.get_string(device_id)?.into())
    };
    get_bridge()?.send(device_id)
}

/// JNI: Latest readout as [accX, accY, accZ, verticalAcc]
/// Returns: jfloatArray, or null before the first reading
#[no_mangle]
pub extern "C" fn Java_com_example_sensoruploader_JniBinding_getLiveReadout(
    mut env: JNIEnv,
    _class: JClass,
) -> jfloatArray {
    match get_live_readout_impl(&mut env) {
        Ok(arr) => arr,
        Err(e) => {
            let _ = throw_java_exception(&mut env, &e);
            std::ptr::null_mut()
        }
    }
}

fn get_live_readout_impl(env: &mut JNIEnv) -> BResult<jfloatArray> {
    let readout = match get_bridge()?.live_readout() {
        Some(readout) => readout,
        None => return Ok(std::ptr::null_mut()),
    };

    let values = [readout.acc_x, readout.acc_y, readout.acc_z, readout.vertical_acc];
    let arr = env.new_float_array(values.len() as i32)?;
    env.set_float_array_region(&arr, 0, &values)?;
    Ok(arr.into_raw())
}

/// JNI: Next pending user message (e.g. "Data sent successfully")
/// Returns: jstring, or null when nothing is pending
#[no_mangle]
pub extern "C" fn Java_com_example_sensoruploader_JniBinding_pollNotification(
    mut env: JNIEnv,
    _class: JClass,
) -> jstring {
    match get_bridge().and_then(|bridge| bridge.poll_notification()) {
        Ok(Some(notification)) => new_java_string(&mut env, notification.message()),
        Ok(None) => std::ptr::null_mut(),
        Err(e) => {
            let _ = throw_java_exception(&mut env, &e);
            std::ptr::null_mut()
        }
    }
}

/// JNI: Number of buffered samples
/// Returns: count, or -1 on error (throws Java exception)
#[no_mangle]
pub extern "C" fn Java_com_example_sensoruploader_JniBinding_getSampleCount(
    mut env: JNIEnv,
    _class: JClass,
) -> jint {
    match get_bridge().and_then(|bridge| bridge.sample_count()) {
        Ok(count) => count.min(i32::MAX as usize) as jint,
        Err(e) => {
            let _ = throw_java_exception(&mut env, &e);
            -1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge() -> Bridge {
        Bridge::new(&UploaderConfig {
            endpoint: "http://127.0.0.1:9/submit_data".to_string(),
            device_id: Some("test-phone".to_string()),
            ..UploaderConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let result = Bridge::new(&UploaderConfig {
            endpoint: "content://nope".to_string(),
            ..UploaderConfig::default()
        });
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_collect_through_bridge() {
        let bridge = bridge();

        bridge.start().unwrap();
        assert!(bridge.push(SensorEvent::Gravity { x: 0.0, y: 0.0, z: 9.8 }));
        assert!(bridge.push(SensorEvent::LinearAcceleration { x: 0.0, y: 0.0, z: 2.0 }));

        // Status is queued behind the events, so both are processed by now
        assert_eq!(bridge.sample_count().unwrap(), 1);

        let readout = bridge.live_readout().unwrap();
        assert_eq!(readout.acc_z, 2.0);
        assert!((readout.vertical_acc - 2.0).abs() < 1e-5);

        assert_eq!(bridge.poll_notification().unwrap(), Some(Notification::CollectionStarted));
        assert_eq!(bridge.poll_notification().unwrap(), None);
    }

    #[test]
    fn test_sensors_unavailable_skips_samples() {
        let bridge = bridge();

        bridge.start().unwrap();
        bridge.set_sensors_available(false).unwrap();
        bridge.push(SensorEvent::Gravity { x: 0.0, y: 0.0, z: 9.8 });
        bridge.push(SensorEvent::LinearAcceleration { x: 1.0, y: 1.0, z: 1.0 });

        assert_eq!(bridge.sample_count().unwrap(), 0);
        assert!(bridge.live_readout().is_none());
    }

    #[test]
    fn test_stop_keeps_samples() {
        let bridge = bridge();

        bridge.start().unwrap();
        bridge.push(SensorEvent::Gravity { x: 0.0, y: 9.8, z: 0.0 });
        bridge.push(SensorEvent::LinearAcceleration { x: 0.0, y: 1.0, z: 0.0 });
        bridge.stop().unwrap();
        bridge.push(SensorEvent::LinearAcceleration { x: 0.0, y: 1.0, z: 0.0 });

        assert_eq!(bridge.sample_count().unwrap(), 1);
    }

    /// Answers one POST with 200 after `delay`
    fn slow_endpoint(delay: std::time::Duration) -> String {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            while !request.ends_with(b"]}") {
                let n = stream.read(&mut chunk).unwrap();
                if n == 0 {
                    return;
                }
                request.extend_from_slice(&chunk[..n]);
            }
            std::thread::sleep(delay);
            let _ = stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
        });
        format!("http://{}/submit_data", addr)
    }

    #[test]
    fn test_reconfigure_lets_running_upload_finish() {
        let endpoint = slow_endpoint(std::time::Duration::from_millis(300));
        replace_bridge(&UploaderConfig {
            endpoint,
            ..UploaderConfig::default()
        })
        .unwrap();

        get_bridge().unwrap().send(Some("test-phone".to_string())).unwrap();

        replace_bridge(&UploaderConfig {
            endpoint: "http://127.0.0.1:9/submit_data".to_string(),
            ..UploaderConfig::default()
        })
        .unwrap();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        let mut outcome = None;
        while outcome.is_none() && std::time::Instant::now() < deadline {
            outcome = get_bridge().unwrap().poll_notification().unwrap();
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        assert_eq!(outcome, Some(Notification::SendSucceeded));
    }
}
