//! Sequential event loop tying the pipeline together.
//!
//! Sensor events, location updates and user commands all arrive as
//! [`Command`] messages on one bounded queue and are handled in order by a
//! single task. Sends run on their own task over an owned snapshot of the
//! buffer, so collection can resume while an upload is in flight.

use std::sync::Arc;

use log::{debug, error, info, trace};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::config::UploaderConfig;
use crate::device::DeviceIdentity;
use crate::error::{UResult, UploaderError};
use crate::gravity::SharedGravity;
use crate::notification::Notification;
use crate::payload::NonFinitePolicy;
use crate::physics::calculate_vertical_acceleration;
use crate::sample::{SampleRecord, DEFAULT_TIMESTAMP_OFFSET_SECS};
use crate::session::{CollectionBuffer, CollectionState};
use crate::types::{vec3, LiveReadout, LocationFix, SensorEvent};
use crate::upload::{self, UploadClient};

/// Messages consumed by the collector
#[derive(Debug)]
pub enum Command {
    Sensor(SensorEvent),
    /// Sensors registered (true) or released (false) by the platform
    SensorsAvailable(bool),
    Start,
    Stop,
    /// Upload a snapshot of the buffer. `device_id` overrides the provider.
    Send { device_id: Option<String> },
    Status(oneshot::Sender<CollectorStatus>),
}

/// Point-in-time view of the collector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollectorStatus {
    pub state: CollectionState,
    pub sample_count: usize,
    pub sensors_enabled: bool,
    pub location: LocationFix,
    pub gravity: [f32; 3],
    pub sends_in_flight: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct CollectorSettings {
    pub timestamp_offset_secs: i64,
    pub non_finite: NonFinitePolicy,
    pub channel_capacity: usize,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            timestamp_offset_secs: DEFAULT_TIMESTAMP_OFFSET_SECS,
            non_finite: NonFinitePolicy::Reject,
            channel_capacity: 500,
        }
    }
}

impl From<&UploaderConfig> for CollectorSettings {
    fn from(config: &UploaderConfig) -> Self {
        Self {
            timestamp_offset_secs: config.timestamp_offset_secs,
            non_finite: config.non_finite,
            channel_capacity: config.channel_capacity,
        }
    }
}

/// Cloneable front end used by sensor sources and the UI shell
#[derive(Clone, Debug)]
pub struct CollectorHandle {
    commands: mpsc::Sender<Command>,
    readout: watch::Receiver<Option<LiveReadout>>,
}

impl CollectorHandle {
    /// Queue a sensor event without waiting. Returns false if it was dropped
    /// because the queue is full or the collector is gone.
    pub fn push_event(&self, event: SensorEvent) -> bool {
        match self.commands.try_send(Command::Sensor(event)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                trace!("Collector queue full, dropping {:?}", event);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// True once the collector task has exited
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    pub async fn command(&self, command: Command) -> UResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| UploaderError::ChannelClosed)
    }

    /// Queue a command from a thread outside the async runtime
    pub fn blocking_command(&self, command: Command) -> UResult<()> {
        self.commands
            .blocking_send(command)
            .map_err(|_| UploaderError::ChannelClosed)
    }

    pub async fn start(&self) -> UResult<()> {
        self.command(Command::Start).await
    }

    pub async fn stop(&self) -> UResult<()> {
        self.command(Command::Stop).await
    }

    pub async fn send(&self) -> UResult<()> {
        self.command(Command::Send { device_id: None }).await
    }

    pub async fn status(&self) -> UResult<CollectorStatus> {
        let (tx, rx) = oneshot::channel();
        self.command(Command::Status(tx)).await?;
        rx.await.map_err(|_| UploaderError::ChannelClosed)
    }

    pub fn blocking_status(&self) -> UResult<CollectorStatus> {
        let (tx, rx) = oneshot::channel();
        self.blocking_command(Command::Status(tx))?;
        rx.blocking_recv().map_err(|_| UploaderError::ChannelClosed)
    }

    /// Latest readout, `None` before the first linear-acceleration event
    pub fn live_readout(&self) -> Option<LiveReadout> {
        *self.readout.borrow()
    }

    /// Receiver notified after every processed linear-acceleration event
    pub fn readout_updates(&self) -> watch::Receiver<Option<LiveReadout>> {
        self.readout.clone()
    }
}

pub struct Collector {
    commands: mpsc::Receiver<Command>,
    buffer: CollectionBuffer,
    gravity: SharedGravity,
    location: LocationFix,
    sensors_enabled: bool,
    settings: CollectorSettings,
    clock: Box<dyn Clock>,
    client: UploadClient,
    device: Arc<dyn DeviceIdentity>,
    notifications: mpsc::UnboundedSender<Notification>,
    readout: watch::Sender<Option<LiveReadout>>,
    in_flight: Vec<JoinHandle<()>>,
}

impl Collector {
    pub fn new(
        settings: CollectorSettings,
        client: UploadClient,
        device: Arc<dyn DeviceIdentity>,
        clock: Box<dyn Clock>,
    ) -> (Self, CollectorHandle, mpsc::UnboundedReceiver<Notification>) {
        let (command_tx, command_rx) = mpsc::channel(settings.channel_capacity.max(1));
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let (readout_tx, readout_rx) = watch::channel(None);

        let collector = Collector {
            commands: command_rx,
            buffer: CollectionBuffer::new(),
            gravity: SharedGravity::new(),
            location: LocationFix::UNKNOWN,
            sensors_enabled: true,
            settings,
            clock,
            client,
            device,
            notifications: notify_tx,
            readout: readout_tx,
            in_flight: Vec::new(),
        };

        let handle = CollectorHandle {
            commands: command_tx,
            readout: readout_rx,
        };

        (collector, handle, notify_rx)
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process commands until every handle is dropped, then wait for
    /// outstanding uploads to report.
    pub async fn run(mut self) {
        info!("Collector running, uploads go to {}", self.client.endpoint());

        while let Some(command) = self.commands.recv().await {
            self.handle_command(command);
        }

        let pending = std::mem::take(&mut self.in_flight);
        if !pending.is_empty() {
            info!("Waiting for {} in-flight upload(s)", pending.len());
        }
        for task in pending {
            let _ = task.await;
        }
        info!("Collector stopped");
    }

    pub fn handle_command(&mut self, command: Command) {
        match command {
            Command::Sensor(event) => self.process_event(event),
            Command::SensorsAvailable(enabled) => {
                if enabled != self.sensors_enabled {
                    info!("Sensors {}", if enabled { "enabled" } else { "disabled" });
                }
                self.sensors_enabled = enabled;
            }
            Command::Start => {
                if self.buffer.start() {
                    info!("Data collection started");
                    self.notify(Notification::CollectionStarted);
                }
            }
            Command::Stop => {
                if self.buffer.stop() {
                    info!("Data collection stopped with {} samples", self.buffer.len());
                    self.notify(Notification::CollectionStopped);
                }
            }
            Command::Send { device_id } => self.dispatch_send(device_id),
            Command::Status(reply) => {
                let _ = reply.send(self.status());
            }
        }
    }

    fn process_event(&mut self, event: SensorEvent) {
        match event {
            SensorEvent::Gravity { x, y, z } => self.gravity.update(x, y, z),
            SensorEvent::Location(fix) => self.location = fix,
            SensorEvent::LinearAcceleration { x, y, z } => {
                if !self.sensors_enabled {
                    return;
                }

                if !self.gravity.is_known() {
                    trace!("No gravity reading yet, vertical acceleration undefined");
                }
                let vertical_acc = calculate_vertical_acceleration(&vec3(x, y, z), &self.gravity.current());
                self.readout.send_replace(Some(LiveReadout {
                    acc_x: x,
                    acc_y: y,
                    acc_z: z,
                    vertical_acc,
                }));

                if self.buffer.is_collecting() {
                    let time = self.clock.epoch_secs() + self.settings.timestamp_offset_secs;
                    self.buffer.append(SampleRecord::new(
                        time,
                        x,
                        y,
                        z,
                        self.location.latitude as f32,
                        self.location.longitude as f32,
                        vertical_acc,
                    ));
                    trace!("Captured sample #{} at {}", self.buffer.len(), time);
                }
            }
        }
    }

    fn dispatch_send(&mut self, device_id: Option<String>) {
        let snapshot = self.buffer.snapshot();
        let device = Arc::clone(&self.device);
        let client = self.client.clone();
        let policy = self.settings.non_finite;
        let notifications = self.notifications.clone();

        debug!("Dispatching upload of {} samples", snapshot.len());

        let task = tokio::spawn(async move {
            // Host lookups may touch the filesystem; keep them off the collector task
            let device_id = device_id.unwrap_or_else(|| device.device_id());
            let result = upload::send_batch(&client, &device_id, &snapshot, policy).await;
            match &result {
                Ok(()) => info!("Sent {} samples for device {}", snapshot.len(), device_id),
                Err(e) => error!("Failed to send {} samples: {}", snapshot.len(), e),
            }
            let _ = notifications.send(Notification::from_send_result(&result));
        });

        self.in_flight.retain(|t| !t.is_finished());
        self.in_flight.push(task);
    }

    fn notify(&self, notification: Notification) {
        // Receiver dropped means nobody is displaying notifications
        let _ = self.notifications.send(notification);
    }

    pub fn status(&self) -> CollectorStatus {
        let gravity = self.gravity.current();
        CollectorStatus {
            state: self.buffer.state(),
            sample_count: self.buffer.len(),
            sensors_enabled: self.sensors_enabled,
            location: self.location,
            gravity: [gravity.x, gravity.y, gravity.z],
            sends_in_flight: self.in_flight.iter().filter(|t| !t.is_finished()).count(),
        }
    }

    pub fn buffer(&self) -> &CollectionBuffer {
        &self.buffer
    }
}
