// Sensor Uploader
// Vertical-acceleration sampling, gated collection and batch upload over HTTP/JSON

pub mod clock;
pub mod collector;
pub mod config;
pub mod device;
pub mod error;
pub mod gravity;
pub mod logger;
pub mod notification;
pub mod payload;
pub mod physics;
pub mod receiver;
pub mod sample;
pub mod sensors;
pub mod session;
pub mod types;
pub mod upload;

pub use collector::{Collector, CollectorHandle, CollectorSettings, CollectorStatus, Command};
pub use config::{ConfigError, UploaderConfig};
pub use error::{UResult, UploaderError};
pub use notification::{Notification, SendFailure};
pub use payload::{NonFinitePolicy, UploadPayload, WireRecord};
pub use sample::SampleRecord;
pub use session::{CollectionBuffer, CollectionState};
pub use types::{LiveReadout, LocationFix, SensorEvent};
pub use upload::UploadClient;
