// Sensor Uploader Android JNI Library
// Exposes the Rust collector to the Android activity via JNI

pub mod android_jni;
pub mod error;

pub use android_jni::Bridge;
pub use error::{BResult, BridgeError};
