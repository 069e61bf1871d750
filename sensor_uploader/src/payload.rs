use crate::error::{UResult, UploaderError};
use crate::sample::SampleRecord;
use serde::{Deserialize, Serialize};

/// How non-finite floats (NaN, ±Infinity) are written to the upload document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonFinitePolicy {
    /// Abort encoding with `UploaderError::NonFiniteValue`
    #[default]
    Reject,
    /// Write the field as JSON `null`
    Null,
}

/// One sample as it appears on the wire. `None` is a non-finite reading
/// written as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRecord {
    pub time: i64,
    pub accx: Option<f32>,
    pub accy: Option<f32>,
    pub accz: Option<f32>,
    pub lat: Option<f32>,
    pub lon: Option<f32>,
    #[serde(rename = "vertAcc")]
    pub vert_acc: Option<f32>,
}

impl WireRecord {
    fn encode(index: usize, record: &SampleRecord, policy: NonFinitePolicy) -> UResult<Self> {
        let field = |name: &'static str, value: f32| -> UResult<Option<f32>> {
            if value.is_finite() {
                return Ok(Some(value));
            }
            match policy {
                NonFinitePolicy::Reject => Err(UploaderError::NonFiniteValue { index, field: name }),
                NonFinitePolicy::Null => Ok(None),
            }
        };

        Ok(WireRecord {
            time: record.time(),
            accx: field("accx", record.acc_x())?,
            accy: field("accy", record.acc_y())?,
            accz: field("accz", record.acc_z())?,
            lat: field("lat", record.lat())?,
            lon: field("lon", record.lon())?,
            vert_acc: field("vertAcc", record.vertical_acc())?,
        })
    }

    /// Convert back to a sample; `null` fields become NaN
    pub fn to_sample(&self) -> SampleRecord {
        let value = |v: Option<f32>| v.unwrap_or(f32::NAN);
        SampleRecord::new(
            self.time,
            value(self.accx),
            value(self.accy),
            value(self.accz),
            value(self.lat),
            value(self.lon),
            value(self.vert_acc),
        )
    }
}

/// Upload document: device identifier plus the buffered samples in capture order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPayload {
    pub device_id: String,
    pub data: Vec<WireRecord>,
}

impl UploadPayload {
    pub fn build(device_id: &str, records: &[SampleRecord], policy: NonFinitePolicy) -> UResult<Self> {
        let data = records
            .iter()
            .enumerate()
            .map(|(index, record)| WireRecord::encode(index, record, policy))
            .collect::<UResult<Vec<_>>>()?;

        Ok(UploadPayload {
            device_id: device_id.to_string(),
            data,
        })
    }

    /// Serialize to compact JSON bytes (request body)
    pub fn to_json_bytes(&self) -> UResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a request body produced by `to_json_bytes`
    pub fn from_json_slice(bytes: &[u8]) -> UResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn samples(&self) -> Vec<SampleRecord> {
        self.data.iter().map(WireRecord::to_sample).collect()
    }
}

/// Build and serialize the upload document in one step
pub fn encode_upload(device_id: &str, records: &[SampleRecord], policy: NonFinitePolicy) -> UResult<Vec<u8>> {
    UploadPayload::build(device_id, records, policy)?.to_json_bytes()
}
