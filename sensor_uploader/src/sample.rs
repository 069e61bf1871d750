/// Offset added to every capture timestamp, in seconds.
///
/// Kept at the value the deployed collectors have always used; the server
/// side interprets `time` with this shift applied.
pub const DEFAULT_TIMESTAMP_OFFSET_SECS: i64 = 7200;

/// One timestamped measurement captured while collecting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRecord {
    time: i64,
    acc_x: f32,
    acc_y: f32,
    acc_z: f32,
    lat: f32,
    lon: f32,
    vertical_acc: f32,
}

impl SampleRecord {
    pub fn new(
        time: i64,
        acc_x: f32,
        acc_y: f32,
        acc_z: f32,
        lat: f32,
        lon: f32,
        vertical_acc: f32,
    ) -> Self {
        Self {
            time,
            acc_x,
            acc_y,
            acc_z,
            lat,
            lon,
            vertical_acc,
        }
    }

    /// Capture time in seconds since epoch (offset already applied)
    pub fn time(&self) -> i64 {
        self.time
    }

    pub fn acc_x(&self) -> f32 {
        self.acc_x
    }

    pub fn acc_y(&self) -> f32 {
        self.acc_y
    }

    pub fn acc_z(&self) -> f32 {
        self.acc_z
    }

    pub fn lat(&self) -> f32 {
        self.lat
    }

    pub fn lon(&self) -> f32 {
        self.lon
    }

    pub fn vertical_acc(&self) -> f32 {
        self.vertical_acc
    }

    /// Euclidean norm of the linear acceleration. Not part of the upload.
    pub fn acc_magnitude(&self) -> f32 {
        (self.acc_x * self.acc_x + self.acc_y * self.acc_y + self.acc_z * self.acc_z).sqrt()
    }
}
