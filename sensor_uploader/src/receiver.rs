//! Reference collection endpoint.
//!
//! Accepts `POST /submit_data` with the upload document, decodes it and
//! answers 200. Used by the `receiver` binary and by the integration tests
//! to check what actually went over the wire.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use crate::payload::UploadPayload;

pub const SUBMIT_PATH: &str = "/submit_data";

#[derive(Clone, Debug)]
pub struct ReceiverState {
    batches: Arc<Mutex<Vec<UploadPayload>>>,
    response: StatusCode,
}

impl ReceiverState {
    pub fn new() -> Self {
        Self::responding_with(StatusCode::OK)
    }

    /// Decode and keep batches, but answer with `status`
    pub fn responding_with(status: StatusCode) -> Self {
        ReceiverState {
            batches: Arc::new(Mutex::new(Vec::new())),
            response: status,
        }
    }

    /// Every batch received so far, in arrival order
    pub fn batches(&self) -> Vec<UploadPayload> {
        self.batches.lock().map(|b| b.clone()).unwrap_or_default()
    }

    fn record(&self, payload: UploadPayload) {
        if let Ok(mut batches) = self.batches.lock() {
            batches.push(payload);
        }
    }
}

impl Default for ReceiverState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn router(state: ReceiverState) -> Router {
    Router::new()
        .route(SUBMIT_PATH, post(submit_data))
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: ReceiverState) -> std::io::Result<()> {
    axum::serve(listener, router(state)).await
}

async fn submit_data(State(state): State<ReceiverState>, Json(payload): Json<UploadPayload>) -> StatusCode {
    let non_finite = null_reading_count(&payload);

    let peak = payload
        .samples()
        .iter()
        .map(|s| s.acc_magnitude())
        .filter(|m| m.is_finite())
        .fold(0.0f32, f32::max);

    log::info!(
        "Received {} samples from {} ({} with null readings, peak |acc| {:.2} m/s²)",
        payload.data.len(),
        payload.device_id,
        non_finite,
        peak
    );

    state.record(payload);
    state.response
}

/// Records with at least one `null` field
fn null_reading_count(payload: &UploadPayload) -> usize {
    payload
        .data
        .iter()
        .filter(|r| {
            [r.accx, r.accy, r.accz, r.lat, r.lon, r.vert_acc]
                .iter()
                .any(Option::is_none)
        })
        .count()
}
