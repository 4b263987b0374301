// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-device session state: calibration references, last prediction, and
//! the reflectance normalization applied before inference.

use chrono::TimeZone;
use parking_lot::RwLock;
use thiserror::Error;

use crate::validation::SPECTRUM_LEN;

/// Material classes in inference output order.
const MATERIAL_NAMES: [&str; 3] = ["Polyester", "Cotton", "Wool"];

/// Calibration vector selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    White,
    Dark,
}

#[derive(Debug, Error)]
pub enum LabelDecodeError {
    #[error("inference response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("inference response has no outputs field")]
    MissingOutputs,
}

#[derive(Debug)]
struct SessionState {
    /// UNIX seconds of the last completed measurement round-trip; 0 = never.
    last_update: u64,
    /// Rendered ranked-probability summary; empty until the first prediction.
    predicted_label: String,
    white_reference: Vec<f64>,
    dark_reference: Vec<f64>,
}

/// One session per physical device. Owned by the registry and handed out as
/// `Arc` clones; interior state is last-writer-wins under concurrent
/// calibration (client misuse, not a server invariant).
#[derive(Debug)]
pub struct DeviceSession {
    id: u8,
    state: RwLock<SessionState>,
}

impl DeviceSession {
    pub fn new(id: u8) -> Self {
        Self {
            id,
            state: RwLock::new(SessionState {
                last_update: 0,
                predicted_label: String::new(),
                white_reference: vec![0.0; SPECTRUM_LEN],
                dark_reference: vec![0.0; SPECTRUM_LEN],
            }),
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    /// Replace a calibration reference outright.
    pub fn set_reference(&self, kind: ReferenceKind, vector: Vec<f64>) {
        let mut state = self.state.write();
        match kind {
            ReferenceKind::White => state.white_reference = vector,
            ReferenceKind::Dark => state.dark_reference = vector,
        }
    }

    /// Reflectance normalization: `(raw - dark) / (white - dark)` per
    /// element, then a min-max rescale of the result into `[0, 1]`.
    ///
    /// Uncalibrated or degenerate references produce NaN/Infinity and pass
    /// through untouched: `white == dark` yields NaN or ±∞ at that index, and
    /// a constant reflectance vector rescales to all-NaN (0/0). Operators
    /// calibrate before measuring; nothing here crashes when they don't.
    // TODO: apply Savitzky-Golay smoothing after the reflectance step, with
    // the window/order parameters used by the model training pipeline.
    pub fn normalize(&self, raw: &[f64]) -> Vec<f64> {
        let reflectance: Vec<f64> = {
            let state = self.state.read();
            raw.iter()
                .zip(state.white_reference.iter().zip(state.dark_reference.iter()))
                .map(|(meas, (white, dark))| (meas - dark) / (white - dark))
                .collect()
        };

        // One NaN element poisons both extrema, like Math.min over NaN.
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &value in &reflectance {
            if value.is_nan() {
                min = f64::NAN;
                max = f64::NAN;
                break;
            }
            if value < min {
                min = value;
            }
            if value > max {
                max = value;
            }
        }

        reflectance.iter().map(|v| (v - min) / (max - min)).collect()
    }

    /// Decode an inference response body and store the ranked label summary.
    ///
    /// Best-effort: the caller logs and discards the error; a failed decode
    /// leaves the previous label in place and never aborts the measurement
    /// response path.
    pub fn record_prediction(&self, raw_body: &str) -> Result<(), LabelDecodeError> {
        let parsed: serde_json::Value = serde_json::from_str(raw_body)?;
        let probabilities = parsed
            .get("outputs")
            .and_then(|v| v.as_array())
            .and_then(|rows| rows.first())
            .and_then(|row| row.as_array())
            .ok_or(LabelDecodeError::MissingOutputs)?;

        let mut ranked: Vec<(&str, f64)> = probabilities
            .iter()
            .enumerate()
            .map(|(index, p)| (material_name(index), p.as_f64().unwrap_or(0.0)))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let label = ranked
            .iter()
            .map(|(material, probability)| format!("{material}: {probability:.2}"))
            .collect::<Vec<_>>()
            .join("\n");

        self.state.write().predicted_label = label;
        Ok(())
    }

    /// Mark a completed measurement round-trip.
    pub fn touch(&self, time: u64) {
        self.state.write().last_update = time;
    }

    /// Ranked label summary, or `"0"` before the first prediction.
    pub fn predicted_label(&self) -> String {
        let state = self.state.read();
        if state.predicted_label.is_empty() {
            "0".to_string()
        } else {
            state.predicted_label.clone()
        }
    }

    /// Last-update instant rendered for human display in the server's local
    /// timezone (`d.m.Y | H.M.S`), or `"0"` before the first round-trip.
    pub fn last_update_display(&self) -> String {
        let last_update = self.state.read().last_update;
        if last_update == 0 {
            return "0".to_string();
        }
        match chrono::Local.timestamp_opt(last_update as i64, 0) {
            chrono::LocalResult::Single(instant) => {
                instant.format("%-d.%-m.%Y | %H.%M.%S").to_string()
            }
            _ => "0".to_string(),
        }
    }
}

fn material_name(index: usize) -> &'static str {
    MATERIAL_NAMES.get(index).copied().unwrap_or_else(|| {
        tracing::warn!("no material name for output index {index}");
        "Unknown"
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_references(white: f64, dark: f64) -> DeviceSession {
        let session = DeviceSession::new(1);
        session.set_reference(ReferenceKind::White, vec![white; SPECTRUM_LEN]);
        session.set_reference(ReferenceKind::Dark, vec![dark; SPECTRUM_LEN]);
        session
    }

    #[test]
    fn equal_references_propagate_nan() {
        // white == dark == raw: 0/0 at every index, and the rescale keeps it.
        let session = DeviceSession::new(1);
        let result = session.normalize(&vec![0.0; SPECTRUM_LEN]);
        assert_eq!(result.len(), SPECTRUM_LEN);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn constant_reflectance_rescales_to_nan() {
        // Reflectance is uniformly 0; min == max makes the rescale 0/0.
        let session = session_with_references(2.0, 0.0);
        let result = session.normalize(&vec![0.0; SPECTRUM_LEN]);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn midpoint_measurement_still_rescales_to_nan() {
        // Reflectance is uniformly 0.5 before the rescale; the constant
        // vector then degenerates exactly like the all-zero case.
        let session = session_with_references(2.0, 0.0);
        let result = session.normalize(&vec![1.0; SPECTRUM_LEN]);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn varying_measurements_rescale_into_unit_range() {
        let session = session_with_references(2.0, 0.0);
        let raw: Vec<f64> = (0..SPECTRUM_LEN).map(|i| i as f64).collect();
        let result = session.normalize(&raw);

        assert_eq!(result[0], 0.0);
        assert_eq!(result[SPECTRUM_LEN - 1], 1.0);
        assert!(result.windows(2).all(|w| w[0] <= w[1]));
        assert!(result.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn record_prediction_ranks_and_formats() {
        let session = DeviceSession::new(1);
        session
            .record_prediction(r#"{"outputs": [[0.1, 0.7, 0.2]]}"#)
            .unwrap();
        assert_eq!(
            session.predicted_label(),
            "Cotton: 0.70\nWool: 0.20\nPolyester: 0.10"
        );
    }

    #[test]
    fn record_prediction_labels_overflow_classes_unknown() {
        let session = DeviceSession::new(1);
        session
            .record_prediction(r#"{"outputs": [[0.1, 0.2, 0.3, 0.4]]}"#)
            .unwrap();
        assert!(session.predicted_label().starts_with("Unknown: 0.40"));
    }

    #[test]
    fn failed_decode_leaves_the_label_in_place() {
        let session = DeviceSession::new(1);
        session
            .record_prediction(r#"{"outputs": [[1.0, 0.0, 0.0]]}"#)
            .unwrap();
        let before = session.predicted_label();

        assert!(session.record_prediction("not json").is_err());
        assert!(matches!(
            session.record_prediction(r#"{"other": 1}"#),
            Err(LabelDecodeError::MissingOutputs)
        ));
        assert_eq!(session.predicted_label(), before);
    }

    #[test]
    fn readers_substitute_zero_until_first_round_trip() {
        let session = DeviceSession::new(1);
        assert_eq!(session.predicted_label(), "0");
        assert_eq!(session.last_update_display(), "0");

        session.touch(1714258662);
        let display = session.last_update_display();
        assert_ne!(display, "0");
        assert!(display.contains(" | "));
        assert!(display.contains("2024"));
    }
}
