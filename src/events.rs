//! Trigger markers.
//!
//! A [`TriggerMarker`] is a `(sample, label)` pair, the equivalent of one row
//! of an MNE events array after `events_from_annotations`. The core only
//! consumes the sample indices of markers carrying the requested label.
use crate::error::{GradientError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerMarker {
    /// Sample index of the cycle onset, relative to the first sample.
    pub sample: usize,
    pub label: String,
}

impl TriggerMarker {
    pub fn new(sample: usize, label: impl Into<String>) -> Self {
        Self { sample, label: label.into() }
    }
}

/// Convert annotation onsets (seconds) into markers.
///
/// `sample = round(onset · sfreq)`; negative onsets clamp to sample 0.
/// The result is stably sorted by sample index.
pub fn markers_from_annotations(onsets: &[f64], labels: &[String], sfreq: f64) -> Result<Vec<TriggerMarker>> {
    if onsets.len() != labels.len() {
        return Err(GradientError::ShapeMismatch {
            expected: vec![onsets.len()],
            got: vec![labels.len()],
        });
    }
    if !(sfreq.is_finite() && sfreq > 0.0) {
        return Err(GradientError::InvalidSamplingRate(sfreq));
    }
    let mut markers: Vec<TriggerMarker> = onsets
        .iter()
        .zip(labels)
        .map(|(&t, label)| TriggerMarker::new((t * sfreq).round().max(0.0) as usize, label.clone()))
        .collect();
    markers.sort_by_key(|m| m.sample);
    Ok(markers)
}

/// Sample indices of every marker labelled `label`, in input order.
///
/// Fails with [`GradientError::UnknownLabel`] when no marker carries the label
/// and with [`GradientError::InsufficientMarkers`] when only one does.
pub fn select_marker_samples(markers: &[TriggerMarker], label: &str) -> Result<Vec<usize>> {
    let samples: Vec<usize> = markers
        .iter()
        .filter(|m| m.label == label)
        .map(|m| m.sample)
        .collect();

    match samples.len() {
        0 => Err(GradientError::UnknownLabel { label: label.to_string() }),
        1 => Err(GradientError::InsufficientMarkers { label: label.to_string(), found: 1 }),
        _ => Ok(samples),
    }
}

/// Distinct labels in order of first appearance.
pub fn labels(markers: &[TriggerMarker]) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for m in markers {
        if !out.contains(&m.label.as_str()) {
            out.push(&m.label);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed() -> Vec<TriggerMarker> {
        vec![
            TriggerMarker::new(0, "TR"),
            TriggerMarker::new(50, "Stimulus/S  1"),
            TriggerMarker::new(100, "TR"),
            TriggerMarker::new(200, "TR"),
        ]
    }

    #[test]
    fn selects_only_matching_label() {
        assert_eq!(select_marker_samples(&mixed(), "TR").unwrap(), vec![0, 100, 200]);
    }

    #[test]
    fn unknown_label() {
        assert_eq!(
            select_marker_samples(&mixed(), "Gradient/G  1"),
            Err(GradientError::UnknownLabel { label: "Gradient/G  1".into() })
        );
    }

    #[test]
    fn single_marker_is_insufficient() {
        assert_eq!(
            select_marker_samples(&mixed(), "Stimulus/S  1"),
            Err(GradientError::InsufficientMarkers { label: "Stimulus/S  1".into(), found: 1 })
        );
    }

    #[test]
    fn annotations_round_to_nearest_sample() {
        let labels = vec!["TR".to_string(), "TR".to_string()];
        let m = markers_from_annotations(&[1.2004, 0.0], &labels, 1000.0).unwrap();
        assert_eq!(m[0].sample, 0);
        assert_eq!(m[1].sample, 1200);
    }

    #[test]
    fn annotations_length_mismatch() {
        let labels = vec!["TR".to_string()];
        assert!(markers_from_annotations(&[0.0, 1.0], &labels, 1000.0).is_err());
    }

    #[test]
    fn distinct_labels_in_order() {
        assert_eq!(labels(&mixed()), vec!["TR", "Stimulus/S  1"]);
    }
}
