use serde::{Deserialize, Serialize};

use crate::impulses::{Impulse, Size};
use crate::transitions::{Direction, TransitionLookup};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationKind {
    /// Movement in the direction of the stimulus step.
    Saccade,
    /// Movement away from the stimulus step.
    AntiSaccade,
}

/// A classified eye movement on the horizontal channel.
///
/// Sample quantities (`onset`, `offset`, `latency`, `duration` and the
/// transition positions) are in full-recording samples; `amplitude` is
/// in degrees and `peak_velocity` in degrees per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(rename = "annotation_type")]
    pub kind: AnnotationKind,
    pub onset: usize,
    pub offset: usize,
    pub latency: usize,
    pub duration: usize,
    pub amplitude: f64,
    pub deviation: f64,
    pub peak_velocity: f64,
    pub direction: Direction,
    pub size: Size,
    pub transition_index: usize,
    #[serde(rename = "transition_change_index")]
    pub transition_position: usize,
    #[serde(rename = "transition_change_before_index")]
    pub transition_previous_position: usize,
    pub transition_direction: Direction,
}

impl Annotation {
    /// Attribute `impulse` to its governing `transition` for a Test of `angle` degrees.
    pub fn new(kind: AnnotationKind, impulse: &Impulse, transition: &TransitionLookup, angle: f64) -> Self {
        Self {
            kind,
            onset: impulse.onset,
            offset: impulse.offset,
            latency: impulse.onset.saturating_sub(transition.position),
            duration: impulse.duration(),
            amplitude: impulse.amplitude,
            deviation: impulse.amplitude / angle,
            peak_velocity: impulse.peak_velocity,
            direction: impulse.direction,
            size: impulse.size,
            transition_index: transition.index,
            transition_position: transition.position,
            transition_previous_position: transition.previous_position,
            transition_direction: transition.direction,
        }
    }

    pub fn is_saccade(&self) -> bool {
        self.kind == AnnotationKind::Saccade
    }

    pub fn is_antisaccade(&self) -> bool {
        self.kind == AnnotationKind::AntiSaccade
    }

    pub fn latency_secs(&self, sample_rate: f64) -> f64 {
        self.latency as f64 / sample_rate
    }

    pub fn duration_secs(&self, sample_rate: f64) -> f64 {
        self.duration as f64 / sample_rate
    }
}

impl std::fmt::Display for Annotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} from {} to {}", self.kind, self.onset, self.offset)
    }
}
