pub mod analysis;
pub mod archive;
pub mod biomarkers;
pub mod calibration;
pub mod classifier;
pub mod conditioning;
pub mod config;
pub mod differentiation;
pub mod error;
pub mod filters;
pub mod impulses;
pub mod models;
pub mod nan;
pub mod peaks;
pub mod profiling;
pub mod spectral;
pub mod stats;
pub mod stimuli;
pub mod transitions;

/// Nominal acquisition rate of every channel, in Hz.
pub const SAMPLE_RATE: f64 = 1000.0;

pub use analysis::{Analyzer, StudyReport, TestReport};
pub use biomarkers::Biomarkers;
pub use calibration::{CalibrationEstimate, CalibrationEstimator};
pub use config::{AnalysisConfig, ScalingMode};
pub use error::{EogError, Result};
pub use impulses::{Impulse, ImpulseDetector};
pub use models::{Annotation, AnnotationKind, Protocol, ProtocolTemplate, Study, Test, TestKind};
pub use transitions::{Direction, StimulusTransitions};
