//! Data model: Tests, Studies, annotations and protocol templates.

mod annotation;
mod hardware;
mod protocol;
mod study;

pub use annotation::{Annotation, AnnotationKind};
pub use hardware::{Conditions, Hardware};
pub use protocol::{
    AntisaccadicTemplate, ProtocolTemplate, PursuitTemplate, SaccadicTemplate, TestSpec,
    CALIBRATION_ANGLE, CALIBRATION_VARIABILITY,
};
pub use study::{Protocol, Study};
pub use test::{Test, TestKind};
