use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Conditions, Hardware, Test, TestKind};
use crate::calibration::{CalibrationEstimate, CalibrationEstimator};
use crate::error::{EogError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Saccadic,
    Antisaccadic,
    Pursuit,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::Saccadic => "saccadic",
            Protocol::Antisaccadic => "antisaccadic",
            Protocol::Pursuit => "pursuit",
        };
        f.write_str(name)
    }
}

/// Tests recorded in one session, calibrated together.
#[derive(Debug, Clone)]
pub struct Study {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub protocol: Protocol,
    pub hardware: Option<Hardware>,
    pub conditions: Option<Conditions>,
    hor_calibration: CalibrationEstimate,
    ver_calibration: CalibrationEstimate,
    tests: Vec<Test>,
}

impl Study {
    /// Calibrate from the bracketing calibration Tests with default settings.
    pub fn new(protocol: Protocol, tests: Vec<Test>) -> Result<Self> {
        Self::calibrated_with(protocol, tests, &CalibrationEstimator::default())
    }

    /// Calibrate from the first and last calibration Test of each axis.
    ///
    /// A missing horizontal bracket yields the uncalibrated sentinel; a
    /// missing vertical bracket yields unit gain and no drift.
    pub fn calibrated_with(
        protocol: Protocol,
        tests: Vec<Test>,
        estimator: &CalibrationEstimator,
    ) -> Result<Self> {
        let hor_calibration = match bracket(&tests, TestKind::HorizontalCalibration)? {
            Some((initial, last)) => estimator.estimate(
                initial.hor_channel_raw(),
                last.hor_channel_raw(),
                initial.angle() as f64,
            )?,
            None => {
                log::warn!("Study has no horizontal calibration Tests; using unit gain");
                CalibrationEstimate::UNCALIBRATED
            }
        };

        let ver_calibration = match bracket(&tests, TestKind::VerticalCalibration)? {
            Some((initial, last)) => estimator.estimate(
                initial.ver_channel_raw(),
                last.ver_channel_raw(),
                initial.angle() as f64,
            )?,
            None => CalibrationEstimate {
                gain: 1.0,
                drift: 1.0,
            },
        };

        Ok(Self::with_calibration(protocol, tests, hor_calibration, ver_calibration))
    }

    /// Build a Study from gains estimated elsewhere, e.g. read from an archive.
    pub fn with_calibration(
        protocol: Protocol,
        mut tests: Vec<Test>,
        hor_calibration: CalibrationEstimate,
        ver_calibration: CalibrationEstimate,
    ) -> Self {
        for test in &mut tests {
            test.set_calibration(hor_calibration.gain, ver_calibration.gain);
        }

        Self {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            protocol,
            hardware: None,
            conditions: None,
            hor_calibration,
            ver_calibration,
            tests,
        }
    }

    pub fn with_recorded_at(mut self, recorded_at: DateTime<Utc>) -> Self {
        self.recorded_at = recorded_at;
        self
    }

    pub fn with_hardware(mut self, hardware: Option<Hardware>) -> Self {
        self.hardware = hardware;
        self
    }

    pub fn with_conditions(mut self, conditions: Option<Conditions>) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn hor_calibration(&self) -> CalibrationEstimate {
        self.hor_calibration
    }

    pub fn ver_calibration(&self) -> CalibrationEstimate {
        self.ver_calibration
    }

    pub fn has_vertical_calibration(&self) -> bool {
        self.tests
            .iter()
            .any(|t| t.kind() == TestKind::VerticalCalibration)
    }

    pub fn tests(&self) -> &[Test] {
        &self.tests
    }

    /// Mutable access for attaching annotations. Calibration gains stay fixed.
    pub fn tests_mut(&mut self) -> impl Iterator<Item = &mut Test> {
        self.tests.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Total samples recorded across all Tests.
    pub fn samples_count(&self) -> usize {
        self.tests.iter().map(Test::length).sum()
    }

    /// Acquisition errors per hundred samples; 0 without conditions.
    pub fn error_rate(&self) -> f64 {
        match (&self.conditions, self.samples_count()) {
            (Some(conditions), samples) if samples > 0 => {
                conditions.errors as f64 / samples as f64 * 100.0
            }
            _ => 0.0,
        }
    }
}

impl fmt::Display for Study {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Study recorded at {} with {} tests",
            self.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            self.tests.len()
        )
    }
}

/// First and last Test of `kind`; their angles must match.
fn bracket(tests: &[Test], kind: TestKind) -> Result<Option<(&Test, &Test)>> {
    let mut matching = tests.iter().filter(|t| t.kind() == kind);
    let Some(initial) = matching.next() else {
        return Ok(None);
    };
    let last = matching.last().unwrap_or(initial);

    if initial.angle() != last.angle() {
        return Err(EogError::InvalidInput(format!(
            "{kind} Tests bracket the Study at different angles: {} and {}",
            initial.angle(),
            last.angle()
        )));
    }
    Ok(Some((initial, last)))
}
