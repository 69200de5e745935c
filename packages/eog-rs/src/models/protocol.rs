//! Declarative recording protocols and their expansion into Test specs.

use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::{Protocol, TestKind};
use crate::error::{EogError, Result};
use crate::stimuli::{encode, pursuit_stimuli, saccadic_stimuli};

/// Angle of the bracketing calibration Tests, in degrees.
pub const CALIBRATION_ANGLE: u32 = 30;

/// Fixation variability of calibration stimuli, as a fraction.
pub const CALIBRATION_VARIABILITY: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaccadicTemplate {
    pub name: String,
    /// Seconds
    pub calibration_length: f64,
    pub calibration_count: usize,
    /// Seconds
    pub saccadic_length: f64,
    /// Percent
    pub saccadic_variability: f64,
    pub saccadic_count: usize,
    #[serde(default)]
    pub include_replicas: bool,
    #[serde(default)]
    pub saccadic_10: bool,
    #[serde(default)]
    pub saccadic_20: bool,
    #[serde(default)]
    pub saccadic_30: bool,
    #[serde(default)]
    pub saccadic_40: bool,
    #[serde(default)]
    pub saccadic_50: bool,
    #[serde(default)]
    pub saccadic_60: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntisaccadicTemplate {
    pub name: String,
    pub calibration_length: f64,
    pub calibration_count: usize,
    pub antisaccadic_length: f64,
    pub antisaccadic_variability: f64,
    pub antisaccadic_count: usize,
    #[serde(default)]
    pub include_replicas: bool,
    #[serde(default)]
    pub antisaccadic_10: bool,
    #[serde(default)]
    pub antisaccadic_20: bool,
    #[serde(default)]
    pub antisaccadic_30: bool,
    #[serde(default)]
    pub antisaccadic_40: bool,
    #[serde(default)]
    pub antisaccadic_50: bool,
    #[serde(default)]
    pub antisaccadic_60: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PursuitTemplate {
    pub name: String,
    pub calibration_length: f64,
    pub calibration_count: usize,
    pub pursuit_length: f64,
    /// Degrees per second
    pub pursuit_speed: f64,
    #[serde(default)]
    pub include_replicas: bool,
    #[serde(default)]
    pub pursuit_10: bool,
    #[serde(default)]
    pub pursuit_20: bool,
    #[serde(default)]
    pub pursuit_30: bool,
    #[serde(default)]
    pub pursuit_60: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProtocolTemplate {
    Saccadic(SaccadicTemplate),
    Antisaccadic(AntisaccadicTemplate),
    Pursuit(PursuitTemplate),
}

/// One Test to record, with the stimulus that drives it.
#[derive(Debug, Clone, PartialEq)]
pub struct TestSpec {
    pub kind: TestKind,
    pub angle: u32,
    pub replica: bool,
    /// Samples
    pub length: usize,
    pub hor_stimuli: Vec<u16>,
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if !(min..=max).contains(&value) {
        return Err(EogError::InvalidProtocol(format!(
            "{field} must lie in [{min}, {max}], got {value}"
        )));
    }
    Ok(())
}

fn seconds_to_samples(seconds: f64) -> usize {
    (seconds * crate::SAMPLE_RATE) as usize
}

impl ProtocolTemplate {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Loading protocol: {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        let template: Self = serde_json::from_str(&contents)
            .map_err(|e| EogError::InvalidProtocol(format!("{}: {e}", path.display())))?;
        template.validate()?;
        Ok(template)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            ProtocolTemplate::Saccadic(_) => Protocol::Saccadic,
            ProtocolTemplate::Antisaccadic(_) => Protocol::Antisaccadic,
            ProtocolTemplate::Pursuit(_) => Protocol::Pursuit,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ProtocolTemplate::Saccadic(t) => &t.name,
            ProtocolTemplate::Antisaccadic(t) => &t.name,
            ProtocolTemplate::Pursuit(t) => &t.name,
        }
    }

    fn calibration(&self) -> (f64, usize) {
        match self {
            ProtocolTemplate::Saccadic(t) => (t.calibration_length, t.calibration_count),
            ProtocolTemplate::Antisaccadic(t) => (t.calibration_length, t.calibration_count),
            ProtocolTemplate::Pursuit(t) => (t.calibration_length, t.calibration_count),
        }
    }

    /// Included angles in ascending order.
    pub fn angles(&self) -> Vec<u32> {
        let flags: Vec<(u32, bool)> = match self {
            ProtocolTemplate::Saccadic(t) => vec![
                (10, t.saccadic_10),
                (20, t.saccadic_20),
                (30, t.saccadic_30),
                (40, t.saccadic_40),
                (50, t.saccadic_50),
                (60, t.saccadic_60),
            ],
            ProtocolTemplate::Antisaccadic(t) => vec![
                (10, t.antisaccadic_10),
                (20, t.antisaccadic_20),
                (30, t.antisaccadic_30),
                (40, t.antisaccadic_40),
                (50, t.antisaccadic_50),
                (60, t.antisaccadic_60),
            ],
            ProtocolTemplate::Pursuit(t) => vec![
                (10, t.pursuit_10),
                (20, t.pursuit_20),
                (30, t.pursuit_30),
                (60, t.pursuit_60),
            ],
        };
        flags
            .into_iter()
            .filter_map(|(angle, included)| included.then_some(angle))
            .collect()
    }

    fn include_replicas(&self) -> bool {
        match self {
            ProtocolTemplate::Saccadic(t) => t.include_replicas,
            ProtocolTemplate::Antisaccadic(t) => t.include_replicas,
            ProtocolTemplate::Pursuit(t) => t.include_replicas,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name().trim().is_empty() {
            return Err(EogError::InvalidProtocol("name must not be empty".to_string()));
        }
        let (calibration_length, calibration_count) = self.calibration();
        check_range("calibration_length", calibration_length, 10.0, 100.0)?;
        check_range("calibration_count", calibration_count as f64, 5.0, 10.0)?;

        match self {
            ProtocolTemplate::Saccadic(t) => {
                check_range("saccadic_length", t.saccadic_length, 10.0, 100.0)?;
                check_range("saccadic_variability", t.saccadic_variability, 0.1, 100.0)?;
                check_range("saccadic_count", t.saccadic_count as f64, 5.0, 30.0)?;
            }
            ProtocolTemplate::Antisaccadic(t) => {
                check_range("antisaccadic_length", t.antisaccadic_length, 10.0, 100.0)?;
                check_range("antisaccadic_variability", t.antisaccadic_variability, 0.1, 100.0)?;
                check_range("antisaccadic_count", t.antisaccadic_count as f64, 5.0, 30.0)?;
            }
            ProtocolTemplate::Pursuit(t) => {
                check_range("pursuit_length", t.pursuit_length, 10.0, 100.0)?;
                check_range("pursuit_speed", t.pursuit_speed, 0.1, 10.0)?;
            }
        }
        Ok(())
    }

    /// Expand into the ordered Test list, bracketed by two calibration Tests.
    ///
    /// The same `seed` always yields the same stimuli.
    pub fn tests(&self, seed: u64) -> Vec<TestSpec> {
        let mut rng = StdRng::seed_from_u64(seed);
        let (calibration_length, calibration_count) = self.calibration();
        let calibration_samples = seconds_to_samples(calibration_length);

        let calibration = |replica: bool, rng: &mut StdRng| TestSpec {
            kind: TestKind::HorizontalCalibration,
            angle: CALIBRATION_ANGLE,
            replica,
            length: calibration_samples,
            hor_stimuli: encode(&saccadic_stimuli(
                calibration_samples,
                calibration_count,
                CALIBRATION_VARIABILITY,
                rng,
            )),
        };

        let mut specs = vec![calibration(false, &mut rng)];
        let replicas: &[bool] = if self.include_replicas() {
            &[false, true]
        } else {
            &[false]
        };

        for angle in self.angles() {
            for &replica in replicas {
                specs.push(self.task_spec(angle, replica, &mut rng));
            }
        }

        specs.push(calibration(true, &mut rng));
        specs
    }

    fn task_spec(&self, angle: u32, replica: bool, rng: &mut StdRng) -> TestSpec {
        let (kind, length, stimulus) = match self {
            ProtocolTemplate::Saccadic(t) => {
                let length = seconds_to_samples(t.saccadic_length);
                let values = saccadic_stimuli(
                    length,
                    t.saccadic_count,
                    t.saccadic_variability / 100.0,
                    rng,
                );
                (TestKind::HorizontalSaccadic, length, values)
            }
            ProtocolTemplate::Antisaccadic(t) => {
                let length = seconds_to_samples(t.antisaccadic_length);
                let values = saccadic_stimuli(
                    length,
                    t.antisaccadic_count,
                    t.antisaccadic_variability / 100.0,
                    rng,
                );
                (TestKind::HorizontalAntisaccadic, length, values)
            }
            ProtocolTemplate::Pursuit(t) => {
                let length = seconds_to_samples(t.pursuit_length);
                let speed = t.pursuit_speed / (angle as f64 / 2.0);
                let values = pursuit_stimuli(length, speed, crate::SAMPLE_RATE);
                (TestKind::HorizontalPursuit, length, values)
            }
        };

        TestSpec {
            kind,
            angle,
            replica,
            length,
            hor_stimuli: encode(&stimulus),
        }
    }
}
