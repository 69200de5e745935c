//! Study-level pipeline: annotate every Test, then aggregate biomarkers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::biomarkers::{AntisaccadicSamples, Biomarkers, PursuitBiomarkers, SaccadicSamples};
use crate::calibration::CalibrationEstimate;
use crate::classifier::{classify_all, correction_pairing, large_saccades};
use crate::conditioning::{derive_channel_to_angle, peak_to_peak, trim_edges};
use crate::config::{AnalysisConfig, ScalingMode};
use crate::error::Result;
use crate::impulses::ImpulseDetector;
use crate::models::{Annotation, Protocol, Study, Test, TestKind};
use crate::profile_scope;
use crate::transitions::StimulusTransitions;

/// A drift error beyond the configured limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityWarning {
    pub channel: String,
    pub drift_error: f64,
    pub limit: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub horizontal: CalibrationEstimate,
    pub horizontal_drift_error: f64,
    pub vertical: CalibrationEstimate,
    pub vertical_drift_error: f64,
    pub warnings: Vec<QualityWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    pub index: usize,
    pub test_type: TestKind,
    pub angle: u32,
    pub replica: bool,
    pub length: usize,
    pub annotations: Vec<Annotation>,
    #[serde(with = "crate::nan::map")]
    pub biomarkers: Biomarkers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedTest {
    pub index: usize,
    pub reason: String,
}

/// Everything computed for one Study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyReport {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub protocol: Protocol,
    pub calibration: CalibrationReport,
    pub tests: Vec<TestReport>,
    #[serde(with = "crate::nan::map")]
    pub summary: Biomarkers,
    pub skipped: Vec<SkippedTest>,
}

/// Retained events of one Test plus the context needed to score them.
#[derive(Debug, Clone)]
pub struct TestAnnotations {
    pub annotations: Vec<Annotation>,
    /// Half the stimulus excursion, in degrees.
    pub expected_half_amplitude: f64,
}

/// Biomarker samples of one Test, by protocol.
#[derive(Debug, Clone)]
enum TestSamples {
    Antisaccadic(AntisaccadicSamples),
    Saccadic(SaccadicSamples),
    Pursuit(Box<PursuitBiomarkers>),
    Calibration,
}

impl TestSamples {
    fn summary(&self) -> Biomarkers {
        match self {
            TestSamples::Antisaccadic(samples) => samples.summary(),
            TestSamples::Saccadic(samples) => samples.summary(),
            TestSamples::Pursuit(biomarkers) => biomarkers.summary(),
            TestSamples::Calibration => Biomarkers::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Samples cut from each end of a channel of `len` samples.
    fn trim_for(&self, len: usize) -> usize {
        if len > 2 * self.config.edge_trim {
            self.config.edge_trim
        } else {
            0
        }
    }

    /// Horizontal eye position in degrees, over the whole Test.
    pub fn horizontal_position(&self, test: &Test) -> Result<Vec<f64>> {
        match self.config.scaling {
            ScalingMode::Calibrated => Ok(test.hor_channel()?.to_vec()),
            ScalingMode::TargetAngle => derive_channel_to_angle(test.hor_channel_raw(), test.angle() as f64),
        }
    }

    /// Detect, classify and filter the movements of one Test.
    ///
    /// Antisaccadic Tests keep glance/correction pairs and large
    /// antisaccades, saccadic Tests keep large saccades, every other kind
    /// keeps all classified movements.
    pub fn annotate(&self, test: &Test) -> Result<TestAnnotations> {
        profile_scope!(format!("annotate {test}"));

        let position = self.horizontal_position(test)?;
        let trim = self.trim_for(position.len());
        let window = trim_edges(&position, trim);

        let detector = ImpulseDetector::from_config(&self.config);
        let impulses: Vec<_> = detector
            .detect_in(window, self.config.sample_rate)?
            .into_iter()
            .map(|impulse| impulse.shifted(trim))
            .collect();

        let stimulus = test.hor_stimuli();
        let transitions = StimulusTransitions::new(stimulus);
        let classified = classify_all(&impulses, &transitions, test.angle() as f64);

        let annotations = match test.kind().protocol() {
            Some(Protocol::Antisaccadic) => correction_pairing(&classified),
            Some(Protocol::Saccadic) => large_saccades(&classified),
            _ => classified,
        };

        log::debug!(
            "{}: {} impulses, {} transitions, {} annotations kept",
            test,
            impulses.len(),
            transitions.len(),
            annotations.len()
        );

        Ok(TestAnnotations {
            annotations,
            expected_half_amplitude: peak_to_peak(stimulus) / 2.0,
        })
    }

    fn samples(&self, test: &Test, annotated: &TestAnnotations) -> Result<TestSamples> {
        let fs = self.config.sample_rate;
        Ok(match test.kind().protocol() {
            Some(Protocol::Antisaccadic) => TestSamples::Antisaccadic(AntisaccadicSamples::from_annotations(
                &annotated.annotations,
                annotated.expected_half_amplitude,
                fs,
            )),
            Some(Protocol::Saccadic) => {
                TestSamples::Saccadic(SaccadicSamples::from_annotations(&annotated.annotations, fs))
            }
            Some(Protocol::Pursuit) => {
                let position = self.horizontal_position(test)?;
                let trim = self.trim_for(position.len());
                let response = trim_edges(&position, trim);
                let stimulus = trim_edges(test.hor_stimuli(), trim);
                TestSamples::Pursuit(Box::new(PursuitBiomarkers::compute(
                    response,
                    stimulus,
                    test.angle() as f64,
                    &self.config,
                )?))
            }
            None => TestSamples::Calibration,
        })
    }

    /// Biomarker dictionary of one Test from its annotations.
    pub fn test_biomarkers(&self, test: &Test, annotated: &TestAnnotations) -> Result<Biomarkers> {
        Ok(self.samples(test, annotated)?.summary())
    }

    /// Attach freshly detected annotations to every Test of `study`.
    pub fn annotate_study(&self, study: &mut Study) -> Result<()> {
        for test in study.tests_mut() {
            let annotated = self.annotate(test)?;
            test.set_annotations(annotated.annotations);
        }
        Ok(())
    }

    fn calibration_report(&self, study: &Study) -> CalibrationReport {
        let limit = self.config.max_drift_error;
        let mut warnings = Vec::new();

        let mut check = |channel: &str, estimate: CalibrationEstimate| {
            if !estimate.is_within(limit) {
                let message = format!(
                    "{channel} calibration drift error {:.1}% exceeds {:.1}%",
                    estimate.drift_error(),
                    limit
                );
                log::warn!("{}", message);
                warnings.push(QualityWarning {
                    channel: channel.to_string(),
                    drift_error: estimate.drift_error(),
                    limit,
                    message,
                });
            }
        };

        check("horizontal", study.hor_calibration());
        if study.has_vertical_calibration() {
            check("vertical", study.ver_calibration());
        }

        CalibrationReport {
            horizontal: study.hor_calibration(),
            horizontal_drift_error: study.hor_calibration().drift_error(),
            vertical: study.ver_calibration(),
            vertical_drift_error: study.ver_calibration().drift_error(),
            warnings,
        }
    }

    /// Run the whole pipeline over a calibrated Study.
    ///
    /// A Test that cannot be analysed is reported under `skipped` and left
    /// out of the study-level summary; it never aborts the Study.
    pub fn analyze(&self, study: &Study) -> StudyReport {
        profile_scope!("analyze study");
        log::info!("Analyzing {} ({} protocol)", study, study.protocol);

        let calibration = self.calibration_report(study);
        let mut tests = Vec::new();
        let mut skipped = Vec::new();
        let mut pooled_antisaccadic = AntisaccadicSamples::default();
        let mut pooled_saccadic = SaccadicSamples::default();
        let mut pursuits = Vec::new();

        for (index, test) in study.tests().iter().enumerate() {
            let outcome = self
                .annotate(test)
                .and_then(|annotated| Ok((self.samples(test, &annotated)?, annotated)));

            let (samples, annotated) = match outcome {
                Ok(result) => result,
                Err(e) => {
                    log::warn!("Skipping Test {} ({}): {}", index, test, e);
                    skipped.push(SkippedTest {
                        index,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if test.kind().protocol() == Some(study.protocol) {
                match &samples {
                    TestSamples::Antisaccadic(s) => pooled_antisaccadic.extend(s),
                    TestSamples::Saccadic(s) => pooled_saccadic.extend(s),
                    TestSamples::Pursuit(p) => pursuits.push(p.as_ref().clone()),
                    TestSamples::Calibration => {}
                }
            }

            log::info!("{}: {} annotations", test, annotated.annotations.len());
            tests.push(TestReport {
                index,
                test_type: test.kind(),
                angle: test.angle(),
                replica: test.replica(),
                length: test.length(),
                biomarkers: samples.summary(),
                annotations: annotated.annotations,
            });
        }

        let summary = match study.protocol {
            Protocol::Antisaccadic => pooled_antisaccadic.summary(),
            Protocol::Saccadic => pooled_saccadic.summary(),
            Protocol::Pursuit => PursuitBiomarkers::pooled_summary(&pursuits),
        };

        StudyReport {
            id: study.id,
            recorded_at: study.recorded_at,
            protocol: study.protocol,
            calibration,
            tests,
            summary,
            skipped,
        }
    }
}
