//! Study archive: a zip holding `manifest.json` plus one `testNN.npz`
//! bundle per Test with its four raw channels as NumPy `<u2` arrays.
//!
//! Only raw channels and calibration gains are authoritative. Annotations in
//! the manifest are informational; loading re-derives everything else.

use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::calibration::CalibrationEstimate;
use crate::error::{EogError, Result};
use crate::models::{Annotation, Conditions, Hardware, Protocol, Study, Test, TestKind};

pub const ARCHIVE_VERSION: &str = "1.0";
pub const MANIFEST_NAME: &str = "manifest.json";

const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";
const NPY_ALIGNMENT: usize = 64;
const CHANNEL_NAMES: [&str; 4] = ["hor_stimuli", "hor_channel", "ver_stimuli", "ver_channel"];

/// Per-Test entry of the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestEntry {
    pub test_type: TestKind,
    pub angle: u32,
    #[serde(default = "default_fs")]
    pub fs: u32,
    #[serde(default)]
    pub replica: bool,
    pub length: usize,
    #[serde(default, deserialize_with = "lenient_annotations")]
    pub hor_annotations: Vec<Annotation>,
    #[serde(default, deserialize_with = "lenient_annotations")]
    pub ver_annotations: Vec<Annotation>,
}

fn default_fs() -> u32 {
    crate::SAMPLE_RATE as u32
}

/// Annotations written by other tools may not match our layout; they are
/// informational, so unreadable ones are dropped instead of failing the load.
fn lenient_annotations<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<Annotation>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Study-level metadata stored as `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyManifest {
    pub version: String,
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Unix time in seconds
    pub recorded_at: f64,
    pub protocol: Protocol,
    #[serde(default)]
    pub hardware: Option<Hardware>,
    #[serde(default)]
    pub conditions: Option<Conditions>,
    pub hor_calibration: f64,
    #[serde(with = "crate::nan")]
    pub hor_calibration_diff: f64,
    #[serde(default = "unit")]
    pub ver_calibration: f64,
    #[serde(default = "unit", with = "crate::nan")]
    pub ver_calibration_diff: f64,
    pub tests: Vec<TestEntry>,
}

fn unit() -> f64 {
    1.0
}

impl StudyManifest {
    pub fn from_study(study: &Study) -> Self {
        Self {
            version: ARCHIVE_VERSION.to_string(),
            id: study.id,
            recorded_at: study.recorded_at.timestamp_micros() as f64 / 1e6,
            protocol: study.protocol,
            hardware: study.hardware.clone(),
            conditions: study.conditions.clone(),
            hor_calibration: study.hor_calibration().gain,
            hor_calibration_diff: study.hor_calibration().drift,
            ver_calibration: study.ver_calibration().gain,
            ver_calibration_diff: study.ver_calibration().drift,
            tests: study
                .tests()
                .iter()
                .map(|test| TestEntry {
                    test_type: test.kind(),
                    angle: test.angle(),
                    fs: test.fs(),
                    replica: test.replica(),
                    length: test.length(),
                    hor_annotations: test.annotations().to_vec(),
                    ver_annotations: Vec::new(),
                })
                .collect(),
        }
    }

    pub fn hor_estimate(&self) -> CalibrationEstimate {
        CalibrationEstimate {
            gain: self.hor_calibration,
            drift: self.hor_calibration_diff,
        }
    }

    pub fn ver_estimate(&self) -> CalibrationEstimate {
        CalibrationEstimate {
            gain: self.ver_calibration,
            drift: self.ver_calibration_diff,
        }
    }

    pub fn recorded_at(&self) -> Result<DateTime<Utc>> {
        DateTime::from_timestamp_micros((self.recorded_at * 1e6).round() as i64)
            .ok_or_else(|| EogError::Archive(format!("timestamp {} out of range", self.recorded_at)))
    }

    fn check_version(&self) -> Result<()> {
        let major = self.version.split('.').next().unwrap_or("0");
        let supported = ARCHIVE_VERSION.split('.').next().unwrap_or("0");
        if major != supported {
            return Err(EogError::Archive(format!(
                "unsupported archive version {} (expected {}.x)",
                self.version, supported
            )));
        }
        Ok(())
    }
}

pub fn bundle_name(index: usize) -> String {
    format!("test{index:02}.npz")
}

/// Write `study` to a new archive at `path`.
pub fn save_study(study: &Study, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_study(study, file)?;
    log::info!("Saved {} to {}", study, path.display());
    Ok(())
}

pub fn write_study<W: Write + Seek>(study: &Study, writer: W) -> Result<W> {
    let mut zip = ZipWriter::new(writer);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    // bundles are compressed already
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    let manifest = serde_json::to_string_pretty(&StudyManifest::from_study(study))?;
    zip.start_file(MANIFEST_NAME, deflated)?;
    zip.write_all(manifest.as_bytes())?;

    for (index, test) in study.tests().iter().enumerate() {
        zip.start_file(bundle_name(index), stored)?;
        zip.write_all(&encode_bundle(test)?)?;
    }

    Ok(zip.finish()?)
}

/// Read only the manifest of the archive at `path`.
pub fn read_manifest(path: impl AsRef<Path>) -> Result<StudyManifest> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    manifest_from(&mut archive)
}

/// Rebuild the Study stored at `path`.
pub fn load_study(path: impl AsRef<Path>) -> Result<Study> {
    let path = path.as_ref();
    let study = read_study(File::open(path)?)?;
    log::info!("Loaded {} from {}", study, path.display());
    Ok(study)
}

pub fn read_study<R: Read + Seek>(reader: R) -> Result<Study> {
    let mut archive = ZipArchive::new(reader)?;
    let manifest = manifest_from(&mut archive)?;

    let mut tests = Vec::with_capacity(manifest.tests.len());
    for (index, entry) in manifest.tests.iter().enumerate() {
        let bytes = read_entry(&mut archive, &bundle_name(index))?;
        let [hor_stimuli, hor_channel, ver_stimuli, ver_channel] = decode_bundle(&bundle_name(index), &bytes)?;

        if hor_stimuli.len() != entry.length {
            log::warn!(
                "Test {} declares {} samples but stores {}",
                index,
                entry.length,
                hor_stimuli.len()
            );
        }

        let mut test = Test::new(
            entry.test_type,
            entry.angle,
            hor_stimuli,
            hor_channel,
            ver_stimuli,
            ver_channel,
        )?
        .with_replica(entry.replica)
        .with_fs(entry.fs);
        test.set_annotations(entry.hor_annotations.clone());
        tests.push(test);
    }

    let mut study = Study::with_calibration(manifest.protocol, tests, manifest.hor_estimate(), manifest.ver_estimate())
        .with_recorded_at(manifest.recorded_at()?)
        .with_hardware(manifest.hardware.clone())
        .with_conditions(manifest.conditions.clone());
    study.id = manifest.id;
    Ok(study)
}

fn manifest_from<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<StudyManifest> {
    let bytes = read_entry(archive, MANIFEST_NAME)?;
    let manifest: StudyManifest = serde_json::from_slice(&bytes)?;
    manifest.check_version()?;
    Ok(manifest)
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(EogError::Archive(format!("{name} not found")));
        }
        Err(e) => return Err(e.into()),
    };
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn encode_bundle(test: &Test) -> Result<Vec<u8>> {
    let channels = [
        test.hor_stimuli_raw(),
        test.hor_channel_raw(),
        test.ver_stimuli_raw(),
        test.ver_channel_raw(),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, channel) in CHANNEL_NAMES.iter().zip(channels) {
        zip.start_file(format!("{name}.npy"), options)?;
        zip.write_all(&encode_npy(channel))?;
    }
    Ok(zip.finish()?.into_inner())
}

/// The four channels of a bundle, in `CHANNEL_NAMES` order.
fn decode_bundle(bundle: &str, bytes: &[u8]) -> Result<[Vec<u16>; 4]> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut channels: [Vec<u16>; 4] = Default::default();
    for (slot, name) in channels.iter_mut().zip(CHANNEL_NAMES) {
        let file = format!("{name}.npy");
        let raw = read_entry(&mut archive, &file)
            .map_err(|e| EogError::Archive(format!("{bundle}: {e}")))?;
        *slot = decode_npy(&raw).map_err(|e| EogError::Archive(format!("{bundle}/{file}: {e}")))?;
    }

    let length = channels[0].len();
    if channels.iter().any(|c| c.len() != length) {
        return Err(EogError::Archive(format!(
            "{bundle}: channels differ in length ({})",
            channels.iter().map(|c| c.len().to_string()).collect::<Vec<_>>().join(" / ")
        )));
    }
    Ok(channels)
}

/// NumPy `.npy` (format 1.0) of a one-dimensional little-endian `u16` array.
pub fn encode_npy(values: &[u16]) -> Vec<u8> {
    let mut header = format!(
        "{{'descr': '<u2', 'fortran_order': False, 'shape': ({},), }}",
        values.len()
    );
    // magic, version, header length, header, newline
    let unpadded = NPY_MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (NPY_ALIGNMENT - unpadded % NPY_ALIGNMENT) % NPY_ALIGNMENT;
    header.extend(std::iter::repeat(' ').take(padding));
    header.push('\n');

    let mut out = Vec::with_capacity(unpadded + padding + values.len() * 2);
    out.extend_from_slice(NPY_MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

/// Parse a `.npy` payload; only one-dimensional, C-ordered `<u2` arrays are accepted.
pub fn decode_npy(bytes: &[u8]) -> Result<Vec<u16>> {
    let invalid = |message: &str| EogError::Archive(message.to_string());

    if bytes.len() < 10 || &bytes[..6] != NPY_MAGIC {
        return Err(invalid("not a .npy array"));
    }
    let (header_len, start) = match bytes[6] {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 if bytes.len() >= 12 => (
            u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize,
            12,
        ),
        version => return Err(EogError::Archive(format!("unsupported .npy version {version}"))),
    };
    let header = bytes
        .get(start..start + header_len)
        .and_then(|h| std::str::from_utf8(h).ok())
        .ok_or_else(|| invalid("truncated .npy header"))?;

    let descr = quoted_field(header, "descr").ok_or_else(|| invalid("missing dtype"))?;
    if descr != "<u2" {
        return Err(EogError::Archive(format!("dtype {descr} is not <u2")));
    }
    if field_after(header, "fortran_order").is_some_and(|v| v.starts_with("True")) {
        return Err(invalid("fortran-ordered arrays are not supported"));
    }
    let shape = field_after(header, "shape")
        .and_then(|v| v.strip_prefix('('))
        .and_then(|v| v.split(')').next())
        .ok_or_else(|| invalid("missing shape"))?;
    let dims: Vec<&str> = shape.split(',').map(str::trim).filter(|d| !d.is_empty()).collect();
    let [len] = dims.as_slice() else {
        return Err(EogError::Archive(format!("shape ({shape}) is not one-dimensional")));
    };
    let len: usize = len
        .parse()
        .map_err(|_| EogError::Archive(format!("invalid dimension {len}")))?;

    let expected = len
        .checked_mul(2)
        .ok_or_else(|| EogError::Archive(format!("dimension {len} is too large")))?;
    let data = &bytes[start + header_len..];
    if data.len() != expected {
        return Err(EogError::Archive(format!(
            "expected {expected} data bytes, found {}",
            data.len()
        )));
    }
    Ok(data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Text following `'key':` in a header dictionary, leading spaces removed.
fn field_after<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let marker = format!("'{key}':");
    let at = header.find(&marker)? + marker.len();
    Some(header[at..].trim_start())
}

fn quoted_field<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let value = field_after(header, key)?.strip_prefix('\'')?;
    value.split('\'').next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_npy_header_is_aligned() {
        let bytes = encode_npy(&[1, 2, 3]);
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + header_len) % NPY_ALIGNMENT, 0);
        assert_eq!(bytes[10 + header_len - 1], b'\n');
        assert_eq!(&bytes[10 + header_len..], &[1, 0, 2, 0, 3, 0]);
    }

    #[test]
    fn test_npy_decodes_encoded_array() {
        let values: Vec<u16> = vec![0, 32768, 52768, u16::MAX];
        assert_eq!(decode_npy(&encode_npy(&values)).unwrap(), values);
        assert!(decode_npy(&encode_npy(&[])).unwrap().is_empty());
    }

    fn npy_with_header(dict: &str, data: &[u8]) -> Vec<u8> {
        let mut header = dict.to_string();
        header.push('\n');
        let mut out = NPY_MAGIC.to_vec();
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&(header.len() as u16).to_le_bytes());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn test_npy_rejects_other_dtypes_and_shapes() {
        let float = npy_with_header("{'descr': '<f8', 'fortran_order': False, 'shape': (1,), }", &[0; 8]);
        assert!(matches!(decode_npy(&float), Err(EogError::Archive(_))));

        let matrix = npy_with_header("{'descr': '<u2', 'fortran_order': False, 'shape': (2, 2), }", &[0; 8]);
        assert!(matches!(decode_npy(&matrix), Err(EogError::Archive(_))));

        let short = npy_with_header("{'descr': '<u2', 'fortran_order': False, 'shape': (3,), }", &[0; 4]);
        assert!(matches!(decode_npy(&short), Err(EogError::Archive(_))));

        assert!(matches!(decode_npy(b"PK\x03\x04"), Err(EogError::Archive(_))));
    }

    #[test]
    fn test_npy_rejects_oversized_dimension() {
        let dict = format!("{{'descr': '<u2', 'fortran_order': False, 'shape': ({},), }}", usize::MAX);
        let huge = npy_with_header(&dict, &[0; 4]);
        assert!(matches!(decode_npy(&huge), Err(EogError::Archive(_))));
    }

    #[test]
    fn test_manifest_accepts_legacy_names() {
        let manifest: StudyManifest = serde_json::from_str(
            r#"{
                "version": "1.0",
                "recorded_at": 1600000000.5,
                "protocol": "antisaccadic",
                "hor_calibration": 0.02,
                "hor_calibration_diff": 0.97,
                "tests": [
                    {"test_type": "HorizontalSaccadicTest", "angle": 30, "length": 5000,
                     "hor_annotations": [{"unexpected": true}]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(manifest.tests[0].test_type, TestKind::HorizontalSaccadic);
        assert_eq!(manifest.tests[0].fs, 1000);
        assert!(manifest.tests[0].hor_annotations.is_empty());
        assert_eq!(manifest.ver_estimate().gain, 1.0);
        assert_eq!(manifest.recorded_at().unwrap().timestamp(), 1_600_000_000);
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let manifest = StudyManifest {
            version: "2.0".to_string(),
            id: Uuid::new_v4(),
            recorded_at: 0.0,
            protocol: Protocol::Pursuit,
            hardware: None,
            conditions: None,
            hor_calibration: 1.0,
            hor_calibration_diff: 1.0,
            ver_calibration: 1.0,
            ver_calibration_diff: 1.0,
            tests: Vec::new(),
        };
        assert!(matches!(manifest.check_version(), Err(EogError::Archive(_))));
    }

    #[test]
    fn test_bundle_with_unequal_channels_rejected() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, len) in CHANNEL_NAMES.iter().zip([10usize, 10, 10, 9]) {
            zip.start_file(format!("{name}.npy"), options).unwrap();
            zip.write_all(&encode_npy(&vec![0; len])).unwrap();
        }
        let bytes = zip.finish().unwrap().into_inner();
        assert!(matches!(decode_bundle("test00.npz", &bytes), Err(EogError::Archive(_))));
    }
}
