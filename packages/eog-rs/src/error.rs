use thiserror::Error;

#[derive(Error, Debug)]
pub enum EogError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Channel too short: {actual} samples, at least {required} required")]
    ChannelTooShort { required: usize, actual: usize },

    #[error("Cannot scale a flat channel (max == min)")]
    DegenerateScale,

    #[error("Derived channel requested before the calibration gain was set")]
    Uncalibrated,

    #[error("Invalid protocol template: {0}")]
    InvalidProtocol(String),

    #[error("Invalid study archive: {0}")]
    Archive(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, EogError>;

/// Fails with `ChannelTooShort` unless `channel` holds at least `required` samples.
pub(crate) fn ensure_len<T>(channel: &[T], required: usize) -> Result<()> {
    if channel.len() < required {
        return Err(EogError::ChannelTooShort {
            required,
            actual: channel.len(),
        });
    }
    Ok(())
}
