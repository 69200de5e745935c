use serde::{Deserialize, Serialize};

/// Acquisition and stimulus display setup of a recording session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hardware {
    pub acquisition_device: String,
    #[serde(default = "default_sampling_rate", alias = "acqusition_sampling_rate")]
    pub acquisition_sampling_rate: u32,
    pub stimuli_monitor: String,
    #[serde(default)]
    pub stimuli_monitor_refresh_rate: Option<u32>,
    /// Physical width of the monitor, in millimetres
    pub stimuli_monitor_width: u32,
    /// Physical height of the monitor, in millimetres
    pub stimuli_monitor_height: u32,
    pub stimuli_monitor_resolution_width: u32,
    pub stimuli_monitor_resolution_height: u32,
    /// Radius of the stimulus target, in pixels
    pub stimuli_ball_radius: u32,
}

fn default_sampling_rate() -> u32 {
    1000
}

/// Environment of a recording session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    pub light_intensity: f64,
    /// Acquisition errors reported by the amplifier during the session
    #[serde(default)]
    pub errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardware_accepts_legacy_rate_key() {
        let hardware: Hardware = serde_json::from_str(
            r#"{
                "acquisition_device": "BiosignalsPlux",
                "acqusition_sampling_rate": 2000,
                "stimuli_monitor": "Generic",
                "stimuli_monitor_width": 520,
                "stimuli_monitor_height": 320,
                "stimuli_monitor_resolution_width": 1920,
                "stimuli_monitor_resolution_height": 1080,
                "stimuli_ball_radius": 12
            }"#,
        )
        .unwrap();
        assert_eq!(hardware.acquisition_sampling_rate, 2000);
        assert_eq!(hardware.stimuli_monitor_refresh_rate, None);
    }

    #[test]
    fn test_conditions_default_errors() {
        let conditions: Conditions = serde_json::from_str(r#"{"light_intensity": 120.5}"#).unwrap();
        assert_eq!(conditions.errors, 0);
    }
}
