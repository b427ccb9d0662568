// =============================================================================
// Classical Shadows Runtime - Protocol Options
// =============================================================================
// Table of Contents:
//   1. ProtocolOptions - Raw option mapping
//   2. Loading from TOML / JSON
//   3. ShadowOptions - Validated configuration
// =============================================================================
// Purpose: The option mapping a caller hands to a measurement protocol, and
//          the validated, immutable configuration a shadow manager runs with.
// =============================================================================

use crate::error::{ConfigurationError, ShadowResult, ShadowRuntimeError};
use crate::sample_size::{validate_accuracy, validate_confidence};
use crate::snapshot::InverseChannel;
use serde::{Deserialize, Serialize};
use std::path::Path;

// =============================================================================
// 1. ProtocolOptions - Raw option mapping
// =============================================================================

/// Every key is optional; a protocol decides which ones it requires.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtocolOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_shots: Option<usize>,
    /// Fixed number of repetitions; overrides the accuracy-derived size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow_size: Option<usize>,
    /// Fixed number of median-of-means groups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow_medians: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Per-qubit channel eigenvalues for robust shadows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration: Option<Vec<f64>>,
}

impl ProtocolOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_shots(mut self, n_shots: usize) -> Self {
        self.n_shots = Some(n_shots);
        self
    }

    pub fn with_shadow_size(mut self, shadow_size: usize) -> Self {
        self.shadow_size = Some(shadow_size);
        self
    }

    pub fn with_shadow_medians(mut self, shadow_medians: usize) -> Self {
        self.shadow_medians = Some(shadow_medians);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_calibration(mut self, calibration: Vec<f64>) -> Self {
        self.calibration = Some(calibration);
        self
    }

    // =========================================================================
    // 2. Loading from TOML / JSON
    // =========================================================================

    pub fn from_toml_str(source: &str) -> ShadowResult<Self> {
        toml::from_str(source).map_err(|e| ConfigurationError::Toml(e).into())
    }

    pub fn from_json_str(source: &str) -> ShadowResult<Self> {
        serde_json::from_str(source).map_err(|e| ConfigurationError::Json(e).into())
    }

    /// Loads `.toml` or `.json` files, chosen by extension.
    pub fn from_file(path: impl AsRef<Path>) -> ShadowResult<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase);
        let contents = || {
            std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
                path: path.display().to_string(),
                source,
            })
        };
        match extension.as_deref() {
            Some("toml") => Self::from_toml_str(&contents()?),
            Some("json") => Self::from_json_str(&contents()?),
            _ => Err(ConfigurationError::UnsupportedFormat(path.display().to_string()).into()),
        }
    }
}

// =============================================================================
// 3. ShadowOptions - Validated configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ShadowOptions {
    accuracy: Option<f64>,
    confidence: Option<f64>,
    n_shots: usize,
    shadow_size: Option<usize>,
    shadow_medians: Option<usize>,
    seed: Option<u64>,
    calibration: Option<Vec<f64>>,
}

impl ShadowOptions {
    /// Requires a way to pick N (`shadow_size` or `accuracy`) and a way to
    /// pick K (`shadow_medians` or `confidence`). `n_shots` defaults to 1.
    pub fn from_protocol_options(options: &ProtocolOptions) -> ShadowResult<Self> {
        if options.shadow_size.is_none() && options.accuracy.is_none() {
            return Err(ShadowRuntimeError::invalid_argument(
                "shadow options need either `accuracy` or `shadow_size`",
            ));
        }
        if options.shadow_medians.is_none() && options.confidence.is_none() {
            return Err(ShadowRuntimeError::invalid_argument(
                "shadow options need either `confidence` or `shadow_medians`",
            ));
        }
        if let Some(accuracy) = options.accuracy {
            validate_accuracy(accuracy)?;
        }
        if let Some(confidence) = options.confidence {
            validate_confidence(confidence)?;
        }

        let n_shots = options.n_shots.unwrap_or(1);
        if n_shots == 0 {
            return Err(ShadowRuntimeError::invalid_argument("`n_shots` must be at least 1"));
        }
        if options.shadow_size == Some(0) {
            return Err(ShadowRuntimeError::invalid_argument(
                "`shadow_size` must be at least 1",
            ));
        }
        if options.shadow_medians == Some(0) {
            return Err(ShadowRuntimeError::invalid_argument(
                "`shadow_medians` must be at least 1",
            ));
        }
        if let Some(calibration) = &options.calibration {
            if calibration.is_empty() {
                return Err(ShadowRuntimeError::invalid_argument(
                    "`calibration` must list one coefficient per qubit",
                ));
            }
            if let Some(bad) = calibration
                .iter()
                .find(|&&f| !(f > 0.0 && f <= 1.0))
            {
                return Err(ShadowRuntimeError::invalid_argument(format!(
                    "calibration coefficients must lie in (0, 1], got {bad}"
                )));
            }
        }

        Ok(Self {
            accuracy: options.accuracy,
            confidence: options.confidence,
            n_shots,
            shadow_size: options.shadow_size,
            shadow_medians: options.shadow_medians,
            seed: options.seed,
            calibration: options.calibration.clone(),
        })
    }

    pub fn accuracy(&self) -> Option<f64> {
        self.accuracy
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    pub fn n_shots(&self) -> usize {
        self.n_shots
    }

    pub fn shadow_size(&self) -> Option<usize> {
        self.shadow_size
    }

    pub fn shadow_medians(&self) -> Option<usize> {
        self.shadow_medians
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn calibration(&self) -> Option<&[f64]> {
        self.calibration.as_deref()
    }

    pub fn inverse_channel(&self) -> InverseChannel {
        match &self.calibration {
            Some(calibration) => InverseChannel::Calibrated(calibration.clone()),
            None => InverseChannel::Standard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_options() {
        let options = ProtocolOptions::from_toml_str(
            r#"
            accuracy = 0.1
            confidence = 0.1
            n_shots = 4
            seed = 7
            "#,
        )
        .unwrap();
        assert_eq!(options.accuracy, Some(0.1));
        assert_eq!(options.n_shots, Some(4));
        assert_eq!(options.seed, Some(7));
        assert_eq!(options.shadow_size, None);

        let validated = ShadowOptions::from_protocol_options(&options).unwrap();
        assert_eq!(validated.n_shots(), 4);
        assert_eq!(validated.inverse_channel(), InverseChannel::Standard);
    }

    #[test]
    fn test_json_options_with_overrides() {
        let options = ProtocolOptions::from_json_str(
            r#"{"shadow_size": 200, "shadow_medians": 5, "calibration": [0.3, 0.25]}"#,
        )
        .unwrap();
        let validated = ShadowOptions::from_protocol_options(&options).unwrap();
        assert_eq!(validated.shadow_size(), Some(200));
        assert_eq!(validated.shadow_medians(), Some(5));
        assert_eq!(validated.n_shots(), 1);
        assert_eq!(
            validated.inverse_channel(),
            InverseChannel::Calibrated(vec![0.3, 0.25])
        );
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = ProtocolOptions::from_toml_str("accuracy = 0.1\nepsilon = 0.2").unwrap_err();
        assert!(matches!(
            err,
            ShadowRuntimeError::Configuration(ConfigurationError::Toml(_))
        ));
        let err = ProtocolOptions::from_json_str(r#"{"shots": 3}"#).unwrap_err();
        assert!(matches!(
            err,
            ShadowRuntimeError::Configuration(ConfigurationError::Json(_))
        ));
    }

    #[test]
    fn test_missing_requirements_rejected() {
        let only_accuracy = ProtocolOptions::new().with_accuracy(0.1);
        assert!(matches!(
            ShadowOptions::from_protocol_options(&only_accuracy),
            Err(ShadowRuntimeError::InvalidArgument(_))
        ));
        let only_confidence = ProtocolOptions::new().with_confidence(0.1);
        assert!(ShadowOptions::from_protocol_options(&only_confidence).is_err());
        assert!(ShadowOptions::from_protocol_options(&ProtocolOptions::new()).is_err());
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let base = ProtocolOptions::new().with_accuracy(0.1).with_confidence(0.1);
        for options in [
            base.clone().with_accuracy(0.0),
            base.clone().with_confidence(1.0),
            base.clone().with_shots(0),
            base.clone().with_shadow_size(0),
            base.clone().with_shadow_medians(0),
            base.clone().with_calibration(vec![]),
            base.clone().with_calibration(vec![0.5, 1.5]),
            base.clone().with_calibration(vec![0.0]),
        ] {
            assert!(
                matches!(
                    ShadowOptions::from_protocol_options(&options),
                    Err(ShadowRuntimeError::InvalidArgument(_))
                ),
                "{options:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_unsupported_file_extension() {
        let err = ProtocolOptions::from_file("options.yaml").unwrap_err();
        assert!(matches!(
            err,
            ShadowRuntimeError::Configuration(ConfigurationError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let path = std::env::temp_dir()
            .join(format!("shadow-missing-{}", uuid::Uuid::new_v4()))
            .join("options.toml");
        let err = ProtocolOptions::from_file(&path).unwrap_err();
        match err {
            ShadowRuntimeError::Configuration(ConfigurationError::Io { path: reported, source }) => {
                assert_eq!(reported, path.display().to_string());
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_from_file_reads_toml() {
        let path = std::env::temp_dir().join(format!("shadow-options-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "shadow_size = 12\nshadow_medians = 3\n").unwrap();
        let options = ProtocolOptions::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(options.shadow_size, Some(12));
        assert_eq!(options.shadow_medians, Some(3));
    }
}
