// =============================================================================
// Classical Shadows Runtime - Measurement Data
// =============================================================================
// Table of Contents:
//   1. PauliBasis - Per-qubit randomized measurement axis
//   2. MeasurementOutcome - Bitstring or empirical probability vector
//   3. MeasurementData - Immutable record of one acquisition run
//   4. Serialized form
// =============================================================================
// Purpose: The value objects produced by acquisition and consumed by
//          estimation. Shape invariants are checked when the record is built
//          so that estimation never sees inconsistent dimensions.
// =============================================================================

use crate::error::{ShadowResult, ShadowRuntimeError};
use rand::distr::{Distribution, StandardUniform};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

const PROBABILITY_SUM_TOLERANCE: f64 = 1e-6;

// =============================================================================
// 1. PauliBasis - Per-qubit randomized measurement axis
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PauliBasis {
    X,
    Y,
    Z,
}

impl PauliBasis {
    pub const ALL: [PauliBasis; 3] = [PauliBasis::X, PauliBasis::Y, PauliBasis::Z];

    pub fn label(self) -> char {
        match self {
            PauliBasis::X => 'X',
            PauliBasis::Y => 'Y',
            PauliBasis::Z => 'Z',
        }
    }
}

impl fmt::Display for PauliBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl Distribution<PauliBasis> for StandardUniform {
    fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> PauliBasis {
        PauliBasis::ALL[rng.random_range(0..3)]
    }
}

// =============================================================================
// 2. MeasurementOutcome - Bitstring or empirical probability vector
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    /// One shot per repetition: a single bitstring.
    SingleShot,
    /// Several shots per repetition: empirical frequencies over 2^n outcomes.
    MultiShot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementOutcome {
    Bitstring(Vec<u8>),
    ProbabilityVector(Vec<f64>),
}

impl MeasurementOutcome {
    /// Builds the empirical frequency vector of a batch of equally weighted shots.
    pub fn from_shots(number_of_quantum_bits: usize, shots: &[Vec<u8>]) -> ShadowResult<Self> {
        if shots.is_empty() {
            return Err(ShadowRuntimeError::invalid_argument(
                "empirical frequencies need at least one shot",
            ));
        }
        let dimension = outcome_space_dimension(number_of_quantum_bits)?;
        let mut frequencies = vec![0.0; dimension];
        let weight = 1.0 / shots.len() as f64;
        for shot in shots {
            if shot.len() != number_of_quantum_bits {
                return Err(ShadowRuntimeError::shape_mismatch(
                    "shot bitstring length",
                    number_of_quantum_bits,
                    shot.len(),
                ));
            }
            frequencies[bitstring_index(shot)] += weight;
        }
        Ok(MeasurementOutcome::ProbabilityVector(frequencies))
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            MeasurementOutcome::Bitstring(_) => OutcomeKind::SingleShot,
            MeasurementOutcome::ProbabilityVector(_) => OutcomeKind::MultiShot,
        }
    }

    /// Checks dimensionality and content against an expected qubit count.
    pub fn validate(&self, number_of_quantum_bits: usize) -> ShadowResult<()> {
        match self {
            MeasurementOutcome::Bitstring(bits) => {
                if bits.len() != number_of_quantum_bits {
                    return Err(ShadowRuntimeError::shape_mismatch(
                        "bitstring length",
                        number_of_quantum_bits,
                        bits.len(),
                    ));
                }
                if let Some(bit) = bits.iter().find(|&&b| b > 1) {
                    return Err(ShadowRuntimeError::invalid_argument(format!(
                        "bitstring entries must be 0 or 1, found {bit}"
                    )));
                }
            }
            MeasurementOutcome::ProbabilityVector(probabilities) => {
                let dimension = outcome_space_dimension(number_of_quantum_bits)?;
                if probabilities.len() != dimension {
                    return Err(ShadowRuntimeError::shape_mismatch(
                        "probability vector length",
                        dimension,
                        probabilities.len(),
                    ));
                }
                if probabilities.iter().any(|p| !p.is_finite() || *p < 0.0) {
                    return Err(ShadowRuntimeError::invalid_argument(
                        "probability vector entries must be finite and non-negative",
                    ));
                }
                let total: f64 = probabilities.iter().sum();
                if (total - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
                    return Err(ShadowRuntimeError::invalid_argument(format!(
                        "probability vector must sum to 1, sums to {total}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// `2^n`, the length of an outcome vector over `n` qubits.
pub fn outcome_space_dimension(number_of_quantum_bits: usize) -> ShadowResult<usize> {
    u32::try_from(number_of_quantum_bits)
        .ok()
        .and_then(|bits| 1usize.checked_shl(bits))
        .ok_or_else(|| {
            ShadowRuntimeError::invalid_argument(format!(
                "outcome space of {number_of_quantum_bits} qubits exceeds the addressable size"
            ))
        })
}

/// Index of a bitstring in a 2^n outcome vector; qubit 0 is the most significant bit.
pub fn bitstring_index(bits: &[u8]) -> usize {
    bits.iter().fold(0usize, |acc, &bit| (acc << 1) | (bit as usize))
}

// =============================================================================
// 3. MeasurementData - Immutable record of one acquisition run
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MeasurementDataRecord", into = "MeasurementDataRecord")]
pub struct MeasurementData {
    acquisition_id: Uuid,
    number_of_quantum_bits: usize,
    unitaries: Vec<Vec<PauliBasis>>,
    samples: Vec<MeasurementOutcome>,
}

impl Default for MeasurementData {
    fn default() -> Self {
        Self::empty()
    }
}

impl MeasurementData {
    pub fn empty() -> Self {
        Self {
            acquisition_id: Uuid::nil(),
            number_of_quantum_bits: 0,
            unitaries: Vec::new(),
            samples: Vec::new(),
        }
    }

    pub fn new(
        unitaries: Vec<Vec<PauliBasis>>,
        samples: Vec<MeasurementOutcome>,
    ) -> ShadowResult<Self> {
        Self::with_acquisition_id(Uuid::new_v4(), unitaries, samples)
    }

    pub(crate) fn with_acquisition_id(
        acquisition_id: Uuid,
        unitaries: Vec<Vec<PauliBasis>>,
        samples: Vec<MeasurementOutcome>,
    ) -> ShadowResult<Self> {
        if unitaries.len() != samples.len() {
            return Err(ShadowRuntimeError::shape_mismatch(
                "samples per repetition",
                unitaries.len(),
                samples.len(),
            ));
        }
        let Some(first_bases) = unitaries.first() else {
            return Ok(Self::empty());
        };

        let number_of_quantum_bits = first_bases.len();
        if number_of_quantum_bits == 0 {
            return Err(ShadowRuntimeError::invalid_argument(
                "measurement data must cover at least one qubit",
            ));
        }
        if let Some(bases) = unitaries
            .iter()
            .find(|bases| bases.len() != number_of_quantum_bits)
        {
            return Err(ShadowRuntimeError::shape_mismatch(
                "bases per repetition",
                number_of_quantum_bits,
                bases.len(),
            ));
        }

        let kind = samples[0].kind();
        for sample in &samples {
            if sample.kind() != kind {
                return Err(ShadowRuntimeError::invalid_argument(
                    "samples mix bitstrings and probability vectors",
                ));
            }
            sample.validate(number_of_quantum_bits)?;
        }

        Ok(Self {
            acquisition_id,
            number_of_quantum_bits,
            unitaries,
            samples,
        })
    }

    pub fn acquisition_id(&self) -> Uuid {
        self.acquisition_id
    }

    pub fn number_of_quantum_bits(&self) -> usize {
        self.number_of_quantum_bits
    }

    pub fn shadow_size(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn unitaries(&self) -> &[Vec<PauliBasis>] {
        &self.unitaries
    }

    pub fn samples(&self) -> &[MeasurementOutcome] {
        &self.samples
    }

    pub fn outcome_kind(&self) -> Option<OutcomeKind> {
        self.samples.first().map(MeasurementOutcome::kind)
    }

    pub fn repetitions(&self) -> impl Iterator<Item = (&[PauliBasis], &MeasurementOutcome)> {
        self.unitaries
            .iter()
            .map(Vec::as_slice)
            .zip(self.samples.iter())
    }
}

// =============================================================================
// 4. Serialized form
// =============================================================================

#[derive(Serialize, Deserialize)]
struct MeasurementDataRecord {
    #[serde(default)]
    acquisition_id: Uuid,
    unitaries: Vec<Vec<PauliBasis>>,
    samples: Vec<MeasurementOutcome>,
}

impl TryFrom<MeasurementDataRecord> for MeasurementData {
    type Error = ShadowRuntimeError;

    fn try_from(record: MeasurementDataRecord) -> Result<Self, Self::Error> {
        Self::with_acquisition_id(record.acquisition_id, record.unitaries, record.samples)
    }
}

impl From<MeasurementData> for MeasurementDataRecord {
    fn from(data: MeasurementData) -> Self {
        Self {
            acquisition_id: data.acquisition_id,
            unitaries: data.unitaries,
            samples: data.samples,
        }
    }
}
