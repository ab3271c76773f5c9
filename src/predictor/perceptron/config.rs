//! Configuration for a perceptron predictor.

use crate::error::ConfigError;
use crate::history::HistoryRegister;
use crate::predictor::perceptron::*;

/// Configuration for a [`PerceptronPredictor`].
///
/// Validated once at construction; immutable for the predictor's lifetime.
#[derive(Clone, Debug)]
pub struct PerceptronConfig {
    /// Number of history outcomes fed to each perceptron.
    pub history_length: usize,

    /// Number of perceptrons in the table. Must be a power of two.
    pub table_size: usize,

    /// Saturation bound for every weight.
    pub weight_limit: i8,

    /// Number of low program counter bits discarded when forming an index.
    pub pc_shift: usize,

    /// Optional low-confidence training threshold.
    ///
    /// `None` trains only on outright mispredictions. `Some(theta)` also
    /// trains on correct predictions whose output magnitude is at most
    /// `theta` (see [`PerceptronConfig::recommended_threshold`]).
    pub train_threshold: Option<i32>,
}

impl PerceptronConfig {
    /// Create a configuration with the default weight bound, a 4-byte
    /// instruction alignment shift, and mispredict-only training.
    pub fn new(history_length: usize, table_size: usize) -> Self {
        Self {
            history_length,
            table_size,
            weight_limit: i8::MAX,
            pc_shift: 2,
            train_threshold: None,
        }
    }

    /// Training threshold suggested in the literature for a given history
    /// length.
    pub fn recommended_threshold(history_length: usize) -> i32 {
        ((1.93f32 * (history_length as f32)) + 14.0f32) as i32
    }

    /// Get the [approximate] number of storage bits.
    pub fn storage_bits(&self) -> usize {
        // Signed weights in [-limit, +limit]
        let weight_bits = (self.weight_limit.max(1) as u32).ilog2()
            as usize + 2;
        let entry_bits = weight_bits * (self.history_length + 1);

        // Two bits per history entry (signed unit)
        (entry_bits * self.table_size) + (2 * self.history_length)
    }

    /// The per-update policy this configuration implies.
    pub fn training_policy(&self) -> TrainingPolicy {
        TrainingPolicy {
            weight_limit: self.weight_limit,
            threshold: self.train_threshold,
        }
    }

    /// Validate the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_length == 0 {
            return Err(ConfigError::ZeroHistoryLength);
        }
        if self.table_size == 0 {
            return Err(ConfigError::ZeroTableSize);
        }
        if !self.table_size.is_power_of_two() {
            return Err(ConfigError::TableSizeNotPowerOfTwo(self.table_size));
        }
        if self.weight_limit <= 0 {
            return Err(ConfigError::NonPositiveWeightLimit);
        }
        Ok(())
    }

    /// Use this configuration to create a new [`PerceptronPredictor`].
    ///
    /// The table and the history register are both allocated here and live
    /// for the predictor's entire lifetime; prediction and training never
    /// allocate.
    pub fn build(self) -> Result<PerceptronPredictor, ConfigError> {
        self.validate()?;
        let table = PerceptronTable::new(
            self.table_size,
            self.history_length,
            self.pc_shift,
        );
        let ghr = HistoryRegister::new(self.history_length);
        Ok(PerceptronPredictor {
            cfg: self,
            table,
            ghr,
        })
    }
}
