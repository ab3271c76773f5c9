//! Implementation of a perceptron branch-direction predictor.

pub mod config;
pub use config::*;

use crate::branch::*;
use crate::history::*;
use crate::predictor::table::*;

/// Policy applied when retraining a perceptron.
#[derive(Clone, Copy, Debug)]
pub struct TrainingPolicy {
    /// Saturation bound for every weight.
    pub weight_limit: i8,

    /// When present, also train on correct predictions whose output
    /// magnitude does not exceed this threshold.
    pub threshold: Option<i32>,
}

/// Clamp a freshly-updated weight to the saturation bound.
fn saturate(val: i32, limit: i8) -> i8 {
    val.clamp(-(limit as i32), limit as i32) as i8
}

/// Perceptron [with integer weights].
///
/// See the following papers:
///
/// - "Dynamic Branch Prediction with Perceptrons" (Jiménez and Lin, 2001)
/// - "Neural Methods for Dynamic Branch Prediction" (Jiménez and Lin, 2002)
///
pub struct Perceptron {
    /// One weight per history bit.
    weights: Vec<i8>,

    /// Weight applied independently of history.
    bias: i8,
}
impl Perceptron {
    /// Create a perceptron for the given history length.
    /// All weights are initialized to zero.
    pub fn new(history_length: usize) -> Self {
        Self {
            weights: vec![0; history_length],
            bias: 0,
        }
    }

    /// Reset the state.
    pub fn reset(&mut self) {
        self.bias = 0;
        self.weights.fill(0);
    }

    /// Return a reference to the list of history weights.
    pub fn weights(&self) -> &[i8] {
        &self.weights
    }

    /// Return the bias weight.
    pub fn bias(&self) -> i8 {
        self.bias
    }

    /// Compute the dot product of the history/weight vectors.
    fn dot_product(&self, hist: &HistorySnapshot) -> i32 {
        assert!(hist.len() == self.weights.len());
        self.weights.iter().zip(hist.values())
            .map(|(w, x)| (*w as i32) * (x as i32))
            .sum()
    }

    /// Given some history, compute the output value.
    /// The predicted outcome is determined by the sign of the output,
    /// where zero predicts 'taken'.
    pub fn output(&self, hist: &HistorySnapshot) -> (i32, Outcome) {
        let res = (self.bias as i32) + self.dot_product(hist);
        let out = if res >= 0 { Outcome::T } else { Outcome::N };
        (res, out)
    }

    /// Given the resolved outcome, adjust the weights.
    ///
    /// The prediction is recomputed from `hist`, which must be the same
    /// snapshot that produced the original prediction. Training occurs after
    /// a misprediction, or [when the policy carries a threshold] when the
    /// output magnitude was below the threshold.
    pub fn train(&mut self, hist: &HistorySnapshot, outcome: Outcome,
        policy: TrainingPolicy)
    {
        let (output, prediction) = self.output(hist);
        let t = outcome.sign();

        let miss = (prediction != outcome);
        let below_threshold = match policy.threshold {
            Some(theta) => output.abs() <= theta,
            None => false,
        };

        // When a bit in the history matches the outcome, increment the
        // corresponding weight. Otherwise, decrement the corresponding
        // weight. Unset history bits leave their weights untouched.
        if miss || below_threshold {
            let limit = policy.weight_limit;
            self.bias = saturate((self.bias as i32) + (t as i32), limit);
            for (w, x) in self.weights.iter_mut().zip(hist.values()) {
                *w = saturate((*w as i32) + (t as i32) * (x as i32), limit);
            }
        }
    }
}

/// A table of [Perceptron] indexed by the program counter.
pub struct PerceptronTable {
    /// Table of perceptrons
    data: Vec<Perceptron>,

    /// Number of entries
    size: usize,

    /// Number of low program counter bits discarded when forming an index.
    /// These only encode instruction alignment and do not discriminate
    /// between branches.
    pc_shift: usize,
}
impl PerceptronTable {
    pub fn new(size: usize, history_length: usize, pc_shift: usize) -> Self {
        assert!(size.is_power_of_two());
        let data = (0..size).map(|_| Perceptron::new(history_length))
            .collect();
        Self {
            data,
            size,
            pc_shift,
        }
    }

    /// Reset every entry in the table.
    pub fn reset(&mut self) {
        for entry in self.data.iter_mut() {
            entry.reset();
        }
    }
}

impl PredictorTable for PerceptronTable {
    type Input = usize;
    type Entry = Perceptron;

    fn size(&self) -> usize { self.size }

    fn get_index(&self, pc: usize) -> usize {
        (pc >> self.pc_shift) & self.index_mask()
    }

    fn get_entry(&self, pc: usize) -> &Perceptron {
        &self.data[self.get_index(pc)]
    }

    fn get_entry_mut(&mut self, pc: usize) -> &mut Perceptron {
        let index = self.get_index(pc);
        &mut self.data[index]
    }
}

/// Container for output from [PerceptronPredictor::predict], including the
/// predicted outcome and the history snapshot the prediction was made with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PerceptronPrediction {
    /// A predicted direction
    pub outcome: Outcome,

    /// The output value the direction was derived from
    pub output: i32,

    /// The history snapshot used to compute the output.
    ///
    /// This must be passed back to [PerceptronPredictor::resolve] for this
    /// branch: with multiple predictions in flight, the live register has
    /// usually advanced past the state this prediction was made with.
    pub history: HistorySnapshot,
}

/// A branch-direction predictor backed by a table of perceptrons and a
/// single shared global history register.
pub struct PerceptronPredictor {
    /// The configuration used to create this object
    cfg: PerceptronConfig,

    /// Table of perceptrons
    table: PerceptronTable,

    /// Global history register
    ghr: HistoryRegister,
}
impl PerceptronPredictor {
    /// Return the configuration used to create this predictor.
    pub fn config(&self) -> &PerceptronConfig { &self.cfg }

    /// Return a reference to the global history register.
    pub fn history(&self) -> &HistoryRegister { &self.ghr }

    /// Return a reference to the table of perceptrons.
    pub fn table(&self) -> &PerceptronTable { &self.table }

    /// Reset all perceptrons and the history register.
    pub fn reset(&mut self) {
        self.table.reset();
        self.ghr.clear();
    }

    /// Make a prediction for the branch at `pc`.
    ///
    /// This mutates neither the table nor the history register; calling it
    /// again with no intervening [PerceptronPredictor::resolve] yields an
    /// identical result.
    pub fn predict(&self, pc: usize) -> PerceptronPrediction {
        let entry = self.table.get_entry(pc);
        let history = self.ghr.snapshot();
        let (output, outcome) = entry.output(&history);
        PerceptronPrediction {
            outcome,
            output,
            history,
        }
    }

    /// Resolve the branch at `pc` with its actual outcome.
    ///
    /// Trains the perceptron that produced `prediction` using the snapshot
    /// captured at prediction time, then shifts the outcome into the global
    /// history register. Must be called exactly once per resolved branch, in
    /// resolution order; predictions discarded by a pipeline flush are
    /// simply never resolved.
    pub fn resolve(&mut self, pc: usize, prediction: &PerceptronPrediction,
        outcome: Outcome)
    {
        let policy = self.cfg.training_policy();
        let entry = self.table.get_entry_mut(pc);
        entry.train(&prediction.history, outcome, policy);

        // The shift happens strictly after training: the learning rule
        // consumes the pre-shift history.
        self.ghr.shift_in(outcome);
    }

    /// Notification hook for a pipeline flush.
    ///
    /// This predictor carries no per-branch speculative state beyond the
    /// snapshots already held by the driver, so there is nothing to undo.
    pub fn on_squash(&mut self) {}

    /// Convenience wrapper around [PerceptronConfig::build].
    pub fn new(cfg: PerceptronConfig)
        -> Result<Self, crate::error::ConfigError>
    {
        cfg.build()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::predictor::table::PredictorTable;

    fn predictor(history_length: usize, table_size: usize)
        -> PerceptronPredictor
    {
        PerceptronConfig::new(history_length, table_size).build().unwrap()
    }

    #[test]
    fn cold_start_predicts_taken() {
        let p = predictor(2, 2);
        let pred = p.predict(0x1000);
        assert_eq!(pred.output, 0);
        assert_eq!(pred.outcome, Outcome::T);
    }

    #[test]
    fn predict_is_pure() {
        let p = predictor(8, 64);
        let a = p.predict(0x4010);
        let b = p.predict(0x4010);
        assert_eq!(a, b);
    }

    #[test]
    fn first_not_taken_resolve_trains_bias_only() {
        let mut p = predictor(2, 2);
        let pred = p.predict(0x1000);
        assert_eq!(pred.outcome, Outcome::T);

        p.resolve(0x1000, &pred, Outcome::N);

        // The history was all zeros at prediction time, so only the bias
        // moves; the register picks up the resolved outcome.
        let entry = p.table().get_entry(0x1000);
        assert_eq!(entry.bias(), -1);
        assert_eq!(entry.weights(), &[0, 0]);
        assert_eq!(p.history().values(), &[-1, 0]);

        let pred = p.predict(0x1000);
        assert_eq!(pred.output, -1);
        assert_eq!(pred.outcome, Outcome::N);
    }

    #[test]
    fn resolve_shifts_history_once() {
        let mut p = predictor(4, 16);
        for (i, outcome) in [Outcome::T, Outcome::T, Outcome::N].iter()
            .enumerate()
        {
            let pc = 0x2000 + i * 4;
            let pred = p.predict(pc);
            p.resolve(pc, &pred, *outcome);
            assert_eq!(p.history().values()[0], outcome.sign());
            assert_eq!(p.history().len(), 4);
        }
        assert_eq!(p.history().values(), &[-1, 1, 1, 0]);
    }

    #[test]
    fn index_discards_alignment_and_wraps() {
        let table = PerceptronTable::new(8, 4, 2);

        // Addresses within the same aligned word share an entry
        assert_eq!(table.get_index(0x4000), table.get_index(0x4003));

        // The index is periodic in (table_size * 4) at pc_shift = 2
        assert_eq!(table.get_index(0x4000), table.get_index(0x4000 + 8 * 4));
        assert_eq!(table.get_index(0x40), table.get_index(0x40 + 8 * 4 * 3));

        // Out-of-range addresses always wrap into the table
        assert!(table.get_index(usize::MAX) < table.size());
    }

    #[test]
    fn training_uses_the_prediction_time_snapshot() {
        let mut p = predictor(1, 2);

        // Two in-flight predictions against different entries
        let pred_a = p.predict(0x0000);
        let pred_b = p.predict(0x0004);

        // Resolving the second branch advances the live register
        p.resolve(0x0004, &pred_b, Outcome::T);
        assert_eq!(p.history().values(), &[1]);

        // The first branch still trains against its own [zero] snapshot:
        // its history weight must not move
        p.resolve(0x0000, &pred_a, Outcome::N);
        let entry = p.table().get_entry(0x0000);
        assert_eq!(entry.bias(), -1);
        assert_eq!(entry.weights(), &[0]);
    }

    #[test]
    fn weights_never_exceed_the_bound() {
        let limit = 4i8;
        let mut cfg = PerceptronConfig::new(4, 2);
        cfg.weight_limit = limit;
        let mut p = cfg.build().unwrap();

        // Mispredict on every resolve for 10x the bound
        for _ in 0..(10 * limit as usize) {
            let pred = p.predict(0x1000);
            p.resolve(0x1000, &pred, !pred.outcome);

            let entry = p.table().get_entry(0x1000);
            assert!(entry.bias().abs() <= limit);
            assert!(entry.weights().iter().all(|w| w.abs() <= limit));
        }
    }

    #[test]
    fn same_direction_training_saturates_at_the_bound() {
        let limit = 3i8;
        let policy = TrainingPolicy {
            weight_limit: limit,
            threshold: Some(i32::MAX),
        };

        let mut ghr = HistoryRegister::new(4);
        for _ in 0..4 {
            ghr.shift_in(Outcome::T);
        }
        let hist = ghr.snapshot();

        let mut perc = Perceptron::new(4);
        for _ in 0..(10 * limit as usize) {
            perc.train(&hist, Outcome::T, policy);
        }
        assert_eq!(perc.bias(), limit);
        assert_eq!(perc.weights(), &[limit; 4]);
    }

    #[test]
    fn learns_an_alternating_pattern() {
        let mut p = predictor(4, 16);
        let mut outcome = Outcome::T;
        let mut hits = 0;
        for i in 0..100 {
            let pred = p.predict(0x1000);
            if i >= 80 && pred.outcome == outcome {
                hits += 1;
            }
            p.resolve(0x1000, &pred, outcome);
            outcome = !outcome;
        }
        assert_eq!(hits, 20);
    }

    #[test]
    fn threshold_variant_trains_on_low_confidence_hits() {
        let mut cfg = PerceptronConfig::new(2, 2);
        cfg.train_threshold =
            Some(PerceptronConfig::recommended_threshold(2));
        let mut p = cfg.build().unwrap();

        let pred = p.predict(0x1000);
        assert_eq!(pred.outcome, Outcome::T);

        // A correct prediction, but with zero-magnitude output: the
        // threshold variant still strengthens the weights
        p.resolve(0x1000, &pred, Outcome::T);
        assert_eq!(p.table().get_entry(0x1000).bias(), 1);
    }

    #[test]
    fn mispredict_only_training_skips_correct_predictions() {
        let mut p = predictor(2, 2);
        let pred = p.predict(0x1000);
        p.resolve(0x1000, &pred, Outcome::T);

        // Correct prediction, default policy: no weight movement
        let entry = p.table().get_entry(0x1000);
        assert_eq!(entry.bias(), 0);
        assert_eq!(entry.weights(), &[0, 0]);

        // The history register still advances
        assert_eq!(p.history().values(), &[1, 0]);
    }

    #[test]
    fn reset_restores_the_cold_state() {
        let mut p = predictor(4, 8);
        for i in 0..32 {
            let pc = 0x3000 + (i % 5) * 4;
            let pred = p.predict(pc);
            p.resolve(pc, &pred, Outcome::from(i % 3 == 0));
        }
        p.reset();
        assert!(p.history().values().iter().all(|v| *v == 0));
        let pred = p.predict(0x3000);
        assert_eq!(pred.output, 0);
        assert_eq!(pred.outcome, Outcome::T);
    }
}
