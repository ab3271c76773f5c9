//! Types for tracking global branch history.

use crate::branch::*;

/// A fixed-length register holding the outcomes of the most recently
/// resolved branches, shared across all predicted branches.
///
/// Outcomes are stored as signed units (see [Outcome::sign]) with the most
/// recent outcome at index 0. Entries are initialized to zero, meaning
/// "no recorded outcome"; a zero entry contributes nothing to a dot product.
/// After `len` resolved branches, the register only contains -1 or +1.
pub struct HistoryRegister {
    data: Vec<i8>,
}

// Renders the register with the *oldest* outcome leftmost and the newest
// outcome rightmost ('1' for taken, '0' for not-taken, '.' for unset).
impl std::fmt::Display for HistoryRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let x: String = self.data.iter()
            .map(|v| match v {
                1 => '1',
                -1 => '0',
                _ => '.',
            })
            .rev()
            .collect();
        write!(f, "{}", x)
    }
}

impl HistoryRegister {
    /// Create a register with the specified length.
    /// All entries in the register are initialized to zero.
    pub fn new(len: usize) -> Self {
        assert!(len > 0);
        Self {
            data: vec![0; len],
        }
    }

    pub fn len(&self) -> usize { self.data.len() }

    /// Return the register contents, newest outcome first.
    pub fn values(&self) -> &[i8] { &self.data }

    /// Shift a resolved outcome into the register.
    /// The oldest entry is discarded; the length never changes.
    ///
    /// Must be called exactly once per resolved branch, in resolution order.
    pub fn shift_in(&mut self, outcome: Outcome) {
        let len = self.data.len();
        self.data.copy_within(..len - 1, 1);
        self.data[0] = outcome.sign();
    }

    /// Capture an owned copy of the current register contents.
    ///
    /// A prediction and its matching training step must both consume the
    /// snapshot captured when the prediction was made, *not* the live
    /// register (which other branches may have advanced in the interim).
    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            data: self.data.clone().into_boxed_slice(),
        }
    }

    /// Reset all entries to zero.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }
}

/// A point-in-time copy of a [HistoryRegister], captured at prediction time
/// and threaded through to the matching training step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistorySnapshot {
    data: Box<[i8]>,
}
impl HistorySnapshot {
    pub fn len(&self) -> usize { self.data.len() }

    pub fn as_slice(&self) -> &[i8] { &self.data }

    /// Iterate over the recorded signed units, newest outcome first.
    pub fn values(&self) -> impl Iterator<Item = i8> + '_ {
        self.data.iter().copied()
    }
}
