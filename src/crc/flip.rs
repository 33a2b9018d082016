//! Reaching a target checksum by flipping a subset of allowed bits.
//!
//! CRCs are linear over GF(2): flipping one message bit XORs a fixed
//! pattern into the checksum, independently of every other bit. Each
//! allowed position therefore contributes one column to a linear system,
//! the right-hand side is the XOR of the current checksum and the target,
//! and any solution names a subset of positions whose combined flips move
//! the checksum exactly onto the target. Solving is plain Gaussian
//! elimination with back substitution; "no solution" means the target is
//! unreachable from the allowed positions and is reported as an absent
//! value rather than an error.
//!
//! The column patterns are checksums of single-bit messages. They are
//! gathered by streaming one all-zero engine across the message length
//! and snapshotting it just before each affected byte, so the shared
//! zero-prefix work is done only once no matter how many positions there
//! are.

use crate::checksum::{Digest, FlipError};
use crate::matrix::BitMatrix;
use crate::value::CrcValue;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Solves "which of these bits do I flip" questions against a checksum
/// algorithm.
pub struct Flipper<'a> {
    algo: &'a dyn Digest,
    verbosity: u64,
}

impl<'a> Flipper<'a> {
    pub fn new(algo: &'a dyn Digest) -> Flipper<'a> {
        Flipper { algo, verbosity: 0 }
    }

    /// Makes the flipper report on stderr what it is doing.
    pub fn verbosity(mut self, verbosity: u64) -> Flipper<'a> {
        self.verbosity = verbosity;
        self
    }

    /// Digests `bytes` first, then behaves like [`Flipper::flip_with_value`].
    pub fn flip_with_data(
        &self,
        bytes: &[u8],
        positions: &[u64],
        target: &CrcValue,
    ) -> Result<Option<Vec<u64>>, FlipError> {
        let checksum = self.algo.digest(bytes);
        self.flip_with_value(&checksum, bytes.len() as u64, positions, target)
    }

    /// Finds a subset of `positions` (bit indices, bit 0 being the least
    /// significant bit of byte 0) whose flips turn a message of `length`
    /// bytes with checksum `checksum` into one with checksum `target`.
    ///
    /// Returns the subset in ascending order; it never has more members
    /// than the engine width. `Ok(None)` means the target cannot be
    /// reached from the allowed positions. An empty subset means the
    /// checksum already matches.
    pub fn flip_with_value(
        &self,
        checksum: &CrcValue,
        length: u64,
        positions: &[u64],
        target: &CrcValue,
    ) -> Result<Option<Vec<u64>>, FlipError> {
        let width = self.algo.width();
        if target.bits() > width {
            return Err(FlipError::WidthMismatch {
                width,
                value_bits: target.bits(),
            });
        }
        for &position in positions {
            if position >= 8 * length {
                return Err(FlipError::InvalidPosition { position, length });
            }
        }
        if checksum == target {
            return Ok(Some(Vec::new()));
        }
        if positions.is_empty() {
            return Ok(None);
        }

        if self.verbosity > 0 {
            eprintln!(
                "flip: gathering {} positional checksums over {} bytes",
                positions.len(),
                length
            );
        }
        let columns = self.position_sums(length, positions);

        let unknowns = positions.len();
        let mut system = BitMatrix::new(width, unknowns + 1);
        for (column, pattern) in columns.iter().enumerate() {
            for row in 0..width {
                if pattern.bit(row) {
                    system.set(row, column, true);
                }
            }
        }
        let difference = checksum ^ target;
        for row in 0..width {
            if difference.bit(row) {
                system.set(row, unknowns, true);
            }
        }

        let pivots = system.eliminate();
        if self.verbosity > 0 {
            let rank = pivots.iter().filter(|p| p.is_some()).count();
            eprintln!(
                "flip: system of {} unknowns has rank {} over {} rows",
                unknowns, rank, width
            );
        }
        let solution = match system.back_substitute(&pivots) {
            Some(solution) => solution,
            None => return Ok(None),
        };
        let mut flips: Vec<u64> = solution.iter_ones().map(|i| positions[i]).collect();
        flips.sort_unstable();
        Ok(Some(flips))
    }

    /// The checksum deltas caused by flipping each position alone.
    ///
    /// One engine walks the all-zero message once; just before the byte
    /// holding a position, its state is snapshotted and the single set
    /// bit injected. The snapshots are finished independently, so their
    /// results do not depend on the order positions are handled in.
    fn position_sums(&self, length: u64, positions: &[u64]) -> Vec<CrcValue> {
        let mut order: Vec<usize> = (0..positions.len()).collect();
        order.sort_by_key(|&i| positions[i]);

        let mut blank = self.algo.engine();
        let mut processed = 0u64;
        let mut snapshots = Vec::with_capacity(positions.len());
        for index in order {
            let position = positions[index];
            let byte = position / 8;
            blank.add_zeros(byte - processed);
            processed = byte;
            let mut single = blank.split();
            single.add(&[1u8 << (position % 8)]);
            snapshots.push((index, single, length - byte - 1));
        }
        blank.add_zeros(length - processed);
        let blank_sum = blank.close();

        #[cfg(feature = "parallel")]
        let finished: Vec<(usize, CrcValue)> = snapshots
            .into_par_iter()
            .map(|(index, mut single, padding)| {
                single.add_zeros(padding);
                (index, single.close())
            })
            .collect();
        #[cfg(not(feature = "parallel"))]
        let finished: Vec<(usize, CrcValue)> = snapshots
            .into_iter()
            .map(|(index, mut single, padding)| {
                single.add_zeros(padding);
                (index, single.close())
            })
            .collect();

        let mut sums = vec![CrcValue::from(0u8); positions.len()];
        for (index, sum) in finished {
            sums[index] = &blank_sum ^ &sum;
        }
        sums
    }
}
