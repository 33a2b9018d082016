//! Dense binary matrices and Gaussian elimination over GF(2).
//!
//! Rows are bit vectors packed into 32-bit words, so eliminating a column
//! from a row is a handful of word XORs. Addition is XOR and
//! multiplication is AND, which makes row reduction exact; there is no
//! pivoting strategy to speak of beyond "first set bit wins".

use bitvec::prelude::*;

/// A single matrix row (and the solution vector type).
pub type BitRow = BitVec<u32, Lsb0>;

/// A fixed-size `rows x cols` matrix over GF(2).
///
/// Indexing out of range panics, as with any slice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitMatrix {
    rows: Vec<BitRow>,
    cols: usize,
}

impl BitMatrix {
    /// An all-zero matrix of the given dimensions.
    pub fn new(rows: usize, cols: usize) -> BitMatrix {
        BitMatrix {
            rows: (0..rows).map(|_| bitvec![u32, Lsb0; 0; cols]).collect(),
            cols,
        }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        self.rows[row][col]
    }

    pub fn set(&mut self, row: usize, col: usize, bit: bool) {
        self.rows[row].set(col, bit);
    }

    /// XORs row `src` into row `dst`, word by word.
    fn xor_rows(&mut self, dst: usize, src: usize) {
        let (dst_row, src_row) = if dst < src {
            let (head, tail) = self.rows.split_at_mut(src);
            (&mut head[dst], &tail[0])
        } else {
            let (head, tail) = self.rows.split_at_mut(dst);
            (&mut tail[0], &head[src])
        };
        for (d, s) in dst_row
            .as_raw_mut_slice()
            .iter_mut()
            .zip(src_row.as_raw_slice())
        {
            *d ^= *s;
        }
    }

    /// In-place reduction to reduced row echelon form.
    ///
    /// Returns the pivot column of each row, `None` for zero rows. Zero
    /// rows end up at the bottom. Running this on an already reduced
    /// matrix changes nothing.
    pub fn eliminate(&mut self) -> Vec<Option<usize>> {
        let mut pivots = vec![None; self.height()];
        let mut fixed = 0;
        for col in 0..self.cols {
            if fixed == self.height() {
                break;
            }
            let pivot = match (fixed..self.height()).find(|&r| self.rows[r][col]) {
                Some(p) => p,
                None => continue,
            };
            self.rows.swap(fixed, pivot);
            for row in 0..self.height() {
                if row != fixed && self.rows[row][col] {
                    self.xor_rows(row, fixed);
                }
            }
            pivots[fixed] = Some(col);
            fixed += 1;
        }
        pivots
    }

    /// Solves the system assuming the last column is the augmented one.
    ///
    /// `pivots` must come from a prior `eliminate` call. Free variables
    /// are left at zero. Returns `None` when any row reduces to an
    /// impossible `0 = 1`, i.e. when a pivot sits in the augmented column
    /// or a zero row keeps a set augmented bit.
    pub fn back_substitute(&self, pivots: &[Option<usize>]) -> Option<BitRow> {
        let unknowns = self.cols - 1;
        let mut solution = bitvec![u32, Lsb0; 0; unknowns];
        for row in (0..self.height()).rev() {
            match pivots[row] {
                None => {
                    if self.rows[row][unknowns] {
                        return None;
                    }
                }
                Some(p) if p >= unknowns => return None,
                Some(p) => {
                    let mut value = self.rows[row][unknowns];
                    for offset in self.rows[row][p + 1..unknowns].iter_ones() {
                        value ^= solution[p + 1 + offset];
                    }
                    solution.set(p, value);
                }
            }
        }
        Some(solution)
    }

    /// `eliminate` followed by `back_substitute`.
    pub fn solve(&mut self) -> Option<BitRow> {
        let pivots = self.eliminate();
        self.back_substitute(&pivots)
    }
}
