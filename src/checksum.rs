//! The seams every checksum algorithm in this crate plugs into.
//!
//! `Digest` describes an algorithm: it knows its width and can mint
//! streaming engines. `Engine` is one in-flight computation: bytes go in,
//! a `CrcValue` comes out of `close` exactly once. Both are object safe
//! because the bit flipper drives arbitrary algorithms, including the
//! [`MultiCrc`] composite, through trait objects.

use crate::value::CrcValue;
use num_bigint::BigUint;
use num_traits::Zero;
use std::sync::Arc;

/// A checksum algorithm that can be run over byte streams.
pub trait Digest: Send + Sync {
    /// The width of the emitted value in bits.
    fn width(&self) -> usize;
    /// Starts a fresh streaming computation.
    fn engine(&self) -> Box<dyn Engine>;
    /// One-shot convenience: digest a whole message at once.
    fn digest(&self, bytes: &[u8]) -> CrcValue {
        let mut engine = self.engine();
        engine.add(bytes);
        engine.close()
    }
}

/// One in-flight checksum computation.
///
/// Engines never fail; feeding one after `close` is a programming error
/// and panics. `close` is idempotent and always hands back the same
/// value.
pub trait Engine: Send {
    /// The width of the emitted value in bits.
    fn width(&self) -> usize;
    /// Consumes a chunk of the message.
    fn add(&mut self, bytes: &[u8]);
    /// Consumes `n` zero bytes, equivalent to `add(&[0; n])`.
    fn add_zeros(&mut self, n: u64);
    /// Snapshots the current state into an independent engine; updates to
    /// either side no longer affect the other.
    fn split(&self) -> Box<dyn Engine>;
    /// Finishes the computation and emits the checksum.
    fn close(&mut self) -> CrcValue;
}

/// Several checksums computed in lockstep and emitted as one value.
///
/// The composite width is the sum of the children's widths and the
/// emitted value is the bit concatenation of the child values in
/// construction order, first child topmost. Useful for hitting several
/// independent checksum targets with a single linear system.
pub struct MultiCrc {
    parts: Vec<Arc<dyn Digest>>,
    width: usize,
}

impl MultiCrc {
    pub fn new(parts: Vec<Arc<dyn Digest>>) -> MultiCrc {
        let width = parts.iter().map(|p| p.width()).sum();
        MultiCrc { parts, width }
    }
}

impl Digest for MultiCrc {
    fn width(&self) -> usize {
        self.width
    }
    fn engine(&self) -> Box<dyn Engine> {
        Box::new(MultiEngine {
            parts: self
                .parts
                .iter()
                .map(|p| (p.width(), p.engine()))
                .collect(),
            width: self.width,
            done: None,
        })
    }
}

struct MultiEngine {
    parts: Vec<(usize, Box<dyn Engine>)>,
    width: usize,
    done: Option<CrcValue>,
}

impl Engine for MultiEngine {
    fn width(&self) -> usize {
        self.width
    }
    fn add(&mut self, bytes: &[u8]) {
        assert!(self.done.is_none(), "bytes added to a closed engine");
        for (_, part) in &mut self.parts {
            part.add(bytes);
        }
    }
    fn add_zeros(&mut self, n: u64) {
        assert!(self.done.is_none(), "bytes added to a closed engine");
        for (_, part) in &mut self.parts {
            part.add_zeros(n);
        }
    }
    fn split(&self) -> Box<dyn Engine> {
        Box::new(MultiEngine {
            parts: self
                .parts
                .iter()
                .map(|(width, part)| (*width, part.split()))
                .collect(),
            width: self.width,
            done: self.done.clone(),
        })
    }
    fn close(&mut self) -> CrcValue {
        if let Some(value) = &self.done {
            return value.clone();
        }
        let mut concatenated = BigUint::zero();
        for (width, part) in &mut self.parts {
            concatenated = (concatenated << *width) | part.close().to_biguint();
        }
        let value = CrcValue::from_biguint(concatenated);
        self.done = Some(value.clone());
        value
    }
}

/// Errors raised when constructing a checksum algorithm.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckBuilderErr {
    /// The `check` value given on construction does not match the
    /// checksum of `b"123456789"`.
    CheckFail,
    /// A mandatory parameter is missing.
    MissingParameter(&'static str),
    /// A parameter value is out of range.
    ValueOutOfRange(&'static str),
    /// Input and output reflection differ, which this model rejects.
    MixedReflection,
    /// A model string could not be parsed; contains the offending key.
    MalformedString(String),
    /// A model string contained an unknown key.
    UnknownKey(String),
}

impl std::fmt::Display for CheckBuilderErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use CheckBuilderErr::*;
        match self {
            CheckFail => write!(f, "Failed checksum test"),
            MissingParameter(para) => write!(f, "Missing parameter '{}'", para),
            ValueOutOfRange(key) => write!(f, "Value for parameter '{}' invalid", key),
            MixedReflection => write!(f, "Differing refin and refout are not supported"),
            MalformedString(key) => {
                if key.is_empty() {
                    write!(f, "Malformed input string")
                } else {
                    write!(f, "Malformed input string at {}", key)
                }
            }
            UnknownKey(key) => write!(f, "Unknown key '{}'", key),
        }
    }
}

impl std::error::Error for CheckBuilderErr {}

/// Errors raised by the bit flipper on bad call-site arguments.
///
/// An unsolvable system is not an error; the flipper reports it as an
/// absent result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlipError {
    /// A flippable position lies outside the message.
    InvalidPosition { position: u64, length: u64 },
    /// The target value does not fit the engine width.
    WidthMismatch { width: usize, value_bits: usize },
}

impl std::fmt::Display for FlipError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use FlipError::*;
        match self {
            InvalidPosition { position, length } => write!(
                f,
                "Bit position {} outside of a message of {} bytes",
                position, length
            ),
            WidthMismatch { width, value_bits } => write!(
                f,
                "Value of {} bits given to an engine of width {}",
                value_bits, width
            ),
        }
    }
}

impl std::error::Error for FlipError {}
