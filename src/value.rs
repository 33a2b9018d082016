//! The value type emitted by checksum engines.
//!
//! A CRC register can be up to 128 bits wide without leaving native
//! integer arithmetic; anything wider is carried as a `BigUint`. The two
//! representations compare equal whenever they denote the same number, so
//! callers never need to care which one an engine happened to produce.

use num_bigint::BigUint;
use num_traits::{Num, One, ToPrimitive, Zero};
use std::fmt;
use std::ops::BitXor;

/// An unsigned checksum value of arbitrary width.
#[derive(Clone, Debug)]
pub enum CrcValue {
    /// Fits the widest native register type.
    Fixed(u128),
    /// Wider than 128 bits.
    Big(BigUint),
}

impl CrcValue {
    /// Wraps a `BigUint`, collapsing into the native representation when
    /// the value fits.
    pub fn from_biguint(n: BigUint) -> CrcValue {
        match n.to_u128() {
            Some(x) => CrcValue::Fixed(x),
            None => CrcValue::Big(n),
        }
    }

    /// Widens into a `BigUint` regardless of representation.
    pub fn to_biguint(&self) -> BigUint {
        match self {
            CrcValue::Fixed(x) => BigUint::from(*x),
            CrcValue::Big(b) => b.clone(),
        }
    }

    /// The number of significant bits (0 for the value 0).
    pub fn bits(&self) -> usize {
        match self {
            CrcValue::Fixed(x) => (128 - x.leading_zeros()) as usize,
            CrcValue::Big(b) => b.bits() as usize,
        }
    }

    /// Whether bit `i` (counting from the least significant) is set.
    pub fn bit(&self, i: usize) -> bool {
        match self {
            CrcValue::Fixed(x) => i < 128 && (x >> i) & 1 == 1,
            CrcValue::Big(b) => b.bit(i as u64),
        }
    }

    /// Truncates to the lowest `width` bits.
    pub fn masked(&self, width: usize) -> CrcValue {
        match self {
            CrcValue::Fixed(x) if width >= 128 => CrcValue::Fixed(*x),
            CrcValue::Fixed(x) => CrcValue::Fixed(x & ((1u128 << width) - 1)),
            CrcValue::Big(b) => {
                let mask = (BigUint::one() << width) - BigUint::one();
                CrcValue::from_biguint(b & mask)
            }
        }
    }

    /// Renders the value in the given radix (2 to 36), without prefix.
    pub fn to_radix_string(&self, radix: u32) -> String {
        self.to_biguint().to_str_radix(radix)
    }

    /// Parses a hexadecimal value, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Option<CrcValue> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        BigUint::from_str_radix(digits, 16)
            .ok()
            .map(CrcValue::from_biguint)
    }

    /// The lowest 128 bits, for handing off to a native register.
    pub(crate) fn as_wide(&self) -> u128 {
        match self {
            CrcValue::Fixed(x) => *x,
            CrcValue::Big(b) => {
                let mut digits = b.iter_u64_digits();
                let lo = digits.next().unwrap_or(0) as u128;
                let hi = digits.next().unwrap_or(0) as u128;
                (hi << 64) | lo
            }
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            CrcValue::Fixed(x) => *x == 0,
            CrcValue::Big(b) => b.is_zero(),
        }
    }
}

impl PartialEq for CrcValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CrcValue::Fixed(a), CrcValue::Fixed(b)) => a == b,
            (CrcValue::Big(a), CrcValue::Big(b)) => a == b,
            (CrcValue::Fixed(a), CrcValue::Big(b)) | (CrcValue::Big(b), CrcValue::Fixed(a)) => {
                b.to_u128() == Some(*a)
            }
        }
    }
}
impl Eq for CrcValue {}

impl From<BigUint> for CrcValue {
    fn from(n: BigUint) -> Self {
        CrcValue::from_biguint(n)
    }
}

macro_rules! crc_value_prim {
    ($($t:ty),*) => {$(
        impl From<$t> for CrcValue {
            fn from(x: $t) -> Self {
                CrcValue::Fixed(u128::from(x))
            }
        }
        impl PartialEq<$t> for CrcValue {
            fn eq(&self, other: &$t) -> bool {
                *self == CrcValue::Fixed(u128::from(*other))
            }
        }
        impl PartialEq<CrcValue> for $t {
            fn eq(&self, other: &CrcValue) -> bool {
                other == self
            }
        }
    )*};
}
crc_value_prim!(u8, u16, u32, u64, u128);

impl BitXor for &CrcValue {
    type Output = CrcValue;
    fn bitxor(self, rhs: &CrcValue) -> CrcValue {
        match (self, rhs) {
            (CrcValue::Fixed(a), CrcValue::Fixed(b)) => CrcValue::Fixed(a ^ b),
            _ => CrcValue::from_biguint(self.to_biguint() ^ rhs.to_biguint()),
        }
    }
}

impl fmt::Display for CrcValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_radix_string(10))
    }
}

impl fmt::LowerHex for CrcValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.write_str("0x")?;
        }
        f.write_str(&self.to_radix_string(16))
    }
}

impl fmt::UpperHex for CrcValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.write_str("0x")?;
        }
        f.write_str(&self.to_radix_string(16).to_ascii_uppercase())
    }
}
