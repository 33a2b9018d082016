use num_traits::Num;
use std::ops;

/// The widest CRC register that fits a native integer type; everything
/// above this falls back to `BigUint` storage.
pub const MAX_FIXED_WIDTH: usize = 128;

/// A trait for the unsigned integer types a CRC register can live in.
///
/// Rust still has no blanket way of saying "u8, u16, u32, u64 or u128",
/// so the relevant surface is spelled out here once and implemented five
/// times below.
pub trait BitNum:
    Num
    + ops::BitXor<Output = Self>
    + ops::BitAnd<Output = Self>
    + ops::Shl<usize, Output = Self>
    + ops::Shr<usize, Output = Self>
    + Clone
    + Copy
    + Eq
    + Ord
    + From<u8>
    + std::convert::TryInto<u8>
    + std::fmt::Debug
    + std::fmt::LowerHex
    + std::fmt::UpperHex
    + Send
    + Sync
    + 'static
{
    /// Reverses the order of all bits in the value.
    fn revbits(self) -> Self;
    /// The bit width of the type.
    fn bits(&self) -> usize;
    /// Widens into the largest native register type.
    fn to_wide(self) -> u128;
    /// Truncating conversion from the largest native register type.
    fn from_wide(n: u128) -> Self;
}

impl BitNum for u8 {
    fn revbits(self) -> Self {
        self.reverse_bits()
    }
    fn bits(&self) -> usize {
        8
    }
    fn to_wide(self) -> u128 {
        self as u128
    }
    fn from_wide(n: u128) -> Self {
        n as u8
    }
}
impl BitNum for u16 {
    fn revbits(self) -> Self {
        self.reverse_bits()
    }
    fn bits(&self) -> usize {
        16
    }
    fn to_wide(self) -> u128 {
        self as u128
    }
    fn from_wide(n: u128) -> Self {
        n as u16
    }
}
impl BitNum for u32 {
    fn revbits(self) -> Self {
        self.reverse_bits()
    }
    fn bits(&self) -> usize {
        32
    }
    fn to_wide(self) -> u128 {
        self as u128
    }
    fn from_wide(n: u128) -> Self {
        n as u32
    }
}
impl BitNum for u64 {
    fn revbits(self) -> Self {
        self.reverse_bits()
    }
    fn bits(&self) -> usize {
        64
    }
    fn to_wide(self) -> u128 {
        self as u128
    }
    fn from_wide(n: u128) -> Self {
        n as u64
    }
}
impl BitNum for u128 {
    fn revbits(self) -> Self {
        self.reverse_bits()
    }
    fn bits(&self) -> usize {
        128
    }
    fn to_wide(self) -> u128 {
        self
    }
    fn from_wide(n: u128) -> Self {
        n
    }
}

/// Reverses the lowest `width` bits of `value` and discards the rest.
///
/// Defined for `0 <= width <= value.bits()`.
pub fn reflect<S: BitNum>(value: S, width: usize) -> S {
    if width == 0 {
        S::zero()
    } else {
        value.revbits() >> (value.bits() - width)
    }
}

/// `reflect` for registers wider than any native integer type.
pub fn reflect_big(value: &num_bigint::BigUint, width: usize) -> num_bigint::BigUint {
    use num_traits::Zero;
    let mut out = num_bigint::BigUint::zero();
    for i in 0..width as u64 {
        if value.bit(i) {
            out.set_bit(width as u64 - 1 - i, true);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    #[test]
    fn examples() {
        assert_eq!(reflect(0x80u8, 8), 0x01);
        assert_eq!(reflect(0x3e23u16, 3), 6);
        assert_eq!(reflect(0x3e23u16, 0), 0);
        assert_eq!(reflect(0xffffffffu32, 32), 0xffffffff);
    }

    #[test]
    fn big_matches_fixed() {
        for value in [0x12345678u64, 0x89ec, 0, 1, u64::MAX] {
            for width in [1usize, 7, 16, 33, 64] {
                let expected = reflect(value, width);
                let got = reflect_big(&BigUint::from(value), width);
                assert_eq!(got, BigUint::from(expected), "value {:#x} width {}", value, width);
            }
        }
    }

    #[quickcheck]
    fn qc_reflect_involution(value: u64, width: u8) -> bool {
        let width = usize::from(width) % 64 + 1;
        let mask = if width == 64 { u64::MAX } else { (1 << width) - 1 };
        reflect(reflect(value, width), width) == value & mask
    }
}
