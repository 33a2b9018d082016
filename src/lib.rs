//! Rocksoft-model CRCs and the inverse problem: which bits to flip so a
//! message checksums to a value of your choosing.
//!
//! The forward half is a streaming CRC engine covering every catalogued
//! width from 8 bits up (past 128 bits it switches to big-integer
//! registers), with chunked input, midstream state cloning and cheap
//! zero-run extension. The inverse half, [`Flipper`], treats the checksum
//! as a linear map over GF(2) and picks a subset of allowed bit positions
//! whose combined flips land the checksum on an arbitrary target; several
//! independent checksums can be targeted at once through [`MultiCrc`].
//!
//! ```
//! use flipsum::{Crc, Digest, Flipper};
//!
//! let crc32 = Crc::with_options()
//!     .width(32)
//!     .poly(0x04c11db7u32)
//!     .init(0xffffffffu32)
//!     .xorout(0xffffffffu32)
//!     .check(0xcbf43926u32)
//!     .build()
//!     .unwrap();
//!
//! // change the message, keep the checksum: flip some of bits 16..48
//! let message = b"pay alice 100 coins";
//! let target = crc32.digest(b"pay alice 999 coins");
//! let positions: Vec<u64> = (16..48).collect();
//! let flips = Flipper::new(&crc32)
//!     .flip_with_data(message, &positions, &target)
//!     .unwrap();
//! assert!(flips.is_some());
//! ```

mod bitnum;
pub mod checksum;
pub mod crc;
mod keyval;
pub mod matrix;
pub mod value;

pub use checksum::{CheckBuilderErr, Digest, Engine, FlipError, MultiCrc};
pub use crc::{Crc, CrcBuilder, CrcEngine, Flipper};
pub use value::CrcValue;

use std::str::FromStr;

#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

/// A stringy one-shot checksum driver.
///
/// The model string holds the parameters as `key=value` pairs, all values
/// except `width` in hexadecimal:
///
/// ```
/// let sum = flipsum::find_checksum(
///     "width=32 poly=0x04c11db7 init=0xffffffff xorout=0xffffffff",
///     b"123456789",
/// )
/// .unwrap();
/// assert_eq!(sum, 0xcbf43926u32);
/// ```
pub fn find_checksum(strspec: &str, bytes: &[u8]) -> Result<CrcValue, CheckBuilderErr> {
    let crc = Crc::from_str(strspec)?;
    Ok(crc.digest(bytes))
}
