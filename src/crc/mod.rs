//! Streaming CRC engines parameterized over the Rocksoft model.
//!
//! The parameters are the usual ones:
//! * `width`: the width in bits of the sum values, a multiple of 8
//! * `poly`: the generator polynomial (without the highest bit)
//! * `init`: the initial value of the register
//! * `xorout`: what to XOR the final register with
//! * `refin`/`refout`: whether input bytes and the final sum are
//!   bit-reversed; the two must agree
//! * `check`: the checksum of the ASCII string "123456789" (verified on
//!   `build()`, optional)
//! * `name`: an optional display name for the algorithm
//!
//! For more information on the parameters (and CRCs in general), see "A
//! PAINLESS GUIDE TO CRC ERROR DETECTION ALGORITHMS" or
//! https://reveng.sourceforge.io/crc-catalogue/legend.htm (which is also a
//! source of parameters for various common algorithms).
//!
//! Registers up to 128 bits wide run on native integers, with the inner
//! loop monomorphized per storage type; wider registers run on `BigUint`.
//! Lookup tables are built once per `(width, poly, reflected)` and shared
//! process-wide.

mod flip;
pub use flip::Flipper;

use crate::bitnum::{reflect, reflect_big, BitNum, MAX_FIXED_WIDTH};
use crate::checksum::{CheckBuilderErr, Digest, Engine};
use crate::keyval::KeyValIter;
use crate::value::CrcValue;
use lazy_static::lazy_static;
use num_bigint::BigUint;
use num_traits::{One, Zero};
use std::any::Any;
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

/// A builder for a CRC algorithm, see the module documentation for the
/// meaning of the parameters.
///
/// Example:
/// ```
/// # use flipsum::{Crc, Digest};
/// let crc32 = Crc::with_options()
///     .width(32)
///     .poly(0x04c11db7u32)
///     .init(0xffffffffu32)
///     .xorout(0xffffffffu32)
///     .check(0xcbf43926u32)
///     .name("crc-32")
///     .build()
///     .unwrap();
/// assert_eq!(crc32.digest(b"123456789"), 0xcbf43926u32);
/// ```
#[derive(Clone, Debug)]
pub struct CrcBuilder {
    width: Option<usize>,
    poly: Option<CrcValue>,
    init: Option<CrcValue>,
    xorout: Option<CrcValue>,
    refin: Option<bool>,
    refout: Option<bool>,
    check: Option<CrcValue>,
    name: Option<String>,
}

impl CrcBuilder {
    /// Sets the width in bits (mandatory, a multiple of 8, at least 8).
    pub fn width(&mut self, w: usize) -> &mut Self {
        self.width = Some(w);
        self
    }
    /// Sets the generator polynomial (mandatory, truncated to `width` bits).
    pub fn poly<V: Into<CrcValue>>(&mut self, p: V) -> &mut Self {
        self.poly = Some(p.into());
        self
    }
    /// Sets the initial register value, default 0.
    pub fn init<V: Into<CrcValue>>(&mut self, i: V) -> &mut Self {
        self.init = Some(i.into());
        self
    }
    /// Sets the final XOR mask, default 0.
    pub fn xorout<V: Into<CrcValue>>(&mut self, x: V) -> &mut Self {
        self.xorout = Some(x.into());
        self
    }
    /// Sets input reflection, default true.
    pub fn refin(&mut self, r: bool) -> &mut Self {
        self.refin = Some(r);
        self
    }
    /// Sets output reflection, default true; must equal `refin`.
    pub fn refout(&mut self, r: bool) -> &mut Self {
        self.refout = Some(r);
        self
    }
    /// Checks whether `c` is the checksum of `b"123456789"` on `build`.
    pub fn check<V: Into<CrcValue>>(&mut self, c: V) -> &mut Self {
        self.check = Some(c.into());
        self
    }
    /// A name to be displayed.
    pub fn name(&mut self, n: &str) -> &mut Self {
        self.name = Some(n.to_owned());
        self
    }

    /// Builds the algorithm, acquiring the lookup table and verifying the
    /// parameters.
    pub fn build(&self) -> Result<Crc, CheckBuilderErr> {
        let width = match self.width {
            Some(w) => w,
            None => return Err(CheckBuilderErr::MissingParameter("width")),
        };
        if width < 8 || width % 8 != 0 {
            return Err(CheckBuilderErr::ValueOutOfRange("width"));
        }
        let refin = self.refin.unwrap_or(true);
        let refout = self.refout.unwrap_or(true);
        if refin != refout {
            return Err(CheckBuilderErr::MixedReflection);
        }
        let poly = match &self.poly {
            Some(p) => p.masked(width),
            None => return Err(CheckBuilderErr::MissingParameter("poly")),
        };
        let zero = CrcValue::from(0u8);
        let init = self.init.clone().unwrap_or_else(|| zero.clone()).masked(width);
        let xorout = self.xorout.clone().unwrap_or(zero).masked(width);
        let kind = CrcKind::from_parameters(width, &poly, &init, &xorout, refin);
        let crc = Crc {
            width,
            poly,
            init,
            xorout,
            reflect: refin,
            name: self.name.clone(),
            kind,
        };
        match &self.check {
            Some(check) => {
                if &crc.digest(b"123456789") != check {
                    Err(CheckBuilderErr::CheckFail)
                } else {
                    Ok(crc)
                }
            }
            None => Ok(crc),
        }
    }
}

impl FromStr for CrcBuilder {
    type Err = CheckBuilderErr;
    /// See the documentation of `FromStr` on [`Crc`].
    fn from_str(s: &str) -> Result<CrcBuilder, CheckBuilderErr> {
        let mut builder = Crc::with_options();
        for pair in KeyValIter::new(s) {
            let (key, value) = match pair {
                Err(key) => return Err(CheckBuilderErr::MalformedString(key)),
                Ok(kv) => kv,
            };
            let parsed = match key.as_str() {
                "width" => usize::from_str(&value).ok().map(|x| builder.width(x)),
                "poly" => CrcValue::from_hex(&value).map(|x| builder.poly(x)),
                "init" => CrcValue::from_hex(&value).map(|x| builder.init(x)),
                "xorout" => CrcValue::from_hex(&value).map(|x| builder.xorout(x)),
                "refin" => bool::from_str(&value).ok().map(|x| builder.refin(x)),
                "refout" => bool::from_str(&value).ok().map(|x| builder.refout(x)),
                "check" => CrcValue::from_hex(&value).map(|x| builder.check(x)),
                "name" => Some(builder.name(&value)),
                _ => return Err(CheckBuilderErr::UnknownKey(key)),
            };
            if parsed.is_none() {
                return Err(CheckBuilderErr::MalformedString(key));
            }
        }
        Ok(builder)
    }
}

/// A CRC algorithm under the Rocksoft model.
#[derive(Clone, Debug)]
pub struct Crc {
    width: usize,
    poly: CrcValue,
    init: CrcValue,
    xorout: CrcValue,
    reflect: bool,
    name: Option<String>,
    kind: CrcKind,
}

impl Crc {
    /// Creates a `CrcBuilder`, see the `CrcBuilder` documentation for
    /// more details.
    pub fn with_options() -> CrcBuilder {
        CrcBuilder {
            width: None,
            poly: None,
            init: None,
            xorout: None,
            refin: None,
            refout: None,
            check: None,
            name: None,
        }
    }
}

impl Display for Crc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}", name),
            None => write!(
                f,
                "crc width={} poly={:#x} init={:#x} xorout={:#x} refin={} refout={}",
                self.width, self.poly, self.init, self.xorout, self.reflect, self.reflect
            ),
        }
    }
}

impl FromStr for Crc {
    type Err = CheckBuilderErr;
    /// Constructs a CRC algorithm from a model string.
    /// All parameters except `width` are hexadecimal.
    ///
    /// Example:
    ///
    /// ```
    /// # use flipsum::Crc;
    /// # use std::str::FromStr;
    /// Crc::from_str("width=32 poly=0x04c11db7 init=0xffffffff xorout=0xffffffff check=0xcbf43926")
    ///     .unwrap();
    /// ```
    fn from_str(s: &str) -> Result<Crc, CheckBuilderErr> {
        CrcBuilder::from_str(s)?.build()
    }
}

impl Digest for Crc {
    fn width(&self) -> usize {
        self.width
    }
    fn engine(&self) -> Box<dyn Engine> {
        Box::new(CrcEngine {
            kind: self.kind.start(),
            width: self.width,
            done: None,
        })
    }
}

/// The compiled form of the parameters, dispatched once at build time to
/// the narrowest register that holds `width` bits.
#[derive(Clone, Debug)]
enum CrcKind {
    W8(FixedCrc<u8>),
    W16(FixedCrc<u16>),
    W32(FixedCrc<u32>),
    W64(FixedCrc<u64>),
    W128(FixedCrc<u128>),
    Wide(BigCrc),
}

impl CrcKind {
    fn from_parameters(
        width: usize,
        poly: &CrcValue,
        init: &CrcValue,
        xorout: &CrcValue,
        reflected: bool,
    ) -> CrcKind {
        match width {
            0..=8 => CrcKind::W8(FixedCrc::new(width, poly, init, xorout, reflected)),
            9..=16 => CrcKind::W16(FixedCrc::new(width, poly, init, xorout, reflected)),
            17..=32 => CrcKind::W32(FixedCrc::new(width, poly, init, xorout, reflected)),
            33..=64 => CrcKind::W64(FixedCrc::new(width, poly, init, xorout, reflected)),
            65..=MAX_FIXED_WIDTH => {
                CrcKind::W128(FixedCrc::new(width, poly, init, xorout, reflected))
            }
            _ => CrcKind::Wide(BigCrc::new(width, poly, init, xorout, reflected)),
        }
    }

    fn start(&self) -> EngineKind {
        match self {
            CrcKind::W8(c) => EngineKind::W8(c.start()),
            CrcKind::W16(c) => EngineKind::W16(c.start()),
            CrcKind::W32(c) => EngineKind::W32(c.start()),
            CrcKind::W64(c) => EngineKind::W64(c.start()),
            CrcKind::W128(c) => EngineKind::W128(c.start()),
            CrcKind::Wide(c) => EngineKind::Wide(c.start()),
        }
    }
}

/// A streaming computation of a single CRC.
#[derive(Clone, Debug)]
pub struct CrcEngine {
    kind: EngineKind,
    width: usize,
    done: Option<CrcValue>,
}

#[derive(Clone, Debug)]
enum EngineKind {
    W8(FixedEngine<u8>),
    W16(FixedEngine<u16>),
    W32(FixedEngine<u32>),
    W64(FixedEngine<u64>),
    W128(FixedEngine<u128>),
    Wide(BigEngine),
}

impl Engine for CrcEngine {
    fn width(&self) -> usize {
        self.width
    }
    fn add(&mut self, bytes: &[u8]) {
        assert!(self.done.is_none(), "bytes added to a closed engine");
        match &mut self.kind {
            EngineKind::W8(e) => e.add(bytes),
            EngineKind::W16(e) => e.add(bytes),
            EngineKind::W32(e) => e.add(bytes),
            EngineKind::W64(e) => e.add(bytes),
            EngineKind::W128(e) => e.add(bytes),
            EngineKind::Wide(e) => e.add(bytes),
        }
    }
    fn add_zeros(&mut self, n: u64) {
        assert!(self.done.is_none(), "bytes added to a closed engine");
        match &mut self.kind {
            EngineKind::W8(e) => e.add_zeros(n),
            EngineKind::W16(e) => e.add_zeros(n),
            EngineKind::W32(e) => e.add_zeros(n),
            EngineKind::W64(e) => e.add_zeros(n),
            EngineKind::W128(e) => e.add_zeros(n),
            EngineKind::Wide(e) => e.add_zeros(n),
        }
    }
    fn split(&self) -> Box<dyn Engine> {
        Box::new(self.clone())
    }
    fn close(&mut self) -> CrcValue {
        if let Some(value) = &self.done {
            return value.clone();
        }
        let value = match &self.kind {
            EngineKind::W8(e) => e.value(),
            EngineKind::W16(e) => e.value(),
            EngineKind::W32(e) => e.value(),
            EngineKind::W64(e) => e.value(),
            EngineKind::W128(e) => e.value(),
            EngineKind::Wide(e) => e.value(),
        };
        self.done = Some(value.clone());
        value
    }
}

/// Parameters compiled down to a native register type.
#[derive(Clone, Debug)]
struct FixedCrc<S: BitNum> {
    width: usize,
    init: S,
    xorout: S,
    mask: S,
    reflected: bool,
    table: Arc<[S; 256]>,
}

impl<S: BitNum> FixedCrc<S> {
    fn new(
        width: usize,
        poly: &CrcValue,
        init: &CrcValue,
        xorout: &CrcValue,
        reflected: bool,
    ) -> FixedCrc<S> {
        FixedCrc {
            width,
            init: S::from_wide(init.as_wide()),
            xorout: S::from_wide(xorout.as_wide()),
            mask: width_mask::<S>(width),
            reflected,
            table: shared_table::<S>(width, poly, reflected),
        }
    }

    fn start(&self) -> FixedEngine<S> {
        // a reflected register holds the reflected initial value; this
        // differs from `init` whenever init is not its own bit-reverse
        let reg = if self.reflected {
            reflect(self.init, self.width)
        } else {
            self.init
        };
        FixedEngine {
            algo: self.clone(),
            reg,
        }
    }

    fn entry(&self, index: S) -> S {
        let index: u8 = match (index & S::from(0xffu8)).try_into() {
            Ok(byte) => byte,
            Err(_) => panic!("Internal error: non-byte index into CRC lookup table"),
        };
        self.table[usize::from(index)]
    }

    fn step(&self, reg: S, byte: u8) -> S {
        if self.reflected {
            let entry = self.entry(reg ^ S::from(byte));
            if self.width == 8 {
                entry
            } else {
                entry ^ (reg >> 8)
            }
        } else {
            let entry = self.entry((reg >> (self.width - 8)) ^ S::from(byte));
            if self.width == 8 {
                entry
            } else {
                entry ^ ((reg << 8) & self.mask)
            }
        }
    }
}

#[derive(Clone, Debug)]
struct FixedEngine<S: BitNum> {
    algo: FixedCrc<S>,
    reg: S,
}

impl<S: BitNum> FixedEngine<S> {
    fn add(&mut self, bytes: &[u8]) {
        let mut reg = self.reg;
        for &byte in bytes {
            reg = self.algo.step(reg, byte);
        }
        self.reg = reg;
    }

    fn add_zeros(&mut self, n: u64) {
        // table[0] == 0 and both recurrences map a zero register to zero
        if self.reg.is_zero() {
            return;
        }
        let mut reg = self.reg;
        for _ in 0..n {
            reg = self.algo.step(reg, 0);
        }
        self.reg = reg;
    }

    fn value(&self) -> CrcValue {
        CrcValue::Fixed((self.reg ^ self.algo.xorout).to_wide())
    }
}

/// Parameters for registers wider than any native integer type.
#[derive(Clone, Debug)]
struct BigCrc {
    width: usize,
    init: BigUint,
    xorout: BigUint,
    mask: BigUint,
    reflected: bool,
    table: Arc<Vec<BigUint>>,
}

impl BigCrc {
    fn new(
        width: usize,
        poly: &CrcValue,
        init: &CrcValue,
        xorout: &CrcValue,
        reflected: bool,
    ) -> BigCrc {
        BigCrc {
            width,
            init: init.to_biguint(),
            xorout: xorout.to_biguint(),
            mask: (BigUint::one() << width) - BigUint::one(),
            reflected,
            table: shared_big_table(width, poly, reflected),
        }
    }

    fn start(&self) -> BigEngine {
        let reg = if self.reflected {
            reflect_big(&self.init, self.width)
        } else {
            self.init.clone()
        };
        BigEngine {
            algo: self.clone(),
            reg,
        }
    }

    fn step(&self, reg: BigUint, byte: u8) -> BigUint {
        if self.reflected {
            let index = low_byte(&reg) ^ byte;
            &self.table[usize::from(index)] ^ (reg >> 8u32)
        } else {
            let index = low_byte(&(&reg >> (self.width - 8))) ^ byte;
            &self.table[usize::from(index)] ^ ((reg << 8u32) & &self.mask)
        }
    }
}

fn low_byte(n: &BigUint) -> u8 {
    n.iter_u64_digits().next().unwrap_or(0) as u8
}

#[derive(Clone, Debug)]
struct BigEngine {
    algo: BigCrc,
    reg: BigUint,
}

impl BigEngine {
    fn add(&mut self, bytes: &[u8]) {
        let mut reg = std::mem::take(&mut self.reg);
        for &byte in bytes {
            reg = self.algo.step(reg, byte);
        }
        self.reg = reg;
    }

    fn add_zeros(&mut self, n: u64) {
        if self.reg.is_zero() {
            return;
        }
        let mut reg = std::mem::take(&mut self.reg);
        for _ in 0..n {
            reg = self.algo.step(reg, 0);
        }
        self.reg = reg;
    }

    fn value(&self) -> CrcValue {
        CrcValue::from_biguint(&self.reg ^ &self.algo.xorout)
    }
}

fn width_mask<S: BitNum>(width: usize) -> S {
    let top = S::one() << (width - 1);
    top ^ (top - S::one())
}

/// Builds one lookup table entry per possible input byte.
fn build_table<S: BitNum>(width: usize, poly: &CrcValue, reflected: bool) -> [S; 256] {
    let mask = width_mask::<S>(width);
    let poly = S::from_wide(poly.as_wide()) & mask;
    let top = S::one() << (width - 1);
    let mut table = [S::zero(); 256];
    for (i, slot) in table.iter_mut().enumerate() {
        let seed = if reflected {
            reflect(S::from(i as u8), 8)
        } else {
            S::from(i as u8)
        };
        let mut crc = (seed << (width - 8)) & mask;
        for _ in 0..8 {
            let carry = crc & top != S::zero();
            crc = (crc << 1) & mask;
            if carry {
                crc = crc ^ poly;
            }
        }
        *slot = if reflected { reflect(crc, width) } else { crc };
    }
    table
}

fn build_big_table(width: usize, poly: &CrcValue, reflected: bool) -> Vec<BigUint> {
    let mask = (BigUint::one() << width) - BigUint::one();
    let poly = poly.to_biguint() & &mask;
    let top = BigUint::one() << (width - 1);
    let mut table = Vec::with_capacity(256);
    for i in 0u16..256 {
        let seed = if reflected {
            BigUint::from((i as u8).reverse_bits())
        } else {
            BigUint::from(i)
        };
        let mut crc = (seed << (width - 8)) & &mask;
        for _ in 0..8 {
            let carry = !(&crc & &top).is_zero();
            crc = (crc << 1u32) & &mask;
            if carry {
                crc ^= &poly;
            }
        }
        table.push(if reflected {
            reflect_big(&crc, width)
        } else {
            crc
        });
    }
    table
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct TableKey {
    width: usize,
    poly: BigUint,
    reflected: bool,
}

lazy_static! {
    static ref TABLES: Mutex<HashMap<TableKey, Arc<dyn Any + Send + Sync>>> =
        Mutex::new(HashMap::new());
}

fn table_cache() -> MutexGuard<'static, HashMap<TableKey, Arc<dyn Any + Send + Sync>>> {
    match TABLES.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Fetches or builds the table for `(width, poly, reflected)`.
///
/// Construction happens outside the lock; when two threads race, the
/// first stored table wins and both get the same reference.
fn shared_table<S: BitNum>(width: usize, poly: &CrcValue, reflected: bool) -> Arc<[S; 256]> {
    let key = TableKey {
        width,
        poly: poly.to_biguint(),
        reflected,
    };
    if let Some(hit) = table_cache().get(&key) {
        if let Ok(table) = hit.clone().downcast::<[S; 256]>() {
            return table;
        }
    }
    let fresh = Arc::new(build_table::<S>(width, poly, reflected));
    let stored = table_cache()
        .entry(key)
        .or_insert_with(|| fresh.clone() as Arc<dyn Any + Send + Sync>)
        .clone();
    stored.downcast::<[S; 256]>().unwrap_or(fresh)
}

fn shared_big_table(width: usize, poly: &CrcValue, reflected: bool) -> Arc<Vec<BigUint>> {
    let key = TableKey {
        width,
        poly: poly.to_biguint(),
        reflected,
    };
    if let Some(hit) = table_cache().get(&key) {
        if let Ok(table) = hit.clone().downcast::<Vec<BigUint>>() {
            return table;
        }
    }
    let fresh = Arc::new(build_big_table(width, poly, reflected));
    let stored = table_cache()
        .entry(key)
        .or_insert_with(|| fresh.clone() as Arc<dyn Any + Send + Sync>)
        .clone();
    stored.downcast::<Vec<BigUint>>().unwrap_or(fresh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn crc32_xz() -> Crc {
        Crc::with_options()
            .width(32)
            .poly(0x04c11db7u32)
            .init(0xffffffffu32)
            .xorout(0xffffffffu32)
            .check(0xcbf43926u32)
            .build()
            .unwrap()
    }

    #[test]
    fn crc32_bzip2() {
        let crc = Crc::with_options()
            .width(32)
            .poly(0x04c11db7u32)
            .init(0xffffffffu32)
            .xorout(0xffffffffu32)
            .refin(false)
            .refout(false)
            .check(0xfc891918u32)
            .build()
            .unwrap();
        assert_eq!(crc.digest(b"123456789"), 0xfc891918u32);
    }

    #[test]
    fn crc64_xz() {
        let crc = Crc::with_options()
            .width(64)
            .poly(0x42f0e1eba9ea3693u64)
            .init(0xffffffffffffffffu64)
            .xorout(0xffffffffffffffffu64)
            .check(0x995dc9bbdf1939fau64)
            .build()
            .unwrap();
        assert_eq!(crc.digest(b"123456789"), 0x995dc9bbdf1939fau64);
    }

    #[test]
    fn crc24_openpgp() {
        let crc = Crc::with_options()
            .width(24)
            .poly(0x864cfbu32)
            .init(0xb704ceu32)
            .refin(false)
            .refout(false)
            .check(0x21cf02u32)
            .build()
            .unwrap();
        assert_eq!(crc.digest(b"123456789"), 0x21cf02u32);
    }

    #[test]
    fn crc16_tms37157() {
        // init 0x89ec is not its own bit-reverse, so this exercises the
        // reflected seeding of the register
        let crc = Crc::with_options()
            .width(16)
            .poly(0x1021u16)
            .init(0x89ecu16)
            .check(0x26b1u16)
            .build()
            .unwrap();
        assert_eq!(crc.digest(b"123456789"), 0x26b1u16);
    }

    #[test]
    fn crc8_smbus() {
        let crc = Crc::with_options()
            .width(8)
            .poly(0x07u8)
            .refin(false)
            .refout(false)
            .check(0xf4u8)
            .build()
            .unwrap();
        assert_eq!(crc.digest(b"123456789"), 0xf4u8);
    }

    #[test]
    fn crc8_darc() {
        let crc = Crc::with_options()
            .width(8)
            .poly(0x39u8)
            .check(0x15u8)
            .build()
            .unwrap();
        assert_eq!(crc.digest(b"123456789"), 0x15u8);
    }

    #[test]
    fn crc32_from_model_string() {
        let crc = Crc::from_str(
            "width=32 poly=0x04c11db7 init=0xffffffff xorout=0xffffffff \
             refin=true refout=true check=0xcbf43926 name=\"crc-32/xz\"",
        )
        .unwrap();
        assert_eq!(crc.to_string(), "crc-32/xz");
        assert_eq!(crc.digest(b"123456789"), 0xcbf43926u32);
        let unnamed = Crc::from_str("width=32 poly=0x04c11db7").unwrap();
        assert_eq!(
            unnamed.to_string(),
            "crc width=32 poly=0x4c11db7 init=0x0 xorout=0x0 refin=true refout=true"
        );
    }

    #[test]
    fn builder_rejections() {
        assert_eq!(
            Crc::with_options().poly(3u8).build().unwrap_err(),
            CheckBuilderErr::MissingParameter("width")
        );
        assert_eq!(
            Crc::with_options().width(32).build().unwrap_err(),
            CheckBuilderErr::MissingParameter("poly")
        );
        assert_eq!(
            Crc::with_options().width(12).poly(0x80fu16).build().unwrap_err(),
            CheckBuilderErr::ValueOutOfRange("width")
        );
        assert_eq!(
            Crc::with_options().width(4).poly(0x3u8).build().unwrap_err(),
            CheckBuilderErr::ValueOutOfRange("width")
        );
        assert_eq!(
            Crc::with_options()
                .width(32)
                .poly(0x04c11db7u32)
                .refin(true)
                .refout(false)
                .build()
                .unwrap_err(),
            CheckBuilderErr::MixedReflection
        );
        assert_eq!(
            Crc::with_options()
                .width(32)
                .poly(0x04c11db7u32)
                .check(0xdeadbeefu32)
                .build()
                .unwrap_err(),
            CheckBuilderErr::CheckFail
        );
        assert_eq!(
            Crc::from_str("width=32 poly=0x04c11db7 wat=1").unwrap_err(),
            CheckBuilderErr::UnknownKey("wat".to_owned())
        );
        assert_eq!(
            Crc::from_str("width=thirtytwo poly=0x04c11db7").unwrap_err(),
            CheckBuilderErr::MalformedString("width".to_owned())
        );
    }

    #[test]
    fn streaming_matches_oneshot() {
        let crc = crc32_xz();
        let mut rng = rand::thread_rng();
        let message: Vec<u8> = (0..300).map(|_| rng.gen()).collect();
        let expected = crc.digest(&message);
        let mut engine = crc.engine();
        let mut rest = message.as_slice();
        while !rest.is_empty() {
            let cut = rng.gen_range(0..=rest.len());
            let (chunk, tail) = rest.split_at(cut);
            engine.add(chunk);
            rest = tail;
        }
        assert_eq!(engine.close(), expected);
    }

    #[test]
    fn add_zeros_matches_zero_bytes() {
        for crc in [
            crc32_xz(),
            Crc::with_options()
                .width(24)
                .poly(0x864cfbu32)
                .init(0xb704ceu32)
                .refin(false)
                .refout(false)
                .build()
                .unwrap(),
        ] {
            let mut by_hand = crc.engine();
            by_hand.add(b"abc");
            by_hand.add(&[0u8; 57]);
            by_hand.add(b"xyz");
            let mut shortcut = crc.engine();
            shortcut.add(b"abc");
            shortcut.add_zeros(57);
            shortcut.add(b"xyz");
            assert_eq!(shortcut.close(), by_hand.close());
        }
    }

    #[test]
    fn zero_register_shortcut_is_sound() {
        // with init 0 the register stays zero over a zero prefix
        let crc = Crc::with_options()
            .width(32)
            .poly(0x04c11db7u32)
            .build()
            .unwrap();
        let mut by_hand = crc.engine();
        by_hand.add(&[0u8; 40]);
        by_hand.add(b"tail");
        let mut shortcut = crc.engine();
        shortcut.add_zeros(40);
        shortcut.add(b"tail");
        assert_eq!(shortcut.close(), by_hand.close());
    }

    #[test]
    fn split_is_independent() {
        let crc = crc32_xz();
        let mut parent = crc.engine();
        parent.add(b"1234");
        let mut child = parent.split();
        parent.add(b"56789");
        child.add(b"56789");
        assert_eq!(parent.close(), crc.digest(b"123456789"));
        assert_eq!(child.close(), crc.digest(b"123456789"));

        let mut diverging = crc.engine();
        diverging.add(b"1234");
        let mut other = diverging.split();
        other.add(b"00000");
        diverging.add(b"56789");
        assert_ne!(diverging.close(), other.close());
    }

    #[test]
    fn close_is_idempotent() {
        let crc = crc32_xz();
        let mut engine = crc.engine();
        engine.add(b"123456789");
        let first = engine.close();
        assert_eq!(engine.close(), first);
        assert_eq!(first, 0xcbf43926u32);
    }

    #[test]
    #[should_panic(expected = "closed engine")]
    fn add_after_close_panics() {
        let crc = crc32_xz();
        let mut engine = crc.engine();
        engine.close();
        engine.add(b"late");
    }

    #[test]
    fn tables_are_shared() {
        let a = crc32_xz();
        let b = crc32_xz();
        match (&a.kind, &b.kind) {
            (CrcKind::W32(x), CrcKind::W32(y)) => {
                assert!(Arc::ptr_eq(&x.table, &y.table));
                assert_eq!(x.table[..], y.table[..]);
            }
            _ => panic!("expected 32 bit registers"),
        }
    }

    #[test]
    fn wide_register_streams() {
        // 160 bits forces the BigUint register path
        let crc = Crc::with_options()
            .width(160)
            .poly(CrcValue::from_hex("8000000000000000000000000000000000000021").unwrap())
            .init(CrcValue::from_hex("ffffffffffffffffffffffffffffffffffffffff").unwrap())
            .build()
            .unwrap();
        let oneshot = crc.digest(b"123456789");
        assert!(oneshot.bits() <= 160);
        let mut engine = crc.engine();
        engine.add(b"12345");
        let mut forked = engine.split();
        engine.add(b"6789");
        forked.add(b"6789");
        assert_eq!(engine.close(), oneshot);
        assert_eq!(forked.close(), oneshot);

        let unreflected = Crc::with_options()
            .width(160)
            .poly(CrcValue::from_hex("8000000000000000000000000000000000000021").unwrap())
            .refin(false)
            .refout(false)
            .build()
            .unwrap();
        let mut by_hand = unreflected.engine();
        by_hand.add(&[0u8; 21]);
        let mut shortcut = unreflected.engine();
        shortcut.add_zeros(21);
        assert_eq!(shortcut.close(), by_hand.close());
    }

    #[test]
    fn wide_and_narrow_agree_on_shared_widths() {
        // the BigUint engine and the native engine implement the same
        // recurrence; cross-check them on a width both can host
        let poly = CrcValue::from(0x42f0e1eba9ea3693u64);
        let init = CrcValue::from(0xffffffffffffffffu64);
        let xorout = CrcValue::from(0u8);
        for reflected in [false, true] {
            let fixed = FixedCrc::<u64>::new(64, &poly, &init, &xorout, reflected);
            let big = BigCrc::new(64, &poly, &init, &xorout, reflected);
            let mut fixed_engine = fixed.start();
            let mut big_engine = big.start();
            fixed_engine.add(b"123456789");
            big_engine.add(b"123456789");
            assert_eq!(fixed_engine.value(), big_engine.value());
        }
    }
}
