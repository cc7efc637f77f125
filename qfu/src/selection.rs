//! Compact device selection grammars.
//!
//! Two encodings are accepted on the command line, following the usual USB
//! tooling conventions:
//!
//! * `[BUS:]DEV`, decimal, as printed by `lsusb` in the `Bus`/`Device` columns
//! * `VID[:PID]`, hexadecimal, as printed by `lsusb` in the `ID` column
//!
//! Zero is never a valid value in either grammar, it is what "not given" means
//! to the enumeration backend.

use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// A device selected by USB bus number and device address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusDev {
    pub bus: Option<u32>,
    pub dev: u32,
}

/// A device selected by USB vendor id and, optionally, product id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VidPid {
    pub vid: u16,
    pub pid: Option<u16>,
}

/// Splits `s` on `:` into one or two fields.
fn split_fields(s: &str) -> Option<(&str, Option<&str>)> {
    let mut fields = s.split(':');
    let first = fields.next()?;
    let second = fields.next();
    if fields.next().is_some() {
        return None;
    }
    Some((first, second))
}

/// Parses a non-zero number no larger than `max` in the given radix.
fn parse_nonzero(field: &str, radix: u32, max: u64) -> Option<u64> {
    let digits = if radix == 16 {
        field
            .strip_prefix("0x")
            .or_else(|| field.strip_prefix("0X"))
            .unwrap_or(field)
    } else {
        field
    };
    // from_str_radix would accept a leading '+'
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    match u64::from_str_radix(digits, radix) {
        Ok(v) if v != 0 && v <= max => Some(v),
        _ => None,
    }
}

/// Parses `[BUS:]DEV`. Both numbers are decimal.
pub fn parse_busnum_devnum(s: &str) -> Result<BusDev, ParseError> {
    let (first, second) = split_fields(s).ok_or(ParseError::BusDevTooManyFields)?;
    let (bus_str, dev_str) = match second {
        Some(dev) => (Some(first), dev),
        None => (None, first),
    };

    let bus = match bus_str {
        Some(b) => Some(
            parse_nonzero(b, 10, u32::MAX as u64)
                .ok_or_else(|| ParseError::InvalidBusNumber(b.to_string()))? as u32,
        ),
        None => None,
    };
    let dev = parse_nonzero(dev_str, 10, u32::MAX as u64)
        .ok_or_else(|| ParseError::InvalidDevNumber(dev_str.to_string()))? as u32;

    Ok(BusDev { bus, dev })
}

/// Parses `VID[:PID]`. Both ids are hexadecimal.
pub fn parse_vid_pid(s: &str) -> Result<VidPid, ParseError> {
    let (vid_str, pid_str) = split_fields(s).ok_or(ParseError::VidPidTooManyFields)?;

    // product id is checked first so its error wins when both are bad
    let pid = match pid_str {
        Some(p) => Some(
            parse_nonzero(p, 16, u16::MAX as u64)
                .ok_or_else(|| ParseError::InvalidProductId(p.to_string()))? as u16,
        ),
        None => None,
    };
    let vid = parse_nonzero(vid_str, 16, u16::MAX as u64)
        .ok_or_else(|| ParseError::InvalidVendorId(vid_str.to_string()))? as u16;

    Ok(VidPid { vid, pid })
}

impl FromStr for BusDev {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_busnum_devnum(s)
    }
}

impl FromStr for VidPid {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_vid_pid(s)
    }
}

impl fmt::Display for BusDev {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bus {
            Some(bus) => write!(f, "{}:{}", bus, self.dev),
            None => write!(f, "{}", self.dev),
        }
    }
}

impl fmt::Display for VidPid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pid {
            Some(pid) => write!(f, "{:04x}:{:04x}", self.vid, pid),
            None => write!(f, "{:04x}", self.vid),
        }
    }
}
