use std::{fmt::Display, str::FromStr};

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("expecting four-digit hexadecimal")]
pub struct InvalidHexId;

/// A malformed product or vendor id, with an example of the expected form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("expecting four-digit hexadecimal e.g. {example}")]
pub struct InvalidId {
    pub example: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("expecting suspend, resume")]
pub struct InvalidAction;

/// Parses an id written as `0x` followed by exactly four hex digits.
///
/// The `x` and the digits are case-insensitive. Anything else, including a
/// sign after the prefix or non-ASCII input, is rejected.
pub fn parse_hex_id(s: &str) -> Result<u16, InvalidHexId> {
    if s.len() != 6 {
        return Err(InvalidHexId);
    }
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or(InvalidHexId)?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(InvalidHexId);
    }
    u16::from_str_radix(digits, 16).map_err(|_| InvalidHexId)
}

pub fn parse_product_id(s: &str) -> Result<u16, InvalidId> {
    parse_hex_id(s).map_err(|_| InvalidId { example: "0x0040" })
}

pub fn parse_vendor_id(s: &str) -> Result<u16, InvalidId> {
    parse_hex_id(s).map_err(|_| InvalidId { example: "0x045e" })
}

/// Exact vendor/product match; there are no wildcards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IdPair {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl IdPair {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self { vendor_id, product_id }
    }
}

impl Display for IdPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerAction {
    Suspend,
    Resume,
}

impl PowerAction {
    /// The boolean handed to the device: `true` suspends, `false` resumes.
    pub fn is_suspend(self) -> bool {
        matches!(self, PowerAction::Suspend)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PowerAction::Suspend => "suspend",
            PowerAction::Resume => "resume",
        }
    }
}

impl FromStr for PowerAction {
    type Err = InvalidAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "suspend" => Ok(PowerAction::Suspend),
            "resume" => Ok(PowerAction::Resume),
            _ => Err(InvalidAction),
        }
    }
}

impl Display for PowerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
