//! Vehicle identifiers
//!
//! Canonical ids are `CAR<n>`. The compact broadcast form abbreviates them to
//! `C<n>`. Ids are short ASCII strings stored inline so they can be copied
//! freely between the dispatcher, the peer table and the controller.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Number of vehicles addressed by the topology matrix
pub const FLEET_SIZE: usize = 4;

const MAX_ID_LEN: usize = 12;
const CANONICAL_PREFIX: &str = "CAR";
const SHORT_PREFIX: &str = "C";

/// Inline ASCII vehicle id
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct VehicleId {
    bytes: [u8; MAX_ID_LEN],
    len: u8,
}

impl VehicleId {
    /// Canonical id `CAR<n>`
    pub fn car(n: u8) -> Self {
        let mut bytes = [0u8; MAX_ID_LEN];
        bytes[..3].copy_from_slice(CANONICAL_PREFIX.as_bytes());
        let digits = n.to_string();
        bytes[3..3 + digits.len()].copy_from_slice(digits.as_bytes());
        Self {
            bytes,
            len: (3 + digits.len()) as u8,
        }
    }

    /// Expand a broadcast token (`C3` or `CAR3`) to the canonical id
    pub fn from_short(token: &str) -> Option<Self> {
        if token.starts_with(CANONICAL_PREFIX) {
            return token.parse().ok();
        }
        let digits = token.strip_prefix(SHORT_PREFIX)?;
        let n: u8 = digits.parse().ok()?;
        Some(Self::car(n))
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII bytes are ever stored
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }

    /// Fleet number `n` of a canonical `CAR<n>` id
    pub fn number(&self) -> Option<u8> {
        self.as_str().strip_prefix(CANONICAL_PREFIX)?.parse().ok()
    }

    /// Row/column of this vehicle in the topology matrix
    pub fn fleet_index(&self) -> Option<usize> {
        match self.number()? {
            n @ 1..=4 => Some(usize::from(n) - 1),
            _ => None,
        }
    }

    /// Compact broadcast form (`CAR3` -> `C3`); other ids are unchanged
    pub fn short(&self) -> String {
        match self.number() {
            Some(n) => format!("{}{}", SHORT_PREFIX, n),
            None => self.as_str().to_string(),
        }
    }

    /// Id derived from a station MAC
    ///
    /// Known MACs map to `CAR<i+1>` by table position. Unknown MACs get
    /// `CAR` plus the last two octets (colons dropped).
    pub fn from_mac(mac: &str, known_macs: &[String]) -> Self {
        if let Some(i) = known_macs
            .iter()
            .position(|known| known.eq_ignore_ascii_case(mac))
        {
            return Self::car((i + 1) as u8);
        }
        let tail: String = mac
            .get(12..)
            .unwrap_or(mac)
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect();
        format!("{}{}", CANONICAL_PREFIX, tail)
            .parse()
            .unwrap_or_else(|_| Self::car(0))
    }

    /// Canonical ids of the known fleet
    pub fn roster() -> [VehicleId; FLEET_SIZE] {
        [Self::car(1), Self::car(2), Self::car(3), Self::car(4)]
    }
}

impl FromStr for VehicleId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let valid = !s.is_empty()
            && s.len() <= MAX_ID_LEN
            && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if !valid {
            return Err(Error::InvalidParameter(format!("invalid vehicle id {:?}", s)));
        }
        let mut bytes = [0u8; MAX_ID_LEN];
        bytes[..s.len()].copy_from_slice(s.as_bytes());
        Ok(Self {
            bytes,
            len: s.len() as u8,
        })
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VehicleId({})", self.as_str())
    }
}
