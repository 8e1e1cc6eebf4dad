//! NIC hardware address.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 48-bit Ethernet MAC address as recorded on a Nic or Hnic.
///
/// Parsing accepts colon or hyphen separated octets in either case;
/// display is always lower-case and colon separated.
///
/// # Examples
///
/// ```
/// use metalnet_types::MacAddress;
///
/// let mac: MacAddress = "DE:AD:BE:EF:20:14".parse().unwrap();
/// assert_eq!(mac.to_string(), "de:ad:be:ef:20:14");
/// assert_eq!(mac, "de-ad-be-ef-20-14".parse().unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        MacAddress(octets)
    }

    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidMacAddress(s.to_string());
        let separator = if s.contains(':') { ':' } else { '-' };

        let mut octets = [0u8; 6];
        let mut parts = s.split(separator);
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 {
                return Err(invalid());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(MacAddress(octets))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> String {
        mac.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_upper_case() {
        let mac: MacAddress = "DE:AD:BE:EF:20:14".parse().unwrap();
        assert_eq!(mac.octets(), [0xde, 0xad, 0xbe, 0xef, 0x20, 0x14]);
    }

    #[test]
    fn test_hyphens_display_as_colons() {
        let mac: MacAddress = "02-00-DE-AD-00-07".parse().unwrap();
        assert_eq!(mac.to_string(), "02:00:de:ad:00:07");
    }

    #[test]
    fn test_rejects_malformed() {
        for text in [
            "",
            "de:ad:be:ef:20",
            "de:ad:be:ef:20:14:00",
            "de:ad:be:ef:20:zz",
            "d:ad:be:ef:20:14",
            "de:ad-be:ef:20:14",
        ] {
            assert!(text.parse::<MacAddress>().is_err(), "{text:?} parsed");
        }
    }

    #[test]
    fn test_serde_as_string() {
        let mac: MacAddress = "de:ad:be:ef:20:14".parse().unwrap();
        let json = serde_json::to_string(&mac).unwrap();
        assert_eq!(json, "\"de:ad:be:ef:20:14\"");
        assert_eq!(serde_json::from_str::<MacAddress>(&json).unwrap(), mac);
    }
}
