// ── MAC addresses ──
//
// Reservation files arrive from many sources: switch CLIs, spreadsheets,
// controller exports. Accept every common notation and normalize to the
// lowercase colon form the Dashboard uses as the fixed-assignment key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// A validated 48-bit MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for MacAddress {
    type Err = ValidationError;

    /// Accepted notations (case-insensitive):
    ///
    /// - `aa:bb:cc:dd:ee:ff`
    /// - `aa-bb-cc-dd-ee-ff`
    /// - `aabb.ccdd.eeff` (Cisco)
    /// - `aabbcc-ddeeff` (Aruba)
    /// - `aabbccddeeff`
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidMac {
            value: raw.to_owned(),
        };
        let trimmed = raw.trim();

        let groups: Vec<&str> = if trimmed.contains(':') {
            trimmed.split(':').collect()
        } else if trimmed.contains('.') {
            trimmed.split('.').collect()
        } else if trimmed.contains('-') {
            trimmed.split('-').collect()
        } else {
            vec![trimmed]
        };

        let layout_ok = match groups.as_slice() {
            [single] => single.len() == 12,
            [a, b] => a.len() == 6 && b.len() == 6,
            [a, b, c] => [a, b, c].iter().all(|g| g.len() == 4),
            six if six.len() == 6 => six.iter().all(|g| g.len() == 2),
            _ => false,
        };
        // Cisco dotted form never uses two groups; Aruba never uses dots.
        let layout_ok = layout_ok
            && !(groups.len() == 2 && trimmed.contains('.'))
            && !(groups.len() == 3 && !trimmed.contains('.'));
        if !layout_ok {
            return Err(invalid());
        }

        let hex: String = groups.concat();
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            let pair = hex.get(i * 2..i * 2 + 2).ok_or_else(invalid)?;
            *octet = u8::from_str_radix(pair, 16).map_err(|_| invalid())?;
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn all_notations_normalize_to_colon_form() {
        for raw in [
            "AA:BB:CC:DD:EE:0F",
            "aa-bb-cc-dd-ee-0f",
            "aabb.ccdd.ee0f",
            "AABBCC-DDEE0F",
            "aabbccddee0f",
            "  aa:bb:cc:dd:ee:0f ",
        ] {
            let mac: MacAddress = raw.parse().unwrap();
            assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:0f", "input {raw:?}");
        }
    }

    #[test]
    fn rejects_malformed() {
        for raw in [
            "",
            "aa:bb:cc:dd:ee",
            "aa:bb:cc:dd:ee:fg",
            "aabb.ccdd",
            "aabbcc.ddeeff",
            "aab-bcc-dde-eff",
            "aabbccddeeff00",
            "a:bb:cc:dd:ee:fff",
        ] {
            assert!(raw.parse::<MacAddress>().is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn serde_uses_display_form() {
        let mac: MacAddress = serde_json::from_str("\"AABB.CCDD.EEFF\"").unwrap();
        assert_eq!(serde_json::to_string(&mac).unwrap(), "\"aa:bb:cc:dd:ee:ff\"");
    }
}
