//! MAC address parsing and display.
//!
//! Users address devices by MAC in whatever style their tools print:
//! `aa:bb:cc:dd:ee:ff`, `AA-BB-CC-DD-EE-FF`, `aabb.ccdd.eeff` is *not*
//! accepted, but spaces and the two usual separators are.  Every form is
//! normalised to the same [`MacAddress`] so lookups are separator-insensitive.

use std::fmt;
use std::str::FromStr;

/// Display form used when a device has never been reached.
pub const UNKNOWN_MAC: &str = "??-??-??-??-??-??";

/// A 6-byte hardware address, displayed as `AA-BB-CC-DD-EE-FF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Builds an address from bytes reported in reverse (least significant
    /// octet first), as some device firmwares do.
    pub fn from_reversed(mut bytes: [u8; 6]) -> Self {
        bytes.reverse();
        Self(bytes)
    }

    /// Parses `text` after removing `:`, `-` and whitespace.
    ///
    /// Returns `None` unless exactly 12 hex digits remain.
    pub fn parse(text: &str) -> Option<Self> {
        let digits: Vec<u8> = text
            .bytes()
            .filter(|b| !matches!(b, b':' | b'-') && !b.is_ascii_whitespace())
            .collect();
        if digits.len() != 12 || !digits.iter().all(u8::is_ascii_hexdigit) {
            return None;
        }

        let mut bytes = [0u8; 6];
        for (slot, pair) in bytes.iter_mut().zip(digits.chunks(2)) {
            let pair = std::str::from_utf8(pair).ok()?;
            *slot = u8::from_str_radix(pair, 16).ok()?;
        }
        Some(Self(bytes))
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for MacAddress {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MacAddress::parse(s).ok_or(())
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}-{b:02X}-{c:02X}-{d:02X}-{e:02X}-{g:02X}")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const MAC: MacAddress = MacAddress::new([0x34, 0xea, 0x34, 0x01, 0xab, 0xcd]);

    #[test]
    fn test_parse_accepts_every_separator_style() {
        for text in [
            "34:ea:34:01:ab:cd",
            "34-EA-34-01-AB-CD",
            "34 ea 34 01 ab cd",
            "34ea3401abcd",
            " 34:EA-34 01abcd ",
        ] {
            assert_eq!(MacAddress::parse(text), Some(MAC), "{text}");
        }
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert_eq!(MacAddress::parse("34:ea:34:01:ab"), None);
        assert_eq!(MacAddress::parse("34:ea:34:01:ab:cd:ef"), None);
        assert_eq!(MacAddress::parse(""), None);
    }

    #[test]
    fn test_parse_rejects_non_hex() {
        assert_eq!(MacAddress::parse("34:ea:34:01:ab:zz"), None);
        assert_eq!(MacAddress::parse("living-room1"), None);
    }

    #[test]
    fn test_display_is_upper_case_dashed() {
        assert_eq!(MAC.to_string(), "34-EA-34-01-AB-CD");
    }

    #[test]
    fn test_from_reversed_flips_octet_order() {
        let mac = MacAddress::from_reversed([0xcd, 0xab, 0x01, 0x34, 0xea, 0x34]);
        assert_eq!(mac, MAC);
    }

    #[test]
    fn test_unknown_placeholder_has_display_shape() {
        assert_eq!(UNKNOWN_MAC.len(), MAC.to_string().len());
    }
}
