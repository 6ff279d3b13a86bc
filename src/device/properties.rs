//! # Device Properties
//!
//! Typed view over the zeroconf TXT record a WirelessPrint printer announces.
//!
//! Discovery hands over raw byte-string pairs. They are decoded once, when the
//! device is registered, and never change afterwards.
//!
//! ## Known Keys
//!
//! | Key | Field | Example |
//! |-----|-------|---------|
//! | `name` | [`DeviceProperties::name`] | `Prusa i3` |
//! | `firmware_version` | [`DeviceProperties::firmware_version`] | `1.1.9` |
//! | `version` | [`DeviceProperties::version`] | `1.3.10` |
//!
//! Any other key is kept and can still be read with [`DeviceProperties::get`].

use std::collections::BTreeMap;

use serde::Serialize;

/// TXT key holding the printer's display name.
pub const KEY_NAME: &str = "name";
/// TXT key holding the printer firmware version.
pub const KEY_FIRMWARE_VERSION: &str = "firmware_version";
/// TXT key holding the WirelessPrint module version.
pub const KEY_VERSION: &str = "version";

/// Immutable property set of a discovered printer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceProperties {
    pub name: Option<String>,
    pub firmware_version: Option<String>,
    pub version: Option<String>,
    /// Every other TXT entry, lossily decoded as UTF-8.
    pub extra: BTreeMap<String, String>,
}

impl DeviceProperties {
    /// Decode a raw TXT record.
    ///
    /// Keys and values are decoded lossily; a later duplicate key wins.
    pub fn from_txt_record<I, K, V>(record: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let mut props = Self::default();
        for (key, value) in record {
            let key = String::from_utf8_lossy(key.as_ref()).into_owned();
            let value = String::from_utf8_lossy(value.as_ref()).into_owned();
            match key.as_str() {
                KEY_NAME => props.name = Some(value),
                KEY_FIRMWARE_VERSION => props.firmware_version = Some(value),
                KEY_VERSION => props.version = Some(value),
                _ => {
                    props.extra.insert(key, value);
                }
            }
        }
        props
    }

    /// Look up a property by key. Returns an empty string if absent.
    pub fn get(&self, key: &str) -> String {
        let value = match key {
            KEY_NAME => self.name.as_ref(),
            KEY_FIRMWARE_VERSION => self.firmware_version.as_ref(),
            KEY_VERSION => self.version.as_ref(),
            _ => self.extra.get(key),
        };
        value.cloned().unwrap_or_default()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> DeviceProperties {
        DeviceProperties::from_txt_record(vec![
            (b"name".to_vec(), b"Prusa i3".to_vec()),
            (b"firmware_version".to_vec(), b"1.1.9".to_vec()),
            (b"version".to_vec(), b"1.3.10".to_vec()),
            (b"board".to_vec(), b"esp8266".to_vec()),
        ])
    }

    #[test]
    fn test_known_keys_are_typed() {
        let props = sample();
        assert_eq!(props.name.as_deref(), Some("Prusa i3"));
        assert_eq!(props.firmware_version.as_deref(), Some("1.1.9"));
        assert_eq!(props.version.as_deref(), Some("1.3.10"));
        assert_eq!(props.extra.len(), 1);
    }

    #[test]
    fn test_get_known_and_extra() {
        let props = sample();
        assert_eq!(props.get("name"), "Prusa i3");
        assert_eq!(props.get("version"), "1.3.10");
        assert_eq!(props.get("board"), "esp8266");
    }

    #[test]
    fn test_get_missing_is_empty() {
        let props = sample();
        assert_eq!(props.get("path"), "");
        assert_eq!(DeviceProperties::default().get("name"), "");
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let props = DeviceProperties::from_txt_record([(&b"name"[..], &[0x66u8, 0xff, 0x6f][..])]);
        assert_eq!(props.get("name"), "f\u{fffd}o");
    }

    #[test]
    fn test_empty_record() {
        let props = DeviceProperties::from_txt_record(Vec::<(&[u8], &[u8])>::new());
        assert_eq!(props, DeviceProperties::default());
        assert_ne!(sample(), DeviceProperties::default());
    }
}
