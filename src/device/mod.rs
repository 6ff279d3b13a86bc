//! # Device Module
//!
//! Identity of a discovered WirelessPrint printer, as supplied by the host's
//! device registry: a unique key, a network address, a port and the
//! announced property set.
//!
//! ## Modules
//!
//! - [`properties`]: Typed zeroconf TXT record

pub mod properties;

pub use properties::DeviceProperties;

use serde::Serialize;

/// Default HTTP port of the printer's web interface.
pub const DEFAULT_PORT: u16 = 80;

/// A network-attached printer.
///
/// ## Example
///
/// ```
/// use wireless_print::device::{DeviceProperties, PrinterDevice};
///
/// let device = PrinterDevice::new("wirelessprint", "192.0.2.5", 80, DeviceProperties::default());
/// assert_eq!(device.print_url(), "http://192.0.2.5/print");
/// assert_eq!(device.description(), "Print on wirelessprint (192.0.2.5)");
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct PrinterDevice {
    key: String,
    address: String,
    port: u16,
    properties: DeviceProperties,
}

impl PrinterDevice {
    /// Register a device. `address` is a host, optionally with `:port` or a path.
    pub fn new(
        key: impl Into<String>,
        address: impl Into<String>,
        port: u16,
        properties: DeviceProperties,
    ) -> Self {
        Self {
            key: key.into(),
            address: address.into(),
            port,
            properties,
        }
    }

    /// Unique key of this printer.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Network address the upload is sent to.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Port announced by discovery.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn properties(&self) -> &DeviceProperties {
        &self.properties
    }

    /// Look up an announced property. Empty string if absent.
    pub fn get_property(&self, key: &str) -> String {
        self.properties.get(key)
    }

    /// Display name: the announced `name`, falling back to the key.
    pub fn name(&self) -> &str {
        match self.properties.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.key,
        }
    }

    /// Printer firmware version, empty if not announced.
    pub fn firmware_version(&self) -> String {
        self.properties.get(properties::KEY_FIRMWARE_VERSION)
    }

    /// WirelessPrint module version, empty if not announced.
    pub fn wirelessprint_version(&self) -> String {
        self.properties.get(properties::KEY_VERSION)
    }

    /// Web interface of the printer, offered to the user after a successful upload.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.address.trim_end_matches('/'))
    }

    /// Upload endpoint.
    pub fn print_url(&self) -> String {
        format!("{}/print", self.base_url())
    }

    /// Short description shown next to the "print" action.
    pub fn description(&self) -> String {
        format!("Print on {} ({})", self.key, self.address)
    }
}

// ============================================================================
// TESTS
// ============================================================================
