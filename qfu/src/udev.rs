//! Device lookup in the USB device tree.
//!
//! Resolution happens in two steps: first the physical USB device is located
//! (its sysfs directory, the "container"), then the container is searched for
//! the device node the requested action talks to.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use walkdir::WalkDir;

use crate::error::EnumerationError;

/// Depth below the container at which class devices show up, e.g.
/// `1-2:1.0/ttyUSB0/tty/ttyUSB0`.
const MAX_NODE_DEPTH: usize = 4;

/// Kind of device node to look for inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    /// QMI control character device (`/dev/cdc-wdmN`).
    CdcWdm,
    /// Serial device exposed in QDL download mode (`/dev/ttyUSBN`, `/dev/ttyACMN`).
    Tty,
}

/// USB properties to match on. `None` matches anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
    pub bus_number: Option<u32>,
    pub dev_number: Option<u32>,
}

impl DeviceFilter {
    pub fn matches(&self, vendor_id: u16, product_id: u16, bus_number: u32, dev_number: u32) -> bool {
        self.vendor_id.map_or(true, |v| v == vendor_id)
            && self.product_id.map_or(true, |p| p == product_id)
            && self.bus_number.map_or(true, |b| b == bus_number)
            && self.dev_number.map_or(true, |d| d == dev_number)
    }
}

impl fmt::Display for DeviceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields = vec![];
        if let Some(vid) = self.vendor_id {
            fields.push(format!("vid {:04x}", vid));
        }
        if let Some(pid) = self.product_id {
            fields.push(format!("pid {:04x}", pid));
        }
        if let Some(bus) = self.bus_number {
            fields.push(format!("bus {}", bus));
        }
        if let Some(dev) = self.dev_number {
            fields.push(format!("dev {}", dev));
        }
        if fields.is_empty() {
            write!(f, "any usb device")
        } else {
            write!(f, "{}", fields.join(", "))
        }
    }
}

pub trait DeviceEnumerator {
    /// Returns the sysfs directory of the single USB device matching `filter`.
    fn find_device_container_path(
        &self,
        filter: &DeviceFilter,
    ) -> Result<Utf8PathBuf, EnumerationError>;

    /// Lists the `device_type` nodes found under `container`, in a stable order.
    fn list_device_nodes(&self, device_type: DeviceType, container: &Utf8Path) -> Vec<Utf8PathBuf>;
}

impl<T: DeviceEnumerator + ?Sized> DeviceEnumerator for &T {
    fn find_device_container_path(
        &self,
        filter: &DeviceFilter,
    ) -> Result<Utf8PathBuf, EnumerationError> {
        (**self).find_device_container_path(filter)
    }

    fn list_device_nodes(&self, device_type: DeviceType, container: &Utf8Path) -> Vec<Utf8PathBuf> {
        (**self).list_device_nodes(device_type, container)
    }
}

/// Enumerator backed by the live USB bus and sysfs.
#[derive(Debug, Clone)]
pub struct SysfsEnumerator {
    dev_root: Utf8PathBuf,
}

impl Default for SysfsEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SysfsEnumerator {
    pub fn new() -> Self {
        SysfsEnumerator {
            dev_root: Utf8PathBuf::from("/dev"),
        }
    }

    /// Maps found nodes under `dev_root` instead of `/dev`.
    pub fn with_dev_root(dev_root: impl Into<Utf8PathBuf>) -> Self {
        SysfsEnumerator {
            dev_root: dev_root.into(),
        }
    }
}

impl DeviceEnumerator for SysfsEnumerator {
    #[cfg(target_os = "linux")]
    fn find_device_container_path(
        &self,
        filter: &DeviceFilter,
    ) -> Result<Utf8PathBuf, EnumerationError> {
        let found: Vec<Utf8PathBuf> = nusb::list_devices()?
            .filter(|d| {
                filter.matches(
                    d.vendor_id(),
                    d.product_id(),
                    u32::from(d.bus_number()),
                    u32::from(d.device_address()),
                )
            })
            .filter_map(|d| Utf8Path::from_path(d.sysfs_path()).map(Utf8Path::to_path_buf))
            // hubs and other peripherals match an open filter too
            .filter(|path| {
                let modem = has_modem_nodes(path);
                debug!("usb device at {}: {}", path, if modem { "modem" } else { "skipped" });
                modem
            })
            .collect();

        single_match(found, filter)
    }

    #[cfg(not(target_os = "linux"))]
    fn find_device_container_path(
        &self,
        _filter: &DeviceFilter,
    ) -> Result<Utf8PathBuf, EnumerationError> {
        Err(EnumerationError::Unsupported)
    }

    fn list_device_nodes(&self, device_type: DeviceType, container: &Utf8Path) -> Vec<Utf8PathBuf> {
        scan_node_names(device_type, container)
            .into_iter()
            .map(|name| self.dev_root.join(name))
            .collect()
    }
}

/// Reduces the devices found for `filter` to exactly one.
fn single_match(
    mut found: Vec<Utf8PathBuf>,
    filter: &DeviceFilter,
) -> Result<Utf8PathBuf, EnumerationError> {
    match found.len() {
        0 => Err(EnumerationError::NotFound(*filter)),
        1 => Ok(found.remove(0)),
        count => Err(EnumerationError::Ambiguous {
            filter: *filter,
            count,
        }),
    }
}

/// Whether `container` exposes any node a modem action can use.
fn has_modem_nodes(container: &Utf8Path) -> bool {
    [DeviceType::CdcWdm, DeviceType::Tty]
        .into_iter()
        .any(|t| !scan_node_names(t, container).is_empty())
}

/// Names of the `device_type` nodes below `container`, sorted by sysfs
/// position, without duplicates.
fn scan_node_names(device_type: DeviceType, container: &Utf8Path) -> Vec<String> {
    let mut names: Vec<String> = vec![];

    let walker = WalkDir::new(container)
        .min_depth(1)
        .max_depth(MAX_NODE_DEPTH)
        .sort_by_file_name()
        // stay inside our own interfaces (`1-2:1.0`), not child devices (`1-2.1`)
        .into_iter()
        .filter_entry(|e| e.depth() != 1 || e.file_name().to_string_lossy().contains(':'));
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("skipping unreadable sysfs entry: {}", e);
                continue;
            }
        };
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        let class = entry
            .path()
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or("");
        if is_device_node(device_type, name, class) && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }

    names
}

/// Whether a sysfs entry called `name`, inside a directory called `class`,
/// stands for a `device_type` node.
fn is_device_node(device_type: DeviceType, name: &str, class: &str) -> bool {
    match device_type {
        DeviceType::CdcWdm => {
            name.starts_with("cdc-wdm") && (class == "usbmisc" || class == "usb")
        }
        // usb-serial ports show up directly below the interface, cdc-acm
        // ports only below the tty class directory
        DeviceType::Tty => {
            name.starts_with("ttyUSB") || (name.starts_with("ttyACM") && class == "tty")
        }
    }
}
