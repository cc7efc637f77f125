use camino::Utf8PathBuf;
use std::io;
use thiserror::Error;

use crate::udev::DeviceFilter;

/// Failure to parse one of the compact selection grammars.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid busnum-devnum string: too many fields")]
    BusDevTooManyFields,
    #[error("invalid bus number: {0}")]
    InvalidBusNumber(String),
    #[error("invalid dev number: {0}")]
    InvalidDevNumber(String),
    #[error("invalid vid-pid string: too many fields")]
    VidPidTooManyFields,
    #[error("invalid vendor id: {0}")]
    InvalidVendorId(String),
    #[error("invalid product id: {0}")]
    InvalidProductId(String),
}

/// Errors reported by the enumeration collaborator.
#[derive(Debug, Error)]
pub enum EnumerationError {
    #[error("no modem found matching {0}")]
    NotFound(DeviceFilter),
    #[error("{count} modems found matching {filter}")]
    Ambiguous { filter: DeviceFilter, count: usize },
    #[error("couldn't list usb devices")]
    Io(#[from] io::Error),
    #[error("device lookup by sysfs path is not supported on this platform")]
    Unsupported,
}

/// Errors reported by an update or verify workflow.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("invalid image {path}: {reason}")]
    InvalidImage { path: Utf8PathBuf, reason: String },
    #[error("couldn't open {path}")]
    Open {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("couldn't open serial port {path}")]
    Serial {
        path: Utf8PathBuf,
        #[source]
        source: serialport::Error,
    },
    #[error("{0} protocol support is not available in this build")]
    ProtocolUnavailable(&'static str),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("no actions specified")]
    NoActions,
    #[error("too many actions specified")]
    TooManyActions,
    #[error("no firmware images specified")]
    NoImages,
    #[error("cannot specify device path and vid:pid lookup")]
    ManualPathWithVidPid,
    #[error("cannot specify device path and busnum:devnum lookup")]
    ManualPathWithBusDev,
    #[error("cannot specify busnum:devnum and vid:pid lookups")]
    BusDevWithVidPid,
    #[error(transparent)]
    Enumeration(#[from] EnumerationError),
    #[error("no devices found in sysfs path: {0}")]
    NoDeviceNodes(Utf8PathBuf),
    #[error(transparent)]
    Operation(#[from] OperationError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
