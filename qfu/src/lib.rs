pub mod config;
pub mod engine;
pub mod error;
pub mod operation;
pub mod selection;
pub mod udev;

pub use config::{ActionFlags, ActionRequest, Config, SelectionCriteria, UpdateParams};
pub use engine::Engine;
pub use error::{EnumerationError, Error, OperationError, ParseError, Result};
pub use operation::{Operations, Workflows};
pub use selection::{parse_busnum_devnum, parse_vid_pid, BusDev, VidPid};
pub use udev::{DeviceEnumerator, DeviceFilter, DeviceType, SysfsEnumerator};
