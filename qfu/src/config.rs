use camino::Utf8PathBuf;

use crate::error::{Error, Result};
use crate::selection::{BusDev, VidPid};
use crate::udev::DeviceFilter;

/// Which device to operate on. At most one mechanism may be in use, which is
/// checked by [`SelectionCriteria::validate`] right before resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionCriteria {
    pub manual_path: Option<Utf8PathBuf>,
    pub vid_pid: Option<VidPid>,
    pub bus_dev: Option<BusDev>,
}

impl SelectionCriteria {
    /// Checks that selection mechanisms are not combined. The first conflict
    /// found, in a fixed order, is the one reported.
    pub fn validate(&self) -> Result<()> {
        if self.manual_path.is_some() && self.vid_pid.is_some() {
            return Err(Error::ManualPathWithVidPid);
        }
        if self.manual_path.is_some() && self.bus_dev.is_some() {
            return Err(Error::ManualPathWithBusDev);
        }
        if self.vid_pid.is_some() && self.bus_dev.is_some() {
            return Err(Error::BusDevWithVidPid);
        }
        Ok(())
    }

    pub fn filter(&self) -> DeviceFilter {
        DeviceFilter {
            vendor_id: self.vid_pid.map(|v| v.vid),
            product_id: self.vid_pid.and_then(|v| v.pid),
            bus_number: self.bus_dev.and_then(|b| b.bus),
            dev_number: self.bus_dev.map(|b| b.dev),
        }
    }
}

/// Parameters forwarded to the QMI update workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateParams {
    pub firmware_version: Option<String>,
    pub config_version: Option<String>,
    pub carrier: Option<String>,
    pub use_proxy: bool,
    pub use_mbim: bool,
}

/// Requested action flags, as given on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionFlags {
    pub update: bool,
    pub update_qdl: bool,
    pub verify: bool,
}

/// The single action a run performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    Update {
        device: Option<Utf8PathBuf>,
        params: UpdateParams,
    },
    UpdateQdl {
        serial: Option<Utf8PathBuf>,
    },
    Verify,
}

/// Everything a run needs, assembled once from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub vid_pid: Option<VidPid>,
    pub bus_dev: Option<BusDev>,
    pub actions: ActionFlags,
    /// Manual cdc-wdm path for `--update`.
    pub device: Option<Utf8PathBuf>,
    pub update: UpdateParams,
    /// Manual tty path for `--update-qdl`.
    pub serial: Option<Utf8PathBuf>,
    pub images: Vec<Utf8PathBuf>,
}

impl Config {
    /// Picks the one requested action.
    pub fn action(&self) -> Result<ActionRequest> {
        let ActionFlags {
            update,
            update_qdl,
            verify,
        } = self.actions;
        match [update, update_qdl, verify].iter().filter(|&&f| f).count() {
            0 => return Err(Error::NoActions),
            1 => {}
            _ => return Err(Error::TooManyActions),
        }

        let action = if update {
            ActionRequest::Update {
                device: self.device.clone(),
                params: self.update.clone(),
            }
        } else if update_qdl {
            ActionRequest::UpdateQdl {
                serial: self.serial.clone(),
            }
        } else {
            ActionRequest::Verify
        };
        Ok(action)
    }

    /// Selection criteria with `manual_path` as the manual override.
    pub fn criteria(&self, manual_path: Option<Utf8PathBuf>) -> SelectionCriteria {
        SelectionCriteria {
            manual_path,
            vid_pid: self.vid_pid,
            bus_dev: self.bus_dev,
        }
    }
}
