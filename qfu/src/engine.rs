//! Turns a [`Config`] into exactly one workflow invocation.

use camino::Utf8PathBuf;
use log::{debug, warn};

use crate::config::{ActionRequest, Config, SelectionCriteria};
use crate::error::{Error, Result};
use crate::operation::Operations;
use crate::udev::{DeviceEnumerator, DeviceType};

pub struct Engine<E, O> {
    enumerator: E,
    operations: O,
}

impl<E: DeviceEnumerator, O: Operations> Engine<E, O> {
    pub fn new(enumerator: E, operations: O) -> Self {
        Engine {
            enumerator,
            operations,
        }
    }

    /// Resolves `criteria` to a single device node of the given type.
    ///
    /// A manual path is used as is; otherwise the USB device is looked up and
    /// the first matching node inside it wins.
    pub fn select_path(
        &self,
        criteria: SelectionCriteria,
        device_type: DeviceType,
    ) -> Result<Utf8PathBuf> {
        criteria.validate()?;

        let filter = criteria.filter();
        if let Some(path) = criteria.manual_path {
            return Ok(path);
        }

        let sysfs_path = self.enumerator.find_device_container_path(&filter)?;
        debug!("using sysfs path: {}", sysfs_path);

        let mut nodes = self
            .enumerator
            .list_device_nodes(device_type, &sysfs_path)
            .into_iter();
        let path = nodes.next().ok_or(Error::NoDeviceNodes(sysfs_path))?;

        let ignored: Vec<_> = nodes.map(|n| n.to_string()).collect();
        if !ignored.is_empty() {
            warn!("using {}, ignoring: {}", path, ignored.join(", "));
        }
        Ok(path)
    }

    /// Validates `config`, resolves the device when the action needs one and
    /// runs the workflow. Nothing is dispatched unless every check passes.
    pub fn run(&self, config: Config) -> Result<()> {
        let action = config.action()?;
        if config.images.is_empty() {
            return Err(Error::NoImages);
        }

        match action {
            ActionRequest::Update { device, params } => {
                let path = self.select_path(config.criteria(device), DeviceType::CdcWdm)?;
                debug!("using cdc-wdm device: {}", path);
                self.operations.update(&config.images, path, &params)?;
            }
            ActionRequest::UpdateQdl { serial } => {
                let path = self.select_path(config.criteria(serial), DeviceType::Tty)?;
                debug!("using tty device: {}", path);
                self.operations.update_qdl(&config.images, path)?;
            }
            ActionRequest::Verify => self.operations.verify(&config.images)?,
        }
        Ok(())
    }
}
