use std::fs::{self, OpenOptions};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};

use crate::config::UpdateParams;
use crate::error::OperationError;

const QDL_BAUD_RATE: u32 = 115200;
const QDL_OPEN_TIMEOUT: Duration = Duration::from_millis(5000);

/// Firmware image kinds, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    /// Carrier-wrapped executable (firmware, bootloader).
    Cwe,
    /// Carrier configuration (PRI).
    Nvu,
    /// Combined firmware + configuration package.
    Spk,
}

impl ImageType {
    pub fn from_path(path: &Utf8Path) -> Option<Self> {
        match path.extension()?.to_ascii_lowercase().as_str() {
            "cwe" => Some(ImageType::Cwe),
            "nvu" => Some(ImageType::Nvu),
            "spk" => Some(ImageType::Spk),
            _ => None,
        }
    }
}

/// The three workflows a run can end in.
pub trait Operations {
    fn update(
        &self,
        images: &[Utf8PathBuf],
        device: Utf8PathBuf,
        params: &UpdateParams,
    ) -> Result<(), OperationError>;

    fn update_qdl(&self, images: &[Utf8PathBuf], serial: Utf8PathBuf) -> Result<(), OperationError>;

    fn verify(&self, images: &[Utf8PathBuf]) -> Result<(), OperationError>;
}

impl<T: Operations + ?Sized> Operations for &T {
    fn update(
        &self,
        images: &[Utf8PathBuf],
        device: Utf8PathBuf,
        params: &UpdateParams,
    ) -> Result<(), OperationError> {
        (**self).update(images, device, params)
    }

    fn update_qdl(&self, images: &[Utf8PathBuf], serial: Utf8PathBuf) -> Result<(), OperationError> {
        (**self).update_qdl(images, serial)
    }

    fn verify(&self, images: &[Utf8PathBuf]) -> Result<(), OperationError> {
        (**self).verify(images)
    }
}

fn invalid(path: &Utf8Path, reason: impl Into<String>) -> OperationError {
    OperationError::InvalidImage {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Checks that `path` looks like a usable firmware image.
pub fn check_image(path: &Utf8Path) -> Result<ImageType, OperationError> {
    let image_type =
        ImageType::from_path(path).ok_or_else(|| invalid(path, "unknown image type"))?;
    let meta = fs::metadata(path).map_err(|e| invalid(path, e.to_string()))?;
    if !meta.is_file() {
        return Err(invalid(path, "not a regular file"));
    }
    if meta.len() == 0 {
        return Err(invalid(path, "empty file"));
    }
    debug!("image {}: {:?}, {} bytes", path, image_type, meta.len());
    Ok(image_type)
}

/// Workflows run on the host.
///
/// Image checks and device access are done here; the QMI and QDL download
/// protocols themselves are not part of this build, so both update actions
/// stop with [`OperationError::ProtocolUnavailable`] once preflight passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Workflows;

impl Workflows {
    fn check_images(&self, images: &[Utf8PathBuf]) -> Result<(), OperationError> {
        for image in images {
            check_image(image)?;
        }
        Ok(())
    }
}

impl Operations for Workflows {
    fn update(
        &self,
        images: &[Utf8PathBuf],
        device: Utf8PathBuf,
        params: &UpdateParams,
    ) -> Result<(), OperationError> {
        self.check_images(images)?;

        OpenOptions::new()
            .read(true)
            .write(true)
            .open(&device)
            .map_err(|source| OperationError::Open {
                path: device.clone(),
                source,
            })?;
        info!("opened cdc-wdm device {}", device);
        debug!(
            "firmware version: {}, config version: {}, carrier: {}, proxy: {}, mbim: {}",
            params.firmware_version.as_deref().unwrap_or("any"),
            params.config_version.as_deref().unwrap_or("any"),
            params.carrier.as_deref().unwrap_or("any"),
            params.use_proxy,
            params.use_mbim
        );

        Err(OperationError::ProtocolUnavailable("QMI"))
    }

    fn update_qdl(&self, images: &[Utf8PathBuf], serial: Utf8PathBuf) -> Result<(), OperationError> {
        self.check_images(images)?;

        serialport::new(serial.as_str(), QDL_BAUD_RATE)
            .timeout(QDL_OPEN_TIMEOUT)
            .open()
            .map_err(|source| OperationError::Serial {
                path: serial.clone(),
                source,
            })?;
        info!("opened QDL serial port {}", serial);

        Err(OperationError::ProtocolUnavailable("QDL"))
    }

    fn verify(&self, images: &[Utf8PathBuf]) -> Result<(), OperationError> {
        self.check_images(images)?;
        info!("{} image(s) verified", images.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_image(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> Utf8PathBuf {
        let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn image_type_follows_extension() {
        assert_eq!(ImageType::from_path(Utf8Path::new("fw.cwe")), Some(ImageType::Cwe));
        assert_eq!(ImageType::from_path(Utf8Path::new("cfg.NVU")), Some(ImageType::Nvu));
        assert_eq!(ImageType::from_path(Utf8Path::new("pkg.spk")), Some(ImageType::Spk));
        assert_eq!(ImageType::from_path(Utf8Path::new("fw.bin")), None);
        assert_eq!(ImageType::from_path(Utf8Path::new("cwe")), None);
    }

    #[test]
    fn verify_accepts_good_images() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![
            write_image(&dir, "SWI9X15C_05.05.58.00.cwe", b"firmware"),
            write_image(&dir, "SWI9X15C_05.05.58.00_Generic_005.025_002.nvu", b"config"),
        ];
        assert!(Workflows.verify(&images).is_ok());
    }

    #[test]
    fn verify_rejects_empty_image() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![write_image(&dir, "empty.cwe", b"")];
        let err = Workflows.verify(&images).unwrap_err();
        assert!(matches!(err, OperationError::InvalidImage { ref reason, .. } if reason == "empty file"));
    }

    #[test]
    fn verify_rejects_missing_and_unknown_images() {
        let dir = tempfile::tempdir().unwrap();
        let unknown = vec![write_image(&dir, "firmware.bin", b"data")];
        assert!(Workflows.verify(&unknown).is_err());

        let missing = vec![Utf8PathBuf::from_path_buf(dir.path().join("missing.cwe")).unwrap()];
        assert!(Workflows.verify(&missing).is_err());
    }

    #[test]
    fn update_fails_before_protocol_when_device_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![write_image(&dir, "fw.cwe", b"firmware")];
        let device = Utf8PathBuf::from_path_buf(dir.path().join("cdc-wdm9")).unwrap();
        let err = Workflows
            .update(&images, device, &UpdateParams::default())
            .unwrap_err();
        assert!(matches!(err, OperationError::Open { .. }));
    }

    #[test]
    fn update_qdl_fails_before_protocol_when_serial_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![write_image(&dir, "fw.cwe", b"firmware")];
        let serial = Utf8PathBuf::from_path_buf(dir.path().join("ttyUSB9")).unwrap();
        let err = Workflows.update_qdl(&images, serial.clone()).unwrap_err();
        assert!(matches!(err, OperationError::Serial { ref path, .. } if *path == serial));
    }

    #[test]
    fn update_stops_at_protocol_after_preflight() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![write_image(&dir, "fw.cwe", b"firmware")];
        let device = write_image(&dir, "cdc-wdm0", b"");
        let err = Workflows
            .update(&images, device, &UpdateParams::default())
            .unwrap_err();
        assert!(matches!(err, OperationError::ProtocolUnavailable("QMI")));
    }
}
