//! hidapi transport for the buzz controller

use std::ffi::CString;
use std::sync::LazyLock;
use std::time::Duration;

use buzz_core::{BuzzError, Channel, DeviceInfo, Result, OUTPUT_REPORT_LEN};
use hidapi::{HidApi, HidDevice};
use log::{debug, info, warn};
use parking_lot::RwLock;

use crate::consts;

/// Lazy handle to hidapi. `None` when the library failed to initialize, which
/// leaves no controller reachable.
static API: LazyLock<Option<RwLock<HidApi>>> = LazyLock::new(|| match HidApi::new() {
    Ok(api) => Some(RwLock::new(api)),
    Err(e) => {
        warn!("failed to init hidapi: {e}");
        None
    },
});

fn api() -> Result<&'static RwLock<HidApi>> {
    API.as_ref().ok_or(BuzzError::DeviceNotFound)
}

/// Check if a vendor and product id pair belongs to a buzz controller
fn is_buzz((vendor_id, product_id): (u16, u16)) -> bool {
    vendor_id == consts::BUZZ_VENDOR_ID && product_id == consts::BUZZ_PRODUCT_ID
}

fn matches(device: &hidapi::DeviceInfo) -> bool {
    is_buzz((device.vendor_id(), device.product_id()))
}

/// First buzz controller in `devices`, identified through `ids`
fn find_controller<T>(
    devices: impl IntoIterator<Item = T>,
    ids: impl Fn(&T) -> (u16, u16),
) -> Result<T> {
    devices
        .into_iter()
        .find(|d| is_buzz(ids(d)))
        .ok_or(BuzzError::DeviceNotFound)
}

fn describe(device: &hidapi::DeviceInfo) -> DeviceInfo {
    DeviceInfo {
        path: device.path().to_string_lossy().into_owned(),
        manufacturer: device.manufacturer_string().map(str::to_owned),
        product: device.product_string().map(str::to_owned),
        serial: device.serial_number().map(str::to_owned),
    }
}

/// List attached buzz controllers without opening them
pub fn enumerate() -> Result<Vec<DeviceInfo>> {
    let api = api()?;
    api.write().refresh_devices()?;
    let api = api.read();
    Ok(api.device_list().filter(|d| matches(d)).map(describe).collect())
}

/// Non-blocking HID handle to a buzz controller
pub struct HidChannel {
    device: Option<HidDevice>,
}

impl HidChannel {
    /// Find and claim the first attached controller
    pub fn open() -> Result<Self> {
        let api = api()?;
        if let Err(e) = api.write().refresh_devices() {
            warn!("failed to refresh hid devices: {e}");
        }
        let api = api.read();
        let device = find_controller(api.device_list(), |d| (d.vendor_id(), d.product_id()))?
            .open_device(&api)
            .map_err(|e| {
                warn!("found buzz controller but could not claim it: {e}");
                BuzzError::DeviceNotFound
            })?;
        Self::claim(device)
    }

    /// Claim the controller at a specific HID path
    pub fn open_path(path: &str) -> Result<Self> {
        let cpath = CString::new(path).map_err(|_| BuzzError::DeviceNotFound)?;
        let api = api()?;
        let device = api.read().open_path(&cpath).map_err(|e| {
            warn!("could not open buzz controller at {path}: {e}");
            BuzzError::DeviceNotFound
        })?;
        Self::claim(device)
    }

    fn claim(device: HidDevice) -> Result<Self> {
        device.set_blocking_mode(false)?;
        info!("opened buzz controller");
        Ok(Self {
            device: Some(device),
        })
    }
}

impl Channel for HidChannel {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let Some(device) = &self.device else {
            return Ok(0);
        };
        let len = if timeout.is_zero() {
            device.read(buf)?
        } else {
            let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
            device.read_timeout(buf, millis)?
        };
        Ok(len)
    }

    fn write(&mut self, report: &[u8; OUTPUT_REPORT_LEN]) -> Result<()> {
        let device = self.device.as_ref().ok_or(BuzzError::DeviceClosed)?;
        device
            .write(report)
            .map_err(|e| BuzzError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    fn close(&mut self) {
        if self.device.take().is_some() {
            debug!("closed buzz controller");
        }
    }

    fn info(&self) -> Result<DeviceInfo> {
        let device = self.device.as_ref().ok_or(BuzzError::DeviceClosed)?;
        let details = device.get_device_info()?;
        Ok(DeviceInfo {
            manufacturer: device.get_manufacturer_string()?,
            product: device.get_product_string()?,
            ..describe(&details)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OTHER: (u16, u16) = (0x046D, 0xC52B);
    const BUZZ: (u16, u16) = (consts::BUZZ_VENDOR_ID, consts::BUZZ_PRODUCT_ID);

    #[test]
    fn no_devices_is_not_found() {
        let devices: Vec<(u16, u16)> = Vec::new();
        assert!(matches!(
            find_controller(devices, |d| *d),
            Err(BuzzError::DeviceNotFound)
        ));
    }

    #[test]
    fn other_devices_are_skipped() {
        assert!(matches!(
            find_controller([OTHER, (consts::BUZZ_VENDOR_ID, 0x0268)], |d| *d),
            Err(BuzzError::DeviceNotFound)
        ));
        let found = find_controller([(OTHER, "mouse"), (BUZZ, "buzz"), (BUZZ, "second")], |d| d.0);
        assert_eq!(found.unwrap().1, "buzz");
    }

    #[test]
    fn open_without_controller_is_not_found() {
        if enumerate().is_ok_and(|found| !found.is_empty()) {
            return;
        }
        assert!(matches!(HidChannel::open(), Err(BuzzError::DeviceNotFound)));
    }
}
