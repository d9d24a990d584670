//! Controller detection and selection

use buzz_controller::BuzzController;
use buzz_core::{DeviceInfo, Result};

use crate::config::Config;

/// Open the configured controller, or the first one found, with configured timing
pub fn open_controller(config: &Config) -> Result<BuzzController> {
    let mut controller = match config.device.path() {
        Some(path) => BuzzController::open_path(path)?,
        None => BuzzController::open()?,
    };
    controller.set_poll_interval(config.timing.poll_interval);
    controller.set_blink_interval(config.timing.blink_interval);
    Ok(controller)
}

/// Human readable label for a controller
pub fn describe(info: &DeviceInfo) -> String {
    let manufacturer = info.manufacturer.as_deref().unwrap_or("unknown manufacturer");
    let product = info.product.as_deref().unwrap_or("unknown product");
    match info.serial.as_deref().filter(|s| !s.is_empty()) {
        Some(serial) => format!("{manufacturer} {product} (serial {serial})"),
        None => format!("{manufacturer} {product}"),
    }
}

/// Print every attached controller
pub fn apply_list() -> Result<()> {
    let devices = buzz_controller::enumerate()?;
    if devices.is_empty() {
        println!("no buzz controllers found");
    }
    for device in devices {
        println!("{}: {}", device.path, describe(&device));
    }
    Ok(())
}

/// Print manufacturer and product of the open controller
pub fn apply_info(controller: &BuzzController) -> Result<()> {
    let info = controller.info()?;
    println!(
        "Device manufacturer: {}",
        info.manufacturer.as_deref().unwrap_or("unknown")
    );
    println!("Product: {}", info.product.as_deref().unwrap_or("unknown"));
    println!("Path: {}", info.path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_includes_serial_when_present() {
        let mut info = DeviceInfo {
            path: "/dev/hidraw0".into(),
            manufacturer: Some("Logitech".into()),
            product: Some("Logitech Buzz(tm) Controller V1".into()),
            serial: None,
        };
        assert_eq!(describe(&info), "Logitech Logitech Buzz(tm) Controller V1");

        info.serial = Some(String::new());
        assert_eq!(describe(&info), "Logitech Logitech Buzz(tm) Controller V1");

        info.serial = Some("A1".into());
        assert_eq!(
            describe(&info),
            "Logitech Logitech Buzz(tm) Controller V1 (serial A1)"
        );
    }

    #[test]
    fn describe_fills_missing_strings() {
        assert_eq!(
            describe(&DeviceInfo::default()),
            "unknown manufacturer unknown product"
        );
    }
}
