//! Report transport trait and the errors shared by every controller.

use std::time::Duration;

use crate::HandsetIndex;

/// Size of an input report: one header byte, one unused byte, three bytes of button flags
pub const INPUT_REPORT_LEN: usize = 5;

/// Size of an output report: report id, one unused byte, four light bytes, two trailer bytes
pub const OUTPUT_REPORT_LEN: usize = 8;

/// Errors that can occur during controller operations
#[derive(Debug, thiserror::Error)]
pub enum BuzzError {
    /// Controller was not found, or could not be claimed
    #[error("buzz controller not detected, connect it before starting")]
    DeviceNotFound,

    /// The device rejected a report, usually because it was unplugged
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// The channel was already closed
    #[error("device channel is closed")]
    DeviceClosed,

    /// Handset index outside of 0..=3
    #[error("invalid handset {0}, expected 0-3")]
    InvalidHandset(u8),

    /// The handset light is owned by a running blink session
    #[error("handset {0} is blinking")]
    HandsetBusy(HandsetIndex),

    /// The blink thread panicked before restoring the lights
    #[error("blink thread panicked")]
    BlinkPanicked,

    /// HID communication error
    #[error("hid error: {0}")]
    Hid(#[from] hidapi::HidError),

    /// Generic IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BuzzError>;

/// Identification strings of an attached controller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Platform specific device path, usable to open this exact device
    pub path: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial: Option<String>,
}

/// Duplex channel of fixed-size reports to a single physical controller.
///
/// Implementations are driven from more than one thread (the poll loop and the
/// blink loop), always behind a mutex held for exactly one call.
pub trait Channel: Send {
    /// Read the next pending input report into `buf`.
    ///
    /// Returns the number of bytes read; `0` means nothing was pending. A zero
    /// `timeout` never blocks.
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Send a full output report.
    fn write(&mut self, report: &[u8; OUTPUT_REPORT_LEN]) -> Result<()>;

    /// Release the underlying handle. Calling this more than once is a no-op.
    fn close(&mut self);

    /// Manufacturer and product strings of the open device
    fn info(&self) -> Result<DeviceInfo>;
}
