//! Core traits and types for buzz controller abstraction.
//!
//! This crate provides:
//! - State types (`HandsetIndex`, `ButtonKind`, `ControllerState`, `LightState`)
//! - The `Channel` trait, a duplex pipe of fixed-size reports
//! - `MemoryChannel`, an in-memory `Channel` for driving controllers without hardware

mod channel;
mod memory;
mod state;

pub use channel::{BuzzError, Channel, DeviceInfo, Result, INPUT_REPORT_LEN, OUTPUT_REPORT_LEN};
pub use memory::MemoryChannel;
pub use state::{ButtonKind, ButtonState, ControllerState, HandsetIndex, LightState};
