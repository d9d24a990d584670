//! Report layouts for the buzz controller.
//!
//! Input reports are 5 bytes. Bytes 2..=4 carry twenty button flags, packed
//! handset by handset in red, yellow, green, orange, blue order starting at
//! bit 0 of byte 2:
//!
//! | Handset | Red    | Yellow | Green  | Orange | Blue   |
//! |---------|--------|--------|--------|--------|--------|
//! | 0       | b2.0   | b2.1   | b2.2   | b2.3   | b2.4   |
//! | 1       | b2.5   | b2.6   | b2.7   | b3.0   | b3.1   |
//! | 2       | b3.2   | b3.3   | b3.4   | b3.5   | b3.6   |
//! | 3       | b3.7   | b4.0   | b4.1   | b4.2   | b4.3   |
//!
//! Output reports are 8 bytes, see [`LightState`].

use buzz_core::{ButtonKind, ControllerState, HandsetIndex, LightState};
pub use buzz_core::{INPUT_REPORT_LEN, OUTPUT_REPORT_LEN};

/// First byte holding button flags
const BUTTONS_OFFSET: usize = 2;

/// Byte and bit holding a button flag
#[inline(always)]
const fn flag_position(handset: HandsetIndex, button: ButtonKind) -> (usize, u8) {
    let flag = handset.as_usize() * ButtonKind::COUNT + button as usize;
    (BUTTONS_OFFSET + flag / 8, (flag % 8) as u8)
}

/// Decode an input report.
///
/// Returns `None` for reports too short to carry all button flags.
pub fn decode(report: &[u8]) -> Option<ControllerState> {
    let report: &[u8; INPUT_REPORT_LEN] = report.get(..INPUT_REPORT_LEN)?.try_into().ok()?;
    let mut state = ControllerState::default();
    for handset in HandsetIndex::ALL {
        for button in ButtonKind::ALL {
            let (byte, bit) = flag_position(handset, button);
            state[handset].set(button, report[byte] & (1 << bit) != 0);
        }
    }
    Some(state)
}

/// Encode button state as an input report, as the controller would send it
pub fn encode_buttons(state: &ControllerState) -> [u8; INPUT_REPORT_LEN] {
    let mut report = [0u8; INPUT_REPORT_LEN];
    for (handset, buttons) in state.iter() {
        for button in buttons.pressed() {
            let (byte, bit) = flag_position(handset, button);
            report[byte] |= 1 << bit;
        }
    }
    report
}

/// Input report with exactly the given buttons held down
pub fn button_report(pressed: &[(HandsetIndex, ButtonKind)]) -> [u8; INPUT_REPORT_LEN] {
    let mut state = ControllerState::default();
    for (handset, button) in pressed {
        state[*handset].set(*button, true);
    }
    encode_buttons(&state)
}

/// Construct an output report for the given lights
#[inline(always)]
pub const fn light_report(lights: &LightState) -> [u8; OUTPUT_REPORT_LEN] {
    lights.to_report()
}
