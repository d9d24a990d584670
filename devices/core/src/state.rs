//! Button and light state shared between the protocol engine and applications.

use std::fmt::{self, Display};
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::BuzzError;

/// One of the four handsets attached to a controller, always in `0..=3`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandsetIndex(u8);

impl HandsetIndex {
    pub const COUNT: usize = 4;

    /// All handsets in ascending order
    pub const ALL: [HandsetIndex; Self::COUNT] =
        [HandsetIndex(0), HandsetIndex(1), HandsetIndex(2), HandsetIndex(3)];

    /// Validate a raw index
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < Self::COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    #[inline(always)]
    pub const fn get(self) -> u8 {
        self.0
    }

    #[inline(always)]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u8> for HandsetIndex {
    type Error = BuzzError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::new(index).ok_or(BuzzError::InvalidHandset(index))
    }
}

impl FromStr for HandsetIndex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let index: u8 = s
            .trim()
            .parse()
            .map_err(|_| format!("invalid handset: {s}. Expected 0-3"))?;
        Self::new(index).ok_or_else(|| format!("invalid handset: {s}. Expected 0-3"))
    }
}

impl Display for HandsetIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Buttons on a handset, in the order used to pick the first pressed one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ButtonKind {
    Red = 0,
    Yellow = 1,
    Green = 2,
    Orange = 3,
    Blue = 4,
}

impl ButtonKind {
    pub const COUNT: usize = 5;

    pub const ALL: [ButtonKind; Self::COUNT] = [
        ButtonKind::Red,
        ButtonKind::Yellow,
        ButtonKind::Green,
        ButtonKind::Orange,
        ButtonKind::Blue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ButtonKind::Red => "red",
            ButtonKind::Yellow => "yellow",
            ButtonKind::Green => "green",
            ButtonKind::Orange => "orange",
            ButtonKind::Blue => "blue",
        }
    }
}

impl FromStr for ButtonKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "red" => Ok(Self::Red),
            "yellow" => Ok(Self::Yellow),
            "green" => Ok(Self::Green),
            "orange" => Ok(Self::Orange),
            "blue" => Ok(Self::Blue),
            _ => Err(format!(
                "unknown button: {s}. Available: red, yellow, green, orange, blue"
            )),
        }
    }
}

impl Display for ButtonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pressed flags of the five buttons on one handset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonState([bool; ButtonKind::COUNT]);

impl ButtonState {
    #[inline(always)]
    pub fn is_pressed(&self, button: ButtonKind) -> bool {
        self.0[button as usize]
    }

    #[inline(always)]
    pub fn set(&mut self, button: ButtonKind, pressed: bool) {
        self.0[button as usize] = pressed;
    }

    /// First pressed button in red, yellow, green, orange, blue order
    pub fn first_pressed(&self) -> Option<ButtonKind> {
        ButtonKind::ALL.into_iter().find(|b| self.is_pressed(*b))
    }

    pub fn any_pressed(&self) -> bool {
        self.0.iter().any(|p| *p)
    }

    /// Iterate over every pressed button
    pub fn pressed(&self) -> impl Iterator<Item = ButtonKind> + '_ {
        ButtonKind::ALL.into_iter().filter(move |b| self.is_pressed(*b))
    }
}

impl Index<ButtonKind> for ButtonState {
    type Output = bool;

    fn index(&self, button: ButtonKind) -> &bool {
        &self.0[button as usize]
    }
}

/// Button state of all four handsets, whether or not they are connected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerState([ButtonState; HandsetIndex::COUNT]);

impl ControllerState {
    #[inline(always)]
    pub fn handset(&self, handset: HandsetIndex) -> &ButtonState {
        &self.0[handset.as_usize()]
    }

    /// Iterate over each handset and its buttons
    pub fn iter(&self) -> impl Iterator<Item = (HandsetIndex, &ButtonState)> + '_ {
        HandsetIndex::ALL.into_iter().zip(self.0.iter())
    }
}

impl Index<HandsetIndex> for ControllerState {
    type Output = ButtonState;

    fn index(&self, handset: HandsetIndex) -> &ButtonState {
        &self.0[handset.as_usize()]
    }
}

impl IndexMut<HandsetIndex> for ControllerState {
    fn index_mut(&mut self, handset: HandsetIndex) -> &mut ButtonState {
        &mut self.0[handset.as_usize()]
    }
}

/// Light bytes sent to the controller. The device has no partial update, so
/// this is always written out in full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightState([u8; crate::OUTPUT_REPORT_LEN]);

impl LightState {
    pub const ON: u8 = 0xFF;
    pub const OFF: u8 = 0x00;

    /// Byte offset of the first handset light
    const OFFSET: usize = 2;

    pub const fn all_off() -> Self {
        Self([0u8; crate::OUTPUT_REPORT_LEN])
    }

    pub fn all_on() -> Self {
        let mut state = Self::all_off();
        for handset in HandsetIndex::ALL {
            state.set(handset, true);
        }
        state
    }

    #[inline(always)]
    pub fn set(&mut self, handset: HandsetIndex, on: bool) {
        self.0[Self::OFFSET + handset.as_usize()] = if on { Self::ON } else { Self::OFF };
    }

    #[inline(always)]
    pub fn is_on(&self, handset: HandsetIndex) -> bool {
        self.0[Self::OFFSET + handset.as_usize()] != Self::OFF
    }

    /// Copy of this state with `handsets` switched on or off
    pub fn with(mut self, handsets: &[HandsetIndex], on: bool) -> Self {
        for handset in handsets {
            self.set(*handset, on);
        }
        self
    }

    /// Raw output report
    #[inline(always)]
    pub const fn to_report(&self) -> [u8; crate::OUTPUT_REPORT_LEN] {
        self.0
    }
}
