//! High level hidapi abstraction for four-handset buzz quiz controllers
//!
//! [`BuzzController`] decodes button reports, drives the handset lights, and
//! runs a background blink loop that can be active while buttons are polled.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use blink::BlinkSession;
use buzz_core::{
    ButtonKind, BuzzError, Channel, ControllerState, DeviceInfo, HandsetIndex, LightState, Result,
    INPUT_REPORT_LEN,
};
use log::{debug, info, warn};
use parking_lot::Mutex;

pub mod abi;
mod blink;
pub mod channel;

pub use channel::{enumerate, HidChannel};

pub mod consts {
    use std::time::Duration;

    pub const BUZZ_VENDOR_ID: u16 = 0x054C;
    pub const BUZZ_PRODUCT_ID: u16 = 0x0002;

    /// Delay between polls while waiting for a press
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);
    /// Length of each on and off phase of a blink
    pub const DEFAULT_BLINK_INTERVAL: Duration = Duration::from_millis(500);
}

/// Protocol engine for a buzz controller.
///
/// The channel is shared with the blink thread, and every individual read or
/// write holds its lock, so reports never interleave.
pub struct BuzzController<C: Channel + 'static = HidChannel> {
    channel: Arc<Mutex<C>>,
    lights: Arc<Mutex<LightState>>,
    buttons: ControllerState,
    buf: [u8; INPUT_REPORT_LEN],
    poll_interval: Duration,
    blink_interval: Duration,
    blink: Option<BlinkSession>,
    read_failing: bool,
}

impl BuzzController<HidChannel> {
    /// Find and open the controller, switching every light off
    pub fn open() -> Result<Self> {
        Self::new(HidChannel::open()?)
    }

    /// Open the controller at a specific HID path
    pub fn open_path(path: &str) -> Result<Self> {
        Self::new(HidChannel::open_path(path)?)
    }
}

impl<C: Channel + 'static> BuzzController<C> {
    /// Take over an opened channel. Writes an all-off light report so the
    /// device matches the tracked state.
    pub fn new(mut channel: C) -> Result<Self> {
        let lights = LightState::all_off();
        channel.write(&abi::light_report(&lights))?;
        Ok(Self {
            channel: Arc::new(Mutex::new(channel)),
            lights: Arc::new(Mutex::new(lights)),
            buttons: ControllerState::default(),
            buf: [0u8; INPUT_REPORT_LEN],
            poll_interval: consts::DEFAULT_POLL_INTERVAL,
            blink_interval: consts::DEFAULT_BLINK_INTERVAL,
            blink: None,
            read_failing: false,
        })
    }

    /// Set the delay between polls in [`Self::wait_for_first_press`]
    pub fn set_poll_interval(&mut self, interval: Duration) {
        self.poll_interval = interval;
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Set the phase length of blink sessions started after this call
    pub fn set_blink_interval(&mut self, interval: Duration) {
        self.blink_interval = interval;
    }

    pub fn blink_interval(&self) -> Duration {
        self.blink_interval
    }

    /// Manufacturer and product strings of the device
    pub fn info(&self) -> Result<DeviceInfo> {
        self.channel.lock().info()
    }

    /// Poll the device once.
    ///
    /// A pending report replaces the whole state. When nothing is pending, or the
    /// read fails, or the report is malformed, the previous state is returned.
    pub fn get_button_status(&mut self) -> ControllerState {
        let read = self.channel.lock().read(&mut self.buf, Duration::ZERO);
        if read.is_ok() {
            self.read_failing = false;
        }
        match read {
            Ok(0) => {},
            Ok(len) => match abi::decode(&self.buf[..len]) {
                Some(state) => {
                    debug!("report {:02x?}", &self.buf[..len]);
                    self.buttons = state;
                },
                None => warn!("ignoring malformed {len} byte report"),
            },
            Err(e) if self.read_failing => debug!("read still failing: {e}"),
            Err(e) => {
                warn!("read failed, keeping previous state: {e}");
                self.read_failing = true;
            },
        }
        self.buttons
    }

    /// Last decoded state, without polling
    pub fn button_state(&self) -> ControllerState {
        self.buttons
    }

    /// Poll once and return the first pressed button of `handset`, in red,
    /// yellow, green, orange, blue order
    pub fn get_button_pressed(&mut self, handset: HandsetIndex) -> Option<ButtonKind> {
        self.get_button_status()[handset].first_pressed()
    }

    /// Poll until one of `candidates` holds `button`, or `timeout` elapses.
    ///
    /// Candidates are checked in ascending handset order, so the lowest index
    /// wins when several are seen in the same report. The device is polled at
    /// least once even with a zero timeout.
    pub fn wait_for_first_press(
        &mut self,
        button: ButtonKind,
        candidates: &[HandsetIndex],
        timeout: Duration,
    ) -> Option<HandsetIndex> {
        let start = Instant::now();
        loop {
            let state = self.get_button_status();
            let first = HandsetIndex::ALL
                .into_iter()
                .filter(|h| candidates.contains(h))
                .find(|h| state[*h].is_pressed(button));
            if first.is_some() {
                return first;
            }
            if start.elapsed() >= timeout {
                return None;
            }
            thread::sleep(self.poll_interval);
        }
    }

    /// Switch one handset light and send the full light report. The tracked
    /// state only changes once the write went through.
    pub fn set_light(&mut self, handset: HandsetIndex, on: bool) -> Result<()> {
        self.reap_blink()?;
        if self.blink.as_ref().is_some_and(|b| b.owns(handset)) {
            return Err(BuzzError::HandsetBusy(handset));
        }
        let mut lights = self.lights.lock();
        let next = lights.with(&[handset], on);
        self.channel.lock().write(&abi::light_report(&next))?;
        *lights = next;
        Ok(())
    }

    /// Switch every light not owned by a blink session with a single write
    pub fn set_all_lights(&mut self, on: bool) -> Result<()> {
        self.reap_blink()?;
        let mut lights = self.lights.lock();
        let mut next = *lights;
        for handset in HandsetIndex::ALL {
            if !self.blink.as_ref().is_some_and(|b| b.owns(handset)) {
                next.set(handset, on);
            }
        }
        self.channel.lock().write(&abi::light_report(&next))?;
        *lights = next;
        Ok(())
    }

    /// Current light state, as restored once blinking stops
    pub fn light_state(&self) -> LightState {
        *self.lights.lock()
    }

    /// Start blinking `handsets` in the background.
    ///
    /// Returns `false` without doing anything when a session is already active
    /// or no handsets were given.
    pub fn blink(&mut self, handsets: &[HandsetIndex]) -> Result<bool> {
        self.reap_blink()?;
        if self.blink.is_some() || handsets.is_empty() {
            return Ok(false);
        }
        let mut owned = handsets.to_vec();
        owned.sort_unstable();
        owned.dedup();
        info!("blinking handsets {owned:?}");
        self.blink = Some(BlinkSession::start(
            self.channel.clone(),
            self.lights.clone(),
            owned,
            self.blink_interval,
        )?);
        Ok(true)
    }

    /// Whether a blink session is still running. A session that ended on a
    /// failed write is not.
    pub fn is_blinking(&self) -> bool {
        self.blink.as_ref().is_some_and(|b| !b.is_finished())
    }

    /// Handsets owned by the active blink session
    pub fn blinking_handsets(&self) -> &[HandsetIndex] {
        match &self.blink {
            Some(session) if !session.is_finished() => session.handsets(),
            _ => &[],
        }
    }

    /// Drop a session whose thread already ended, returning the error it ended
    /// with. The session's handsets are free again afterwards.
    fn reap_blink(&mut self) -> Result<()> {
        match self.blink.take_if(|b| b.is_finished()) {
            Some(session) => {
                debug!("blink thread ended on its own");
                session.stop()
            },
            None => Ok(()),
        }
    }

    /// Stop the active blink session and wait until its lights are restored.
    /// Reports a write failure the session ran into. No-op without a session.
    pub fn stop_blink(&mut self) -> Result<()> {
        match self.blink.take() {
            Some(session) => {
                info!("stopping blink");
                session.stop()
            },
            None => Ok(()),
        }
    }

    /// Forget decoded button state, so a button still reported as held from an
    /// earlier round does not count. Lights are untouched.
    pub fn clear_button_states(&mut self) {
        self.buttons = ControllerState::default();
    }

    /// Stop blinking and release the device. Calling this more than once is a
    /// no-op.
    pub fn close(&mut self) {
        if let Err(e) = self.stop_blink() {
            warn!("blink ended with an error: {e}");
        }
        self.channel.lock().close();
    }
}

impl<C: Channel + 'static> Drop for BuzzController<C> {
    fn drop(&mut self) {
        if let Err(e) = self.stop_blink() {
            warn!("blink ended with an error: {e}");
        }
        self.channel.lock().close();
    }
}
