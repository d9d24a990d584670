//! Background light blinking

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use buzz_core::{BuzzError, Channel, HandsetIndex, LightState, Result};
use log::{debug, error};
use parking_lot::{Condvar, Mutex};

/// Cooperative stop signal shared with the blink thread
#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    cvar: Condvar,
}

impl StopSignal {
    fn stop(&self) {
        *self.stopped.lock() = true;
        self.cvar.notify_all();
    }

    fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }

    /// Sleep until the phase ends or a stop is requested. Returns true if stopped.
    fn wait(&self, phase: Duration) -> bool {
        let mut stopped = self.stopped.lock();
        if !*stopped {
            self.cvar.wait_while_for(&mut stopped, |stopped| !*stopped, phase);
        }
        *stopped
    }
}

/// A running blink session. Owns the light bytes of its handsets until
/// [`BlinkSession::stop`] returns.
pub(crate) struct BlinkSession {
    handsets: Vec<HandsetIndex>,
    signal: Arc<StopSignal>,
    handle: JoinHandle<Result<()>>,
}

impl BlinkSession {
    /// Spawn the blink thread
    pub(crate) fn start<C: Channel + 'static>(
        channel: Arc<Mutex<C>>,
        lights: Arc<Mutex<LightState>>,
        handsets: Vec<HandsetIndex>,
        interval: Duration,
    ) -> Result<Self> {
        let signal = Arc::new(StopSignal::default());
        let handle = thread::Builder::new().name("buzz-blink".into()).spawn({
            let signal = signal.clone();
            let handsets = handsets.clone();
            move || run(&channel, &lights, &handsets, interval, &signal)
        })?;
        Ok(Self {
            handsets,
            signal,
            handle,
        })
    }

    /// Whether `handset` is one of the blinking handsets
    pub(crate) fn owns(&self, handset: HandsetIndex) -> bool {
        self.handsets.contains(&handset)
    }

    pub(crate) fn handsets(&self) -> &[HandsetIndex] {
        &self.handsets
    }

    /// Whether the thread already ended, after a stop or a failed write
    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal the thread and wait for it to restore the lights
    pub(crate) fn stop(self) -> Result<()> {
        self.signal.stop();
        self.handle.join().map_err(|_| BuzzError::BlinkPanicked)?
    }
}

/// Alternate the handsets between on and off until stopped, then write back the
/// stored light state. Lights of other handsets keep their stored value in both
/// phases.
fn run<C: Channel>(
    channel: &Mutex<C>,
    lights: &Mutex<LightState>,
    handsets: &[HandsetIndex],
    interval: Duration,
    signal: &StopSignal,
) -> Result<()> {
    debug!("blinking handsets {handsets:?}");
    let mut on = true;
    let result = loop {
        if signal.is_stopped() {
            break Ok(());
        }
        let phase = lights.lock().with(handsets, on);
        if let Err(e) = channel.lock().write(&phase.to_report()) {
            error!("blink aborted: {e}");
            break Err(e);
        }
        on = !on;
        if signal.wait(interval) {
            break Ok(());
        }
    };

    let restore = *lights.lock();
    let restored = channel.lock().write(&restore.to_report());
    debug!("blink stopped");
    result.and(restored)
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use buzz_core::MemoryChannel;

    use super::*;

    fn h(i: u8) -> HandsetIndex {
        HandsetIndex::new(i).unwrap()
    }

    fn start(
        channel: &MemoryChannel,
        lights: LightState,
        handsets: &[HandsetIndex],
        interval: Duration,
    ) -> BlinkSession {
        BlinkSession::start(
            Arc::new(Mutex::new(channel.clone())),
            Arc::new(Mutex::new(lights)),
            handsets.to_vec(),
            interval,
        )
        .unwrap()
    }

    #[test]
    fn alternates_then_restores() {
        let channel = MemoryChannel::new();
        let session = start(&channel, LightState::all_off(), &[h(0), h(1)], Duration::from_millis(5));
        thread::sleep(Duration::from_millis(40));
        session.stop().unwrap();

        let writes = channel.writes();
        assert!(writes.len() >= 3, "expected several phases, got {writes:?}");
        assert_eq!(writes[0], [0, 0, 0xFF, 0xFF, 0, 0, 0, 0]);
        assert_eq!(writes[1], [0; 8]);
        assert_eq!(writes.last(), Some(&[0; 8]));
    }

    #[test]
    fn stop_wakes_a_long_phase() {
        let channel = MemoryChannel::new();
        let session = start(&channel, LightState::all_off(), &[h(2)], Duration::from_secs(30));
        thread::sleep(Duration::from_millis(20));

        let started = Instant::now();
        session.stop().unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(channel.last_write(), Some([0; 8]));
    }

    #[test]
    fn other_handsets_keep_their_light() {
        let channel = MemoryChannel::new();
        let lights = LightState::all_off().with(&[h(3)], true);
        let session = start(&channel, lights, &[h(0)], Duration::from_millis(5));
        thread::sleep(Duration::from_millis(20));
        session.stop().unwrap();

        let writes = channel.writes();
        assert!(writes.iter().all(|w| w[5] == 0xFF));
        assert_eq!(writes[0][2], 0xFF);
        assert_eq!(writes.last(), Some(&lights.to_report()));
    }

    #[test]
    fn write_failure_ends_the_session_with_an_error() {
        let channel = MemoryChannel::new();
        channel.fail_writes(true);
        let session = start(&channel, LightState::all_off(), &[h(0)], Duration::from_millis(5));
        assert!(session.owns(h(0)));
        assert!(!session.owns(h(1)));
        let deadline = Instant::now() + Duration::from_secs(5);
        while !session.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(session.is_finished());
        assert!(matches!(session.stop(), Err(BuzzError::WriteFailed(_))));
    }
}
