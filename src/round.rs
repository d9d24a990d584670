//! Demonstration buzzer round

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use buzz_controller::BuzzController;
use buzz_core::{ButtonKind, Channel, HandsetIndex, Result};
use log::{info, warn};

use crate::config::Config;

/// Timing and buttons of a round
#[derive(Debug, Clone, Copy)]
pub struct RoundSettings {
    pub buzz_button: ButtonKind,
    pub correct_button: ButtonKind,
    pub press_timeout: Duration,
    pub answer_window: Duration,
}

impl From<&Config> for RoundSettings {
    fn from(config: &Config) -> Self {
        Self {
            buzz_button: config.round.buzz_button,
            correct_button: config.round.correct_button,
            press_timeout: config.timing.press_timeout,
            answer_window: config.timing.answer_window,
        }
    }
}

/// How a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A handset gave the correct answer
    Correct(HandsetIndex),
    /// Every handset answered wrong
    NoPlayersLeft,
    /// Shutdown was requested
    Interrupted,
}

/// What the buzzing handset did within its answer window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    Correct,
    Wrong(ButtonKind),
    NoAnswer,
}

/// Blink the remaining handsets, let the first to buzz answer, and repeat
/// until someone answers correctly. A wrong answer removes that handset;
/// no answer lets everyone buzz again.
pub fn run<C: Channel + 'static>(
    controller: &mut BuzzController<C>,
    settings: &RoundSettings,
    running: &AtomicBool,
) -> Result<Outcome> {
    let mut available = HandsetIndex::ALL.to_vec();

    loop {
        if !running.load(Ordering::Relaxed) {
            return Ok(Outcome::Interrupted);
        }
        if available.is_empty() {
            return Ok(Outcome::NoPlayersLeft);
        }

        controller.clear_button_states();
        controller.blink(&available)?;
        let buzzed =
            controller.wait_for_first_press(settings.buzz_button, &available, settings.press_timeout);
        controller.stop_blink()?;

        let Some(handset) = buzzed else {
            continue;
        };
        println!("handset {handset} buzzed");

        controller.set_light(handset, true)?;
        let answer = wait_for_answer(controller, handset, settings, running);
        controller.set_light(handset, false)?;

        match answer {
            Answer::Correct => {
                println!("handset {handset} was correct");
                return Ok(Outcome::Correct(handset));
            },
            Answer::Wrong(button) => {
                println!("sorry, {button} is incorrect");
                available.retain(|h| *h != handset);
            },
            Answer::NoAnswer => info!("handset {handset} did not answer"),
        }
    }
}

/// Run a round, then switch every light off. A failed round keeps its own
/// error, and a failed switch-off is only logged in that case.
pub fn play<C: Channel + 'static>(
    controller: &mut BuzzController<C>,
    settings: &RoundSettings,
    running: &AtomicBool,
) -> Result<Outcome> {
    let outcome = run(controller, settings, running);
    settle(outcome, controller.set_all_lights(false))
}

fn settle(outcome: Result<Outcome>, cleared: Result<()>) -> Result<Outcome> {
    match (outcome, cleared) {
        (Err(e), Err(cleanup)) => {
            warn!("could not switch lights off: {cleanup}");
            Err(e)
        },
        (outcome, cleared) => cleared.and(outcome),
    }
}

/// Poll the handset until it presses an answer button or the window closes.
/// Holding the buzz button does not count as an answer.
fn wait_for_answer<C: Channel + 'static>(
    controller: &mut BuzzController<C>,
    handset: HandsetIndex,
    settings: &RoundSettings,
    running: &AtomicBool,
) -> Answer {
    let start = Instant::now();
    while running.load(Ordering::Relaxed) {
        let state = controller.get_button_status();
        let answer = state[handset]
            .pressed()
            .find(|b| *b != settings.buzz_button);
        match answer {
            Some(button) if button == settings.correct_button => return Answer::Correct,
            Some(button) => return Answer::Wrong(button),
            None => {},
        }
        if start.elapsed() >= settings.answer_window {
            break;
        }
        thread::sleep(controller.poll_interval());
    }
    Answer::NoAnswer
}

#[cfg(test)]
mod tests {
    use buzz_controller::abi::button_report;
    use buzz_core::ButtonKind::*;
    use buzz_core::{BuzzError, MemoryChannel};

    use super::*;

    fn h(i: u8) -> HandsetIndex {
        HandsetIndex::new(i).unwrap()
    }

    fn settings() -> RoundSettings {
        RoundSettings {
            buzz_button: Red,
            correct_button: Blue,
            press_timeout: Duration::from_millis(20),
            answer_window: Duration::from_millis(50),
        }
    }

    fn controller() -> (MemoryChannel, BuzzController<MemoryChannel>) {
        let channel = MemoryChannel::new();
        let mut controller = BuzzController::new(channel.clone()).unwrap();
        controller.set_poll_interval(Duration::from_millis(1));
        controller.set_blink_interval(Duration::from_millis(5));
        (channel, controller)
    }

    #[test]
    fn correct_answer_ends_round() {
        let (channel, mut controller) = controller();
        channel.push_read(button_report(&[(h(2), Red)]));
        channel.push_read(button_report(&[(h(2), Blue)]));

        let outcome = run(&mut controller, &settings(), &AtomicBool::new(true)).unwrap();
        assert_eq!(outcome, Outcome::Correct(h(2)));
        assert!(!controller.is_blinking());
        assert_eq!(controller.light_state(), buzz_core::LightState::all_off());
        assert!(channel
            .writes()
            .contains(&[0, 0, 0, 0, 0xFF, 0, 0, 0]));
    }

    #[test]
    fn held_buzz_button_is_not_an_answer() {
        let (channel, mut controller) = controller();
        channel.push_read(button_report(&[(h(0), Red)]));
        channel.push_read(button_report(&[(h(0), Red), (h(0), Blue)]));

        let outcome = run(&mut controller, &settings(), &AtomicBool::new(true)).unwrap();
        assert_eq!(outcome, Outcome::Correct(h(0)));
    }

    #[test]
    fn wrong_answers_remove_handsets() {
        let (channel, mut controller) = controller();
        for handset in HandsetIndex::ALL {
            channel.push_read(button_report(&[(handset, Red)]));
            channel.push_read(button_report(&[(handset, Green)]));
        }

        let outcome = run(&mut controller, &settings(), &AtomicBool::new(true)).unwrap();
        assert_eq!(outcome, Outcome::NoPlayersLeft);
    }

    #[test]
    fn removed_handset_cannot_buzz_again() {
        let (channel, mut controller) = controller();
        channel.push_read(button_report(&[(h(1), Red)]));
        channel.push_read(button_report(&[(h(1), Yellow)]));
        channel.push_read(button_report(&[(h(1), Red), (h(3), Red)]));
        channel.push_read(button_report(&[(h(3), Blue)]));

        let outcome = run(&mut controller, &settings(), &AtomicBool::new(true)).unwrap();
        assert_eq!(outcome, Outcome::Correct(h(3)));
    }

    #[test]
    fn stopped_round_is_interrupted() {
        let (_channel, mut controller) = controller();
        let outcome = run(&mut controller, &settings(), &AtomicBool::new(false)).unwrap();
        assert_eq!(outcome, Outcome::Interrupted);
    }

    #[test]
    fn unplugged_controller_fails_round() {
        let (channel, mut controller) = controller();
        channel.fail_writes(true);
        channel.push_read(button_report(&[(h(0), Red)]));
        assert!(run(&mut controller, &settings(), &AtomicBool::new(true)).is_err());
    }

    #[test]
    fn play_switches_lights_off() {
        let (channel, mut controller) = controller();
        channel.push_read(button_report(&[(h(1), Red)]));
        channel.push_read(button_report(&[(h(1), Blue)]));
        controller.set_light(h(3), true).unwrap();

        let outcome = play(&mut controller, &settings(), &AtomicBool::new(true)).unwrap();
        assert_eq!(outcome, Outcome::Correct(h(1)));
        assert_eq!(channel.last_write(), Some([0u8; 8]));
    }

    #[test]
    fn failed_round_is_reported() {
        let (channel, mut controller) = controller();
        channel.fail_writes(true);
        channel.push_read(button_report(&[(h(0), Red)]));
        assert!(matches!(
            play(&mut controller, &settings(), &AtomicBool::new(true)),
            Err(BuzzError::WriteFailed(_))
        ));
    }

    #[test]
    fn round_error_wins_over_cleanup_error() {
        let round = Err(BuzzError::WriteFailed("blink".into()));
        assert!(matches!(
            settle(round, Err(BuzzError::DeviceClosed)),
            Err(BuzzError::WriteFailed(_))
        ));
        assert!(matches!(
            settle(Ok(Outcome::NoPlayersLeft), Err(BuzzError::DeviceClosed)),
            Err(BuzzError::DeviceClosed)
        ));
        assert_eq!(
            settle(Ok(Outcome::Correct(h(2))), Ok(())).unwrap(),
            Outcome::Correct(h(2))
        );
    }
}
