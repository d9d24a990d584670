use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use bpaf::Bpaf;
use buzz_controller::BuzzController;
use buzz_core::{Channel, HandsetIndex, Result};

/// Light state argument
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Switch(pub bool);

impl FromStr for Switch {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "on" | "1" | "true" => Ok(Self(true)),
            "off" | "0" | "false" => Ok(Self(false)),
            _ => Err(format!("invalid light state: {s}. Expected on or off")),
        }
    }
}

/// Handset selection:
#[derive(Clone, Debug, PartialEq, Eq, Bpaf)]
pub enum LightTarget {
    /// Every handset
    All,
    Handset(
        /// Single handset, 0-3
        #[bpaf(short('H'), long("handset"), argument("HANDSET"))]
        HandsetIndex,
    ),
}

#[derive(Clone, Debug, Bpaf)]
pub struct LightArgs {
    #[bpaf(external(light_target))]
    pub target: LightTarget,
    /// on or off
    #[bpaf(positional("STATE"))]
    pub state: Switch,
}

pub fn apply_light<C: Channel + 'static>(
    controller: &mut BuzzController<C>,
    args: &LightArgs,
) -> Result<()> {
    let Switch(on) = args.state;
    let label = if on { "on" } else { "off" };
    match args.target {
        LightTarget::All => {
            controller.set_all_lights(on)?;
            println!("switched all lights {label}");
        },
        LightTarget::Handset(handset) => {
            controller.set_light(handset, on)?;
            println!("switched handset {handset} {label}");
        },
    }
    Ok(())
}

/// Blink handsets for `duration`, or until `running` is cleared. Blinks every
/// handset when none are given.
pub fn apply_blink<C: Channel + 'static>(
    controller: &mut BuzzController<C>,
    handsets: &[HandsetIndex],
    duration: Duration,
    running: &AtomicBool,
) -> Result<()> {
    let handsets = if handsets.is_empty() {
        &HandsetIndex::ALL[..]
    } else {
        handsets
    };
    controller.blink(handsets)?;
    let start = Instant::now();
    while running.load(Ordering::Relaxed) && start.elapsed() < duration {
        thread::sleep(controller.poll_interval());
    }
    controller.stop_blink()
}
