//! Live button monitor

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use buzz_controller::BuzzController;
use buzz_core::{Channel, ControllerState};

/// One line per handset whose buttons changed between two states
pub fn describe_changes(previous: &ControllerState, current: &ControllerState) -> Vec<String> {
    current
        .iter()
        .filter(|(handset, buttons)| previous[*handset] != **buttons)
        .map(|(handset, buttons)| {
            let pressed: Vec<&str> = buttons.pressed().map(|b| b.as_str()).collect();
            if pressed.is_empty() {
                format!("handset {handset}: released")
            } else {
                format!("handset {handset}: {}", pressed.join(" + "))
            }
        })
        .collect()
}

/// Print button changes until `duration` elapses (forever when `None`) or
/// `running` is cleared
pub fn apply_monitor<C: Channel + 'static>(
    controller: &mut BuzzController<C>,
    duration: Option<Duration>,
    running: &AtomicBool,
) {
    println!("press buttons on the controller, ctrl-c to stop");
    let start = Instant::now();
    let mut previous = controller.button_state();
    while running.load(Ordering::Relaxed) && duration.map_or(true, |d| start.elapsed() < d) {
        let current = controller.get_button_status();
        for line in describe_changes(&previous, &current) {
            println!("{line}");
        }
        previous = current;
        thread::sleep(controller.poll_interval());
    }
}
