use std::error::Error;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bpaf::{Bpaf, Parser};
use buzz_core::HandsetIndex;

use crate::config::Config;
use crate::detection::{apply_info, apply_list, open_controller};
use crate::lights::{apply_blink, apply_light, light_args, LightArgs};
use crate::monitor::apply_monitor;
use crate::round::{Outcome, RoundSettings};

mod config;
mod detection;
mod lights;
mod monitor;
mod round;

#[derive(Clone, Debug, Bpaf)]
struct BlinkArgs {
    /// How long to blink
    #[bpaf(
        short,
        long,
        argument("DURATION"),
        fallback(humantime::Duration::from(std::time::Duration::from_secs(5))),
        display_fallback
    )]
    duration: humantime::Duration,
    /// Handsets to blink, all when omitted
    #[bpaf(positional("HANDSET"), many)]
    handsets: Vec<HandsetIndex>,
}

#[derive(Clone, Debug, Bpaf)]
struct MonitorArgs {
    /// Stop after this long instead of waiting for ctrl-c
    #[bpaf(short, long, argument("DURATION"))]
    duration: Option<humantime::Duration>,
}

#[derive(Clone, Debug, Bpaf)]
#[bpaf(options, version, descr(env!("CARGO_PKG_DESCRIPTION")))]
struct Cli {
    /// Use this config file instead of the platform default
    #[bpaf(long, argument("PATH"))]
    config: Option<PathBuf>,
    #[bpaf(external(command))]
    command: Command,
}

#[derive(Clone, Debug)]
enum Command {
    /// List attached controllers
    List,
    /// Print details of the controller
    Info,
    /// Switch handset lights
    Light(LightArgs),
    /// Blink handset lights
    Blink(BlinkArgs),
    /// Print button presses
    Monitor(MonitorArgs),
    /// Run a demo buzzer round (default)
    Round,
}

fn command() -> impl Parser<Command> {
    let list = bpaf::pure(Command::List)
        .to_options()
        .descr("List attached buzz controllers")
        .command("list")
        .help("List attached buzz controllers");

    let info = bpaf::pure(Command::Info)
        .to_options()
        .descr("Print manufacturer and product of the controller")
        .command("info")
        .help("Print manufacturer and product of the controller");

    let light = light_args()
        .map(Command::Light)
        .to_options()
        .descr("Switch handset lights on or off")
        .command("light")
        .help("Switch handset lights on or off");

    let blink = blink_args()
        .map(Command::Blink)
        .to_options()
        .descr("Blink handset lights for a while")
        .command("blink")
        .help("Blink handset lights for a while");

    let monitor = monitor_args()
        .map(Command::Monitor)
        .to_options()
        .descr("Print button presses as they happen")
        .command("monitor")
        .help("Print button presses as they happen");

    let round = bpaf::pure(Command::Round)
        .to_options()
        .descr("Run a demo buzzer round")
        .command("round")
        .help("Run a demo buzzer round (default)");

    bpaf::construct!([list, info, light, blink, monitor, round]).fallback(Command::Round)
}

/// Flag cleared on ctrl-c, so loops can finish and restore the lights
fn shutdown_flag() -> Result<Arc<AtomicBool>, Box<dyn Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || {
        println!("exiting...");
        flag.store(false, Ordering::Relaxed);
    })?;
    Ok(running)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = cli().run();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load_or_create()?,
    };

    if let Command::List = cli.command {
        apply_list()?;
        return Ok(());
    }

    let mut controller = open_controller(&config)?;
    match cli.command {
        Command::List => {},
        Command::Info => apply_info(&controller)?,
        Command::Light(args) => apply_light(&mut controller, &args)?,
        Command::Blink(args) => {
            let running = shutdown_flag()?;
            apply_blink(&mut controller, &args.handsets, *args.duration, &running)?;
        },
        Command::Monitor(args) => {
            let running = shutdown_flag()?;
            apply_monitor(&mut controller, args.duration.map(|d| *d), &running);
        },
        Command::Round => {
            let running = shutdown_flag()?;
            println!("Buzz controller demo");
            println!(
                "press the {} button to buzz in, then answer with a colour. ctrl-c to exit",
                config.round.buzz_button
            );
            match round::play(&mut controller, &RoundSettings::from(&config), &running)? {
                Outcome::Correct(handset) => println!("handset {handset} wins"),
                Outcome::NoPlayersLeft => println!("nobody answered correctly"),
                Outcome::Interrupted => {},
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_is_the_default_command() {
        let empty: &[&str] = &[];
        let parsed = cli().run_inner(empty).unwrap();
        assert!(matches!(parsed.command, Command::Round));
        assert!(parsed.config.is_none());
    }

    #[test]
    fn parses_light_command() {
        let parsed = cli().run_inner(&["light", "--handset", "2", "on"]).unwrap();
        match parsed.command {
            Command::Light(args) => {
                assert_eq!(args.target, lights::LightTarget::Handset(HandsetIndex::new(2).unwrap()));
                assert_eq!(args.state, lights::Switch(true));
            },
            other => panic!("unexpected command {other:?}"),
        }

        let parsed = cli().run_inner(&["light", "--all", "off"]).unwrap();
        assert!(matches!(
            parsed.command,
            Command::Light(LightArgs {
                target: lights::LightTarget::All,
                state: lights::Switch(false),
            })
        ));
    }

    #[test]
    fn rejects_out_of_range_handset() {
        assert!(cli().run_inner(&["light", "--handset", "4", "on"]).is_err());
        assert!(cli().run_inner(&["blink", "0", "7"]).is_err());
    }

    #[test]
    fn parses_blink_handsets_and_duration() {
        let parsed = cli().run_inner(&["blink", "-d", "2s", "0", "3"]).unwrap();
        match parsed.command {
            Command::Blink(args) => {
                assert_eq!(*args.duration, std::time::Duration::from_secs(2));
                assert_eq!(
                    args.handsets,
                    vec![HandsetIndex::new(0).unwrap(), HandsetIndex::new(3).unwrap()]
                );
            },
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_monitor_duration() {
        let parsed = cli().run_inner(&["monitor", "--duration", "1m"]).unwrap();
        match parsed.command {
            Command::Monitor(args) => {
                assert_eq!(
                    args.duration.map(|d| *d),
                    Some(std::time::Duration::from_secs(60))
                );
            },
            other => panic!("unexpected command {other:?}"),
        }
    }
}
