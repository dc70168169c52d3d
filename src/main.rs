mod args;
mod checksum;
mod colors;
mod config;
mod delegate;
mod fetch;
mod launcher;
mod probe;
#[cfg(test)]
mod test_server;
mod validate;
mod version;

use crate::args::Args;
use crate::colors::*;
use crate::config::*;
use crate::fetch::Fetcher;
use crate::launcher::{EXIT_NOK, Launcher};
use crate::probe::Probe;
use crate::version::Version;
use std::env;
use tracing::{level_filters::*, *};
use tracing_subscriber::EnvFilter;

/// Main entry point for the application.
fn main() {
    // enable ansi support to use colorised/styled output
    #[cfg(windows)]
    let _ = nu_ansi_term::enable_ansi_support();

    // delegate (everything owned by `internal_main` is dropped before exiting, including the temporary script)
    let code = match internal_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}", ATTENTION_COLOR.paint(format!("Failed! err = {err:#}")));
            EXIT_NOK
        }
    };
    std::process::exit(code);
}

// Internal main entry point for the application.
#[doc(hidden)]
fn internal_main() -> anyhow::Result<i32> {
    // parse arguments (all of them belong to the setup script)
    let args = Args::from_env();

    // init tracing
    let verbose = verbosity(env::var(VERBOSE_ENV).ok().as_deref());
    init_tracing(verbose);

    // print some information
    print_info();

    // print parsed arguments
    trace!("arguments: {args:#?}");

    // load config
    let config = Config::load()?;
    debug!(?config);

    // run
    let probe = Probe::from_config(&config);
    let fetcher = Fetcher::from_config(&config)?;
    let launcher = Launcher::new(probe, fetcher);
    let code = launcher.run(&args.forward);
    debug!(code, "finished");

    Ok(code)
}

// Prints some information (version, path of executable, etc.).
#[doc(hidden)]
fn print_info() {
    let version = Version::default();
    if let Ok(exe) = env::current_exe() {
        let exe = PATH_COLOR.paint(exe.to_string_lossy());
        eprintln!("{version} [{exe}]");
    } else {
        eprintln!("{version}");
    }
}

// Parses the verbosity level from the environment (unset or garbage means errors only).
#[doc(hidden)]
fn verbosity(value: Option<&str>) -> u8 {
    value.and_then(|value| value.trim().parse().ok()).unwrap_or(0)
}

// Maps the verbosity level to the level filter.
#[doc(hidden)]
fn level_filter(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::ERROR,
        1 => LevelFilter::WARN,
        2 => LevelFilter::INFO,
        3 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

// Initialises the tracing framework based on the given verbosity.
#[doc(hidden)]
fn init_tracing(verbose: u8) {
    // `RUST_LOG` directives are combined with the verbosity level.
    // Logs go to stderr, so stdout belongs to the setup script alone.
    let env_filter = EnvFilter::from_default_env().add_directive(level_filter(verbose).into());
    tracing_subscriber::fmt() //
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {

    use super::*;
    use test_log::test;

    #[test]
    fn verbosity_default() {
        assert_eq!(verbosity(None), 0);
        assert_eq!(verbosity(Some("")), 0);
        assert_eq!(verbosity(Some("loud")), 0);
    }

    #[test]
    fn verbosity_parsed() {
        assert_eq!(verbosity(Some(" 3 ")), 3);
    }

    #[test]
    fn level_filters() {
        assert_eq!(level_filter(0), LevelFilter::ERROR);
        assert_eq!(level_filter(1), LevelFilter::WARN);
        assert_eq!(level_filter(2), LevelFilter::INFO);
        assert_eq!(level_filter(3), LevelFilter::DEBUG);
        assert_eq!(level_filter(4), LevelFilter::TRACE);
        assert_eq!(level_filter(u8::MAX), LevelFilter::TRACE);
    }
}
