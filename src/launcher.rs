//! Launcher.
//!
//! This module chains probing, fetching and delegation: `probe -> fetch -> delegate -> cleanup`.
//! Any failure before delegation ends the run with [EXIT_NOK]; afterwards the script's exit code is passed through.

use crate::colors::*;
use crate::delegate::{DelegateError, Delegation};
use crate::fetch::{self, FetchError, Fetcher};
use crate::probe::{self, Probe, ProbeError};
use std::ffi::OsString;
use std::fmt;
use tracing::{debug, instrument, warn};

/// Exit code used if the launcher itself fails.
pub(crate) const EXIT_NOK: i32 = 1;

/// How a run ended.
#[derive(Debug)]
pub(crate) enum Outcome {
    /// No usable interpreter.
    ProbeFailed(ProbeError),
    /// No source delivered a valid script.
    FetchFailed {
        err: FetchError,
        /// How to download and run the script by hand.
        instructions: Option<String>,
    },
    /// The interpreter could not be started.
    DelegateFailed(DelegateError),
    /// The script ran and exited with the given code.
    Completed(i32),
}

impl Outcome {
    /// Returns the exit code for the launcher process.
    pub(crate) fn exit_code(&self) -> i32 {
        match self {
            Self::Completed(code) => *code,
            Self::ProbeFailed(_) | Self::FetchFailed { .. } | Self::DelegateFailed(_) => EXIT_NOK,
        }
    }

    /// Returns what the user can do about a failed run.
    pub(crate) fn advice(&self) -> Option<String> {
        match self {
            Self::ProbeFailed(_) => Some(probe::install_guidance()),
            Self::FetchFailed { instructions, .. } => instructions.clone(),
            Self::DelegateFailed(_) | Self::Completed(_) => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProbeFailed(err) => write!(f, "{err}"),
            Self::FetchFailed { err, .. } => write!(f, "failed to download the setup script: {err}"),
            Self::DelegateFailed(err) => write!(f, "{err}"),
            Self::Completed(code) => write!(f, "setup script exited with code {code}"),
        }
    }
}

/// Runs the setup script end to end.
#[derive(Debug)]
pub(crate) struct Launcher {
    probe: Probe,
    fetcher: Fetcher,
}

impl Launcher {
    /// Creates a new `Launcher`.
    pub(crate) fn new(probe: Probe, fetcher: Fetcher) -> Self {
        Self { probe, fetcher }
    }

    /// Runs all stages and returns how the run ended.
    ///
    /// The temporary script never outlives this call.
    #[instrument(level = "trace", skip(self))]
    pub(crate) fn launch(&self, args: &[OsString]) -> Outcome {
        // probe
        let interpreter = match self.probe.resolve() {
            Ok(interpreter) => interpreter,
            Err(err) => return failed(Outcome::ProbeFailed(err)),
        };
        let version = INFO_COLOR.paint(interpreter.version.as_str());
        let path = PATH_COLOR.paint(interpreter.path.to_string_lossy());
        eprintln!("Using {} [{version}] at {path}", interpreter.name);

        // fetch
        let artifact = match self.fetcher.fetch() {
            Ok(artifact) => artifact,
            Err(err) => {
                let instructions = self
                    .fetcher
                    .primary_source()
                    .map(|url| fetch::manual_instructions(url, &interpreter.name));
                return failed(Outcome::FetchFailed { err, instructions });
            }
        };
        let source = PATH_COLOR.paint(artifact.source());
        eprintln!(
            "{} from {source} [{} bytes, sha256 {}]",
            SUCCESS_COLOR.paint("Downloaded setup script"),
            artifact.bytes(),
            artifact.sha256()
        );

        // delegate
        let outcome = match Delegation::new(&interpreter, artifact.path(), args).run() {
            Ok(code) => Outcome::Completed(code),
            Err(err) => failed(Outcome::DelegateFailed(err)),
        };

        // cleanup
        if let Err(err) = artifact.remove() {
            warn!(?err, "failed to delete setup script");
        }
        debug!(%outcome);

        outcome
    }

    /// Runs all stages and returns the exit code for the launcher process.
    pub(crate) fn run(&self, args: &[OsString]) -> i32 {
        self.launch(args).exit_code()
    }
}

// Reports a failed run on stderr.
fn failed(outcome: Outcome) -> Outcome {
    eprintln!("{}", ATTENTION_COLOR.paint(format!("Failed! {outcome}")));
    if let Some(advice) = outcome.advice() {
        eprintln!("{advice}");
    }
    debug!(%outcome);
    outcome
}
