//! Environment probe.
//!
//! This module resolves the Python interpreter used to run the setup script.

use crate::config::Config;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, instrument, trace, warn};

/// The error type for probing.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ProbeError {
    /// None of the candidates is usable.
    #[error("no usable interpreter found (tried: {})", .0.join(", "))]
    NotFound(Vec<String>),
}

/// The resolved interpreter.
#[derive(Clone, Debug)]
pub(crate) struct Interpreter {
    /// The command name that resolved (e.g. `python3`).
    pub(crate) name: String,
    /// The absolute path of the executable.
    pub(crate) path: PathBuf,
    /// The version text as reported by the interpreter (e.g. `Python 3.12.1`).
    pub(crate) version: String,
}

/// Probes candidate interpreter names in priority order.
#[derive(Debug)]
pub(crate) struct Probe {
    candidates: Vec<String>,
    min_version: Option<semver::Version>,
}

impl Probe {
    /// Creates a new `Probe` for the given candidate names.
    pub(crate) fn new<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
            min_version: None,
        }
    }

    /// Creates a new `Probe` out of the given `Config`.
    pub(crate) fn from_config(config: &Config) -> Self {
        let mut probe = Self::new(&config.interpreters);
        probe.min_version(config.min_version.clone());

        probe
    }

    /// Sets the oldest acceptable version.
    pub(crate) fn min_version(&mut self, min_version: Option<semver::Version>) -> &mut Self {
        self.min_version = min_version;

        self
    }

    /// Resolves the first usable candidate.
    #[instrument(level = "trace", skip(self), err(level = "debug"))]
    pub(crate) fn resolve(&self) -> Result<Interpreter, ProbeError> {
        for name in &self.candidates {
            let Ok(path) = which::which(name) else {
                debug!(%name, "not found on PATH");
                continue;
            };
            trace!(%name, path = %path.display());

            let version = query_version(&path);
            if let Some(ref min_version) = self.min_version {
                match version.as_deref().and_then(parse_version) {
                    Some(ref actual) if actual >= min_version => {}
                    Some(actual) => {
                        warn!(%name, %actual, %min_version, "skipping interpreter, version too old");
                        continue;
                    }
                    None => {
                        warn!(%name, ?version, "skipping interpreter, version unknown");
                        continue;
                    }
                }
            }

            return Ok(Interpreter {
                name: name.clone(),
                path,
                version: version.unwrap_or_else(|| "unknown version".to_string()),
            });
        }

        Err(ProbeError::NotFound(self.candidates.clone()))
    }
}

// Runs `<interpreter> --version` and returns the first non-empty line of its output.
// Python 2 prints its version to stderr, so both streams are considered.
#[doc(hidden)]
fn query_version(path: &std::path::Path) -> Option<String> {
    let output = Command::new(path) //
        .arg("--version")
        .stdin(Stdio::null()) // disconnect from self
        .output()
        .inspect_err(|err| debug!(?err, "failed to query version"))
        .ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    stdout
        .lines()
        .chain(stderr.lines())
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(ToString::to_string)
}

/// Extracts a version out of text like `Python 3.13.0rc1` (missing components count as zero).
pub(crate) fn parse_version(text: &str) -> Option<semver::Version> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let mut parts = text[start..]
        .split(|c: char| !c.is_ascii_digit() && c != '.')
        .next()?
        .split('.')
        .filter(|part| !part.is_empty())
        .map(str::parse::<u64>);

    let major = parts.next()?.ok()?;
    let minor = parts.next().and_then(Result::ok).unwrap_or(0);
    let patch = parts.next().and_then(Result::ok).unwrap_or(0);

    Some(semver::Version::new(major, minor, patch))
}

/// Returns installation hints for common package managers.
pub(crate) fn install_guidance() -> String {
    [
        "Please install Python 3 first, e.g.:",
        "  Debian/Ubuntu:  sudo apt update && sudo apt install -y python3 python3-pip",
        "  Fedora/RHEL:    sudo dnf install -y python3 python3-pip",
        "  Arch Linux:     sudo pacman -S --needed python python-pip",
        "  macOS:          brew install python3",
        "  Windows:        winget install Python.Python.3.12",
    ]
    .join("\n")
}
