//! Validation.
//!
//! This module decides whether a downloaded payload looks like the setup script before it gets executed.
//! The check is a [`Validator`], so stronger checks can replace the heuristic without touching the fetcher.

use crate::config::ValidationConfig;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::{instrument, trace};

/// The reason a payload was rejected.
#[derive(Debug, thiserror::Error)]
pub(crate) enum Rejection {
    /// The payload is empty.
    #[error("payload is empty")]
    Empty,
    /// Neither the token nor the marker were found.
    #[error("first line lacks '{token}' and first {marker_lines} lines lack '{marker}'")]
    Unrecognised {
        token: String,
        marker: String,
        marker_lines: usize,
    },
    /// The payload could not be read back.
    #[error("failed to read payload: {0}")]
    Io(#[from] io::Error),
}

/// Trait for payload validators.
pub(crate) trait Validator: fmt::Debug {
    /// Checks the payload stored at the given path.
    fn validate(&self, path: &Path) -> Result<(), Rejection>;
}

/// [`Validator`] that sniffs the first lines of the payload.
///
/// A payload passes if its first line contains the language token or any of the first `marker_lines` lines contain
/// the project marker. An HTML error page that happens to mention the marker passes as well.
#[derive(Debug)]
pub(crate) struct HeuristicValidator {
    token: String,
    marker: String,
    marker_lines: usize,
}

impl HeuristicValidator {
    /// Creates a new `HeuristicValidator`.
    pub(crate) fn new(token: impl Into<String>, marker: impl Into<String>, marker_lines: usize) -> Self {
        Self {
            token: token.into(),
            marker: marker.into(),
            marker_lines: marker_lines.max(1),
        }
    }

    /// Creates a new `HeuristicValidator` out of the given `ValidationConfig`.
    pub(crate) fn from_config(config: &ValidationConfig) -> Self {
        Self::new(&config.token, &config.marker, config.marker_lines)
    }

    // Reads up to `marker_lines` lines (lossy UTF-8, line endings stripped).
    fn head<R: BufRead>(&self, mut reader: R) -> io::Result<Vec<String>> {
        let mut lines = Vec::with_capacity(self.marker_lines);
        let mut buf = Vec::new();
        while lines.len() < self.marker_lines {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            lines.push(line.trim_end_matches(['\r', '\n']).to_string());
        }

        Ok(lines)
    }

    // Applies the heuristic to the given reader.
    fn check<R: BufRead>(&self, reader: R) -> Result<(), Rejection> {
        let lines = self.head(reader)?;
        let Some(first) = lines.first() else {
            return Err(Rejection::Empty);
        };

        if first.contains(&self.token) {
            trace!(%first, "token found in first line");
            return Ok(());
        }

        if let Some(line) = lines.iter().find(|line| line.contains(&self.marker)) {
            trace!(%line, "marker found");
            return Ok(());
        }

        Err(Rejection::Unrecognised {
            token: self.token.clone(),
            marker: self.marker.clone(),
            marker_lines: self.marker_lines,
        })
    }
}

impl Validator for HeuristicValidator {
    #[instrument(level = "trace", skip(self), err(level = "trace"))]
    fn validate(&self, path: &Path) -> Result<(), Rejection> {
        let file = File::open(path)?;
        self.check(BufReader::new(file))
    }
}
