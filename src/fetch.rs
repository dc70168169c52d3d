//! Source-fallback fetcher.
//!
//! This module downloads the setup script from the first source that answers with a valid payload.
//! Sources are tried strictly in order; the first valid payload wins and later sources are never contacted.

use crate::checksum::ChecksumWrite;
use crate::colors::*;
use crate::config::Config;
use crate::validate::{HeuristicValidator, Rejection, Validator};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempPath;
use tracing::{debug, instrument, trace, warn};

/// Fallback name of the setup script if it cannot be derived from a source URL.
const SCRIPT_NAME: &str = "setup_shell_gpt.py";

/// The error type for a single source.
#[derive(Debug, thiserror::Error)]
pub(crate) enum AttemptError {
    /// The source was unreachable, timed out or answered with an error status.
    #[error("transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The payload did not pass validation.
    #[error("invalid payload: {0}")]
    Rejected(#[from] Rejection),
    /// The temporary file could not be written.
    #[error("failed to store payload: {0}")]
    Io(#[from] io::Error),
}

/// The error type for the whole fallback chain.
#[derive(Debug, thiserror::Error)]
pub(crate) enum FetchError {
    /// The HTTP client could not be created.
    #[error("failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    /// Every source failed.
    #[error("all {attempts} source(s) failed")]
    Exhausted { attempts: usize },
}

/// A downloaded and validated script.
///
/// The file is removed by [Artifact::remove] or, as a last resort, when the artifact is dropped.
#[derive(Debug)]
pub(crate) struct Artifact {
    path: TempPath,
    source: String,
    bytes: u64,
    sha256: String,
}

impl Artifact {
    /// Returns the path of the downloaded script.
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the URL the script was downloaded from.
    pub(crate) fn source(&self) -> &str {
        &self.source
    }

    /// Returns the size of the script in bytes.
    pub(crate) fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Returns the SHA-256 digest of the script (lower-case hex).
    pub(crate) fn sha256(&self) -> &str {
        &self.sha256
    }

    /// Removes the script from disc.
    pub(crate) fn remove(self) -> io::Result<()> {
        self.path.close()
    }
}

/// Downloads the script from an ordered list of sources.
#[derive(Debug)]
pub(crate) struct Fetcher {
    sources: Vec<String>,
    validator: Box<dyn Validator>,
    connect_timeout: Duration,
    request_timeout: Option<Duration>,
    scratch_dir: PathBuf,
    system_proxy: bool,
    user_agent: String,
}

impl Fetcher {
    /// Creates a new `Fetcher` for the given sources and validator.
    pub(crate) fn new<I, S>(sources: I, validator: Box<dyn Validator>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            validator,
            connect_timeout: crate::config::DEFAULT_CONNECT_TIMEOUT,
            request_timeout: None,
            scratch_dir: std::env::temp_dir(),
            system_proxy: true,
            user_agent: crate::version::Version::default().user_agent(),
        }
    }

    /// Creates a new `Fetcher` out of the given `Config`.
    pub(crate) fn from_config(config: &Config) -> anyhow::Result<Self> {
        let validator = HeuristicValidator::from_config(&config.validation);
        let mut fetcher = Self::new(&config.sources, Box::new(validator));
        fetcher
            .connect_timeout(config.connect_timeout)
            .request_timeout(config.request_timeout)
            .scratch_dir(config.expand_scratch_dir()?)
            .system_proxy(config.system_proxy);

        Ok(fetcher)
    }

    /// Sets the connect timeout applied to each source.
    pub(crate) fn connect_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.connect_timeout = timeout;

        self
    }

    /// Sets the overall timeout per request (`None` waits as long as the transfer makes progress).
    pub(crate) fn request_timeout(&mut self, timeout: Option<Duration>) -> &mut Self {
        self.request_timeout = timeout;

        self
    }

    /// Sets the directory receiving the temporary script.
    pub(crate) fn scratch_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.scratch_dir = dir.into();

        self
    }

    /// Whether to honour the proxy settings from the environment.
    pub(crate) fn system_proxy(&mut self, system_proxy: bool) -> &mut Self {
        self.system_proxy = system_proxy;

        self
    }

    /// Returns the first source, which is the one recommended for a manual download.
    pub(crate) fn primary_source(&self) -> Option<&str> {
        self.sources.first().map(String::as_str)
    }

    /// Tries the sources in order and returns the first valid download.
    #[instrument(level = "trace", skip(self), err(level = "debug"))]
    pub(crate) fn fetch(&self) -> Result<Artifact, FetchError> {
        let client = self.client().map_err(FetchError::Client)?;
        let total = self.sources.len();

        for (i, url) in self.sources.iter().enumerate() {
            let n = i + 1;
            eprintln!("Downloading setup script from source {n}/{total}: {}", PATH_COLOR.paint(url.as_str()));

            match self.attempt(&client, url) {
                Ok(artifact) => {
                    debug!(%url, bytes = artifact.bytes, sha256 = %artifact.sha256, "source accepted");
                    return Ok(artifact);
                }
                Err(err) => {
                    warn!(%url, %err, "source failed, trying next");
                    eprintln!("{}", WARN_COLOR.paint(format!("Source {n}/{total} failed: {err}")));
                }
            }
        }

        Err(FetchError::Exhausted { attempts: total })
    }

    // Downloads and validates a single source.
    #[instrument(level = "trace", skip(self, client), err(level = "trace"))]
    fn attempt(&self, client: &reqwest::blocking::Client, url: &str) -> Result<Artifact, AttemptError> {
        // request
        let mut response = client.get(url).send()?.error_for_status()?;
        trace!(status = %response.status());

        // download to a file unique to this process
        let prefix = format!("sgpt-setup.{}.", std::process::id());
        let suffix = format!("-{}", script_name(url));
        let mut file = tempfile::Builder::new() //
            .prefix(&prefix)
            .suffix(&suffix)
            .tempfile_in(&self.scratch_dir)?;
        trace!(path = %file.path().display());
        let mut checksum_write = ChecksumWrite::new(file.as_file_mut());
        response.copy_to(&mut checksum_write)?;
        let (bytes, sha256) = checksum_write.finish()?;
        trace!(bytes, %sha256);

        // close the handle, so the interpreter can open the file on every platform
        let path = file.into_temp_path();

        // validate
        if let Err(rejection) = self.validator.validate(&path) {
            if let Err(err) = path.close() {
                warn!(?err, "failed to delete rejected payload");
            }
            return Err(rejection.into());
        }

        Ok(Artifact {
            path,
            source: url.to_string(),
            bytes,
            sha256,
        })
    }

    // Builds the HTTP client shared by all attempts.
    fn client(&self) -> reqwest::Result<reqwest::blocking::Client> {
        let mut builder = reqwest::blocking::Client::builder() //
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .user_agent(&self.user_agent);
        if !self.system_proxy {
            builder = builder.no_proxy();
        }

        builder.build()
    }
}

/// Returns the file name of the script served by the given URL.
pub(crate) fn script_name(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|url| url.path_segments().and_then(|mut segments| segments.next_back().map(ToString::to_string)))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| SCRIPT_NAME.to_string())
}

/// Returns the instructions to download and run the script by hand.
pub(crate) fn manual_instructions(url: &str, interpreter: &str) -> String {
    let name = script_name(url);
    format!("Please download and run the setup script manually:\n  curl -fsSL {url} -o {name}\n  {interpreter} {name}")
}
