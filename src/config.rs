//! Configuration.
//!
//! This module contains the built-in defaults and the optional overrides read from a YAML file.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::env;
use std::fmt;
use std::fs::File;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::instrument;

/// Environment variable naming an optional configuration file.
pub(crate) const CONFIG_ENV: &str = "SGPT_SETUP_CONFIG";

/// Environment variable holding the verbosity level (0 = errors only, 4 = trace).
pub(crate) const VERBOSE_ENV: &str = "SGPT_SETUP_VERBOSE";

/// Interpreter names in priority order.
pub(crate) const DEFAULT_INTERPRETERS: [&str; 2] = ["python3", "python"];

/// Oldest interpreter able to run the setup script.
pub(crate) const DEFAULT_MIN_VERSION: semver::Version = semver::Version::new(3, 6, 0);

/// Mirrors serving the setup script in priority order: CDN, raw version-control hosting, secondary code hosting.
pub(crate) const DEFAULT_SOURCES: [&str; 3] = [
    "https://cdn.jsdelivr.net/gh/maimengge/shell-gpt-setup@main/setup_shell_gpt.py",
    "https://raw.githubusercontent.com/maimengge/shell-gpt-setup/main/setup_shell_gpt.py",
    "https://gitee.com/maimengge/shell-gpt-setup/raw/main/setup_shell_gpt.py",
];

/// Connect timeout applied to every source.
pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Token expected within the first line of the script.
pub(crate) const DEFAULT_TOKEN: &str = "python";

/// Marker expected within the first lines of the script.
pub(crate) const DEFAULT_MARKER: &str = "Shell-GPT";

/// Number of leading lines searched for the marker.
pub(crate) const DEFAULT_MARKER_LINES: usize = 5;

/// The struct that holds the effective configuration.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    /// Interpreter names in priority order.
    pub(crate) interpreters: Vec<String>,
    /// Oldest acceptable interpreter version (`~` accepts any version).
    pub(crate) min_version: Option<semver::Version>,
    /// Source URLs in priority order.
    pub(crate) sources: Vec<String>,
    /// Connect timeout per source.
    #[serde(deserialize_with = "duration_deser")]
    pub(crate) connect_timeout: Duration,
    /// Overall timeout per request (none by default).
    #[serde(deserialize_with = "opt_duration_deser")]
    pub(crate) request_timeout: Option<Duration>,
    /// Directory for the temporary script (platform default if absent).
    pub(crate) scratch_dir: Option<String>,
    /// Whether to honour proxy settings from the environment (`HTTPS_PROXY`, etc.).
    pub(crate) system_proxy: bool,
    /// Settings for the validity heuristic.
    pub(crate) validation: ValidationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interpreters: DEFAULT_INTERPRETERS.iter().map(ToString::to_string).collect(),
            min_version: Some(DEFAULT_MIN_VERSION),
            sources: DEFAULT_SOURCES.iter().map(ToString::to_string).collect(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: None,
            scratch_dir: None,
            system_proxy: true,
            validation: ValidationConfig::default(),
        }
    }
}

impl Config {
    /// Loads the configuration named by [CONFIG_ENV], or the defaults if the variable is not set.
    pub(crate) fn load() -> anyhow::Result<Self> {
        match env::var_os(CONFIG_ENV) {
            Some(filename) if !filename.is_empty() => Self::load_from_file(PathBuf::from(filename)),
            _ => Ok(Self::default()),
        }
    }

    /// Loads the configuration from the given filename.
    #[instrument(err, level = "trace")]
    pub(crate) fn load_from_file<P>(filename: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path> + std::fmt::Debug,
    {
        let config_file = File::open(filename)?;

        let de = serde_yaml::Deserializer::from_reader(config_file);
        let value = serde_yaml::Value::deserialize(de)?;
        let config: Config = serde_yaml::from_value(value)?;
        config.check()?;

        Ok(config)
    }

    // Rejects configurations the launcher cannot work with.
    fn check(&self) -> anyhow::Result<()> {
        if self.interpreters.is_empty() {
            anyhow::bail!("at least one interpreter must be configured");
        }
        if self.sources.is_empty() {
            anyhow::bail!("at least one source must be configured");
        }
        for source in &self.sources {
            reqwest::Url::parse(source).map_err(|err| anyhow::anyhow!("invalid source '{source}': {err}"))?;
        }
        if self.validation.marker_lines == 0 {
            anyhow::bail!("'marker_lines' must be at least 1");
        }

        Ok(())
    }

    /// Returns the directory for the temporary script with `~` and `${VAR}` expanded.
    pub(crate) fn expand_scratch_dir(&self) -> anyhow::Result<PathBuf> {
        let Some(ref dir) = self.scratch_dir else {
            return Ok(env::temp_dir());
        };
        let dir = shellexpand::full(dir)?;

        Ok(PathBuf::from(dir.as_ref()))
    }
}

/// The configuration for the validity heuristic.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ValidationConfig {
    /// Token expected within the first line.
    pub(crate) token: String,
    /// Marker expected within the first `marker_lines` lines.
    pub(crate) marker: String,
    /// Number of leading lines searched for the marker.
    pub(crate) marker_lines: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            token: DEFAULT_TOKEN.to_string(),
            marker: DEFAULT_MARKER.to_string(),
            marker_lines: DEFAULT_MARKER_LINES,
        }
    }
}

// Parses a duration either from a humantime string (`10s`, `1m 30s`) or from plain seconds.
#[doc(hidden)]
struct DurationVisitor(PhantomData<fn() -> Duration>);

impl Visitor<'_> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("duration string (e.g. \"10s\") or seconds as unsigned integer")
    }

    fn visit_str<E>(self, value: &str) -> Result<Duration, E>
    where
        E: de::Error,
    {
        humantime::parse_duration(value).map_err(E::custom)
    }

    fn visit_u64<E>(self, value: u64) -> Result<Duration, E>
    where
        E: de::Error,
    {
        Ok(Duration::from_secs(value))
    }
}

// Deserializes [Config::connect_timeout].
#[doc(hidden)]
fn duration_deser<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(DurationVisitor(PhantomData))
}

// Deserializes [Config::request_timeout], where `~` means no timeout.
#[doc(hidden)]
fn opt_duration_deser<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "duration_deser")] Duration);

    let wrapper = Option::<Wrapper>::deserialize(deserializer)?;
    Ok(wrapper.map(|Wrapper(duration)| duration))
}
