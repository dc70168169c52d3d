//! Version.
//!
//! This module contains the version information of the launcher itself.

use std::fmt;

/// Structure to hold the version information.
#[derive(Debug)]
pub(crate) struct Version {
    /// The name of the package.
    pub(crate) pkg_name: &'static str,
    /// The version of the package.
    pub(crate) pkg_version: &'static str,
    /// The value that `git describe` returned.
    pub(crate) git_describe: &'static str,
    /// The version of the rust compiler.
    pub(crate) rustc_semver: &'static str,
}

impl Default for Version {
    fn default() -> Self {
        Self {
            pkg_name: env!("CARGO_PKG_NAME"),
            pkg_version: env!("CARGO_PKG_VERSION"),
            git_describe: env!("VERGEN_GIT_DESCRIBE"),
            rustc_semver: env!("VERGEN_RUSTC_SEMVER"),
        }
    }
}

impl Version {
    /// Returns the value sent as `User-Agent` with every download request.
    pub(crate) fn user_agent(&self) -> String {
        format!("{}/{} (git/{})", self.pkg_name, self.pkg_version, self.git_describe)
    }
}

/// Display this Version.
impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            pkg_name,
            pkg_version,
            git_describe,
            rustc_semver,
        } = self;
        write!(f, "{pkg_name} {pkg_version} (git/{git_describe}) (rustc/{rustc_semver})")
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use test_log::test;

    #[test]
    fn user_agent_names_package() {
        let version = Version::default();
        let user_agent = version.user_agent();
        assert!(user_agent.starts_with("sgpt-setup/"));
        assert!(user_agent.contains(version.git_describe));
    }
}
