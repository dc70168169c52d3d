//! Arguments.
//!
//! Every command-line argument belongs to the setup script, so the launcher
//! captures them all (hyphenated ones included) and forwards them unchanged.

use clap::Parser;
use std::env;
use std::ffi::OsString;
use std::iter;

#[derive(Debug, Parser)]
#[clap(author, disable_help_flag = true, disable_version_flag = true)]
pub(crate) struct Args {
    /// Arguments forwarded verbatim to the setup script
    #[clap(trailing_var_arg = true, allow_hyphen_values = true, value_name = "args")]
    pub(crate) forward: Vec<OsString>,
}

impl Args {
    /// Captures the arguments of the running process.
    pub(crate) fn from_env() -> Self {
        Self::from_raw(env::args_os())
    }

    /// Captures the given raw arguments; the first one is the program name.
    ///
    /// clap swallows the first `--` it sees, so one is inserted ahead of the real arguments. Everything after it,
    /// including a `--` given by the user, is taken literally.
    pub(crate) fn from_raw<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let mut args = args.into_iter().map(Into::into);
        let program = args.next().unwrap_or_else(|| OsString::from(env!("CARGO_PKG_NAME")));
        Self::parse_from(iter::once(program).chain(iter::once(OsString::from("--"))).chain(args))
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use test_log::test;

    #[test]
    fn no_args() {
        let args = Args::from_raw(["program"]);
        assert!(args.forward.is_empty());
    }

    #[test]
    fn no_program_name() {
        let args = Args::from_raw(Vec::<OsString>::new());
        assert!(args.forward.is_empty());
    }

    #[test]
    fn flags_are_forwarded() {
        let args = Args::from_raw(["program", "--auto", "-k", "sk-123"]);
        assert_eq!(args.forward, ["--auto", "-k", "sk-123"]);
    }

    #[test]
    fn help_and_version_are_forwarded() {
        let args = Args::from_raw(["program", "--help", "-V", "--version", "-h"]);
        assert_eq!(args.forward, ["--help", "-V", "--version", "-h"]);
    }

    #[test]
    fn order_is_kept() {
        let args = Args::from_raw(["program", "b", "a", "--key", "c"]);
        assert_eq!(args.forward, ["b", "a", "--key", "c"]);
    }

    #[test]
    fn double_dash_is_forwarded() {
        let args = Args::from_raw(["program", "--", "--auto"]);
        assert_eq!(args.forward, ["--", "--auto"]);
    }

    #[test]
    fn every_double_dash_is_forwarded() {
        let args = Args::from_raw(["program", "--", "a", "--", "--", "-k"]);
        assert_eq!(args.forward, ["--", "a", "--", "--", "-k"]);
    }
}
