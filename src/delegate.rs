//! Delegation.
//!
//! This module runs the downloaded script with the resolved interpreter and reports its exit code.

use crate::probe::Interpreter;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use tracing::{debug, instrument, warn};

/// Exit code reported when the script's status carries no code at all.
const EXIT_UNKNOWN: i32 = 1;

/// The error type for delegation.
#[derive(Debug, thiserror::Error)]
pub(crate) enum DelegateError {
    /// The interpreter could not be started.
    #[error("failed to start '{}': {source}", .interpreter.display())]
    Spawn {
        interpreter: PathBuf,
        #[source]
        source: io::Error,
    },
}

// The struct that holds the delegated command.
#[derive(Debug)]
pub(crate) struct Delegation {
    // The path to the interpreter.
    interpreter: PathBuf,
    // The path to the script.
    script: PathBuf,
    // The arguments forwarded to the script.
    args: Vec<OsString>,
}

impl Delegation {
    /// Creates a new `Delegation` running the given script with the given interpreter.
    pub(crate) fn new(interpreter: &Interpreter, script: &Path, args: &[OsString]) -> Self {
        Self {
            interpreter: interpreter.path.clone(),
            script: script.to_path_buf(),
            args: args.to_vec(),
        }
    }

    /// Runs the script to completion and returns its exit code.
    ///
    /// Standard streams are inherited, so the script can interact with the user. Ctrl-C is left to the script: the
    /// launcher keeps running until the script exits, so its exit code is reported and the script gets deleted.
    #[instrument(level = "trace", err(level = "debug"))]
    pub(crate) fn run(&self) -> Result<i32, DelegateError> {
        #[cfg(unix)]
        survive_interrupts();

        let status = Command::new(&self.interpreter) //
            .arg(&self.script)
            .args(&self.args)
            .status()
            .map_err(|source| DelegateError::Spawn {
                interpreter: self.interpreter.clone(),
                source,
            })?;
        debug!(?status);

        Ok(exit_code(status))
    }
}

// Installs a no-op `SIGINT` handler for the rest of the process lifetime.
//
// The terminal sends `SIGINT` to the whole foreground process group. A caught signal (unlike an ignored one) is reset
// to its default action on `exec`, so the script still gets interrupted while the launcher carries on.
#[cfg(unix)]
fn survive_interrupts() {
    use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
    use std::sync::Once;

    extern "C" fn noop(_: std::ffi::c_int) {}

    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let action = SigAction::new(SigHandler::Handler(noop), SaFlags::SA_RESTART, SigSet::empty());
        // SAFETY: the handler does nothing, so it is async-signal-safe
        if let Err(err) = unsafe { sigaction(Signal::SIGINT, &action) } {
            warn!(?err, "failed to install SIGINT handler");
        }
    });
}

/// Returns the exit code to propagate for the given status.
///
/// On Unix a program killed by a signal maps to `128 + signal`, like a shell reports it.
pub(crate) fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    EXIT_UNKNOWN
}

#[cfg(test)]
mod tests {

    use super::*;
    use test_log::test;

    #[cfg(unix)]
    fn sh() -> Interpreter {
        Interpreter {
            name: "sh".to_string(),
            path: which::which("sh").unwrap(),
            version: String::new(),
        }
    }

    #[cfg(unix)]
    fn script(content: &str) -> tempfile::TempPath {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        io::Write::write_all(&mut file, content.as_bytes()).unwrap();
        file.into_temp_path()
    }

    #[cfg(unix)]
    #[test]
    fn exit_code_is_passed_through() {
        let script = script("exit 42\n");
        let code = Delegation::new(&sh(), &script, &[]).run().unwrap();
        assert_eq!(code, 42);
    }

    #[cfg(unix)]
    #[test]
    fn arguments_are_forwarded_in_order() {
        // succeeds only if exactly the expected arguments arrive
        let script = script("[ \"$#\" = 3 ] && [ \"$1\" = --auto ] && [ \"$2\" = '-k' ] && [ \"$3\" = 'a b' ] || exit 7\n");
        let args: Vec<OsString> = ["--auto", "-k", "a b"].iter().map(OsString::from).collect();
        let code = Delegation::new(&sh(), &script, &args).run().unwrap();
        assert_eq!(code, 0);
    }

    #[cfg(unix)]
    #[test]
    fn killed_by_signal() {
        let script = script("kill -TERM $$\n");
        let code = Delegation::new(&sh(), &script, &[]).run().unwrap();
        assert_eq!(code, 128 + 15);
    }

    #[cfg(unix)]
    #[test]
    fn interrupt_stops_script_not_launcher() {
        // interrupts the launcher (its parent), then survives long enough to report its own code
        let script = script("kill -INT $PPID\nsleep 1\nexit 4\n");
        let code = Delegation::new(&sh(), &script, &[]).run().unwrap();
        assert_eq!(code, 4);
    }

    #[cfg(unix)]
    #[test]
    fn interrupt_reaches_script() {
        // the handler is not inherited, so the script dies of the interrupt like it would when run directly
        let script = script("kill -INT $$\nexit 6\n");
        let code = Delegation::new(&sh(), &script, &[]).run().unwrap();
        assert_eq!(code, 128 + 2);
    }

    #[test]
    fn interpreter_missing() {
        let interpreter = Interpreter {
            name: "missing".to_string(),
            path: PathBuf::from("/nonexistent/sgpt-setup/python3"),
            version: String::new(),
        };
        let result = Delegation::new(&interpreter, Path::new("script.py"), &[]).run();
        assert!(matches!(result, Err(DelegateError::Spawn { .. })));
    }
}
