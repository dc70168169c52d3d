//! Build script.

use std::error::Error;
use vergen_git2::{BuildBuilder, Emitter, Git2Builder, RustcBuilder};

// Main entry point for the build script.
fn main() -> Result<(), Box<dyn Error>> {
    // fetch some version information (shown in the banner and sent as user agent)
    Emitter::default()
        .add_instructions(&BuildBuilder::all_build()?)?
        .add_instructions(&Git2Builder::all_git()?)?
        .add_instructions(&RustcBuilder::all_rustc()?)?
        .emit_and_set()?;

    Ok(())
}
