//! `version` command

use anyhow::Result;

pub fn handle_version_command() -> Result<()> {
    println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    Ok(())
}
