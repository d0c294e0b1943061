//! Install the hive metadata schema.

use crate::error::Result;
use crate::router;

/// Execute the `create-hive` command.
///
/// Safe to re-run against an existing hive.
///
/// # Errors
///
/// Returns an error if the hive database cannot be reached or the
/// schema cannot be applied.
pub fn execute(hive_uri: &str) -> Result<()> {
    router::create_hive(hive_uri)?;
    println!("Created hive at {hive_uri}");
    Ok(())
}
