//! Register a dimension and materialise its primary index.
//!
//! Two steps against two (possibly shared) databases: the primary
//! index table is created in the directory database first, then the
//! dimension row is inserted into the hive. When no DIRECTORY_URI is
//! given the hive database doubles as the directory.

use crate::error::Result;
use crate::hive::Hive;
use crate::router;
use crate::schema::DbType;

/// Execute the `create-dimension` command.
///
/// # Errors
///
/// [`DimensionExists`](crate::error::Error::DimensionExists) if the
/// name is taken; URI and driver errors pass through.
pub fn execute(
    hive_uri: &str,
    dimension_name: &str,
    db_type: DbType,
    directory_uri: Option<&str>,
) -> Result<()> {
    let directory_uri = directory_uri.unwrap_or(hive_uri);
    router::create_primary_index(directory_uri, dimension_name, db_type)?;

    let hive = Hive::open(hive_uri)?;
    let dimension_id = router::create_dimension(&hive, dimension_name, directory_uri, db_type)?;
    println!("Created dimension '{dimension_name}' (id {dimension_id})");
    Ok(())
}
