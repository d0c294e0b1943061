//! Register a node under an existing dimension.

use crate::error::Result;
use crate::hive::Hive;
use crate::router;

/// Execute the `create-node` command.
///
/// Resolves DIMENSION_NAME to its id, then registers the node. The
/// node database itself is not touched; it only has to exist by the
/// time values are assigned to it.
///
/// # Errors
///
/// [`NoSuchDimension`](crate::error::Error::NoSuchDimension) if the
/// dimension is not registered,
/// [`NodeExists`](crate::error::Error::NodeExists) if the node name is
/// taken under the dimension.
pub fn execute(hive_uri: &str, dimension_name: &str, node_name: &str, node_uri: &str) -> Result<()> {
    let hive = Hive::open(hive_uri)?;
    let dimension = hive.dimension(dimension_name)?;
    let node_id = router::create_node(&hive, dimension.id, node_name, node_uri)?;
    println!("Created node '{node_name}' (id {node_id}) under dimension '{dimension_name}'");
    Ok(())
}
