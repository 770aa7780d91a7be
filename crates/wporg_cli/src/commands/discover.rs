//! Discover command implementation.

use serde_json::{json, Value};
use wporg_sync_engine::registry;

/// Builds the catalog of every endpoint.
pub fn catalog() -> Value {
    let streams: Vec<Value> = registry::all()
        .iter()
        .map(|d| d.to_catalog_entry())
        .collect();
    json!({ "streams": streams })
}

/// Runs the discover command.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(&catalog())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lists_every_endpoint() {
        let catalog = catalog();
        let streams = catalog["streams"].as_array().unwrap();
        assert_eq!(streams.len(), registry::all().len());
        assert_eq!(streams[0]["stream"], "plugins");
        assert_eq!(streams[0]["replication_method"], "INCREMENTAL");
        assert_eq!(streams[2]["replication_method"], "FULL_TABLE");
    }
}
