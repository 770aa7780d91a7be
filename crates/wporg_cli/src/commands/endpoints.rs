//! Endpoints command implementation.

use wporg_protocol::{EndpointDescriptor, Pagination, Reshape};
use wporg_sync_engine::registry;

fn paging(descriptor: &EndpointDescriptor) -> String {
    match (descriptor.pagination, descriptor.reshape) {
        (Pagination::PageNumber { param }, _) => format!("page ({param})"),
        (Pagination::OffsetCount { param, page_size }, _) => {
            format!("offset ({param}, {page_size}/page)")
        }
        (Pagination::None, Reshape::CountsMap) => "single (counts)".to_string(),
        (Pagination::None, Reshape::Records) => "single".to_string(),
    }
}

/// Runs the endpoints command.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "{:<16} {:<24} {:<10} {:<20} PAGING",
        "NAME", "PATH", "KEY", "REPLICATION"
    );
    for d in registry::all() {
        println!(
            "{:<16} {:<24} {:<10} {:<20} {}",
            d.name,
            d.path,
            d.primary_keys.join(","),
            d.replication_key.unwrap_or("-"),
            paging(d)
        );
    }
    Ok(())
}
