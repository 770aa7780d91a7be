//! # wporg Protocol
//!
//! Endpoint descriptors, schemas and record types for wporg.
//!
//! This crate provides:
//! - `EndpointDescriptor` describing one REST source
//! - `Schema` / `FieldType` for declared record shapes
//! - `RecordSelector` for locating records inside a response body
//! - `PageToken` and the `Pagination` strategy values
//! - `SyncRecord`, the envelope handed to output sinks
//!
//! This is a pure data crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod descriptor;
mod error;
mod record;
mod schema;
mod selector;
mod token;

pub use descriptor::{
    EndpointDescriptor, NormalizationRules, Pagination, ReplicationOrder, Reshape,
};
pub use error::{ProtocolError, ProtocolResult};
pub use record::{Record, SyncRecord};
pub use schema::{FieldType, Property, Schema};
pub use selector::{RecordSelector, Segment};
pub use token::PageToken;
