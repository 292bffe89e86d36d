//! Price publishing to a transcoding node
//!
//! Features:
//! - One-time role discovery (orchestrator or broadcaster)
//! - Role-specific price endpoint
//! - Status-code based success, independent of the response body

pub mod address;
pub mod submitter;

pub use address::{node_address, DEFAULT_NODE_HOST, DEFAULT_NODE_PORT};
pub use submitter::{NodePublisher, Publisher, PublisherConfig};
