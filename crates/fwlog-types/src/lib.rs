//! Core types and traits for the firewall log analyzer.
//!
//! Records, query/response DTOs, and the seams (`GeoLookup`, `LogStore`) the
//! ingestion pipeline, stores, and HTTP layer are built against.

mod dto;
mod header;
mod record;
mod traits;

pub use dto::*;
pub use header::normalize_header;
pub use record::*;
pub use traits::*;
