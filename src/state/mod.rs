//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PageStatus`: The outcome recorded for each page (success, failed, retrying)
//! - `HostState`: Per-host dispatch timing used to enforce the politeness delay
//! - `HostGate`: The shared host table checked before first attempts and retries

mod host_state;
mod page_status;

// Re-export main types
pub use host_state::{HostGate, HostState, HostTable};
pub use page_status::PageStatus;
