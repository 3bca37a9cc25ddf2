//! [`tracing::Span`] constructors shared by the processor and the daemon.

use tracing::{info_span, Span};

/// Span covering the handling of a single block.
pub fn block_span(chain_id: &str, height: u64) -> Span {
    info_span!("block", chain = %chain_id, height)
}

/// Span covering the block source reader task.
pub fn source_span(input: &str) -> Span {
    info_span!("block_source", input = %input)
}
