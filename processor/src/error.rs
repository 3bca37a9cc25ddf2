//! Error taxonomy of the block processor.
//!
//! The kind decides what happens to the stream: `Decode` and `BlockHeight`
//! suppress the offending chain, `Connection`, `Commit` and `SourceClosed`
//! stop the processor, and `Invalid` only drops the current block.

use std::fmt;

use thiserror::Error;
use zonemap_store::StoreError;
use zonemap_types::ChainId;

use crate::decoder::DecodeError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A transaction of the block could not be decoded.
    Decode,
    /// The block is not the successor of the last committed height.
    BlockHeight,
    /// A persistence read failed or could not answer.
    Connection,
    /// The atomic commit of a block failed.
    Commit,
    /// The block or one of its messages is malformed.
    Invalid,
    /// The block source closed.
    SourceClosed,
}

impl ErrorKind {
    /// Errors that must stop the processing loop.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            ErrorKind::Connection | ErrorKind::Commit | ErrorKind::SourceClosed
        )
    }

    /// Errors after which the chain receives no further blocks until restart.
    pub fn suppresses_chain(self) -> bool {
        matches!(self, ErrorKind::Decode | ErrorKind::BlockHeight)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Decode => "decode",
            ErrorKind::BlockHeight => "block height",
            ErrorKind::Connection => "connection",
            ErrorKind::Commit => "commit",
            ErrorKind::Invalid => "invalid input",
            ErrorKind::SourceClosed => "source closed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
#[error("{kind} error: {message}")]
pub struct ProcessorError {
    kind: ErrorKind,
    chain_id: Option<ChainId>,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl ProcessorError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            chain_id: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_chain(mut self, chain_id: &ChainId) -> Self {
        self.chain_id = Some(chain_id.clone());
        self
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn chain_id(&self) -> Option<&ChainId> {
        self.chain_id.as_ref()
    }

    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }

    // ── Constructors per kind ───────────────────────────────────────────

    pub fn decode(chain_id: &ChainId, err: DecodeError) -> Self {
        Self::new(ErrorKind::Decode, err.to_string())
            .with_chain(chain_id)
            .with_source(err)
    }

    pub fn block_height(chain_id: &ChainId, expected: u64, got: u64) -> Self {
        Self::new(
            ErrorKind::BlockHeight,
            format!("expected height {expected}, got {got}"),
        )
        .with_chain(chain_id)
    }

    pub fn connection(chain_id: &ChainId, context: impl fmt::Display, err: StoreError) -> Self {
        Self::new(ErrorKind::Connection, format!("{context}: {err}"))
            .with_chain(chain_id)
            .with_source(err)
    }

    /// A gateway read succeeded but did not know the answer.
    pub fn unresolved(chain_id: &ChainId, context: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Connection, format!("{context}: not found")).with_chain(chain_id)
    }

    pub fn commit(chain_id: &ChainId, err: StoreError) -> Self {
        Self::new(ErrorKind::Commit, err.to_string())
            .with_chain(chain_id)
            .with_source(err)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Invalid, message)
    }

    pub fn source_closed() -> Self {
        Self::new(ErrorKind::SourceClosed, "block source closed")
    }
}
