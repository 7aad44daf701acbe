use ancs_proto::ProtocolError;

use crate::TransportError;

/// Non-fatal problems the engine reports and then carries on from
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("dropped packet: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("control point write for uid {uid} failed: {source}")]
    Write {
        uid: u32,
        #[source]
        source: TransportError,
    },

    #[error("control point write task for uid {uid} panicked")]
    WriteTaskPanicked { uid: u32 },
}
