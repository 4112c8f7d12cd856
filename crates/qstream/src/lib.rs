//! Decoding of binary event-stream chat responses into typed events.
//!
//! A response body arrives as arbitrarily chunked bytes. This crate cuts it into
//! length-prefixed frames, reads each frame's typed header block, and turns the
//! JSON payload into an [`event::Event`] selected by the `:event-type` header.
//!
//! # Crate Structure
//!
//! - [`frame`]: prelude, header block and checksum handling for single frames
//! - [`event`]: the typed event model, the classifier and the outbound request body
//! - [`decoder`]: the stateful stream assembler and its blocking and async adapters

/// Re-export frame types.
pub mod frame {
    pub use qstream_frame::*;
}

/// Re-export event types.
pub mod event {
    pub use qstream_event::*;
}

/// Re-export decoder types.
pub mod decoder {
    pub use qstream_decoder::*;
}
