//! Incremental decoding of event-stream response bodies.
//!
//! The transport hands over byte chunks whose boundaries have nothing to do with
//! frame boundaries. [`StreamAssembler`] buffers them, cuts out every complete
//! frame, classifies it, and hands back an ordered sequence of
//! `Result<Event, StreamError>`. Per-frame failures are yielded inline and the
//! stream carries on; only truncation at end-of-stream, usage errors and
//! transport failures are terminal.
//!
//! - [`StreamAssembler`]: push-style `feed` / `drain` / `finish`
//! - [`EventReader`]: blocking iterator over any `std::io::Read`
//! - `EventStream` / `EventStreamCodec`: async adapters (behind the `async` feature)

pub mod assembler;
#[cfg(feature = "async")]
pub mod codec;
pub mod config;
pub mod error;
pub mod reader;

pub use assembler::{AssemblerState, AssemblerStats, Drain, StreamAssembler};
#[cfg(feature = "async")]
pub use codec::{event_stream, EventStream, EventStreamCodec};
pub use config::{AssemblerConfig, DEFAULT_COMPACT_THRESHOLD, DEFAULT_INITIAL_CAPACITY};
pub use error::{Result, StreamError};
pub use reader::EventReader;

pub use qstream_event::Event;
pub use qstream_frame::FrameConfig;
