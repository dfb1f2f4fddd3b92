//! Controller side of the kartoshka protocol.
//!
//! - `encoder` - commands to dispatcher invocations
//! - `decoder` - dispatcher output to stream items and a final outcome
//! - `runner` - the [`BackendPort`] seam and its process implementation
//! - `locate` - finding the dispatcher binary
//! - `session` - the [`Controller`] that runs work off the UI loop
//! - `view` - UI-owned state updated from [`UiEvent`]s

#![deny(unused_crate_dependencies)]

#[cfg(test)]
use tokio_test as _;

pub mod decoder;
pub mod encoder;
pub mod locate;
pub mod runner;
pub mod session;
pub mod view;

pub use decoder::{
    Completion, LineDecoder, ProcessExit, StreamItem, decode_buffered, resolve_outcome,
};
pub use encoder::{CommandEncoder, Invocation};
pub use locate::{BACKEND_BIN, LocateError, locate_backend};
pub use runner::{BackendPort, ProcessBackend, ProcessOutput};
pub use session::{Controller, DownloadDone, DownloadMode, Timeouts, UiEvent};
pub use view::{ButtonState, Notice, ViewState};
