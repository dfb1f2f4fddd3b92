//! The kartoshka dispatcher.
//!
//! A single-shot process: it parses one command from its arguments, runs it
//! through the downloading tool and writes JSON records to stdout, ending
//! with exactly one terminal record.

#![deny(unused_crate_dependencies)]

#[cfg(test)]
use tempfile as _;
#[cfg(test)]
use tokio_test as _;

pub mod args;
pub mod dispatcher;
pub mod gate;
pub mod logging;
pub mod sink;
pub mod source;
pub mod ytdlp;

pub use args::BackendArgs;
pub use dispatcher::{DispatchState, Dispatcher};
pub use gate::{ProgressGate, StreamFold};
pub use sink::RecordWriter;
pub use source::{DownloadRequest, MediaSource, SourceError, SourceEvent};
pub use ytdlp::YtDlpSource;
