//! Converts the audio tracks of media files to AC3.
//!
//! For every file the streams are probed with ffprobe and a [`StreamPlan`]
//! decides, per audio and subtitle stream, whether it is dropped, copied or
//! re-encoded and which audio track becomes the default. ffmpeg only runs
//! when at least one track has to be converted.

pub mod classifier;
pub mod config;
pub mod discover;
pub mod error;
pub mod integration;
pub mod logging;
pub mod output;
pub mod plan;
pub mod probe;
pub mod processor;
pub mod stream;
pub mod tools;
pub mod transcode;

pub use config::PlanConfig;
pub use error::{Error, Result};
pub use plan::{build_plan, ConvertTarget, StreamPlan, TrackAction, TrackDirective};
pub use processor::{Outcome, ProcessOptions, Processor, SkipReason, Summary};
pub use stream::{MediaStreams, StreamDescriptor};
