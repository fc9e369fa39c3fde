//! Tracking stream: provider input, per-tick mapping, consumer output

pub mod consumer;
pub mod provider;
pub mod tracking_loop;

pub use consumer::{EntityPose, PoseConsumer};
pub use provider::{demultiplex, PollRequest, ProviderError, RawSample, TrackingProvider, SAMPLE_STRIDE};
pub use tracking_loop::TrackingLoop;
