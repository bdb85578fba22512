//! Cross-frame playback synchronization.
//!
//! The host page runs a [`SyncProducer`] beside the primary media element and
//! posts a sample into the secondary frame every sync tick. The secondary
//! frame runs a [`SyncConsumer`] that converges its own element on the most
//! recent sample. There is no acknowledgment: the channel heals by resending.

pub mod consumer;
pub mod origin;
pub mod producer;
pub mod protocol;

pub use consumer::{ApplyOutcome, PlayStep, SyncConsumer};
pub use origin::OriginAllowList;
pub use producer::SyncProducer;
pub use protocol::{ControlsReport, FrameMessage, SyncSample};
