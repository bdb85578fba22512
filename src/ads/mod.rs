//! Inline video ad detection and neutralization.
//!
//! - `sentinel`: per media element Content/Ad state machine
//! - `overlay`: dimming canvas over ad-flagged elements
//! - `skip`: clicks skip affordances that are actually interactive
//! - `table`: identity-keyed side table the above store their state in

pub mod overlay;
pub mod sentinel;
pub mod skip;
pub mod table;

pub use sentinel::{AdSentinel, AdState, ScanMode, ScanReport};
pub use skip::SkipClicker;
pub use table::ElementTable;
