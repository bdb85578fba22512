//! Reactive reconciliation loop.
//!
//! One mutation subscription plus one fixed timer per subsystem, each
//! calling a tick function that reconciles against the current page state.
//! Ticks are idempotent: running one twice with no intervening change does
//! nothing the second time.

pub mod reconciler;
pub mod role;
pub mod schedule;

#[cfg(not(target_arch = "wasm32"))]
pub mod driver;

pub use reconciler::Reconciler;
pub use role::AgentRole;
pub use schedule::{schedule, TimerKind};

#[cfg(not(target_arch = "wasm32"))]
pub use driver::{AgentDriver, PageEvent};
