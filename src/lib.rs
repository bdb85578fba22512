//! nicofix: a page-resident agent for the Niconico watch page.
//!
//! Per watch session it decides whether the native player or the embedded
//! player in a cross-origin frame is shown, keeps the embedded player in
//! step with the native one over `postMessage`, and neutralizes inline
//! video ads in whichever document it runs in.
//!
//! The crate is written against the traits in [`dom`]; `wasm/page-agent`
//! binds them to the browser and [`reconcile::AgentDriver`] runs the loop
//! natively.

pub mod ads;
pub mod cache;
pub mod config;
pub mod decision;
pub mod dom;
pub mod error;
pub mod frame;
pub mod label;
pub mod locale;
pub mod metrics;
pub mod reconcile;
pub mod relocate;
pub mod session;
pub mod sync;

#[cfg(test)]
mod testing;

pub use config::AgentConfig;
pub use decision::Decision;
pub use dom::{MediaDom, Messenger, Page, PageDom};
pub use error::{AgentError, AgentResult};
pub use reconcile::{AgentRole, Reconciler, TimerKind};
pub use sync::FrameMessage;
