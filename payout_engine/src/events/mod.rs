//! Engine events and the hooks that subscribe to them.
//!
//! Every successful state change in the payout workflow publishes one of the events in [`EventType`]. Hooks are
//! registered on [`EventHooks`], turned into running [`EventHandlers`], and fed by the [`EventProducers`] the
//! pipelines hold. Delivery is best-effort.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers, HookFuture};
