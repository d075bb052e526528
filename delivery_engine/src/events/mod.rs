//! Fire-and-forget domain events.
//!
//! The order and payment APIs publish an event once their database work has committed. Subscribers (typically the
//! notification gateway wiring in the server) run on their own tasks and can never fail or roll back the operation
//! that produced the event.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
