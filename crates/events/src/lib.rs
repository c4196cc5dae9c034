//! Event fan-out infrastructure for the queue service.
//!
//! - [`EventBus`] -- topic-addressed in-process publish/subscribe with a
//!   bounded channel per subscriber.
//! - [`WsEvent`] -- the `{"e": ..., "d": ...}` envelope delivered to
//!   WebSocket clients.
//! - [`topics`] -- the four visibility-scoped topic classes per queue.

pub mod bus;
pub mod event;
pub mod topics;

pub use bus::{EventBus, Subscription};
pub use event::WsEvent;
