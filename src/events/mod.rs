//! Event plumbing: event types, the single-writer store and the request
//! watchers that perform side effects.

mod store;
mod watchers;

pub mod runtime;
pub mod types;

pub use runtime::{Dispatcher, Runtime, RuntimeHandle};
pub use types::{Envelope, Event, RequestKind, Ticket};
