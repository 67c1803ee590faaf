//! Single-flight throttle for keystone
//!
//! [`Throttle::throttle`] runs a worker at most once at a time per hash,
//! across every process sharing the underlying [`Lock`](keystone_lock::Lock).
//! The caller that takes the lock leads: it runs the worker, holds the lock
//! through a cooldown, then releases it and hands leadership to the oldest
//! queued waiter. Callers that find the lock held are rejected or queued
//! according to the [`QueuePolicy`].
//!
//! Within one process, callers arriving while a flight for their hash is
//! running or cooling down can join it instead and share its outcome.

mod flight;
mod options;
mod slot;
mod throttle;

pub use options::{QueuePolicy, ThrottleOptions};
pub use throttle::{Throttle, ThrottleBuilder};

pub use keystone_core::{Error, Result};
