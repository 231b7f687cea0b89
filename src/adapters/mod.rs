//! Infrastructure Adapters
//!
//! Implementations of the event publisher port. Engine adapters live in
//! [`crate::spdk`], transport adapters in [`crate::frontend`].

mod event_publisher;

pub use event_publisher::{InMemoryEventCollector, LoggingEventPublisher};
