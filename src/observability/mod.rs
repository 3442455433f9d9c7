//! Observability subsystem
//!
//! Structured JSON logging of a fixed set of events. Logging is synchronous,
//! has no side effects on execution and never fails the operation it reports.
//!
//! # Usage
//!
//! ```ignore
//! use treestore::observability::{Event, Logger};
//!
//! Logger::emit(Event::WriteComplete, &[("path", "/results"), ("leaves", "12")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};
