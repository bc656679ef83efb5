//! Worker-scoped event bus: structured log events and raw streaming
//! fragments fanned out to pluggable sinks.

mod bus;
mod event;
mod sink;

pub use bus::{EventBus, Logger};
pub use event::{Event, LogLevel};
pub use sink::{EventSink, FileSink, JsonLinesSink, MemorySink, StdOutSink};
