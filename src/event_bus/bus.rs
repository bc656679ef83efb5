//! Event broadcasting from workflow components to sinks.
//!
//! Nodes, the LLM client, and tools emit [`Event`]s through a cloneable
//! [`Logger`] handle; a listener task drains the channel and fans events out
//! to the configured sinks. Each worker owns one bus so its log file is
//! isolated from its peers.

use tokio::task::JoinHandle;

use super::event::{Event, LogLevel};
use super::sink::EventSink;

/// Central event fan-out for one worker.
pub struct EventBus {
    tx: flume::Sender<Event>,
    rx: flume::Receiver<Event>,
    sinks: Option<Vec<Box<dyn EventSink>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_sinks(Vec::new())
    }
}

impl EventBus {
    #[must_use]
    pub fn with_sinks(sinks: Vec<Box<dyn EventSink>>) -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            tx,
            rx,
            sinks: Some(sinks),
        }
    }

    /// Cloneable emitter handle for this bus.
    #[must_use]
    pub fn logger(&self) -> Logger {
        Logger {
            tx: Some(self.tx.clone()),
        }
    }

    /// Spawn the listener task draining events into the sinks.
    ///
    /// The task ends once every [`Logger`] handle and the bus itself have
    /// been dropped; await the returned handle to flush before reading the
    /// log file.
    pub fn listen_for_events(&mut self) -> JoinHandle<()> {
        let rx = self.rx.clone();
        let mut sinks = self.sinks.take().unwrap_or_default();
        tokio::spawn(async move {
            while let Ok(event) = rx.recv_async().await {
                for sink in sinks.iter_mut() {
                    if let Err(err) = sink.handle(&event) {
                        tracing::warn!(sink = %sink.name(), error = %err, "event sink write failed");
                    }
                }
            }
        })
    }
}

/// Cloneable logging handle.
///
/// Emission is fire-and-forget: a disconnected bus (tests, disabled logging)
/// silently drops events.
#[derive(Clone, Default)]
pub struct Logger {
    tx: Option<flume::Sender<Event>>,
}

impl Logger {
    /// A logger that discards everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: Event) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                tracing::debug!("event bus disconnected; dropping event");
            }
        }
    }

    pub fn debug(&self, module: &str, message: impl Into<String>) {
        self.emit(Event::log(LogLevel::Debug, module, message));
    }

    pub fn info(&self, module: &str, message: impl Into<String>) {
        self.emit(Event::log(LogLevel::Info, module, message));
    }

    pub fn warning(&self, module: &str, message: impl Into<String>) {
        self.emit(Event::log(LogLevel::Warning, module, message));
    }

    pub fn error(&self, module: &str, message: impl Into<String>) {
        self.emit(Event::log(LogLevel::Error, module, message));
    }

    /// Raw streaming fragment; written to sinks without line formatting.
    pub fn fragment(&self, text: impl Into<String>) {
        let text = text.into();
        if !text.is_empty() {
            self.emit(Event::fragment(text));
        }
    }

    /// Close an open fragment run.
    pub fn stream_end(&self) {
        self.emit(Event::StreamEnd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::MemorySink;

    #[tokio::test]
    async fn events_reach_sinks_in_order() {
        let sink = MemorySink::new();
        let mut bus = EventBus::with_sinks(vec![Box::new(sink.clone())]);
        let logger = bus.logger();
        let handle = bus.listen_for_events();

        logger.info("test", "one");
        logger.fragment("two");
        logger.stream_end();
        drop(logger);
        drop(bus);
        handle.await.unwrap();

        let events = sink.snapshot();
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], Event::Log { message, .. } if message == "one"));
        assert!(matches!(&events[1], Event::Fragment { text } if text == "two"));
        assert!(matches!(events[2], Event::StreamEnd));
    }

    #[tokio::test]
    async fn disabled_logger_is_silent() {
        let logger = Logger::disabled();
        logger.info("test", "dropped");
        logger.fragment("dropped");
    }
}
