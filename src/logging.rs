//! Logging initialization and the logger handed to requests.

use std::fmt;
use std::sync::Arc;

use env_logger::Env;

use crate::context::Context;

const LOG_TARGET: &str = "lazyreq";

/// Initialize logging with a default filter level.
pub fn init(default_filter: &str) {
    let env = Env::default().default_filter_or(default_filter);
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Sink for the messages a request emits while it runs.
pub trait Logger: Send + Sync {
    fn info(&self, ctx: &Context, message: fmt::Arguments<'_>);
    fn error(&self, ctx: &Context, message: fmt::Arguments<'_>);
}

/// Forwards to the `log` facade under the `lazyreq` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogLogger;

impl Logger for LogLogger {
    fn info(&self, _ctx: &Context, message: fmt::Arguments<'_>) {
        log::info!(target: LOG_TARGET, "{}", message);
    }

    fn error(&self, _ctx: &Context, message: fmt::Arguments<'_>) {
        log::error!(target: LOG_TARGET, "{}", message);
    }
}

/// Drops every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardLogger;

impl Logger for DiscardLogger {
    fn info(&self, _ctx: &Context, _message: fmt::Arguments<'_>) {}

    fn error(&self, _ctx: &Context, _message: fmt::Arguments<'_>) {}
}

pub fn default_logger() -> Arc<dyn Logger> {
    Arc::new(LogLogger)
}

pub fn discard_logger() -> Arc<dyn Logger> {
    Arc::new(DiscardLogger)
}

/// Lossy, length-capped rendering of a payload for log lines.
pub(crate) fn preview(bytes: &[u8]) -> String {
    const MAX: usize = 512;
    let text = String::from_utf8_lossy(&bytes[..bytes.len().min(MAX)]).into_owned();
    if bytes.len() > MAX {
        format!("{}...({} bytes)", text, bytes.len())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::preview;

    #[test]
    fn preview_truncates_long_payloads() {
        let long = vec![b'a'; 600];
        let out = preview(&long);
        assert!(out.ends_with("...(600 bytes)"));
        assert_eq!(preview(b"short"), "short");
    }
}
