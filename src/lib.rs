//! lazyreq - a fluent HTTP request builder with deferred execution
//!
//! A [`Request`] collects configuration through chained setters and sends
//! itself the first time a result is demanded. It sends at most once, reads
//! the body at most once, and caches both, so every accessor can be called
//! repeatedly and from several tasks. Failures are returned as
//! [`Result`] values; the first one recorded sticks to the request.
//!
//! ```no_run
//! # async fn demo() -> lazyreq::Result<()> {
//! use std::time::Duration;
//!
//! let req = lazyreq::Request::get("https://httpbin.org/get")
//!     .with_query("a", "1")
//!     .with_timeout(Duration::from_secs(10));
//!
//! let status = req.status().await?;
//! let body = req.text().await?;
//! println!("{status}: {body}");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod cookies;
pub mod error;
pub mod exit_code;
pub mod http;
pub mod logging;
pub mod options;
pub mod query;
pub mod result;
pub mod session;
pub mod transport;
pub mod utils;

pub use context::Context;
pub use error::{LazyreqError, Result};
pub use http::{Request, ResponseHead};
pub use options::RequestOption;
pub use query::{Query, QueryValue, ToQuery};
pub use result::ResultExt;
pub use session::{Session, SessionRegistry};
pub use transport::{OutboundRequest, ReqwestTransport, Transport};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
