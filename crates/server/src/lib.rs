//! Syslane Server
//!
//! Syslog receivers over UDP, TCP, TLS and Unix sockets.
//!
//! # Receive path
//!
//! ```text
//! socket → admission (streams) → session task → SyslogCodec frames
//!        → StructuredMessageParser → every EventHandler, in order
//! ```
//!
//! UDP datagrams carrying split markers are joined per peer before parsing.
//!
//! # Example
//!
//! ```ignore
//! let server = ServerDispatcher::new("tcp", ServerConfig::new(TransportKind::Tcp, "0.0.0.0", 1514))?;
//! let (handler, mut events) = ChannelEventHandler::new(1024);
//! server.add_handler(Arc::new(handler));
//! server.start().await?;
//!
//! while let Some(received) = events.recv().await {
//!     println!("{}: {}", received.session.peer, received.event.message);
//! }
//! ```

mod admission;
mod dispatcher;
mod error;
mod factory;
mod handler;
mod metrics;
mod session;

pub use admission::{Admission, SessionPermit};
pub use dispatcher::{ServerDispatcher, ServerState};
pub use error::{HandlerError, Result, ServerError};
pub use factory::{ServerRegistry, build_servers, create_server, shutdown_all, start_all};
pub use handler::{
    ChannelEventHandler, EventHandler, HandlerSet, ReceivedEvent, SessionInfo,
    TracingEventHandler,
};
pub use metrics::{ServerMetrics, ServerMetricsSnapshot};
pub use session::trim_trailing_newline;
