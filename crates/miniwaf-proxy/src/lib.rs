//! MiniWAF Proxy
//!
//! HTTP front end for the MiniWAF inspection engine.
//!
//! Every application request passes through the WAF middleware before it
//! reaches a handler. Blocked requests receive `403` with the matched rule;
//! everything else is served by the built-in demo application or forwarded
//! to a configured upstream.

pub mod cli;
pub mod config;
pub mod middleware;
pub mod proxy;
pub mod routes;

pub use cli::Cli;
pub use config::ProxyConfig;
pub use proxy::{AppError, AppState};
pub use routes::create_router;
