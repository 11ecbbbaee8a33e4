//! Taskboard server: mode composition, routing and HTTP serving.
//!
//! # Architecture
//!
//! ```text
//! Settings ──compose()──▶ Composition { mode, items, routes }
//!                                │
//! TcpListener ──http::serve()──▶ App::handle ──▶ RouteTable::resolve
//!                                                   │
//!                          ItemsCapability::Local(InstrumentedStore)
//!                          ItemsCapability::Delegated(RemoteClient)
//! ```
//!
//! | Mode | Items served by | UI |
//! |------|-----------------|----|
//! | `combined` | local store via the instrumented gateway | yes |
//! | `api-only` | local store via the instrumented gateway | no |
//! | `ui-proxy` | remote peer | yes |
//!
//! The composition is fixed for the life of the process. `/metrics` is served on
//! the main listener unless a separate metrics port is configured, in which case
//! that listener serves it alone.

mod compose;
mod dispatch;
mod health;
mod http;
mod routes;
mod ui;

pub use compose::{Composition, ItemsCapability, compose};
pub use dispatch::{ApiResponse, App, Surface, UNMATCHED_ROUTE};
pub use health::{VERSION, hostname};
pub use http::{MAX_BODY_BYTES, serve};
pub use routes::{Operation, Resolution, RouteTable};
