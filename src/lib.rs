//! # stagehand
//!
//! A small HTTP server built around an ordered chain of middleware stages.
//!
//! Each request gets an [`HttpContext`](http::HttpContext) that is handed to
//! the stages in order. A stage either claims the request (`Ok(true)`),
//! passes it on (`Ok(false)`) or fails (`Err`). The first claim ends the
//! walk; a failure diverts to the error stage. The response is written once,
//! after the walk, whatever happened.
//!
//! Bundled stages:
//!
//! - [`ServerHeader`](middleware::ServerHeader) stamps an identification
//!   header and passes
//! - [`Router`](router::Router) matches `<name>` placeholder patterns
//! - [`StaticFiles`](middleware::StaticFiles) serves a directory tree
//! - [`NotFound`](middleware::NotFound) is the 404 catch-all
//! - [`GenericError`](middleware::GenericError) is the default error stage
//!
//! ## Quick Start
//!
//! ```no_run
//! use stagehand::app::Application;
//! use stagehand::handler::Params;
//! use stagehand::http::{Request, Response};
//! use stagehand::middleware::NotFound;
//! use stagehand::router::Router;
//! use stagehand::ServerResult;
//!
//! fn hello(_req: &Request, res: &mut Response, params: &Params) -> ServerResult<()> {
//!     res.html(format!("<h1>Hello, {}!</h1>", params["name"]));
//!     Ok(())
//! }
//!
//! let mut router = Router::new();
//! router.register("/hello/<name>", hello).unwrap();
//!
//! let mut app = Application::new();
//! app.middleware(router).middleware(NotFound::default());
//! app.listen("127.0.0.1:8080").unwrap();
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod fs;
pub mod handler;
pub mod http;
pub mod middleware;
pub mod mime;
pub mod router;
pub mod routes;

pub use app::Application;
pub use error::{ServerError, ServerResult};
