pub(crate) mod context;
pub(crate) mod request;
pub(crate) mod response;

pub use context::HttpContext;
pub use request::{Method, Request};
pub use response::{reason_phrase, Response, Transport, WireWriter};
