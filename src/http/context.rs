use crate::error::ServerError;
use crate::http::{Request, Response};

/// Everything one request carries through the middleware chain.
#[derive(Debug)]
pub struct HttpContext {
    pub request: Request,
    pub response: Response,
    pub error: Option<ServerError>,
}

impl HttpContext {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: Response::default(),
            error: None,
        }
    }
}
