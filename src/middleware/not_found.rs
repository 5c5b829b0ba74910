use crate::error::ServerResult;
use crate::http::HttpContext;
use crate::middleware::Middleware;

/// Catch-all stage placed last in the chain.
#[derive(Clone, Debug)]
pub struct NotFound {
    body: String,
}

impl Default for NotFound {
    fn default() -> Self {
        Self {
            body: "<h1>File Not Found</h1>".to_string(),
        }
    }
}

impl NotFound {
    pub fn with_body(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

impl Middleware for NotFound {
    fn handle(&self, ctx: &mut HttpContext) -> ServerResult<bool> {
        ctx.response.status(404).html(&self.body);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Method, Request};

    #[test]
    fn always_claims_with_404() {
        let mut ctx = HttpContext::new(Request::new(Method::GET, "/anything"));
        assert!(NotFound::default().handle(&mut ctx).unwrap());
        assert_eq!(ctx.response.status_code(), 404);
        assert_eq!(ctx.response.body(), b"<h1>File Not Found</h1>");
    }
}
