use crate::error::ServerResult;
use crate::http::HttpContext;
use crate::middleware::Middleware;

/// Stamps every response with a server identification header and passes.
#[derive(Clone, Debug)]
pub struct ServerHeader {
    name: String,
    value: String,
}

impl ServerHeader {
    pub fn new(value: impl Into<String>) -> Self {
        Self::named("X-Server-Type", value)
    }

    pub fn named(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Middleware for ServerHeader {
    fn handle(&self, ctx: &mut HttpContext) -> ServerResult<bool> {
        ctx.response.header(&self.name, &self.value);
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Method, Request};

    #[test]
    fn sets_header_and_passes() {
        let mut ctx = HttpContext::new(Request::new(Method::GET, "/"));
        let handled = ServerHeader::new("stagehand (testonly)").handle(&mut ctx).unwrap();

        assert!(!handled);
        assert_eq!(
            ctx.response.get_header("X-Server-Type"),
            Some("stagehand (testonly)")
        );
    }
}
