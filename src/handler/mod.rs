use crate::error::ServerResult;
use crate::http::{Request, Response};
use std::collections::HashMap;

/// Placeholder values captured by a route pattern, keyed by name.
pub type Params = HashMap<String, String>;

pub trait Handler: Send + Sync + 'static {
    fn handle(&self, req: &Request, res: &mut Response, params: &Params) -> ServerResult<()>;
}

impl<F> Handler for F
where
    F: Fn(&Request, &mut Response, &Params) -> ServerResult<()> + Send + Sync + 'static,
{
    fn handle(&self, req: &Request, res: &mut Response, params: &Params) -> ServerResult<()> {
        (self)(req, res, params)
    }
}
