//! Routes served by the bundled binary.

use crate::error::{ServerError, ServerResult};
use crate::handler::Params;
use crate::http::{Request, Response};
use crate::router::Router;

/// `/`: a static greeting. `?err=1` makes it fail, which exercises the
/// error stage end to end.
pub fn index(req: &Request, res: &mut Response, _params: &Params) -> ServerResult<()> {
    if req.query_string("err", "0") == "1" {
        return Err(ServerError::InternalError("test error".to_string()));
    }
    res.html("<h1>Index</h1>");
    Ok(())
}

/// `/user/<name>`: greets the captured name.
pub fn user(_req: &Request, res: &mut Response, params: &Params) -> ServerResult<()> {
    let name = params.get("name").map(String::as_str).unwrap_or_default();
    res.html(format!("<h1>Hello, {}!</h1>", name));
    Ok(())
}

pub fn default_router() -> ServerResult<Router> {
    let mut router = Router::new();
    router.register("/", index)?.register("/user/<name>", user)?;
    Ok(router)
}
