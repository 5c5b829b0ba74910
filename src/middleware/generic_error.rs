use crate::error::ServerResult;
use crate::http::HttpContext;
use crate::middleware::Middleware;
use std::sync::Arc;

/// Sink for failures recorded on a context.
pub trait ErrorLog: Send + Sync + 'static {
    fn error(&self, message: &str);
}

/// Forwards to `tracing` at error level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingErrorLog;

impl ErrorLog for TracingErrorLog {
    fn error(&self, message: &str) {
        tracing::error!(target: "stagehand::server", "{}", message);
    }
}

/// The error stage.
///
/// Runs outside the normal chain once a stage fails. It logs the recorded
/// failure, replaces whatever body was produced so far with a generic 500
/// page and always reports the request as handled. It never fails itself.
#[derive(Clone)]
pub struct GenericError {
    log: Arc<dyn ErrorLog>,
    body: String,
}

impl Default for GenericError {
    fn default() -> Self {
        Self::with_log(TracingErrorLog)
    }
}

impl GenericError {
    pub fn with_log(log: impl ErrorLog) -> Self {
        Self {
            log: Arc::new(log),
            body: "<h1>Internal Server Error</h1>".to_string(),
        }
    }
}

impl Middleware for GenericError {
    fn handle(&self, ctx: &mut HttpContext) -> ServerResult<bool> {
        if let Some(err) = &ctx.error {
            self.log.error(&err.to_string());
        }
        ctx.response.reset_body().status(500).html(&self.body);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerError;
    use crate::http::{Method, Request};
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Recorded(Arc<Mutex<Vec<String>>>);

    impl ErrorLog for Recorded {
        fn error(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn logs_and_replaces_body() {
        let log = Recorded::default();
        let stage = GenericError::with_log(log.clone());

        let mut ctx = HttpContext::new(Request::new(Method::GET, "/"));
        ctx.response.header("X-Server-Type", "t").html("<p>half done");
        ctx.error = Some(ServerError::InternalError("test error".into()));

        assert!(stage.handle(&mut ctx).unwrap());
        assert_eq!(ctx.response.status_code(), 500);
        assert_eq!(ctx.response.body(), b"<h1>Internal Server Error</h1>");
        assert_eq!(ctx.response.get_header("X-Server-Type"), Some("t"));
        assert_eq!(*log.0.lock().unwrap(), vec!["Internal error: test error"]);
    }

    #[test]
    fn nothing_logged_without_error() {
        let log = Recorded::default();
        let mut ctx = HttpContext::new(Request::new(Method::GET, "/"));

        assert!(GenericError::with_log(log.clone()).handle(&mut ctx).unwrap());
        assert_eq!(ctx.response.status_code(), 500);
        assert!(log.0.lock().unwrap().is_empty());
    }
}
