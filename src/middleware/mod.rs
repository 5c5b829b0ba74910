mod generic_error;
mod not_found;
mod server_header;
mod static_files;

pub use generic_error::{ErrorLog, GenericError, TracingErrorLog};
pub use not_found::NotFound;
pub use server_header::ServerHeader;
pub use static_files::StaticFiles;

use crate::error::{ServerError, ServerResult};
use crate::http::HttpContext;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// One stage of the request chain.
///
/// `Ok(true)` means the stage produced the response and the walk stops,
/// `Ok(false)` passes to the next stage. An `Err` aborts the walk and hands
/// the context to the error stage.
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, ctx: &mut HttpContext) -> ServerResult<bool>;
}

impl<F> Middleware for F
where
    F: Fn(&mut HttpContext) -> ServerResult<bool> + Send + Sync + 'static,
{
    fn handle(&self, ctx: &mut HttpContext) -> ServerResult<bool> {
        (self)(ctx)
    }
}

#[derive(Clone, Default)]
pub(crate) struct MiddlewareManager {
    pub(crate) middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareManager {
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Arc::new(middleware));
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Walks the chain until a stage claims the request.
    ///
    /// Every stage runs at most once. A panicking stage is reported as
    /// [`ServerError::PanicError`] like any other failure.
    pub fn call(&self, ctx: &mut HttpContext) -> ServerResult<bool> {
        for middleware in &self.middlewares {
            if guarded(middleware.as_ref(), ctx)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

pub(crate) fn guarded(middleware: &dyn Middleware, ctx: &mut HttpContext) -> ServerResult<bool> {
    panic::catch_unwind(AssertUnwindSafe(|| middleware.handle(ctx)))
        .unwrap_or_else(|payload| Err(ServerError::PanicError(panic_message(payload))))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Method, Request};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ctx() -> HttpContext {
        HttpContext::new(Request::new(Method::GET, "/"))
    }

    struct Counted {
        calls: Arc<AtomicUsize>,
        handled: bool,
    }

    impl Middleware for Counted {
        fn handle(&self, _ctx: &mut HttpContext) -> ServerResult<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.handled)
        }
    }

    fn counted(handled: bool) -> (Counted, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Counted {
                calls: Arc::clone(&calls),
                handled,
            },
            calls,
        )
    }

    #[test]
    fn stops_at_first_handled_stage() {
        let (first, first_calls) = counted(false);
        let (second, second_calls) = counted(true);
        let (third, third_calls) = counted(true);

        let mut chain = MiddlewareManager::new();
        chain.add(first);
        chain.add(second);
        chain.add(third);

        assert!(chain.call(&mut ctx()).unwrap());
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn exhausted_chain_reports_unhandled() {
        let (stage, calls) = counted(false);
        let mut chain = MiddlewareManager::new();
        chain.add(stage);

        assert!(!chain.call(&mut ctx()).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn error_aborts_walk() {
        let (after, after_calls) = counted(true);
        let mut chain = MiddlewareManager::new();
        chain.add(|_: &mut HttpContext| -> ServerResult<bool> {
            Err(ServerError::InternalError("stage failed".into()))
        });
        chain.add(after);

        let err = chain.call(&mut ctx()).unwrap_err();
        assert!(matches!(err, ServerError::InternalError(_)));
        assert_eq!(after_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panics_become_errors() {
        let mut chain = MiddlewareManager::new();
        chain.add(|_: &mut HttpContext| -> ServerResult<bool> { panic!("stage exploded") });

        match chain.call(&mut ctx()) {
            Err(ServerError::PanicError(msg)) => assert_eq!(msg, "stage exploded"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn closures_can_mutate_response() {
        let mut chain = MiddlewareManager::new();
        chain.add(|ctx: &mut HttpContext| -> ServerResult<bool> {
            ctx.response.status(204);
            Ok(true)
        });

        let mut ctx = ctx();
        assert!(chain.call(&mut ctx).unwrap());
        assert_eq!(ctx.response.status_code(), 204);
        assert_eq!(chain.len(), 1);
    }
}
