//! Application is the main entry point for stagehand.
//!
//! It owns the middleware chain and the error stage, dispatches one
//! [`HttpContext`] per request, and runs the TCP accept loop.
//!
//! # Examples
//!
//! ```no_run
//! use stagehand::app::Application;
//! use stagehand::middleware::{NotFound, ServerHeader};
//! use stagehand::routes::default_router;
//!
//! let mut app = Application::new();
//! app.middleware(ServerHeader::new("stagehand"))
//!     .middleware(default_router().unwrap())
//!     .middleware(NotFound::default());
//! app.listen("127.0.0.1:8080").unwrap();
//! ```

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::http::{reason_phrase, HttpContext, Method, Request, Response, Transport, WireWriter};
use crate::middleware::{self, GenericError, Middleware, MiddlewareManager, NotFound, ServerHeader, StaticFiles};
use crate::router::Router;
use std::collections::HashMap;
use std::future::Future;
use std::io::{self, ErrorKind};
use std::sync::Arc;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio::sync::Semaphore;

const MAX_HEADERS: usize = 100;
const MAX_LINE: usize = 65536;

#[derive(Clone)]
pub struct Application {
    pub max_connections: usize,
    middlewares: MiddlewareManager,
    on_error: Arc<dyn Middleware>,
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

impl Application {
    /// Creates an application with an empty chain and the default error
    /// stage.
    pub fn new() -> Self {
        Self {
            max_connections: 256,
            middlewares: MiddlewareManager::new(),
            on_error: Arc::new(GenericError::default()),
        }
    }

    /// Builds the standard chain: server header, routes, static files (when
    /// configured), then the not-found catch-all.
    pub fn from_config(config: &ServerConfig, router: Router) -> ServerResult<Self> {
        config.validate()?;
        let mut app = Self::new();
        app.max_connections(config.max_connections)
            .middleware(ServerHeader::new(config.server_header.clone()))
            .middleware(router);
        if let Some(dir) = &config.static_dir {
            app.middleware(StaticFiles::new(dir.clone()));
        }
        app.middleware(NotFound::default());
        Ok(app)
    }

    pub fn max_connections(&mut self, max_connections: usize) -> &mut Self {
        self.max_connections = max_connections;
        self
    }

    /// Appends a stage to the chain.
    pub fn middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.middlewares.add(middleware);
        self
    }

    /// Replaces the stage that runs when the chain fails.
    pub fn on_error(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.on_error = Arc::new(middleware);
        self
    }

    pub fn stages(&self) -> usize {
        self.middlewares.len()
    }

    /// Runs the chain for one request and sends the response exactly once.
    ///
    /// A failing stage stops the walk; the failure is stored on the context
    /// and the error stage takes over. Whatever the outcome, the response
    /// builder is sent afterwards, even when the error stage itself fails.
    pub fn dispatch(&self, ctx: &mut HttpContext, transport: &mut dyn Transport) -> io::Result<()> {
        match self.middlewares.call(ctx) {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(path = ctx.request.path(), "no stage handled the request");
            }
            Err(err) => {
                ctx.error = Some(err);
                if let Err(err) = middleware::guarded(self.on_error.as_ref(), ctx) {
                    tracing::warn!(error = %err, "error stage failed");
                }
            }
        }
        ctx.response.send(transport)
    }

    /// Dispatches `request` and returns the encoded HTTP response.
    pub fn respond(&self, request: Request) -> io::Result<Vec<u8>> {
        let mut ctx = HttpContext::new(request);
        let mut writer = WireWriter::new(Vec::new());
        self.dispatch(&mut ctx, &mut writer)?;
        tracing::debug!(
            path = ctx.request.path(),
            status = ctx.response.status_code(),
            "request served"
        );
        Ok(writer.into_inner())
    }

    /// Starts the HTTP server and blocks until Ctrl-C.
    ///
    /// # Arguments
    /// * `addr` - Address to listen on (e.g. "127.0.0.1:8080")
    pub fn listen(self, addr: &str) -> io::Result<()> {
        let runtime = Runtime::new()?;
        runtime.block_on(async {
            let listener = TcpListener::bind(addr).await?;
            self.serve(listener).await
        })
    }

    /// Accepts connections on `listener`, one task per connection, at most
    /// `max_connections` at a time, until Ctrl-C.
    pub async fn serve(self, listener: TcpListener) -> io::Result<()> {
        self.serve_with_shutdown(listener, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    }

    /// Like [`serve`](Self::serve), but stops when `shutdown` completes.
    ///
    /// Shutdown is observed while waiting for a free connection slot as well
    /// as while waiting for a new connection.
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            address = %listener.local_addr()?,
            max_connections = self.max_connections,
            "server listening"
        );
        let limit = Arc::new(Semaphore::new(self.max_connections));
        let app = Arc::new(self);
        tokio::pin!(shutdown);

        loop {
            let permit = tokio::select! {
                permit = Arc::clone(&limit).acquire_owned() => {
                    permit.map_err(|err| io::Error::new(ErrorKind::Other, err))?
                }
                _ = &mut shutdown => break,
            };

            let (stream, peer) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        tracing::warn!(error = %err, "accept failed");
                        continue;
                    }
                },
                _ = &mut shutdown => break,
            };

            let app = Arc::clone(&app);
            tokio::spawn(async move {
                if let Err(err) = Self::handle_connection(app, stream).await {
                    tracing::warn!(%peer, error = %err, "connection error");
                }
                drop(permit);
            });
        }

        tracing::info!("shutting down");
        Ok(())
    }

    async fn handle_connection<S>(app: Arc<Self>, mut stream: S) -> io::Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut buf_reader = BufReader::new(&mut stream);
        let bytes = match Self::read_request(&mut buf_reader).await {
            Ok(None) => return Ok(()),
            Ok(Some(request)) => {
                tracing::debug!(uri = request.target(), "request received");
                // Stages do blocking file I/O.
                tokio::task::spawn_blocking(move || app.respond(request))
                    .await
                    .map_err(|err| io::Error::new(ErrorKind::Other, err))??
            }
            Err(ServerError::IoError(err)) => return Err(err),
            Err(err) => {
                tracing::debug!(error = %err, "request rejected");
                Self::reject(&err)?
            }
        };

        stream.write_all(&bytes).await?;
        stream.shutdown().await
    }

    async fn read_request<R>(reader: &mut R) -> ServerResult<Option<Request>>
    where
        R: AsyncBufRead + Unpin,
    {
        let request_line = Self::read_line(reader)
            .await?
            .ok_or(ServerError::UriTooLong(MAX_LINE))?;
        if request_line.trim().is_empty() {
            return Ok(None);
        }

        let mut parts = request_line.split_whitespace();
        let (method, target) = match (parts.next(), parts.next()) {
            (Some(method), Some(target)) => (method, target),
            _ => {
                return Err(ServerError::ParseError(format!(
                    "bad request line {:?}",
                    request_line.trim()
                )))
            }
        };
        let method = match Method::from_string(method) {
            Some(Method::GET) => Method::GET,
            _ => return Err(ServerError::Unsupported(method.to_string())),
        };

        let mut headers = HashMap::new();
        loop {
            let line = Self::read_line(reader)
                .await?
                .ok_or_else(|| ServerError::HeadersTooLarge("header line too long".to_string()))?;
            if line.trim().is_empty() {
                break;
            }
            if headers.len() >= MAX_HEADERS {
                return Err(ServerError::HeadersTooLarge("too many headers".to_string()));
            }
            if let Some((key, value)) = line.split_once(':') {
                headers.insert(key.trim().to_lowercase(), value.trim().to_string());
            }
        }

        Ok(Some(Request::new(method, target).with_headers(headers)))
    }

    /// Reads one line without its terminator, decoding bytes as latin-1.
    ///
    /// End of input yields an empty line. `None` means the line ran past
    /// `MAX_LINE` bytes.
    async fn read_line<R>(reader: &mut R) -> io::Result<Option<String>>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut buf = Vec::new();
        (&mut *reader)
            .take(MAX_LINE as u64 + 1)
            .read_until(b'\n', &mut buf)
            .await?;
        if buf.len() > MAX_LINE {
            return Ok(None);
        }
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        Ok(Some(buf.iter().map(|&b| char::from(b)).collect()))
    }

    // Requests that never reach the chain get a bare status page.
    fn reject(err: &ServerError) -> io::Result<Vec<u8>> {
        let status = err.status_code();
        let mut response = Response::new(status);
        response.html(format!("<h1>{} {}</h1>", status, reason_phrase(status)));
        let mut writer = WireWriter::new(Vec::new());
        response.send(&mut writer)?;
        Ok(writer.into_inner())
    }
}
