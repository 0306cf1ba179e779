use std::io::{BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use threadpool::ThreadPool;

use crate::context::Context;
use crate::request::{self, Request};
use crate::response::{Response, HTTP_404, HTTP_500};
use crate::router::{Route, RouteSet, RouteTable};
use crate::static_files::StaticFiles;
use crate::utils::Result;


const MODULE: &str = "SERVER";

pub const DEFAULT_WORKERS: usize = 50;


/// Server under configuration. Routes and static mounts are registered
/// through the builder surface, then `bind` seals them: the configuration
/// moves into an immutable shared structure and cannot change once the
/// listener exists.
pub struct HttpServer {
    routes: RouteTable,
    statics: StaticFiles,
    workers: usize,
}

impl HttpServer {
    pub fn new() -> HttpServer {
        HttpServer {
            routes: RouteTable::new(),
            statics: StaticFiles::new(),
            workers: DEFAULT_WORKERS,
        }
    }

    /// Fixed worker pool size; connections queue when all workers are busy.
    pub fn workers(mut self, workers: usize) -> HttpServer {
        self.workers = workers.max(1);
        self
    }

    pub fn route(
        mut self,
        path: &str,
        method: &str,
        handler: impl Fn(&Request) -> Response + Send + Sync + 'static,
    ) -> HttpServer {
        self.routes.register(Route::new(path, method), Box::new(handler));
        self
    }

    pub fn routes(mut self, set: impl RouteSet) -> HttpServer {
        for (route, handler) in set.routes() {
            self.routes.register(route, handler);
        }
        self
    }

    pub fn get(
        self,
        path: &str,
        handler: impl Fn(&Request) -> Response + Send + Sync + 'static,
    ) -> HttpServer {
        self.route(path, "GET", handler)
    }

    pub fn post(
        self,
        path: &str,
        handler: impl Fn(&Request) -> Response + Send + Sync + 'static,
    ) -> HttpServer {
        self.route(path, "POST", handler)
    }

    pub fn put(
        self,
        path: &str,
        handler: impl Fn(&Request) -> Response + Send + Sync + 'static,
    ) -> HttpServer {
        self.route(path, "PUT", handler)
    }

    pub fn delete(
        self,
        path: &str,
        handler: impl Fn(&Request) -> Response + Send + Sync + 'static,
    ) -> HttpServer {
        self.route(path, "DELETE", handler)
    }

    pub fn patch(
        self,
        path: &str,
        handler: impl Fn(&Request) -> Response + Send + Sync + 'static,
    ) -> HttpServer {
        self.route(path, "PATCH", handler)
    }

    pub fn head(
        self,
        path: &str,
        handler: impl Fn(&Request) -> Response + Send + Sync + 'static,
    ) -> HttpServer {
        self.route(path, "HEAD", handler)
    }

    pub fn options(
        self,
        path: &str,
        handler: impl Fn(&Request) -> Response + Send + Sync + 'static,
    ) -> HttpServer {
        self.route(path, "OPTIONS", handler)
    }

    /// Serve files under `directory` for request paths under `url_prefix`.
    /// Mounts match in registration order, first match wins; overlapping
    /// mounts are not rejected.
    pub fn static_files(mut self, url_prefix: &str, directory: &str) -> HttpServer {
        self.statics.mount(url_prefix, directory);
        self
    }

    /// Bind the listener and seal the configuration. Failure to bind is the
    /// only fatal error the server knows.
    pub fn bind(self, addr: impl ToSocketAddrs) -> Result<BoundServer> {
        if self.routes.is_empty() && self.statics.is_empty() {
            warn!("[{}] No routes or static mounts configured; every request will get a 404", MODULE);
        }

        let listener = TcpListener::bind(addr).map_err(|e| {
            error!("[{}] Could not bind listener: {}", MODULE, e);
            "bind error"
        })?;

        Ok(BoundServer {
            listener,
            shared: Arc::new(Shared { routes: self.routes, statics: self.statics }),
            workers: self.workers,
        })
    }
}

impl Default for HttpServer {
    fn default() -> Self {
        Self::new()
    }
}


/// Sealed route table and static mounts, shared read-only by all workers.
struct Shared {
    routes: RouteTable,
    statics: StaticFiles,
}

/// A server with a bound listener, ready to accept connections.
pub struct BoundServer {
    listener: TcpListener,
    shared: Arc<Shared>,
    workers: usize,
}

impl BoundServer {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop: every connection goes to the worker pool and is handled
    /// independently. Nothing a single connection does can take the loop
    /// down.
    pub fn serve(self) {
        let pool = ThreadPool::new(self.workers);
        match self.local_addr() {
            Ok(addr) => info!("[{}] Listening on {} with {} workers", MODULE, addr, self.workers),
            Err(_) => info!("[{}] Listening with {} workers", MODULE, self.workers),
        }

        for stream in self.listener.incoming() {
            match stream {
                Ok(client) => {
                    let shared = Arc::clone(&self.shared);
                    pool.execute(move || {
                        let mut ctx = Context::new();
                        handle_client(&client, &shared, &mut ctx);
                    });
                }
                Err(e) => {
                    warn!("[{}] Failed to accept connection: {}", MODULE, e);
                }
            }
        }
    }
}


/// Per-connection control flow: parse, route, handle, format, write, close.
/// Every failure collapses into a response on this connection; nothing
/// propagates to the accept loop.
fn handle_client(client: &TcpStream, shared: &Shared, ctx: &mut Context) {
    let mut reader = BufReader::new(client);

    let response = match request::parse(&mut reader) {
        Ok(request) => {
            info!(
                "[{}] New request [qid={}]: method: {}; path: {}",
                MODULE, ctx.qid, request.method, request.path
            );
            dispatch(&request, shared, ctx)
        }
        Err(e) => {
            warn!("[{}] Failed to parse request [qid={}]: {}", MODULE, ctx.qid, e);
            Response::new(HTTP_500).with_body("Internal Server Error")
        }
    };

    write_response(client, response, ctx);
}

/// Exact route lookup, then (for GET only) the static-mount fallback,
/// then a plain 404. A panicking handler becomes a 500.
fn dispatch(request: &Request, shared: &Shared, ctx: &Context) -> Response {
    if let Some(handler) = shared.routes.lookup(&request.path, &request.method) {
        return match catch_unwind(AssertUnwindSafe(|| handler(request))) {
            Ok(response) => response,
            Err(_) => {
                error!(
                    "[{}] Handler for {} {} panicked [qid={}]",
                    MODULE, request.method, request.path, ctx.qid
                );
                Response::new(HTTP_500).with_body("Internal Server Error")
            }
        };
    }

    if request.method.eq_ignore_ascii_case("GET") {
        if let Some(response) = shared.statics.serve(&request.path) {
            return response;
        }
    }

    Response::new(HTTP_404).with_body("Not Found")
}

/// Format and write, closing the connection unconditionally. The
/// `Content-Length` header is forced to the final body length first. A
/// failed write gets one best-effort 500 attempt before the connection is
/// abandoned.
fn write_response(client: &TcpStream, mut response: Response, ctx: &mut Context) {
    response.normalize_content_length();

    if let Err(e) = write_bytes(client, &response) {
        warn!("[{}] Failed to write response [qid={}]: {}", MODULE, ctx.qid, e);
        let mut fallback = Response::new(HTTP_500).with_body("Internal Server Error");
        fallback.normalize_content_length();
        if let Err(e) = write_bytes(client, &fallback) {
            error!("[{}] Failed to write fallback 500 [qid={}]: {}", MODULE, ctx.qid, e);
        }
        client.shutdown(Shutdown::Both).ok();
        return;
    }

    client.shutdown(Shutdown::Both).ok();
    ctx.fix();
    info!(
        "[{}] Respond [qid={}]: time: {}ms; status: {}; sent: {} bytes",
        MODULE,
        ctx.qid,
        ctx.time_ms(),
        response.status_code,
        response.body.len()
    );
}

/// Head and body go out as two separate writes so binary bodies are never
/// re-encoded.
fn write_bytes(mut client: &TcpStream, response: &Response) -> std::io::Result<()> {
    client.write_all(&response.format_head())?;
    if !response.body.is_empty() {
        client.write_all(&response.body)?;
    }
    client.flush()
}
