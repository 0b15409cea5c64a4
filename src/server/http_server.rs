//! HTTP server implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{RwLock, Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio::signal;
use log::{debug, info, warn, error};

use crate::parser::{HttpRequest, Method, find_header_end, parse_request, peek_content_length, peek_header};
use crate::server::config::ServerConfig;
use crate::server::error::Error;
use crate::server::handler::Route;
use crate::server::response::{HttpResponse, StatusCode};

/// An HTTP server.
pub struct HttpServer {
    /// The server configuration.
    pub config: ServerConfig,
    /// The routes.
    pub routes: Arc<RwLock<Vec<Route>>>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            routes: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Add a route to the server.
    ///
    /// Several routes may share a path as long as they answer different
    /// methods.
    pub async fn add_route<F, Fut>(&self, path: impl Into<String>, methods: Vec<Method>, handler: F)
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        let path = path.into();
        let handler = Arc::new(move |req: HttpRequest| -> Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>> {
            Box::pin(handler(req))
        });

        let route = Route {
            path,
            methods,
            handler,
        };

        self.routes.write().await.push(route);
    }

    /// Display the server banner and registered endpoints.
    async fn display_server_info(&self) {
        let banner = include_str!("../banner.txt");
        info!("\n{banner}");

        let routes = self.routes.read().await;
        info!("Registered endpoints:");
        for route in routes.iter() {
            let methods = route.methods.iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            info!("  {methods} {}", route.path);
        }
    }

    /// Set up a Ctrl+C handler for graceful shutdown.
    fn setup_ctrl_c_handler(shutdown_tx: mpsc::Sender<()>, tasks: &mut JoinSet<()>) {
        tasks.spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl+C, initiating graceful shutdown");
                    let _ = shutdown_tx.send(()).await;
                }
                Err(e) => {
                    error!("Error setting up Ctrl+C handler: {e}");
                }
            }
        });
    }

    /// Handle a new connection.
    async fn handle_new_connection(
        mut socket: TcpStream,
        addr: SocketAddr,
        semaphore: Arc<Semaphore>,
        routes: Arc<RwLock<Vec<Route>>>,
        config: ServerConfig,
        tasks: &mut JoinSet<()>,
    ) {
        let permit = match semaphore.try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Connection limit reached, rejecting connection from {addr}");
                let response = HttpResponse::new(StatusCode::ServiceUnavailable)
                    .with_content_type("text/plain")
                    .with_body_string("Server is at capacity, please try again later");
                let _ = socket.write_all(&response.to_bytes()).await;
                return;
            }
        };

        tasks.spawn(async move {
            // Released when the connection is done
            let _permit = permit;

            match Self::handle_connection(&mut socket, routes, &config).await {
                Ok(()) => {}
                Err(e) if e.status().is_client_error() => {
                    warn!("Rejected request from {addr}: {e}");
                }
                Err(e) => {
                    error!("Error handling connection from {addr}: {e}");
                }
            }
        });
    }

    /// Handle connection errors. Returns `true` if the accept loop should stop.
    async fn handle_connection_error(e: std::io::Error) -> bool {
        error!("Error accepting connection: {e}");

        if e.kind() == std::io::ErrorKind::BrokenPipe {
            error!("Critical error accepting connection, shutting down");
            return true;
        }

        // Back off before accepting again
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        false
    }

    /// Perform graceful shutdown.
    async fn perform_shutdown(tasks: &mut JoinSet<()>) {
        info!("Waiting for {len} active connections to complete...", len = tasks.len());
        let shutdown_timeout = tokio::time::Duration::from_secs(30);
        let drained = tokio::time::timeout(shutdown_timeout, async {
            while let Some(res) = tasks.join_next().await {
                if let Err(e) = res {
                    error!("Task failed during shutdown: {e}");
                }
            }
        }).await;

        if drained.is_err() {
            warn!("Shutdown timeout elapsed, aborting {len} connections", len = tasks.len());
            tasks.abort_all();
        }

        info!("Server shutdown complete");
    }

    /// Bind to the configured address and serve until Ctrl+C.
    pub async fn start(&self) -> Result<(), Error> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener until Ctrl+C.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), Error> {
        self.display_server_info().await;
        info!("Server listening on http://{addr}", addr = listener.local_addr()?);

        let semaphore = Arc::new(Semaphore::new(self.config.max_connections));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let mut tasks = JoinSet::new();

        Self::setup_ctrl_c_handler(shutdown_tx, &mut tasks);

        loop {
            tokio::select! {
                Some(()) = shutdown_rx.recv() => {
                    info!("Shutting down server...");
                    break;
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((socket, addr)) => {
                            debug!("Accepted connection from {addr}");
                            Self::handle_new_connection(
                                socket,
                                addr,
                                semaphore.clone(),
                                self.routes.clone(),
                                self.config.clone(),
                                &mut tasks,
                            ).await;
                        },
                        Err(e) => {
                            if Self::handle_connection_error(e).await {
                                break;
                            }
                        }
                    }
                }
            }

            // Reap finished connections so the set does not grow without bound
            while tasks.try_join_next().is_some() {}
        }

        Self::perform_shutdown(&mut tasks).await;

        Ok(())
    }

    /// Read one complete request into `buf`: the head, then as many body
    /// bytes as `Content-Length` declares.
    ///
    /// Leaves `buf` empty when the peer closed the connection without sending
    /// anything.
    async fn read_request(
        socket: &mut (impl AsyncRead + Unpin),
        buf: &mut Vec<u8>,
        config: &ServerConfig,
    ) -> Result<(), Error> {
        let mut chunk = vec![0; config.read_buffer_size];

        let head_end = loop {
            let n = socket.read(&mut chunk).await?;
            if n == 0 {
                // Peer closed mid-head; the parser decides what the bytes are worth
                return Ok(());
            }
            buf.extend_from_slice(&chunk[..n]);

            if let Some(end) = find_header_end(&buf[..]) {
                break end;
            }
            if buf.len() >= config.read_buffer_size {
                return Err(Error::HeaderTooLarge { limit: config.read_buffer_size });
            }
        };

        if let Some(expected) = peek_content_length(&buf[..head_end]) {
            if expected > config.max_body_size {
                return Err(Error::PayloadTooLarge { limit: config.max_body_size });
            }

            while buf.len() < head_end + expected {
                let n = socket.read(&mut chunk).await?;
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
        }

        Ok(())
    }

    /// Find the route for the request and run its handler.
    async fn dispatch(request: HttpRequest, routes: &RwLock<Vec<Route>>) -> Result<HttpResponse, Error> {
        let handler = {
            let routes = routes.read().await;
            let matching: Vec<&Route> = routes
                .iter()
                .filter(|route| route.matches_path(&request.path))
                .collect();

            if matching.is_empty() {
                return Err(Error::NotFound(request.path));
            }

            match matching.iter().find(|route| route.allows(request.method)) {
                Some(route) => route.handler.clone(),
                None => {
                    let allowed = matching
                        .iter()
                        .flat_map(|route| route.methods.iter().copied())
                        .collect();
                    return Err(Error::MethodNotAllowed {
                        method: request.method,
                        path: request.path,
                        allowed,
                    });
                }
            }
        };

        debug!("{method} {path}", method = request.method, path = request.path);
        handler(request).await
    }

    /// Handle a single connection: read one request, answer it, and report
    /// what went wrong, if anything.
    ///
    /// Every failure is also written to the client as a JSON error response,
    /// except I/O errors on the socket itself.
    pub async fn handle_connection(
        socket: &mut (impl AsyncRead + AsyncWrite + Unpin),
        routes: Arc<RwLock<Vec<Route>>>,
        config: &ServerConfig,
    ) -> Result<(), Error> {
        let mut raw = Vec::with_capacity(config.read_buffer_size);
        let read = tokio::time::timeout(config.read_timeout, Self::read_request(&mut *socket, &mut raw, config)).await;
        match read {
            Ok(Ok(())) if raw.is_empty() => return Ok(()),
            Ok(Ok(())) => {}
            Ok(Err(e @ Error::IoError(_))) => return Err(e),
            Ok(Err(e)) => return Self::reject(socket, &raw, config, e).await,
            Err(_) => {
                let e = Error::RequestTimeout { after: config.read_timeout };
                return Self::reject(socket, &raw, config, e).await;
            }
        }

        let request = match parse_request(&raw) {
            Ok(request) => request,
            Err(e) => return Self::reject(socket, &raw, config, Error::ParseError(e)).await,
        };

        if config.cors.is_preflight(&request) {
            let response = config.cors.preflight_response(&request);
            socket.write_all(&response.to_bytes()).await?;
            return Ok(());
        }

        let origin = request.get_header("Origin").cloned();
        let (response, outcome) = match Self::dispatch(request, &routes).await {
            Ok(response) => (response, Ok(())),
            Err(e) => (e.to_response(), Err(e)),
        };

        let response = config.cors.apply(origin.as_deref(), response);
        socket.write_all(&response.to_bytes()).await?;
        socket.flush().await?;

        outcome
    }

    /// Answer a request that failed before it could be routed.
    ///
    /// The head may be partial, so `Origin` is read straight from the bytes
    /// received so far.
    async fn reject(
        socket: &mut (impl AsyncWrite + Unpin),
        raw: &[u8],
        config: &ServerConfig,
        e: Error,
    ) -> Result<(), Error> {
        let response = config.cors.apply(peek_header(raw, "Origin"), e.to_response());
        socket.write_all(&response.to_bytes()).await?;
        socket.flush().await?;
        Err(e)
    }
}
