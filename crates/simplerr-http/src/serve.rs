//! The hyper-based development server.

use std::convert::Infallible;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use simplerr_core::{Config, Method, Request};
use tokio::net::TcpListener;

use crate::app::App;

/// Default bind address of the development server.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default port of the development server.
pub const DEFAULT_PORT: u16 = 3200;

/// Resolve the bind address: explicit values win, then the config's
/// `server_name`, then 127.0.0.1:3200.
pub fn resolve_addr(
    config: &Config,
    host: Option<&str>,
    port: Option<u16>,
) -> io::Result<SocketAddr> {
    let (name_host, name_port) = config.server_name_parts();
    let host = host
        .map(str::to_owned)
        .or(name_host)
        .unwrap_or_else(|| DEFAULT_HOST.to_owned());
    let port = port.or(name_port).unwrap_or(DEFAULT_PORT);

    (host.as_str(), port).to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("could not resolve {host}:{port}"),
        )
    })
}

/// Serve an application until ctrl-c.
pub async fn serve(app: Arc<App>, addr: SocketAddr) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{addr}");

    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                return Ok(());
            }
        };
        let (stream, peer) = accepted?;
        let app = Arc::clone(&app);

        tokio::spawn(async move {
            let service = service_fn(move |request| {
                let app = Arc::clone(&app);
                async move { Ok::<_, Infallible>(handle_connection(&app, request, peer).await) }
            });

            if let Err(err) = auto::Builder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                tracing::debug!("connection error from {peer}: {err}");
            }
        });
    }
}

async fn handle_connection(
    app: &App,
    request: hyper::Request<Incoming>,
    peer: SocketAddr,
) -> hyper::Response<Full<Bytes>> {
    let (parts, body) = request.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            tracing::debug!("failed to read request body from {peer}: {err}");
            Bytes::new()
        }
    };

    let is_head = parts.method == Method::HEAD;
    let request =
        Request::new(parts.method, parts.uri, parts.headers, body).with_remote_addr(peer);
    let response = app.handle(request).await;

    let (status, headers, body) = response.into_parts();
    // HEAD responses carry the GET headers but no body.
    let body = if is_head { Bytes::new() } else { body };

    let mut out = hyper::Response::new(Full::new(body));
    *out.status_mut() = status;
    *out.headers_mut() = headers;
    out
}
