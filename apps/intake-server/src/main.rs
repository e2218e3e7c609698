//! Intake demo server.
//!
//! A minimal hyper transport around the Intake engine: every request is
//! normalized with body decoding enabled and the resulting
//! [`ParsedRequest`](intake_core::ParsedRequest) is echoed back as JSON.
//! Uploaded files land under the engine's temp root.
//!
//! # Usage
//!
//! ```text
//! LISTEN=127.0.0.1:8080 intake-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LISTEN` | `127.0.0.1:8080` | Bind address |
//! | `INTAKE_TMP_DIR` | *(process temp dir)* | Root for stored uploads |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use http::{Response, StatusCode, header};
use http_body_util::Full;
use hyper::Request;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use intake_core::bridge::HttpBodyStream;
use intake_core::{BodyParser, DecodeError, InboundRequest, ParseOptions};

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Build a JSON response without going through the fallible builder.
fn json_response(status: StatusCode, body: Vec<u8>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response
}

/// Map a decode rejection to a response status.
fn status_for(error: &DecodeError) -> StatusCode {
    match error {
        DecodeError::MaxSizeExceeded { .. }
        | DecodeError::PartsLimit(_)
        | DecodeError::FieldsLimit(_)
        | DecodeError::FilesLimit(_) => StatusCode::PAYLOAD_TOO_LARGE,
        DecodeError::Stream(_) | DecodeError::Tokenizer(_) => StatusCode::BAD_REQUEST,
    }
}

/// Normalize one request and echo the result.
async fn handle(
    parser: Arc<BodyParser>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, std::convert::Infallible> {
    let (parts, body) = req.into_parts();
    let options = ParseOptions::builder().body(true).build();
    let stream = HttpBodyStream::new(body);

    let response = match parser
        .parse(InboundRequest::new(&parts, stream), &options)
        .await
    {
        Ok(parsed) => {
            debug!(method = %parts.method, path = %parts.uri.path(), "request normalized");
            let json = serde_json::to_vec(&parsed).unwrap_or_else(|_| b"{}".to_vec());
            json_response(StatusCode::OK, json)
        }
        Err(e) => {
            warn!(method = %parts.method, path = %parts.uri.path(), error = %e, "decode rejected");
            let json = serde_json::json!({"error": e.to_string()});
            json_response(status_for(&e), json.to_string().into_bytes())
        }
    };

    Ok(response)
}

/// Run the accept loop, serving connections until a shutdown signal arrives.
async fn serve(listener: TcpListener, parser: Arc<BodyParser>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let parser = Arc::clone(&parser);
                let service = service_fn(move |req| handle(Arc::clone(&parser), req));
                let conn = http.serve_connection(TokioIo::new(stream), service);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    init_tracing(&log_level)?;

    let parser = match std::env::var("INTAKE_TMP_DIR") {
        Ok(dir) => BodyParser::with_tmp_dir(dir),
        Err(_) => BodyParser::new(),
    };

    let listen = std::env::var("LISTEN").unwrap_or_else(|_| "127.0.0.1:8080".to_owned());
    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("invalid bind address: {listen}"))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, tmp_dir = %parser.tmp_dir().display(), "intake server listening");

    serve(listener, Arc::new(parser)).await
}
