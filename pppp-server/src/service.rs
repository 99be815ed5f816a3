//! HTTP side of the bridge.
//!
//! A fan-out task copies frames from the session into a broadcast
//! channel; every `/stream` client subscribes to it. Clients that fall
//! behind skip the frames they missed instead of stalling the session.

use std::convert::Infallible;
use std::net::SocketAddr;

use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::header::{CACHE_CONTROL, CONTENT_TYPE, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use pppp_core::VideoFrame;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::mjpeg;

/// Path of the MJPEG endpoint.
pub const STREAM_PATH: &str = "/stream";

type ResponseBody = UnsyncBoxBody<Bytes, Infallible>;

// ── StreamServer ─────────────────────────────────────────────────

/// Fans session frames out to HTTP viewers.
pub struct StreamServer {
    frames: broadcast::Sender<VideoFrame>,
}

impl StreamServer {
    /// `capacity` frames are kept per viewer before it starts lagging.
    pub fn new(capacity: usize) -> Self {
        let (frames, _) = broadcast::channel(capacity.max(1));
        Self { frames }
    }

    /// Number of connected `/stream` viewers.
    pub fn viewers(&self) -> usize {
        self.frames.receiver_count()
    }

    /// Drain the session's frame queue into the broadcast channel until
    /// the queue closes or `cancel` fires.
    pub fn spawn_fanout(
        &self,
        mut frames: mpsc::Receiver<VideoFrame>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let tx = self.frames.clone();
        tokio::spawn(async move {
            loop {
                let frame = tokio::select! {
                    _ = cancel.cancelled() => break,
                    next = frames.recv() => match next {
                        Some(frame) => frame,
                        None => break,
                    },
                };

                let index = frame.index;
                if tx.send(frame).is_err() {
                    trace!(index, "no viewers, frame dropped");
                }
            }
            debug!("frame fan-out stopped");
        })
    }

    /// Accept HTTP connections until `cancel` fires, one task per
    /// connection.
    pub async fn serve(&self, listener: TcpListener, cancel: CancellationToken) {
        if let Ok(addr) = listener.local_addr() {
            info!("MJPEG stream on http://{addr}{STREAM_PATH}");
        }

        loop {
            let (stream, peer) = tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!("accept error: {e}");
                        continue;
                    }
                },
            };

            debug!("http client connected from {peer}");
            let frames = self.frames.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req| handle(req, peer, frames.clone()));
                let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);

                tokio::select! {
                    _ = cancel.cancelled() => debug!("closing connection from {peer}"),
                    result = conn => {
                        if let Err(e) = result {
                            debug!("error serving {peer}: {e}");
                        }
                    }
                }
            });
        }

        info!("HTTP server stopped");
    }
}

// ── Handlers ─────────────────────────────────────────────────────

async fn handle(
    req: Request<Incoming>,
    peer: SocketAddr,
    frames: broadcast::Sender<VideoFrame>,
) -> Result<Response<ResponseBody>, Infallible> {
    if req.method() != Method::GET || req.uri().path() != STREAM_PATH {
        debug!("{} {} from {peer}: not found", req.method(), req.uri().path());
        return Ok(not_found());
    }

    info!("viewer {peer} subscribed");
    Ok(stream_response(frames.subscribe()))
}

fn stream_response(frames: broadcast::Receiver<VideoFrame>) -> Response<ResponseBody> {
    let parts = BroadcastStream::new(frames).filter_map(|item| match item {
        Ok(frame) => Some(Ok::<_, Infallible>(Frame::data(mjpeg::encode_part(&frame)))),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            debug!(skipped, "viewer lagging, frames skipped");
            None
        }
    });

    let mut response = Response::new(StreamBody::new(parts).boxed_unsync());
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(mjpeg::CONTENT_TYPE));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

fn not_found() -> Response<ResponseBody> {
    let body = Full::new(Bytes::from_static(b"not found\n")).boxed_unsync();
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

// ── Tests ────────────────────────────────────────────────────────
