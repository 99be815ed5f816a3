//! A PPPP session with one camera over a single UDP socket.
//!
//! Three background tasks share the socket:
//!
//! ```text
//!   socket ──recv──► read task ──(unbounded)──► dispatch task ──► frames (bounded)
//!     ▲                                              │
//!     └──────── beacons ── broadcast task            └──► punch echo / acks
//! ```
//!
//! The read task never waits on consumers. The dispatch task decrypts,
//! parses and answers every datagram, and feeds video packets to the
//! [`Reassembler`]. When the frame queue is full the dispatch task waits,
//! which also pauses keep-alive and ack replies until frames are drained.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::{Mutex, RwLock, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::builder::{alive_ack_frame, drw_ack_frame, drw_frame};
use crate::cipher::Cipher;
use crate::command::{Credentials, StreamRequest};
use crate::error::PpppError;
use crate::message::MessageType;
use crate::packet::{CONTROL_CHANNEL, Packet, VIDEO_CHANNEL};
use crate::signal::ReadySignal;
use crate::state::SessionPhase;
use crate::video::{ReassemblyStats, Reassembler, VideoFrame};

// ── Constants ────────────────────────────────────────────────────

/// UDP port cameras listen on for discovery beacons.
pub const PROBE_PORT: u16 = 32108;

/// Payload broadcast until the camera answers with a punch.
pub const DISCOVERY_BEACON: [u8; 4] = [0x2c, 0xba, 0x5f, 0x5d];

// ── SessionConfig ────────────────────────────────────────────────

/// Configuration for [`Session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Local endpoint to bind (port 0 = ephemeral).
    pub bind_addr: SocketAddr,
    /// Where discovery beacons are sent.
    pub broadcast_addr: SocketAddr,
    pub broadcast_interval: Duration,
    /// Deadline for the whole discovery + handshake sequence.
    pub connect_timeout: Duration,
    /// Per-read deadline of the receive loop.
    pub read_timeout: Duration,
    /// Size of the datagram receive buffer.
    pub recv_buffer_size: usize,
    /// Completed frames buffered before the dispatch task waits.
    pub frame_queue_capacity: usize,
    /// Send every DRW ack twice, like some deployed viewers do.
    pub duplicate_drw_ack: bool,
    pub credentials: Credentials,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            broadcast_addr: SocketAddr::from((Ipv4Addr::BROADCAST, PROBE_PORT)),
            broadcast_interval: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(5),
            recv_buffer_size: 2048,
            frame_queue_capacity: 100,
            duplicate_drw_ack: false,
            credentials: Credentials::default(),
        }
    }
}

// ── Shared state ─────────────────────────────────────────────────

/// Scalars touched by several tasks, all behind one lock.
#[derive(Debug, Default)]
struct Shared {
    remote_addr: Option<SocketAddr>,
    punch_count: u64,
    phase: SessionPhase,
}

struct SessionInner {
    socket: UdpSocket,
    cipher: Arc<dyn Cipher>,
    config: SessionConfig,
    shared: RwLock<Shared>,
    ready: ReadySignal,
    drw_sequence: AtomicU16,
    cancel: CancellationToken,
}

// ── Session ──────────────────────────────────────────────────────

/// A connected camera session.
///
/// Created by [`connect`](Self::connect), which only returns once the
/// device reported P2P-ready. Dropping the session stops its tasks;
/// [`close`](Self::close) additionally waits for them to finish.
pub struct Session {
    inner: Arc<SessionInner>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    frames: Option<mpsc::Receiver<VideoFrame>>,
    stats: watch::Receiver<ReassemblyStats>,
}

impl Session {
    /// Discover a camera and complete the punch handshake.
    ///
    /// 1. Binds the local socket and starts broadcasting beacons.
    /// 2. Echoes every punch back to its sender.
    /// 3. Returns once the device sends P2P-ready.
    ///
    /// Fails with [`PpppError::Timeout`] if that does not happen within
    /// `config.connect_timeout`; all tasks are stopped in that case.
    pub async fn connect(config: SessionConfig, cipher: Arc<dyn Cipher>) -> Result<Self, PpppError> {
        info!("initializing session");

        let socket = UdpSocket::bind(config.bind_addr).await?;
        socket.set_broadcast(true)?;
        info!("bound session socket to {}", socket.local_addr()?);

        let connect_timeout = config.connect_timeout;
        let (frame_tx, frame_rx) = mpsc::channel(config.frame_queue_capacity.max(1));
        let (stats_tx, stats_rx) = watch::channel(ReassemblyStats::default());
        let (datagram_tx, datagram_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(SessionInner {
            socket,
            cipher,
            config,
            shared: RwLock::new(Shared::default()),
            ready: ReadySignal::new(),
            drw_sequence: AtomicU16::new(0),
            cancel: CancellationToken::new(),
        });
        inner.shared.write().await.phase.begin_discovery()?;

        let tasks = vec![
            tokio::spawn(inner.clone().read_loop(datagram_tx)),
            tokio::spawn(inner.clone().broadcast_loop()),
            tokio::spawn(inner.clone().dispatch_loop(datagram_rx, frame_tx, stats_tx)),
        ];

        let session = Self {
            inner,
            tasks: Mutex::new(tasks),
            frames: Some(frame_rx),
            stats: stats_rx,
        };

        let outcome = tokio::time::timeout(connect_timeout, session.inner.ready.wait()).await;
        match outcome {
            Ok(()) => {
                info!("connection established");
                Ok(session)
            }
            Err(_) => {
                warn!("connection timed out after {connect_timeout:?}");
                if let Err(e) = session.inner.shared.write().await.phase.fail() {
                    debug!("could not mark session failed: {e}");
                }
                session.close().await;
                Err(PpppError::Timeout(connect_timeout))
            }
        }
    }

    /// Ask the camera to start streaming video.
    ///
    /// Returns as soon as the command is sent; frames arrive on the
    /// receiver from [`take_frames`](Self::take_frames).
    pub async fn request_video_stream(&self) -> Result<(), PpppError> {
        info!("requesting video stream from {:?}", self.remote_addr().await);
        let command = StreamRequest::new(&self.inner.config.credentials).to_command_frame()?;
        self.send_command(&command).await
    }

    /// Send a prepared command body on the control channel.
    pub async fn send_command(&self, command: &[u8]) -> Result<(), PpppError> {
        let frame = drw_frame(CONTROL_CHANNEL, self.inner.next_drw_index(), command);
        self.inner.send_encrypted(&frame).await
    }

    /// Take the receiver of completed video frames. Returns `None` after
    /// the first call.
    pub fn take_frames(&mut self) -> Option<mpsc::Receiver<VideoFrame>> {
        self.frames.take()
    }

    /// A `watch::Receiver` for reassembly counters.
    pub fn stats(&self) -> watch::Receiver<ReassemblyStats> {
        self.stats.clone()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.inner.shared.read().await.phase.clone()
    }

    /// Number of punch packets received so far.
    pub async fn punch_count(&self) -> u64 {
        self.inner.shared.read().await.punch_count
    }

    /// Sender of the most recent datagram.
    pub async fn remote_addr(&self) -> Option<SocketAddr> {
        self.inner.shared.read().await.remote_addr
    }

    pub fn local_addr(&self) -> Result<SocketAddr, PpppError> {
        Ok(self.inner.socket.local_addr()?)
    }

    /// Stop all background tasks and wait for them to exit.
    ///
    /// Safe to call more than once and on sessions that never connected.
    /// The socket itself is released when the session is dropped.
    pub async fn close(&self) {
        self.inner.cancel.cancel();

        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        for task in tasks {
            if let Err(e) = task.await {
                warn!("session task ended abnormally: {e}");
            }
        }

        let mut shared = self.inner.shared.write().await;
        match shared.phase.connected_duration() {
            Some(uptime) => info!("session closed after {uptime:?} connected"),
            None if !shared.phase.is_terminal() => info!("session closed"),
            None => {}
        }
        shared.phase.close();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.inner.cancel.cancel();
    }
}

// ── Background tasks ─────────────────────────────────────────────

impl SessionInner {
    /// Receive datagrams and hand them to the dispatch task.
    async fn read_loop(self: Arc<Self>, datagrams: mpsc::UnboundedSender<Bytes>) {
        let mut buf = vec![0u8; self.config.recv_buffer_size.max(1)];

        loop {
            let received = tokio::select! {
                _ = self.cancel.cancelled() => break,
                r = tokio::time::timeout(self.config.read_timeout, self.socket.recv_from(&mut buf)) => r,
            };

            let (len, from) = match received {
                // read deadline, nothing arrived
                Err(_) => continue,
                Ok(Err(e)) => {
                    warn!("error reading from UDP: {e}");
                    continue;
                }
                Ok(Ok(pair)) => pair,
            };

            self.shared.write().await.remote_addr = Some(from);

            if datagrams.send(Bytes::copy_from_slice(&buf[..len])).is_err() {
                break;
            }
        }

        debug!("read loop stopped");
    }

    /// Broadcast discovery beacons until the first punch arrives.
    async fn broadcast_loop(self: Arc<Self>) {
        let period = self.config.broadcast_interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if self.shared.read().await.punch_count > 0 {
                info!("punch received, stopping discovery broadcast");
                break;
            }

            match self
                .socket
                .send_to(&DISCOVERY_BEACON, self.config.broadcast_addr)
                .await
            {
                Ok(_) => trace!("sent discovery beacon to {}", self.config.broadcast_addr),
                Err(e) => warn!("failed to send discovery beacon: {e}"),
            }
        }

        debug!("broadcast loop stopped");
    }

    /// Decrypt, parse and answer every datagram.
    async fn dispatch_loop(
        self: Arc<Self>,
        mut datagrams: mpsc::UnboundedReceiver<Bytes>,
        frames: mpsc::Sender<VideoFrame>,
        stats: watch::Sender<ReassemblyStats>,
    ) {
        let mut reassembler = Reassembler::new();

        loop {
            let raw = tokio::select! {
                _ = self.cancel.cancelled() => break,
                next = datagrams.recv() => match next {
                    Some(raw) => raw,
                    None => break,
                },
            };

            let decrypted = self.cipher.decrypt(&raw);
            let packet = match Packet::parse(&decrypted) {
                Ok(p) => p,
                Err(e) => {
                    debug!("dropping datagram: {e}");
                    continue;
                }
            };
            trace!("received {packet}");

            let frame = self.handle_packet(&packet, &raw, &mut reassembler).await;

            if packet.is_video() {
                let current = reassembler.stats();
                stats.send_if_modified(|s| {
                    let changed = *s != current;
                    *s = current;
                    changed
                });
            }

            if let Some(frame) = frame {
                debug!(index = frame.index, len = frame.data.len(), "video frame complete");
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    sent = frames.send(frame) => {
                        if sent.is_err() {
                            trace!("frame receiver dropped, discarding frame");
                        }
                    }
                }
            }
        }

        debug!("dispatch loop stopped");
    }

    // ── Packet handlers ──────────────────────────────────────────

    async fn handle_packet(
        &self,
        packet: &Packet,
        raw: &[u8],
        reassembler: &mut Reassembler,
    ) -> Option<VideoFrame> {
        match packet.kind {
            Some(MessageType::Punch) => {
                self.on_punch(raw).await;
                None
            }
            Some(MessageType::P2pReady) => {
                self.on_ready().await;
                None
            }
            Some(MessageType::Alive) => {
                if let Err(e) = self.send_encrypted(&alive_ack_frame()).await {
                    warn!("failed to send alive ack: {e}");
                }
                None
            }
            Some(MessageType::Drw) => self.on_drw(packet, reassembler).await,
            Some(MessageType::DrwAck) => {
                debug!("received MSG_DRW_ACK for channel {}", packet.channel);
                None
            }
            Some(kind @ (MessageType::AliveAck | MessageType::Close)) => {
                debug!("received {kind}, nothing to do");
                None
            }
            None => {
                warn!("unknown packet type received: {:#04x}", packet.type_byte);
                None
            }
        }
    }

    async fn on_punch(&self, raw: &[u8]) {
        let count = {
            let mut shared = self.shared.write().await;
            shared.punch_count += 1;
            if matches!(shared.phase, SessionPhase::Discovering) && shared.phase.begin_handshake().is_ok() {
                info!("first punch received, handshaking with {:?}", shared.remote_addr);
            }
            shared.punch_count
        };
        debug!(count, "punch received");

        // Echoed verbatim, without re-encryption.
        if let Err(e) = self.send(raw).await {
            warn!("failed to send punch reply: {e}");
        }
    }

    async fn on_ready(&self) {
        {
            let mut shared = self.shared.write().await;
            if let Err(e) = shared.phase.complete_handshake() {
                debug!("P2P ready while {}: {e}", shared.phase);
            }
        }

        if self.ready.fire() {
            info!("device reported P2P ready");
        } else {
            debug!("P2P ready repeated, already notified");
        }
    }

    async fn on_drw(&self, packet: &Packet, reassembler: &mut Reassembler) -> Option<VideoFrame> {
        let ack = drw_ack_frame(packet.channel, packet.index);
        let copies = if self.config.duplicate_drw_ack { 2 } else { 1 };
        for _ in 0..copies {
            if let Err(e) = self.send_encrypted(&ack).await {
                warn!("failed to send DRW ack: {e}");
            }
        }

        if packet.channel == VIDEO_CHANNEL {
            reassembler.ingest(packet.index, packet.payload.clone())
        } else {
            debug!(
                channel = packet.channel,
                index = packet.index,
                len = packet.payload.len(),
                "control response"
            );
            None
        }
    }

    // ── Sending ──────────────────────────────────────────────────

    async fn send(&self, data: &[u8]) -> Result<(), PpppError> {
        let remote = self
            .shared
            .read()
            .await
            .remote_addr
            .ok_or(PpppError::NoRemoteAddress)?;
        self.socket.send_to(data, remote).await?;
        Ok(())
    }

    async fn send_encrypted(&self, data: &[u8]) -> Result<(), PpppError> {
        self.send(&self.cipher.encrypt(data)).await
    }

    /// Next outbound DRW index; wraps at 65536.
    fn next_drw_index(&self) -> u16 {
        self.drw_sequence.fetch_add(1, Ordering::Relaxed)
    }
}

// ── Tests ────────────────────────────────────────────────────────
