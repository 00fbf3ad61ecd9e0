//! The session client: connect, authenticate, route, command.
//!
//! One [`SessionClient`] owns everything a connection needs — the
//! control channel, the fragment assembler, the H.264 decode session,
//! the coordinate mapper, the pending-request table, and the PTY view.
//! Inbound routing runs on a background task; decoded frames and stats
//! are published via `tokio::sync::watch` channels so the display
//! layer reads the latest values without blocking the routing loop.
//!
//! Teardown is total: once the channel closes (remotely or via
//! [`SessionClient::disconnect`]), the decode session is torn down,
//! fragment buffers are dropped, pending requests error out, and the
//! PTY view is cleared. No frame or PTY update is published afterwards.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::PalmError;
use crate::frame::{FragmentAssembler, FrameMessage};
use crate::map::{
    CoordinateMapper, FocusedWindow, Point, ScreenInfo, ViewTransform, ViewportSize,
};
use crate::protocol::{
    ControlMessage, DirEntry, InputAction, MouseButton, PendingRequests, PtySession, ResponseKind,
};
use crate::session::channel::{ChannelMessage, ControlChannel};
use crate::session::lifecycle::SessionPhase;
use crate::session::pairing::ConnectionInfo;
use crate::video::{DisplayImage, H264DecodeSession, VideoDecoder};

/// How long to wait for `auth_response` after sending `auth`.
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Deadline for type-correlated request/response exchanges.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

// ── Published state ──────────────────────────────────────────────

/// The latest displayable frame, whatever codec produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum VideoFrame {
    /// A self-contained JPEG straight off the wire.
    Jpeg(bytes::Bytes),
    /// Output of the H.264 decode session.
    Raster(DisplayImage),
}

/// Per-session frame statistics exposed to the UI.
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    /// Current smoothed frames per second.
    pub fps: f64,
    /// Total frames displayed since connect.
    pub total_frames: u64,
    /// Total binary bytes received from the channel.
    pub total_bytes: u64,
    /// Last raster frame width (0 for JPEG passthrough).
    pub width: u32,
    /// Last raster frame height.
    pub height: u32,
}

/// State shared between the command surface and the routing task.
struct SessionShared {
    phase: SessionPhase,
    mapper: CoordinateMapper,
    pending: PendingRequests,
    pty: PtySession,
}

fn lock(shared: &Arc<Mutex<SessionShared>>) -> MutexGuard<'_, SessionShared> {
    // A panic while holding the lock poisons it; the state itself is
    // still consistent, so keep going.
    shared.lock().unwrap_or_else(|e| e.into_inner())
}

// ── SessionClient ────────────────────────────────────────────────

/// An authenticated connection to a capture host.
pub struct SessionClient {
    tx: mpsc::Sender<ControlMessage>,
    shared: Arc<Mutex<SessionShared>>,
    frame_rx: watch::Receiver<Option<VideoFrame>>,
    stats_rx: watch::Receiver<FrameStats>,
    pty_rx: watch::Receiver<String>,
    router: JoinHandle<()>,
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient").finish_non_exhaustive()
    }
}

impl SessionClient {
    /// Connect, authenticate, and start routing inbound traffic.
    ///
    /// Fails with [`PalmError::AuthenticationFailed`] when the server
    /// rejects the token *or* closes the channel before answering —
    /// a relay that drops unauthorized clients without a reply still
    /// reads as an auth failure, not a generic disconnect.
    pub async fn connect<D>(
        info: &ConnectionInfo,
        device_name: &str,
        decoder: D,
    ) -> Result<Self, PalmError>
    where
        D: VideoDecoder + 'static,
    {
        let mut phase = SessionPhase::default();
        phase.begin_connect()?;

        info!(url = %info.url(), "opening control channel");
        let mut channel = match ControlChannel::connect(&info.url()).await {
            Ok(channel) => channel,
            Err(e) => {
                let _ = phase.fail(e.to_string());
                return Err(e);
            }
        };

        channel
            .send(ControlMessage::Auth {
                token: info.token().to_string(),
                device_name: device_name.to_string(),
                is_external: info.is_external(),
            })
            .await?;

        let screen = match Self::await_auth(&mut channel).await {
            Ok(screen) => screen,
            Err(e) => {
                let _ = phase.fail(e.to_string());
                return Err(e);
            }
        };
        phase.complete_auth()?;
        info!(screen = ?screen, "session authenticated");

        let mut mapper = CoordinateMapper::new();
        if let Some(screen) = screen {
            mapper.set_screen(screen);
        }
        let shared = Arc::new(Mutex::new(SessionShared {
            phase,
            mapper,
            pending: PendingRequests::new(),
            pty: PtySession::new(),
        }));

        let (frame_tx, frame_rx) = watch::channel(None);
        let (stats_tx, stats_rx) = watch::channel(FrameStats::default());
        let (pty_tx, pty_rx) = watch::channel(String::new());

        let (decode, decoded_rx) = H264DecodeSession::new(decoder);
        let (tx, inbound_rx) = channel.split();

        let router = tokio::spawn(route_inbound(
            inbound_rx,
            decode,
            decoded_rx,
            Arc::clone(&shared),
            frame_tx,
            stats_tx,
            pty_tx,
        ));

        Ok(Self {
            tx,
            shared,
            frame_rx,
            stats_rx,
            pty_rx,
            router,
        })
    }

    async fn await_auth(channel: &mut ControlChannel) -> Result<Option<ScreenInfo>, PalmError> {
        let wait = timeout(AUTH_TIMEOUT, async {
            loop {
                match channel.recv().await {
                    Some(ChannelMessage::Control(ControlMessage::AuthResponse {
                        success,
                        screen_info,
                    })) => {
                        return if success {
                            Ok(screen_info)
                        } else {
                            Err(PalmError::AuthenticationFailed)
                        };
                    }
                    Some(other) => {
                        debug!(?other, "message before auth_response, ignored");
                    }
                    // Closure while awaiting auth is an auth failure.
                    None => return Err(PalmError::AuthenticationFailed),
                }
            }
        })
        .await;
        match wait {
            Ok(result) => result,
            Err(_) => Err(PalmError::Timeout(AUTH_TIMEOUT)),
        }
    }

    // ── Observation ──────────────────────────────────────────────

    /// The current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        lock(&self.shared).phase.clone()
    }

    /// Latest displayable frame (`None` until the first frame, and
    /// again after teardown).
    pub fn frame_receiver(&self) -> watch::Receiver<Option<VideoFrame>> {
        self.frame_rx.clone()
    }

    /// Frame statistics.
    pub fn stats_receiver(&self) -> watch::Receiver<FrameStats> {
        self.stats_rx.clone()
    }

    /// The stripped PTY display buffer.
    pub fn pty_receiver(&self) -> watch::Receiver<String> {
        self.pty_rx.clone()
    }

    // ── Capture control ──────────────────────────────────────────

    pub async fn start_screen_share(&self) -> Result<(), PalmError> {
        self.send(ControlMessage::StartScreenShare).await
    }

    pub async fn stop_screen_share(&self) -> Result<(), PalmError> {
        self.send(ControlMessage::StopScreenShare).await
    }

    pub async fn start_webrtc(&self) -> Result<(), PalmError> {
        self.send(ControlMessage::StartWebrtc).await
    }

    pub async fn stop_webrtc(&self) -> Result<(), PalmError> {
        self.send(ControlMessage::StopWebrtc).await
    }

    /// Focus one window: fetch its geometry, crop the remote capture
    /// to it, and switch the mapper into focused mode with the initial
    /// zoom applied. Returns the window geometry.
    pub async fn enter_focus(&self, app: &str) -> Result<FocusedWindow, PalmError> {
        let window = self.window_info(app).await?;
        self.send(ControlMessage::SetCaptureRegion {
            x: window.x,
            y: window.y,
            width: window.width,
            height: window.height,
        })
        .await?;
        lock(&self.shared).mapper.enter_focus(window);
        Ok(window)
    }

    /// Back to full-screen capture and letterboxed mapping.
    pub async fn exit_focus(&self) -> Result<(), PalmError> {
        self.send(ControlMessage::ResetCaptureRegion).await?;
        lock(&self.shared).mapper.exit_focus();
        Ok(())
    }

    // ── Input ────────────────────────────────────────────────────

    /// Map a tap to remote coordinates and send a click.
    ///
    /// Returns `false` (without sending) when the mapper is not yet
    /// calibrated, so a tap before `screen_info` goes nowhere.
    pub async fn tap(&self, tap: Point, viewport: ViewportSize) -> Result<bool, PalmError> {
        self.pointer(InputAction::Click, tap, viewport, None).await
    }

    /// Map a pointer event to remote coordinates and send it.
    pub async fn pointer(
        &self,
        action: InputAction,
        at: Point,
        viewport: ViewportSize,
        button: Option<MouseButton>,
    ) -> Result<bool, PalmError> {
        let Some(remote) = lock(&self.shared).mapper.to_remote(at, viewport) else {
            debug!("pointer event before screen calibration, dropped");
            return Ok(false);
        };
        self.send(ControlMessage::Input {
            action,
            x: remote.x.round() as i64,
            y: remote.y.round() as i64,
            button,
        })
        .await?;
        Ok(true)
    }

    pub async fn press_key(&self, key: &str) -> Result<(), PalmError> {
        self.send(ControlMessage::PressKey {
            key: key.to_string(),
        })
        .await
    }

    pub async fn type_text(&self, text: &str) -> Result<(), PalmError> {
        self.send(ControlMessage::TypeText {
            text: text.to_string(),
        })
        .await
    }

    /// Map a remote cursor position back to viewport coordinates, for
    /// the synthetic cursor overlay.
    pub fn cursor_overlay(&self, remote: Point, viewport: ViewportSize) -> Option<Point> {
        lock(&self.shared).mapper.to_viewport(remote, viewport)
    }

    /// Replace the pan/zoom transform (gesture updates in focused mode).
    pub fn set_view_transform(&self, transform: ViewTransform) {
        lock(&self.shared).mapper.set_transform(transform);
    }

    /// Whether focused-window capture is active.
    pub fn is_focused(&self) -> bool {
        lock(&self.shared).mapper.is_focused()
    }

    // ── Queries ──────────────────────────────────────────────────

    pub async fn running_apps(&self) -> Result<Vec<String>, PalmError> {
        match self
            .request(ResponseKind::RunningApps, ControlMessage::ListApps)
            .await?
        {
            ControlMessage::RunningApps { apps } => Ok(apps),
            _ => Err(PalmError::ProtocolViolation("mismatched response kind")),
        }
    }

    pub async fn window_list(&self, app: &str) -> Result<Vec<String>, PalmError> {
        match self
            .request(
                ResponseKind::WindowList,
                ControlMessage::ListWindows {
                    app: app.to_string(),
                },
            )
            .await?
        {
            ControlMessage::WindowList { windows } => Ok(windows),
            _ => Err(PalmError::ProtocolViolation("mismatched response kind")),
        }
    }

    pub async fn tab_list(&self) -> Result<Vec<String>, PalmError> {
        match self
            .request(ResponseKind::TabList, ControlMessage::ListTabs)
            .await?
        {
            ControlMessage::TabList { tabs } => Ok(tabs),
            _ => Err(PalmError::ProtocolViolation("mismatched response kind")),
        }
    }

    pub async fn dir_listing(&self, path: &str) -> Result<Vec<DirEntry>, PalmError> {
        match self
            .request(
                ResponseKind::DirListing,
                ControlMessage::ListDir {
                    path: path.to_string(),
                },
            )
            .await?
        {
            ControlMessage::DirListing { entries, .. } => Ok(entries),
            _ => Err(PalmError::ProtocolViolation("mismatched response kind")),
        }
    }

    pub async fn window_info(&self, app: &str) -> Result<FocusedWindow, PalmError> {
        let response = self
            .request(
                ResponseKind::WindowInfo,
                ControlMessage::GetWindowInfo {
                    app: app.to_string(),
                },
            )
            .await?;
        response
            .as_window_info()
            .ok_or(PalmError::ProtocolViolation("mismatched response kind"))
    }

    /// Run a shell command on the host; `(success, output)`.
    pub async fn execute(&self, command: &str) -> Result<(bool, String), PalmError> {
        match self
            .request(
                ResponseKind::ExecuteResult,
                ControlMessage::Execute {
                    command: command.to_string(),
                },
            )
            .await?
        {
            ControlMessage::ExecuteResult { success, output } => Ok((success, output)),
            _ => Err(PalmError::ProtocolViolation("mismatched response kind")),
        }
    }

    async fn request(
        &self,
        kind: ResponseKind,
        msg: ControlMessage,
    ) -> Result<ControlMessage, PalmError> {
        let rx = lock(&self.shared).pending.register(kind);
        self.send(msg).await?;
        match timeout(RESPONSE_TIMEOUT, rx).await {
            Ok(Ok(response)) => Ok(response),
            // Slot overwritten by a re-send, or session torn down.
            Ok(Err(_)) => Err(PalmError::ChannelClosed),
            Err(_) => Err(PalmError::Timeout(RESPONSE_TIMEOUT)),
        }
    }

    // ── PTY ──────────────────────────────────────────────────────

    pub async fn pty_start(&self) -> Result<(), PalmError> {
        // Activate the local view first so a fast host's history and
        // output are not dropped by the inactive gate.
        lock(&self.shared).pty.start();
        self.send(ControlMessage::PtyStart).await?;
        Ok(())
    }

    pub async fn pty_stop(&self) -> Result<(), PalmError> {
        self.send(ControlMessage::PtyStop).await?;
        lock(&self.shared).pty.stop();
        Ok(())
    }

    /// Send raw bytes to the remote shell. Input goes up unstripped;
    /// only the display path is sanitized.
    pub async fn pty_input(&self, input: &str) -> Result<(), PalmError> {
        self.send(ControlMessage::PtyInput {
            input: input.to_string(),
        })
        .await
    }

    pub async fn pty_resize(&self, cols: u16, rows: u16) -> Result<(), PalmError> {
        self.send(ControlMessage::PtyResize { cols, rows }).await
    }

    // ── Teardown ─────────────────────────────────────────────────

    /// Disconnect and tear down everything this session owns.
    pub async fn disconnect(self) {
        {
            let mut shared = lock(&self.shared);
            if shared.phase.is_connected() {
                let _ = shared.phase.finish_disconnect();
            }
        }
        // Dropping the last outbound sender closes the writer task,
        // which sends a WebSocket close; the routing task then sees the
        // channel end and runs the shared teardown path.
        drop(self.tx);
        let mut router = self.router;
        if timeout(Duration::from_secs(2), &mut router).await.is_err() {
            warn!("routing task did not stop in time, aborting");
            router.abort();
        }
    }

    async fn send(&self, msg: ControlMessage) -> Result<(), PalmError> {
        self.tx.send(msg).await.map_err(Into::into)
    }
}

// ── Inbound routing ──────────────────────────────────────────────

async fn route_inbound<D: VideoDecoder>(
    mut inbound: mpsc::Receiver<ChannelMessage>,
    mut decode: H264DecodeSession<D>,
    mut decoded_rx: mpsc::Receiver<DisplayImage>,
    shared: Arc<Mutex<SessionShared>>,
    frame_tx: watch::Sender<Option<VideoFrame>>,
    stats_tx: watch::Sender<FrameStats>,
    pty_tx: watch::Sender<String>,
) {
    let mut assembler = FragmentAssembler::new();
    let mut stats = FrameStats::default();
    let mut fps_samples: Vec<Duration> = Vec::with_capacity(60);
    let mut last_frame = Instant::now();

    loop {
        tokio::select! {
            msg = inbound.recv() => {
                let Some(msg) = msg else { break };
                match msg {
                    ChannelMessage::Binary(data) => {
                        stats.total_bytes += data.len() as u64;
                        match FrameMessage::classify(data) {
                            Some(FrameMessage::Jpeg(payload)) => {
                                record_frame(&mut stats, &mut fps_samples, &mut last_frame);
                                let _ = frame_tx.send(Some(VideoFrame::Jpeg(payload)));
                                let _ = stats_tx.send(stats.clone());
                            }
                            Some(FrameMessage::H264(payload)) => decode.feed(&payload),
                            Some(FrameMessage::H264Fragment(frag)) => {
                                if let Some(complete) = assembler.insert(frag) {
                                    decode.feed(&complete);
                                }
                            }
                            None => debug!("unclassifiable binary message, dropped"),
                        }
                    }
                    ChannelMessage::Control(msg) => {
                        let unsolicited = lock(&shared).pending.resolve(msg);
                        if let Some(msg) = unsolicited {
                            handle_unsolicited(msg, &shared, &pty_tx);
                        }
                    }
                }
            }
            image = decoded_rx.recv() => {
                // The sender lives inside the decode session we own, so
                // this arm never yields None while the loop runs.
                if let Some(image) = image {
                    stats.width = image.width;
                    stats.height = image.height;
                    record_frame(&mut stats, &mut fps_samples, &mut last_frame);
                    let _ = frame_tx.send(Some(VideoFrame::Raster(image)));
                    let _ = stats_tx.send(stats.clone());
                }
            }
        }
    }

    // Channel is gone: total teardown, in one place.
    decode.teardown();
    assembler.clear();
    let _ = frame_tx.send(None);
    {
        let mut shared = lock(&shared);
        shared.pending.clear();
        shared.pty.clear();
        if shared.phase.is_connected() {
            // Loss of an established session is an ordinary disconnect.
            let _ = shared.phase.finish_disconnect();
        }
    }
    info!("session torn down");
}

fn handle_unsolicited(
    msg: ControlMessage,
    shared: &Arc<Mutex<SessionShared>>,
    pty_tx: &watch::Sender<String>,
) {
    match msg {
        ControlMessage::ScreenInfo { width, height } => {
            debug!(width, height, "screen recalibrated");
            lock(shared).mapper.set_screen(ScreenInfo { width, height });
        }
        ControlMessage::PtyOutput { output } => {
            let mut shared = lock(shared);
            shared.pty.push_output(&output);
            let _ = pty_tx.send(shared.pty.display().to_string());
        }
        ControlMessage::PtyHistory { history } => {
            let mut shared = lock(shared);
            shared.pty.push_history(&history);
            let _ = pty_tx.send(shared.pty.display().to_string());
        }
        ControlMessage::Unknown => debug!("unknown message type, ignored"),
        other => debug!(?other, "unsolicited message, ignored"),
    }
}

fn record_frame(stats: &mut FrameStats, fps_samples: &mut Vec<Duration>, last_frame: &mut Instant) {
    stats.total_frames += 1;

    let now = Instant::now();
    fps_samples.push(now.duration_since(*last_frame));
    *last_frame = now;
    if fps_samples.len() > 60 {
        fps_samples.remove(0);
    }
    let avg_secs: f64 =
        fps_samples.iter().map(|d| d.as_secs_f64()).sum::<f64>() / fps_samples.len() as f64;
    stats.fps = if avg_secs > 0.0 { 1.0 / avg_secs } else { 0.0 };
}
