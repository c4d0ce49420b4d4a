use crate::domain::framing::{FramingError, LineFramer};
use crate::interface_adapters::state::AppState;

use axum::{
    extract::{
        ConnectInfo, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::{SinkExt, Stream, StreamExt};
use std::{
    future::Future,
    io,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpStream, tcp::OwnedWriteHalf},
};
use tracing::{Instrument, debug, info, info_span, warn};

const READ_BUFFER_BYTES: usize = 8 * 1024;

#[derive(Debug)]
enum NetError {
    // Categorizes relay failures so the session can pick the close frame.
    Ws(axum::Error),
    UpstreamConnect(io::Error),
    UpstreamIo(io::Error),
    Framing(FramingError),
    BrowserClosedEarly,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

impl From<FramingError> for NetError {
    fn from(e: FramingError) -> Self {
        NetError::Framing(e)
    }
}

// Which side ended a healthy session.
#[derive(Debug)]
enum Teardown {
    BrowserClosed,
    UpstreamClosed,
}

#[derive(Debug, Default)]
struct RelayStats {
    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    dropped_before_upstream: u64,
    binary_dropped: u64,
}

fn next_conn_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    let upstream_addr = state.upstream_addr.clone();
    let max_line_bytes = state.max_line_bytes;
    ws.on_upgrade(move |socket| handle_socket(socket, peer, upstream_addr, max_line_bytes))
}

async fn handle_socket(
    socket: WebSocket,
    peer: SocketAddr,
    upstream_addr: Arc<str>,
    max_line_bytes: usize,
) {
    let conn_id = next_conn_id();
    let span = info_span!("relay", conn_id, %peer);
    relay_session(socket, upstream_addr, max_line_bytes)
        .instrument(span)
        .await;
}

async fn relay_session(mut socket: WebSocket, upstream_addr: Arc<str>, max_line_bytes: usize) {
    info!("browser connected");
    let mut stats = RelayStats::default();

    let connect = TcpStream::connect(&*upstream_addr);
    let upstream = match await_upstream(&mut socket, connect, &mut stats).await {
        Ok(stream) => {
            // Status lines are small and latency-sensitive.
            if let Err(e) = stream.set_nodelay(true) {
                debug!(error = %e, "failed to set TCP_NODELAY");
            }
            stream
        }
        Err(NetError::BrowserClosedEarly) => {
            info!("browser disconnected before upstream was ready");
            log_stats(&stats);
            return;
        }
        Err(e) => {
            warn!(error = ?e, upstream = %upstream_addr, "failed to reach upstream");
            let _ = send_close_with_reason(&mut socket, close_code::ERROR, "upstream unavailable")
                .await;
            log_stats(&stats);
            return;
        }
    };
    info!(upstream = %upstream_addr, "connected to upstream");

    match run_relay_loop(&mut socket, upstream, max_line_bytes, &mut stats).await {
        Ok(Teardown::BrowserClosed) => {
            info!("browser disconnected; upstream closed");
        }
        Ok(Teardown::UpstreamClosed) => {
            info!("upstream closed; closing browser connection");
            let _ = send_close_with_reason(&mut socket, close_code::NORMAL, "upstream closed")
                .await;
        }
        Err(NetError::Framing(e)) => {
            warn!(error = %e, "upstream framing error; dropping connection pair");
            let _ = send_close_with_reason(&mut socket, close_code::SIZE, "line too long").await;
        }
        Err(NetError::UpstreamIo(e)) => {
            warn!(error = %e, "upstream error; closing browser connection");
            let _ = send_close_with_reason(&mut socket, close_code::ERROR, "upstream error").await;
        }
        Err(e) => {
            warn!(error = ?e, "relay loop exited with error");
            if let Err(err) = socket.close().await {
                debug!(error = ?err, "socket close error");
            }
        }
    }

    log_stats(&stats);
}

// Drives `connect` while keeping the browser side serviced.
// Anything the browser sends before the upstream connection exists is dropped, not queued.
async fn await_upstream<S, C, T>(
    browser: &mut S,
    connect: C,
    stats: &mut RelayStats,
) -> Result<T, NetError>
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
    C: Future<Output = io::Result<T>>,
{
    tokio::pin!(connect);

    loop {
        tokio::select! {
            result = &mut connect => return result.map_err(NetError::UpstreamConnect),
            incoming = browser.next() => match incoming {
                Some(Ok(Message::Text(_) | Message::Binary(_))) => {
                    stats.dropped_before_upstream += 1;
                    warn!("upstream not connected; dropping browser message");
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => return Err(NetError::BrowserClosedEarly),
                Some(Err(e)) => return Err(NetError::Ws(e)),
            }
        }
    }
}

async fn run_relay_loop(
    socket: &mut WebSocket,
    upstream: TcpStream,
    max_line_bytes: usize,
    stats: &mut RelayStats,
) -> Result<Teardown, NetError> {
    let (mut tcp_read, mut tcp_write) = upstream.into_split();
    let mut framer = LineFramer::new(max_line_bytes);
    let mut buf = vec![0u8; READ_BUFFER_BYTES];

    loop {
        tokio::select! {
            // Browser -> upstream
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    stats.msgs_in += 1;
                    stats.bytes_in += text.len() as u64;
                    forward_to_upstream(&mut tcp_write, text.as_str()).await?;
                }
                Some(Ok(Message::Binary(_))) => {
                    stats.binary_dropped += 1;
                    warn!("binary frames are not part of the protocol; dropping");
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => {
                    end_upstream(&mut tcp_write).await;
                    return Ok(Teardown::BrowserClosed);
                }
                Some(Err(e)) => {
                    end_upstream(&mut tcp_write).await;
                    return Err(NetError::Ws(e));
                }
            },

            // Upstream -> browser
            read = tcp_read.read(&mut buf) => match read {
                Ok(0) => return Ok(Teardown::UpstreamClosed),
                Ok(n) => {
                    for line in framer.push(&buf[..n])? {
                        let len = line.len();
                        socket.send(Message::Text(line.into())).await?;
                        stats.msgs_out += 1;
                        stats.bytes_out += len as u64;
                    }
                }
                Err(e) => return Err(NetError::UpstreamIo(e)),
            },
        }
    }
}

async fn forward_to_upstream(tcp_write: &mut OwnedWriteHalf, text: &str) -> Result<(), NetError> {
    let mut line = String::with_capacity(text.len() + 1);
    line.push_str(text);
    line.push('\n');
    tcp_write
        .write_all(line.as_bytes())
        .await
        .map_err(NetError::UpstreamIo)
}

async fn end_upstream(tcp_write: &mut OwnedWriteHalf) {
    if let Err(e) = tcp_write.shutdown().await {
        debug!(error = %e, "upstream shutdown error");
    }
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

fn log_stats(stats: &RelayStats) {
    debug!(
        msgs_in = stats.msgs_in,
        msgs_out = stats.msgs_out,
        bytes_in = stats.bytes_in,
        bytes_out = stats.bytes_out,
        dropped_before_upstream = stats.dropped_before_upstream,
        binary_dropped = stats.binary_dropped,
        "connection stats"
    );
}
