use std::{
    fmt,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use tokio::{
    io::{AsyncRead, AsyncWrite, BufStream},
    time,
};

use super::{AsyncPingable, transport};
use crate::{
    Java, PingError, PingOutcome, StatusSnapshot,
    java::decode,
    packet::{self, read_packet, write_packet},
    varint,
};

/// Protocol version sent in the handshake. Servers answer a status request
/// regardless of the version, and 0 marks it as not belonging to a real client.
const PROTOCOL_VERSION: u32 = 0;
/// Handshake `next_state` requesting the status phase.
const NEXT_STATE_STATUS: u32 = 1;

const HANDSHAKE_ID: u32 = 0x00;
const STATUS_ID: u32 = 0x00;
const PING_ID: u32 = 0x01;

/// How far a ping got before it finished.
#[allow(clippy::redundant_pub_crate)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Connecting,
    Connected,
    HandshakeSent,
    StatusRequested,
    StatusReceived,
    PingSent,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::HandshakeSent => "handshake sent",
            Self::StatusRequested => "status requested",
            Self::StatusReceived => "status received",
            Self::PingSent => "ping sent",
            Self::Done => "done",
        })
    }
}

/// Serverbound packets of the status exchange.
#[derive(Debug)]
enum Packet<'a> {
    Handshake {
        version: u32,
        host: &'a str,
        port: u16,
        next_state: u32,
    },
    Request,
    Ping {
        payload: i64,
    },
}

impl Packet<'_> {
    const fn id(&self) -> u32 {
        match self {
            Self::Handshake { .. } => HANDSHAKE_ID,
            Self::Request => STATUS_ID,
            Self::Ping { .. } => PING_ID,
        }
    }

    fn payload(&self) -> Result<Vec<u8>, PingError> {
        let mut buf = Vec::new();
        match self {
            Self::Handshake {
                version,
                host,
                port,
                next_state,
            } => {
                varint::write(&mut buf, *version);
                packet::write_string(&mut buf, host)?;
                buf.extend_from_slice(&port.to_be_bytes());
                varint::write(&mut buf, *next_state);
            }
            Self::Request => {}
            Self::Ping { payload } => buf.extend_from_slice(&payload.to_be_bytes()),
        }
        Ok(buf)
    }

    async fn send<S: AsyncWrite + Unpin>(&self, stream: &mut S) -> Result<(), PingError> {
        write_packet(stream, self.id(), &self.payload()?).await
    }
}

impl AsyncPingable for Java {
    type Response = StatusSnapshot;

    async fn ping(self) -> PingOutcome {
        let mut stage = Stage::Connecting;
        let outcome = within(self.timeout, async {
            let stream =
                transport::connect(&self.host, self.port, self.connect_timeout).await?;
            stage = Stage::Connected;
            exchange(stream, &self.host, self.port, &mut stage).await
        })
        .await;
        report(&self.host, self.port, stage, &outcome);
        outcome
    }
}

/// Runs the status exchange over an already connected stream.
///
/// `host` and `port` are only used for the handshake. The stream is dropped,
/// closing it, before this returns, including when `timeout` expires.
pub async fn ping_transport<S>(stream: S, host: &str, port: u16, timeout: Duration) -> PingOutcome
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut stage = Stage::Connected;
    let outcome = within(timeout, exchange(stream, host, port, &mut stage)).await;
    report(host, port, stage, &outcome);
    outcome
}

async fn within(
    deadline: Duration,
    fut: impl std::future::Future<Output = PingOutcome>,
) -> PingOutcome {
    time::timeout(deadline, fut)
        .await
        .unwrap_or(Err(PingError::TimedOut))
}

/// Handshake, status, then ping, strictly in that order on one connection.
async fn exchange<S>(stream: S, host: &str, port: u16, stage: &mut Stage) -> PingOutcome
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = BufStream::new(stream);

    Packet::Handshake {
        version: PROTOCOL_VERSION,
        host,
        port,
        next_state: NEXT_STATE_STATUS,
    }
    .send(&mut stream)
    .await?;
    *stage = Stage::HandshakeSent;
    debug!(host, port, "handshake sent");

    Packet::Request.send(&mut stream).await?;
    *stage = Stage::StatusRequested;
    debug!(host, port, "status request sent");

    let json = read_status(&mut stream).await?;
    *stage = Stage::StatusReceived;
    debug!(host, port, len = json.len(), "status response received");

    let latency_millis = ping_pong(&mut stream, stage).await?;
    debug!(host, port, latency_millis, "pong received");

    let status = decode(&json)?;
    *stage = Stage::Done;
    Ok(status.with_latency(latency_millis))
}

async fn read_status<S: AsyncRead + Unpin>(stream: &mut S) -> Result<String, PingError> {
    let response = read_packet(stream, true).await?;
    if response.id != STATUS_ID {
        return Err(PingError::malformed(format!(
            "expected status response, got packet {:#04x}",
            response.id
        )));
    }
    String::from_utf8(response.payload).map_err(|_| PingError::EncodingFailed)
}

/// Sends a ping and waits for its pong, returning the round trip in
/// milliseconds.
///
/// The echoed payload is not compared against the one sent, as some servers
/// rewrite it.
async fn ping_pong<S>(stream: &mut S, stage: &mut Stage) -> Result<u64, PingError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let start = Instant::now();
    Packet::Ping {
        payload: timestamp_millis(),
    }
    .send(stream)
    .await?;
    *stage = Stage::PingSent;

    let pong = read_packet(stream, false).await?;
    let latency = start.elapsed();
    if pong.id != PING_ID {
        return Err(PingError::malformed(format!(
            "expected pong, got packet {:#04x}",
            pong.id
        )));
    }
    let echo: [u8; 8] = pong.payload.as_slice().try_into().map_err(|_| {
        PingError::malformed(format!("pong payload is {} bytes, not 8", pong.payload.len()))
    })?;
    trace!(echo = i64::from_be_bytes(echo), "pong payload");

    Ok(u64::try_from(latency.as_millis()).unwrap_or(u64::MAX))
}

fn timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|since| i64::try_from(since.as_millis()).ok())
        .unwrap_or_default()
}

fn report(host: &str, port: u16, stage: Stage, outcome: &PingOutcome) {
    match outcome {
        Ok(status) => info!(
            host,
            port,
            version = %status.version.name,
            latency_millis = status.latency_millis,
            "ping succeeded"
        ),
        Err(PingError::TimedOut) => warn!(host, port, %stage, "ping timed out"),
        Err(e) => warn!(host, port, %stage, error = %e, "ping failed"),
    }
}
