use std::{
    io,
    net::{IpAddr, SocketAddr},
    time::Duration,
};

use tokio::{net::TcpStream, time};

use super::resolver;
use crate::PingError;

async fn lookup(host: &str, port: u16) -> Result<Vec<SocketAddr>, PingError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(vec![SocketAddr::new(ip, port)]);
    }
    let ips = resolver()
        .lookup_ip(host)
        .await
        .map_err(|e| PingError::ConnectionFailed(io::Error::other(e)))?;
    Ok(ips.iter().map(|ip| SocketAddr::new(ip, port)).collect())
}

/// Opens a TCP connection to `host:port`.
///
/// Resolved addresses are tried in order, each once, every attempt bounded by
/// `connect_timeout`.
pub(crate) async fn connect(
    host: &str,
    port: u16,
    connect_timeout: Duration,
) -> Result<TcpStream, PingError> {
    let addrs = lookup(host, port).await?;
    let mut last_err = None;
    for addr in addrs {
        match time::timeout(connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                // each packet goes out in a single write
                stream.set_nodelay(true)?;
                trace!(%addr, "connected");
                return Ok(stream);
            }
            Ok(Err(e)) => {
                debug!(%addr, error = %e, "connect failed");
                last_err = Some(e);
            }
            Err(_) => return Err(PingError::TimedOut),
        }
    }
    Err(PingError::ConnectionFailed(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, format!("{host} has no addresses"))
    })))
}
