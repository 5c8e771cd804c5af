use std::{net::IpAddr, time::Duration};

use slping::{AddressError, PingError, ServerAddress};
use tokio::task::JoinSet;

use crate::structures::ServerReport;

#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub timeout: Duration,
    /// Look up `_minecraft._tcp` SRV records for addresses given without a port.
    pub srv: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum Failure {
    #[error("invalid address: {0}")]
    InvalidAddress(#[from] AddressError),
    #[error("{0}")]
    Ping(#[from] PingError),
}

async fn resolve(address: &str, options: Options) -> Result<ServerAddress, Failure> {
    let mut target = ServerAddress::parse(address)?;
    if !options.srv || target.explicit_port || target.host.parse::<IpAddr>().is_ok() {
        return Ok(target);
    }
    match tokio::time::timeout(options.timeout, slping::tokio::resolve_srv(&target.host)).await {
        Ok(Some((host, port))) => {
            target.host = host;
            target.port = port;
        }
        Ok(None) => {}
        Err(_) => debug!(address, "SRV lookup timed out"),
    }
    Ok(target)
}

pub async fn ping_java(address: &str, options: Options) -> Result<ServerReport, Failure> {
    let target = resolve(address, options).await?;
    let status = slping::tokio::ping(&target.host, target.port, options.timeout).await?;
    Ok(ServerReport::online(target.to_string(), status))
}

pub async fn ping_server(address: String, options: Options) -> ServerReport {
    match ping_java(&address, options).await {
        Ok(report) => report,
        Err(e) => {
            debug!(address, error = %e, "server offline");
            ServerReport::offline(address, &e)
        }
    }
}

/// Pings every address at once, one task each, returning reports in input
/// order.
pub async fn poll_all(addresses: Vec<String>, options: Options) -> Vec<ServerReport> {
    let mut pings = JoinSet::new();
    for (index, address) in addresses.iter().cloned().enumerate() {
        pings.spawn(async move { (index, ping_server(address, options).await) });
    }

    let mut reports: Vec<Option<ServerReport>> = vec![None; addresses.len()];
    while let Some(joined) = pings.join_next().await {
        match joined {
            Ok((index, report)) => reports[index] = Some(report),
            Err(e) => error!(error = %e, "ping task failed"),
        }
    }
    reports
        .into_iter()
        .zip(addresses)
        .map(|(report, address)| {
            report.unwrap_or_else(|| ServerReport::offline(address, &"ping task did not finish"))
        })
        .collect()
}
