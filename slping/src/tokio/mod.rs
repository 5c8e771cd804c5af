mod java;
mod transport;

use std::{sync::OnceLock, time::Duration};

use hickory_resolver::{
    TokioAsyncResolver,
    config::{ResolverConfig, ResolverOpts},
};

pub use java::ping_transport;

use crate::{Java, PingError, PingOutcome};

/// Represents a pingable entity.
pub trait AsyncPingable {
    /// The type of response that is expected in reply to the ping.
    type Response;

    /// Ping the entity, gathering the response and latency.
    fn ping(self) -> impl std::future::Future<Output = Result<Self::Response, PingError>> + Send;
}

/// Retrieve the status of a given Minecraft server using a `AsyncPingable` configuration.
///
/// # Examples
///
/// ```no_run
/// # async {
/// use std::time::Duration;
///
/// let status = slping::tokio::get_status(slping::Java {
///     host: "mc.hypixel.net".into(),
///     timeout: Duration::from_secs(3),
///     ..Default::default()
/// }).await?;
/// println!("{} ms", status.latency_millis);
/// # Ok::<(), slping::PingError>(())
/// # };
/// ```
///
/// # Errors
/// If the server status cannot be received
pub async fn get_status<P: AsyncPingable + Send>(pingable: P) -> Result<P::Response, PingError> {
    pingable.ping().await
}

/// Pings a Java server once, using `timeout` both to connect and as the
/// deadline for the whole exchange.
///
/// Each call opens and closes its own connection and shares no state with
/// other calls, so any number can run at once.
///
/// ```no_run
/// # async {
/// use std::time::Duration;
///
/// match slping::tokio::ping("127.0.0.1", 25565, Duration::from_secs(5)).await {
///     Ok(status) => println!("{} ({} ms)", status.version.name, status.latency_millis),
///     Err(e) => eprintln!("offline: {e}"),
/// }
/// # };
/// ```
pub async fn ping(host: &str, port: u16, timeout: Duration) -> PingOutcome {
    get_status(Java {
        host: host.to_owned(),
        port,
        connect_timeout: timeout,
        timeout,
    })
    .await
}

/// Looks up the `_minecraft._tcp` SRV record for `host`.
///
/// Returns the advertised target and port, or `None` if there is no usable
/// record.
pub async fn resolve_srv(host: &str) -> Option<(String, u16)> {
    let name = format!("_minecraft._tcp.{host}");
    let lookup = match resolver().srv_lookup(name.as_str()).await {
        Ok(lookup) => lookup,
        Err(e) => {
            debug!(host, error = %e, "no SRV record");
            return None;
        }
    };
    let record = lookup.iter().min_by_key(|srv| srv.priority())?;
    let target = record.target().to_utf8();
    let target = target.trim_end_matches('.');
    if target.is_empty() {
        return None;
    }
    debug!(host, target, port = record.port(), "resolved SRV record");
    Some((target.to_owned(), record.port()))
}

fn new_resolver() -> TokioAsyncResolver {
    TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
        warn!(error = %e, "could not read system DNS configuration, using cloudflare");
        let config = ResolverConfig::cloudflare();
        let mut opts = ResolverOpts::default();
        opts.cache_size = 64;
        opts.attempts = 3;
        TokioAsyncResolver::tokio(config, opts)
    })
}

pub fn resolver() -> &'static TokioAsyncResolver {
    static RESOLVER: OnceLock<TokioAsyncResolver> = OnceLock::new();
    RESOLVER.get_or_init(new_resolver)
}
