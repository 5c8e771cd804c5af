//! Parsing of user-supplied server addresses.

use std::{fmt, net::Ipv6Addr, str::FromStr};

use crate::DEFAULT_PORT;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("no host was provided")]
    EmptyHost,
    #[error("invalid port `{0}`")]
    InvalidPort(String),
    #[error("unterminated `[` in address")]
    UnclosedBracket,
}

/// A host and port pair.
///
/// The address can be either an IP or a hostname, and both may optionally have
/// a port at the end. Bare IPv6 addresses are accepted, and must be bracketed
/// to carry a port.
///
/// ```text
/// test.server.com
/// test.server.com:19384
/// 13.212.76.209:23193
/// ::1
/// [2001:db8::1]:25566
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
    /// Whether the port came from the input rather than the default.
    pub explicit_port: bool,
}

impl ServerAddress {
    /// # Errors
    /// If the host is empty, a bracket is left open, or the port is not a `u16`.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let input = input.trim();

        let (host, port) = if let Some(rest) = input.strip_prefix('[') {
            let (host, after) = rest.split_once(']').ok_or(AddressError::UnclosedBracket)?;
            let port = match after {
                "" => None,
                _ => Some(
                    after
                        .strip_prefix(':')
                        .ok_or_else(|| AddressError::InvalidPort(after.to_owned()))?,
                ),
            };
            (host, port)
        } else if input.parse::<Ipv6Addr>().is_ok() {
            (input, None)
        } else {
            match input.rsplit_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (input, None),
            }
        };

        if host.is_empty() {
            return Err(AddressError::EmptyHost);
        }
        let explicit_port = port.is_some();
        let port = port
            .map(|p| p.parse().map_err(|_| AddressError::InvalidPort(p.to_owned())))
            .transpose()?
            .unwrap_or(DEFAULT_PORT);

        Ok(Self {
            host: host.to_owned(),
            port,
            explicit_port,
        })
    }
}

impl FromStr for ServerAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> (String, u16, bool) {
        let addr = ServerAddress::parse(input).unwrap();
        (addr.host, addr.port, addr.explicit_port)
    }

    #[test]
    fn hostnames() {
        assert_eq!(parse("mc.hypixel.net"), ("mc.hypixel.net".into(), 25565, false));
        assert_eq!(parse(" play.example.org:19384 "), ("play.example.org".into(), 19384, true));
    }

    #[test]
    fn ipv4() {
        assert_eq!(parse("13.212.76.209"), ("13.212.76.209".into(), 25565, false));
        assert_eq!(parse("13.212.76.209:23193"), ("13.212.76.209".into(), 23193, true));
    }

    #[test]
    fn ipv6() {
        assert_eq!(parse("::1"), ("::1".into(), 25565, false));
        assert_eq!(parse("2001:db8::1"), ("2001:db8::1".into(), 25565, false));
        assert_eq!(parse("[2001:db8::1]"), ("2001:db8::1".into(), 25565, false));
        assert_eq!(parse("[::1]:25566"), ("::1".into(), 25566, true));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(ServerAddress::parse(""), Err(AddressError::EmptyHost));
        assert_eq!(ServerAddress::parse(":25565"), Err(AddressError::EmptyHost));
        assert_eq!(ServerAddress::parse("[::1"), Err(AddressError::UnclosedBracket));
        assert_eq!(
            ServerAddress::parse("example.com:99999"),
            Err(AddressError::InvalidPort("99999".into()))
        );
        assert_eq!(
            ServerAddress::parse("example.com:"),
            Err(AddressError::InvalidPort(String::new()))
        );
        assert_eq!(
            ServerAddress::parse("[::1]25565"),
            Err(AddressError::InvalidPort("25565".into()))
        );
    }

    #[test]
    fn display_brackets_ipv6() {
        let v6 = ServerAddress::parse("::1").unwrap();
        assert_eq!(v6.to_string(), "[::1]:25565");
        let v4 = ServerAddress::parse("127.0.0.1:25566").unwrap();
        assert_eq!(v4.to_string(), "127.0.0.1:25566");
        assert_eq!("example.com".parse::<ServerAddress>().unwrap().to_string(), "example.com:25565");
    }
}
