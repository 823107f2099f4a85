// ABOUTME: Server address parsing for the SSH connection.
// ABOUTME: Parses formats like "host", "host:port" and "[v6addr]:port".

use super::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    /// Parse `server`, using `default_port` when it names no port.
    pub fn parse(server: &str, default_port: u16) -> Result<Self, ConfigError> {
        let s = server.trim();
        if s.is_empty() {
            return Err(ConfigError::MissingServer);
        }
        let invalid = |reason: &str| ConfigError::InvalidTarget {
            server: server.to_string(),
            reason: reason.to_string(),
        };

        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            // [v6addr] or [v6addr]:port
            let (host, after) = rest
                .split_once(']')
                .ok_or_else(|| invalid("missing closing ']'"))?;
            match after {
                "" => (host, None),
                _ => {
                    let port = after
                        .strip_prefix(':')
                        .ok_or_else(|| invalid("unexpected text after ']'"))?;
                    (host, Some(port))
                }
            }
        } else if s.matches(':').count() > 1 {
            // Bare IPv6 address, no port.
            (s, None)
        } else if let Some((host, port)) = s.rsplit_once(':') {
            (host, Some(port))
        } else {
            (s, None)
        };

        if host.is_empty() {
            return Err(invalid("hostname cannot be empty"));
        }

        let port = match port {
            Some(p) => p
                .parse::<u16>()
                .ok()
                .filter(|&p| p != 0)
                .ok_or_else(|| invalid(&format!("invalid port: {}", p)))?,
            None => default_port,
        };

        Ok(Target {
            host: host.to_string(),
            port,
        })
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
