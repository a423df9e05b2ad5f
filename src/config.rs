use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_BIND: &str = "0.0.0.0:5000";
pub const DEFAULT_OUTBOUND_BUFFER: usize = 64;

/// Process configuration, read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind: SocketAddr,
    /// Seed file of games to create at boot
    pub games_file: Option<PathBuf>,
    pub outbound_buffer: usize,
    pub remember_admin_secret: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            games_file: None,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
            remember_admin_secret: true,
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

impl Config {
    pub fn from_env() -> Self {
        let bind = match std::env::var("QUIZHALL_BIND") {
            Ok(v) => v.parse().unwrap_or_else(|e| {
                tracing::warn!("Invalid QUIZHALL_BIND '{}': {}, using {}", v, e, DEFAULT_BIND);
                default_bind()
            }),
            Err(_) => default_bind(),
        };

        let games_file = std::env::var("QUIZHALL_GAMES_FILE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let outbound_buffer = match std::env::var("QUIZHALL_OUTBOUND_BUFFER") {
            Ok(v) => match v.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    tracing::warn!(
                        "Invalid QUIZHALL_OUTBOUND_BUFFER '{}', using {}",
                        v,
                        DEFAULT_OUTBOUND_BUFFER
                    );
                    DEFAULT_OUTBOUND_BUFFER
                }
            },
            Err(_) => DEFAULT_OUTBOUND_BUFFER,
        };

        let remember_admin_secret = std::env::var("QUIZHALL_REMEMBER_ADMIN_SECRET")
            .map(|v| v != "0" && v.to_lowercase() != "false")
            .unwrap_or(true);

        let config = Self {
            bind,
            games_file,
            outbound_buffer,
            remember_admin_secret,
        };
        tracing::info!(
            bind = %config.bind,
            games_file = ?config.games_file,
            outbound_buffer = config.outbound_buffer,
            remember_admin_secret = config.remember_admin_secret,
            "Config loaded"
        );
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 4] = [
        "QUIZHALL_BIND",
        "QUIZHALL_GAMES_FILE",
        "QUIZHALL_OUTBOUND_BUFFER",
        "QUIZHALL_REMEMBER_ADMIN_SECRET",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        assert_eq!(Config::from_env(), Config::default());
    }

    #[test]
    #[serial]
    fn test_reads_overrides() {
        clear_env();
        std::env::set_var("QUIZHALL_BIND", "127.0.0.1:9000");
        std::env::set_var("QUIZHALL_GAMES_FILE", "/tmp/games.json");
        std::env::set_var("QUIZHALL_OUTBOUND_BUFFER", "8");
        std::env::set_var("QUIZHALL_REMEMBER_ADMIN_SECRET", "false");

        let config = Config::from_env();
        assert_eq!(config.bind, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.games_file, Some(PathBuf::from("/tmp/games.json")));
        assert_eq!(config.outbound_buffer, 8);
        assert!(!config.remember_admin_secret);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_values_fall_back() {
        clear_env();
        std::env::set_var("QUIZHALL_BIND", "not-an-address");
        std::env::set_var("QUIZHALL_OUTBOUND_BUFFER", "0");

        let config = Config::from_env();
        assert_eq!(config.bind, default_bind());
        assert_eq!(config.outbound_buffer, DEFAULT_OUTBOUND_BUFFER);
        clear_env();
    }
}
