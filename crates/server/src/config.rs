// crates/server/src/config.rs
//! Environment-driven server configuration.
//!
//! Every knob has a default so `clipfetch` starts with zero setup:
//!
//! | variable                       | default         |
//! |--------------------------------|-----------------|
//! | `CLIPFETCH_PORT` (then `PORT`) | `8754`          |
//! | `CLIPFETCH_DOWNLOAD_DIR`       | `./downloads`   |
//! | `CLIPFETCH_STATIC_DIR`         | `./static` if it exists |
//! | `CLIPFETCH_COOKIES`            | `./cookies.txt` |
//! | `CLIPFETCH_YTDLP_BIN`          | `yt-dlp`        |
//! | `CLIPFETCH_READY_TIMEOUT_SECS` | `90`            |

use std::path::PathBuf;
use std::time::Duration;

use clipfetch_core::{ReadinessProbe, DEFAULT_POLL_INTERVAL, DEFAULT_READY_TIMEOUT};

/// Default port for the server.
const DEFAULT_PORT: u16 = 8754;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Where finished artifacts land; created at startup if absent.
    pub download_dir: PathBuf,
    /// Frontend directory served for non-API paths. `None` runs API-only.
    pub static_dir: Option<PathBuf>,
    /// Netscape cookies file forwarded to the tool when present and
    /// non-empty.
    pub cookies_file: PathBuf,
    pub ytdlp_bin: PathBuf,
    /// Output-file readiness polling; only the timeout is env-tunable,
    /// for operators whose large merges outlive the default window.
    pub readiness: ReadinessProbe,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: parse_port(env("CLIPFETCH_PORT"), env("PORT")),
            download_dir: env("CLIPFETCH_DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("downloads")),
            static_dir: static_dir(env("CLIPFETCH_STATIC_DIR")),
            cookies_file: env("CLIPFETCH_COOKIES")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("cookies.txt")),
            ytdlp_bin: env("CLIPFETCH_YTDLP_BIN")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("yt-dlp")),
            readiness: ReadinessProbe::new(
                DEFAULT_POLL_INTERVAL,
                parse_ready_timeout(env("CLIPFETCH_READY_TIMEOUT_SECS")),
            ),
        }
    }
}

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_port(explicit: Option<String>, fallback: Option<String>) -> u16 {
    explicit
        .or(fallback)
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

fn parse_ready_timeout(raw: Option<String>) -> Duration {
    raw.and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_READY_TIMEOUT)
}

/// Explicit env override wins even if the directory is missing (the
/// operator asked for it); the `./static` convention only applies when it
/// actually exists.
fn static_dir(explicit: Option<String>) -> Option<PathBuf> {
    explicit.map(PathBuf::from).or_else(|| {
        let conventional = PathBuf::from("static");
        conventional.is_dir().then_some(conventional)
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn port_prefers_the_explicit_variable() {
        assert_eq!(parse_port(Some("9000".into()), Some("7000".into())), 9000);
        assert_eq!(parse_port(None, Some("7000".into())), 7000);
        assert_eq!(parse_port(None, None), DEFAULT_PORT);
    }

    #[test]
    fn unparseable_port_falls_back_to_default() {
        assert_eq!(parse_port(Some("not-a-port".into()), None), DEFAULT_PORT);
    }

    #[test]
    fn ready_timeout_parses_seconds() {
        assert_eq!(parse_ready_timeout(Some("120".into())), Duration::from_secs(120));
        assert_eq!(parse_ready_timeout(Some("nope".into())), DEFAULT_READY_TIMEOUT);
        assert_eq!(parse_ready_timeout(None), DEFAULT_READY_TIMEOUT);
    }

    #[test]
    fn explicit_static_dir_wins_even_when_missing() {
        assert_eq!(
            static_dir(Some("/opt/frontend".into())),
            Some(PathBuf::from("/opt/frontend"))
        );
    }
}
