// crates/ytdlp/src/progress.rs
//! Progress-template output parsing.
//!
//! With `--newline`, yt-dlp renders `--progress-template` once per progress
//! tick as a single line. The template below makes each tick a
//! self-contained JSON object: the `j` conversion JSON-encodes every field,
//! so unknown values arrive as `null` and strings arrive quoted.

use clipfetch_core::FetchEvent;
use serde::Deserialize;

/// Template handed to `--progress-template`. The `download:` prefix scopes
/// it to download ticks; the rendered output is the bare JSON object.
pub const PROGRESS_TEMPLATE: &str = concat!(
    "download:",
    "{\"status\":%(progress.status)j,",
    "\"downloaded_bytes\":%(progress.downloaded_bytes)j,",
    "\"total_bytes\":%(progress.total_bytes)j,",
    "\"total_bytes_estimate\":%(progress.total_bytes_estimate)j,",
    "\"speed\":%(progress.speed)j,",
    "\"eta\":%(progress.eta)j}"
);

/// One rendered tick. Everything is optional and numeric fields are floats:
/// yt-dlp reports fractional byte counts for some extractors and `null` for
/// anything it does not know yet.
#[derive(Debug, Deserialize)]
struct ProgressLine {
    status: Option<String>,
    downloaded_bytes: Option<f64>,
    total_bytes: Option<f64>,
    total_bytes_estimate: Option<f64>,
    speed: Option<f64>,
    eta: Option<f64>,
}

/// Parse one stdout line into a [`FetchEvent`].
///
/// Returns `None` for anything that is not a progress tick; yt-dlp still
/// prints the occasional informational line even under `--quiet`.
pub fn parse_progress_line(line: &str) -> Option<FetchEvent> {
    let line = line.trim();
    if !line.starts_with('{') {
        return None;
    }
    let tick: ProgressLine = serde_json::from_str(line).ok()?;

    match tick.status.as_deref() {
        Some("finished") => Some(FetchEvent::Finished),
        Some("downloading") => {
            let total_bytes = tick
                .total_bytes
                .or(tick.total_bytes_estimate)
                .filter(|t| *t > 0.0)
                .map(|t| t as u64);
            Some(FetchEvent::Downloading {
                downloaded_bytes: tick.downloaded_bytes.unwrap_or(0.0).max(0.0) as u64,
                total_bytes,
                speed: tick.speed,
                eta_secs: tick.eta.filter(|e| *e >= 0.0).map(|e| e as u64),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn downloading_tick_parses_every_field() {
        let line = r#"{"status":"downloading","downloaded_bytes":52428800,"total_bytes":104857600,"total_bytes_estimate":null,"speed":1048576.0,"eta":50}"#;
        assert_eq!(
            parse_progress_line(line),
            Some(FetchEvent::Downloading {
                downloaded_bytes: 52_428_800,
                total_bytes: Some(104_857_600),
                speed: Some(1_048_576.0),
                eta_secs: Some(50),
            })
        );
    }

    #[test]
    fn estimate_fills_in_for_a_missing_total() {
        let line = r#"{"status":"downloading","downloaded_bytes":1000,"total_bytes":null,"total_bytes_estimate":4000.5,"speed":null,"eta":null}"#;
        assert_eq!(
            parse_progress_line(line),
            Some(FetchEvent::Downloading {
                downloaded_bytes: 1000,
                total_bytes: Some(4000),
                speed: None,
                eta_secs: None,
            })
        );
    }

    #[test]
    fn no_total_at_all_yields_none_total() {
        let line = r#"{"status":"downloading","downloaded_bytes":1000,"total_bytes":null,"total_bytes_estimate":null,"speed":null,"eta":null}"#;
        match parse_progress_line(line) {
            Some(FetchEvent::Downloading { total_bytes, .. }) => assert_eq!(total_bytes, None),
            other => panic!("expected downloading event, got {other:?}"),
        }
    }

    #[test]
    fn finished_tick_maps_to_finished() {
        let line = r#"{"status":"finished","downloaded_bytes":104857600,"total_bytes":104857600,"total_bytes_estimate":null,"speed":null,"eta":null}"#;
        assert_eq!(parse_progress_line(line), Some(FetchEvent::Finished));
    }

    #[test]
    fn informational_lines_are_skipped() {
        assert_eq!(parse_progress_line("[Merger] Merging formats into out.mp4"), None);
        assert_eq!(parse_progress_line("WARNING: unable to download thumbnail"), None);
        assert_eq!(parse_progress_line(""), None);
        // Valid JSON, but not a progress status we track.
        assert_eq!(parse_progress_line(r#"{"status":"error"}"#), None);
        // Broken JSON never panics.
        assert_eq!(parse_progress_line(r#"{"status":"downloading","#), None);
    }

    #[test]
    fn negative_eta_is_dropped() {
        let line = r#"{"status":"downloading","downloaded_bytes":10,"total_bytes":100,"total_bytes_estimate":null,"speed":null,"eta":-1}"#;
        match parse_progress_line(line) {
            Some(FetchEvent::Downloading { eta_secs, .. }) => assert_eq!(eta_secs, None),
            other => panic!("expected downloading event, got {other:?}"),
        }
    }

    #[test]
    fn template_requests_every_field_the_parser_reads() {
        for field in
            ["status", "downloaded_bytes", "total_bytes", "total_bytes_estimate", "speed", "eta"]
        {
            assert!(
                PROGRESS_TEMPLATE.contains(&format!("%(progress.{field})j")),
                "template missing {field}"
            );
        }
        assert!(PROGRESS_TEMPLATE.starts_with("download:"));
    }
}
