// crates/ytdlp/src/lib.rs
//! yt-dlp adapter — spawns the `yt-dlp` binary and turns its progress
//! output into [`FetchEvent`]s.
//!
//! This is the only crate that knows yt-dlp exists. The argument builder
//! and the progress parser are plain functions so the interesting logic is
//! testable without the binary installed.

pub mod progress;

pub use progress::{parse_progress_line, PROGRESS_TEMPLATE};

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use clipfetch_core::{FetchError, FetchEvent, FetchRequest, MediaFetcher, MediaInfo, MediaKind};

/// Format selector for video: avc1 in mp4 with m4a audio preferred for
/// broad player compatibility, then any mp4 pair, then any single mp4.
const VIDEO_FORMAT: &str =
    "bv*[ext=mp4][vcodec^=avc1]+ba[ext=m4a]/bv*[ext=mp4]+ba[ext=m4a]/b[ext=mp4]";
const AUDIO_FORMAT: &str = "bestaudio/best";

/// Trailing stderr lines kept for error reporting.
const STDERR_TAIL: usize = 20;

/// Fetcher that shells out to yt-dlp.
///
/// Video requests merge into mp4; audio requests extract to 320K mp3.
/// Progress arrives on stdout as JSON lines (see [`PROGRESS_TEMPLATE`]).
pub struct YtDlpFetcher {
    binary: PathBuf,
    cookies_file: Option<PathBuf>,
}

impl Default for YtDlpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlpFetcher {
    pub fn new() -> Self {
        Self { binary: PathBuf::from("yt-dlp"), cookies_file: None }
    }

    /// Use a specific yt-dlp binary instead of whatever is on PATH.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Pass a Netscape-format cookies file to the tool. The file is only
    /// forwarded when it exists and is non-empty at invocation time, so a
    /// configured-but-absent path degrades to anonymous access.
    pub fn with_cookies_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cookies_file = Some(path.into());
        self
    }

    /// Tool version string, for the startup availability check.
    pub async fn version(&self) -> Result<String, FetchError> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| FetchError::SpawnFailed(format!("{}: {e}", self.binary.display())))?;

        if !output.status.success() {
            return Err(FetchError::Tool("--version exited non-zero".to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn usable_cookies(&self) -> Option<&Path> {
        let path = self.cookies_file.as_deref()?;
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > 0 => Some(path),
            _ => None,
        }
    }

    /// Full argument list for one download invocation.
    fn download_args(&self, request: &FetchRequest) -> Vec<String> {
        let mut args: Vec<String> = [
            "--no-playlist",
            "--newline",
            "--quiet",
            "--progress",
            "--progress-template",
            PROGRESS_TEMPLATE,
        ]
        .map(String::from)
        .into();

        if let Some(cookies) = self.usable_cookies() {
            args.push("--cookies".to_string());
            args.push(cookies.display().to_string());
        }

        match request.kind {
            MediaKind::Video => {
                args.extend(["-f", VIDEO_FORMAT, "--merge-output-format", "mp4"].map(String::from));
            }
            MediaKind::Audio => {
                args.extend(
                    ["-f", AUDIO_FORMAT, "-x", "--audio-format", "mp3", "--audio-quality", "320K"]
                        .map(String::from),
                );
            }
        }

        args.push("-o".to_string());
        args.push(
            request.dest_dir.join(format!("{}.%(ext)s", request.file_stem)).display().to_string(),
        );
        args.push(request.url.clone());
        args
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn probe(&self, url: &str) -> Result<MediaInfo, FetchError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["--no-playlist", "--skip-download", "-j"]);
        if let Some(cookies) = self.usable_cookies() {
            cmd.arg("--cookies").arg(cookies);
        }
        cmd.arg(url).stdin(Stdio::null());

        tracing::debug!(url, "yt-dlp probe: spawning");
        let output = cmd.output().await.map_err(|e| {
            tracing::error!(error = %e, "yt-dlp probe: failed to spawn");
            FetchError::SpawnFailed(e.to_string())
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(
                exit_code = ?output.status.code(),
                stderr = %clip_for_log(&stderr, 500),
                "yt-dlp probe: non-zero exit"
            );
            return Err(FetchError::Tool(tail_error(&stderr, output.status.code())));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let value: serde_json::Value = serde_json::from_str(stdout.trim())
            .map_err(|e| FetchError::ParseFailed(format!("invalid probe JSON: {e}")))?;

        Ok(MediaInfo {
            title: value["title"].as_str().map(str::to_string),
            thumbnail: value["thumbnail"].as_str().map(str::to_string),
        })
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        events: mpsc::UnboundedSender<FetchEvent>,
    ) -> Result<(), FetchError> {
        let args = self.download_args(request);
        tracing::info!(
            url = %request.url,
            kind = %request.kind,
            output = %request.expected_output().display(),
            "yt-dlp fetch: spawning"
        );

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Reap the tool if this job is dropped mid-download.
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!(error = %e, "yt-dlp fetch: failed to spawn");
                FetchError::SpawnFailed(e.to_string())
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FetchError::SpawnFailed("failed to capture stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| FetchError::SpawnFailed("failed to capture stderr".to_string()))?;

        // Drain stderr concurrently so a chatty tool can never block on a
        // full pipe; keep only the tail for error reporting.
        let stderr_task = tokio::spawn(async move {
            let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL);
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tail.len() == STDERR_TAIL {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            tail
        });

        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match parse_progress_line(&line) {
                // A closed channel means nobody is watching anymore; keep
                // draining so the tool still runs to completion.
                Some(event) => {
                    let _ = events.send(event);
                }
                None => tracing::trace!(line = %line, "yt-dlp: non-progress output"),
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| FetchError::SpawnFailed(format!("failed to wait for tool: {e}")))?;
        let tail: Vec<String> = stderr_task.await.unwrap_or_default().into();

        if !status.success() {
            let stderr_text = tail.join("\n");
            tracing::warn!(
                exit_code = ?status.code(),
                stderr = %stderr_text,
                "yt-dlp fetch: non-zero exit"
            );
            return Err(FetchError::Tool(tail_error(&stderr_text, status.code())));
        }

        tracing::debug!(url = %request.url, "yt-dlp fetch: tool exited cleanly");
        Ok(())
    }
}

/// Truncate stderr for logging without splitting a multi-byte character.
/// Tool output quotes video titles, so non-ASCII is the norm, not the
/// exception.
fn clip_for_log(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Pick the most useful failure line: the last `ERROR:` line if present,
/// else the last non-empty line, else the exit status.
fn tail_error(stderr: &str, code: Option<i32>) -> String {
    if let Some(line) = stderr.lines().rev().find(|l| l.trim_start().starts_with("ERROR:")) {
        return line.trim().to_string();
    }
    if let Some(line) = stderr.lines().rev().find(|l| !l.trim().is_empty()) {
        return line.trim().to_string();
    }
    match code {
        Some(code) => format!("tool exited with status {code}"),
        None => "tool terminated by signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    fn request(kind: MediaKind) -> FetchRequest {
        FetchRequest {
            url: "https://example.com/watch?v=abc".to_string(),
            kind,
            dest_dir: PathBuf::from("/tmp/dl"),
            file_stem: "stem123".to_string(),
        }
    }

    #[test]
    fn video_args_merge_into_mp4() {
        let args = YtDlpFetcher::new().download_args(&request(MediaKind::Video));

        let f = args.iter().position(|a| a == "-f").expect("-f present");
        assert_eq!(args[f + 1], VIDEO_FORMAT);
        assert!(args.windows(2).any(|w| w[0] == "--merge-output-format" && w[1] == "mp4"));
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args.contains(&"--newline".to_string()));
        assert_eq!(args.last(), Some(&"https://example.com/watch?v=abc".to_string()));
    }

    #[test]
    fn audio_args_extract_320k_mp3() {
        let args = YtDlpFetcher::new().download_args(&request(MediaKind::Audio));

        assert!(args.contains(&"-x".to_string()));
        assert!(args.windows(2).any(|w| w[0] == "--audio-format" && w[1] == "mp3"));
        assert!(args.windows(2).any(|w| w[0] == "--audio-quality" && w[1] == "320K"));
        assert!(!args.contains(&"--merge-output-format".to_string()));
    }

    #[test]
    fn output_template_lets_the_tool_pick_the_extension() {
        let args = YtDlpFetcher::new().download_args(&request(MediaKind::Video));
        let o = args.iter().position(|a| a == "-o").expect("-o present");
        assert_eq!(args[o + 1], "/tmp/dl/stem123.%(ext)s");
    }

    #[test]
    fn progress_template_is_wired_in() {
        let args = YtDlpFetcher::new().download_args(&request(MediaKind::Audio));
        let p = args.iter().position(|a| a == "--progress-template").expect("template flag");
        assert_eq!(args[p + 1], PROGRESS_TEMPLATE);
    }

    #[test]
    fn cookies_flag_requires_a_non_empty_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();

        // Empty file: not forwarded.
        let fetcher = YtDlpFetcher::new().with_cookies_file(file.path());
        assert!(!fetcher.download_args(&request(MediaKind::Audio)).contains(&"--cookies".to_string()));

        // Non-empty file: forwarded with its path.
        writeln!(file, "# Netscape HTTP Cookie File").unwrap();
        file.flush().unwrap();
        let args = fetcher.download_args(&request(MediaKind::Audio));
        let c = args.iter().position(|a| a == "--cookies").expect("--cookies present");
        assert_eq!(args[c + 1], file.path().display().to_string());
    }

    #[test]
    fn missing_cookies_file_is_ignored() {
        let fetcher = YtDlpFetcher::new().with_cookies_file("/definitely/not/here.txt");
        let args = fetcher.download_args(&request(MediaKind::Video));
        assert!(!args.contains(&"--cookies".to_string()));
    }

    #[test]
    fn log_clip_backs_off_to_a_char_boundary() {
        // A two-byte character straddling the limit must not split.
        let mut stderr = "a".repeat(499);
        stderr.push('é');
        let clipped = clip_for_log(&stderr, 500);
        assert_eq!(clipped.len(), 499);
        assert!(clipped.chars().all(|c| c == 'a'));

        // 'é' occupies bytes 1..3; a limit inside it lands before it.
        assert_eq!(clip_for_log("héllo", 2), "h");
        assert_eq!(clip_for_log("héllo", 3), "hé");
    }

    #[test]
    fn log_clip_keeps_short_strings_whole() {
        assert_eq!(clip_for_log("ERROR: Видео недоступно", 500), "ERROR: Видео недоступно");
        assert_eq!(clip_for_log("", 500), "");
    }

    #[test]
    fn tail_error_prefers_the_last_error_line() {
        let stderr = "WARNING: slow connection\nERROR: Video unavailable\nsome trailer";
        assert_eq!(tail_error(stderr, Some(1)), "ERROR: Video unavailable");
    }

    #[test]
    fn tail_error_falls_back_to_last_line_then_status() {
        assert_eq!(tail_error("something odd\n\n", Some(1)), "something odd");
        assert_eq!(tail_error("", Some(101)), "tool exited with status 101");
        assert_eq!(tail_error("\n\n", None), "tool terminated by signal");
    }
}
