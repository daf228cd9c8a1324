//! Transcript retrieval through subtitles written by the `yt-dlp` tool.

use super::captions;
use super::{FetchError, FetchResult, TranscriptResult, TranscriptSource};
use crate::config::TranscriptSettings;
use crate::youtube::VideoId;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

pub struct YtDlpSource {
    program: String,
    base_url: String,
    languages: Vec<String>,
    accept_invalid_certs: bool,
}

impl YtDlpSource {
    pub fn new(settings: &TranscriptSettings) -> Self {
        Self {
            program: settings.ytdlp_path.clone(),
            base_url: settings.youtube_base_url.clone(),
            languages: settings.languages.clone(),
            accept_invalid_certs: settings.accept_invalid_certs,
        }
    }

    fn command(&self, video_id: &VideoId, workdir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(workdir)
            .arg("--skip-download")
            .arg("--write-sub")
            .arg("--write-auto-sub")
            .arg("--sub-lang")
            .arg(self.languages.join(","))
            .arg("--sub-format")
            .arg("vtt")
            .arg("--ignore-no-formats-error")
            .arg("--no-warnings")
            .arg("--no-playlist")
            .arg("-o")
            .arg("%(id)s.%(ext)s");

        if self.accept_invalid_certs {
            cmd.arg("--no-check-certificates");
        }

        cmd.arg(video_id.watch_url(&self.base_url))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            // Dropping the attempt (timeout or client disconnect) must not leave yt-dlp running.
            .kill_on_drop(true);
        cmd
    }
}

/// Map yt-dlp's stderr onto a failure reason.
fn classify_stderr(stderr: &str) -> FetchError {
    let lower = stderr.to_ascii_lowercase();
    let line = stderr
        .lines()
        .rev()
        .find(|l| l.contains("ERROR"))
        .unwrap_or_else(|| stderr.lines().last().unwrap_or("yt-dlp exited with an error"))
        .trim()
        .to_string();

    if lower.contains("sign in to confirm") {
        FetchError::Blocked(line)
    } else if lower.contains("certificate") {
        FetchError::Tls(line)
    } else if lower.contains("429") || lower.contains("too many requests") {
        FetchError::RateLimited
    } else if lower.contains("video unavailable") || lower.contains("private video") {
        FetchError::VideoUnavailable(line)
    } else {
        FetchError::Network(line)
    }
}

/// Choose the subtitle file for the most preferred language.
///
/// yt-dlp names files `<id>.<lang>.vtt`.
fn pick_subtitle(files: &[PathBuf], languages: &[String]) -> Option<(PathBuf, Option<String>)> {
    let lang_of = |p: &Path| {
        p.file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.rsplit_once('.'))
            .map(|(_, lang)| lang.to_string())
    };

    for lang in languages {
        if let Some(p) = files
            .iter()
            .find(|p| lang_of(p).is_some_and(|l| l.eq_ignore_ascii_case(lang)))
        {
            return Some((p.clone(), Some(lang.clone())));
        }
    }

    let mut sorted = files.to_vec();
    sorted.sort();
    sorted.into_iter().next().map(|p| {
        let lang = lang_of(&p);
        (p, lang)
    })
}

fn vtt_files(dir: &Path) -> FetchResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| FetchError::Network(format!("cannot read subtitle dir: {}", e)))?;
    Ok(entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("vtt"))
        .collect())
}

#[async_trait]
impl TranscriptSource for YtDlpSource {
    fn name(&self) -> &'static str {
        "ytdlp"
    }

    async fn fetch(&self, video_id: &VideoId) -> FetchResult<TranscriptResult> {
        let workdir = tempfile::tempdir()
            .map_err(|e| FetchError::Network(format!("cannot create temp dir: {}", e)))?;

        let output = self
            .command(video_id, workdir.path())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => FetchError::ToolNotFound(self.program.clone()),
                _ => FetchError::Network(format!("failed to run {}: {}", self.program, e)),
            })?;

        let files = vtt_files(workdir.path())?;

        if !output.status.success() && files.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_stderr(&stderr));
        }

        let (path, language) = pick_subtitle(&files, &self.languages).ok_or(FetchError::NoCaptions)?;
        debug!("ytdlp: using {}", path.display());

        let vtt = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| FetchError::Malformed(format!("unreadable subtitle file: {}", e)))?;
        let segments = captions::parse_vtt(&vtt);

        Ok(TranscriptResult::from_segments(
            video_id,
            self.name(),
            language,
            &segments,
        ))
    }
}
