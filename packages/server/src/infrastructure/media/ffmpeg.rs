//! `Transcoder` backed by the `ffmpeg` / `ffprobe` command-line tools.

use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::process::Command;

use crate::domain::{TranscodeError, Transcoder};

/// Runs the tools found at the configured paths (by default, on `PATH`).
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    async fn run<I, S>(tool: &Path, args: I) -> Result<String, TranscodeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let tool_name = tool.display().to_string();
        let output = Command::new(tool)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| TranscodeError::Spawn {
                tool: tool_name.clone(),
                source,
            })?;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(TranscodeError::Failed {
                tool: tool_name,
                status: output.status.to_string(),
                output: combined.trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn generate_thumbnail(
        &self,
        input: &Path,
        output: &Path,
        offset: &str,
    ) -> Result<(), TranscodeError> {
        let args: [&OsStr; 10] = [
            "-i".as_ref(),
            input.as_os_str(),
            "-ss".as_ref(),
            offset.as_ref(),
            "-vframes".as_ref(),
            "1".as_ref(),
            "-vf".as_ref(),
            "scale=320:-1".as_ref(),
            output.as_os_str(),
            "-y".as_ref(),
        ];
        Self::run(&self.ffmpeg, args).await?;
        tracing::info!("Thumbnail generated: {}", output.display());
        Ok(())
    }

    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        let args: [&OsStr; 16] = [
            "-i".as_ref(),
            input.as_os_str(),
            "-c:v".as_ref(),
            "libx264".as_ref(),
            "-preset".as_ref(),
            "medium".as_ref(),
            "-crf".as_ref(),
            "23".as_ref(),
            "-c:a".as_ref(),
            "aac".as_ref(),
            "-b:a".as_ref(),
            "128k".as_ref(),
            "-movflags".as_ref(),
            "+faststart".as_ref(),
            output.as_os_str(),
            "-y".as_ref(),
        ];
        Self::run(&self.ffmpeg, args).await?;
        tracing::info!("Video transcoded: {}", output.display());
        Ok(())
    }

    async fn probe_duration(&self, input: &Path) -> Result<f64, TranscodeError> {
        let args: [&OsStr; 7] = [
            "-v".as_ref(),
            "error".as_ref(),
            "-show_entries".as_ref(),
            "format=duration".as_ref(),
            "-of".as_ref(),
            "default=noprint_wrappers=1:nokey=1".as_ref(),
            input.as_os_str(),
        ];
        let stdout = Self::run(&self.ffprobe, args).await?;
        parse_duration(&stdout)
    }
}

/// Parse the leading number of `ffprobe` duration output (seconds).
pub fn parse_duration(output: &str) -> Result<f64, TranscodeError> {
    output
        .split_whitespace()
        .next()
        .and_then(|token| token.parse::<f64>().ok())
        .filter(|duration| duration.is_finite() && *duration >= 0.0)
        .ok_or_else(|| TranscodeError::InvalidDuration(output.trim().to_string()))
}
