//! Video encoding through an external FFmpeg process.
//!
//! Frames are piped to FFmpeg's stdin as raw BGR24 and muxed into the output
//! container by FFmpeg itself.

use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::frame::bgr24_len;
use crate::{ClipsError, Result};

/// Name of the FFmpeg binary looked up on PATH.
pub const FFMPEG: &str = "ffmpeg";

/// Four-character codec code, as used by container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FourCc([u8; 4]);

impl FourCc {
    /// MPEG-4 Part 2.
    pub const MP4V: FourCc = FourCc(*b"mp4v");
    /// H.264.
    pub const AVC1: FourCc = FourCc(*b"avc1");
    /// Motion JPEG.
    pub const MJPG: FourCc = FourCc(*b"MJPG");

    /// Parse a four-character ASCII code.
    pub fn new(code: &str) -> Option<Self> {
        let bytes: [u8; 4] = code.as_bytes().try_into().ok()?;
        bytes.iter().all(u8::is_ascii_graphic).then_some(FourCc(bytes))
    }

    pub fn as_str(&self) -> &str {
        // Constructed only from ASCII
        std::str::from_utf8(&self.0).unwrap_or("????")
    }

    /// FFmpeg encoder name for this code.
    pub fn ffmpeg_encoder(&self) -> Option<&'static str> {
        match &self.0 {
            b"mp4v" | b"MP4V" => Some("mpeg4"),
            b"avc1" | b"h264" | b"H264" => Some("libx264"),
            b"MJPG" | b"mjpg" => Some("mjpeg"),
            _ => None,
        }
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output parameters of one recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSettings {
    pub path: PathBuf,
    pub codec: FourCc,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
}

impl VideoSettings {
    /// Bytes per packed BGR24 frame.
    pub fn frame_len(&self) -> usize {
        bgr24_len(self.width, self.height)
    }
}

/// Destination for encoded frames. Owned by the recording worker.
pub trait VideoSink {
    /// Append one packed BGR24 frame.
    fn write_frame(&mut self, bgr: &[u8]) -> Result<()>;

    /// Flush and close the output. Called exactly once per recording.
    fn finish(self: Box<Self>) -> Result<()>;
}

/// Check that the FFmpeg binary can be launched.
pub fn ensure_ffmpeg_available() -> Result<()> {
    let status = Command::new(FFMPEG)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| ClipsError::encoder_unavailable(FFMPEG, Some(e)))?;

    if !status.success() {
        return Err(ClipsError::encoder_unavailable(FFMPEG, None));
    }
    debug!("FFmpeg is available");
    Ok(())
}

/// Pipes raw frames into an FFmpeg child process.
pub struct FfmpegWriter {
    child: Child,
    stdin: Option<ChildStdin>,
    path: PathBuf,
    frame_len: usize,
    frames: u64,
}

impl FfmpegWriter {
    /// Start FFmpeg for `settings`. The output file is overwritten.
    pub fn spawn(settings: &VideoSettings) -> Result<Self> {
        let mut command = Command::new(FFMPEG);
        command.args(ffmpeg_args(settings)?);
        Self::start(command, settings)
    }

    /// FFmpeg's console output is discarded; failures surface through the
    /// exit status in [`VideoSink::finish`].
    fn start(mut command: Command, settings: &VideoSettings) -> Result<Self> {
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ClipsError::encoder_unavailable(FFMPEG, Some(e)))?;

        let stdin = child.stdin.take();
        info!(
            path = %settings.path.display(),
            codec = %settings.codec,
            fps = settings.fps,
            "Started FFmpeg encoder at {}x{}",
            settings.width,
            settings.height
        );

        Ok(Self {
            child,
            stdin,
            path: settings.path.clone(),
            frame_len: settings.frame_len(),
            frames: 0,
        })
    }
}

impl VideoSink for FfmpegWriter {
    fn write_frame(&mut self, bgr: &[u8]) -> Result<()> {
        if bgr.len() != self.frame_len {
            return Err(ClipsError::encoder_failed(
                &self.path,
                format!("frame is {} bytes, encoder expects {}", bgr.len(), self.frame_len),
                None,
            ));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ClipsError::encoder_failed(&self.path, "encoder input closed", None))?;
        stdin
            .write_all(bgr)
            .map_err(|e| ClipsError::encoder_failed(&self.path, "writing frame to FFmpeg", Some(e)))?;
        self.frames += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        let FfmpegWriter { mut child, stdin, path, frames, .. } = *self;
        // Closing stdin signals end of stream
        drop(stdin);
        let status = child
            .wait()
            .map_err(|e| ClipsError::encoder_failed(&path, "waiting for FFmpeg", Some(e)))?;

        if !status.success() {
            warn!(%status, frames, "FFmpeg failed");
            return Err(ClipsError::encoder_failed(
                &path,
                format!("FFmpeg exited with {}", status),
                None,
            ));
        }

        info!(path = %path.display(), frames, "FFmpeg finished");
        Ok(())
    }
}

/// Command line for piping BGR24 frames of `settings` into FFmpeg.
pub(crate) fn ffmpeg_args(settings: &VideoSettings) -> Result<Vec<String>> {
    let encoder = settings.codec.ffmpeg_encoder().ok_or_else(|| {
        ClipsError::encoder_failed(
            &settings.path,
            format!("no FFmpeg encoder for codec '{}'", settings.codec),
            None,
        )
    })?;

    let mut args: Vec<String> = [
        "-y",
        "-hide_banner",
        "-loglevel",
        "error",
        "-nostats",
        "-f",
        "rawvideo",
        "-pixel_format",
        "bgr24",
        "-video_size",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(format!("{}x{}", settings.width, settings.height));
    args.extend(["-framerate".to_string(), settings.fps.to_string()]);
    args.extend(["-i", "-", "-c:v", encoder].iter().map(|s| s.to_string()));
    args.extend(["-vtag".to_string(), settings.codec.to_string()]);
    args.push(settings.path.to_string_lossy().into_owned());
    Ok(args)
}
