use std::{
    io::{BufReader, Read},
    path::{Path, PathBuf},
    process::{Child, ChildStdout, Command, Stdio},
    thread::JoinHandle,
};

use crate::foundation::{
    core::{Fps, FrameRgb},
    error::{StackError, StackResult},
};

/// Basic metadata about a source video file.
#[derive(Clone, Debug)]
pub struct VideoSourceInfo {
    /// Source path used for probing/decoding.
    pub source_path: PathBuf,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Container frame rate.
    pub fps: Fps,
    /// Frame count from container metadata; may be approximate.
    pub frame_count: u64,
}

/// Probe source video metadata through `ffprobe`.
///
/// The frame count comes from the stream's `nb_frames` when the container records it, otherwise
/// it is estimated as `round(duration * fps)`.
pub fn probe_video(source_path: &Path) -> StackResult<VideoSourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
        avg_frame_rate: Option<String>,
        nb_frames: Option<String>,
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    if !source_path.is_file() {
        return Err(StackError::media(format!(
            "'{}' does not exist or is not a file",
            source_path.display()
        )));
    }

    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| StackError::media(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(StackError::media(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| StackError::media(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| StackError::media("no video stream found"))?;
    let width = video_stream
        .width
        .filter(|w| *w > 0)
        .ok_or_else(|| StackError::media("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .filter(|h| *h > 0)
        .ok_or_else(|| StackError::media("missing video height from ffprobe"))?;

    // avg_frame_rate is "0/0" for some containers; fall back to the stream's base rate.
    let fps = video_stream
        .avg_frame_rate
        .as_deref()
        .and_then(Fps::parse_ratio)
        .or_else(|| video_stream.r_frame_rate.as_deref().and_then(Fps::parse_ratio))
        .ok_or_else(|| StackError::media("invalid video frame rate from ffprobe"))?;

    let frame_count = match video_stream
        .nb_frames
        .as_deref()
        .and_then(|s| s.parse::<u64>().ok())
    {
        Some(n) => n,
        None => {
            let duration = video_stream
                .duration
                .as_deref()
                .or_else(|| parsed.format.as_ref().and_then(|f| f.duration.as_deref()))
                .and_then(|s| s.parse::<f64>().ok())
                .unwrap_or(0.0);
            estimate_frame_count(duration, fps)
        }
    };

    Ok(VideoSourceInfo {
        source_path: source_path.to_path_buf(),
        width,
        height,
        fps,
        frame_count,
    })
}

fn estimate_frame_count(duration_sec: f64, fps: Fps) -> u64 {
    if !duration_sec.is_finite() || duration_sec <= 0.0 {
        return 0;
    }
    (duration_sec * fps.as_f64()).round() as u64
}

/// Sequential frame source behind a [`crate::VideoAsset`].
///
/// Contract: `next_frame` yields frames in presentation order and returns `Ok(None)` once the
/// stream is exhausted (and on every call after that). `rewind` restarts from the first frame.
/// `close` frees the underlying resource and must tolerate repeated calls.
pub trait VideoDecoder: Send {
    /// Decode the next frame, or `None` when exhausted.
    fn next_frame(&mut self) -> StackResult<Option<FrameRgb>>;
    /// Restart decoding from the first frame.
    fn rewind(&mut self) -> StackResult<()>;
    /// Release the decoder's resources.
    fn close(&mut self);
}

/// Decoder that streams raw RGB frames from a system `ffmpeg` child process.
///
/// The end of the pipe only counts as exhaustion when `ffmpeg` exits cleanly; a non-zero exit
/// surfaces as [`StackError::Media`] carrying its stderr.
pub struct FfmpegDecoder {
    source: VideoSourceInfo,
    program: PathBuf,
    child: Option<Child>,
    stdout: Option<BufReader<ChildStdout>>,
    stderr_log: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    frame_len: usize,
}

impl FfmpegDecoder {
    /// Spawn `ffmpeg` for `source`, positioned at its first frame.
    pub fn spawn(source: VideoSourceInfo) -> StackResult<Self> {
        Self::launch(source, PathBuf::from("ffmpeg"))
    }

    pub(crate) fn launch(source: VideoSourceInfo, program: PathBuf) -> StackResult<Self> {
        let frame_len = FrameRgb::byte_len(source.width, source.height);
        if frame_len == 0 {
            return Err(StackError::media(
                "decoded video frame size is zero (invalid source dimensions)",
            ));
        }

        let mut decoder = Self {
            source,
            program,
            child: None,
            stdout: None,
            stderr_log: None,
            frame_len,
        };
        decoder.start()?;
        Ok(decoder)
    }

    fn start(&mut self) -> StackResult<()> {
        // -noautorotate keeps decoded frames at the probed (unrotated) size.
        let mut child = Command::new(&self.program)
            .args(["-v", "error", "-nostdin", "-noautorotate", "-i"])
            .arg(&self.source.source_path)
            .args(["-an", "-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                StackError::media(format!(
                    "failed to spawn ffmpeg for video decode (is it installed and on PATH?): {e}"
                ))
            })?;

        let (Some(stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(StackError::media("ffmpeg decoder pipes are unavailable"));
        };
        self.stderr_log = Some(std::thread::spawn(move || {
            let mut log = Vec::new();
            stderr.read_to_end(&mut log)?;
            Ok(log)
        }));
        self.stdout = Some(BufReader::with_capacity(self.frame_len, stdout));
        self.child = Some(child);
        Ok(())
    }

    /// Wait for a child whose stdout hit EOF and report how it exited.
    fn finish(&mut self) -> StackResult<()> {
        drop(self.stdout.take());
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child.wait().map_err(|e| {
            StackError::media(format!("failed to wait for ffmpeg decoder: {e}"))
        });
        let log = match self.stderr_log.take().map(JoinHandle::join) {
            Some(Ok(Ok(bytes))) => String::from_utf8_lossy(&bytes).trim().to_string(),
            Some(Ok(Err(e))) => format!("<stderr unreadable: {e}>"),
            Some(Err(_)) => "<stderr reader panicked>".to_string(),
            None => String::new(),
        };

        let status = status?;
        if status.success() {
            return Ok(());
        }
        Err(StackError::media(format!(
            "ffmpeg failed to decode '{}' ({status}): {log}",
            self.source.source_path.display()
        )))
    }

    fn stop(&mut self) {
        drop(self.stdout.take());
        if let Some(mut child) = self.child.take() {
            // The child may already have exited on its own; both calls are best effort.
            let _ = child.kill();
            if let Err(e) = child.wait() {
                tracing::warn!(
                    path = %self.source.source_path.display(),
                    "failed to reap ffmpeg decoder: {e}"
                );
            }
        }
        if let Some(handle) = self.stderr_log.take() {
            let _ = handle.join();
        }
    }
}

impl VideoDecoder for FfmpegDecoder {
    fn next_frame(&mut self) -> StackResult<Option<FrameRgb>> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut buf = vec![0u8; self.frame_len];
        let filled = match read_full(stdout, &mut buf) {
            Ok(n) => n,
            Err(e) => {
                self.stop();
                return Err(StackError::media(format!(
                    "failed to read decoded frame from ffmpeg for '{}': {e}",
                    self.source.source_path.display()
                )));
            }
        };

        if filled < self.frame_len {
            self.finish()?;
            if filled > 0 {
                tracing::warn!(
                    path = %self.source.source_path.display(),
                    bytes = filled,
                    "dropping truncated trailing frame"
                );
            }
            return Ok(None);
        }

        FrameRgb::from_raw(self.source.width, self.source.height, buf).map(Some)
    }

    fn rewind(&mut self) -> StackResult<()> {
        self.stop();
        self.start()
    }

    fn close(&mut self) {
        self.stop();
    }
}

impl Drop for FfmpegDecoder {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Read until `buf` is full or EOF, returning the number of bytes read.
fn read_full(r: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Decoder over frames already held in memory.
#[derive(Debug, Default)]
pub struct MemoryDecoder {
    frames: Vec<FrameRgb>,
    cursor: usize,
    closed: bool,
}

impl MemoryDecoder {
    /// Create a decoder replaying `frames` in order.
    pub fn new(frames: Vec<FrameRgb>) -> Self {
        Self {
            frames,
            cursor: 0,
            closed: false,
        }
    }

    /// Return `true` once [`VideoDecoder::close`] was called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl VideoDecoder for MemoryDecoder {
    fn next_frame(&mut self) -> StackResult<Option<FrameRgb>> {
        if self.closed {
            return Err(StackError::media("memory decoder is closed"));
        }
        let frame = self.frames.get(self.cursor).cloned();
        if frame.is_some() {
            self.cursor += 1;
        }
        Ok(frame)
    }

    fn rewind(&mut self) -> StackResult<()> {
        if self.closed {
            return Err(StackError::media("memory decoder is closed"));
        }
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
        self.frames.clear();
    }
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    tool_runs("ffmpeg")
}

/// Return `true` when `ffprobe` can be invoked from `PATH`.
pub fn is_ffprobe_on_path() -> bool {
    tool_runs("ffprobe")
}

fn tool_runs(name: &str) -> bool {
    Command::new(name)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_count_estimate_rounds_duration() {
        let fps = Fps::new(30, 1).unwrap();
        assert_eq!(estimate_frame_count(1.0, fps), 30);
        assert_eq!(estimate_frame_count(0.99, fps), 30);
        assert_eq!(estimate_frame_count(0.0, fps), 0);
        assert_eq!(estimate_frame_count(f64::NAN, fps), 0);
    }

    #[test]
    fn read_full_reports_short_reads() {
        let mut src: &[u8] = &[1, 2, 3];
        let mut buf = [0u8; 5];
        assert_eq!(read_full(&mut src, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
    }

    #[test]
    fn memory_decoder_exhausts_and_rewinds() {
        let mut d = MemoryDecoder::new(vec![FrameRgb::black(2, 2), FrameRgb::black(2, 2)]);
        assert!(d.next_frame().unwrap().is_some());
        assert!(d.next_frame().unwrap().is_some());
        assert!(d.next_frame().unwrap().is_none());
        assert!(d.next_frame().unwrap().is_none());

        d.rewind().unwrap();
        assert!(d.next_frame().unwrap().is_some());

        d.close();
        d.close();
        assert!(d.is_closed());
        assert!(d.next_frame().is_err());
    }

    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt as _;

        let path = dir.join("ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    fn tiny_source() -> VideoSourceInfo {
        VideoSourceInfo {
            source_path: PathBuf::from("clip.mp4"),
            width: 4,
            height: 2,
            fps: Fps::new(30, 1).unwrap(),
            frame_count: 5,
        }
    }

    #[cfg(unix)]
    #[test]
    fn failed_decode_is_an_error_not_exhaustion() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_ffmpeg(dir.path(), "echo 'Decoder error' >&2\nexit 1");

        let mut d = FfmpegDecoder::launch(tiny_source(), program).unwrap();
        let err = d.next_frame().unwrap_err();
        assert!(matches!(err, StackError::Media(_)));
        assert!(err.to_string().contains("Decoder error"));
    }

    #[cfg(unix)]
    #[test]
    fn decode_failing_mid_stream_keeps_earlier_frames() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_ffmpeg(dir.path(), "head -c 24 /dev/zero\necho 'corrupt packet' >&2\nexit 1");

        let mut d = FfmpegDecoder::launch(tiny_source(), program).unwrap();
        let first = d.next_frame().unwrap().unwrap();
        assert_eq!(first.shape(), (2, 4, 3));
        let err = d.next_frame().unwrap_err();
        assert!(err.to_string().contains("corrupt packet"));
    }

    #[cfg(unix)]
    #[test]
    fn clean_exit_is_exhaustion_and_rewind_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_ffmpeg(dir.path(), "head -c 24 /dev/zero");

        let mut d = FfmpegDecoder::launch(tiny_source(), program).unwrap();
        assert!(d.next_frame().unwrap().is_some());
        assert!(d.next_frame().unwrap().is_none());
        assert!(d.next_frame().unwrap().is_none());

        d.rewind().unwrap();
        assert!(d.next_frame().unwrap().is_some());
        d.close();
        assert!(d.next_frame().unwrap().is_none());
    }

    #[test]
    fn probe_missing_file_fails_without_spawning() {
        let err = probe_video(Path::new("/nonexistent/video.mp4")).unwrap_err();
        assert!(matches!(err, StackError::Media(_)));
    }
}
