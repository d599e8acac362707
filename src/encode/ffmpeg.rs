use std::{
    io::{Read, Write as _},
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
    thread::JoinHandle,
};

use crate::{
    assets::media::is_ffmpeg_on_path,
    encode::sink::{FrameSink, SinkConfig},
    foundation::{
        core::{FrameIndex, FrameRgb},
        error::{StackError, StackResult},
    },
};

/// FourCC tag written into the output container.
pub const OUTPUT_FOURCC: &str = "mp4v";

/// Where and how [`FfmpegSink`] writes its file.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Destination video file.
    pub out_path: PathBuf,
    /// Replace an existing file at `out_path` instead of failing.
    pub overwrite: bool,
}

impl FfmpegSinkOpts {
    /// Write to `out_path`, replacing any existing file.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
        }
    }
}

/// A running `ffmpeg` encoder fed through stdin.
struct EncoderProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_log: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
}

impl EncoderProcess {
    fn spawn(mut cmd: Command) -> StackResult<Self> {
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        let mut child = cmd
            .spawn()
            .map_err(|e| StackError::media(format!("cannot start ffmpeg encoder: {e}")))?;

        let (Some(stdin), Some(mut stderr)) = (child.stdin.take(), child.stderr.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(StackError::media("ffmpeg encoder pipes are unavailable"));
        };
        // ffmpeg blocks once its stderr pipe fills, so keep draining it.
        let stderr_log = std::thread::spawn(move || {
            let mut log = Vec::new();
            stderr.read_to_end(&mut log)?;
            Ok(log)
        });

        Ok(Self {
            child,
            stdin: Some(stdin),
            stderr_log: Some(stderr_log),
        })
    }

    fn write(&mut self, bytes: &[u8]) -> StackResult<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| StackError::media("ffmpeg encoder input already closed"))?;
        stdin
            .write_all(bytes)
            .map_err(|e| StackError::media(format!("writing frame to ffmpeg failed: {e}")))
    }

    /// Close stdin, wait for the process and surface its log on failure.
    fn finish(mut self) -> StackResult<()> {
        drop(self.stdin.take());
        let status = self
            .child
            .wait()
            .map_err(|e| StackError::media(format!("waiting for ffmpeg encoder failed: {e}")))?;

        let log = match self.stderr_log.take().map(JoinHandle::join) {
            Some(Ok(Ok(bytes))) => String::from_utf8_lossy(&bytes).trim().to_string(),
            Some(Ok(Err(e))) => format!("<stderr unreadable: {e}>"),
            Some(Err(_)) => "<stderr reader panicked>".to_string(),
            None => String::new(),
        };

        if status.success() {
            Ok(())
        } else {
            Err(StackError::media(format!(
                "ffmpeg encoder exited with {status}: {log}"
            )))
        }
    }
}

/// Sink that encodes frames with the system `ffmpeg`.
///
/// Frames go in as raw `rgb24` and come out as MPEG-4 part 2 tagged `mp4v`. The output file and
/// its parent directory are only created by [`FrameSink::begin`]. Frame indices must start at 0
/// and increase by one.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,
    encoder: Option<EncoderProcess>,
    cfg: Option<SinkConfig>,
    next_frame: u64,
}

impl FfmpegSink {
    /// Sink writing according to `opts`; no process is started yet.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            encoder: None,
            cfg: None,
            next_frame: 0,
        }
    }

    /// Destination file.
    pub fn out_path(&self) -> &Path {
        &self.opts.out_path
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> StackResult<()> {
        cfg.validate()?;
        if self.encoder.is_some() {
            return Err(StackError::media("ffmpeg sink already started"));
        }

        let out = &self.opts.out_path;
        if !self.opts.overwrite && out.exists() {
            return Err(StackError::validation(format!(
                "output file '{}' already exists",
                out.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(StackError::media("ffmpeg was not found on PATH"));
        }
        ensure_parent_dir(out)?;

        self.encoder = Some(EncoderProcess::spawn(encoder_command(&self.opts, cfg))?);
        self.cfg = Some(cfg);
        self.next_frame = 0;
        tracing::debug!(
            out = %out.display(),
            width = cfg.width,
            height = cfg.height,
            fps = %cfg.fps,
            "ffmpeg encoder started"
        );
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRgb) -> StackResult<()> {
        let (Some(cfg), Some(encoder)) = (self.cfg, self.encoder.as_mut()) else {
            return Err(StackError::media("ffmpeg sink not started"));
        };
        if idx.0 != self.next_frame {
            return Err(StackError::media(format!(
                "expected frame {}, got frame {}",
                self.next_frame, idx.0
            )));
        }
        if !frame.has_size(cfg.width, cfg.height) {
            return Err(StackError::validation(format!(
                "frame is {}x{}, encoder expects {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }

        encoder.write(&frame.data)?;
        self.next_frame += 1;
        Ok(())
    }

    fn end(&mut self) -> StackResult<()> {
        let encoder = self
            .encoder
            .take()
            .ok_or_else(|| StackError::media("ffmpeg sink not started"))?;
        self.cfg = None;
        encoder.finish()?;
        tracing::debug!(
            out = %self.opts.out_path.display(),
            frames = self.next_frame,
            "ffmpeg encoder finished"
        );
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.encoder.is_some()
            && let Err(e) = self.end()
        {
            tracing::warn!("closing ffmpeg sink on drop failed: {e}");
        }
    }
}

/// `ffmpeg` invocation reading raw `rgb24` frames of `cfg` from stdin.
fn encoder_command(opts: &FfmpegSinkOpts, cfg: SinkConfig) -> Command {
    let mut cmd = Command::new("ffmpeg");
    cmd.args([if opts.overwrite { "-y" } else { "-n" }, "-v", "error"]);
    // Input options: the rate must precede `-i` for rawvideo.
    cmd.args(["-f", "rawvideo", "-pix_fmt", "rgb24"])
        .args(["-s", &format!("{}x{}", cfg.width, cfg.height)])
        .args(["-r", &format!("{}/{}", cfg.fps.num, cfg.fps.den)])
        .args(["-i", "pipe:0", "-an"]);
    cmd.args(["-c:v", "mpeg4", "-vtag", OUTPUT_FOURCC, "-pix_fmt", "yuv420p"])
        .arg(&opts.out_path);
    cmd
}

/// Create the parent directory of `path` if it has one.
pub fn ensure_parent_dir(path: &Path) -> StackResult<()> {
    use anyhow::Context as _;

    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create directory '{}'", parent.display()))?;
            Ok(())
        }
        _ => Ok(()),
    }
}
