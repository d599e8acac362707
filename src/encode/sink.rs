use crate::foundation::{
    core::{Fps, FrameIndex, FrameRgb},
    error::{StackError, StackResult},
};

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
}

impl SinkConfig {
    /// Reject zero sizes and a zero frame rate.
    pub fn validate(&self) -> StackResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(StackError::validation(
                "sink width/height must be non-zero",
            ));
        }
        if self.fps.num == 0 || self.fps.den == 0 {
            return Err(StackError::validation("fps must be non-zero"));
        }
        Ok(())
    }
}

/// Sink contract for consuming composited frames in output order.
///
/// Ordering contract: `push_frame` is called with strictly increasing indices, after `begin` and
/// before `end`. `end` is called once per `begin`, including after a failed `push_frame`.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> StackResult<()>;
    /// Push one frame.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRgb) -> StackResult<()>;
    /// Close the output.
    fn end(&mut self) -> StackResult<()>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, FrameRgb)>,
    ended: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    /// Captured frames in output order.
    pub fn frames(&self) -> &[(FrameIndex, FrameRgb)] {
        &self.frames
    }

    /// Return `true` once `end` was called.
    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> StackResult<()> {
        cfg.validate()?;
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRgb) -> StackResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| StackError::validation("in-memory sink not started"))?;
        if !frame.has_size(cfg.width, cfg.height) {
            return Err(StackError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> StackResult<()> {
        self.ended = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_validation_catches_bad_values() {
        let fps = Fps::new(30, 1).unwrap();
        assert!(
            SinkConfig {
                width: 0,
                height: 10,
                fps
            }
            .validate()
            .is_err()
        );
        assert!(
            SinkConfig {
                width: 10,
                height: 10,
                fps: Fps { num: 0, den: 1 }
            }
            .validate()
            .is_err()
        );
        assert!(
            SinkConfig {
                width: 11,
                height: 7,
                fps
            }
            .validate()
            .is_ok()
        );
    }

    #[test]
    fn in_memory_sink_checks_frame_size() {
        let mut sink = InMemorySink::new();
        assert!(
            sink.push_frame(FrameIndex(0), &FrameRgb::black(2, 2))
                .is_err()
        );

        sink.begin(SinkConfig {
            width: 2,
            height: 2,
            fps: Fps::new(24, 1).unwrap(),
        })
        .unwrap();
        sink.push_frame(FrameIndex(0), &FrameRgb::black(2, 2)).unwrap();
        assert!(
            sink.push_frame(FrameIndex(1), &FrameRgb::black(2, 3))
                .is_err()
        );
        sink.end().unwrap();
        assert_eq!(sink.frames().len(), 1);
        assert!(sink.is_ended());
    }
}
