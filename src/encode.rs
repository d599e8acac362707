//! Output sinks. Sinks consume composited frames in output order.

/// `ffmpeg`-based sink (system `ffmpeg`, `mp4v` output).
pub mod ffmpeg;
/// Generic frame sink trait and the in-memory sink.
pub mod sink;
