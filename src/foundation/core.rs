use std::{fmt, str::FromStr};

use crate::foundation::error::{StackError, StackResult};

/// Bytes per pixel of [`FrameRgb`].
pub const RGB_CHANNELS: usize = 3;

/// Absolute 0-based output frame index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameIndex(pub u64);

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> StackResult<Self> {
        if den == 0 {
            return Err(StackError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(StackError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Parse an ffmpeg-style ratio such as `30000/1001`.
    pub fn parse_ratio(s: &str) -> Option<Self> {
        let (num, den) = s.trim().split_once('/')?;
        let num = num.parse::<u32>().ok()?;
        let den = den.parse::<u32>().ok()?;
        Self::new(num, den).ok()
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }
}

impl fmt::Display for Fps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// Media classification of an asset source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Still image, repeated every output frame.
    Image,
    /// Video clip, advanced one frame per output frame.
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Image => "image",
            Self::Video => "video",
        })
    }
}

/// Policy governing how non-reference assets are sized to share the reference width.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Constraint {
    /// Images keep their aspect ratio at the reference width.
    #[default]
    Width,
    /// Images are forced to the full reference frame size.
    Height,
}

impl FromStr for Constraint {
    type Err = StackError;

    fn from_str(s: &str) -> StackResult<Self> {
        match s {
            "width" => Ok(Self::Width),
            "height" => Ok(Self::Height),
            other => Err(StackError::InvalidConstraint(other.to_string())),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Width => "width",
            Self::Height => "height",
        })
    }
}

/// Where the image goes relative to the video in legacy (video + image) mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ImagePosition {
    /// Image stacked above the video.
    Top,
    /// Image stacked below the video.
    #[default]
    Bottom,
}

impl FromStr for ImagePosition {
    type Err = StackError;

    fn from_str(s: &str) -> StackResult<Self> {
        match s {
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            other => Err(StackError::InvalidImagePosition(other.to_string())),
        }
    }
}

impl fmt::Display for ImagePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
        })
    }
}

/// A raster frame as RGB8 pixels, tightly packed, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameRgb {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGB8 bytes, `width * height * 3` long.
    pub data: Vec<u8>,
}

impl FrameRgb {
    /// Wrap a raw RGB8 buffer, checking its length against the dimensions.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> StackResult<Self> {
        let expected = Self::byte_len(width, height);
        if data.len() != expected {
            return Err(StackError::validation(format!(
                "rgb8 buffer has {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Solid black frame.
    pub fn black(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0, 0, 0])
    }

    /// Frame filled with a single color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * RGB_CHANNELS);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// `(height, width, channels)`.
    pub fn shape(&self) -> (u32, u32, usize) {
        (self.height, self.width, RGB_CHANNELS)
    }

    /// Return `true` when the frame has the given dimensions.
    pub fn has_size(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }

    /// Byte length of one row.
    pub fn stride(&self) -> usize {
        self.width as usize * RGB_CHANNELS
    }

    /// RGB value at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let off = y as usize * self.stride() + x as usize * RGB_CHANNELS;
        [self.data[off], self.data[off + 1], self.data[off + 2]]
    }

    /// Return `true` when every byte in rows `[y0, y1)` is zero.
    pub fn rows_are_black(&self, y0: u32, y1: u32) -> bool {
        let start = y0 as usize * self.stride();
        let end = (y1 as usize * self.stride()).min(self.data.len());
        start <= end && self.data[start..end].iter().all(|&b| b == 0)
    }

    pub(crate) fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * RGB_CHANNELS
    }
}

impl fmt::Debug for FrameRgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameRgb")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_validation_and_ratio_parsing() {
        assert!(Fps::new(0, 1).is_err());
        assert!(Fps::new(30, 0).is_err());

        let ntsc = Fps::parse_ratio("30000/1001").unwrap();
        assert_eq!(ntsc, Fps { num: 30000, den: 1001 });
        assert!((ntsc.as_f64() - 29.97).abs() < 0.01);

        assert!(Fps::parse_ratio("0/0").is_none());
        assert!(Fps::parse_ratio("thirty").is_none());
        assert_eq!(Fps::new(25, 1).unwrap().to_string(), "25");
    }

    #[test]
    fn constraint_parses_known_names_only() {
        assert_eq!("width".parse::<Constraint>().unwrap(), Constraint::Width);
        assert_eq!("height".parse::<Constraint>().unwrap(), Constraint::Height);

        let err = "invalid".parse::<Constraint>().unwrap_err();
        assert!(matches!(err, StackError::InvalidConstraint(ref v) if v == "invalid"));
        assert!(err.to_string().contains("invalid constraint"));
    }

    #[test]
    fn image_position_parses_known_names_only() {
        assert_eq!("top".parse::<ImagePosition>().unwrap(), ImagePosition::Top);
        assert_eq!(
            "bottom".parse::<ImagePosition>().unwrap(),
            ImagePosition::Bottom
        );
        assert!(matches!(
            "left".parse::<ImagePosition>(),
            Err(StackError::InvalidImagePosition(_))
        ));
    }

    #[test]
    fn frame_from_raw_checks_length() {
        assert!(FrameRgb::from_raw(2, 2, vec![0; 12]).is_ok());
        assert!(FrameRgb::from_raw(2, 2, vec![0; 11]).is_err());
    }

    #[test]
    fn black_frame_shape_and_content() {
        let f = FrameRgb::black(4, 3);
        assert_eq!(f.shape(), (3, 4, 3));
        assert!(f.rows_are_black(0, 3));

        let red = FrameRgb::filled(2, 1, [255, 0, 0]);
        assert_eq!(red.pixel(1, 0), [255, 0, 0]);
        assert!(!red.rows_are_black(0, 1));
    }
}
