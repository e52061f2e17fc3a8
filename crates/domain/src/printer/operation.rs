use serde::{Deserialize, Serialize};

use crate::error::{PrinterError, Result};

/// Built-in device fonts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Font {
    A,
    B,
    C,
    D,
    E,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Left,
    Center,
    Right,
}

/// Character magnification, 1..=8 in each direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextSize {
    width: u8,
    height: u8,
}

impl TextSize {
    pub const MAX: u8 = 8;

    pub fn new(width: u8, height: u8) -> Result<Self> {
        for (axis, value) in [("width", width), ("height", height)] {
            if !(1..=Self::MAX).contains(&value) {
                return Err(PrinterError::invalid_argument(format!(
                    "Text {axis} must be between 1 and {}, got {value}",
                    Self::MAX
                )));
            }
        }
        Ok(Self { width, height })
    }

    /// Same magnification on both axes
    pub fn uniform(size: u8) -> Result<Self> {
        Self::new(size, size)
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }
}

/// Per-run text overrides. `None` means "device default".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextStyle {
    pub font: Option<Font>,
    pub size: Option<TextSize>,
    pub align: Option<Alignment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageMode {
    #[default]
    Mono,
    Gray16,
}

/// Halftone policy applied by the device when rendering a bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Halftone {
    Dither,
    ErrorDiffusion,
    #[default]
    Threshold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutMode {
    /// Feed to the cutter position, then cut
    #[default]
    Feed,
    /// Cut at the current position
    NoFeed,
    /// Cut and leave the paper for the next job
    Reserve,
}

/// 8-bit grayscale raster, row-major
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(PrinterError::invalid_argument("Image has no pixels"));
        }
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(PrinterError::invalid_argument(format!(
                "Image data length {} does not match {width}x{height}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBlock {
    pub bitmap: Bitmap,
    pub mode: ImageMode,
    pub halftone: Halftone,
}

/// A single buffered printer instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrintOperation {
    Text { content: String, style: TextStyle },
    Feed { lines: u8 },
    Image(ImageBlock),
    Cut { mode: CutMode },
}

impl PrintOperation {
    pub fn text(content: impl Into<String>, style: TextStyle) -> Self {
        Self::Text {
            content: content.into(),
            style,
        }
    }

    pub fn feed(lines: u8) -> Self {
        Self::Feed { lines }
    }

    pub fn cut(mode: CutMode) -> Self {
        Self::Cut { mode }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Feed { .. } => "feed",
            Self::Image(_) => "image",
            Self::Cut { .. } => "cut",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_size_bounds() {
        assert!(TextSize::uniform(1).is_ok());
        assert!(TextSize::uniform(8).is_ok());
        assert!(TextSize::uniform(0).is_err());
        assert!(TextSize::new(2, 9).is_err());
    }

    #[test]
    fn test_bitmap_length_must_match_dimensions() {
        assert!(Bitmap::new(2, 2, vec![0; 4]).is_ok());
        assert!(Bitmap::new(2, 2, vec![0; 3]).is_err());
        assert!(Bitmap::new(0, 2, vec![]).is_err());
    }

    #[test]
    fn test_operation_kinds() {
        assert_eq!(
            PrintOperation::text("Hello", TextStyle::default()).kind(),
            "text"
        );
        assert_eq!(PrintOperation::feed(1).kind(), "feed");
        assert_eq!(PrintOperation::cut(CutMode::Feed).kind(), "cut");
    }

    #[test]
    fn test_operation_serialization() {
        let op = PrintOperation::feed(3);
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "feed", "lines": 3}));
    }
}
