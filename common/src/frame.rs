use std::borrow::Cow;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use bytes::Bytes;

/// Standard alphabet, trailing `=` padding optional.
const LINE_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Prefix produced by `canvas.toDataURL()`; stripped when present.
const DATA_URL_MARKER: &[u8] = b";base64,";

/// One compressed still image, as received on a single input line.
///
/// Wire format: one line of base64 (standard alphabet) carrying the raw
/// container bytes (JPEG in practice). A `data:<mime>;base64,` prefix is
/// tolerated. The frame has no identity beyond arrival order and is dropped
/// once the decode attempt finishes.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    data: Bytes,
}

impl EncodedFrame {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Reverse the text encoding of one (already trimmed) input line.
    pub fn from_line(line: &[u8]) -> Result<Self, FrameError> {
        let body = strip_data_url(line);
        if body.is_empty() {
            return Err(FrameError::Empty);
        }
        let data = LINE_ENGINE.decode(body)?;
        if data.is_empty() {
            return Err(FrameError::Empty);
        }
        Ok(Self::new(data))
    }

    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

fn strip_data_url(line: &[u8]) -> &[u8] {
    if !line.starts_with(b"data:") {
        return line;
    }
    match line
        .windows(DATA_URL_MARKER.len())
        .position(|w| w == DATA_URL_MARKER)
    {
        Some(pos) => &line[pos + DATA_URL_MARKER.len()..],
        None => line,
    }
}

/// A single-channel 8-bit image.
///
/// `stride` is the distance in samples between the starts of two rows and is
/// at least `width`. Grids are built once by the decoder and only read after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    stride: usize,
    samples: Vec<u8>,
}

impl PixelGrid {
    /// Build a grid over tightly packed rows (`stride == width`).
    pub fn new(width: u32, height: u32, samples: Vec<u8>) -> Result<Self, FrameError> {
        Self::with_stride(width, height, width as usize, samples)
    }

    pub fn with_stride(
        width: u32,
        height: u32,
        stride: usize,
        samples: Vec<u8>,
    ) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::Dimensions { width, height });
        }
        if stride < width as usize {
            return Err(FrameError::Stride { stride, width });
        }
        let needed = stride * (height as usize - 1) + width as usize;
        if samples.len() < needed {
            return Err(FrameError::TooShort {
                got: samples.len(),
                expected: needed,
            });
        }
        Ok(Self {
            width,
            height,
            stride,
            samples,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The visible samples of row `y` (padding excluded).
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.samples[start..start + self.width as usize]
    }

    /// Sample at `(x, y)`. Panics when out of bounds, like slice indexing.
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.row(y)[x as usize]
    }

    /// Rows laid out back to back with no padding. Borrows when the grid is
    /// already packed.
    pub fn packed(&self) -> Cow<'_, [u8]> {
        let len = self.width as usize * self.height as usize;
        if self.stride == self.width as usize {
            return Cow::Borrowed(&self.samples[..len]);
        }
        let mut out = Vec::with_capacity(len);
        for y in 0..self.height {
            out.extend_from_slice(self.row(y));
        }
        Cow::Owned(out)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame line is empty")]
    Empty,
    #[error("invalid base64 frame: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid grid dimensions {width}x{height}")]
    Dimensions { width: u32, height: u32 },
    #[error("grid stride {stride} is smaller than width {width}")]
    Stride { stride: usize, width: u32 },
    #[error("grid samples too short: got {got}, expected at least {expected}")]
    TooShort { got: usize, expected: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_padded_and_unpadded_lines() {
        let padded = EncodedFrame::from_line(b"/9j/4A==").unwrap();
        assert_eq!(padded.bytes().as_ref(), &[0xFF, 0xD8, 0xFF, 0xE0]);

        let unpadded = EncodedFrame::from_line(b"/9j/4A").unwrap();
        assert_eq!(unpadded.bytes().as_ref(), &[0xFF, 0xD8, 0xFF, 0xE0]);
    }

    #[test]
    fn strips_data_url_prefix() {
        let frame = EncodedFrame::from_line(b"data:image/jpeg;base64,/9j/4A==").unwrap();
        assert_eq!(frame.len(), 4);
    }

    #[test]
    fn rejects_non_base64() {
        assert!(matches!(
            EncodedFrame::from_line(b"not base64 at all!"),
            Err(FrameError::Base64(_))
        ));
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(EncodedFrame::from_line(b""), Err(FrameError::Empty)));
        assert!(matches!(
            EncodedFrame::from_line(b"data:image/jpeg;base64,"),
            Err(FrameError::Empty)
        ));
    }

    #[test]
    fn grid_rejects_zero_size() {
        assert!(matches!(
            PixelGrid::new(0, 4, vec![]),
            Err(FrameError::Dimensions { .. })
        ));
    }

    #[test]
    fn grid_rejects_short_buffer() {
        let err = PixelGrid::new(4, 4, vec![0; 15]).unwrap_err();
        assert!(matches!(err, FrameError::TooShort { got: 15, expected: 16 }));
    }

    #[test]
    fn grid_rejects_narrow_stride() {
        assert!(matches!(
            PixelGrid::with_stride(4, 2, 3, vec![0; 8]),
            Err(FrameError::Stride { .. })
        ));
    }

    #[test]
    fn strided_grid_rows_and_packing() {
        // 3x2 visible, stride 4: last sample of each row is padding.
        let samples = vec![1, 2, 3, 99, 4, 5, 6];
        let grid = PixelGrid::with_stride(3, 2, 4, samples).unwrap();
        assert_eq!(grid.row(1), &[4, 5, 6]);
        assert_eq!(grid.get(2, 0), 3);
        assert_eq!(grid.packed().as_ref(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn packed_grid_borrows() {
        let grid = PixelGrid::new(2, 2, vec![1, 2, 3, 4]).unwrap();
        assert!(matches!(grid.packed(), Cow::Borrowed(_)));
    }
}
