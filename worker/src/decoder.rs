use std::io::Cursor;

use barcode_worker_common::config::DecoderConfig;
use barcode_worker_common::frame::{EncodedFrame, FrameError, PixelGrid};
use image::{ImageReader, Limits};

/// Why a frame was dropped. Skips are routine on a live feed (partial reads,
/// encoder glitches) and never reach the output channel.
#[derive(Debug, thiserror::Error)]
pub enum Skip {
    #[error("frame text encoding: {0}")]
    Encoding(FrameError),
    #[error("frame image: {0}")]
    Image(#[from] image::ImageError),
    #[error("frame image container: {0}")]
    Container(#[from] std::io::Error),
    #[error("decoded grid: {0}")]
    Grid(FrameError),
}

/// Turns one input line into a grayscale grid.
pub struct FrameDecoder {
    max_dimension: u32,
}

impl FrameDecoder {
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            max_dimension: config.max_dimension,
        }
    }

    /// Decode a trimmed, non-empty input line.
    pub fn decode(&self, line: &[u8]) -> Result<PixelGrid, Skip> {
        let frame = EncodedFrame::from_line(line).map_err(Skip::Encoding)?;
        self.decode_frame(&frame)
    }

    pub fn decode_frame(&self, frame: &EncodedFrame) -> Result<PixelGrid, Skip> {
        let mut limits = Limits::default();
        limits.max_image_width = Some(self.max_dimension);
        limits.max_image_height = Some(self.max_dimension);

        let mut reader =
            ImageReader::new(Cursor::new(frame.bytes().as_ref())).with_guessed_format()?;
        reader.limits(limits);
        let gray = reader.decode()?.to_luma8();

        let (width, height) = gray.dimensions();
        PixelGrid::new(width, height, gray.into_raw()).map_err(Skip::Grid)
    }
}
