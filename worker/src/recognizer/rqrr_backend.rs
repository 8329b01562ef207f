use barcode_worker_common::frame::PixelGrid;
use tracing::trace;

use super::traits::{RawSymbol, SymbolBackend};

/// QR-only backend built on `rqrr`. Payloads are passed through as raw
/// bytes, so non-UTF-8 content survives until normalization.
#[derive(Default)]
pub struct RqrrBackend;

impl RqrrBackend {
    pub fn new() -> Self {
        Self
    }
}

impl SymbolBackend for RqrrBackend {
    fn scan(&mut self, grid: &PixelGrid) -> Vec<RawSymbol> {
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            grid.width() as usize,
            grid.height() as usize,
            |x, y| grid.get(x as u32, y as u32),
        );

        let mut symbols = Vec::new();
        for found in prepared.detect_grids() {
            let mut data = Vec::new();
            match found.decode_to(&mut data) {
                Ok(_meta) => symbols.push(RawSymbol {
                    data,
                    symbology: "QRCODE".into(),
                }),
                Err(e) => trace!(error = %e, "rqrr grid failed to decode"),
            }
        }
        symbols
    }

    fn name(&self) -> &str {
        "rqrr"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    // Symbols are rendered with rxing's writer.
    #[cfg(feature = "backend-rxing")]
    use crate::recognizer::tests::symbol_grid;

    #[test]
    fn blank_grid_yields_nothing() {
        let grid = PixelGrid::new(64, 64, vec![0; 64 * 64]).unwrap();
        assert!(RqrrBackend::new().scan(&grid).is_empty());
    }

    #[cfg(feature = "backend-rxing")]
    #[test]
    fn reads_qr_code() {
        let grid = symbol_grid("HELLO-QR", rxing::BarcodeFormat::QR_CODE);
        let symbols = RqrrBackend::new().scan(&grid);
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].data, b"HELLO-QR");
        assert_eq!(symbols[0].symbology, "QRCODE");
    }

    #[cfg(feature = "backend-rxing")]
    #[test]
    fn ignores_linear_symbols() {
        let grid = symbol_grid("ABC-123", rxing::BarcodeFormat::CODE_128);
        assert!(RqrrBackend::new().scan(&grid).is_empty());
    }
}
