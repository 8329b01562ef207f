use barcode_worker_common::frame::PixelGrid;
use tracing::trace;

use super::symbology_tag;
use super::traits::{RawSymbol, SymbolBackend};

/// Multi-format backend: 1D retail and industrial codes plus QR, DataMatrix,
/// PDF417 and Aztec, via `rxing`'s multiple-barcode reader.
#[derive(Default)]
pub struct RxingBackend;

impl RxingBackend {
    pub fn new() -> Self {
        Self
    }
}

impl SymbolBackend for RxingBackend {
    fn scan(&mut self, grid: &PixelGrid) -> Vec<RawSymbol> {
        let luma = grid.packed().into_owned();
        match rxing::helpers::detect_multiple_in_luma(luma, grid.width(), grid.height()) {
            Ok(results) => results
                .iter()
                .map(|r| RawSymbol {
                    data: r.getText().as_bytes().to_vec(),
                    symbology: symbology_tag(&format!("{:?}", r.getBarcodeFormat())),
                })
                .collect(),
            // rxing reports "nothing found" as an error as well.
            Err(e) => {
                trace!(error = %e, "rxing found no symbols");
                Vec::new()
            }
        }
    }

    fn name(&self) -> &str {
        "rxing"
    }
}
