use barcode_worker_common::frame::PixelGrid;

/// A symbol as reported by a backend, before payload normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSymbol {
    pub data: Vec<u8>,
    /// Normalized tag, see [`super::symbology_tag`].
    pub symbology: String,
}

/// Pluggable barcode/QR decoding backend.
///
/// Implementations scan a grayscale grid and return every symbol they find,
/// in their own order. Scanning never fails: a backend that hits an internal
/// error reports nothing for that grid.
pub trait SymbolBackend: Send {
    fn scan(&mut self, grid: &PixelGrid) -> Vec<RawSymbol>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}
