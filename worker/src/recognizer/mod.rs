pub mod traits;

#[cfg(feature = "backend-rqrr")]
pub mod rqrr_backend;
#[cfg(feature = "backend-rxing")]
pub mod rxing_backend;

use barcode_worker_common::frame::PixelGrid;
use tracing::debug;

use self::traits::{RawSymbol, SymbolBackend};

/// A recognized symbol with a usable payload: lossy UTF-8, trimmed, never
/// empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub payload: String,
    pub symbology: String,
}

impl Detection {
    /// Normalize a backend symbol. Returns `None` when nothing but whitespace
    /// remains.
    pub fn from_raw(raw: &RawSymbol) -> Option<Self> {
        let text = String::from_utf8_lossy(&raw.data);
        let payload = text.trim();
        if payload.is_empty() {
            return None;
        }
        Some(Self {
            payload: payload.to_string(),
            symbology: raw.symbology.clone(),
        })
    }
}

/// Runs a backend over a grid and normalizes what it reports.
pub struct Recognizer {
    backend: Box<dyn SymbolBackend>,
}

impl Recognizer {
    pub fn new(backend: Box<dyn SymbolBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Detections in backend order, with empty payloads dropped.
    pub fn recognize(&mut self, grid: &PixelGrid) -> Vec<Detection> {
        let raw = self.backend.scan(grid);
        let detections: Vec<Detection> = raw.iter().filter_map(Detection::from_raw).collect();
        if raw.len() != detections.len() {
            debug!(
                backend = self.backend.name(),
                dropped = raw.len() - detections.len(),
                "discarded symbols with empty payload"
            );
        }
        detections
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecognizerError {
    #[error("unknown barcode backend {name:?} (available: {available})")]
    Unknown { name: String, available: String },
    #[cfg(not(all(feature = "backend-rxing", feature = "backend-rqrr")))]
    #[error("barcode backend {0:?} is not compiled into this build")]
    NotCompiled(String),
    #[error("no barcode backend is compiled into this build")]
    NoneAvailable,
}

/// Backends compiled into this build, in `auto` preference order.
pub fn available_backends() -> Vec<&'static str> {
    let mut names = Vec::new();
    if cfg!(feature = "backend-rxing") {
        names.push("rxing");
    }
    if cfg!(feature = "backend-rqrr") {
        names.push("rqrr");
    }
    names
}

/// Resolve a backend by name. `auto` picks the first compiled-in backend.
pub fn build_backend(name: &str) -> Result<Box<dyn SymbolBackend>, RecognizerError> {
    let resolved = match name {
        "auto" => *available_backends()
            .first()
            .ok_or(RecognizerError::NoneAvailable)?,
        other => other,
    };

    match resolved {
        "rxing" => {
            #[cfg(feature = "backend-rxing")]
            return Ok(Box::new(rxing_backend::RxingBackend::new()));
            #[cfg(not(feature = "backend-rxing"))]
            return Err(RecognizerError::NotCompiled(resolved.to_string()));
        }
        "rqrr" => {
            #[cfg(feature = "backend-rqrr")]
            return Ok(Box::new(rqrr_backend::RqrrBackend::new()));
            #[cfg(not(feature = "backend-rqrr"))]
            return Err(RecognizerError::NotCompiled(resolved.to_string()));
        }
        other => Err(RecognizerError::Unknown {
            name: other.to_string(),
            available: available_backends().join(", "),
        }),
    }
}

/// Map a backend's format name onto the zbar-style tag consumers expect:
/// upper case, no separators (`EAN_13` -> `EAN13`, `QR_CODE` -> `QRCODE`).
pub fn symbology_tag(raw: &str) -> String {
    let tag: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    match tag.as_str() {
        "ITF" => "I25".into(),
        "RSS14" => "DATABAR".into(),
        "RSSEXPANDED" => "DATABAR_EXP".into(),
        _ => tag,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Backend that replays a fixed list of symbols for every grid.
    pub(crate) struct FixedBackend(pub Vec<RawSymbol>);

    impl SymbolBackend for FixedBackend {
        fn scan(&mut self, _grid: &PixelGrid) -> Vec<RawSymbol> {
            self.0.clone()
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    pub(crate) fn raw(data: &[u8], symbology: &str) -> RawSymbol {
        RawSymbol {
            data: data.to_vec(),
            symbology: symbology.into(),
        }
    }

    /// Render `contents` as a real symbol with a white quiet zone, as one
    /// base64 JPEG input line.
    #[cfg(feature = "backend-rxing")]
    pub(crate) fn symbol_line(contents: &str, format: rxing::BarcodeFormat) -> String {
        use image::{GrayImage, Luma};
        use rxing::Writer;

        const PAD: u32 = 20;
        let matrix = rxing::MultiFormatWriter
            .encode(contents, &format, 300, 150)
            .unwrap();
        let (w, h) = (matrix.getWidth(), matrix.getHeight());
        let img = GrayImage::from_fn(w + 2 * PAD, h + 2 * PAD, |x, y| {
            let inside = (PAD..w + PAD).contains(&x) && (PAD..h + PAD).contains(&y);
            if inside && matrix.get(x - PAD, y - PAD) {
                Luma([0])
            } else {
                Luma([255])
            }
        });
        crate::decoder::tests::gray_line(img)
    }

    /// Decode a rendered line back into the grid a backend sees.
    #[cfg(feature = "backend-rxing")]
    pub(crate) fn symbol_grid(contents: &str, format: rxing::BarcodeFormat) -> PixelGrid {
        use barcode_worker_common::config::DecoderConfig;

        crate::decoder::FrameDecoder::new(&DecoderConfig::default())
            .decode(symbol_line(contents, format).as_bytes())
            .unwrap()
    }

    fn grid() -> PixelGrid {
        PixelGrid::new(4, 4, vec![0; 16]).unwrap()
    }

    #[test]
    fn trims_and_drops_empty_payloads() {
        let mut recognizer = Recognizer::new(Box::new(FixedBackend(vec![
            raw(b"   ", "QRCODE"),
            raw(b"  4006381333931\n", "EAN13"),
            raw(b"", "CODE128"),
        ])));
        let detections = recognizer.recognize(&grid());
        assert_eq!(
            detections,
            vec![Detection {
                payload: "4006381333931".into(),
                symbology: "EAN13".into(),
            }]
        );
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut recognizer =
            Recognizer::new(Box::new(FixedBackend(vec![raw(b"ab\xFFcd", "QRCODE")])));
        let detections = recognizer.recognize(&grid());
        assert_eq!(detections[0].payload, "ab\u{FFFD}cd");
    }

    #[test]
    fn keeps_backend_order() {
        let mut recognizer = Recognizer::new(Box::new(FixedBackend(vec![
            raw(b"second-in-space", "QRCODE"),
            raw(b"first-in-space", "CODE128"),
        ])));
        let payloads: Vec<_> = recognizer
            .recognize(&grid())
            .into_iter()
            .map(|d| d.payload)
            .collect();
        assert_eq!(payloads, ["second-in-space", "first-in-space"]);
    }

    #[test]
    fn no_symbols_is_empty() {
        let mut recognizer = Recognizer::new(Box::new(FixedBackend(vec![])));
        assert!(recognizer.recognize(&grid()).is_empty());
    }

    #[test]
    fn symbology_tags() {
        assert_eq!(symbology_tag("EAN_13"), "EAN13");
        assert_eq!(symbology_tag("QR_CODE"), "QRCODE");
        assert_eq!(symbology_tag("UPC_A"), "UPCA");
        assert_eq!(symbology_tag("code 128"), "CODE128");
        assert_eq!(symbology_tag("ITF"), "I25");
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let err = build_backend("zbar").err().unwrap();
        assert!(matches!(err, RecognizerError::Unknown { .. }));
    }

    #[cfg(all(feature = "backend-rxing", feature = "backend-rqrr"))]
    #[test]
    fn auto_prefers_rxing() {
        assert_eq!(available_backends(), ["rxing", "rqrr"]);
        assert_eq!(build_backend("auto").unwrap().name(), "rxing");
        assert_eq!(build_backend("rqrr").unwrap().name(), "rqrr");
    }
}
