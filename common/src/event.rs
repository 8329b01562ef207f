use serde::Serialize;

/// One line of the worker's stdout protocol.
///
/// Wire shapes (one JSON object per line, newline-terminated):
///
///   {"status":"ready"}
///   {"barcode":"<payload>","format":"<symbology>"}
///   {"error":"<message>"}
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OutputEvent {
    Status {
        status: Status,
    },
    Barcode {
        #[serde(rename = "barcode")]
        payload: String,
        #[serde(rename = "format")]
        symbology: String,
    },
    Error {
        #[serde(rename = "error")]
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ready,
}

impl OutputEvent {
    pub fn ready() -> Self {
        Self::Status {
            status: Status::Ready,
        }
    }

    pub fn barcode(payload: impl Into<String>, symbology: impl Into<String>) -> Self {
        Self::Barcode {
            payload: payload.into(),
            symbology: symbology.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Serialize to a single newline-terminated line.
    pub fn to_line(&self) -> String {
        to_line(self)
    }
}

/// A capture device reported by the one-shot listing mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub id: u32,
    pub label: String,
}

/// The listing mode's single output line: a JSON array, possibly empty.
pub fn device_list_line(devices: &[DeviceInfo]) -> String {
    to_line(&devices)
}

fn to_line<T: Serialize + ?Sized>(value: &T) -> String {
    // Serializing these plain structs cannot fail: no maps with non-string
    // keys and no fallible Serialize impls.
    let mut line = serde_json::to_string(value).unwrap_or_default();
    line.push('\n');
    line
}
