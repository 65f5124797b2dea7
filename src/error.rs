//! Error Types
//!
//! Every fallible operation in the crate reports an [`OverlayError`]. Drawing
//! state is never touched on the error path, so callers can surface the
//! message and carry on with the previous page/state.

use thiserror::Error;

/// Errors surfaced to the page shell or the desktop host
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OverlayError {
    /// The selected file is not a PDF document
    #[error("unsupported file '{name}': only PDF documents can be opened")]
    UnsupportedFile { name: String },

    /// The document backend failed to decode the file
    #[error("error loading PDF: {0}")]
    Load(String),

    /// The document backend failed to rasterize a page
    #[error("failed to render page {page}: {reason}")]
    Render { page: u32, reason: String },

    /// Navigation to a page that does not exist
    #[error("page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    /// A configuration value failed validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Stroke color/width inputs could not be parsed
    #[error("invalid stroke style: {0}")]
    InvalidStyle(String),
}

pub type Result<T> = std::result::Result<T, OverlayError>;

#[cfg(target_arch = "wasm32")]
impl From<OverlayError> for wasm_bindgen::JsValue {
    fn from(err: OverlayError) -> Self {
        wasm_bindgen::JsValue::from_str(&err.to_string())
    }
}
