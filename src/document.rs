//! Document Collaborator Glue
//!
//! The document backend (pdf.js on the web, [`PaperDocument`] on desktop)
//! decodes files and rasterizes pages. This module holds the parts the
//! overlay owns: file validation, page navigation and the single-flight,
//! latest-wins render queue.

use crate::error::{OverlayError, Result};
use crate::geometry::SurfaceSize;

const PDF_MIME: &str = "application/pdf";
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Reject anything that is not a PDF before handing bytes to the backend
///
/// The browser-reported MIME type is trusted when present; otherwise the
/// header is sniffed.
pub fn validate_document(name: &str, mime: &str, bytes: &[u8]) -> Result<()> {
    if mime == PDF_MIME || (mime.is_empty() && bytes.starts_with(PDF_MAGIC)) {
        return Ok(());
    }
    Err(OverlayError::UnsupportedFile { name: name.to_string() })
}

/// What the backend reports after a successful load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentInfo {
    pub page_count: u32,
}

/// Current page within a loaded document (1-based)
///
/// Page turns are requests: `current` only moves when the render of the
/// requested page succeeds ([`PageNavigator::commit`]), so a failed render
/// leaves the viewer on the last good page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageNavigator {
    page_count: u32,
    current: u32,
    /// Newest requested page that has not rendered yet
    target: Option<u32>,
}

impl PageNavigator {
    pub fn new(info: DocumentInfo) -> Result<Self> {
        if info.page_count == 0 {
            return Err(OverlayError::Load("document has no pages".to_string()));
        }
        Ok(Self {
            page_count: info.page_count,
            current: 1,
            target: None,
        })
    }

    /// Last successfully rendered page
    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Page a render was requested for but has not completed
    pub fn target(&self) -> Option<u32> {
        self.target
    }

    /// Request the page after the newest requested one; `None` on the last page
    pub fn next_page(&mut self) -> Option<u32> {
        let from = self.target.unwrap_or(self.current);
        if from >= self.page_count {
            return None;
        }
        self.target = Some(from + 1);
        self.target
    }

    /// Request the page before the newest requested one; `None` on the first page
    pub fn previous_page(&mut self) -> Option<u32> {
        let from = self.target.unwrap_or(self.current);
        if from <= 1 {
            return None;
        }
        self.target = Some(from - 1);
        self.target
    }

    /// Request an arbitrary page
    pub fn go_to(&mut self, page: u32) -> Result<u32> {
        self.check(page)?;
        self.target = Some(page);
        Ok(page)
    }

    /// `page` rendered; it becomes the current page
    pub fn commit(&mut self, page: u32) -> Result<()> {
        self.check(page)?;
        self.current = page;
        if self.target == Some(page) {
            self.target = None;
        }
        Ok(())
    }

    /// Rendering `page` failed; stay on the current page
    pub fn reject(&mut self, page: u32) {
        if self.target == Some(page) {
            self.target = None;
        }
    }

    fn check(&self, page: u32) -> Result<()> {
        if page == 0 || page > self.page_count {
            return Err(OverlayError::PageOutOfRange {
                page,
                page_count: self.page_count,
            });
        }
        Ok(())
    }
}

/// One "render page N at width W" request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub width_hint: u32,
}

/// At most one render in flight; newer requests replace older pending ones
#[derive(Debug, Default, Clone)]
pub struct RenderQueue {
    in_flight: Option<PageRequest>,
    pending: Option<PageRequest>,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit a request
    ///
    /// Returns the request if it should start now; otherwise it becomes the
    /// pending request, superseding any earlier pending one.
    pub fn request(&mut self, request: PageRequest) -> Option<PageRequest> {
        if self.in_flight.is_none() {
            self.in_flight = Some(request);
            return Some(request);
        }
        if let Some(old) = self.pending.replace(request) {
            log::debug!("Render request for page {} superseded by page {}", old.page, request.page);
        }
        None
    }

    /// Mark the in-flight render as done (successfully or not)
    ///
    /// Returns the pending request, which is now in flight.
    pub fn finish(&mut self) -> Option<PageRequest> {
        self.in_flight = self.pending.take();
        self.in_flight
    }

    pub fn in_flight(&self) -> Option<PageRequest> {
        self.in_flight
    }

    pub fn pending(&self) -> Option<PageRequest> {
        self.pending
    }
}

/// A synchronous page renderer (the desktop stand-in for the web backend)
pub trait PageRenderer {
    fn info(&self) -> DocumentInfo;

    /// Rasterize `page` to fit `width_hint`; returns the output size
    fn render_page(&mut self, page: u32, width_hint: u32) -> Result<SurfaceSize>;
}

/// Blank paper pages with a fixed aspect ratio (height / width)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaperDocument {
    page_count: u32,
    aspect: f32,
}

impl PaperDocument {
    /// ISO 216 (A4 etc.) height/width ratio
    pub const ISO_ASPECT: f32 = std::f32::consts::SQRT_2;

    pub fn new(page_count: u32, aspect: f32) -> Self {
        Self { page_count, aspect }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }
}

impl PageRenderer for PaperDocument {
    fn info(&self) -> DocumentInfo {
        DocumentInfo {
            page_count: self.page_count,
        }
    }

    fn render_page(&mut self, page: u32, width_hint: u32) -> Result<SurfaceSize> {
        if page == 0 || page > self.page_count {
            return Err(OverlayError::PageOutOfRange {
                page,
                page_count: self.page_count,
            });
        }
        if width_hint == 0 {
            return Err(OverlayError::Render {
                page,
                reason: "zero target width".to_string(),
            });
        }
        let height = (width_hint as f32 * self.aspect).round() as u32;
        Ok(SurfaceSize::new(width_hint, height.max(1)))
    }
}
