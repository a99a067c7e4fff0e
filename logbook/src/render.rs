//! PDF page rasterisation
//!
//! The viewer only ever needs two things from a PDF: how many pages it has,
//! and one page as a PNG at a given zoom. [`PageRenderer`] is that seam;
//! [`PdfiumRenderer`] implements it with pdfium. Calls are blocking and
//! CPU-bound, so async callers run them on `spawn_blocking`.

use crate::config::{DEFAULT_ZOOM, ZOOM_LEVELS};
use crate::error::{AppError, Result};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::fmt;
use std::io::Cursor;
use std::path::PathBuf;
use std::str::FromStr;

/// Discrete magnification offered by the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoomLevel {
    Half,
    Normal,
    OneAndHalf,
    Double,
    Triple,
}

impl ZoomLevel {
    pub const ALL: [ZoomLevel; 5] = [
        ZoomLevel::Half,
        ZoomLevel::Normal,
        ZoomLevel::OneAndHalf,
        ZoomLevel::Double,
        ZoomLevel::Triple,
    ];

    pub fn factor(self) -> f32 {
        ZOOM_LEVELS[self as usize]
    }

    /// Match a factor against the offered levels
    pub fn from_factor(factor: f32) -> Result<Self> {
        ZoomLevel::ALL
            .into_iter()
            .find(|level| (level.factor() - factor).abs() < f32::EPSILON)
            .ok_or_else(|| AppError::InvalidZoom(factor.to_string()))
    }
}

impl Default for ZoomLevel {
    fn default() -> Self {
        // DEFAULT_ZOOM is one of ZOOM_LEVELS
        ZoomLevel::from_factor(DEFAULT_ZOOM).unwrap_or(ZoomLevel::Normal)
    }
}

impl fmt::Display for ZoomLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.factor())
    }
}

impl FromStr for ZoomLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_end_matches(['x', 'X']);
        let factor: f32 = trimmed
            .parse()
            .map_err(|_| AppError::InvalidZoom(s.to_string()))?;
        ZoomLevel::from_factor(factor)
    }
}

/// One rasterised page
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Zero-based page index
    pub page_index: usize,
    pub zoom: ZoomLevel,
    pub width: u32,
    pub height: u32,
    /// PNG-encoded image
    pub png: Vec<u8>,
}

/// Page counting and rasterisation of PDF bytes
pub trait PageRenderer: Send + Sync {
    /// Number of pages in the document
    fn page_count(&self, pdf: &[u8]) -> Result<u32>;

    /// Render one zero-based page as PNG
    fn render_page(&self, pdf: &[u8], page_index: usize, zoom: ZoomLevel) -> Result<RenderedPage>;
}

/// pdfium-backed renderer.
///
/// Binds the library on every call; nothing is cached between renders.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRenderer {
    library_path: Option<PathBuf>,
}

impl PdfiumRenderer {
    /// `library_path` may point at the shared library or at its directory;
    /// without it the system library is used.
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }

    fn bind(&self) -> Result<Pdfium> {
        let bindings = match &self.library_path {
            Some(path) if path.is_dir() => Pdfium::bind_to_library(
                Pdfium::pdfium_platform_library_name_at_path(path),
            ),
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| AppError::Render(format!("Failed to load pdfium: {:?}", e)))?;

        Ok(Pdfium::new(bindings))
    }
}

impl PageRenderer for PdfiumRenderer {
    fn page_count(&self, pdf: &[u8]) -> Result<u32> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| AppError::Render(format!("Failed to open PDF: {:?}", e)))?;

        let count = document.pages().len() as u32;
        tracing::debug!("PDF opened: {} pages", count);

        Ok(count)
    }

    fn render_page(&self, pdf: &[u8], page_index: usize, zoom: ZoomLevel) -> Result<RenderedPage> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| AppError::Render(format!("Failed to open PDF: {:?}", e)))?;

        let pages = document.pages();
        let total = pages.len() as usize;
        if page_index >= total {
            return Err(AppError::PageOutOfRange {
                page: page_index + 1,
                total,
            });
        }

        let page = pages
            .get(page_index as u16)
            .map_err(|e| AppError::Render(format!("Page {}: {:?}", page_index + 1, e)))?;

        let render_config = PdfRenderConfig::new().scale_page_by_factor(zoom.factor());

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| AppError::Render(format!("Page {}: {:?}", page_index + 1, e)))?;

        let image = bitmap.as_image();
        let png = encode_png(&image)?;

        tracing::debug!(
            "Rendered page {} at {} → {}x{} px",
            page_index + 1,
            zoom,
            image.width(),
            image.height()
        );

        Ok(RenderedPage {
            page_index,
            zoom,
            width: image.width(),
            height: image.height(),
            png,
        })
    }
}

/// Encode a rasterised page as PNG
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| AppError::Render(format!("PNG encoding failed: {}", e)))?;
    Ok(buf)
}
