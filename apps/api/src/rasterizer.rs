//! Rasterizer — converts each page of a PDF resume into a JPEG image for the
//! multimodal extraction call.
//!
//! Contract: returns the ordered list of page image paths that were written
//! (`page_1.jpg`, `page_2.jpg`, ...). Any render or I/O failure is logged and
//! truncates the list at the last page that succeeded; callers must treat a
//! short or empty result as possible success, not assume completeness.

use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use pdfium_render::prelude::*;
use thiserror::Error;
use tracing::{info, warn};

/// PDF user space is 72 points per inch.
const PDF_POINTS_PER_INCH: f32 = 72.0;

pub const DEFAULT_DPI: u32 = 300;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdfium error: {0}")]
    Pdfium(#[from] PdfiumError),

    #[error("image encode error: {0}")]
    Image(#[from] image::ImageError),
}

/// Renders every page of `document_path` into `output_dir` at `dpi`.
///
/// Silent-partial-failure policy: errors are logged, never raised, and the
/// successfully written prefix of pages is returned. A corrupt document (or a
/// missing pdfium library) yields an empty list.
pub fn rasterize(document_path: &Path, output_dir: &Path, dpi: u32) -> Vec<PathBuf> {
    let mut pages = Vec::new();
    if let Err(e) = render_pages(document_path, output_dir, dpi, &mut pages) {
        warn!(
            document = %document_path.display(),
            rendered = pages.len(),
            error = %e,
            "PDF rasterization stopped early"
        );
    }
    pages
}

fn render_pages(
    document_path: &Path,
    output_dir: &Path,
    dpi: u32,
    pages: &mut Vec<PathBuf>,
) -> Result<(), RasterError> {
    fs::create_dir_all(output_dir)?;

    let pdfium = bind_pdfium()?;
    let document = pdfium.load_pdf_from_file(document_path, None)?;
    info!(
        document = %document_path.display(),
        page_count = document.pages().len(),
        "Opened PDF for rasterization"
    );

    let scale = dpi as f32 / PDF_POINTS_PER_INCH;

    for (index, page) in document.pages().iter().enumerate() {
        let target_width = (page.width().value * scale) as i32;
        let target_height = (page.height().value * scale) as i32;

        let render_config = PdfRenderConfig::new()
            .set_target_width(target_width)
            .set_target_height(target_height);

        let bitmap = page.render_with_config(&render_config)?;
        let output_file = output_dir.join(page_file_name(index + 1));

        // JPEG has no alpha channel; drop it before encoding.
        bitmap
            .as_image()
            .to_rgb8()
            .save_with_format(&output_file, ImageFormat::Jpeg)?;

        // Bitmap drops here, before the next page renders, bounding peak memory.
        pages.push(output_file);
    }

    Ok(())
}

/// Page image file name, 1-based.
pub fn page_file_name(page_number: usize) -> String {
    format!("page_{page_number}.jpg")
}

/// Binds pdfium from the working directory first, then the system library.
fn bind_pdfium() -> Result<Pdfium, PdfiumError> {
    let local = Pdfium::pdfium_platform_library_name_at_path("./");
    match Pdfium::bind_to_library(&local) {
        Ok(bindings) => Ok(Pdfium::new(bindings)),
        Err(_) => Pdfium::bind_to_system_library().map(Pdfium::new),
    }
}
