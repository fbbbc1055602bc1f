mod docx;
mod error;
mod fonts;
mod layout;
mod model;
mod pdf;

pub use error::Error;

use std::path::{Path, PathBuf};

/// Which pages to convert. Pages are 1-based and both ends are inclusive;
/// `None` means the first or last page of the document.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ConvertOptions {
    pub start: Option<usize>,
    pub end: Option<usize>,
}

/// An opened PDF, ready to be written out as DOCX.
///
/// The parsed document is held until [`Converter::close`] is called or the
/// converter is dropped.
pub struct Converter {
    source: PathBuf,
    pdf: Option<lopdf::Document>,
}

impl Converter {
    pub fn open(input: impl AsRef<Path>) -> Result<Self, Error> {
        let source = input.as_ref().to_path_buf();
        let bytes = std::fs::read(&source)?;
        let pdf = match lopdf::Document::load_mem(&bytes) {
            Ok(pdf) if pdf.is_encrypted() => return Err(Error::Encrypted),
            Ok(pdf) => pdf,
            // lopdf gives up on some encrypted files before reporting them as such
            Err(e) if has_encrypt_entry(&bytes) => {
                log::debug!("load failed on encrypted file: {e}");
                return Err(Error::Encrypted);
            }
            Err(e) => return Err(e.into()),
        };
        log::info!(
            "opened {} ({} pages, PDF {})",
            source.display(),
            pdf.get_pages().len(),
            pdf.version
        );
        Ok(Converter { source, pdf: Some(pdf) })
    }

    pub fn page_count(&self) -> usize {
        self.pdf.as_ref().map_or(0, |pdf| pdf.get_pages().len())
    }

    /// Converts the selected pages and writes the DOCX to `output`. Nothing
    /// is written unless the whole document rendered.
    pub fn convert(&self, output: impl AsRef<Path>, options: &ConvertOptions) -> Result<(), Error> {
        let pdf = self.pdf.as_ref().ok_or(Error::Closed)?;
        let doc = extract(pdf, options)?;
        let bytes = docx::render(&doc)?;
        std::fs::write(output.as_ref(), bytes)?;
        log::info!(
            "wrote {} ({} pages) from {}",
            output.as_ref().display(),
            doc.pages.len(),
            self.source.display()
        );
        Ok(())
    }

    pub fn close(&mut self) {
        if self.pdf.take().is_some() {
            log::debug!("closed {}", self.source.display());
        }
    }
}

fn has_encrypt_entry(bytes: &[u8]) -> bool {
    bytes.windows(b"/Encrypt".len()).any(|w| w == b"/Encrypt")
}

fn extract(pdf: &lopdf::Document, options: &ConvertOptions) -> Result<model::Document, Error> {
    let pages = pdf.get_pages();
    let total = pages.len();
    let start = options.start.unwrap_or(1).max(1);
    let end = options.end.unwrap_or(total).min(total);
    if start > end {
        return Err(Error::InvalidPageRange {
            start,
            end: options.end.unwrap_or(total),
            pages: total,
        });
    }

    let (title, author) = pdf::metadata(pdf);
    let mut reader = pdf::PageReader::new(pdf);
    let pages = pages
        .into_iter()
        .skip(start - 1)
        .take(end - start + 1)
        .map(|(number, id)| layout::layout_page(&reader.read_page(number, id)))
        .collect();

    Ok(model::Document { title, author, pages })
}

/// Opens `input`, converts every page to `output`, and closes the converter.
pub fn convert_pdf_to_docx(input: &Path, output: &Path) -> Result<(), Error> {
    let mut converter = Converter::open(input)?;
    converter.convert(output, &ConvertOptions::default())?;
    converter.close();
    Ok(())
}
