use std::fmt;

#[derive(Debug)]
pub enum Error {
    Pdf(lopdf::Error),
    Encrypted,
    InvalidPageRange { start: usize, end: usize, pages: usize },
    Closed,
    /// The DOCX builder failed to pack the document.
    Docx(String),
    Zip(zip::result::ZipError),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Pdf(e) => write!(f, "not a valid PDF file: {e}"),
            Error::Encrypted => write!(f, "encrypted PDF files are not supported"),
            Error::InvalidPageRange { start, end, pages } => write!(
                f,
                "page range {start}..={end} selects no pages (document has {pages})"
            ),
            Error::Closed => write!(f, "converter has already been closed"),
            Error::Docx(e) => write!(f, "DOCX error: {e}"),
            Error::Zip(e) => write!(f, "ZIP error: {e}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Pdf(e) => Some(e),
            Error::Zip(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(e: lopdf::Error) -> Self {
        // lopdf wraps file access failures in its own error type
        match e {
            lopdf::Error::IO(io) => Error::Io(io),
            other => Error::Pdf(other),
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Zip(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
