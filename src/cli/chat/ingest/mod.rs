//! Turns an uploaded document into plain text for the prompt.
//!
//! Each supported format is an [`Extractor`] registered under a
//! [`DocumentKind`] in a [`FormatRegistry`]. Extraction returns a typed
//! [`IngestError`]; callers that must always get *some* text go through
//! [`FormatRegistry::extract_or_placeholder`], which is the only place an
//! error is folded into a placeholder string.

pub mod delimited;
pub mod pdf;
pub mod plain;
pub mod spreadsheet;
pub mod table;

use std::collections::HashMap;
use std::panic::{self, UnwindSafe};
use std::path::Path;

use eyre::{Result, WrapErr};
use thiserror::Error;
use tracing::{debug, warn};

/// A document handed to the ingestor: raw bytes, a file name and the
/// declared content type, if any.
#[derive(Debug, Clone)]
pub struct Upload {
    filename: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            bytes,
        }
    }

    /// Read a file from disk. The upload is named after the file's last path
    /// component.
    pub async fn from_path(path: &Path, content_type: Option<String>) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            filename,
            content_type,
            bytes,
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn kind(&self) -> DocumentKind {
        DocumentKind::detect(&self.filename, self.content_type())
    }
}

/// Normalized format key used to pick an extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    PlainText,
    Csv,
    Spreadsheet,
    Pdf,
    Unknown,
}

impl DocumentKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" => Some(Self::PlainText),
            "csv" => Some(Self::Csv),
            "xlsx" | "xls" => Some(Self::Spreadsheet),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Parameters such as `; charset=utf-8` are ignored.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "text/plain" => Some(Self::PlainText),
            "text/csv" => Some(Self::Csv),
            "application/vnd.ms-excel"
            | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                Some(Self::Spreadsheet)
            }
            "application/pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// The file extension wins; the declared MIME type is only consulted
    /// when the extension is missing or unrecognized.
    pub fn detect(filename: &str, content_type: Option<&str>) -> Self {
        Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .or_else(|| content_type.and_then(Self::from_mime))
            .unwrap_or(Self::Unknown)
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet parse error: {0}")]
    Spreadsheet(String),

    #[error("PDF parse error: {0}")]
    Pdf(String),

    #[error("expected {expected} fields in line {line}, saw {found}")]
    TooManyFields {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("no columns to parse from file")]
    NoColumns,

    #[error("unable to read file {0}")]
    Unreadable(String),
}

/// Something that can produce text from an uploaded document.
pub trait Extractor: Send + Sync {
    fn extract(&self, upload: &Upload) -> Result<String, IngestError>;
}

pub struct FormatRegistry {
    extractors: HashMap<DocumentKind, Box<dyn Extractor>>,
}

impl FormatRegistry {
    pub fn empty() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    pub fn register(&mut self, kind: DocumentKind, extractor: impl Extractor + 'static) {
        self.extractors.insert(kind, Box::new(extractor));
    }

    /// Kinds without a dedicated extractor go to the `Unknown` one.
    pub fn extract(&self, upload: &Upload) -> Result<String, IngestError> {
        let kind = upload.kind();
        debug!(filename = upload.filename(), ?kind, size = upload.bytes().len(), "Extracting text");

        let extractor = self
            .extractors
            .get(&kind)
            .or_else(|| self.extractors.get(&DocumentKind::Unknown))
            .ok_or_else(|| IngestError::Unreadable(upload.filename().to_string()))?;

        extractor.extract(upload)
    }

    /// Never fails: an extraction error becomes a bracketed placeholder that
    /// is passed along as if it were the document's content.
    pub fn extract_or_placeholder(&self, upload: &Upload) -> String {
        match self.extract(upload) {
            Ok(text) => text,
            Err(e) => {
                warn!(filename = upload.filename(), error = %e, "Falling back to placeholder text");
                placeholder(&e)
            }
        }
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(DocumentKind::PlainText, plain::PlainText);
        registry.register(DocumentKind::Csv, delimited::CsvExtractor);
        registry.register(DocumentKind::Spreadsheet, spreadsheet::SpreadsheetExtractor);
        registry.register(DocumentKind::Pdf, pdf::PdfExtractor);
        registry.register(DocumentKind::Unknown, plain::BestEffortText);
        registry
    }
}

pub fn placeholder(error: &IngestError) -> String {
    match error {
        IngestError::Unreadable(name) => format!("[Unable to read file {}]", name),
        other => format!("[Error while reading file: {}]", other),
    }
}

/// Third-party parsers may panic on malformed input; report that as an
/// ordinary extraction error instead.
pub(crate) fn catch_parser_panic<T>(
    wrap: fn(String) -> IngestError,
    parse: impl FnOnce() -> Result<T, IngestError> + UnwindSafe,
) -> Result<T, IngestError> {
    match panic::catch_unwind(parse) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "parser panicked".to_string());
            Err(wrap(message))
        }
    }
}
