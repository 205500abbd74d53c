//! Plain-text extraction from source documents (txt, docx, pdf).
//!
//! The normalizer is read-only: given a scanned [`SourceDocument`], it
//! returns the document's text or an [`ExtractError`]. Extraction errors
//! are isolated per document at the ingestion level — a broken file is
//! skipped with a warning and the batch continues.

use std::io::Read;

use crate::models::{DocumentKind, SourceDocument};

/// Maximum decompressed bytes to read from a docx XML entry (zip-bomb
/// protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Normalizer failure taxonomy. Never panics; the ingestion loop decides
/// whether to skip or abort.
#[derive(Debug)]
pub enum ExtractError {
    UnsupportedFormat(String),
    Io(String),
    Pdf(String),
    Docx(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnsupportedFormat(ext) => write!(f, "unsupported format: {}", ext),
            ExtractError::Io(e) => write!(f, "read failed: {}", e),
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Docx(e) => write!(f, "DOCX extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extract UTF-8 plain text from a source document.
///
/// The returned string may be empty when the document has no extractable
/// text; the chunker turns that into zero chunks.
pub fn extract_document(doc: &SourceDocument) -> Result<String, ExtractError> {
    let bytes = std::fs::read(&doc.abs_path).map_err(|e| ExtractError::Io(e.to_string()))?;
    match doc.kind {
        DocumentKind::Text => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        DocumentKind::Word => extract_docx(&bytes),
        DocumentKind::Pdf => extract_pdf(&bytes),
    }
}

/// Extract text from in-memory bytes by extension (used by tests and the
/// scan-level dispatch).
pub fn extract_bytes(bytes: &[u8], extension: &str) -> Result<String, ExtractError> {
    match DocumentKind::from_extension(extension) {
        Some(DocumentKind::Text) => Ok(String::from_utf8_lossy(bytes).into_owned()),
        Some(DocumentKind::Word) => extract_docx(bytes),
        Some(DocumentKind::Pdf) => extract_pdf(bytes),
        None => Err(ExtractError::UnsupportedFormat(extension.to_string())),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    // pdf-extract salvages what it can page by page; a hard failure here
    // means the whole file is unreadable.
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;

    let mut doc_xml = Vec::new();
    {
        let entry = archive
            .by_name("word/document.xml")
            .map_err(|_| ExtractError::Docx("word/document.xml not found".to_string()))?;
        entry
            .take(MAX_XML_ENTRY_BYTES)
            .read_to_end(&mut doc_xml)
            .map_err(|e| ExtractError::Docx(e.to_string()))?;
        if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
            return Err(ExtractError::Docx(
                "word/document.xml exceeds size limit".to_string(),
            ));
        }
    }

    extract_word_runs(&doc_xml)
}

/// Collect `w:t` text runs; paragraph ends (`w:p`) become blank lines so
/// the chunker sees paragraph boundaries.
fn extract_word_runs(xml: &[u8]) -> Result<String, ExtractError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if in_text => {
                out.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if !out.is_empty() && !out.ends_with("\n\n") {
                        out.push_str("\n\n");
                    }
                }
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(out.trim_end().to_string())
}
