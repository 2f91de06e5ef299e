use crate::error::{RagError, Result};
use log::{debug, info, warn};
use mime_guess::from_path;
use std::fs;
use std::path::{Path, PathBuf};

/// A PDF file read into memory
#[derive(Debug, Clone)]
pub struct Document {
    /// Where the document was read from
    pub path: PathBuf,
    /// Raw file contents
    pub bytes: Vec<u8>,
}

impl Document {
    /// Read a document from a file path
    pub fn from_file<P: AsRef<Path>>(file_path: P) -> Result<Self> {
        let path = file_path.as_ref().to_path_buf();
        let bytes = fs::read(&path).map_err(|e| RagError::Pdf {
            path: path.clone(),
            message: format!("cannot read file: {}", e),
        })?;

        Ok(Document { path, bytes })
    }
}

/// Check the file extension against the PDF MIME type
pub fn is_pdf<P: AsRef<Path>>(path: P) -> bool {
    from_path(path)
        .first()
        .map(|mime| mime.essence_str() == "application/pdf")
        .unwrap_or(false)
}

/// Load every PDF in a directory, ordered by file name
///
/// Subdirectories and files of other types are ignored. A directory without
/// any PDF is an error so the caller never builds an empty index.
pub fn load_documents<P: AsRef<Path>>(dir: P) -> Result<Vec<Document>> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|source| RagError::DocumentsDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| RagError::DocumentsDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && is_pdf(&path) {
            paths.push(path);
        } else {
            debug!("Skipping {}", path.display());
        }
    }

    if paths.is_empty() {
        return Err(RagError::NoDocuments(dir.to_path_buf()));
    }

    paths.sort();
    info!("Found {} PDF documents in {}", paths.len(), dir.display());

    paths.iter().map(Document::from_file).collect()
}

/// Capability for pulling the text of each page out of a document
#[allow(async_fn_in_trait)]
pub trait TextExtractor {
    /// Text of every page in order; pages without text may be empty strings
    async fn extract_pages(&self, document: &Document) -> Result<Vec<String>>;
}

/// Page text extraction backed by `pdf-extract`
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    async fn extract_pages(&self, document: &Document) -> Result<Vec<String>> {
        info!("Processing PDF document: {}", document.path.display());

        let bytes = document.bytes.clone();
        // pdf-extract is CPU bound and may panic on unusual fonts
        let extraction = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        })
        .await
        .map_err(|e| RagError::Pdf {
            path: document.path.clone(),
            message: format!("extraction aborted: {}", e),
        })?;

        extraction.map_err(|e| RagError::Pdf {
            path: document.path.clone(),
            message: e.to_string(),
        })
    }
}

/// Concatenate the text of all pages of all documents
///
/// Pages that yield no text are skipped. `page_separator` is placed between
/// consecutive non-empty pages (also across document boundaries).
pub async fn extract_text<E: TextExtractor>(
    extractor: &E,
    documents: &[Document],
    page_separator: &str,
) -> Result<String> {
    let mut text = String::new();
    let mut first_page = true;

    for document in documents {
        let pages = extractor.extract_pages(document).await?;

        for (page_number, page) in pages.iter().enumerate() {
            let cleaned = normalize_whitespace(page);
            if cleaned.is_empty() {
                warn!(
                    "No text on page {} of {}, skipping",
                    page_number + 1,
                    document.path.display()
                );
                continue;
            }

            if !first_page {
                text.push_str(page_separator);
            }
            text.push_str(&cleaned);
            // A page that ends a line keeps that line break
            if page
                .trim_end_matches(|c| c == ' ' || c == '\t' || c == '\r')
                .ends_with('\n')
            {
                text.push('\n');
            }
            first_page = false;
        }
    }

    if text.is_empty() {
        return Err(RagError::EmptyText);
    }

    Ok(text)
}

/// Normalize whitespace in text (remove multiple consecutive spaces, newlines, etc.)
fn normalize_whitespace(text: &str) -> String {
    let result = text.replace('\r', "");

    // Replace multiple consecutive newlines with double newlines (paragraph separator)
    let mut prev_char = ' ';
    let mut newline_count = 0;
    let mut normalized = String::with_capacity(result.len());

    for c in result.chars() {
        if c == '\n' {
            newline_count += 1;
        } else {
            if newline_count > 0 {
                if newline_count >= 2 {
                    normalized.push_str("\n\n");
                } else {
                    normalized.push('\n');
                }
                newline_count = 0;
                prev_char = '\n';
            }

            // Don't add consecutive spaces
            if !(c == ' ' && prev_char == ' ') {
                normalized.push(c);
            }

            prev_char = c;
        }
    }

    normalized.trim().to_string()
}
