use std::path::PathBuf;
use thiserror::Error;

/// Failure talking to a remote model backend (embeddings or chat)
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("API request failed: {status} {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl BackendError {
    /// Classify a reqwest error, keeping timeouts distinct
    pub fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            BackendError::Timeout(timeout_secs)
        } else if err.is_decode() {
            BackendError::Malformed(err.to_string())
        } else {
            BackendError::Transport(err)
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, BackendError::Timeout(_))
    }
}

/// Everything that can go wrong while building the index or answering a question
#[derive(Error, Debug)]
pub enum RagError {
    #[error("no PDF files found in the directory: {}", .0.display())]
    NoDocuments(PathBuf),

    #[error("cannot read documents directory {}: {source}", .path.display())]
    DocumentsDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to extract text from PDF {}: {message}", .path.display())]
    Pdf { path: PathBuf, message: String },

    #[error("no text could be extracted from the documents")]
    EmptyText,

    #[error("invalid chunking parameters: {0}")]
    InvalidChunking(String),

    #[error("embedding failed: {0}")]
    Embedding(#[source] BackendError),

    #[error("retrieval failed: {0}")]
    Retrieval(#[source] BackendError),

    #[error("generation failed: {0}")]
    Generation(#[source] BackendError),

    #[error("documents are still being processed, please wait")]
    NotReady,

    #[error("the session already has a document index")]
    AlreadyReady,

    #[error("question is empty")]
    EmptyQuestion,
}

impl RagError {
    /// True when the underlying backend call hit the request timeout
    pub fn is_timeout(&self) -> bool {
        match self {
            RagError::Embedding(e) | RagError::Retrieval(e) | RagError::Generation(e) => {
                e.is_timeout()
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_visible_through_wrappers() {
        let err = RagError::Generation(BackendError::Timeout(30));
        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            "generation failed: request timed out after 30s"
        );

        let err = RagError::Embedding(BackendError::Malformed("empty vector".into()));
        assert!(!err.is_timeout());
        assert!(!RagError::NotReady.is_timeout());
    }

    #[test]
    fn test_no_documents_message_names_directory() {
        let err = RagError::NoDocuments(PathBuf::from("./documents/"));
        assert_eq!(
            err.to_string(),
            "no PDF files found in the directory: ./documents/"
        );
    }
}
