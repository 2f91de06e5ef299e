use crate::chat::ChatModel;
use crate::chunking::{split_into_chunks, ChunkingConfig};
use crate::document::{extract_text, load_documents, TextExtractor};
use crate::embeddings::Embedder;
use crate::error::{RagError, Result};
use crate::index::{Retriever, VectorIndex};
use crate::prompt::{condense_messages, PromptTemplate};
use log::{debug, info, warn};
use std::path::PathBuf;

/// One question/answer exchange
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
}

/// Where documents come from and how their text is cut up
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub documents_dir: PathBuf,
    /// Inserted between consecutive pages before chunking
    pub page_separator: String,
    pub chunking: ChunkingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            documents_dir: PathBuf::from("./documents/"),
            page_separator: String::new(),
            chunking: ChunkingConfig::default(),
        }
    }
}

/// How questions are answered once documents are indexed
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Number of chunks retrieved per question
    pub top_k: usize,
    pub template: PromptTemplate,
    /// Rewrite follow-up questions into standalone ones before retrieval
    pub condense_question: bool,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        ConversationConfig {
            top_k: 4,
            template: PromptTemplate::default(),
            condense_question: false,
        }
    }
}

/// Load, extract, chunk and embed the configured documents
///
/// Nothing is returned unless every stage succeeds.
pub async fn build_index<X, E>(
    config: &PipelineConfig,
    extractor: &X,
    embedder: &E,
) -> Result<VectorIndex>
where
    X: TextExtractor,
    E: Embedder,
{
    config.chunking.validate()?;

    info!("Loading documents from {}", config.documents_dir.display());
    let documents = load_documents(&config.documents_dir)?;

    info!("Extracting text from {} PDFs", documents.len());
    let raw_text = extract_text(extractor, &documents, &config.page_separator).await?;
    debug!("Extracted {} bytes of text", raw_text.len());

    info!("Splitting text into chunks");
    let chunks = split_into_chunks(&raw_text, &config.chunking)?;
    info!("Split into {} chunks", chunks.len());

    info!("Creating vector index");
    VectorIndex::build(embedder, chunks).await
}

enum SessionState<E> {
    NotReady,
    Ready(Retriever<E>),
}

/// Conversation state for a single user
///
/// Starts without an index and rejects questions until [`Session::activate`]
/// or [`Session::load_documents`] succeeds. Each session owns its index and
/// history.
pub struct Session<E, C> {
    state: SessionState<E>,
    chat: C,
    config: ConversationConfig,
    turns: Vec<ConversationTurn>,
}

impl<E: Embedder, C: ChatModel> Session<E, C> {
    /// Create a session that is not ready to answer yet
    pub fn new(chat: C, config: ConversationConfig) -> Self {
        Session {
            state: SessionState::NotReady,
            chat,
            config,
            turns: Vec::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, SessionState::Ready(_))
    }

    /// The index backing this session, once ready
    pub fn index(&self) -> Option<&VectorIndex> {
        match &self.state {
            SessionState::Ready(retriever) => Some(retriever.index()),
            SessionState::NotReady => None,
        }
    }

    /// Every completed exchange, oldest first
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Attach a retriever; allowed exactly once
    pub fn activate(&mut self, retriever: Retriever<E>) -> Result<()> {
        if self.is_ready() {
            return Err(RagError::AlreadyReady);
        }
        self.state = SessionState::Ready(retriever);
        Ok(())
    }

    /// Run the document pipeline and activate the session with its index
    ///
    /// On failure the session stays not ready.
    pub async fn load_documents<X: TextExtractor>(
        &mut self,
        pipeline: &PipelineConfig,
        extractor: &X,
        embedder: E,
    ) -> Result<()> {
        if self.is_ready() {
            return Err(RagError::AlreadyReady);
        }
        let index = build_index(pipeline, extractor, &embedder).await?;
        self.activate(Retriever::new(embedder, index))
    }

    /// Answer a question from the indexed documents
    ///
    /// The turn is only recorded when generation succeeds.
    pub async fn ask(&mut self, question: &str) -> Result<String> {
        let retriever = match &self.state {
            SessionState::Ready(retriever) => retriever,
            SessionState::NotReady => {
                warn!("Question received before documents were processed");
                return Err(RagError::NotReady);
            }
        };

        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::EmptyQuestion);
        }

        let search_query = if self.config.condense_question && !self.turns.is_empty() {
            let condensed = self
                .chat
                .complete(&condense_messages(&self.turns, question))
                .await
                .map_err(RagError::Generation)?;
            let condensed = condensed.trim();
            debug!("Condensed question: {}", condensed);
            if condensed.is_empty() {
                question.to_string()
            } else {
                condensed.to_string()
            }
        } else {
            question.to_string()
        };

        let chunks = retriever.query(&search_query, self.config.top_k).await?;
        info!("Retrieved {} chunks for question", chunks.len());

        let messages = self
            .config
            .template
            .build_messages(&chunks, &self.turns, question);
        let answer = self
            .chat
            .complete(&messages)
            .await
            .map_err(RagError::Generation)?;

        self.turns.push(ConversationTurn {
            question: question.to_string(),
            answer: answer.clone(),
        });

        Ok(answer)
    }
}
