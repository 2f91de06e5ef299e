pub mod chat;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod index;
pub mod prompt;
pub mod rag;

#[cfg(test)]
mod test_server;
