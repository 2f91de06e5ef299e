use crate::chat::ChatConfig;
use crate::chunking::ChunkingConfig;
use crate::embeddings::EmbeddingConfig;
use crate::prompt::PromptTemplate;
use crate::rag::{ConversationConfig, PipelineConfig};
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Everything the application reads from its environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub chat: ChatConfig,
    pub embeddings: EmbeddingConfig,
    pub pipeline: PipelineConfig,
    pub conversation: ConversationConfig,
}

impl AppConfig {
    /// Create a new configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let chat = ChatConfig::from_lookup(&lookup)?;
        let embeddings = EmbeddingConfig::from_lookup(&lookup)?;

        let defaults = PipelineConfig::default();
        let chunking = ChunkingConfig {
            separator: lookup("CHUNK_SEPARATOR")
                .map(|s| unescape(&s))
                .unwrap_or(defaults.chunking.separator),
            chunk_size: parse_or(&lookup, "CHUNK_SIZE", defaults.chunking.chunk_size)?,
            chunk_overlap: parse_or(&lookup, "CHUNK_OVERLAP", defaults.chunking.chunk_overlap)?,
        };
        let pipeline = PipelineConfig {
            documents_dir: lookup("DOCUMENTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.documents_dir),
            page_separator: lookup("PAGE_SEPARATOR")
                .map(|s| unescape(&s))
                .unwrap_or(defaults.page_separator),
            chunking,
        };

        let defaults = ConversationConfig::default();
        let conversation = ConversationConfig {
            top_k: parse_or(&lookup, "TOP_K", defaults.top_k)?,
            template: lookup("SYSTEM_PROMPT")
                .map(|s| PromptTemplate::new(unescape(&s)))
                .unwrap_or(defaults.template),
            condense_question: parse_or(&lookup, "CONDENSE_QUESTION", defaults.condense_question)?,
        };

        Ok(AppConfig {
            chat,
            embeddings,
            pipeline,
            conversation,
        })
    }
}

/// Parse an optional variable, falling back to `default` when unset
pub(crate) fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, value)),
        None => Ok(default),
    }
}

/// Expand `\n`, `\t` and `\\` written literally in `.env` files
fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    const CREDENTIALS: [(&str, &str); 2] = [
        ("GROK_API_KEY", "xai-test"),
        ("HUGGINGFACEHUB_API_TOKEN", "hf_test"),
    ];

    #[test]
    fn test_defaults() {
        let config = config_from(&CREDENTIALS).unwrap();

        assert_eq!(config.pipeline.documents_dir, PathBuf::from("./documents/"));
        assert_eq!(config.pipeline.page_separator, "");
        assert_eq!(config.pipeline.chunking, ChunkingConfig::default());
        assert_eq!(config.conversation.top_k, 4);
        assert!(!config.conversation.condense_question);
        assert_eq!(config.conversation.template, PromptTemplate::default());
        assert_eq!(config.chat.temperature, 0.5);
    }

    #[test]
    fn test_overrides() {
        let mut vars = CREDENTIALS.to_vec();
        vars.extend([
            ("DOCUMENTS_DIR", "/srv/pdfs"),
            ("CHUNK_SEPARATOR", "\\n\\n"),
            ("CHUNK_SIZE", "500"),
            ("CHUNK_OVERLAP", " 50 "),
            ("PAGE_SEPARATOR", "\\n"),
            ("TOP_K", "2"),
            ("CONDENSE_QUESTION", "true"),
        ]);
        let config = config_from(&vars).unwrap();

        assert_eq!(config.pipeline.documents_dir, PathBuf::from("/srv/pdfs"));
        assert_eq!(config.pipeline.chunking.separator, "\n\n");
        assert_eq!(config.pipeline.chunking.chunk_size, 500);
        assert_eq!(config.pipeline.chunking.chunk_overlap, 50);
        assert_eq!(config.pipeline.page_separator, "\n");
        assert_eq!(config.conversation.top_k, 2);
        assert!(config.conversation.condense_question);
    }

    #[test]
    fn test_missing_credentials() {
        assert!(config_from(&[("GROK_API_KEY", "xai-test")]).is_err());
        assert!(config_from(&[("HUGGINGFACEHUB_API_TOKEN", "hf_test")]).is_err());
    }

    #[test]
    fn test_invalid_number() {
        let mut vars = CREDENTIALS.to_vec();
        vars.push(("CHUNK_SIZE", "large"));
        let err = config_from(&vars).unwrap_err();
        assert!(err.to_string().contains("CHUNK_SIZE"));
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("a\\nb"), "a\nb");
        assert_eq!(unescape("tab\\there"), "tab\there");
        assert_eq!(unescape("keep\\x"), "keep\\x");
        assert_eq!(unescape("slash\\\\"), "slash\\");
        assert_eq!(unescape("end\\"), "end\\");
    }
}
