use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use log::{error, info, warn};
use std::io::{self, Write};
use std::path::PathBuf;

use pdf_chat::chat::{ChatClient, ChatModel};
use pdf_chat::config::AppConfig;
use pdf_chat::document::PdfTextExtractor;
use pdf_chat::embeddings::{Embedder, HuggingFaceEmbedder};
use pdf_chat::error::RagError;
use pdf_chat::rag::Session;

/// Chat with the PDF documents in a folder
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Folder containing the PDF documents (overrides DOCUMENTS_DIR)
    #[arg(short, long)]
    documents_dir: Option<PathBuf>,

    /// Number of chunks retrieved per question (overrides TOP_K)
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Maximum chunk length in characters (overrides CHUNK_SIZE)
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Characters shared by neighbouring chunks (overrides CHUNK_OVERLAP)
    #[arg(long)]
    chunk_overlap: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    // Load configuration from environment, then apply command line overrides
    let mut config = AppConfig::from_env().context("Invalid configuration")?;
    if let Some(dir) = args.documents_dir {
        config.pipeline.documents_dir = dir;
    }
    if let Some(top_k) = args.top_k {
        config.conversation.top_k = top_k;
    }
    if let Some(size) = args.chunk_size {
        config.pipeline.chunking.chunk_size = size;
    }
    if let Some(overlap) = args.chunk_overlap {
        config.pipeline.chunking.chunk_overlap = overlap;
    }

    let embedder = HuggingFaceEmbedder::new(config.embeddings.clone())
        .context("Failed to initialize embeddings client")?;
    let chat = ChatClient::new(config.chat.clone()).context("Failed to initialize chat client")?;

    info!(
        "Using chat model {} and embedding model {}",
        chat.config().model,
        embedder.config().model
    );

    let mut session = Session::new(chat, config.conversation.clone());

    println!("Processing documents...");
    match session
        .load_documents(&config.pipeline, &PdfTextExtractor, embedder)
        .await
    {
        Ok(()) => {
            let chunks = session.index().map(|index| index.len()).unwrap_or(0);
            println!("Documents processed successfully! ({} chunks indexed)", chunks);
        }
        // Keep the loop running so questions get a clear "not ready" answer
        Err(e) => {
            error!("Document processing failed: {}", e);
            println!("Error: {}", e);
        }
    }

    run_chat_loop(&mut session).await
}

/// Read questions from stdin until `exit` and print each answer
async fn run_chat_loop<E: Embedder, C: ChatModel>(session: &mut Session<E, C>) -> Result<()> {
    println!("Ask a question about your documents. Type '/history' to review, 'exit' to quit.");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut buffer = String::new();

    loop {
        print!("\nYou: ");
        stdout.flush()?;

        buffer.clear();
        if stdin.read_line(&mut buffer)? == 0 {
            break;
        }

        let question = buffer.trim();
        match question.to_lowercase().as_str() {
            "" => continue,
            "exit" | "quit" => {
                info!("Goodbye!");
                break;
            }
            "/history" => {
                print_history(session);
                continue;
            }
            _ => {}
        }

        match session.ask(question).await {
            Ok(answer) => println!("\nAssistant: {}", answer),
            Err(RagError::NotReady) => {
                warn!("Question asked before documents were processed");
                println!("Documents are still being processed. Please wait.");
            }
            Err(e) => {
                error!("Failed to answer question: {}", e);
                println!("Error: {}", e);
            }
        }
    }

    Ok(())
}

fn print_history<E: Embedder, C: ChatModel>(session: &Session<E, C>) {
    if session.turns().is_empty() {
        println!("No questions asked yet.");
        return;
    }
    for turn in session.turns() {
        println!("\nYou: {}", turn.question);
        println!("Assistant: {}", turn.answer);
    }
}
