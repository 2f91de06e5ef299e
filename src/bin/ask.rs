use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use log::info;

use pdf_chat::chat::{ChatClient, ChatConfig, ChatMessage, ChatModel};

/// Send a single question to the chat-completion API and print the reply
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The question to ask
    #[arg(index = 1)]
    question: String,

    /// System message framing the conversation
    #[arg(short, long, default_value = "You are grok, a helpful assistant")]
    system: String,

    /// Model identifier (overrides CHAT_MODEL)
    #[arg(short, long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    let mut config = ChatConfig::from_env().context("Missing GROK_API_KEY")?;
    if let Some(model) = args.model {
        config.model = model;
    }
    info!("Asking {} at {}", config.model, config.api_base);

    let client = ChatClient::new(config)?;
    let messages = [
        ChatMessage::system(args.system),
        ChatMessage::user(args.question),
    ];

    let answer = client
        .complete(&messages)
        .await
        .context("Chat completion failed")?;

    println!("{}", answer);
    Ok(())
}
