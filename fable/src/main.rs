//! Chat CLI for the fable storytelling engine.
//!
//! A minimal line-based host: one message per line, the narrator's reply
//! printed back, illustrations saved under `illustrations/`. The real chat
//! surface is expected to replace this loop; everything conversational
//! lives in `fable-core`.

use fable_core::{GeminiBackend, ImageGallery, StorySession};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if std::env::var("GEMINI_API_KEY").is_err() {
        eprintln!("Error: GEMINI_API_KEY environment variable not set.");
        eprintln!("Please set it in .env file or with: export GEMINI_API_KEY=your_key_here");
        std::process::exit(1);
    }

    let backend = Arc::new(GeminiBackend::from_env()?);
    let mut session = StorySession::new(backend);
    let gallery = ImageGallery::new("illustrations");

    println!("{}", session.welcome_message());
    println!("\n(종료하려면 'quit' 또는 Ctrl-D)\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            break;
        }

        let reply = session.handle_message(input).await;
        println!("\n{}\n", reply.text);

        if let Some(attachment) = reply.attachment {
            let saved = if attachment.edited {
                gallery
                    .save_edited(attachment.chapter, &attachment.png)
                    .await
            } else {
                gallery
                    .save_chapter(attachment.chapter, &attachment.png)
                    .await
            };
            match saved {
                Ok(path) => println!("🖼️  그림 저장: {}\n", path.display()),
                Err(error) => warn!(%error, "failed to save illustration"),
            }
        }
    }

    println!("안녕히 가세요! 👋");
    Ok(())
}
