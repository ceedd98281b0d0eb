//! Line-oriented chat over a chatgate server: type a question, watch the
//! answer stream in.

use std::io::Write;

use chatgate_client::{ChatSession, Submission};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Opening bot turn, shown before any question is asked.
const GREETING: &str = "Hi, I'm the chatgate assistant. What would you like to know?";

#[derive(Parser)]
#[command(name = "chatgate", version, about = "Chat with a chatgate server from the terminal")]
struct Cli {
    /// Base URL of the chatgate server
    #[arg(long, default_value = "http://127.0.0.1:3000", env = "CHATGATE_URL")]
    server: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut session = ChatSession::new(cli.server).with_greeting(GREETING);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{GREETING}");
    prompt()?;
    while let Some(line) = lines.next_line().await? {
        // Print only what the last progress call added; accumulated answers
        // are prefixes of each other, so the offset is always a char boundary.
        let mut printed = 0;
        let outcome = session
            .ask_with(&line, |answer| {
                print!("{}", &answer[printed..]);
                let _ = std::io::stdout().flush();
                printed = answer.len();
            })
            .await;

        match outcome {
            Ok(Submission::Completed) => println!(),
            Ok(Submission::Ignored) => {}
            Err(err) => eprintln!("error: {err}"),
        }
        prompt()?;
    }

    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("> ");
    std::io::stdout().flush()
}
