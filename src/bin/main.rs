use nairasense_assistant::{
    assistant::SupportAssistant,
    config::AppConfig,
    flow::TransactionPreviewFlow,
    format_naira,
    gemini::GeminiClient,
    ConversationEntry, Speaker,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const HELP: &str = "Commands: /confirm N, /cancel N, /log, /help, /quit. Anything else is sent to the assistant.";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Keep logs off stdout so they don't interleave with the chat
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;
    if !config.has_api_key() {
        warn!("GEMINI_API_KEY not set, replies will fall back to the maintenance message");
    }

    let model = Arc::new(GeminiClient::new(&config.gemini)?);
    let assistant = Arc::new(SupportAssistant::new(model));
    let flow = TransactionPreviewFlow::new(assistant, config.flow.clone());

    info!("NairaSense chat session started");

    let mut stdout = tokio::io::stdout();
    for (index, entry) in flow.entries().await.iter().enumerate() {
        stdout.write_all(render(index, entry).as_bytes()).await?;
    }
    stdout.write_all(format!("{}\n", HELP).as_bytes()).await?;
    stdout.flush().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let output = match line.split_once(' ').unwrap_or((line, "")) {
            ("", _) => continue,
            ("/quit", _) | ("/exit", _) => break,
            ("/help", _) => format!("{}\n", HELP),
            ("/log", _) => format!("{}\n", flow.transcript().await),
            ("/confirm", arg) | ("/cancel", arg) => {
                let confirm = line.starts_with("/confirm");
                match arg.trim().parse::<usize>() {
                    Err(_) => "Usage: /confirm N or /cancel N\n".to_string(),
                    Ok(index) => {
                        let result = if confirm {
                            flow.confirm_proposal(index).await
                        } else {
                            flow.cancel_proposal(index).await
                        };
                        match result {
                            Err(e) => format!("! {}\n", e),
                            Ok(settlement) => match settlement.settled().await {
                                Ok(entry) => render(flow.len().await - 1, &entry),
                                Err(e) => format!("! {}\n", e),
                            },
                        }
                    }
                }
            }
            _ => match flow.submit_user_message(line).await {
                Ok(entry) => render(flow.len().await - 1, &entry),
                Err(e) => format!("! {}\n", e),
            },
        };

        stdout.write_all(output.as_bytes()).await?;
        stdout.flush().await?;
    }

    Ok(())
}

fn render(index: usize, entry: &ConversationEntry) -> String {
    let speaker = match entry.speaker {
        Speaker::User => "You",
        Speaker::Assistant => "NairaSense",
    };
    let mut out = format!("[{}] {}: {}\n", index, speaker, entry.text);

    if let Some(proposal) = &entry.proposal {
        out.push_str(&format!(
            "    ┌ {} {} -> {} ({}) [{}]\n",
            proposal.kind,
            format_naira(proposal.amount),
            proposal.counterparty,
            proposal.description(),
            proposal.status()
        ));
        if proposal.is_pending() {
            out.push_str(&format!("    └ /confirm {} or /cancel {}\n", index, index));
        }
    }
    out
}
