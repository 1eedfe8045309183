use anyhow::{Context, Result};
use nerdalert_chat::{AgentClient, ChatConfig, ChatSession};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nerdalert_chat=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let (runtime, session) = match startup() {
        Ok(parts) => parts,
        Err(e) => {
            eprintln!("Unable to start chat client: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let code = runtime.block_on(run(session));

    // A pending stdin read cannot be cancelled, so don't wait for it after Ctrl-C
    runtime.shutdown_background();
    code
}

fn startup() -> Result<(tokio::runtime::Runtime, ChatSession)> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("could not start async runtime")?;

    let config = ChatConfig::from_env().context("invalid AGENT_URL")?;
    tracing::debug!(?config, "starting chat client");

    let client = AgentClient::new(config).context("could not create HTTP client")?;
    let tools = client.default_tools();
    Ok((runtime, ChatSession::new(client, tools)))
}

async fn run(mut session: ChatSession) -> ExitCode {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();

    match session.run(stdin, &mut stdout).await {
        Ok(end) => {
            tracing::debug!(?end, "exiting");
            ExitCode::SUCCESS
        }
        Err(e) => {
            // The terminal went away; nothing left to report to
            tracing::warn!(error = %e, "terminal I/O failed");
            ExitCode::SUCCESS
        }
    }
}
