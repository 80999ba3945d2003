mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands, Intro, MessagePrinter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut printer = MessagePrinter::new(cli.json);

    let intro = Intro {
        user_id: &cli.user_id,
        username: &cli.name,
        avatar_id: &cli.avatar_id,
        lobby_id: cli.lobby.as_deref(),
    };

    match &cli.command {
        Commands::List => {
            let lobbies = cli::fetch_lobbies(&cli.server).await?;
            printer.print_lobbies(&lobbies);
        }
        Commands::Script { steps, stay } => {
            // Reject the whole script before connecting if any step is bad.
            let mut msgs = Vec::new();
            for step in steps {
                if let Some(msg) =
                    cli::parse_step(step).with_context(|| format!("step '{}'", step))?
                {
                    msgs.push(msg);
                }
            }
            let wait_ms = if *stay { None } else { Some(cli.wait_ms) };
            cli::run_ws(&cli.server, &intro, msgs, wait_ms, &mut printer).await?;
        }
        Commands::Session => {
            cli::run_session(&cli.server, &intro, cli.wait_ms, &mut printer).await?;
        }
        Commands::Watch => {
            cli::run_ws(&cli.server, &intro, Vec::new(), None, &mut printer).await?;
        }
    }
    Ok(())
}
