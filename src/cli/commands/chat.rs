//! Interactive chat command with web search.

use crate::agent::ThoughtEvent;
use crate::chat::{Role, Session, TurnRouter};
use crate::cli::preflight;
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use tracing::debug;

/// Run the interactive chat command.
pub async fn run_chat(model: Option<String>, api_key: Option<&str>, settings: Settings) -> Result<()> {
    let api_key = match preflight::require_api_key(&settings, api_key) {
        Ok(key) => key,
        Err(e) => {
            Output::error(&e.to_string());
            return Err(e.into());
        }
    };

    let prompts = Prompts::from_settings(&settings)?;
    let router = TurnRouter::from_settings(&settings, &prompts, &api_key, model.as_deref())?;
    let mut session = Session::new(&prompts.chat.greeting);

    println!("\n{}", style("Scout Chat").bold().cyan());
    println!(
        "{}\n",
        style("Ask anything. Mention 'arxiv:' to search papers directly. Type 'exit' to quit.").dim()
    );

    for message in session.messages() {
        print_message(message.role, &message.content);
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            println!();
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        let spinner = Output::spinner("Thinking...");
        let mut show_thought = |event: &ThoughtEvent| spinner.suspend(|| Output::thought(event));
        let outcome = router.handle_turn(&mut session, input, &mut show_thought).await;
        spinner.finish_and_clear();
        debug!(route = ?outcome.route, failed = outcome.failed, "Turn complete");

        if outcome.failed {
            Output::error(&outcome.response);
        } else {
            print_message(Role::Assistant, &outcome.response);
        }
    }

    debug!("Session ended with {} messages", session.len());
    Ok(())
}

fn print_message(role: Role, content: &str) {
    match role {
        Role::Assistant => println!("\n{} {}\n", style("Scout:").cyan().bold(), content),
        Role::User => println!("{} {}", style("You:").green().bold(), content),
    }
}
