//! Interactive terminal chat

use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use unibio_chat::{BioAgent, ChatReply};

const SEPARATOR_WIDTH: usize = 70;

/// A line typed at the prompt
#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Quit,
    Clear,
    ShowModel,
    ListModels,
    Switch(&'a str),
    Message(&'a str),
    Empty,
}

impl<'a> Command<'a> {
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        let lower = line.to_lowercase();
        match lower.as_str() {
            "quit" | "exit" => return Command::Quit,
            "clear" => return Command::Clear,
            "model" => return Command::ShowModel,
            "models" => return Command::ListModels,
            _ => {}
        }
        if let Some(rest) = line.strip_prefix("switch ") {
            let name = rest.trim();
            if !name.is_empty() {
                return Command::Switch(name);
            }
        }
        Command::Message(line)
    }
}

fn separator() {
    println!("\n{}\n", "=".repeat(SEPARATOR_WIDTH));
}

fn print_reply(reply: &ChatReply) {
    match reply {
        ChatReply::Answered(answer) => {
            println!("{}", answer.response);
            if !answer.function_calls.is_empty() {
                println!("\nTools used: {}", answer.function_calls.len());
                for call in &answer.function_calls {
                    let status = if call.result.success { "ok" } else { "failed" };
                    println!("   - {} ({})", call.tool_name, status);
                }
            }
        }
        ChatReply::Failed(failure) => println!("Error: {}", failure.error),
    }
}

pub async fn run(mut agent: BioAgent) -> Result<()> {
    println!("UniBio AI Agent - Interactive Chat");
    println!("{}", "=".repeat(SEPARATOR_WIDTH));
    println!("Commands:");
    println!("  quit / exit      end the session");
    println!("  clear            clear chat history");
    println!("  model            show the current model");
    println!("  models           list available models");
    println!("  switch <name>    switch model, keeping the conversation");
    separator();
    println!("Agent ready. Model: {}", agent.model());
    separator();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!("\nGoodbye!");
            break;
        };

        match Command::parse(&line) {
            Command::Empty => continue,
            Command::Quit => {
                println!("\nGoodbye!");
                break;
            }
            Command::Clear => {
                agent.clear_history();
                println!("Chat history cleared.");
            }
            Command::ShowModel => println!("Current model: {}", agent.model()),
            Command::ListModels => match agent.list_available_models().await {
                Ok(models) => {
                    for model in models {
                        let marker = if model.id == agent.model() { "*" } else { " " };
                        let description = model.description.unwrap_or_default();
                        println!(" {} {:<22} {}", marker, model.id, description);
                    }
                }
                Err(e) => println!("Error: {:#}", e),
            },
            Command::Switch(name) => {
                agent.switch_model(name);
                println!("Switched to model: {}", agent.model());
            }
            Command::Message(message) => {
                print!("\nAgent: ");
                std::io::stdout().flush()?;
                let reply = agent.send(message).await;
                print_reply(&reply);
            }
        }
        separator();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse("  "), Command::Empty);
        assert_eq!(Command::parse("EXIT"), Command::Quit);
        assert_eq!(Command::parse("quit"), Command::Quit);
        assert_eq!(Command::parse("clear"), Command::Clear);
        assert_eq!(Command::parse("model"), Command::ShowModel);
        assert_eq!(Command::parse("models"), Command::ListModels);
        assert_eq!(
            Command::parse("switch gemini-2.5-pro"),
            Command::Switch("gemini-2.5-pro")
        );
        assert_eq!(Command::parse("switch "), Command::Message("switch"));
        assert_eq!(
            Command::parse("design primers for ATGC"),
            Command::Message("design primers for ATGC")
        );
    }
}
