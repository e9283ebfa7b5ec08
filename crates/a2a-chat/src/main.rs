//! A terminal chat front end for A2A backends.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::time::Duration;

use a2a_chat::{ChatClient, ChatClientBuilder};
use a2a_chat::core::TurnOutcome;
use a2a_chat::model::{Message, Role};
use backoff::ExponentialBackoffBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::time::sleep;

const BAR_CHAR: &str = "▎";

enum Input {
    Message(String),
    Command(Command),
}

enum Command {
    Health,
    Models,
    Reset,
    Retry,
    Quit,
    Unknown(String),
}

impl Input {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Some(Input::Message(line.to_owned()));
        };
        let command = match command {
            "health" => Command::Health,
            "models" => Command::Models,
            "reset" => Command::Reset,
            "retry" => Command::Retry,
            "quit" | "exit" => Command::Quit,
            other => Command::Unknown(other.to_owned()),
        };
        Some(Input::Command(command))
    }
}

/// Prints the tail message as it grows.
#[derive(Default)]
struct TailPrinter {
    id: Option<String>,
    printed: String,
}

impl TailPrinter {
    fn print(&mut self, msg: &Message) {
        if self.id.as_deref() != Some(msg.id.as_str()) {
            self.id = Some(msg.id.clone());
            self.printed.clear();
        }
        let text = msg.text();
        if text.is_empty() || text == self.printed {
            return;
        }
        if self.printed.is_empty() {
            print!("{}🤖 ", BAR_CHAR.bright_cyan());
        }
        match text.strip_prefix(self.printed.as_str()) {
            Some(delta) => print!("{}", delta.bright_white()),
            None => {
                // The text was rewritten as a whole, start over.
                print!("\n{}🤖 {}", BAR_CHAR.bright_cyan(), text.bright_white());
            }
        }
        std::io::stdout().flush().ok();
        self.printed = text;
    }

    #[inline]
    fn has_output(&self) -> bool {
        !self.printed.is_empty()
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    let client = ChatClientBuilder::from_env()
        .with_json_text_extraction(true)
        .on_update(move |msgs| {
            let tail = msgs.last().filter(|msg| msg.role == Role::Assistant);
            if let Some(tail) = tail {
                update_tx.send(tail.clone()).ok();
            }
        })
        .build();

    println!(
        "{} {}",
        "Connected to".dimmed(),
        client.config().endpoint().bright_white()
    );
    wait_for_backend(&client).await;

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let mut last_input: Option<String> = None;

    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line().await else {
            break;
        };
        let input = match Input::parse(&line) {
            None => continue,
            Some(Input::Message(input)) => input,
            Some(Input::Command(Command::Retry)) => {
                let Some(input) = last_input.clone() else {
                    println!("{}", "Nothing to retry.".dimmed());
                    continue;
                };
                input
            }
            Some(Input::Command(Command::Quit)) => break,
            Some(Input::Command(command)) => {
                run_command(&client, command).await;
                continue;
            }
        };
        last_input = Some(input.clone());

        let mut turn = client.submit(input);
        let mut printer = TailPrinter::default();
        let mut progress_bar = Some({
            let progress_bar = ProgressBar::new_spinner();
            progress_bar.set_style(progress_style.clone());
            progress_bar.set_message("🤔 Thinking...");
            progress_bar
        });

        let result = loop {
            select! {
                biased;

                Some(msg) = update_rx.recv() => {
                    if msg.text().is_empty() {
                        continue;
                    }
                    // Finish the progress bar before printing anything else.
                    if let Some(progress_bar) = progress_bar.take() {
                        progress_bar.finish_and_clear();
                    }
                    printer.print(&msg);
                }
                result = &mut turn => break result,
                _ = signal::ctrl_c() => {
                    debug!("cancelling the running turn");
                    client.cancel();
                }
                _ = sleep(Duration::from_millis(100)) => {
                    if let Some(progress_bar) = &progress_bar {
                        progress_bar.inc(1);
                    }
                }
            }
        };

        // The final snapshot is published before the turn resolves.
        while let Ok(msg) = update_rx.try_recv() {
            printer.print(&msg);
        }
        if let Some(progress_bar) = progress_bar.take() {
            progress_bar.finish_and_clear();
        }
        if printer.has_output() {
            println!();
        }

        match result {
            Ok(TurnOutcome::Completed(_)) => {}
            Ok(TurnOutcome::Cancelled(_)) => {
                println!("{}", "(cancelled)".dimmed());
            }
            Err(err) => {
                println!("{}⚠️  {}", BAR_CHAR.bright_red(), err.bright_red());
                println!("{}", "Type /retry to send it again.".dimmed());
            }
        }
    }
}

async fn run_command(client: &ChatClient, command: Command) {
    match command {
        Command::Health => match client.health().await {
            Ok(health) => println!("Backend status: {}", health.status),
            Err(err) => println!("{}", err.bright_red()),
        },
        Command::Models => match client.list_models().await {
            Ok(list) => {
                for model in list.models {
                    println!("- {model}");
                }
            }
            Err(err) => println!("{}", err.bright_red()),
        },
        Command::Reset => match client.reset_conversation().await {
            Ok(true) => println!("Conversation reset."),
            Ok(false) => println!(
                "{}",
                "No conversation id configured (set A2A_CONVERSATION_ID)."
                    .dimmed()
            ),
            Err(err) => println!("{}", err.bright_red()),
        },
        Command::Unknown(name) => {
            println!(
                "{}",
                format!(
                    "Unknown command /{name}. \
                     Try /health, /models, /reset, /retry or /quit."
                )
                .dimmed()
            );
        }
        Command::Retry | Command::Quit => {}
    }
}

/// Polls the health endpoint until the backend is ready, giving up after
/// a while.
async fn wait_for_backend(client: &ChatClient) {
    let backoff = ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(500))
        .with_max_interval(Duration::from_secs(5))
        .with_max_elapsed_time(Some(Duration::from_secs(30)))
        .build();
    let result = backoff::future::retry(backoff, || async move {
        match client.health().await {
            Ok(health) if health.is_ok() => Ok(()),
            Ok(health) => Err(backoff::Error::transient(format!(
                "backend reported {:?}",
                health.status
            ))),
            Err(err) => {
                debug!("backend is not ready: {err}");
                Err(backoff::Error::transient(err.to_string()))
            }
        }
    })
    .await;
    if let Err(err) = result {
        warn!("backend health check failed: {err}");
        println!(
            "{}",
            "Backend is not responding, messages may fail.".bright_yellow()
        );
    }
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    select! {
        read = stdin.read_line(&mut line) => match read {
            Ok(0) => None,
            Ok(_) => Some(line),
            Err(err) => {
                error!("error reading input: {}", err);
                None
            }
        },
        _ = signal::ctrl_c() => None,
    }
}
