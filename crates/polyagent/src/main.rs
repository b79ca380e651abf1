//! A simple program demonstrates how to use `polyagent` as a library.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;
use std::pin::pin;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use polyagent::SessionBuilder;
use polyagent::core::{AgentStage, Role};
use polyagent::tools::ShellToolApproval;
use polyagent_openai_model::{OpenAIConfigBuilder, OpenAIProvider};
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::interval;

enum SessionEvent {
    Stage(AgentStage),
    Transcript(String, Role),
    ShellRequest(ShellToolApproval),
}

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let Some(config) = OpenAIConfigBuilder::from_env() else {
        eprintln!("OPENAI_API_KEY environment variable is not set");
        return;
    };
    let config = config.build();
    info!("using model `{}` at {}", config.model(), config.base_url());
    let model_provider = OpenAIProvider::new(config);

    let system_prompt = env::var("POLYAGENT_SYSTEM_PROMPT")
        .ok()
        .filter(|prompt| !prompt.is_empty())
        .unwrap_or_else(|| {
            include_str!("./system_prompt.md").replace("{{HOST_OS}}", host_os())
        });

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut session = SessionBuilder::with_model_provider(model_provider)
        .with_system_prompt(system_prompt)
        .on_transcript({
            let event_tx = event_tx.clone();
            move |transcript: &str, role: Role| {
                event_tx
                    .send(SessionEvent::Transcript(transcript.to_owned(), role))
                    .ok();
            }
        })
        .on_stage_change({
            let event_tx = event_tx.clone();
            move |stage| {
                event_tx.send(SessionEvent::Stage(stage)).ok();
            }
        })
        .on_shell_request(move |approval| {
            event_tx.send(SessionEvent::ShellRequest(approval)).ok();
        })
        .build();

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    loop {
        print!("> ");
        std::io::stdout().flush().unwrap();

        let Some(line) = read_line().await else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut turn = pin!(session.send_message(line));
        let mut ticker = interval(Duration::from_millis(100));
        let mut progress_bar: Option<ProgressBar> = None;
        let mut status = stage_message(AgentStage::Assessing);

        let result = loop {
            select! {
                result = &mut turn => break result,
                Some(event) = event_rx.recv() => {
                    // Finish the progress bar before printing anything else.
                    if !matches!(event, SessionEvent::Stage(_)) {
                        if let Some(progress_bar) = progress_bar.take() {
                            progress_bar.finish_and_clear();
                        }
                    }
                    match event {
                        SessionEvent::Stage(stage) => {
                            status = stage_message(stage);
                        }
                        SessionEvent::Transcript(transcript, role) => {
                            print_transcript(&transcript, role);
                        }
                        SessionEvent::ShellRequest(approval) => {
                            ask_for_approval(approval).await;
                        }
                    }
                }
                _ = ticker.tick() => {
                    let progress_bar = progress_bar.get_or_insert_with(|| {
                        let progress_bar = ProgressBar::new_spinner();
                        progress_bar.set_style(progress_style.clone());
                        progress_bar
                    });
                    progress_bar.set_message(status);
                    progress_bar.inc(1);
                }
            }
        };

        if let Some(progress_bar) = progress_bar.take() {
            progress_bar.finish_and_clear();
        }
        while let Ok(event) = event_rx.try_recv() {
            if let SessionEvent::Transcript(transcript, role) = event {
                print_transcript(&transcript, role);
            }
        }
        if let Err(err) = result {
            println!("{}❌ {}", BAR_CHAR.bright_red(), err.bright_red());
        }
    }
}

fn stage_message(stage: AgentStage) -> &'static str {
    match stage {
        AgentStage::Idle | AgentStage::Assessing => "🤔 Thinking...",
        AgentStage::Planning => "🧰 Picking tools...",
        AgentStage::Executing => "⚙️  Running tools...",
        AgentStage::Responding => "✍️  Writing the reply...",
    }
}

async fn ask_for_approval(approval: ShellToolApproval) {
    let bar = BAR_CHAR.bright_yellow();
    println!("\n{bar}⚠️  Agent wants to run command:");
    println!("{bar}{}", approval.cmdline().bright_white().bold());
    print!("Proceed? [Y/n]: ");
    std::io::stdout().flush().unwrap();

    let Some(line) = read_line().await else {
        approval.reject();
        return;
    };
    let line = line.trim();
    if line.is_empty() || line.eq_ignore_ascii_case("y") {
        approval.approve();
    } else {
        approval.reject();
    }
    println!();
}

fn print_transcript(transcript: &str, role: Role) {
    if role != Role::Assistant {
        return;
    }
    let transcript = transcript.trim_end();
    if transcript.is_empty() {
        return;
    }
    println!("{}🤖 {}", BAR_CHAR.bright_cyan(), transcript.bright_white());
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(0) => None,
        Ok(_) => Some(line),
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}

#[inline]
fn host_os() -> &'static str {
    match env::consts::OS {
        "linux" => "Linux",
        "macos" => "macOS",
        "windows" => "Windows",
        _ => "some other OS",
    }
}
