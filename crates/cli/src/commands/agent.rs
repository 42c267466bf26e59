//! `sploitgpt agent`: interactive or single-instruction mode.

use futures::StreamExt;
use sploitgpt_agent::{AgentEvent, AgentLoop, ResumeToken, Session};
use sploitgpt_config::AppConfig;
use sploitgpt_core::context::BootContext;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::boot;

type InputLines = Lines<BufReader<Stdin>>;

/// What a Ctrl+C did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    CancelledTurn,
    Quit,
}

/// Routes Ctrl+C to the running turn, or ends the session when idle.
#[derive(Clone, Default)]
struct Interrupts {
    active: Arc<Mutex<Option<CancellationToken>>>,
    quit: CancellationToken,
}

impl Interrupts {
    /// Spawn the one Ctrl+C listener for this process.
    fn listen(&self) -> tokio::task::JoinHandle<()> {
        let interrupts = self.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if interrupts.interrupt() == Interrupt::Quit {
                    break;
                }
            }
        })
    }

    fn begin_turn(&self) -> CancellationToken {
        let cancel = CancellationToken::new();
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(cancel.clone());
        cancel
    }

    fn end_turn(&self) {
        self.active.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    fn interrupt(&self) -> Interrupt {
        match self.active.lock().unwrap_or_else(PoisonError::into_inner).take() {
            Some(cancel) => {
                cancel.cancel();
                Interrupt::CancelledTurn
            }
            None => {
                self.quit.cancel();
                Interrupt::Quit
            }
        }
    }

    fn quitting(&self) -> bool {
        self.quit.is_cancelled()
    }

    /// Next stdin line, or `None` on EOF or Ctrl+C.
    async fn read_line(&self, lines: &mut InputLines) -> std::io::Result<Option<String>> {
        tokio::select! {
            line = lines.next_line() => line,
            _ = self.quit.cancelled() => Ok(None),
        }
    }
}

/// What starts the next leg of a turn.
enum Leg {
    Instruction(String),
    Answer { token: ResumeToken, answer: String },
}

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let provider = Arc::new(sploitgpt_providers::build_from_config(&config)?);
    let tools = Arc::new(sploitgpt_tools::default_registry(&config.tools)?);

    let context = boot::gather(&config, provider.as_ref()).await;
    if !context.model_connected {
        eprintln!();
        eprintln!("  ⚠️  Cannot reach Ollama at {}", config.ollama_host);
        eprintln!("  Start it with `ollama serve` or set SPLOITGPT_OLLAMA_HOST.");
        eprintln!();
    }
    let (context_tx, context_rx) = watch::channel(context);

    let agent = AgentLoop::new(provider.clone(), &config.model, tools)
        .with_max_rounds(config.agent.max_rounds);
    let mut session = Session::new(context_rx);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let interrupts = Interrupts::default();
    let listener = interrupts.listen();

    if let Some(msg) = message {
        drive_turn(&agent, &mut session, msg, &mut lines, &interrupts).await?;
        listener.abort();
        return Ok(());
    }

    print_banner(&config, &context_tx.borrow());

    loop {
        prompt("  You > ")?;
        let Some(line) = interrupts.read_line(&mut lines).await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "exit" | "quit") {
            break;
        }

        drive_turn(&agent, &mut session, input.to_string(), &mut lines, &interrupts).await?;
        if interrupts.quitting() {
            break;
        }

        let mut refreshed = context_tx.borrow().clone();
        boot::refresh(&mut refreshed, &config, provider.as_ref()).await;
        context_tx.send_replace(refreshed);
    }

    listener.abort();
    println!();
    println!("  Goodbye.");
    println!();
    Ok(())
}

/// Run one instruction to completion, answering any questions from stdin.
async fn drive_turn(
    agent: &AgentLoop,
    session: &mut Session,
    instruction: String,
    lines: &mut InputLines,
    interrupts: &Interrupts,
) -> std::io::Result<()> {
    let mut leg = Leg::Instruction(instruction);

    loop {
        let cancel = interrupts.begin_turn();

        let mut question = None;
        {
            let mut stream = match leg {
                Leg::Instruction(text) => agent.process_with_cancel(session, text, cancel),
                Leg::Answer { token, answer } => {
                    agent.resume_with_cancel(session, &token, answer, cancel)
                }
            };
            while let Some(event) = stream.next().await {
                render(&event);
                if let AgentEvent::Choice { token, options, .. } = event {
                    question = Some((token, options));
                }
            }
        }
        interrupts.end_turn();

        let Some((token, options)) = question else {
            return Ok(());
        };
        prompt("  Choice > ")?;
        let Some(line) = interrupts.read_line(lines).await? else {
            return Ok(());
        };
        leg = Leg::Answer {
            token,
            answer: resolve_answer(&line, &options),
        };
    }
}

/// An option number picks that option; anything else is passed through.
fn resolve_answer(input: &str, options: &[String]) -> String {
    let input = input.trim();
    match input.parse::<usize>() {
        Ok(n) if (1..=options.len()).contains(&n) => options[n - 1].clone(),
        _ => input.to_string(),
    }
}

fn render(event: &AgentEvent) {
    match event {
        AgentEvent::Message { content } => {
            println!();
            for line in content.lines() {
                println!("  SploitGPT > {line}");
            }
        }
        AgentEvent::Command { command } => {
            println!();
            println!("  $ {command}");
        }
        AgentEvent::Result { output } => {
            for line in output.lines() {
                println!("    {line}");
            }
        }
        AgentEvent::Choice { question, options, .. } => {
            println!();
            println!("  ? {question}");
            for (i, option) in options.iter().enumerate() {
                println!("    {}. {option}", i + 1);
            }
        }
        AgentEvent::Error { message } => {
            eprintln!();
            eprintln!("  [Error] {message}");
        }
        AgentEvent::Done { summary } => {
            println!();
            println!("  ✅ {summary}");
        }
    }
}

fn print_banner(config: &AppConfig, context: &BootContext) {
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        SploitGPT Agent: Interactive Mode     ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Model:      {} @ {}", config.model, config.ollama_host);
    println!("  Host:       {}@{}", context.username, context.hostname);
    println!("  Tools:      {}", config.tools.advertised.join(", "));
    println!("  Security:   {} tools on PATH", context.available_tools.len());
    println!(
        "  Metasploit: {}",
        if context.msf_connected { "connected" } else { "not available" }
    );
    println!();
    println!("  Type an instruction and press Enter.");
    println!("  Ctrl+C stops the current turn, or quits at a prompt.");
    println!();
}

fn prompt(text: &str) -> std::io::Result<()> {
    print!("{text}");
    std::io::stdout().flush()
}
