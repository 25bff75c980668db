//! sheba - Union Parishad service assistant CLI

mod commands;
mod config;
mod echo;

use clap::Parser;
use sheba_ai::Model;
use sheba_chat::persona::{INITIAL_GREETING, SYSTEM_INSTRUCTION};
use sheba_chat::{
    ChatEngine, ChatMessage, EngineConfig, EngineEvent, Intent, JsonFileStore, MemoryStore,
    ProviderGenerator, SendOutcome, ThreadStore,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

/// sheba - chat assistant for Union Parishad services
#[derive(Parser, Debug)]
#[command(name = "sheba")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model to use (default: gemini-2.5-flash)
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature (default: 0.7)
    #[arg(long)]
    temperature: Option<f32>,

    /// Thread history file
    #[arg(long)]
    store: Option<PathBuf>,

    /// Keep threads in memory only
    #[arg(long, conflicts_with = "store")]
    ephemeral: bool,

    /// File whose contents replace the built-in system instruction
    #[arg(long)]
    system_prompt_file: Option<PathBuf>,

    /// Ask a single question in a new thread and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// List saved threads and exit
    #[arg(long)]
    threads: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so they never interleave with streamed replies
    let filter = if args.verbose {
        EnvFilter::new("sheba=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();

    // CLI takes precedence over the config file
    let store: Arc<dyn ThreadStore> = if args.ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        let path = args
            .store
            .clone()
            .or_else(|| cfg.store_path())
            .unwrap_or_else(JsonFileStore::default_path);
        Arc::new(JsonFileStore::new(path))
    };

    if args.threads {
        return list_threads(store.as_ref());
    }

    let model_id = args
        .model
        .or(cfg.model.clone())
        .unwrap_or_else(|| sheba_ai::DEFAULT_MODEL_ID.to_string());
    let temperature = args
        .temperature
        .or(cfg.temperature)
        .unwrap_or(sheba_ai::DEFAULT_TEMPERATURE);
    let mut model = Model::gemini(model_id).with_temperature(temperature);
    if let Some(base_url) = cfg.base_url.as_deref() {
        model = model.with_base_url(base_url);
    }

    let system_prompt = match args.system_prompt_file.or_else(|| cfg.system_prompt_path()) {
        Some(path) => std::fs::read_to_string(&path).map_err(|e| {
            anyhow::anyhow!("Failed to read system prompt file {}: {}", path.display(), e)
        })?,
        None => SYSTEM_INSTRUCTION.to_string(),
    };

    let engine_config = cfg.engine_config();
    let generator =
        ProviderGenerator::google(cfg.google_api_key(), model).with_system_prompt(system_prompt);
    let engine = build_engine(generator, store, engine_config);

    if let Some(command) = args.command {
        return run_command(&engine, &command).await;
    }

    run_interactive(&engine).await
}

/// Wire the generator and engine so both report failures with the same notice
fn build_engine(
    generator: ProviderGenerator,
    store: Arc<dyn ThreadStore>,
    config: EngineConfig,
) -> ChatEngine {
    let generator = generator.with_failure_notice(config.failure_notice.clone());
    ChatEngine::with_config(Arc::new(generator), store, config)
}

async fn run_command(engine: &ChatEngine, command: &str) -> anyhow::Result<()> {
    println!("sheba> {}", command);
    println!();
    send_and_print(engine, command).await;
    Ok(())
}

async fn run_interactive(engine: &ChatEngine) -> anyhow::Result<()> {
    if std::io::IsTerminal::is_terminal(&io::stderr()) {
        eprintln!(
            "sheba ({} saved conversations) - type /help for commands",
            engine.threads().len()
        );
        eprintln!();
    }
    println!("{}\n", INITIAL_GREETING);

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(result) = commands::execute_command(input, &engine.threads()) {
            match result {
                commands::CommandResult::Intent(Intent::Send(query)) => {
                    println!("> {}\n", query);
                    send_and_print(engine, &query).await;
                }
                commands::CommandResult::Intent(intent) => apply_intent(engine, intent).await,
                commands::CommandResult::ShowHistory => print_history(&engine.messages()),
                commands::CommandResult::Message(msg) => println!("{}", msg),
                commands::CommandResult::Exit => break,
                commands::CommandResult::Unknown(cmd) => {
                    println!("Unknown command: /{}", cmd);
                    println!("Type /help for available commands.");
                }
            }
            println!();
            continue;
        }

        println!();
        send_and_print(engine, input).await;
        println!();
    }

    Ok(())
}

/// Apply a thread-management intent and report what changed
async fn apply_intent(engine: &ChatEngine, intent: Intent) {
    let was_active = engine.active_thread_id();
    if let Err(e) = engine.dispatch(intent).await {
        println!("{}", e);
        return;
    }

    match engine.active_thread_id() {
        Some(id) if was_active.as_deref() != Some(id.as_str()) => {
            if let Some(thread) = engine.thread(&id) {
                println!("Opened: {}", thread.title);
                print_history(&thread.messages);
            }
        }
        Some(_) => println!("Done."),
        None => println!("{}", INITIAL_GREETING),
    }
}

/// Send one message, printing reply fragments as they arrive
async fn send_and_print(engine: &ChatEngine, text: &str) {
    let mut receiver = engine.subscribe();

    let printer = tokio::spawn(async move {
        let mut echo = echo::ReplyEcho::default();
        loop {
            match receiver.recv().await {
                Ok(EngineEvent::MessageUpdated { fragment, .. }) => {
                    if let Some(text) = echo.fragment(&fragment) {
                        print!("{}", text);
                        io::stdout().flush().ok();
                    }
                }
                Ok(EngineEvent::MessageFinalized { message, .. }) => {
                    println!("{}", echo.finish(&message.text));
                    break;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Display fell behind, skipped {} events", skipped);
                    echo.lagged();
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    match engine.send_message(text).await {
        SendOutcome::Completed { .. } => {
            printer.await.ok();
        }
        SendOutcome::Busy => {
            printer.abort();
            println!("Still answering the previous question, please wait.");
        }
        SendOutcome::Ignored => printer.abort(),
    }
}

fn print_history(messages: &[ChatMessage]) {
    if messages.is_empty() {
        println!("No messages in this conversation.");
        return;
    }
    for message in messages {
        let who = match message.role {
            sheba_ai::Role::User => "you",
            sheba_ai::Role::Assistant => "sheba",
        };
        println!("[{}] {}\n", who, message.text);
    }
}

fn list_threads(store: &dyn ThreadStore) -> anyhow::Result<()> {
    match store.load_all() {
        Ok(threads) => {
            let summaries: Vec<_> = threads.iter().map(|t| t.summary()).collect();
            println!("{}", commands::ThreadsCommand::list_text(&summaries));
        }
        Err(e) => {
            eprintln!("Error loading threads: {}", e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sheba_ai::{Context, EventStream, LlmProvider, StreamEvent};

    /// Fails before streaming for the prompt "refuse", otherwise mid-stream
    struct FailingProvider;

    #[async_trait]
    impl LlmProvider for FailingProvider {
        async fn stream(&self, _model: &Model, context: &Context) -> sheba_ai::Result<EventStream> {
            let prompt = context.turns.last().map(|t| t.text.as_str());
            if prompt == Some("refuse") {
                return Err(sheba_ai::Error::Auth("denied".into()));
            }
            Ok(Box::pin(futures::stream::iter(vec![
                StreamEvent::Start {
                    model: "gemini".into(),
                },
                StreamEvent::TextDelta {
                    delta: "partial".into(),
                },
                StreamEvent::Error {
                    message: "connection reset".into(),
                },
            ])))
        }
    }

    fn reply_of(outcome: SendOutcome) -> String {
        match outcome {
            SendOutcome::Completed { reply, .. } => reply,
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_engine_and_generator_share_failure_notice() {
        let generator = ProviderGenerator::new(Arc::new(FailingProvider), Model::default());
        let config = EngineConfig {
            failure_notice: "service unavailable".into(),
        };
        let engine = build_engine(generator, Arc::new(MemoryStore::new()), config);

        let mid_stream = reply_of(engine.send_message("hello").await);
        assert_eq!(mid_stream, "partial\n\nservice unavailable");

        let before_stream = reply_of(engine.send_message("refuse").await);
        assert_eq!(before_stream, "service unavailable");
    }
}
