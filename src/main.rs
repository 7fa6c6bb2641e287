//! DataBot - Business assistant with bounded conversation memory
//!
//! Command-line front end: interactive chat, one-shot questions, reports,
//! history inspection and the dashboard API server.

use anyhow::Result;
use clap::{Parser, Subcommand};
use databot::{
    agent::{AnswerSource, DataBot},
    config::DataBotConfig,
    gateway::{self, AppState},
    memory::ConversationMemory,
    sales::SalesTable,
};
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "databot")]
#[command(author = "DataBot Team")]
#[command(version)]
#[command(about = "Business assistant for sales data")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "DATABOT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Answer from local data only
    #[arg(long)]
    no_llm: bool,

    /// Sales CSV file (overrides the configuration)
    #[arg(long)]
    data: Option<PathBuf>,

    /// Do not load or save the conversation snapshot
    #[arg(long)]
    no_persist: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive question/answer session (default)
    Chat,

    /// Ask a single question
    Ask {
        /// Question text
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Print the commercial report
    Report,

    /// Print the sales table
    Data,

    /// Export the sales table as CSV
    Export {
        /// Output file
        #[arg(short, long, default_value = "ventes.csv")]
        output: PathBuf,
    },

    /// Inspect the saved conversation history
    History {
        /// Number of exchanges to show
        #[arg(short = 'n', long)]
        last: Option<usize>,

        /// Show entries containing this keyword
        #[arg(short, long)]
        search: Option<String>,

        /// Show memory statistics
        #[arg(long)]
        stats: bool,

        /// Erase the history
        #[arg(long)]
        clear: bool,
    },

    /// Start the dashboard API server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },

    /// Run diagnostics
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("databot={},tower_http=info", log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => DataBotConfig::load(path)?,
        None => DataBotConfig::default(),
    };
    if cli.no_llm {
        config.llm.enabled = false;
    }
    if cli.no_persist {
        config.memory.persist = false;
    }
    if let Some(data) = cli.data {
        config.sales.data_file = Some(data);
    }

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let bot = DataBot::from_config(&config)?;
            run_chat(&config, &bot).await?;
        }
        Commands::Ask { question } => {
            let bot = DataBot::from_config(&config)?;
            ask_once(&config, &bot, &question.join(" ")).await;
        }
        Commands::Report => {
            let bot = DataBot::from_config(&config)?;
            println!("{}", bot.report());
        }
        Commands::Data => {
            let bot = DataBot::from_config(&config)?;
            println!("📋 {} PRODUITS :", bot.table().len());
            print!("{}", bot.table());
        }
        Commands::Export { output } => {
            let bot = DataBot::from_config(&config)?;
            export_table(bot.table(), &output)?;
        }
        Commands::History {
            last,
            search,
            stats,
            clear,
        } => {
            show_history(&config, last, search.as_deref(), stats, clear);
        }
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            run_server(config).await?;
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
        Commands::Doctor => {
            run_doctor(&config, cli.config.as_deref());
        }
    }

    Ok(())
}

/// Memory sized from the configuration, restored from the snapshot if one
/// exists.
fn open_memory(config: &DataBotConfig) -> ConversationMemory {
    let mut memory = ConversationMemory::new(config.memory.capacity);
    if let Some(path) = config.memory.snapshot() {
        if path.exists() {
            memory.load(path);
        } else {
            tracing::debug!(path = %path.display(), "No snapshot yet, starting empty");
        }
    }
    memory
}

fn save_memory(config: &DataBotConfig, memory: &ConversationMemory) {
    if let Some(path) = config.memory.snapshot() {
        memory.save(path);
    }
}

fn print_banner(bot: &DataBot) {
    println!("{}", "=".repeat(60));
    println!("🤖 DATABOT - Assistant Commercial Intelligent");
    println!("{}", "=".repeat(60));
    if bot.has_model() {
        println!("Mode : 🤖 IA (Mistral)");
    } else {
        println!("Mode : 📊 Analyse simple (sans IA)");
    }
    println!("\nCommandes : quit, aide, rapport, donnees, historique, stats, effacer, cherche <mot>");
}

fn print_help() {
    println!("\n💡 Questions possibles :");
    println!("• 'plus vendu' - Produit le plus vendu");
    println!("• 'chiffre affaires' - CA total");
    println!("• 'stock faible' - Produits à réapprovisionner");
    println!("• 'liste' - Tous les produits");
    println!("• 'rapport' - Rapport complet");
    println!("• 'historique' / 'stats' / 'effacer' / 'cherche <mot>' - Mémoire");
}

fn print_answer(source: AnswerSource, text: &str) {
    let icon = match source {
        AnswerSource::Model => "🤖",
        AnswerSource::Local => "📊",
    };
    println!("{}", "=".repeat(30));
    println!("{} {}", icon, text);
    println!("{}", "=".repeat(30));
}

async fn run_chat(config: &DataBotConfig, bot: &DataBot) -> Result<()> {
    print_banner(bot);
    let input = BufReader::new(tokio::io::stdin());
    let (memory, answered) = chat_session(config, bot, input, interrupted()).await?;

    println!("\n👋 Au revoir !");
    println!("• Questions traitées : {}", answered);
    println!("• {}", memory);
    Ok(())
}

/// Resolves on Ctrl+C; never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

/// Read questions from `input` until EOF, a quit command or `interrupt`,
/// then save the session. Returns the memory and the number of answers.
async fn chat_session<R>(
    config: &DataBotConfig,
    bot: &DataBot,
    input: R,
    interrupt: impl Future<Output = ()>,
) -> Result<(ConversationMemory, usize)>
where
    R: AsyncBufRead + Unpin,
{
    let mut memory = open_memory(config);
    let mut lines = input.lines();
    let mut answered = 0usize;
    tokio::pin!(interrupt);

    loop {
        print!("\n👤 Question : ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            biased;
            line = lines.next_line() => line?,
            _ = &mut interrupt => {
                tracing::info!("Interrupted, saving session");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        let question = line.trim();
        let lowered = question.to_lowercase();

        match lowered.as_str() {
            "" => continue,
            "quit" | "exit" | "q" | "bye" => break,
            "aide" => print_help(),
            "rapport" => println!("\n{}", bot.report()),
            "donnees" => {
                println!("\n📋 {} PRODUITS :", bot.table().len());
                print!("{}", bot.table());
            }
            "historique" => println!("\n{}", memory.recent_window(config.memory.recent_pairs)),
            "stats" => print_stats(&memory),
            "effacer" => {
                memory.clear();
                println!("🗑️  Historique effacé");
            }
            _ if lowered.starts_with("cherche ") => {
                let keyword = question.get("cherche ".len()..).unwrap_or_default().trim();
                print_search(&memory, keyword);
            }
            _ => {
                let answer = tokio::select! {
                    biased;
                    answer = bot.ask(&mut memory, question) => answer,
                    _ = &mut interrupt => {
                        tracing::info!("Interrupted, saving session");
                        break;
                    }
                };
                print_answer(answer.source, &answer.text);
                answered += 1;
            }
        }
    }

    save_memory(config, &memory);
    Ok((memory, answered))
}

async fn ask_once(config: &DataBotConfig, bot: &DataBot, question: &str) {
    let mut memory = open_memory(config);
    let answer = bot.ask(&mut memory, question).await;
    print_answer(answer.source, &answer.text);
    save_memory(config, &memory);
}

fn print_stats(memory: &ConversationMemory) {
    let stats = memory.stats();
    println!("\n📊 STATISTIQUES:");
    println!("  total_messages: {}", stats.total);
    println!("  human_messages: {}", stats.human_count);
    println!("  ai_messages: {}", stats.assistant_count);
    println!("  conversations: {}", stats.paired_count);
    println!("  memory_usage_percent: {:.1}", stats.fill_ratio * 100.0);
}

fn print_search(memory: &ConversationMemory, keyword: &str) {
    let results = memory.search(keyword);
    println!("\n🔍 RECHERCHE '{}': {} résultat(s)", keyword, results.len());
    for entry in results {
        println!("  [{}] {}: {}", entry.timestamp_label(), entry.role, entry.content);
    }
}

fn show_history(
    config: &DataBotConfig,
    last: Option<usize>,
    search: Option<&str>,
    stats: bool,
    clear: bool,
) {
    let mut memory = open_memory(config);

    if clear {
        memory.clear();
        save_memory(config, &memory);
        println!("🗑️  Historique effacé");
        return;
    }
    if let Some(keyword) = search {
        print_search(&memory, keyword);
    }
    if stats {
        print_stats(&memory);
    }
    if search.is_none() && !stats {
        println!("{}", memory.recent_window(last.unwrap_or(config.memory.recent_pairs)));
    }
}

fn export_table(table: &SalesTable, output: &Path) -> Result<()> {
    table.write_csv(output)?;
    println!("✅ Données exportées : {} ({} produits)", output.display(), table.len());
    Ok(())
}

async fn run_server(config: DataBotConfig) -> Result<()> {
    tracing::info!("Starting DataBot API");

    let bot = DataBot::from_config(&config)?;
    let memory = open_memory(&config);
    let mut state = AppState::new(bot, memory).with_recent_pairs(config.memory.recent_pairs);
    if let Some(path) = config.memory.snapshot() {
        state = state.with_snapshot(path);
    }

    gateway::serve(&config, state).await?;
    Ok(())
}

fn run_doctor(config: &DataBotConfig, config_path: Option<&Path>) {
    println!("🔍 DataBot Doctor");
    println!();

    println!("Checking configuration...");
    match config_path {
        Some(path) => println!("  ✓ Configuration file: {}", path.display()),
        None => println!("  ℹ No configuration file given (using defaults)"),
    }

    println!();
    println!("Checking language model...");
    if !config.llm.enabled {
        println!("  ℹ Model disabled, local answers only");
    } else if config.llm.resolve_api_key().is_some() {
        println!("  ✓ API key found in ${}", config.llm.api_key_env);
    } else {
        println!("  ✗ ${} is not set, local answers only", config.llm.api_key_env);
    }

    println!();
    println!("Checking sales data...");
    match &config.sales.data_file {
        Some(path) => match SalesTable::from_csv(path) {
            Ok(table) => println!("  ✓ {} products in {}", table.len(), path.display()),
            Err(e) => println!("  ✗ {}", e),
        },
        None => println!("  ℹ Using built-in demo table"),
    }

    println!();
    println!("Checking conversation memory...");
    match config.memory.snapshot() {
        Some(path) if path.exists() => {
            let mut memory = ConversationMemory::new(config.memory.capacity);
            match memory.try_load(path) {
                Ok(()) => println!("  ✓ Snapshot {}: {}", path.display(), memory),
                Err(e) => println!("  ✗ {}", e),
            }
        }
        Some(path) => println!("  ℹ No snapshot yet at {}", path.display()),
        None => println!("  ℹ Persistence disabled"),
    }

    println!();
    println!("Doctor check complete!");
}

fn show_config(config: Option<&DataBotConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    println!("{}", config.to_toml()?);
    Ok(())
}
