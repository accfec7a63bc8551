//! failover-chat command-line client.
//!
//! # Architecture Overview
//!
//! ```text
//!   prompt ──▶ Conversation ──▶ FailoverClient::complete
//!                                   │
//!                   ┌───────────────┼────────────────┐
//!                   ▼               ▼                ▼
//!             EndpointList    CredentialRing    resilience
//!           (preferred first)  (rotate on 401)  (timeouts, budget, backoff)
//!                   │               │                │
//!                   └──────▶ HttpTransport ◀─────────┘
//!                                   │
//!                                   ▼
//!                     KeyValueStore (history, preferences)
//! ```

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use failover_chat::client::FailoverClient;
use failover_chat::config::loader::load_or_default;
use failover_chat::credentials::load_credentials;
use failover_chat::health::pretest_connectivity;
use failover_chat::observability::logging::init_logging;
use failover_chat::store::{FileStore, KeyValueStore, MemoryStore};
use failover_chat::{ChatConfig, Conversation};

#[derive(Parser)]
#[command(name = "failover-chat")]
#[command(about = "Chat-completion client with multi-endpoint failover", long_about = None)]
struct Cli {
    /// Configuration file (TOML). Defaults are used if it does not exist.
    #[arg(short, long, default_value = "failover-chat.toml")]
    config: PathBuf,

    /// Credential file, overriding `credentials.path`.
    #[arg(short, long)]
    keys: Option<PathBuf>,

    /// Store file, overriding `store.path`.
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Keep connection state in memory only.
    #[arg(long)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message and print the reply
    Ask {
        /// Message text
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
    /// Interactive chat session (`/new` resets, `/exit` quits)
    Chat,
    /// Show connection history and preferences
    History,
    /// Check general network reachability
    Pretest,
    /// Check credentials, store and network before chatting
    Diagnose,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_or_default(&cli.config)?;
    init_logging(&config.observability);

    tracing::debug!(
        config = %cli.config.display(),
        endpoints = config.endpoints.urls.len(),
        retry_budget = config.retries.budget(),
        "Configuration loaded"
    );

    let store = open_store(&cli, &config)?;

    match &cli.command {
        Commands::Ask { message } => {
            let client = build_client(&cli, config, store)?;
            let mut conversation = Conversation::new();
            conversation.push_user(message.join(" "));
            let completion = client.complete(&conversation).await?;
            println!("{}", completion.content);
        }
        Commands::Chat => {
            let client = build_client(&cli, config, store)?;
            run_repl(&client).await?;
        }
        Commands::History => print_history(&config, store.as_ref())?,
        Commands::Pretest => {
            let reachable = run_pretest(&config).await?;
            match reachable {
                Some(url) => println!("Network OK (reached {})", url),
                None => println!("No test URL was reachable; chat may still work through a proxy"),
            }
        }
        Commands::Diagnose => diagnose(&cli, &config, store.as_ref()).await?,
    }

    Ok(())
}

fn open_store(cli: &Cli, config: &ChatConfig) -> Result<Arc<dyn KeyValueStore>, Box<dyn std::error::Error>> {
    if cli.ephemeral {
        return Ok(Arc::new(MemoryStore::new()));
    }
    let path = cli.store.clone().unwrap_or_else(|| PathBuf::from(&config.store.path));
    let store = FileStore::open(path)?;
    tracing::debug!(path = %store.path().display(), "Opened connection store");
    Ok(Arc::new(store))
}

fn credential_path(cli: &Cli, config: &ChatConfig) -> PathBuf {
    cli.keys.clone().unwrap_or_else(|| PathBuf::from(&config.credentials.path))
}

fn build_client(
    cli: &Cli,
    config: ChatConfig,
    store: Arc<dyn KeyValueStore>,
) -> Result<FailoverClient, Box<dyn std::error::Error>> {
    let credentials = load_credentials(&credential_path(cli, &config), &config.credentials.prefix, store.as_ref())?;
    Ok(FailoverClient::new(config, credentials, store)?)
}

/// Progress line shown while a reply is pending. Owned by the send step.
struct PendingReply {
    shown: bool,
}

impl PendingReply {
    fn show() -> Self {
        eprint!("… waiting for reply");
        let _ = std::io::stderr().flush();
        Self { shown: true }
    }

    fn clear(mut self) {
        self.erase();
    }

    fn erase(&mut self) {
        if self.shown {
            eprint!("\r                    \r");
            let _ = std::io::stderr().flush();
            self.shown = false;
        }
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        self.erase();
    }
}

async fn run_repl(client: &FailoverClient) -> Result<(), Box<dyn std::error::Error>> {
    let mut conversation = Conversation::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Connected to {} endpoints. Type /new to start over, /exit to quit.", client.endpoints().len());
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "/exit" | "/quit" => break,
            "/new" => {
                conversation = Conversation::new();
                println!("Started a new conversation.");
                continue;
            }
            _ => {}
        }

        conversation.push_user(line);
        let pending = PendingReply::show();
        let result = client.complete(&conversation).await;
        pending.clear();

        match result {
            Ok(completion) => {
                println!("{}", completion.content);
                conversation.push_assistant(completion.content);
            }
            Err(e) => {
                eprintln!("Error: {}", e);
            }
        }
    }
    Ok(())
}

fn print_history(config: &ChatConfig, store: &dyn KeyValueStore) -> Result<(), Box<dyn std::error::Error>> {
    use failover_chat::endpoint::ConnectionHistory;
    use failover_chat::resilience::timeouts::AdaptiveTimeoutFactor;
    use failover_chat::store::{keys, load_json};

    let preferred: Option<String> = load_json(store, keys::LAST_SUCCESSFUL_ENDPOINT)?;
    let factor: AdaptiveTimeoutFactor = load_json(store, keys::ADAPTIVE_TIMEOUT_FACTOR)?.unwrap_or_default();
    let history: ConnectionHistory = load_json(store, keys::CONNECTION_HISTORY)?.unwrap_or_default();

    println!("Preferred endpoint: {}", preferred.as_deref().unwrap_or("(none)"));
    println!("Adaptive timeout factor: {:.1}", factor.value());
    println!();
    for url in &config.endpoints.urls {
        match history.get(url) {
            Some(r) => println!(
                "{:<6} {:>7}ms  ok={:<4} failed={:<4} {}",
                if r.succeeded { "OK" } else { "FAIL" },
                r.last_response_time_ms,
                r.successes,
                r.failures,
                url
            ),
            None => println!("{:<6} {:>9}  {:>19} {}", "-", "-", "", url),
        }
    }

    let working = history.successful_endpoints();
    let failing = history.failed_endpoints();
    println!();
    println!("{} working, {} failing at last attempt", working.len(), failing.len());
    for url in failing.iter().filter(|url| !config.endpoints.urls.iter().any(|u| u.as_str() == **url)) {
        println!("  (no longer configured) {}", url);
    }
    Ok(())
}

async fn run_pretest(config: &ChatConfig) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_millis(config.probe.pretest_timeout_ms))
        .build()?;
    Ok(pretest_connectivity(
        &client,
        &config.probe.pretest_urls,
        Duration::from_millis(config.probe.pretest_timeout_ms),
    )
    .await)
}

async fn diagnose(cli: &Cli, config: &ChatConfig, store: &dyn KeyValueStore) -> Result<(), Box<dyn std::error::Error>> {
    println!("1. General network reachability");
    match run_pretest(config).await? {
        Some(url) => println!("   OK: reached {}", url),
        None => println!("   WARN: no test URL reachable, network may be restricted"),
    }

    println!("2. Persistent store");
    let probe_key = "failover-chat-diagnose";
    match store.set(probe_key, "\"ok\"".to_string()).and_then(|_| store.remove(probe_key)) {
        Ok(()) => println!("   OK: store is writable"),
        Err(e) => println!("   FAIL: {}", e),
    }

    println!("3. Credentials");
    let path = credential_path(cli, config);
    match load_credentials(&path, &config.credentials.prefix, store) {
        Ok(creds) if creds.len() > 1 => println!("   OK: {} credentials, rotation enabled", creds.len()),
        Ok(_) => println!("   OK: 1 credential"),
        Err(e) => println!("   FAIL: {}", e),
    }

    println!("4. Endpoints");
    for (i, url) in config.endpoints.urls.iter().enumerate() {
        println!("   {}. {}", i + 1, url);
    }
    if let Some(proxy) = &config.endpoints.proxy_url {
        println!("   via proxy {}", proxy);
    }
    Ok(())
}
