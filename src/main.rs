use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use url::Url;

use reel_shuffler::channel::{ControlClient, Disconnected, Loopback, Request, SendOutcome, Transport};
use reel_shuffler::host::{JsonFileStore, KeyValueStore, LogNotifier, StaticPage};
use reel_shuffler::{EngineConfig, LinkNormalizer, PageEngine, QueueStore};

/// Control surface for the reel queue engine.
///
/// With `--html` the engine is attached to a saved page snapshot; without
/// it the page is unreachable and only stored state can be shown.
#[derive(Debug, Parser)]
#[command(name = "reel-shuffler", version)]
struct Cli {
    /// JSON file holding the persisted queue.
    #[arg(long, env = "REEL_SHUFFLER_STORE", default_value = "reel-queue.json")]
    store: PathBuf,

    /// Saved markup of the page the engine is attached to.
    #[arg(long)]
    html: Option<PathBuf>,

    /// Location of that page.
    #[arg(long, default_value = "https://www.instagram.com/")]
    page_url: Url,

    /// Wait between collector scroll rounds.
    #[arg(long, default_value_t = 1500)]
    scroll_delay_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Show queue position and visible link count.
    Status,
    /// Build a shuffled queue from visible links and open the first.
    Shuffle,
    /// Scroll-collect every link, shuffle, and open the first.
    FetchAll,
    /// Open the next queued link.
    Next,
    /// Open a random queued link.
    Random,
    /// Drop the queue.
    Clear,
}

impl Command {
    fn request(self) -> Request {
        match self {
            Command::Status => Request::Status,
            Command::Shuffle => Request::Shuffle,
            Command::FetchAll => Request::FetchAll,
            Command::Next => Request::Next,
            Command::Random => Request::Random,
            Command::Clear => Request::Clear,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = EngineConfig::default().with_scroll_delay(Duration::from_millis(cli.scroll_delay_ms));
    let store = JsonFileStore::new(&cli.store);

    let on_target = LinkNormalizer::new(&config.target_origin).same_origin(&cli.page_url);
    if cli.html.is_some() && !on_target {
        log::warn!("{} is not on {}, not attaching", cli.page_url, config.target_origin);
    }
    let Some(html_path) = cli.html.as_ref().filter(|_| on_target) else {
        let client = popup_client(Disconnected, store.clone(), &config);
        return run(&client, cli.command).await;
    };

    let html = std::fs::read_to_string(html_path)
        .with_context(|| format!("reading page snapshot {}", html_path.display()))?;
    let page = StaticPage::new(cli.page_url.clone(), html);
    let engine = PageEngine::new(config.clone(), page, store.clone(), LogNotifier);

    let client = popup_client(Loopback(&engine), store, &config);
    run(&client, cli.command).await?;

    if let Some(target) = engine.page().navigated_to() {
        println!("Open: {}", target);
    }
    Ok(())
}

fn popup_client<T: Transport, S: KeyValueStore>(
    transport: T,
    store: S,
    config: &EngineConfig,
) -> ControlClient<T, S> {
    let fallback = QueueStore::new(
        store,
        config.storage_key.clone(),
        LinkNormalizer::new(&config.target_origin),
        config.max_queue_size,
    );
    ControlClient::new(transport, fallback, config.extension_id.clone())
}

async fn run<T: Transport, S: KeyValueStore>(
    client: &ControlClient<T, S>,
    command: Command,
) -> anyhow::Result<()> {
    let request = command.request();
    if request != Request::Status {
        match client.send(request).await {
            SendOutcome::Delivered { navigates: true } => return Ok(()),
            SendOutcome::Delivered { navigates: false } => {}
            SendOutcome::Unreachable => {
                anyhow::bail!("no page attached; pass --html to run {:?}", command)
            }
        }
    }

    let report = client.status().await;
    println!("{}", report);
    if let Some(path) = report.queue.source_path() {
        println!("Source: {}", path);
    }
    Ok(())
}
