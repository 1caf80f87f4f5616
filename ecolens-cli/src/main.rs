//! ecolens CLI
//!
//! Drives the overlay engine against fixture pages: capture a destination on
//! a simulated home page, navigate to a simulated results page, and watch the
//! overlay render, tooltip, and dismiss lifecycle.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use ecolens_client::{
    check_backend, BackendConfig, HttpEnrichmentClient, IntentStore, MemoryIntentStore,
    SharedEnrichmentApi, SharedIntentStore,
};
use ecolens_core::{intent_key, SiteId, SiteRegistry};
use ecolens_page::Selector;
use ecolens_runtime::{fixtures, RouterConfig, Session};

#[derive(Parser)]
#[command(name = "ecolens")]
#[command(author, version, about = "ecolens: eco-score overlays for travel search pages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1")]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulated home-to-results session for one site
    Demo {
        /// Site to simulate (skyscanner or kayak)
        #[arg(short, long, default_value = "skyscanner")]
        site: String,

        /// Destination to type into the home page
        #[arg(short, long, default_value = "Rome")]
        destination: String,

        /// Backend API base URL
        #[arg(long, default_value = "http://localhost:8080/api")]
        base_url: String,

        /// TOML file overriding the built-in site profiles
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List the registered site profiles
    Profiles {
        /// TOML file overriding the built-in site profiles
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Check whether the enrichment backend is reachable
    Status {
        /// Backend API base URL
        #[arg(long, default_value = "http://localhost:8080/api")]
        base_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    match cli.command {
        Commands::Demo {
            site,
            destination,
            base_url,
            config,
        } => {
            run_demo(&site, &destination, &base_url, config).await?;
        }
        Commands::Profiles { config } => {
            list_profiles(config)?;
        }
        Commands::Status { base_url } => {
            check_status(&base_url).await?;
        }
    }

    Ok(())
}

fn load_registry(config: Option<PathBuf>) -> Result<SiteRegistry> {
    match config {
        Some(path) => {
            let doc = fs::read_to_string(&path)?;
            Ok(SiteRegistry::from_toml_str(&doc)?)
        }
        None => Ok(SiteRegistry::builtin()),
    }
}

async fn run_demo(
    site: &str,
    destination: &str,
    base_url: &str,
    config: Option<PathBuf>,
) -> Result<()> {
    let site: SiteId = site.parse()?;
    let registry = load_registry(config)?;
    let profile = registry.resolve(site)?.clone();

    println!("ecolens demo - {} - destination {destination}\n", site.host());

    let backend_config = BackendConfig::default().with_base_url(base_url);
    match check_backend(&backend_config).await {
        Ok(true) => println!("backend reachable at {base_url}"),
        _ => println!("backend unreachable at {base_url} - overlay will use the fallback record"),
    }

    let store: SharedIntentStore = Arc::new(MemoryIntentStore::new());
    let api: SharedEnrichmentApi = Arc::new(HttpEnrichmentClient::new(backend_config)?);
    let session = Session::new(
        RouterConfig::default().with_registry(registry),
        store.clone(),
        api,
    );

    // Home page: type the destination, let the search control appear, click it
    println!("\n[home] opening {}/", site.host());
    let home = session.navigate(site.host(), "/", fixtures::home_html(site)).await?;
    fixtures::enter_destination(&home.page, &profile, destination);

    let root = home
        .page
        .query(&Selector::parse(&profile.root)?)
        .expect("fixture root present");
    let buttons = home.page.append_html(root, fixtures::search_button_html(site));
    tokio::time::sleep(Duration::from_millis(50)).await;

    home.page.activate(buttons[0]);
    tokio::time::sleep(Duration::from_millis(50)).await;

    match store.get(&intent_key(site)).await? {
        Some(captured) => println!("[home] captured intent: {captured}"),
        None => println!("[home] no intent captured"),
    }

    // Results page: content arrives, the overlay renders
    println!("\n[results] opening {}/flights/results", site.host());
    let results = session
        .navigate(site.host(), "/flights/results", fixtures::results_html(site))
        .await?;
    let root = results
        .page
        .query(&Selector::parse(&profile.root)?)
        .expect("fixture root present");
    results
        .page
        .append_html(root, &fixtures::result_content_html(site, "ROM from $120"));

    tokio::time::sleep(Duration::from_millis(400)).await;
    match results.page.query(&Selector::parse(".ecolens-popup")?) {
        Some(overlay) => {
            println!("[results] overlay rendered:");
            print!("{}", results.page.render_tree(overlay));
        }
        None => println!("[results] no overlay rendered"),
    }

    // Wait out the tooltip rescan delay
    tokio::time::sleep(Duration::from_millis(2100)).await;
    let tooltips = results
        .page
        .query_all(&Selector::parse(".ecolens-tooltip")?);
    println!("[results] tooltips attached: {}", tooltips.len());

    // Dismiss and wait out the transition
    if let Some(dismiss) = results.page.query(&Selector::parse(".ecolens-popup-dismiss")?) {
        println!("[results] dismissing overlay");
        results.page.activate(dismiss);
        tokio::time::sleep(Duration::from_millis(900)).await;
        let still_there = results
            .page
            .query(&Selector::parse(".ecolens-popup")?)
            .is_some();
        println!(
            "[results] overlay {}",
            if still_there { "still present" } else { "removed" }
        );
    }

    Ok(())
}

fn list_profiles(config: Option<PathBuf>) -> Result<()> {
    let registry = load_registry(config)?;

    for (site, profile) in registry.iter() {
        println!("{site} ({})", site.host());
        println!("  root:              {}", profile.root);
        println!("  destination input: {}", profile.destination_input);
        println!("  search button:     {}", profile.search_button);
        println!("  result action:     {}", profile.result_action);
        println!("  content:           {}", profile.content);
        println!("  read strategy:     {:?}", profile.read_strategy);
        println!();
    }

    Ok(())
}

async fn check_status(base_url: &str) -> Result<()> {
    println!("checking enrichment backend at {base_url}...\n");

    let config = BackendConfig::default().with_base_url(base_url);
    match check_backend(&config).await {
        Ok(true) => {
            println!("backend is running and serving destination records");
        }
        Ok(false) => {
            println!("backend responded but not successfully");
            println!("expected endpoints:");
            println!("  GET  {base_url}/destination?format=json");
            println!("  POST {base_url}/search-data?format=json");
        }
        Err(e) => {
            println!("backend unreachable: {e}");
            println!("observers will fall back to the default record");
        }
    }

    Ok(())
}
