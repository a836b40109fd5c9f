use std::time::Instant;

use clap::{Parser, Subcommand};

use loja_scraper::{ExtractionOutcome, Orchestrator, ScraperConfig};

#[derive(Parser)]
#[command(name = "loja_scraper", about = "Product data extraction for Brazilian e-commerce pages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract title, price and image from a product URL
    Extract {
        url: String,
        /// Print the raw JSON record instead of the readable summary
        #[arg(long)]
        json: bool,
    },
    /// Show which retailer a URL maps to
    Classify { url: String },
    /// Normalize a price string
    Price { text: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract { url, json } => {
            let t0 = Instant::now();
            let orchestrator = Orchestrator::new(ScraperConfig::from_env());
            let outcome = orchestrator.extract(&url).await;
            orchestrator.close().await;

            match outcome {
                ExtractionOutcome::Success(record) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&record)?);
                    } else {
                        println!("title:  {}", record.title.as_deref().unwrap_or("-"));
                        println!("price:  {}", record.price.as_deref().unwrap_or("-"));
                        println!("image:  {}", record.image_url.as_deref().unwrap_or("-"));
                        println!("url:    {}", record.resolved_url);
                        println!("\nDone in {:.1}s", t0.elapsed().as_secs_f64());
                    }
                    Ok(())
                }
                ExtractionOutcome::Failure(f) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&f)?);
                    }
                    anyhow::bail!("{}: {}", f.error_code, f.error)
                }
            }
        }
        Commands::Classify { url } => {
            println!("{}", loja_scraper::sites::classify(&url).as_str());
            Ok(())
        }
        Commands::Price { text } => {
            let (display, value) = loja_scraper::price::normalize(&text);
            match value {
                Some(v) => println!("{display} ({v})"),
                None => println!("{display} (no numeric value)"),
            }
            Ok(())
        }
    }
}
