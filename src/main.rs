use academia_scraper::{ScrapingContext, config::PortalConfig};
use dotenv::dotenv;
use log::{LevelFilter, error};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let (portal_config, credentials) = PortalConfig::from_env()?;
    let context = ScrapingContext::new(portal_config)?;

    let report = match context.scrape(&credentials).await {
        Ok(report) => report,
        Err(e) => {
            error!("Scrape failed: {e:#}");
            return Err(e);
        }
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
