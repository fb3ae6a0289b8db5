use hr_entity_sync::config::AppConfig;
use hr_entity_sync::{fetch_listing, meta_by_name, ALL_ENTITIES};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("reqwest", LevelFilter::Warn)
        .filter_module("hyper", LevelFilter::Warn)
        .parse_default_env()
        .init();

    let mut args = std::env::args().skip(1);
    let Some(entity) = args.next() else {
        let names: Vec<_> = ALL_ENTITIES.iter().map(|meta| meta.resource).collect();
        anyhow::bail!("usage: hr-sync <entity> [page]\nentities: {}", names.join(", "));
    };
    let page = args.next().map(|page| page.parse::<u32>()).transpose()?;

    let meta = meta_by_name(&entity).ok_or_else(|| anyhow::anyhow!("unknown entity '{}'", entity))?;

    let config = AppConfig::load()?;
    log::info!(
        "Fetching {} from {} (page size {})",
        meta.resource,
        config.api.base_url,
        config.paging.page_size
    );

    let rows = fetch_listing(&config, meta.resource, page).await?;
    println!("{}", serde_json::to_string_pretty(&rows)?);
    log::info!("{} {} row(s) held", rows.len(), meta.name);

    Ok(())
}
