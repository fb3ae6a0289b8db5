pub mod config;
pub mod logic;
pub mod model;
pub mod store;

// Export logic types
pub use logic::{
    clean_entity, merge, parse_link_header, resolve_multi, resolve_single, EditError,
    EditSession, ForeignKey, LinkInfo, LinkParseError, MultiDraft, PageContext,
};

// Export all model types
pub use model::*;

// Export store types
pub use store::{
    AdminStore, EntityStore, HttpTransport, MemoryTransport, PageResponse, RegistryError,
    Transport, TransportError,
};

/// Fetch one page of the named entity from the configured server and return
/// the held rows. Used by the `hr-sync` binary.
pub async fn fetch_listing(
    config: &crate::config::AppConfig,
    entity: &str,
    page: Option<u32>,
) -> anyhow::Result<Vec<serde_json::Value>> {
    use std::sync::Arc;

    let transport = Arc::new(HttpTransport::from_config(&config.api)?);
    let store = AdminStore::new(transport, config.paging.clone());

    let request = page.map(|page| {
        PageRequest::new(page, config.paging.page_size, config.paging.sort.clone())
    });
    let rows = store.fetch_list_by_name(entity, request).await?;

    Ok(rows)
}
