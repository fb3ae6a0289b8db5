use serde::{Deserialize, Serialize};

use crate::model::PageRequest;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub paging: PagingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Server root; resources live under `<base_url>/api/`
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagingConfig {
    pub page_size: u32,
    pub sort: String,
    /// Drop list completions that arrive after a newer list request was issued
    pub discard_stale: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            sort: "id,asc".to_string(),
            discard_stale: false,
        }
    }
}

impl PagingConfig {
    /// First page of a fresh listing with the configured size and sort
    pub fn first_page(&self) -> PageRequest {
        PageRequest::first(self.page_size, self.sort.clone())
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional `config` file and
    /// `HRSYNC_` environment variables (e.g. `HRSYNC_API__BASE_URL`)
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        // Add default configuration
        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        // Add config file if it exists
        config = config.add_source(config::File::with_name("config").required(false));

        config = config.add_source(
            config::Environment::with_prefix("HRSYNC")
                .separator("__")
                .prefix_separator("_"),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        Ok(app_config)
    }
}
