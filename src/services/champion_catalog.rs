use reqwest::Client;
use tokio::sync::RwLock;
use tracing::info;

use crate::dto::champion_dto::{ChampionCatalog, ChampionResponse};
use crate::error::CatalogError;

/// Client for the versioned champion data feed. The first successful fetch
/// is kept for the life of the process.
pub struct ChampionCatalogClient {
    http: Client,
    base_url: String,
    locale: String,
    cached: RwLock<Option<ChampionCatalog>>,
}

impl ChampionCatalogClient {
    pub fn new(base_url: &str, locale: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            locale: locale.to_string(),
            cached: RwLock::new(None),
        }
    }

    /// A client that never goes to the network and serves `catalog`.
    pub fn preloaded(catalog: ChampionCatalog) -> Self {
        Self {
            http: Client::new(),
            base_url: String::new(),
            locale: String::new(),
            cached: RwLock::new(Some(catalog)),
        }
    }

    pub async fn fetch_champions(&self) -> Result<ChampionCatalog, CatalogError> {
        if let Some(catalog) = self.cached.read().await.as_ref() {
            return Ok(catalog.clone());
        }

        let catalog = self.download().await?;
        *self.cached.write().await = Some(catalog.clone());
        Ok(catalog)
    }

    pub async fn fetch_champion_names(&self) -> Result<Vec<String>, CatalogError> {
        Ok(self.fetch_champions().await?.names())
    }

    async fn download(&self) -> Result<ChampionCatalog, CatalogError> {
        let versions: Vec<String> = self
            .http
            .get(format!("{}/api/versions.json", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let version = versions.into_iter().next().ok_or(CatalogError::NoVersions)?;

        let response: ChampionResponse = self
            .http
            .get(format!(
                "{}/cdn/{}/data/{}/champion.json",
                self.base_url, version, self.locale
            ))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut champions: Vec<_> = response.data.into_values().collect();
        champions.sort_by(|a, b| a.name.cmp(&b.name));
        info!(%version, count = champions.len(), "Loaded champion catalog.");

        Ok(ChampionCatalog { version, champions })
    }
}
