use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use reqwest::StatusCode;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::state::{Fighter, FighterProfile, FighterStat};

const API_BASE: &str = "https://pokeapi.co/api/v2";
const DETAIL_CONCURRENCY: usize = 12;

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("response parse error: {0}")]
    Parse(String),
    #[error("detail task failed: {0}")]
    Task(String),
}

#[derive(Clone, Debug, Deserialize)]
struct NamedResource {
    name: String,
}

#[derive(Clone, Debug, Deserialize)]
struct ListResponse {
    results: Vec<NamedResource>,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonResponse {
    id: u32,
    name: String,
    #[serde(default)]
    height: u16,
    #[serde(default)]
    weight: u16,
    #[serde(default)]
    types: Vec<PokemonTypeSlot>,
    #[serde(default)]
    stats: Vec<PokemonStatSlot>,
    #[serde(default)]
    abilities: Vec<PokemonAbilitySlot>,
    #[serde(default)]
    sprites: serde_json::Value,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonTypeSlot {
    #[serde(rename = "type")]
    type_info: NamedResource,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonStatSlot {
    base_stat: u16,
    stat: NamedResource,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonAbilitySlot {
    ability: NamedResource,
}

/// One page of fighters in listing order, or an empty page on any failure.
pub async fn list_fighters(limit: usize, offset: usize) -> Vec<Fighter> {
    ApiClient::default().list_fighters(limit, offset).await
}

/// A single fighter by numeric id or name, or `None` on any failure.
pub async fn get_fighter(id: &str) -> Option<Fighter> {
    ApiClient::default().get_fighter(id).await
}

pub async fn get_profile(id: &str) -> Option<FighterProfile> {
    ApiClient::default().get_profile(id).await
}

pub async fn fetch_fighter_page(limit: usize, offset: usize) -> Result<Vec<Fighter>, FetchError> {
    ApiClient::default().fetch_fighter_page(limit, offset).await
}

pub async fn fetch_fighter(id: &str) -> Result<Fighter, FetchError> {
    ApiClient::default().fetch_fighter(id).await
}

pub async fn fetch_profile(id: &str) -> Result<FighterProfile, FetchError> {
    ApiClient::default().fetch_profile(id).await
}

/// Endpoint, HTTP client and response cache used for every request.
#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    cache_dir: Option<PathBuf>,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new(API_BASE)
    }
}

impl ApiClient {
    /// `base_url` is the API root, e.g. `https://pokeapi.co/api/v2`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: shared_http_client().clone(),
            cache_dir: Some(cache_root()),
        }
    }

    pub fn with_http(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// `None` disables the on-disk cache.
    pub fn with_cache_dir(mut self, cache_dir: Option<PathBuf>) -> Self {
        self.cache_dir = cache_dir;
        self
    }

    pub async fn list_fighters(&self, limit: usize, offset: usize) -> Vec<Fighter> {
        match self.fetch_fighter_page(limit, offset).await {
            Ok(fighters) => fighters,
            Err(err) => {
                warn!(limit, offset, error = %err, "fighter page unavailable");
                Vec::new()
            }
        }
    }

    pub async fn get_fighter(&self, id: &str) -> Option<Fighter> {
        match self.fetch_fighter(id).await {
            Ok(fighter) => Some(fighter),
            Err(err) => {
                warn!(id, error = %err, "fighter unavailable");
                None
            }
        }
    }

    pub async fn get_profile(&self, id: &str) -> Option<FighterProfile> {
        match self.fetch_profile(id).await {
            Ok(profile) => Some(profile),
            Err(err) => {
                warn!(id, error = %err, "fighter profile unavailable");
                None
            }
        }
    }

    pub async fn fetch_fighter_page(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Fighter>, FetchError> {
        let response: ListResponse = self.fetch_json_cached(&self.page_url(limit, offset)).await?;
        let names: Vec<String> = response.results.into_iter().map(|entry| entry.name).collect();
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let semaphore = Arc::new(Semaphore::new(DETAIL_CONCURRENCY));
        let mut join_set = JoinSet::new();
        for (index, name) in names.iter().cloned().enumerate() {
            let semaphore = semaphore.clone();
            let client = self.clone();
            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| FetchError::Task("detail semaphore closed".to_string()))?;
                client.fetch_fighter(&name).await.map(|fighter| (index, fighter))
            });
        }

        let mut slots: Vec<Option<Fighter>> = vec![None; names.len()];
        while let Some(result) = join_set.join_next().await {
            let (index, fighter) = result.map_err(|err| FetchError::Task(err.to_string()))??;
            if let Some(slot) = slots.get_mut(index) {
                *slot = Some(fighter);
            }
        }
        in_listing_order(slots)
            .ok_or_else(|| FetchError::Task(format!("incomplete page at offset {offset}")))
    }

    pub async fn fetch_fighter(&self, id: &str) -> Result<Fighter, FetchError> {
        let response: PokemonResponse = self.fetch_json_cached(&self.detail_url(id)).await?;
        Ok(fighter_from_response(&response))
    }

    pub async fn fetch_profile(&self, id: &str) -> Result<FighterProfile, FetchError> {
        let response: PokemonResponse = self.fetch_json_cached(&self.detail_url(id)).await?;
        Ok(profile_from_response(response))
    }

    fn page_url(&self, limit: usize, offset: usize) -> String {
        format!("{}/pokemon?limit={limit}&offset={offset}", self.base_url)
    }

    fn detail_url(&self, id: &str) -> String {
        format!("{}/pokemon/{}", self.base_url, id.trim().to_ascii_lowercase())
    }

    fn cache_path(&self, url: &str) -> Option<PathBuf> {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let digest = hex::encode(hasher.finalize());
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join("http").join(digest))
    }

    /// A cached body that no longer parses is evicted and fetched again.
    async fn fetch_json_cached<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, FetchError> {
        let cache_path = self.cache_path(url);
        if let Some(path) = cache_path.as_deref() {
            if let Some(bytes) = read_cache(path).await {
                match serde_json::from_slice(&bytes) {
                    Ok(value) => {
                        debug!(url, "cache hit");
                        return Ok(value);
                    }
                    Err(err) => {
                        warn!(url, error = %err, "evicting unreadable cache entry");
                        let _ = fs::remove_file(path).await;
                    }
                }
            }
        }

        let bytes = self.fetch_bytes(url).await?;
        let value =
            serde_json::from_slice(&bytes).map_err(|err| FetchError::Parse(err.to_string()))?;
        if let Some(path) = cache_path.as_deref() {
            write_cache(path, &bytes).await;
        }
        Ok(value)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!(url, "GET");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::Request(err.to_string()))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.to_string()));
        }
        let response = response
            .error_for_status()
            .map_err(|err| FetchError::Request(err.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| FetchError::Request(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Completion order of the detail requests is arbitrary; callers get the
/// listing order back, and nothing when any slot is missing.
fn in_listing_order<T>(slots: Vec<Option<T>>) -> Option<Vec<T>> {
    slots.into_iter().collect()
}

fn fighter_from_response(response: &PokemonResponse) -> Fighter {
    let attack = response
        .stats
        .iter()
        .find(|slot| slot.stat.name == "attack")
        .map(|slot| slot.base_stat)
        .unwrap_or(0);
    let kind = response
        .types
        .first()
        .map(|slot| slot.type_info.name.clone())
        .unwrap_or_else(|| "unknown".to_string());
    Fighter {
        id: response.id,
        name: response.name.clone(),
        attack,
        kind,
        image: pointer_string(&response.sprites, "/front_default"),
    }
}

fn profile_from_response(response: PokemonResponse) -> FighterProfile {
    let fighter = fighter_from_response(&response);
    FighterProfile {
        fighter,
        types: response
            .types
            .into_iter()
            .map(|slot| slot.type_info.name)
            .collect(),
        stats: response
            .stats
            .into_iter()
            .map(|slot| FighterStat {
                name: slot.stat.name,
                value: slot.base_stat,
            })
            .collect(),
        abilities: response
            .abilities
            .into_iter()
            .map(|slot| slot.ability.name)
            .collect(),
        height: response.height,
        weight: response.weight,
    }
}

fn pointer_string(value: &serde_json::Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(|val| val.as_str())
        .map(|s| s.to_string())
}

fn shared_http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(reqwest::Client::new)
}

fn cache_root() -> PathBuf {
    dirs_next::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("pokefight")
}

async fn read_cache(path: &Path) -> Option<Vec<u8>> {
    fs::read(path).await.ok()
}

async fn write_cache(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent).await;
    }
    let _ = fs::write(path, bytes).await;
}
