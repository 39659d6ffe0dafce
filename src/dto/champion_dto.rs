use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Champion {
    pub id: String,
    pub name: String,
}

/// Body of `champion.json`; extra fields in the feed are ignored.
#[derive(Debug, Deserialize)]
pub struct ChampionResponse {
    pub data: HashMap<String, Champion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChampionCatalog {
    pub version: String,
    pub champions: Vec<Champion>,
}

impl ChampionCatalog {
    pub fn names(&self) -> Vec<String> {
        self.champions.iter().map(|c| c.name.clone()).collect()
    }
}
