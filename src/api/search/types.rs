use serde::{Deserialize, Serialize};

use finder_backend::search::SearchResult;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_page")]
    pub page: usize,
}

fn default_limit() -> usize { 50 }
fn default_page() -> usize { 1 }

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}
