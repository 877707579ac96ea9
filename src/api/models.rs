use serde::{Deserialize, Serialize};

/// One page of a server-side table, in the server's DataTables shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageResponse {
    #[serde(rename = "recordsFiltered", default)]
    pub records_filtered: Option<u64>,
    #[serde(rename = "recordsTotal", default)]
    pub records_total: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingRow {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub rank: Option<i64>,
    #[serde(default)]
    pub due: i64,
    #[serde(default)]
    pub reported: i64,
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub percentage: Option<f64>,
    #[serde(default)]
    pub sponsor_name: String,
    #[serde(default)]
    pub sponsor_slug: String,
    #[serde(default)]
    pub is_industry_sponsor: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialRow {
    pub registry_id: String,
    #[serde(default)]
    pub publication_url: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub has_exemption: Option<bool>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub completion_date: Option<String>,
    #[serde(default)]
    pub has_results: Option<bool>,
    #[serde(default)]
    pub results_due: Option<bool>,
    #[serde(default)]
    pub sponsor_name: String,
    #[serde(default)]
    pub sponsor_slug: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub is_pact: bool,
    #[serde(default)]
    pub days_late: Option<i64>,
}

/// Body of `/api/performance/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Performance {
    #[serde(default)]
    pub reported: u64,
    #[serde(default)]
    pub due: u64,
    #[serde(default)]
    pub fines_str: Option<String>,
    #[serde(default)]
    pub days_late: Option<i64>,
}
