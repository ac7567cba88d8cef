use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::models::JobResult;
use crate::params::{build_query_params, SearchFilters};

const JOBBOERSE_API_URL: &str = "https://rest.arbeitsagentur.de/jobboerse/jobsuche-service";
const JOBBOERSE_API_KEY: &str = "jobsuche-clientId";

/// One search request against the board, as the controller issues it.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub location: String,
    pub filters: SearchFilters,
    pub page: usize,
    pub size: usize,
}

/// One fetched page: the mapped rows plus the reconciled total, if the
/// response carried one.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub results: Vec<JobResult>,
    pub total: Option<u64>,
}

/// Seam between the search controller and the network. Tests script this.
pub trait JobSource {
    fn fetch_page(&mut self, request: &SearchRequest) -> Result<SearchPage>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestField {
    Occupation,
    Location,
}

/// Seam for the two autocomplete endpoints.
pub trait SuggestionSource {
    fn complete(&self, field: SuggestField, partial: &str) -> Result<Vec<String>>;
}

// --- Job board client ---

#[derive(Debug, Clone)]
pub struct JobboerseClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl JobboerseClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(JOBBOERSE_API_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn get_json(&self, url: &str, params: &[(String, String)]) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .query(params)
            .header("X-API-Key", JOBBOERSE_API_KEY)
            .send()
            .context("Failed to send request to job board")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(anyhow!(
                "Job board request failed with status {}: {}",
                status,
                body
            ));
        }

        response.json().context("Failed to parse job board response")
    }
}

impl JobSource for JobboerseClient {
    fn fetch_page(&mut self, request: &SearchRequest) -> Result<SearchPage> {
        let params = build_query_params(
            &request.query,
            &request.location,
            &request.filters,
            request.page,
            request.size,
        );
        let url = format!("{}/pc/v4/jobs", self.base_url);
        let raw = self.get_json(&url, &params)?;
        Ok(parse_search_page(&raw))
    }
}

impl SuggestionSource for JobboerseClient {
    fn complete(&self, field: SuggestField, partial: &str) -> Result<Vec<String>> {
        let partial = partial.trim();
        if partial.is_empty() {
            return Ok(Vec::new());
        }
        let (path, param) = match field {
            SuggestField::Occupation => ("/pc/v4/berufe", "was"),
            SuggestField::Location => ("/pc/v4/orte", "wo"),
        };
        let url = format!("{}{}", self.base_url, path);
        let raw = self.get_json(&url, &[(param.to_string(), partial.to_string())])?;
        Ok(parse_suggestions(&raw))
    }
}

// --- Response parsing ---

// The board has renamed its result array before; probe the known names.
const RESULT_FIELDS: &[&str] = &["stellenangebote", "jobs"];

pub fn parse_search_page(raw: &Value) -> SearchPage {
    let mut results = Vec::new();
    for field in RESULT_FIELDS {
        if let Some(rows) = raw.get(field).and_then(Value::as_array) {
            for row in rows {
                if let Ok(job) = serde_json::from_value::<RawJob>(row.clone()) {
                    results.push(job.into_result());
                }
            }
            break;
        }
    }
    SearchPage {
        total: extract_total(raw),
        results,
    }
}

#[derive(Debug, Deserialize)]
struct RawJob {
    #[serde(default)]
    refnr: Option<String>,
    #[serde(default)]
    titel: Option<String>,
    #[serde(default)]
    beruf: Option<String>,
    #[serde(default)]
    arbeitgeber: Option<String>,
    #[serde(default)]
    arbeitsort: Option<RawArbeitsort>,
    #[serde(default, rename = "externeUrl")]
    externe_url: Option<String>,
    #[serde(default)]
    angebotsart: Option<Value>,
    #[serde(default)]
    eintrittsdatum: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawArbeitsort {
    #[serde(default)]
    ort: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    entfernung: Option<Value>,
}

impl RawJob {
    fn into_result(self) -> JobResult {
        let location = match &self.arbeitsort {
            Some(ort) => match (&ort.ort, &ort.region) {
                (Some(city), Some(region)) if !city.is_empty() && !region.is_empty() => {
                    format!("{}, {}", city, region)
                }
                (Some(city), _) if !city.is_empty() => city.clone(),
                (_, Some(region)) => region.clone(),
                _ => String::new(),
            },
            None => String::new(),
        };
        let distance_km = self
            .arbeitsort
            .as_ref()
            .and_then(|o| o.entfernung.as_ref())
            .and_then(parse_distance);

        JobResult {
            title: self.titel.or(self.beruf).unwrap_or_default(),
            employer: self.arbeitgeber.unwrap_or_default(),
            location,
            external_id: self.refnr,
            link: self.externe_url,
            distance_km,
            offer_category: self.angebotsart.as_ref().and_then(raw_code),
            start_date: self.eintrittsdatum,
        }
    }
}

fn raw_code(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// The board sends distances as numbers or as strings with a decimal comma.
fn parse_distance(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

pub fn parse_suggestions(raw: &Value) -> Vec<String> {
    let empty: &[Value] = &[];
    let items: &[Value] = match raw {
        Value::Array(items) => items.as_slice(),
        Value::Object(_) => raw
            .get("suggestions")
            .and_then(Value::as_array)
            .map(|v| v.as_slice())
            .unwrap_or(empty),
        _ => empty,
    };

    let mut out = Vec::new();
    for item in items {
        match item {
            Value::String(s) => out.push(s.clone()),
            Value::Object(_) => {
                for field in ["bezeichnung", "name"] {
                    if let Some(s) = item.get(field).and_then(Value::as_str) {
                        out.push(s.to_string());
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    out
}

// --- Result-count reconciliation ---

// Candidate locations for the total, in probe order. The response shape is
// not stable across board versions, and some nested paths undercount when
// the board paginates internally, so every candidate is parsed and the
// largest wins.
const TOTAL_PATHS: &[&[&str]] = &[
    &["total"],
    &["maxErgebnisse"],
    &["hits", "total"],
    &["hits", "total", "value"],
    &["page", "totalElements"],
];

/// Extract a total-result count from a raw response. Returns None when no
/// candidate path parses as a non-negative integer (unknown, not zero).
pub fn extract_total(raw: &Value) -> Option<u64> {
    let mut best: Option<u64> = None;
    for path in TOTAL_PATHS {
        let mut node = raw;
        let mut found = true;
        for segment in *path {
            match node.get(segment) {
                Some(next) => node = next,
                None => {
                    found = false;
                    break;
                }
            }
        }
        if !found {
            continue;
        }
        if let Some(count) = parse_count(node) {
            best = Some(best.map_or(count, |b| b.max(count)));
        }
    }
    best
}

fn parse_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                return Some(u);
            }
            let f = n.as_f64()?;
            if f.is_finite() && f >= 0.0 && f.fract() == 0.0 {
                Some(f as u64)
            } else {
                None
            }
        }
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}
