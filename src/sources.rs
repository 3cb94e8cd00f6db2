use std::collections::HashSet;

use serde::Deserialize;
use thiserror::Error;

use crate::config::Config;
use crate::models::{Posting, RawPosting};

#[derive(Debug, Error)]
pub enum SourceError {
    /// Network or HTTP failure talking to the jobs API. The refresh aborts.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// Required credentials are absent. The refresh aborts.
    #[error("missing configuration: {0}")]
    Configuration(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum SourceKind {
    Adzuna,
    Jsearch,
}

impl SourceKind {
    /// Lowercase name used in run ids and the runs table.
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Adzuna => "adzuna",
            SourceKind::Jsearch => "jsearch",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SourceKind::Adzuna => "Adzuna",
            SourceKind::Jsearch => "JSearch",
        }
    }
}

/// Fetch capability: one search call against an external jobs API.
pub trait JobSource {
    fn kind(&self) -> SourceKind;
    fn fetch(
        &self,
        keyword: &str,
        location: &str,
        max_results: u32,
    ) -> Result<Vec<RawPosting>, SourceError>;
}

pub fn source_for(kind: SourceKind, config: &Config) -> Result<Box<dyn JobSource>, SourceError> {
    match kind {
        SourceKind::Adzuna => Ok(Box::new(AdzunaSource::new(config)?)),
        SourceKind::Jsearch => Ok(Box::new(JsearchSource::new(config)?)),
    }
}

/// Drop duplicate ids (first occurrence wins) and fill missing fields with
/// empty strings. Deterministic; an empty input yields an empty output.
pub fn normalize_postings(raw: Vec<RawPosting>) -> Vec<Posting> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(raw.len());
    for r in raw {
        let id = r.id.unwrap_or_default();
        if !seen.insert(id.clone()) {
            continue;
        }
        out.push(Posting {
            id,
            title: r.title.unwrap_or_default(),
            company: r.company.unwrap_or_default(),
            location: r.location.unwrap_or_default(),
            description: r.description.unwrap_or_default(),
            created: r.created.unwrap_or_default(),
        });
    }
    out
}

// --- Adzuna ---

const ADZUNA_BASE_URL: &str = "https://api.adzuna.com/v1/api/jobs";

#[derive(Debug, Deserialize)]
struct AdzunaResponse {
    #[serde(default)]
    results: Vec<AdzunaJob>,
}

#[derive(Debug, Deserialize)]
struct AdzunaJob {
    id: Option<serde_json::Value>, // numeric in some payloads, string in others
    title: Option<String>,
    company: Option<AdzunaCompany>,
    location: Option<AdzunaLocation>,
    description: Option<String>,
    created: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AdzunaCompany {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AdzunaLocation {
    display_name: Option<String>,
}

impl AdzunaJob {
    fn into_raw(self) -> RawPosting {
        RawPosting {
            id: self.id.map(id_to_string),
            title: self.title,
            company: self.company.and_then(|c| c.display_name),
            location: self.location.and_then(|l| l.display_name),
            description: self.description,
            created: self.created,
        }
    }
}

fn id_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

pub struct AdzunaSource {
    app_id: String,
    app_key: String,
    country: String,
    client: reqwest::blocking::Client,
}

impl AdzunaSource {
    pub fn new(config: &Config) -> Result<Self, SourceError> {
        let app_id = config
            .adzuna_app_id
            .clone()
            .ok_or_else(|| SourceError::Configuration("ADZUNA_APP_ID not set".to_string()))?;
        let app_key = config
            .adzuna_app_key
            .clone()
            .ok_or_else(|| SourceError::Configuration("ADZUNA_APP_KEY not set".to_string()))?;
        Ok(Self {
            app_id,
            app_key,
            country: config.adzuna_country.clone(),
            client: reqwest::blocking::Client::new(),
        })
    }
}

impl JobSource for AdzunaSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Adzuna
    }

    fn fetch(
        &self,
        keyword: &str,
        location: &str,
        max_results: u32,
    ) -> Result<Vec<RawPosting>, SourceError> {
        let url = format!("{}/{}/search/1", ADZUNA_BASE_URL, self.country);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("app_id", self.app_id.as_str()),
                ("app_key", self.app_key.as_str()),
                ("what", keyword),
                ("where", location),
                ("results_per_page", &max_results.to_string()),
                ("content-type", "application/json"),
            ])
            .send()
            .map_err(|e| SourceError::Unavailable(format!("adzuna request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SourceError::Unavailable(format!(
                "adzuna returned HTTP {}",
                response.status()
            )));
        }

        let body: AdzunaResponse = response
            .json()
            .map_err(|e| SourceError::Unavailable(format!("adzuna response not parseable: {e}")))?;
        Ok(body.results.into_iter().map(AdzunaJob::into_raw).collect())
    }
}

// --- JSearch (RapidAPI) ---

const JSEARCH_BASE_URL: &str = "https://jsearch.p.rapidapi.com/search";

#[derive(Debug, Deserialize)]
struct JsearchResponse {
    #[serde(default)]
    data: Vec<JsearchJob>,
}

#[derive(Debug, Deserialize)]
struct JsearchJob {
    job_id: Option<String>,
    job_title: Option<String>,
    employer_name: Option<String>,
    job_city: Option<String>,
    job_country: Option<String>,
    job_description: Option<String>,
    job_posted_at_datetime_utc: Option<String>,
}

impl JsearchJob {
    fn into_raw(self) -> RawPosting {
        RawPosting {
            id: self.job_id,
            title: self.job_title,
            company: self.employer_name,
            location: self.job_city.or(self.job_country),
            description: self.job_description,
            created: self.job_posted_at_datetime_utc,
        }
    }
}

pub struct JsearchSource {
    api_key: String,
    client: reqwest::blocking::Client,
}

impl JsearchSource {
    pub fn new(config: &Config) -> Result<Self, SourceError> {
        let api_key = config
            .rapidapi_key
            .clone()
            .ok_or_else(|| SourceError::Configuration("RAPIDAPI_KEY not set".to_string()))?;
        Ok(Self {
            api_key,
            client: reqwest::blocking::Client::new(),
        })
    }
}

impl JobSource for JsearchSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Jsearch
    }

    fn fetch(
        &self,
        keyword: &str,
        location: &str,
        _max_results: u32,
    ) -> Result<Vec<RawPosting>, SourceError> {
        let response = self
            .client
            .get(JSEARCH_BASE_URL)
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", "jsearch.p.rapidapi.com")
            .query(&[
                ("query", format!("{keyword} in {location}").as_str()),
                ("page", "1"),
                ("num_pages", "1"),
                ("date_posted", "all"),
            ])
            .send()
            .map_err(|e| SourceError::Unavailable(format!("jsearch request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SourceError::Unavailable(format!(
                "jsearch returned HTTP {}",
                response.status()
            )));
        }

        let body: JsearchResponse = response
            .json()
            .map_err(|e| SourceError::Unavailable(format!("jsearch response not parseable: {e}")))?;
        Ok(body.data.into_iter().map(JsearchJob::into_raw).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: Option<&str>, title: Option<&str>) -> RawPosting {
        RawPosting {
            id: id.map(String::from),
            title: title.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn normalize_drops_duplicate_ids_first_wins() {
        let postings = normalize_postings(vec![
            raw(Some("a"), Some("first")),
            raw(Some("b"), Some("second")),
            raw(Some("a"), Some("third")),
        ]);
        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].id, "a");
        assert_eq!(postings[0].title, "first");
        assert_eq!(postings[1].id, "b");
    }

    #[test]
    fn normalize_fills_missing_fields_with_empty_strings() {
        let postings = normalize_postings(vec![raw(Some("a"), None)]);
        assert_eq!(postings[0].title, "");
        assert_eq!(postings[0].company, "");
        assert_eq!(postings[0].description, "");
    }

    #[test]
    fn normalize_is_idempotent_over_ids() {
        let input = vec![
            raw(Some("a"), None),
            raw(Some("a"), None),
            raw(Some("b"), None),
        ];
        let once = normalize_postings(input.clone());
        let ids: Vec<_> = once.iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let twice = normalize_postings(
            once.iter()
                .map(|p| RawPosting {
                    id: Some(p.id.clone()),
                    ..Default::default()
                })
                .collect(),
        );
        assert_eq!(twice.len(), once.len());
    }

    #[test]
    fn normalize_empty_input_is_empty_output() {
        assert!(normalize_postings(Vec::new()).is_empty());
    }

    #[test]
    fn adzuna_response_maps_nested_fields() {
        let body = r#"{
            "results": [{
                "id": 4100000001,
                "title": "Data Engineer",
                "company": {"display_name": "Acme"},
                "location": {"display_name": "Austin, TX"},
                "description": "Build pipelines",
                "created": "2026-08-27T12:00:00Z"
            }]
        }"#;
        let parsed: AdzunaResponse = serde_json::from_str(body).unwrap();
        let raw = parsed
            .results
            .into_iter()
            .map(AdzunaJob::into_raw)
            .next()
            .unwrap();
        assert_eq!(raw.id.as_deref(), Some("4100000001"));
        assert_eq!(raw.company.as_deref(), Some("Acme"));
        assert_eq!(raw.location.as_deref(), Some("Austin, TX"));
    }

    #[test]
    fn jsearch_location_falls_back_to_country() {
        let body = r#"{
            "data": [{
                "job_id": "xyz",
                "job_title": "ML Engineer",
                "employer_name": "Beta",
                "job_city": null,
                "job_country": "US",
                "job_description": "Train models",
                "job_posted_at_datetime_utc": "2026-08-27T00:00:00Z"
            }]
        }"#;
        let parsed: JsearchResponse = serde_json::from_str(body).unwrap();
        let raw = parsed.data.into_iter().map(JsearchJob::into_raw).next().unwrap();
        assert_eq!(raw.location.as_deref(), Some("US"));
    }

    #[test]
    fn missing_credentials_is_a_configuration_error() {
        let config = Config::default();
        let err = AdzunaSource::new(&config).err().unwrap();
        assert!(matches!(err, SourceError::Configuration(_)));
        let err = JsearchSource::new(&config).err().unwrap();
        assert!(matches!(err, SourceError::Configuration(_)));
    }
}
