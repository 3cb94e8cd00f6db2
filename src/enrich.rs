use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::models::EnrichedPosting;

/// Optional AI skill-extraction capability. Present-or-absent at runtime;
/// every failure is treated as "no extra skills" by the caller.
pub trait SkillEnricher {
    fn available(&self) -> bool;
    fn enrich(&self, text: &str) -> Result<Vec<String>>;
}

/// Merge AI-extracted skills into the baseline sets for a bounded subset of
/// the batch (cost cap). Enrichment failures keep the baseline for that
/// posting and never abort the refresh. Returns how many postings were
/// actually augmented.
pub fn apply_enrichment(
    enricher: &dyn SkillEnricher,
    postings: &mut [EnrichedPosting],
    cap: usize,
    prefix_chars: usize,
) -> usize {
    if !enricher.available() {
        return 0;
    }

    let mut augmented = 0;
    for enriched in postings.iter_mut().take(cap) {
        let text = char_prefix(&enriched.posting.description, prefix_chars);
        match enricher.enrich(text) {
            Ok(skills) if !skills.is_empty() => {
                for skill in skills {
                    let skill = skill.trim().to_lowercase();
                    if !skill.is_empty() {
                        enriched.skills.insert(skill);
                    }
                }
                augmented += 1;
            }
            _ => {} // baseline skills retained
        }
    }
    augmented
}

fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// --- Gemini enricher ---

const GEMINI_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

pub struct GeminiEnricher {
    api_key: String,
    client: reqwest::blocking::Client,
}

impl GeminiEnricher {
    /// None when GEMINI_API_KEY is not configured; the pipeline then runs
    /// with keyword extraction only.
    pub fn from_config(config: &Config) -> Option<Self> {
        config.gemini_api_key.clone().map(|api_key| Self {
            api_key,
            client: reqwest::blocking::Client::new(),
        })
    }
}

impl SkillEnricher for GeminiEnricher {
    fn available(&self) -> bool {
        true
    }

    fn enrich(&self, text: &str) -> Result<Vec<String>> {
        let prompt = format!(
            "Extract the top 5 standardized technical skills from this job description.\n\
             Return as a comma-separated list.\n\n\
             Description:\n{text}"
        );

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(GEMINI_API_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .context("Failed to send request to Gemini API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "Gemini API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: GeminiResponse =
            response.json().context("Failed to parse Gemini API response")?;

        let text = api_response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| anyhow!("No content in Gemini API response"))?;

        Ok(parse_skill_list(&text))
    }
}

fn parse_skill_list(response: &str) -> Vec<String> {
    response
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
