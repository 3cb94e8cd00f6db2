use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPosting {
    pub id: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub created: Option<String>, // source-provided timestamp, not validated
}

/// Canonical posting record. Missing upstream fields become empty strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Posting {
    pub id: String, // natural key, unique in the archive
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub created: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    ProductManager,
    DataScientist,
    MlEngineer,
    DataEngineer,
    Other,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::ProductManager => "Product Manager",
            Role::DataScientist => "Data Scientist",
            Role::MlEngineer => "ML Engineer",
            Role::DataEngineer => "Data Engineer",
            Role::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedPosting {
    pub posting: Posting,
    pub skills: BTreeSet<String>, // normalized lowercase
    pub role: Role,
    pub is_remote: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetric {
    pub run_id: String, // timestamp + source, same second overwrites
    pub run_ts: String, // UTC "%Y-%m-%d %H:%M:%S"
    pub source: String,
    pub keyword: String,
    pub location: String,
    pub jobs_fetched: i64,
    pub unique_companies: i64,
    pub remote_share: f64, // in [0,1]; 0.0 when jobs_fetched == 0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillCount {
    pub skill: String,
    pub count: i64,
}

/// Unordered skill pair with its co-occurrence count. skill_a < skill_b.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillPair {
    pub skill_a: String,
    pub skill_b: String,
    pub co_occurrences: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillHistoryPoint {
    pub date: String, // "%Y-%m-%d"
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRunStats {
    pub date: String,
    pub jobs_fetched: i64,     // sum over the day's runs
    pub unique_companies: i64, // max over the day's runs
    pub remote_share: f64,     // mean over the day's runs
}
