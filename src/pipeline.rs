use anyhow::{Context, Result};
use chrono::Utc;

use crate::aggregate::{
    self, DEFAULT_TOP_PAIRS, DEFAULT_TOP_SKILLS, remote_share, skill_counts, top_skill_pairs,
    unique_companies,
};
use crate::cache::FetchCache;
use crate::config::Config;
use crate::db::Database;
use crate::enrich::{SkillEnricher, apply_enrichment};
use crate::extract::{SkillVocabulary, classify_role, estimate_remote_flag};
use crate::models::{EnrichedPosting, Role, RunMetric, SkillCount, SkillPair};
use crate::sources::{JobSource, normalize_postings};
use crate::trends::{DEFAULT_TOP_MOVERS, TrendReport, compare_to_yesterday};

/// Parameters for one refresh cycle.
#[derive(Debug, Clone)]
pub struct RefreshRequest {
    pub keyword: String,
    pub location: String,
    pub max_results: u32,
    pub enable_ai: bool,
}

/// Immutable result of one refresh cycle, handed to the presentation layer.
/// Nothing in here is shared mutable state; a failed later refresh leaves an
/// earlier snapshot untouched.
#[derive(Debug, Clone)]
pub struct RefreshSnapshot {
    pub run: RunMetric,
    pub postings: Vec<EnrichedPosting>,
    pub skill_counts: Vec<SkillCount>,
    pub skill_pairs: Vec<SkillPair>,
    pub role_mix: Vec<(Role, i64)>,
    pub trend: TrendReport,
    pub ai_enriched: usize, // postings actually augmented by the AI capability
}

pub struct Refresher {
    vocab: SkillVocabulary,
    config: Config,
}

impl Refresher {
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            vocab: SkillVocabulary::new()?,
            config,
        })
    }

    /// One end-to-end cycle: cached fetch → normalize → archive → extract →
    /// optional AI enrichment → aggregate → persist run + daily counts →
    /// compare against yesterday. Fetch failures abort before anything is
    /// written; enrichment failures never abort.
    pub fn refresh(
        &self,
        db: &Database,
        cache: &mut FetchCache,
        source: &dyn JobSource,
        enricher: Option<&dyn SkillEnricher>,
        request: &RefreshRequest,
    ) -> Result<RefreshSnapshot> {
        let raw = cache.fetch(
            source,
            &request.keyword,
            &request.location,
            request.max_results,
        )?;
        let postings = normalize_postings(raw);

        db.append_postings(&postings)
            .context("Failed to archive postings")?;

        let mut enriched: Vec<EnrichedPosting> = postings
            .into_iter()
            .map(|posting| EnrichedPosting {
                skills: self
                    .vocab
                    .extract_skills(&posting.description)
                    .into_iter()
                    .collect(),
                role: classify_role(&posting.title),
                is_remote: estimate_remote_flag(&posting),
                posting,
            })
            .collect();

        let mut ai_enriched = 0;
        if request.enable_ai {
            if let Some(enricher) = enricher {
                ai_enriched = apply_enrichment(
                    enricher,
                    &mut enriched,
                    self.config.enrich_cap,
                    self.config.enrich_prefix,
                );
            }
        }

        let counts = skill_counts(&enriched);
        let pairs = top_skill_pairs(&enriched, DEFAULT_TOP_SKILLS, DEFAULT_TOP_PAIRS);
        let role_mix = aggregate::role_mix(&enriched);

        let now = Utc::now();
        let run = RunMetric {
            run_id: format!("{}-{}", now.format("%Y%m%d%H%M%S"), source.kind().name()),
            run_ts: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            source: source.kind().display_name().to_string(),
            keyword: request.keyword.trim().to_string(),
            location: request.location.trim().to_string(),
            jobs_fetched: enriched.len() as i64,
            unique_companies: unique_companies(&enriched),
            remote_share: remote_share(&enriched),
        };
        db.record_run(&run).context("Failed to record run metrics")?;

        let today = now.format("%Y-%m-%d").to_string();
        db.upsert_daily_skill_counts(&today, &counts)
            .context("Failed to upsert daily skill counts")?;

        let yesterday = db.yesterday_counts(&today)?;
        let trend = compare_to_yesterday(&counts, &yesterday, DEFAULT_TOP_MOVERS);

        Ok(RefreshSnapshot {
            run,
            postings: enriched,
            skill_counts: counts,
            skill_pairs: pairs,
            role_mix,
            trend,
            ai_enriched,
        })
    }
}
