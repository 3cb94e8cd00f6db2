use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{DailyRunStats, RunMetric, SkillCount};

pub const DEFAULT_TOP_MOVERS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDelta {
    pub skill: String,
    pub today: i64,
    pub yesterday: i64,
    pub delta: i64,
    pub pct_delta: f64,
}

// InsufficientHistory is a distinct state, not an error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrendReport {
    InsufficientHistory,
    Movers {
        risers: Vec<SkillDelta>,
        decliners: Vec<SkillDelta>,
    },
}

/// Full outer join of today's and yesterday's skill counts; missing counts
/// are zero. Risers rank by (delta desc, today desc), decliners inverted.
pub fn compare_to_yesterday(
    today: &[SkillCount],
    yesterday: &[SkillCount],
    top_n: usize,
) -> TrendReport {
    if today.is_empty() || yesterday.is_empty() {
        return TrendReport::InsufficientHistory;
    }

    let mut joined: BTreeMap<&str, (i64, i64)> = BTreeMap::new();
    for c in today {
        joined.entry(c.skill.as_str()).or_default().0 = c.count;
    }
    for c in yesterday {
        joined.entry(c.skill.as_str()).or_default().1 = c.count;
    }

    let deltas: Vec<SkillDelta> = joined
        .into_iter()
        .map(|(skill, (today, yesterday))| {
            let delta = today - yesterday;
            let pct_delta = if yesterday > 0 {
                delta as f64 / yesterday as f64 * 100.0
            } else if today > 0 {
                100.0
            } else {
                0.0
            };
            SkillDelta {
                skill: skill.to_string(),
                today,
                yesterday,
                delta,
                pct_delta,
            }
        })
        .collect();

    let mut risers = deltas.clone();
    risers.sort_by(|a, b| b.delta.cmp(&a.delta).then_with(|| b.today.cmp(&a.today)));
    risers.truncate(top_n);

    let mut decliners = deltas;
    decliners.sort_by(|a, b| a.delta.cmp(&b.delta).then_with(|| a.today.cmp(&b.today)));
    decliners.truncate(top_n);

    TrendReport::Movers { risers, decliners }
}

// jobs summed, companies maxed, remote_share averaged; rows date-ascending
pub fn aggregate_runs_by_day(runs: &[RunMetric]) -> Vec<DailyRunStats> {
    let mut days: BTreeMap<&str, (i64, i64, f64, u32)> = BTreeMap::new();
    for run in runs {
        // run_ts is "%Y-%m-%d %H:%M:%S"; the date is the first 10 chars
        let date = if run.run_ts.len() >= 10 {
            &run.run_ts[..10]
        } else {
            run.run_ts.as_str()
        };
        let entry = days.entry(date).or_default();
        entry.0 += run.jobs_fetched;
        entry.1 = entry.1.max(run.unique_companies);
        entry.2 += run.remote_share;
        entry.3 += 1;
    }

    days.into_iter()
        .map(|(date, (jobs, companies, share_sum, n))| DailyRunStats {
            date: date.to_string(),
            jobs_fetched: jobs,
            unique_companies: companies,
            remote_share: share_sum / n as f64,
        })
        .collect()
}
