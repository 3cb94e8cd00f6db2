use std::collections::{HashMap, HashSet};

use crate::models::{EnrichedPosting, Role, SkillCount, SkillPair};

pub const DEFAULT_TOP_SKILLS: usize = 20;
pub const DEFAULT_TOP_PAIRS: usize = 15;

/// Frequency table over all postings' skill sets, count descending.
/// Ties break by skill name so output is stable from run to run.
pub fn skill_counts(postings: &[EnrichedPosting]) -> Vec<SkillCount> {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for p in postings {
        for skill in &p.skills {
            *counts.entry(skill.as_str()).or_default() += 1;
        }
    }
    let mut out: Vec<SkillCount> = counts
        .into_iter()
        .map(|(skill, count)| SkillCount {
            skill: skill.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.skill.cmp(&b.skill)));
    out
}

/// Unordered co-occurrence pairs among the batch's top skills. A posting
/// with fewer than two qualifying skills contributes no pairs.
pub fn top_skill_pairs(
    postings: &[EnrichedPosting],
    top_n_skills: usize,
    top_pairs: usize,
) -> Vec<SkillPair> {
    let top: HashSet<String> = skill_counts(postings)
        .into_iter()
        .take(top_n_skills)
        .map(|c| c.skill)
        .collect();

    let mut counts: HashMap<(String, String), i64> = HashMap::new();
    for p in postings {
        // BTreeSet iteration is already deduplicated and sorted
        let qualifying: Vec<&String> = p.skills.iter().filter(|s| top.contains(*s)).collect();
        for (i, a) in qualifying.iter().enumerate() {
            for b in &qualifying[i + 1..] {
                *counts
                    .entry(((*a).clone(), (*b).clone()))
                    .or_default() += 1;
            }
        }
    }

    let mut out: Vec<SkillPair> = counts
        .into_iter()
        .map(|((skill_a, skill_b), co_occurrences)| SkillPair {
            skill_a,
            skill_b,
            co_occurrences,
        })
        .collect();
    out.sort_by(|a, b| {
        b.co_occurrences
            .cmp(&a.co_occurrences)
            .then_with(|| a.skill_a.cmp(&b.skill_a))
            .then_with(|| a.skill_b.cmp(&b.skill_b))
    });
    out.truncate(top_pairs);
    out
}

// 0.0 for an empty batch
pub fn remote_share(postings: &[EnrichedPosting]) -> f64 {
    if postings.is_empty() {
        return 0.0;
    }
    let remote = postings.iter().filter(|p| p.is_remote).count();
    remote as f64 / postings.len() as f64
}

pub fn unique_companies(postings: &[EnrichedPosting]) -> i64 {
    postings
        .iter()
        .map(|p| p.posting.company.as_str())
        .collect::<HashSet<_>>()
        .len() as i64
}

pub fn role_mix(postings: &[EnrichedPosting]) -> Vec<(Role, i64)> {
    let mut counts: HashMap<Role, i64> = HashMap::new();
    for p in postings {
        *counts.entry(p.role).or_default() += 1;
    }
    let mut out: Vec<(Role, i64)> = counts.into_iter().collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
    out
}

pub fn company_leaderboard(postings: &[EnrichedPosting]) -> Vec<(String, i64)> {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for p in postings {
        if !p.posting.company.is_empty() {
            *counts.entry(p.posting.company.as_str()).or_default() += 1;
        }
    }
    let mut out: Vec<(String, i64)> = counts
        .into_iter()
        .map(|(c, n)| (c.to_string(), n))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}
