use anyhow::{Context, Result};
use regex::Regex;

use crate::models::{Posting, Role};

/// Seed vocabulary for keyword skill matching. Skills are an open set; the
/// enrichment path can extend what ends up in the counts beyond this list.
pub const SKILL_KEYWORDS: &[&str] = &[
    "python",
    "sql",
    "aws",
    "gcp",
    "azure",
    "machine learning",
    "deep learning",
    "nlp",
    "llm",
    "data science",
    "tableau",
    "power bi",
    "spark",
    "airflow",
    "product analytics",
];

const REMOTE_TOKENS: &[&str] = &["remote", "work from home", "wfh", "distributed"];

/// Compiled whole-word matchers for the seed vocabulary.
pub struct SkillVocabulary {
    patterns: Vec<(String, Regex)>,
}

impl SkillVocabulary {
    pub fn new() -> Result<Self> {
        let mut patterns = Vec::with_capacity(SKILL_KEYWORDS.len());
        for skill in SKILL_KEYWORDS {
            let re = Regex::new(&format!(r"\b{}\b", regex::escape(skill)))
                .with_context(|| format!("compiling skill pattern for '{skill}'"))?;
            patterns.push((skill.to_string(), re));
        }
        Ok(Self { patterns })
    }

    /// Case-insensitive whole-word/phrase matches over a description.
    /// Deterministic: identical text always yields the identical set.
    pub fn extract_skills(&self, text: &str) -> Vec<String> {
        let text = text.to_lowercase();
        self.patterns
            .iter()
            .filter(|(_, re)| re.is_match(&text))
            .map(|(skill, _)| skill.clone())
            .collect()
    }
}

/// First-matching substring rule over the lowercased title; Other if none hit.
pub fn classify_role(title: &str) -> Role {
    let t = title.to_lowercase();
    if t.contains("product") {
        return Role::ProductManager;
    }
    if t.contains("data scientist") {
        return Role::DataScientist;
    }
    if t.contains("machine learning") || t.contains("ml engineer") {
        return Role::MlEngineer;
    }
    if t.contains("data engineer") {
        return Role::DataEngineer;
    }
    Role::Other
}

/// True if any remote token appears in location, title, or description.
pub fn estimate_remote_flag(posting: &Posting) -> bool {
    let loc = posting.location.to_lowercase();
    let title = posting.title.to_lowercase();
    let desc = posting.description.to_lowercase();
    REMOTE_TOKENS
        .iter()
        .any(|t| loc.contains(t) || title.contains(t) || desc.contains(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(title: &str, location: &str, description: &str) -> Posting {
        Posting {
            id: "x".to_string(),
            title: title.to_string(),
            company: String::new(),
            location: location.to_string(),
            description: description.to_string(),
            created: String::new(),
        }
    }

    #[test]
    fn extracts_whole_words_only() {
        let vocab = SkillVocabulary::new().unwrap();
        let skills = vocab.extract_skills("Experience with Python and SQL required");
        assert!(skills.contains(&"python".to_string()));
        assert!(skills.contains(&"sql".to_string()));

        // "mysql" must not count as "sql"
        let skills = vocab.extract_skills("mysql administration");
        assert!(!skills.contains(&"sql".to_string()));
    }

    #[test]
    fn extracts_multi_word_phrases() {
        let vocab = SkillVocabulary::new().unwrap();
        let skills = vocab.extract_skills("strong machine learning and power bi background");
        assert!(skills.contains(&"machine learning".to_string()));
        assert!(skills.contains(&"power bi".to_string()));
    }

    #[test]
    fn extraction_is_deterministic() {
        let vocab = SkillVocabulary::new().unwrap();
        let text = "Python, SQL, AWS, and a bit of NLP";
        assert_eq!(vocab.extract_skills(text), vocab.extract_skills(text));
    }

    #[test]
    fn empty_text_yields_no_skills() {
        let vocab = SkillVocabulary::new().unwrap();
        assert!(vocab.extract_skills("").is_empty());
    }

    #[test]
    fn role_rules_first_match_wins() {
        assert_eq!(classify_role("Senior Product Manager"), Role::ProductManager);
        assert_eq!(classify_role("Data Scientist II"), Role::DataScientist);
        assert_eq!(classify_role("ML Engineer"), Role::MlEngineer);
        assert_eq!(classify_role("Machine Learning Researcher"), Role::MlEngineer);
        assert_eq!(classify_role("Data Engineer"), Role::DataEngineer);
        assert_eq!(classify_role("Accountant"), Role::Other);
        // "product" outranks "data scientist" in rule order
        assert_eq!(classify_role("Product Data Scientist"), Role::ProductManager);
    }

    #[test]
    fn remote_flag_checks_all_three_fields() {
        assert!(estimate_remote_flag(&posting("Engineer", "Remote", "")));
        assert!(estimate_remote_flag(&posting("Remote Engineer", "NYC", "")));
        assert!(estimate_remote_flag(&posting("Engineer", "NYC", "option to work from home")));
        assert!(estimate_remote_flag(&posting("Engineer", "NYC", "WFH friendly")));
        assert!(!estimate_remote_flag(&posting("Engineer", "NYC", "on-site only")));
    }
}
