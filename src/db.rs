use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rusqlite::{Connection, params};
use std::path::PathBuf;

use crate::config::Config;
use crate::models::{Posting, RunMetric, SkillCount, SkillHistoryPoint};

pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    pub fn open(config: &Config) -> Result<Self> {
        let path = match &config.db_path {
            Some(p) => p.clone(),
            None => Self::default_path()?,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        Ok(Self {
            conn,
            path: Some(path),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    fn default_path() -> Result<PathBuf> {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "skillpulse") {
            Ok(proj_dirs.data_dir().join("skillpulse.db"))
        } else {
            Ok(PathBuf::from("skillpulse.db"))
        }
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS postings (
                id TEXT PRIMARY KEY,
                title TEXT,
                company TEXT,
                location TEXT,
                description TEXT,
                created TEXT,
                fetched_at TEXT
            );

            CREATE TABLE IF NOT EXISTS runs (
                run_id TEXT PRIMARY KEY,
                run_ts TEXT,
                source TEXT,
                keyword TEXT,
                location TEXT,
                jobs_fetched INTEGER,
                unique_companies INTEGER,
                remote_share REAL
            );

            CREATE TABLE IF NOT EXISTS skills_daily (
                date TEXT,
                skill TEXT,
                count INTEGER,
                PRIMARY KEY (date, skill)
            );
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='postings'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!(
                "Database not initialized. Run 'skillpulse init' first."
            ));
        }
        Ok(())
    }

    // --- Archive operations ---

    /// Insert-or-ignore by id: re-fetched postings never overwrite the
    /// archived row, and the archive never deletes. Each new row is tagged
    /// with the ingestion timestamp. Returns the number actually inserted.
    pub fn append_postings(&self, batch: &[Posting]) -> Result<usize> {
        let fetched_at = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let mut inserted = 0;
        for p in batch {
            inserted += self.conn.execute(
                "INSERT OR IGNORE INTO postings (id, title, company, location, description, created, fetched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![p.id, p.title, p.company, p.location, p.description, p.created, fetched_at],
            )?;
        }
        Ok(inserted)
    }

    pub fn posting_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM postings", [], |row| row.get(0))?;
        Ok(count)
    }

    // --- Run metrics ---

    /// Insert-or-replace by run_id: re-running within the same second for the
    /// same source overwrites rather than duplicates.
    pub fn record_run(&self, metric: &RunMetric) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO runs
             (run_id, run_ts, source, keyword, location, jobs_fetched, unique_companies, remote_share)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                metric.run_id,
                metric.run_ts,
                metric.source,
                metric.keyword,
                metric.location,
                metric.jobs_fetched,
                metric.unique_companies,
                metric.remote_share
            ],
        )?;
        Ok(())
    }

    /// Most recent runs first; ties on run_ts fall back to run_id.
    pub fn load_recent_runs(&self, limit: usize) -> Result<Vec<RunMetric>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, run_ts, source, keyword, location, jobs_fetched, unique_companies, remote_share
             FROM runs
             ORDER BY run_ts DESC, run_id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit as i64], Self::row_to_run)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to load recent runs")
    }

    fn row_to_run(row: &rusqlite::Row) -> rusqlite::Result<RunMetric> {
        Ok(RunMetric {
            run_id: row.get(0)?,
            run_ts: row.get(1)?,
            source: row.get(2)?,
            keyword: row.get(3)?,
            location: row.get(4)?,
            jobs_fetched: row.get(5)?,
            unique_companies: row.get(6)?,
            remote_share: row.get(7)?,
        })
    }

    // --- Daily skill counts ---

    /// Insert-or-replace by (date, skill). A later refresh on the same day
    /// overwrites the earlier value for that skill rather than adding to it,
    /// so the stored count reflects that day's latest refresh only.
    pub fn upsert_daily_skill_counts(&self, date: &str, counts: &[SkillCount]) -> Result<()> {
        for c in counts {
            self.conn.execute(
                "INSERT OR REPLACE INTO skills_daily (date, skill, count) VALUES (?1, ?2, ?3)",
                params![date, c.skill, c.count],
            )?;
        }
        Ok(())
    }

    /// Up to `days` most recent points for one skill, returned date-ascending
    /// for charting.
    pub fn load_skill_history(&self, skill: &str, days: usize) -> Result<Vec<SkillHistoryPoint>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, count FROM skills_daily
             WHERE skill = ?1
             ORDER BY date DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![skill, days as i64], |row| {
            Ok(SkillHistoryPoint {
                date: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        let mut points = rows
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to load skill history")?;
        points.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(points)
    }

    pub fn counts_for_date(&self, date: &str) -> Result<Vec<SkillCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT skill, count FROM skills_daily
             WHERE date = ?1
             ORDER BY count DESC, skill ASC",
        )?;
        let rows = stmt.query_map([date], Self::row_to_skill_count)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to load counts for date")
    }

    /// Counts stored for the calendar day before `date`.
    pub fn yesterday_counts(&self, date: &str) -> Result<Vec<SkillCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT skill, count FROM skills_daily
             WHERE date = date(?1, '-1 day')
             ORDER BY count DESC, skill ASC",
        )?;
        let rows = stmt.query_map([date], Self::row_to_skill_count)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to load yesterday counts")
    }

    fn row_to_skill_count(row: &rusqlite::Row) -> rusqlite::Result<SkillCount> {
        Ok(SkillCount {
            skill: row.get(0)?,
            count: row.get(1)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        db
    }

    fn posting(id: &str, title: &str) -> Posting {
        Posting {
            id: id.to_string(),
            title: title.to_string(),
            company: String::new(),
            location: String::new(),
            description: String::new(),
            created: String::new(),
        }
    }

    fn metric(run_id: &str, run_ts: &str, jobs: i64) -> RunMetric {
        RunMetric {
            run_id: run_id.to_string(),
            run_ts: run_ts.to_string(),
            source: "adzuna".to_string(),
            keyword: "data".to_string(),
            location: "united states".to_string(),
            jobs_fetched: jobs,
            unique_companies: 1,
            remote_share: 0.0,
        }
    }

    #[test]
    fn append_ignores_duplicate_ids() {
        let db = test_db();
        let first = db
            .append_postings(&[posting("a", "original"), posting("b", "x")])
            .unwrap();
        assert_eq!(first, 2);

        // second append with a colliding id does not overwrite
        let second = db.append_postings(&[posting("a", "changed")]).unwrap();
        assert_eq!(second, 0);
        assert_eq!(db.posting_count().unwrap(), 2);

        let title: String = db
            .conn
            .query_row("SELECT title FROM postings WHERE id = 'a'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(title, "original");
    }

    #[test]
    fn record_run_replaces_on_same_run_id() {
        let db = test_db();
        db.record_run(&metric("20260828120000-adzuna", "2026-08-28 12:00:00", 10))
            .unwrap();
        db.record_run(&metric("20260828120000-adzuna", "2026-08-28 12:00:00", 25))
            .unwrap();

        let runs = db.load_recent_runs(10).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].jobs_fetched, 25);
    }

    #[test]
    fn recent_runs_come_back_newest_first() {
        let db = test_db();
        db.record_run(&metric("r1", "2026-08-26 09:00:00", 1)).unwrap();
        db.record_run(&metric("r2", "2026-08-28 09:00:00", 2)).unwrap();
        db.record_run(&metric("r3", "2026-08-27 09:00:00", 3)).unwrap();

        let runs = db.load_recent_runs(2).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].run_id, "r2");
        assert_eq!(runs[1].run_id, "r3");
    }

    #[test]
    fn daily_upsert_overwrites_same_day_counts() {
        let db = test_db();
        db.upsert_daily_skill_counts(
            "2026-08-28",
            &[SkillCount { skill: "python".into(), count: 5 }],
        )
        .unwrap();
        // later refresh the same day replaces, not sums
        db.upsert_daily_skill_counts(
            "2026-08-28",
            &[SkillCount { skill: "python".into(), count: 3 }],
        )
        .unwrap();

        let counts = db.counts_for_date("2026-08-28").unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].count, 3);
    }

    #[test]
    fn yesterday_counts_key_off_the_previous_calendar_day() {
        let db = test_db();
        db.upsert_daily_skill_counts(
            "2026-08-27",
            &[SkillCount { skill: "python".into(), count: 5 }],
        )
        .unwrap();
        db.upsert_daily_skill_counts(
            "2026-08-28",
            &[SkillCount { skill: "python".into(), count: 8 }],
        )
        .unwrap();

        let prev = db.yesterday_counts("2026-08-28").unwrap();
        assert_eq!(prev.len(), 1);
        assert_eq!(prev[0].count, 5);

        assert!(db.yesterday_counts("2026-08-27").unwrap().is_empty());
    }

    #[test]
    fn skill_history_is_date_ascending_and_bounded() {
        let db = test_db();
        for (date, count) in [
            ("2026-08-25", 1),
            ("2026-08-26", 2),
            ("2026-08-27", 3),
            ("2026-08-28", 4),
        ] {
            db.upsert_daily_skill_counts(date, &[SkillCount { skill: "sql".into(), count }])
                .unwrap();
        }

        let history = db.load_skill_history("sql", 3).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].date, "2026-08-26");
        assert_eq!(history[2].date, "2026-08-28");
        assert!(db.load_skill_history("cobol", 3).unwrap().is_empty());
    }

    #[test]
    fn ensure_initialized_detects_missing_schema() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.ensure_initialized().is_err());
        db.init().unwrap();
        assert!(db.ensure_initialized().is_ok());
    }
}
