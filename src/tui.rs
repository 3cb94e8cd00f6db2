use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use std::io::stdout;

use crate::cache::FetchCache;
use crate::db::Database;
use crate::enrich::SkillEnricher;
use crate::models::RunMetric;
use crate::pipeline::{RefreshRequest, RefreshSnapshot, Refresher};
use crate::sources::JobSource;
use crate::trends::{TrendReport, aggregate_runs_by_day};

struct AppState {
    snapshot: Option<RefreshSnapshot>,
    runs: Vec<RunMetric>,
    status: String,
}

impl AppState {
    fn new() -> Self {
        Self {
            snapshot: None,
            runs: Vec::new(),
            status: "Press 'r' to refresh live data".to_string(),
        }
    }

    /// Run one refresh cycle. On failure the previous snapshot stays on
    /// screen; only the status line changes.
    fn refresh(
        &mut self,
        db: &Database,
        cache: &mut FetchCache,
        refresher: &Refresher,
        source: &dyn JobSource,
        enricher: Option<&dyn SkillEnricher>,
        request: &RefreshRequest,
    ) {
        match refresher.refresh(db, cache, source, enricher, request) {
            Ok(snapshot) => {
                self.status = format!("Last refreshed: {} (UTC)", snapshot.run.run_ts);
                self.snapshot = Some(snapshot);
                self.runs = db.load_recent_runs(30).unwrap_or_default();
            }
            Err(e) => {
                self.status = format!("Refresh failed: {e:#}");
            }
        }
    }
}

pub fn run_dashboard(
    db: &Database,
    cache: &mut FetchCache,
    refresher: &Refresher,
    source: &dyn JobSource,
    enricher: Option<&dyn SkillEnricher>,
    request: &RefreshRequest,
) -> Result<()> {
    let mut state = AppState::new();
    state.runs = db.load_recent_runs(30).unwrap_or_default();

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(
        &mut terminal,
        &mut state,
        db,
        cache,
        refresher,
        source,
        enricher,
        request,
    );

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

#[allow(clippy::too_many_arguments)]
fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    db: &Database,
    cache: &mut FetchCache,
    refresher: &Refresher,
    source: &dyn JobSource,
    enricher: Option<&dyn SkillEnricher>,
    request: &RefreshRequest,
) -> Result<()> {
    loop {
        terminal.draw(|frame| draw(frame, state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Char('r') => {
                    state.refresh(db, cache, refresher, source, enricher, request);
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(8),
            Constraint::Length(1),
        ])
        .split(frame.area());

    // Header
    let header = Paragraph::new(state.status.as_str())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" SkillPulse — Job Market & Skills Intelligence "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(header, rows[0]);

    // Middle: top skills | movers | role mix & pairs
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(33),
            Constraint::Percentage(34),
            Constraint::Percentage(33),
        ])
        .split(rows[1]);

    frame.render_widget(top_skills_list(state), columns[0]);
    frame.render_widget(movers_panel(state), columns[1]);
    frame.render_widget(batch_panel(state), columns[2]);

    // Run history
    frame.render_widget(runs_panel(state), rows[2]);

    let help = Paragraph::new(" r:refresh  q:quit").style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, rows[3]);
}

fn top_skills_list(state: &AppState) -> List<'_> {
    let items: Vec<ListItem> = match &state.snapshot {
        Some(snapshot) if !snapshot.skill_counts.is_empty() => snapshot
            .skill_counts
            .iter()
            .take(20)
            .map(|c| ListItem::new(format!("{:<20} {:>4}", c.skill, c.count)))
            .collect(),
        _ => vec![ListItem::new("Refresh to populate skill counts")],
    };
    List::new(items).block(Block::default().borders(Borders::ALL).title(" Top skills "))
}

fn movers_panel(state: &AppState) -> Paragraph<'_> {
    let mut lines: Vec<Line> = Vec::new();
    match state.snapshot.as_ref().map(|s| &s.trend) {
        Some(TrendReport::Movers { risers, decliners }) => {
            lines.push(Line::from(Span::styled(
                "Risers vs yesterday",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )));
            for d in risers {
                lines.push(Line::from(format!(
                    "  {:<18} {:+} ({:.0}%)",
                    d.skill, d.delta, d.pct_delta
                )));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Decliners vs yesterday",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )));
            for d in decliners {
                lines.push(Line::from(format!(
                    "  {:<18} {:+} ({:.0}%)",
                    d.skill, d.delta, d.pct_delta
                )));
            }
        }
        Some(TrendReport::InsufficientHistory) => {
            lines.push(Line::from(
                "Not enough history yet. Refresh today and again tomorrow.",
            ));
        }
        None => {
            lines.push(Line::from("Refresh to compute day-over-day movers"));
        }
    }
    Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(" Movers "))
        .wrap(Wrap { trim: false })
}

fn batch_panel(state: &AppState) -> Paragraph<'_> {
    let mut lines: Vec<Line> = Vec::new();
    if let Some(snapshot) = &state.snapshot {
        lines.push(Line::from(format!(
            "Jobs: {}   Companies: {}   Remote: {:.1}%",
            snapshot.run.jobs_fetched,
            snapshot.run.unique_companies,
            snapshot.run.remote_share * 100.0
        )));
        if snapshot.ai_enriched > 0 {
            lines.push(Line::from(format!(
                "AI-enriched postings: {}",
                snapshot.ai_enriched
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Role mix",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for (role, count) in &snapshot.role_mix {
            lines.push(Line::from(format!("  {:<16} {:>4}", role.as_str(), count)));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Co-occurring skills",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        if snapshot.skill_pairs.is_empty() {
            lines.push(Line::from("  no multi-skill postings yet"));
        }
        for pair in snapshot.skill_pairs.iter().take(8) {
            lines.push(Line::from(format!(
                "  {} + {} ({})",
                pair.skill_a, pair.skill_b, pair.co_occurrences
            )));
        }
    } else {
        lines.push(Line::from("Refresh to populate batch metrics"));
    }
    Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(" This batch "))
        .wrap(Wrap { trim: false })
}

fn runs_panel(state: &AppState) -> Paragraph<'_> {
    let mut lines: Vec<Line> = Vec::new();
    if state.runs.is_empty() {
        lines.push(Line::from("No run history yet."));
    } else {
        for day in aggregate_runs_by_day(&state.runs).iter().rev().take(6) {
            lines.push(Line::from(format!(
                "{}  jobs {:>5}  companies {:>4}  remote {:>5.1}%",
                day.date,
                day.jobs_fetched,
                day.unique_companies,
                day.remote_share * 100.0
            )));
        }
    }
    Paragraph::new(Text::from(lines)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Run history (by day) "),
    )
}
