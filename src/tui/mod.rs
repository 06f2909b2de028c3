//! Ratatui-based terminal UI.
//!
//! Renders every series as Average/High/Low lines over the trailing window and
//! lists them in a legend grouped by series. Selecting a legend entry toggles
//! that line on and off; hidden lines stay hidden across refetches.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use crate::app::pipeline::{RunOutput, run_pipeline};
use crate::chart::{
    Dataset, LegendGroup, LegendState, TimeFrame, build_datasets, group_legend, visible_series,
};
use crate::data::ResultsSource;
use crate::domain::{AlignmentMode, PipelineConfig};
use crate::error::AppError;
use crate::normalize::Clock;

mod plotters_chart;

use plotters_chart::TrendPlottersChart;

/// Front-end settings that do not affect normalization.
#[derive(Debug, Clone, Copy)]
pub struct ChartSettings {
    /// Upper bound of the latency axis (ms).
    pub y_max: f64,
}

/// Start the TUI.
pub fn run(
    source: Box<dyn ResultsSource>,
    config: PipelineConfig,
    clock: Box<dyn Clock>,
    settings: ChartSettings,
) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::data(format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(source, config, clock, settings);
    app.refresh();
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::data(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::data(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// One legend row: a group header or a dataset entry.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LegendRow {
    Header(String),
    Entry(usize),
}

fn legend_rows(groups: &[LegendGroup]) -> Vec<LegendRow> {
    let mut rows = Vec::new();
    for group in groups {
        rows.push(LegendRow::Header(group.name.clone()));
        rows.extend(group.entries.iter().map(|&i| LegendRow::Entry(i)));
    }
    rows
}

struct App {
    source: Box<dyn ResultsSource>,
    config: PipelineConfig,
    clock: Box<dyn Clock>,
    settings: ChartSettings,
    run: Option<RunOutput>,
    datasets: Vec<Dataset>,
    rows: Vec<LegendRow>,
    /// Index into `rows`; always points at an `Entry` when any exist.
    selected_row: usize,
    legend: LegendState,
    status: String,
}

impl App {
    fn new(
        source: Box<dyn ResultsSource>,
        config: PipelineConfig,
        clock: Box<dyn Clock>,
        settings: ChartSettings,
    ) -> Self {
        Self {
            source,
            config,
            clock,
            settings,
            run: None,
            datasets: Vec::new(),
            rows: Vec::new(),
            selected_row: 0,
            legend: LegendState::default(),
            status: "Fetching results...".to_string(),
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::data(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::data(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::data(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the app should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_selected(),
            KeyCode::Char('a') => {
                self.legend.show_all();
                self.status = "All lines shown.".to_string();
            }
            KeyCode::Char('r') => self.refresh(),
            _ => {}
        }
        false
    }

    fn refresh(&mut self) {
        self.status = "Fetching results...".to_string();
        match run_pipeline(self.source.as_ref(), &self.config, self.clock.as_ref()) {
            Ok(run) => {
                self.datasets = build_datasets(&run.series);
                self.rows = legend_rows(&group_legend(&self.datasets));
                self.selected_row = self.first_entry_row().unwrap_or(0);
                self.status = format!(
                    "{} series from {} records (through {})",
                    run.series.len(),
                    run.record_count,
                    run.today
                );
                self.run = Some(run);
            }
            Err(err) => {
                tracing::warn!(error = %err, "refresh failed");
                self.run = None;
                self.datasets.clear();
                self.rows.clear();
                self.selected_row = 0;
                self.status = err.to_string();
            }
        }
    }

    fn first_entry_row(&self) -> Option<usize> {
        self.rows.iter().position(|r| matches!(r, LegendRow::Entry(_)))
    }

    /// Step to the next/previous entry row, skipping group headers.
    fn move_selection(&mut self, delta: isize) {
        let mut idx = self.selected_row as isize;
        loop {
            idx += delta;
            if idx < 0 || idx as usize >= self.rows.len() {
                return;
            }
            if matches!(self.rows[idx as usize], LegendRow::Entry(_)) {
                self.selected_row = idx as usize;
                return;
            }
        }
    }

    fn toggle_selected(&mut self) {
        let Some(LegendRow::Entry(i)) = self.rows.get(self.selected_row) else {
            return;
        };
        let Some(dataset) = self.datasets.get(*i) else {
            return;
        };
        let hidden = self.legend.toggle(&dataset.label);
        self.status = format!("{} {}", dataset.label, if hidden { "hidden" } else { "shown" });
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mode = match self.config.alignment {
            AlignmentMode::Fill => "fill",
            AlignmentMode::Filter => "filter",
        };
        let through = self
            .run
            .as_ref()
            .map(|r| r.today.to_string())
            .unwrap_or_else(|| "-".to_string());

        let lines = vec![
            Line::from(vec![
                Span::styled("perf-trends", Style::default().fg(Color::Cyan)),
                Span::raw(" - performance test latency"),
            ]),
            Line::from(Span::styled(
                format!(
                    "window: {}d through {through} | mode: {mode} | precision: {:?} | hidden: {}",
                    self.config.window_days,
                    self.config.precision,
                    self.legend.hidden_count(),
                ),
                Style::default().fg(Color::Gray),
            )),
        ];

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(34)])
            .split(area);

        self.draw_chart(frame, chunks[0]);
        self.draw_legend(frame, chunks[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Results").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(run) = &self.run else {
            let msg = Paragraph::new("No data to display.")
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default());
            frame.render_widget(msg, inner);
            return;
        };

        let time_frame = TimeFrame::trailing(run.today, self.config.window_days);
        let series = visible_series(&self.datasets, &self.legend, &time_frame);
        let widget = TrendPlottersChart {
            series: &series,
            frame: time_frame,
            y_bounds: [0.0, self.settings.y_max],
            x_label: "Date",
            y_label: "Milliseconds",
        };
        frame.render_widget(widget, inner);
    }

    fn draw_legend(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let items: Vec<ListItem> = self
            .rows
            .iter()
            .map(|row| match row {
                LegendRow::Header(name) => ListItem::new(Line::from(Span::styled(
                    name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ))),
                LegendRow::Entry(i) => self.legend_entry(*i),
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Legend").borders(Borders::ALL))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        if !self.rows.is_empty() {
            state.select(Some(self.selected_row));
        }
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn legend_entry(&self, index: usize) -> ListItem<'static> {
        let Some(dataset) = self.datasets.get(index) else {
            return ListItem::new("");
        };
        let swatch = Color::Rgb(dataset.color.0, dataset.color.1, dataset.color.2);
        let mut label_style = Style::default();
        if self.legend.is_hidden(&dataset.label) {
            label_style = label_style
                .fg(Color::DarkGray)
                .add_modifier(Modifier::CROSSED_OUT);
        }
        ListItem::new(Line::from(vec![
            Span::raw("  "),
            Span::styled("■ ", Style::default().fg(swatch)),
            Span::styled(dataset.label.clone(), label_style),
        ]))
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  Space toggle  a show all  r refetch  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::RawRecord;
    use crate::normalize::FixedClock;

    struct StaticSource(Vec<RawRecord>);

    impl ResultsSource for StaticSource {
        fn list_manifest(&self) -> Result<Vec<String>, AppError> {
            Ok(vec!["all.json".to_string()])
        }

        fn fetch_one(&self, _file: &str) -> Result<Vec<RawRecord>, AppError> {
            Ok(self.0.clone())
        }
    }

    struct DownSource;

    impl ResultsSource for DownSource {
        fn list_manifest(&self) -> Result<Vec<String>, AppError> {
            Err(AppError::data("HTTP 503"))
        }

        fn fetch_one(&self, _file: &str) -> Result<Vec<RawRecord>, AppError> {
            unreachable!()
        }
    }

    fn record(filename: &str) -> RawRecord {
        RawRecord {
            filename: filename.to_string(),
            formatted_date: "1:00_pm_9_8_2024".to_string(),
            average: Some(100.0),
            high: Some(200.0),
            low: Some(50.0),
            errors: Vec::new(),
        }
    }

    fn app(source: Box<dyn ResultsSource>) -> App {
        App::new(
            source,
            PipelineConfig::default(),
            Box::new(FixedClock(NaiveDate::from_ymd_opt(2024, 8, 10).unwrap())),
            ChartSettings { y_max: 6000.0 },
        )
    }

    #[test]
    fn legend_rows_interleave_headers_and_entries() {
        let mut app = app(Box::new(StaticSource(vec![record("login"), record("checkout")])));
        app.refresh();
        assert_eq!(app.rows.len(), 8);
        assert_eq!(app.rows[0], LegendRow::Header("login".to_string()));
        assert_eq!(app.rows[4], LegendRow::Header("checkout".to_string()));
        assert_eq!(app.selected_row, 1);
    }

    #[test]
    fn selection_skips_headers() {
        let mut app = app(Box::new(StaticSource(vec![record("login"), record("checkout")])));
        app.refresh();
        app.move_selection(1);
        app.move_selection(1);
        assert_eq!(app.selected_row, 3);
        app.move_selection(1);
        assert_eq!(app.selected_row, 5);
        app.move_selection(-1);
        assert_eq!(app.selected_row, 3);
        app.move_selection(-1);
        app.move_selection(-1);
        app.move_selection(-1);
        assert_eq!(app.selected_row, 1);
    }

    #[test]
    fn toggled_lines_stay_hidden_after_refresh() {
        let mut app = app(Box::new(StaticSource(vec![record("login")])));
        app.refresh();
        app.move_selection(1);
        assert!(!app.handle_key(KeyCode::Char(' ')));
        assert!(app.legend.is_hidden("login High"));

        app.refresh();
        assert!(app.legend.is_hidden("login High"));

        app.handle_key(KeyCode::Char('a'));
        assert_eq!(app.legend.hidden_count(), 0);
    }

    #[test]
    fn failed_refresh_clears_the_chart() {
        let mut app = app(Box::new(DownSource));
        app.refresh();
        assert!(app.run.is_none());
        assert!(app.rows.is_empty());
        app.toggle_selected();
        assert!(app.handle_key(KeyCode::Char('q')));
    }
}
