//! Ratatui-based shape editor.
//!
//! One feature is shown at a time: baseline and edited curves, the knots with
//! the current selection, and each sample's contribution as a scatter. Edits
//! go through the [`EditSession`]; predictions arrive from its background
//! worker and update the footer metrics.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};

use crate::app::pipeline::{LoadedModel, open_session, save_history};
use crate::domain::{EditorConfig, MonotoneDirection};
use crate::error::AppError;
use crate::io::write_model_json;
use crate::math::{finite_min_max, pad_range};
use crate::report::compute_metrics;
use crate::report::format::fmt_metrics;
use crate::session::{EditOp, EditSession};

mod plotters_chart;

use plotters_chart::ShapeChart;

/// Simulated time per smoothing tick and ticks per `s` press.
const SMOOTH_DT: f64 = 1.0 / 30.0;
const SMOOTH_TICKS: usize = 6;

/// Drag step as a fraction of the feature's y-span.
const DRAG_STEP_FRAC: f64 = 0.05;

/// Start the editor.
pub fn run(
    loaded: LoadedModel,
    config: EditorConfig,
    history_dir: Option<PathBuf>,
    output: PathBuf,
) -> Result<(), AppError> {
    let session = open_session(&loaded, &config, history_dir.as_deref(), true)?;
    let mut app = App::new(session, loaded, history_dir, output);

    {
        let _guard = TerminalGuard::new()?;
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)
            .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;
        app.event_loop(&mut terminal)?;
    }

    app.finish()
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
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

struct App {
    session: EditSession,
    loaded: LoadedModel,
    history_dir: Option<PathBuf>,
    output: PathBuf,
    /// Knot index under the keyboard cursor.
    cursor: usize,
    /// Raw drag falloff radius (knot indices).
    radius: f64,
    status: String,
}

impl App {
    fn new(session: EditSession, loaded: LoadedModel, history_dir: Option<PathBuf>, output: PathBuf) -> Self {
        let status = format!("{} history entries", session.history().len());
        Self {
            session,
            loaded,
            history_dir,
            output,
            cursor: 0,
            radius: 2.0,
            status,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if self.session.poll_prediction() {
                needs_redraw = true;
            }
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key) {
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

    /// Save cached history after the terminal is restored.
    fn finish(self) -> Result<(), AppError> {
        if let Some(dir) = &self.history_dir {
            save_history(&self.session, &self.loaded, dir)?;
        }
        Ok(())
    }

    /// Returns `true` when the editor should quit. Edit failures only update
    /// the status line.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        let result = match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Left => self.move_cursor(-1, shift),
            KeyCode::Right => self.move_cursor(1, shift),
            KeyCode::Char(' ') => self
                .session
                .click(self.cursor, true)
                .map(|_| "Toggled knot.".to_string()),
            KeyCode::Esc | KeyCode::Char('c') => self
                .session
                .clear_selection()
                .map(|_| "Selection cleared.".to_string()),
            KeyCode::Tab => self.next_feature(),
            KeyCode::Up => self.nudge(1.0, shift),
            KeyCode::Down => self.nudge(-1.0, shift),
            KeyCode::Char('[') => {
                self.radius = (self.radius - 1.0).max(0.0);
                Ok(format!("Drag radius {:.0}", self.radius))
            }
            KeyCode::Char(']') => {
                self.radius = (self.radius + 1.0).min(self.session.config().drag_max_radius);
                Ok(format!("Drag radius {:.0}", self.radius))
            }
            KeyCode::Char('a') => self.apply(EditOp::Align),
            KeyCode::Char('i') => self.apply(EditOp::Interpolate),
            KeyCode::Char('z') => self.apply(EditOp::Zero),
            KeyCode::Char('>') => self.apply(EditOp::Monotonic(MonotoneDirection::Increasing)),
            KeyCode::Char('<') => self.apply(EditOp::Monotonic(MonotoneDirection::Decreasing)),
            KeyCode::Char('m') => self.apply(EditOp::InsertMidpoints),
            KeyCode::Char('s') => self.smooth(),
            KeyCode::Char('u') => self.session.undo().map(|k| match k {
                Some(key) => format!("Undid edit on '{key}'."),
                None => "Nothing to undo.".to_string(),
            }),
            KeyCode::Char('r') => self.session.redo().map(|k| match k {
                Some(key) => format!("Redid edit on '{key}'."),
                None => "Nothing to redo.".to_string(),
            }),
            KeyCode::Char('x') => self.delete_last_applied(),
            KeyCode::Char('w') => self.write_model(),
            _ => return false,
        };

        self.status = match result {
            Ok(msg) => msg,
            Err(err) => err.to_string(),
        };
        self.clamp_cursor();
        false
    }

    fn active_len(&self) -> usize {
        self.session
            .active_feature()
            .and_then(|f| self.session.state(&f.key))
            .map_or(0, |s| s.working().len())
    }

    fn clamp_cursor(&mut self) {
        let len = self.active_len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    fn move_cursor(&mut self, step: isize, extend: bool) -> Result<String, AppError> {
        let len = self.active_len();
        if len == 0 {
            return Ok("Feature has no knots.".to_string());
        }
        self.cursor = self.cursor.saturating_add_signed(step).min(len - 1);
        if extend {
            self.session.click(self.cursor, true)?;
        }
        Ok(format!("Knot {}", self.cursor))
    }

    fn next_feature(&mut self) -> Result<String, AppError> {
        self.session.next_feature()?;
        self.cursor = 0;
        Ok(self
            .session
            .active_feature()
            .map(|f| format!("Feature: {}", f.display_label()))
            .unwrap_or_default())
    }

    /// One keypress is one complete drag gesture.
    fn nudge(&mut self, sign: f64, multi: bool) -> Result<String, AppError> {
        if self.active_len() == 0 {
            return Ok("Feature has no knots.".to_string());
        }
        let step = sign * self.drag_step();
        let pointer = self.cursor as f64;
        self.session.begin_drag(self.cursor, multi, self.radius, pointer)?;
        self.session.update_drag(step, pointer)?;
        let changed = self.session.end_drag()?;
        Ok(if changed {
            format!("Dragged knot {} by {step:+.4}", self.cursor)
        } else {
            "Drag left the curve unchanged.".to_string()
        })
    }

    fn drag_step(&self) -> f64 {
        let span = self
            .session
            .active_feature()
            .and_then(|f| self.session.state(&f.key))
            .and_then(|s| s.baseline().y_range())
            .map_or(0.0, |(lo, hi)| hi - lo);
        if span > 0.0 { span * DRAG_STEP_FRAC } else { 0.1 }
    }

    fn smooth(&mut self) -> Result<String, AppError> {
        let Some(center) = self
            .session
            .active_feature()
            .and_then(|f| self.session.state(&f.key))
            .and_then(|s| s.working().x.get(self.cursor).copied())
        else {
            return Ok("Feature has no knots.".to_string());
        };
        self.session.begin_smooth(center, 0.5, 2.0)?;
        for _ in 0..SMOOTH_TICKS {
            self.session.step_smooth(SMOOTH_DT)?;
        }
        let changed = self.session.end_smooth()?;
        Ok(if changed { "Smoothed.".to_string() } else { "Smoothing changed nothing.".to_string() })
    }

    fn apply(&mut self, op: EditOp) -> Result<String, AppError> {
        let name = op.action().display_name();
        Ok(if self.session.apply(op)? {
            format!("{name} applied.")
        } else {
            format!("{name}: nothing to change.")
        })
    }

    fn delete_last_applied(&mut self) -> Result<String, AppError> {
        let cursor = self.session.history().cursor();
        if cursor == 0 {
            return Ok("No applied history entry to delete.".to_string());
        }
        self.session.delete_entry(cursor - 1)?;
        Ok(format!("Deleted history entry {}.", cursor - 1))
    }

    fn write_model(&mut self) -> Result<String, AppError> {
        write_model_json(&self.output, &self.session.edited_model())?;
        Ok(format!("Wrote {}", self.output.display()))
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
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("shapes", Style::default().fg(Color::Cyan)),
            Span::raw(format!(" | {}", self.loaded.source)),
        ]));

        let feature = self.session.active_feature();
        let label = feature.map_or("-", |f| f.display_label());
        let kind = match feature {
            Some(f) if f.is_categorical() => "categorical",
            Some(_) => "continuous",
            None => "-",
        };
        let selected = feature
            .and_then(|f| self.session.selection(&f.key))
            .map_or(0, |s| s.len());
        lines.push(Line::from(Span::styled(
            format!(
                "feature {}/{}: {label} ({kind}) | knot {} | selected {selected} | radius {:.0}",
                self.session.active_index() + 1,
                self.session.features().len(),
                self.cursor,
                self.radius,
            ),
            Style::default().fg(Color::Gray),
        )));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(36)])
            .split(area);

        self.draw_chart(frame, chunks[0]);
        self.draw_history(frame, chunks[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Shape function").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(series) = chart_series(&self.session, self.cursor) else {
            let msg = Paragraph::new("No feature to show.").style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        let (chart_rect, insets) = chart_layout(inner);
        let widget = ShapeChart {
            baseline: &series.baseline,
            edited: &series.edited,
            scatter: &series.scatter,
            knots: &series.edited,
            selected: &series.selected,
            cursor: series.cursor,
            x_bounds: series.x_bounds,
            y_bounds: series.y_bounds,
            x_label: &series.x_label,
            fmt_x: fmt_axis,
            fmt_y: fmt_axis,
        };

        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, series.x_bounds, series.y_bounds);
        }
    }

    fn draw_history(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let ledger = self.session.history();
        let items: Vec<ListItem> = ledger
            .entries()
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let style = if i < ledger.cursor() {
                    Style::default()
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                ListItem::new(format!(
                    "{i:>3} {} {}",
                    entry.action.display_name(),
                    entry.feature_key
                ))
                .style(style)
            })
            .collect();

        let title = format!("History ({}/{})", ledger.cursor(), ledger.len());
        let list = List::new(items)
            .block(Block::default().title(title).borders(Borders::ALL))
            .highlight_style(Style::default().add_modifier(Modifier::BOLD))
            .highlight_symbol("» ");

        let mut state = ratatui::widgets::ListState::default();
        state.select(ledger.cursor().checked_sub(1));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let metrics = self.session.latest_prediction().map_or_else(
            || "predicting...".to_string(),
            |report| {
                let model = self.session.model();
                let m = compute_metrics(model.task, &model.y, &report.edited_model.preds);
                fmt_metrics(&m)
            },
        );
        let help = "←/→ knot  space select  tab feature  ↑/↓ drag  a i z < > m s edit  u/r undo/redo  x delete  w write  q quit";
        let line = Line::from(vec![
            Span::styled(metrics, Style::default().fg(Color::Cyan)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
            Span::raw(" | "),
            Span::styled(help, Style::default().fg(Color::Gray)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Everything the chart draws for the active feature.
#[derive(Debug, Clone, PartialEq)]
struct ChartSeries {
    baseline: Vec<(f64, f64)>,
    edited: Vec<(f64, f64)>,
    selected: Vec<(f64, f64)>,
    scatter: Vec<(f64, f64)>,
    cursor: Option<(f64, f64)>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    x_label: String,
}

/// Build chart series for Plotters.
///
/// Categorical samples sit at their category ordinal; the scatter comes from
/// the latest edited prediction, when there is one.
fn chart_series(session: &EditSession, cursor: usize) -> Option<ChartSeries> {
    let feature = session.active_feature()?;
    let state = session.state(&feature.key)?;

    let baseline: Vec<(f64, f64)> = state.baseline().points().collect();
    let edited: Vec<(f64, f64)> = state.working().points().collect();
    let selected: Vec<(f64, f64)> = session
        .selection(&feature.key)
        .map(|s| s.indices().into_iter().filter_map(|i| edited.get(i).copied()).collect())
        .unwrap_or_default();

    let contribs = session
        .latest_prediction()
        .and_then(|r| r.edited_model.contribs.get(session.active_index()));
    let scatter: Vec<(f64, f64)> = match contribs {
        Some(contribs) => feature
            .scatter_x
            .iter()
            .zip(contribs)
            .filter_map(|(v, &c)| {
                let x = match &feature.categories {
                    Some(categories) => v.category_ordinal(categories)? as f64,
                    None => v.as_number(),
                };
                (x.is_finite() && c.is_finite()).then_some((x, c))
            })
            .collect(),
        None => Vec::new(),
    };

    let xs: Vec<f64> = baseline.iter().chain(&edited).chain(&scatter).map(|p| p.0).collect();
    let ys: Vec<f64> = baseline.iter().chain(&edited).chain(&scatter).map(|p| p.1).collect();
    let x_bounds = match (feature.is_categorical(), finite_min_max(&xs)) {
        (true, Some((lo, hi))) => (lo - 0.5, hi + 0.5),
        (false, Some((lo, hi))) => pad_range(lo, hi, 0.02),
        (_, None) => (0.0, 1.0),
    };
    let y_bounds = match finite_min_max(&ys) {
        Some((lo, hi)) => pad_range(lo, hi, 0.05),
        None => (-1.0, 1.0),
    };

    Some(ChartSeries {
        cursor: edited.get(cursor).copied(),
        baseline,
        edited,
        selected,
        scatter,
        x_bounds: [x_bounds.0, x_bounds.1],
        y_bounds: [y_bounds.0, y_bounds.1],
        x_label: feature.display_label().to_string(),
    })
}

fn fmt_axis(v: f64) -> String {
    format!("{v:.2}")
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10 || inner.height <= insets.top + insets.bottom + 5 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = format!("{x_val:.1}");
        let label_len = label.len() as u16;
        let start = x.saturating_sub((label.len() / 2) as u16);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = format!("{y_val:.2}");
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label.len() as u16);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new("feature value")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SampleSpec, generate_model};

    fn app() -> App {
        let spec = SampleSpec {
            rows: 40,
            ..SampleSpec::default()
        };
        let loaded = LoadedModel {
            model: generate_model(&spec).unwrap(),
            source: "test".to_string(),
        };
        let session = EditSession::open_detached(loaded.model.clone(), EditorConfig::default()).unwrap();
        App::new(session, loaded, None, PathBuf::from("unused.json"))
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn arrow_drag_records_one_entry_per_press() {
        let mut app = app();
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Up);
        press(&mut app, KeyCode::Up);
        assert_eq!(app.session.history().len(), 2);
        assert!(!app.session.gesture_active());

        press(&mut app, KeyCode::Char('u'));
        assert_eq!(app.session.history().cursor(), 1);
        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.session.history().len(), 1);
        assert_eq!(app.session.history().cursor(), 0);
    }

    #[test]
    fn rejected_edit_only_sets_status() {
        let mut app = app();
        // The first sample feature is continuous; zero is categorical-only.
        app.session.select(&[0, 1]).unwrap();
        assert!(!press(&mut app, KeyCode::Char('z')));
        assert!(app.session.history().is_empty());
        assert!(app.status.contains("categorical"));
    }

    #[test]
    fn quit_key_stops_loop() {
        let mut app = app();
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn cursor_stays_on_curve() {
        let mut app = app();
        press(&mut app, KeyCode::Left);
        assert_eq!(app.cursor, 0);
        for _ in 0..100 {
            press(&mut app, KeyCode::Right);
        }
        assert_eq!(app.cursor, app.active_len() - 1);
    }

    #[test]
    fn chart_series_places_scatter_after_prediction() {
        let mut app = app();
        assert!(chart_series(&app.session, 0).unwrap().scatter.is_empty());

        app.session.recompute_now();
        let series = chart_series(&app.session, 0).unwrap();
        assert!(!series.scatter.is_empty());
        assert!(series.x_bounds[0] < series.x_bounds[1]);
        assert!(series.y_bounds[0] < series.y_bounds[1]);
        assert_eq!(series.cursor, series.edited.first().copied());
    }
}
