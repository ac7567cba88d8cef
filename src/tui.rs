use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;
use std::time::{Duration, Instant};

use crate::api::{JobSource, SuggestField, SuggestionSource};
use crate::db::Database;
use crate::models::JobResult;
use crate::params::category_label;
use crate::search::SearchController;
use crate::suggest;

// A keystroke only fires a suggestion fetch once the field has been idle
// this long; every new keystroke supersedes the pending fetch.
const SUGGEST_DEBOUNCE: Duration = Duration::from_millis(200);
const SUGGEST_LIMIT: usize = 8;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Focus {
    Query,
    Location,
    Results,
}

struct AppState {
    query: String,
    location: String,
    focus: Focus,
    selected: usize,
    suggestions: Vec<String>,
    last_edit: Option<Instant>,
    status_line: String,
}

impl AppState {
    fn new(query: &str, location: &str) -> Self {
        Self {
            query: query.to_string(),
            location: location.to_string(),
            focus: Focus::Query,
            selected: 0,
            suggestions: Vec::new(),
            last_edit: None,
            status_line: String::new(),
        }
    }

    fn active_input_mut(&mut self) -> Option<&mut String> {
        match self.focus {
            Focus::Query => Some(&mut self.query),
            Focus::Location => Some(&mut self.location),
            Focus::Results => None,
        }
    }
}

pub fn run_search<S, C>(
    db: &Database,
    controller: &mut SearchController<S>,
    completions: &C,
    initial_query: &str,
    initial_location: &str,
) -> Result<()>
where
    S: JobSource,
    C: SuggestionSource,
{
    let mut state = AppState::new(initial_query, initial_location);

    if !initial_query.trim().is_empty() && !initial_location.trim().is_empty() {
        match controller.start_search(initial_query, initial_location) {
            Ok(true) => state.focus = Focus::Results,
            Ok(false) => {}
            Err(e) => state.status_line = format!("Search failed: {}", e),
        }
    }

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, controller, completions, db);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop<S, C>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    controller: &mut SearchController<S>,
    completions: &C,
    db: &Database,
) -> Result<()>
where
    S: JobSource,
    C: SuggestionSource,
{
    loop {
        terminal.draw(|frame| draw(frame, state, controller))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match state.focus {
                    Focus::Query | Focus::Location => match key.code {
                        KeyCode::Esc => break,
                        KeyCode::Tab => {
                            state.focus = if state.focus == Focus::Query {
                                Focus::Location
                            } else {
                                Focus::Query
                            };
                            state.suggestions.clear();
                            state.last_edit = None;
                        }
                        KeyCode::Enter => {
                            match controller.start_search(&state.query, &state.location) {
                                Ok(true) => {
                                    state.focus = Focus::Results;
                                    state.selected = 0;
                                    state.suggestions.clear();
                                    state.last_edit = None;
                                    state.status_line.clear();
                                }
                                Ok(false) => {
                                    state.status_line =
                                        "Enter both a search term and a location".to_string();
                                }
                                Err(e) => state.status_line = format!("Search failed: {}", e),
                            }
                        }
                        KeyCode::Backspace => {
                            if let Some(input) = state.active_input_mut() {
                                input.pop();
                            }
                            state.last_edit = Some(Instant::now());
                        }
                        KeyCode::Char(c) => {
                            if let Some(input) = state.active_input_mut() {
                                input.push(c);
                            }
                            state.last_edit = Some(Instant::now());
                        }
                        _ => {}
                    },
                    Focus::Results => {
                        let visible = controller
                            .session()
                            .map(|s| s.current_slice().len())
                            .unwrap_or(0);
                        match key.code {
                            KeyCode::Char('q') | KeyCode::Esc => break,
                            KeyCode::Char('e') => {
                                state.focus = Focus::Query;
                                state.status_line.clear();
                            }
                            KeyCode::Down | KeyCode::Char('j') => {
                                if visible > 0 && state.selected < visible - 1 {
                                    state.selected += 1;
                                }
                            }
                            KeyCode::Up | KeyCode::Char('k') => {
                                state.selected = state.selected.saturating_sub(1);
                            }
                            KeyCode::Char('n') | KeyCode::Right => match controller.next_page() {
                                Ok(true) => {
                                    state.selected = 0;
                                    state.status_line.clear();
                                }
                                Ok(false) => state.status_line = "Already on the last page".to_string(),
                                // State is untouched on a failed fetch; the
                                // same keypress retries.
                                Err(e) => state.status_line = format!("Failed to load page: {}", e),
                            },
                            KeyCode::Char('p') | KeyCode::Left => {
                                if controller.previous_page() {
                                    state.selected = 0;
                                    state.status_line.clear();
                                }
                            }
                            KeyCode::Char('s') => {
                                let picked = controller
                                    .session()
                                    .and_then(|s| s.current_slice().get(state.selected))
                                    .cloned();
                                if let Some(result) = picked {
                                    state.status_line = match save_result(db, &result) {
                                        Ok(message) => message,
                                        Err(e) => format!("Save failed: {}", e),
                                    };
                                }
                            }
                            _ => {}
                        }
                    }
                }
            }
        }

        // Debounced autocomplete: fetch only once the field has gone idle.
        let due = state
            .last_edit
            .is_some_and(|edited| edited.elapsed() >= SUGGEST_DEBOUNCE);
        if due {
            state.last_edit = None;
            refresh_suggestions(state, completions);
        }
    }
    Ok(())
}

fn refresh_suggestions<C: SuggestionSource>(state: &mut AppState, completions: &C) {
    let (field, partial) = match state.focus {
        Focus::Query => (SuggestField::Occupation, state.query.clone()),
        Focus::Location => (SuggestField::Location, state.location.clone()),
        Focus::Results => return,
    };
    if partial.trim().is_empty() {
        state.suggestions.clear();
        return;
    }
    // Endpoint failures degrade to "no suggestions" and never block input.
    let candidates = completions.complete(field, &partial).unwrap_or_default();
    state.suggestions = suggest::rank(&candidates, &partial, SUGGEST_LIMIT);
}

fn save_result(db: &Database, result: &JobResult) -> Result<String> {
    if let Some(existing) =
        db.find_duplicate(&result.employer, &result.title, result.link.as_deref())?
    {
        return Ok(format!("Already tracked as application #{}", existing));
    }
    let id = db.save_search_result(result)?;
    Ok(format!("Saved as application #{}", id))
}

fn draw<S: JobSource>(frame: &mut Frame, state: &AppState, controller: &SearchController<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    draw_inputs(frame, state, chunks[0]);

    match state.focus {
        Focus::Results => draw_results(frame, state, controller, chunks[1]),
        _ => draw_suggestions(frame, state, chunks[1]),
    }

    let help = match state.focus {
        Focus::Results => "j/k:select  n/p:page  s:save  e:edit search  q:quit",
        _ => "type to search  Tab:switch field  Enter:search  Esc:quit",
    };
    let footer = if state.status_line.is_empty() {
        format!(" {}", help)
    } else {
        format!(" {}  |  {}", state.status_line, help)
    };
    frame.render_widget(
        Paragraph::new(footer).style(Style::default().fg(Color::DarkGray)),
        chunks[2],
    );
}

fn draw_inputs(frame: &mut Frame, state: &AppState, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let field_style = |focused: bool| {
        if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        }
    };

    let query = Paragraph::new(state.query.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Search ")
            .border_style(field_style(state.focus == Focus::Query)),
    );
    frame.render_widget(query, halves[0]);

    let location = Paragraph::new(state.location.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Location ")
            .border_style(field_style(state.focus == Focus::Location)),
    );
    frame.render_widget(location, halves[1]);
}

fn draw_suggestions(frame: &mut Frame, state: &AppState, area: Rect) {
    let items: Vec<ListItem> = state
        .suggestions
        .iter()
        .map(|s| ListItem::new(s.as_str()))
        .collect();

    let title = match state.focus {
        Focus::Location => " Locations ",
        _ => " Occupations ",
    };
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(list, area);
}

fn draw_results<S: JobSource>(
    frame: &mut Frame,
    state: &AppState,
    controller: &SearchController<S>,
    area: Rect,
) {
    let Some(session) = controller.session() else {
        frame.render_widget(
            Paragraph::new("No search yet.").block(Block::default().borders(Borders::ALL)),
            area,
        );
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let slice = session.current_slice();
    let items: Vec<ListItem> = slice
        .iter()
        .map(|result| {
            let employer = if result.employer.is_empty() {
                "?"
            } else {
                result.employer.as_str()
            };
            ListItem::new(format!(
                "{} | {}",
                truncate(&result.title, 34),
                truncate(employer, 20)
            ))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Results {} | page {} of {} ",
            session.result_count(),
            session.page(),
            session.page_count()
        )))
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut list_state = ListState::default();
    if !slice.is_empty() {
        list_state.select(Some(state.selected.min(slice.len() - 1)));
    }
    frame.render_stateful_widget(list, chunks[0], &mut list_state);

    let detail = build_detail(slice.get(state.selected));
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false });
    frame.render_widget(detail_widget, chunks[1]);
}

fn build_detail(result: Option<&JobResult>) -> Text<'_> {
    let Some(result) = result else {
        return Text::raw("No results on this page.");
    };

    let mut lines: Vec<Line> = Vec::new();

    for line in textwrap::fill(&result.title, 60).lines() {
        lines.push(Line::from(Span::styled(
            line.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
    }

    if !result.employer.is_empty() {
        lines.push(Line::from(format!("at {}", result.employer)));
    }

    let mut place = result.location.clone();
    if let Some(km) = result.distance_km {
        place.push_str(&format!(" ({:.0} km)", km));
    }
    if !place.is_empty() {
        lines.push(Line::from(place));
    }

    lines.push(Line::from(""));

    if let Some(category) = &result.offer_category {
        lines.push(Line::from(format!("Type:  {}", category_label(category))));
    }
    lines.push(Line::from(format!("Start: {}", result.start_date_display())));
    if let Some(id) = &result.external_id {
        lines.push(Line::from(format!("Ref:   {}", id)));
    }
    if let Some(link) = &result.link {
        lines.push(Line::from(""));
        for line in textwrap::fill(link, 60).lines() {
            lines.push(Line::from(Span::styled(
                line.to_string(),
                Style::default().fg(Color::Blue),
            )));
        }
    }

    Text::from(lines)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
