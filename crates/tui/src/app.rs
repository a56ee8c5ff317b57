use std::{
    io,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use wordcards_core::{AppConfig, DeckLoader, DeckWriter, ProgressStore, StudySession};

use crate::prompt::{EditPrompt, PromptField, PromptOutcome, PromptTarget};

const TICK_RATE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

#[derive(Debug)]
enum AppEvent {
    Input(Event),
    Tick,
}

/// A user command decoded from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Retreat,
    Advance,
    ToggleDetail,
    Save,
    First,
    Last,
    CycleGroup,
    Edit,
    NewCard,
    Delete,
    Retry,
    Quit,
}

fn action_for(key: &KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Action::Quit),
            KeyCode::Char('s') => Some(Action::Save),
            _ => None,
        };
    }
    let action = match key.code {
        KeyCode::Char('a') | KeyCode::Char('A') | KeyCode::Left => Action::Retreat,
        KeyCode::Char('d') | KeyCode::Char('D') | KeyCode::Right => Action::Advance,
        KeyCode::Char('f') | KeyCode::Char('F') | KeyCode::Enter => Action::ToggleDetail,
        KeyCode::Char('s') | KeyCode::Char('S') => Action::Save,
        KeyCode::Char('g') | KeyCode::Home => Action::First,
        KeyCode::Char('G') | KeyCode::End => Action::Last,
        KeyCode::Char('t') | KeyCode::Char('T') => Action::CycleGroup,
        KeyCode::Char('e') | KeyCode::Char('E') => Action::Edit,
        KeyCode::Char('n') | KeyCode::Char('N') => Action::NewCard,
        KeyCode::Char('x') | KeyCode::Delete => Action::Delete,
        KeyCode::Char('r') | KeyCode::Char('R') => Action::Retry,
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Action::Quit,
        _ => return None,
    };
    Some(action)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

struct UiState {
    status: String,
    level: StatusLevel,
    should_quit: bool,
    quit_armed: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            status: "Ready".to_string(),
            level: StatusLevel::Info,
            should_quit: false,
            quit_armed: false,
        }
    }
}

impl UiState {
    fn set_status(&mut self, level: StatusLevel, message: impl Into<String>) {
        self.level = level;
        self.status = message.into();
    }
}

/// Terminal flashcard viewer over a single deck.
pub struct WordcardsApp {
    config: AppConfig,
    deck_path: PathBuf,
    loader: DeckLoader,
    writer: DeckWriter,
    progress: Option<ProgressStore>,
    session: Option<StudySession>,
    load_error: Option<String>,
    prompt: Option<EditPrompt>,
    state: UiState,
    theme: Theme,
}

impl WordcardsApp {
    pub fn new(config: AppConfig, deck_path: PathBuf) -> Self {
        let progress = if config.resume_position {
            match ProgressStore::load(ProgressStore::default_path()) {
                Ok(store) => Some(store),
                Err(err) => {
                    warn!("Progress store unavailable: {err:#}");
                    None
                }
            }
        } else {
            None
        };
        Self {
            loader: DeckLoader::new(config.csv.clone()),
            writer: DeckWriter::new(config.csv.clone()),
            config,
            deck_path,
            progress,
            session: None,
            load_error: None,
            prompt: None,
            state: UiState::default(),
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.load_deck();

        let mut screen = Screen::enter()?;
        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_key_reader(event_tx);

        let result = self.event_loop(&mut screen.terminal, &mut event_rx).await;

        drop(screen);
        self.remember_position();
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        event_rx: &mut mpsc::Receiver<AppEvent>,
    ) -> Result<()> {
        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }
            match event_rx.recv().await {
                Some(AppEvent::Input(event)) => self.handle_input(event),
                Some(AppEvent::Tick) => {}
                None => break,
            }
            if self.state.should_quit {
                break;
            }
        }
        Ok(())
    }

    fn load_deck(&mut self) {
        match self.loader.load(&self.deck_path) {
            Ok(deck) => {
                let resume = self
                    .progress
                    .as_ref()
                    .and_then(|store| store.position_for(&self.deck_path));
                let session = match resume {
                    Some(index) => StudySession::resume_at(deck, self.config.layout.clone(), index),
                    None => StudySession::new(deck, self.config.layout.clone()),
                };
                let message = if session.is_empty() {
                    format!("{} has no cards; press n to add one", display_name(&self.deck_path))
                } else {
                    format!(
                        "Loaded {} cards from {}",
                        session.len(),
                        display_name(&self.deck_path)
                    )
                };
                self.state.set_status(StatusLevel::Info, message);
                self.session = Some(session);
                self.load_error = None;
            }
            Err(err) => {
                error!(path = %self.deck_path.display(), "Deck load failed: {err}");
                self.state
                    .set_status(StatusLevel::Error, format!("Could not load deck ({})", err.kind()));
                self.session = None;
                self.load_error = Some(err.to_string());
            }
        }
    }

    fn remember_position(&mut self) {
        let Some(index) = self.session.as_ref().and_then(StudySession::index) else {
            return;
        };
        let Some(store) = self.progress.as_mut() else {
            return;
        };
        store.record(&self.deck_path, index);
        if let Err(err) = store.persist() {
            warn!("Failed to persist progress: {err:#}");
        }
    }

    fn handle_input(&mut self, event: Event) {
        let Event::Key(key) = event else {
            return;
        };
        if key.kind != KeyEventKind::Press {
            return;
        }
        if self.prompt.is_some() {
            self.handle_prompt_key(key);
            return;
        }
        let Some(action) = action_for(&key) else {
            return;
        };
        if action != Action::Quit {
            self.state.quit_armed = false;
        }
        if self.session.is_none() {
            self.handle_error_screen_action(action);
        } else {
            self.apply(action);
        }
    }

    fn handle_error_screen_action(&mut self, action: Action) {
        match action {
            Action::Retry => {
                info!(path = %self.deck_path.display(), "Retrying deck load");
                self.load_deck();
            }
            Action::Quit => self.state.should_quit = true,
            _ => {}
        }
    }

    fn apply(&mut self, action: Action) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match action {
            Action::Retreat => {
                if !session.retreat() && !session.is_empty() {
                    self.state.set_status(StatusLevel::Info, "Already at the first card");
                }
            }
            Action::Advance => {
                if !session.advance() && !session.is_empty() {
                    self.state.set_status(StatusLevel::Info, "Already at the last card");
                }
            }
            Action::First => {
                session.first();
            }
            Action::Last => {
                session.last();
            }
            Action::CycleGroup => {
                if session.layout().group_column.is_none() {
                    self.state
                        .set_status(StatusLevel::Info, "No group column configured");
                    return;
                }
                let scope = match session.cycle_group() {
                    Some(group) => format!("Group {}", group_label(group)),
                    None => "All cards".to_string(),
                };
                self.state.set_status(
                    StatusLevel::Info,
                    format!("{scope} ({} cards)", session.scope_len()),
                );
            }
            Action::ToggleDetail => {
                session.toggle_detail();
            }
            Action::Save => self.save(),
            Action::Edit => self.open_edit_prompt(),
            Action::NewCard => self.open_new_prompt(),
            Action::Delete => {
                if let Some(card) = session.delete_current() {
                    let term = session.layout().term(&card).to_string();
                    self.state
                        .set_status(StatusLevel::Warning, format!("Deleted \"{term}\" (unsaved)"));
                }
            }
            Action::Retry => {}
            Action::Quit => self.request_quit(),
        }
    }

    fn request_quit(&mut self) {
        let dirty = self
            .session
            .as_ref()
            .map(StudySession::is_dirty)
            .unwrap_or(false);
        if dirty && !self.state.quit_armed {
            self.state.quit_armed = true;
            self.state.set_status(
                StatusLevel::Warning,
                "Unsaved changes: press q again to discard them, or s to save",
            );
            return;
        }
        self.state.should_quit = true;
    }

    fn save(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.save(&self.writer) {
            Ok(()) => {
                self.state.set_status(
                    StatusLevel::Success,
                    format!(
                        "Saved {} cards to {}",
                        session.len(),
                        display_name(session.deck().path())
                    ),
                );
            }
            Err(err) => {
                error!("Save failed: {err}");
                self.state
                    .set_status(StatusLevel::Error, format!("Save failed: {err}"));
            }
        }
    }

    fn open_edit_prompt(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let (Some(index), Some(card)) = (session.index(), session.current()) else {
            self.state.set_status(StatusLevel::Info, "No card to edit");
            return;
        };
        let fields = session
            .layout()
            .editable_columns(session.deck().width())
            .into_iter()
            .map(|column| PromptField {
                column,
                label: session.column_label(column),
                value: card.field(column).to_string(),
            })
            .collect();
        self.prompt = Some(EditPrompt::new(PromptTarget::Edit(index), fields));
    }

    fn open_new_prompt(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let layout = session.layout();
        let width = match session.deck().width() {
            0 => (layout.term_column + 1).max(2),
            width => width,
        };
        let fields = layout
            .editable_columns(width)
            .into_iter()
            .map(|column| PromptField {
                column,
                label: session.column_label(column),
                value: String::new(),
            })
            .collect();
        self.prompt = Some(EditPrompt::new(PromptTarget::New, fields));
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        let Some(prompt) = self.prompt.as_mut() else {
            return;
        };
        match prompt.handle_key(key) {
            PromptOutcome::Pending => {}
            PromptOutcome::Cancelled => {
                self.prompt = None;
                self.state.set_status(StatusLevel::Info, "Edit cancelled");
            }
            PromptOutcome::Submitted => {
                if let Some(prompt) = self.prompt.take() {
                    self.submit_prompt(prompt);
                }
            }
        }
    }

    fn submit_prompt(&mut self, prompt: EditPrompt) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let values = prompt.values();
        match prompt.target {
            PromptTarget::Edit(index) => {
                if session.index() != Some(index) {
                    self.state
                        .set_status(StatusLevel::Warning, "Card moved while editing; nothing changed");
                    return;
                }
                let changed = values
                    .into_iter()
                    .filter(|(column, value)| session.edit_current(*column, value.as_str()))
                    .count();
                let message = if changed == 0 {
                    "No changes".to_string()
                } else {
                    format!("Updated {changed} field(s) (unsaved)")
                };
                self.state.set_status(StatusLevel::Info, message);
            }
            PromptTarget::New => {
                let values: Vec<(usize, String)> = values
                    .into_iter()
                    .map(|(column, value)| (column, value.trim().to_string()))
                    .collect();
                let term_column = session.layout().term_column;
                let has_term = values
                    .iter()
                    .any(|(column, value)| *column == term_column && !value.is_empty());
                if !has_term {
                    self.state
                        .set_status(StatusLevel::Warning, "A new card needs a term");
                    return;
                }
                let width = values
                    .iter()
                    .map(|(column, _)| column + 1)
                    .max()
                    .unwrap_or(0)
                    .max(session.deck().width());
                let mut fields = vec![String::new(); width];
                for (column, value) in values {
                    fields[column] = value;
                }
                let index = session.add_card(fields);
                self.state.set_status(
                    StatusLevel::Info,
                    format!("Added card {} (unsaved)", index + 1),
                );
            }
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let size = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .split(size);

        self.render_header(frame, chunks[0]);
        match (&self.session, &self.load_error) {
            (Some(session), _) => self.render_card(frame, chunks[1], session),
            (None, Some(message)) => self.render_load_error(frame, chunks[1], message),
            (None, None) => {}
        }
        self.render_status(frame, chunks[2]);
        self.render_help(frame, chunks[3]);
        if let Some(prompt) = &self.prompt {
            self.render_prompt(frame, prompt);
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![Span::styled(
            display_name(&self.deck_path),
            Style::default()
                .fg(self.theme.accent)
                .add_modifier(Modifier::BOLD),
        )];
        if let Some(session) = &self.session {
            spans.push(Span::raw(format!("  {}", session.position_label())));
            if let Some(group) = session.active_group() {
                spans.push(Span::styled(
                    format!("  [{}]", group_label(group)),
                    Style::default().fg(self.theme.success),
                ));
            }
            if session.is_dirty() {
                spans.push(Span::styled(
                    "  [modified]",
                    Style::default().fg(self.theme.warning),
                ));
            }
        }
        let header = Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL).title("wordcards"));
        frame.render_widget(header, area);
    }

    fn render_card(&self, frame: &mut Frame, area: Rect, session: &StudySession) {
        let block = Block::default().borders(Borders::ALL).title("Card");
        let Some(term) = session.term() else {
            let empty = Paragraph::new(Line::from(Span::styled(
                "(no cards)",
                Style::default().fg(self.theme.muted),
            )))
            .alignment(Alignment::Center)
            .block(block);
            frame.render_widget(empty, area);
            return;
        };

        let inner = block.inner(area);
        frame.render_widget(block, area);
        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(inner);

        let term_lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                term.to_string(),
                Style::default()
                    .fg(self.theme.primary_fg)
                    .add_modifier(Modifier::BOLD),
            )),
        ];
        let term_widget = Paragraph::new(term_lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(term_widget, parts[0]);

        let detail_lines: Vec<Line> = if session.detail_visible() {
            session
                .details()
                .into_iter()
                .map(|(label, value)| {
                    Line::from(vec![
                        Span::styled(format!("{label}: "), Style::default().fg(self.theme.muted)),
                        Span::styled(value.to_string(), Style::default().fg(self.theme.accent)),
                    ])
                })
                .collect()
        } else {
            vec![Line::from(Span::styled(
                "???  (f to reveal)",
                Style::default().fg(self.theme.muted),
            ))]
        };
        let detail_widget = Paragraph::new(detail_lines)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::TOP).title("Detail"))
            .wrap(Wrap { trim: true });
        frame.render_widget(detail_widget, parts[1]);
    }

    fn render_load_error(&self, frame: &mut Frame, area: Rect, message: &str) {
        let lines = vec![
            Line::from(Span::styled(
                "The deck could not be loaded. The file was left untouched.",
                Style::default()
                    .fg(self.theme.danger)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(message.to_string()),
            Line::from(""),
            Line::from(vec![
                Span::styled("r", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" retry  "),
                Span::styled("q", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" quit"),
            ]),
        ];
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Error"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let color = match self.state.level {
            StatusLevel::Info => self.theme.primary_fg,
            StatusLevel::Success => self.theme.success,
            StatusLevel::Warning => self.theme.warning,
            StatusLevel::Error => self.theme.danger,
        };
        let paragraph = Paragraph::new(Line::from(Span::styled(
            self.state.status.clone(),
            Style::default().fg(color),
        )))
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_help(&self, frame: &mut Frame, area: Rect) {
        let text = if self.prompt.is_some() {
            "Enter next/submit • Tab/Shift-Tab switch field • Ctrl-Enter submit • Esc cancel"
        } else if self.session.is_some() {
            "a/← prev • d/→ next • f/Enter detail • t group • s save • e edit • n new • x delete • q quit"
        } else {
            "r retry • q quit"
        };
        let help = Paragraph::new(Line::from(Span::styled(
            text,
            Style::default().fg(self.theme.muted),
        )));
        frame.render_widget(help, area);
    }

    fn render_prompt(&self, frame: &mut Frame, prompt: &EditPrompt) {
        let frame_area = frame.size();
        let width = 64_u16.min(frame_area.width.saturating_sub(4)).max(24);
        let height = (prompt.fields.len() as u16 + 4).min(frame_area.height.saturating_sub(2));
        let area = centered(frame_area, width, height);
        frame.render_widget(Clear, area);

        let label_width = prompt
            .fields
            .iter()
            .map(|field| Span::raw(field.label.as_str()).width())
            .max()
            .unwrap_or(0);
        let lines: Vec<Line> = prompt
            .fields
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                let pad = label_width.saturating_sub(Span::raw(field.label.as_str()).width());
                let label = format!("{}{}: ", field.label, " ".repeat(pad));
                let style = if idx == prompt.active() {
                    Style::default().fg(self.theme.accent)
                } else {
                    Style::default().fg(self.theme.muted)
                };
                Line::from(vec![
                    Span::styled(label, style),
                    Span::raw(field.value.clone()),
                ])
            })
            .collect();
        let title = match prompt.target {
            PromptTarget::Edit(index) => format!("Edit card {}", index + 1),
            PromptTarget::New => "New card".to_string(),
        };
        let paragraph =
            Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(paragraph, area);

        let before_cursor: String = prompt.active_value().chars().take(prompt.cursor()).collect();
        let offset = (label_width + 2 + Span::raw(before_cursor).width()) as u16;
        let cursor_x = (area.x + 1 + offset).min(area.x + area.width.saturating_sub(2));
        let cursor_y = area.y + 1 + prompt.active() as u16;
        frame.set_cursor(cursor_x, cursor_y);
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn group_label(group: &str) -> &str {
    if group.is_empty() {
        "(ungrouped)"
    } else {
        group
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let rows = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .split(area);
    Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .split(rows[0])[0]
}

/// Raw mode plus the alternate screen, undone on drop so an early return or
/// a panic in the event loop still hands back a usable shell.
struct Screen {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl Screen {
    fn enter() -> Result<Self> {
        enable_raw_mode().context("failed to enter raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, Hide)
            .context("failed to enter alternate screen")?;
        let mut terminal =
            Terminal::new(CrosstermBackend::new(stdout)).context("failed to create terminal")?;
        terminal.clear()?;
        Ok(Self { terminal })
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        if let Err(err) = disable_raw_mode() {
            warn!("Failed to leave raw mode: {err}");
        }
        if let Err(err) = execute!(self.terminal.backend_mut(), LeaveAlternateScreen, Show) {
            warn!("Failed to restore the screen: {err}");
        }
    }
}

fn next_event() -> io::Result<AppEvent> {
    if event::poll(TICK_RATE)? {
        event::read().map(AppEvent::Input)
    } else {
        Ok(AppEvent::Tick)
    }
}

// Crossterm reads block, so keys are pumped from a plain thread until the
// receiver goes away.
fn spawn_key_reader(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        let event = match next_event() {
            Ok(event) => event,
            Err(err) => {
                error!("Terminal input failed: {err}");
                break;
            }
        };
        if sender.blocking_send(event).is_err() {
            break;
        }
    });
}
