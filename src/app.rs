use chrono::Local;
use crossterm::event::{KeyCode, KeyModifiers};
use tracing::{error, info, warn};
use tui_textarea::{Input, Key};

use crate::session::{Phase, SessionController, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Scripts,
    Recent,
    Favorites,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearTarget {
    Recent,
    Favorites,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    Confirm(ClearTarget),
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Error,
    Warning,
}

const MAX_LOG_ENTRIES: usize = 100;

pub struct App {
    pub controller: SessionController,
    pub server: String,
    pub pane: Pane,
    pub selected_script: usize,
    pub selected_recent: usize,
    pub selected_favorite: usize,
    pub input_mode: InputMode,
    pub search_buffer: String,
    pub logs: Vec<LogEntry>,
    pub show_help: bool,
}

impl App {
    pub fn new(mut controller: SessionController, server: impl Into<String>) -> Self {
        controller
            .favorites_mut()
            .subscribe(|entries| info!(count = entries.len(), "Favorites changed"));
        controller
            .recent_mut()
            .subscribe(|entries| info!(count = entries.len(), "Recent scripts changed"));

        let mut app = Self {
            controller,
            server: server.into(),
            pane: Pane::Scripts,
            selected_script: 0,
            selected_recent: 0,
            selected_favorite: 0,
            input_mode: InputMode::Normal,
            search_buffer: String::new(),
            logs: Vec::new(),
            show_help: false,
        };
        app.add_log(LogLevel::Info, format!("Connecting to {}", app.server));
        app
    }

    pub fn add_log(&mut self, level: LogLevel, message: String) {
        match level {
            LogLevel::Error => error!(target: "tymbr::activity", "{message}"),
            LogLevel::Warning => warn!(target: "tymbr::activity", "{message}"),
            LogLevel::Info | LogLevel::Success => info!(target: "tymbr::activity", "{message}"),
        }
        self.logs.push(LogEntry {
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            level,
            message,
        });
        if self.logs.len() > MAX_LOG_ENTRIES {
            self.logs.remove(0);
        }
    }

    pub fn reload(&mut self) {
        match self.controller.load_catalog() {
            Ok(count) => {
                self.search_buffer.clear();
                self.selected_script = 0;
                self.add_log(LogLevel::Success, format!("Loaded {count} scripts"));
            }
            Err(err) => self.add_log(LogLevel::Error, err.to_string()),
        }
        let health = self
            .controller
            .refresh_health()
            .map(|h| (h.is_healthy(), h.status.clone()));
        if let Some((false, status)) = health {
            self.add_log(LogLevel::Warning, format!("Server health: {status}"));
        }
    }

    /// Called every tick; applies finished executions.
    pub fn on_tick(&mut self) {
        match self.controller.poll_execution() {
            Some(Phase::ResultShown) => {
                let name = self.current_name();
                self.add_log(LogLevel::Success, format!("✓ {name} finished"));
            }
            Some(Phase::ErrorShown) => {
                let message = match self.controller.state() {
                    SessionState::ErrorShown(_, message) => message.clone(),
                    _ => String::new(),
                };
                self.add_log(LogLevel::Error, format!("✗ {message}"));
            }
            _ => {}
        }
    }

    fn current_name(&self) -> String {
        self.controller
            .active()
            .map(|a| a.name.clone())
            .unwrap_or_default()
    }

    pub fn open_script(&mut self, name: &str) {
        match self.controller.select_script(name) {
            Ok(()) => self.add_log(LogLevel::Info, format!("Opened {name}")),
            Err(err) => self.add_log(LogLevel::Error, err.to_string()),
        }
    }

    pub fn execute(&mut self) {
        let name = self.current_name();
        match self.controller.execute_script() {
            Ok(()) => self.add_log(LogLevel::Info, format!("Executing {name}...")),
            Err(err) => self.add_log(LogLevel::Warning, err.to_string()),
        }
    }

    fn toggle_favorite(&mut self, name: &str) {
        let was_favorite = self.controller.is_favorite(name);
        match (was_favorite, self.controller.toggle_favorite_by_name(name)) {
            (_, true) => self.add_log(LogLevel::Success, format!("★ {name} added to favorites")),
            (true, false) => self.add_log(LogLevel::Info, format!("{name} removed from favorites")),
            (false, false) => self.add_log(
                LogLevel::Warning,
                format!("{name} is not in the catalog and cannot be favorited"),
            ),
        }
        self.clamp_selections();
    }

    fn set_search(&mut self, term: String) {
        self.search_buffer = term;
        self.controller.filter(&self.search_buffer);
        self.selected_script = 0;
    }

    fn clamp_selections(&mut self) {
        let (shown, _) = self.controller.catalog().count();
        self.selected_script = self.selected_script.min(shown.saturating_sub(1));
        self.selected_recent = self
            .selected_recent
            .min(self.controller.recent().len().saturating_sub(1));
        self.selected_favorite = self
            .selected_favorite
            .min(self.controller.favorites().len().saturating_sub(1));
    }

    /// Name of the script highlighted in the focused overview pane.
    pub fn highlighted(&self) -> Option<String> {
        match self.pane {
            Pane::Scripts => self
                .controller
                .catalog()
                .filtered_at(self.selected_script)
                .map(|s| s.name.clone()),
            Pane::Recent => self
                .controller
                .recent()
                .entries()
                .get(self.selected_recent)
                .map(|e| e.item.name.clone()),
            Pane::Favorites => self
                .controller
                .favorites()
                .entries()
                .get(self.selected_favorite)
                .map(|e| e.item.name.clone()),
        }
    }
}

/// Maps a terminal key to the form editor's input type.
pub fn to_form_input(key: KeyCode, modifiers: KeyModifiers) -> Input {
    let key = match key {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Enter => Key::Enter,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Tab => Key::Tab,
        KeyCode::Delete => Key::Delete,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::Esc => Key::Esc,
        KeyCode::F(n) => Key::F(n),
        _ => Key::Null,
    };
    Input {
        key,
        ctrl: modifiers.contains(KeyModifiers::CONTROL),
        alt: modifiers.contains(KeyModifiers::ALT),
        shift: modifiers.contains(KeyModifiers::SHIFT),
    }
}

/// Returns `true` when the app should quit.
pub fn handle_input(app: &mut App, key: KeyCode, modifiers: KeyModifiers) -> bool {
    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && matches!(key, KeyCode::Char('c') | KeyCode::Char('q')) {
        return true;
    }

    if app.show_help {
        app.show_help = false;
        return false;
    }

    match app.input_mode {
        InputMode::Search => {
            handle_search_input(app, key);
            false
        }
        InputMode::Confirm(target) => {
            if matches!(key, KeyCode::Char('y') | KeyCode::Char('Y')) {
                match target {
                    ClearTarget::Recent => {
                        app.controller.clear_recent();
                        app.add_log(LogLevel::Success, "Recent scripts cleared".into());
                    }
                    ClearTarget::Favorites => {
                        app.controller.clear_favorites();
                        app.add_log(LogLevel::Success, "Favorite scripts cleared".into());
                    }
                }
                app.clamp_selections();
            }
            app.input_mode = InputMode::Normal;
            false
        }
        InputMode::Normal => {
            if app.controller.phase() == Phase::Overview {
                handle_overview_input(app, key)
            } else {
                handle_script_input(app, key, modifiers);
                false
            }
        }
    }
}

fn handle_search_input(app: &mut App, key: KeyCode) {
    match key {
        KeyCode::Enter => app.input_mode = InputMode::Normal,
        KeyCode::Esc => {
            app.set_search(String::new());
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Backspace => {
            let mut term = app.search_buffer.clone();
            term.pop();
            app.set_search(term);
        }
        KeyCode::Char(c) => {
            let mut term = app.search_buffer.clone();
            term.push(c);
            app.set_search(term);
        }
        _ => {}
    }
}

fn handle_overview_input(app: &mut App, key: KeyCode) -> bool {
    match key {
        KeyCode::Char('q') => return true,
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Char('/') => {
            app.pane = Pane::Scripts;
            app.input_mode = InputMode::Search;
        }
        KeyCode::Tab => {
            app.pane = match app.pane {
                Pane::Scripts => Pane::Recent,
                Pane::Recent => Pane::Favorites,
                Pane::Favorites => Pane::Scripts,
            };
        }
        KeyCode::BackTab => {
            app.pane = match app.pane {
                Pane::Scripts => Pane::Favorites,
                Pane::Recent => Pane::Scripts,
                Pane::Favorites => Pane::Recent,
            };
        }
        KeyCode::Up => {
            let selected = match app.pane {
                Pane::Scripts => &mut app.selected_script,
                Pane::Recent => &mut app.selected_recent,
                Pane::Favorites => &mut app.selected_favorite,
            };
            *selected = selected.saturating_sub(1);
        }
        KeyCode::Down => {
            let len = match app.pane {
                Pane::Scripts => app.controller.catalog().count().0,
                Pane::Recent => app.controller.recent().len(),
                Pane::Favorites => app.controller.favorites().len(),
            };
            let selected = match app.pane {
                Pane::Scripts => &mut app.selected_script,
                Pane::Recent => &mut app.selected_recent,
                Pane::Favorites => &mut app.selected_favorite,
            };
            if *selected + 1 < len {
                *selected += 1;
            }
        }
        KeyCode::Enter => {
            if let Some(name) = app.highlighted() {
                app.open_script(&name);
            }
        }
        KeyCode::Char('f') | KeyCode::Char('*') => {
            if let Some(name) = app.highlighted() {
                app.toggle_favorite(&name);
            }
        }
        KeyCode::Char('r') => app.reload(),
        KeyCode::Char('c') => match app.pane {
            Pane::Recent => app.input_mode = InputMode::Confirm(ClearTarget::Recent),
            Pane::Favorites => app.input_mode = InputMode::Confirm(ClearTarget::Favorites),
            Pane::Scripts => {}
        },
        KeyCode::Esc => {
            if app.controller.alert().is_some() {
                app.controller.dismiss_alert();
            } else if !app.search_buffer.is_empty() {
                app.set_search(String::new());
            }
        }
        _ => {}
    }
    false
}

fn handle_script_input(app: &mut App, key: KeyCode, modifiers: KeyModifiers) {
    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    match key {
        KeyCode::Esc => {
            app.controller.return_to_overview();
            app.clamp_selections();
        }
        KeyCode::F(1) => app.show_help = true,
        KeyCode::F(5) => app.execute(),
        KeyCode::Char('e') if ctrl => app.execute(),
        KeyCode::Char('l') if ctrl => {
            app.controller.clear_form();
            app.add_log(LogLevel::Info, "Form cleared".into());
        }
        KeyCode::Char('f') if ctrl => {
            let name = app.current_name();
            app.toggle_favorite(&name);
        }
        KeyCode::Tab => {
            if let Some(form) = app.controller.form_mut() {
                form.focus_next();
            }
        }
        KeyCode::BackTab => {
            if let Some(form) = app.controller.form_mut() {
                form.focus_prev();
            }
        }
        _ => {
            if let Some(form) = app.controller.form_mut() {
                form.input(to_form_input(key, modifiers));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_input_keeps_modifiers() {
        let input = to_form_input(KeyCode::Char('x'), KeyModifiers::CONTROL | KeyModifiers::SHIFT);
        assert_eq!(input.key, Key::Char('x'));
        assert!(input.ctrl);
        assert!(input.shift);
        assert!(!input.alt);
        assert_eq!(to_form_input(KeyCode::Insert, KeyModifiers::NONE).key, Key::Null);
    }
}
