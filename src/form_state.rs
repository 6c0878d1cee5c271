//! Live state of a rendered form: text buffers, toggles, selections and focus.

use ratatui::style::{Modifier, Style};
use tui_textarea::{Input, Key, TextArea};

use crate::form::{ChoiceOption, Control, RenderableField};
use crate::models::{FieldValue, FormValues};

#[derive(Debug, Clone)]
pub enum ControlState {
    /// Single-line input (text and number fields).
    Line(TextArea<'static>),
    Multiline(TextArea<'static>),
    Checkbox(bool),
    Select { selected: usize },
    MultiSelect { chosen: Vec<bool>, cursor: usize },
    Warning,
}

#[derive(Debug, Clone)]
pub struct FieldState {
    pub field: RenderableField,
    pub state: ControlState,
}

impl FieldState {
    fn new(field: RenderableField) -> Self {
        let state = match &field.control {
            Control::Text {
                default,
                placeholder,
            }
            | Control::Number {
                default,
                placeholder,
                ..
            } => ControlState::Line(text_area(default, placeholder.as_deref())),
            Control::TextArea {
                default,
                placeholder,
            } => ControlState::Multiline(text_area(default, placeholder.as_deref())),
            Control::Checkbox { checked } => ControlState::Checkbox(*checked),
            Control::Select { selected, .. } => ControlState::Select {
                selected: *selected,
            },
            Control::MultiSelect { options, .. } => ControlState::MultiSelect {
                chosen: vec![false; options.len()],
                cursor: 0,
            },
            Control::Unsupported { .. } => ControlState::Warning,
        };
        Self { field, state }
    }

    pub fn is_focusable(&self) -> bool {
        !matches!(self.state, ControlState::Warning)
    }

    fn options(&self) -> &[ChoiceOption] {
        match &self.field.control {
            Control::Select { options, .. } | Control::MultiSelect { options, .. } => options,
            _ => &[],
        }
    }

    /// Submitted value, `None` for warning fields.
    pub fn value(&self) -> Option<FieldValue> {
        match &self.state {
            ControlState::Line(area) | ControlState::Multiline(area) => {
                Some(FieldValue::Text(area.lines().join("\n")))
            }
            ControlState::Checkbox(checked) => Some(FieldValue::Flag(*checked)),
            ControlState::Select { selected } => Some(FieldValue::Text(
                self.options()
                    .get(*selected)
                    .map(|o| o.value.clone())
                    .unwrap_or_default(),
            )),
            ControlState::MultiSelect { chosen, .. } => Some(FieldValue::Choices(
                self.options()
                    .iter()
                    .zip(chosen)
                    .filter(|(_, on)| **on)
                    .map(|(o, _)| o.value.clone())
                    .collect(),
            )),
            ControlState::Warning => None,
        }
    }

    fn clear(&mut self) {
        let placeholder = match &self.field.control {
            Control::Text { placeholder, .. }
            | Control::Number { placeholder, .. }
            | Control::TextArea { placeholder, .. } => placeholder.clone(),
            _ => None,
        };
        match &mut self.state {
            ControlState::Line(area) | ControlState::Multiline(area) => {
                *area = text_area("", placeholder.as_deref());
            }
            ControlState::Checkbox(checked) => *checked = false,
            ControlState::Select { selected } => *selected = 0,
            ControlState::MultiSelect { chosen, cursor } => {
                chosen.iter_mut().for_each(|c| *c = false);
                *cursor = 0;
            }
            ControlState::Warning => {}
        }
    }

    fn input(&mut self, input: Input) -> bool {
        let is_number = matches!(self.field.control, Control::Number { .. });
        let option_count = self.options().len();
        match &mut self.state {
            ControlState::Line(area) => match input.key {
                Key::Enter => false,
                Key::Char(c) if is_number && !input.ctrl && !is_numeric_char(c) => false,
                _ => area.input(input),
            },
            ControlState::Multiline(area) => area.input(input),
            ControlState::Checkbox(checked) => match input.key {
                Key::Char(' ') | Key::Enter => {
                    *checked = !*checked;
                    true
                }
                _ => false,
            },
            ControlState::Select { selected } => {
                if option_count == 0 {
                    return false;
                }
                match input.key {
                    Key::Right | Key::Down | Key::Char(' ') => {
                        *selected = (*selected + 1) % option_count;
                        true
                    }
                    Key::Left | Key::Up => {
                        *selected = (*selected + option_count - 1) % option_count;
                        true
                    }
                    _ => false,
                }
            }
            ControlState::MultiSelect { chosen, cursor } => match input.key {
                Key::Down if *cursor + 1 < chosen.len() => {
                    *cursor += 1;
                    true
                }
                Key::Up if *cursor > 0 => {
                    *cursor -= 1;
                    true
                }
                Key::Char(' ') | Key::Enter => match chosen.get_mut(*cursor) {
                    Some(on) => {
                        *on = !*on;
                        true
                    }
                    None => false,
                },
                _ => false,
            },
            ControlState::Warning => false,
        }
    }

    fn set_focused(&mut self, focused: bool) {
        if let ControlState::Line(area) | ControlState::Multiline(area) = &mut self.state {
            let cursor = if focused {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            area.set_cursor_style(cursor);
            area.set_cursor_line_style(Style::default());
        }
    }
}

fn is_numeric_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E')
}

fn text_area(default: &str, placeholder: Option<&str>) -> TextArea<'static> {
    let lines: Vec<String> = if default.is_empty() {
        vec![String::new()]
    } else {
        default.lines().map(str::to_owned).collect()
    };
    let mut area = TextArea::new(lines);
    area.move_cursor(tui_textarea::CursorMove::Bottom);
    area.move_cursor(tui_textarea::CursorMove::End);
    area.set_cursor_line_style(Style::default());
    area.set_cursor_style(Style::default());
    if let Some(placeholder) = placeholder {
        area.set_placeholder_text(placeholder);
    }
    area
}

/// The form of the currently selected script.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    fields: Vec<FieldState>,
    focus: Option<usize>,
}

impl FormState {
    pub fn new(fields: Vec<RenderableField>) -> Self {
        let mut form = Self {
            fields: fields.into_iter().map(FieldState::new).collect(),
            focus: None,
        };
        let first = form.fields.iter().position(FieldState::is_focusable);
        form.set_focus(first);
        form
    }

    pub fn fields(&self) -> &[FieldState] {
        &self.fields
    }

    pub fn focus(&self) -> Option<usize> {
        self.focus
    }

    pub fn focus_next(&mut self) {
        self.step_focus(1);
    }

    pub fn focus_prev(&mut self) {
        self.step_focus(self.fields.len().saturating_sub(1));
    }

    fn step_focus(&mut self, step: usize) {
        let len = self.fields.len();
        let Some(start) = self.focus else {
            return;
        };
        let next = (1..=len)
            .map(|offset| (start + offset * step) % len)
            .find(|&i| self.fields[i].is_focusable());
        self.set_focus(next);
    }

    fn set_focus(&mut self, focus: Option<usize>) {
        self.focus = focus;
        for (i, field) in self.fields.iter_mut().enumerate() {
            field.set_focused(Some(i) == focus);
        }
    }

    /// Feeds a key to the focused control. Returns whether anything changed.
    pub fn input(&mut self, input: Input) -> bool {
        match self.focus.and_then(|i| self.fields.get_mut(i)) {
            Some(field) => field.input(input),
            None => false,
        }
    }

    /// Type-aware extraction of every field's current value.
    pub fn values(&self) -> FormValues {
        self.fields
            .iter()
            .filter_map(|f| f.value().map(|v| (f.field.name.clone(), v)))
            .collect()
    }

    /// Resets every control to its empty state: unchecked, nothing selected,
    /// empty text.
    pub fn clear(&mut self) {
        for field in &mut self.fields {
            field.clear();
        }
        self.set_focus(self.focus);
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut FieldState> {
        self.fields.iter_mut().find(|f| f.field.name == name)
    }

    pub fn set_text(&mut self, name: &str, value: &str) -> bool {
        match self.field_mut(name) {
            Some(field) => match &mut field.state {
                ControlState::Line(area) | ControlState::Multiline(area) => {
                    let placeholder = area.placeholder_text().to_string();
                    *area = text_area(value, Some(placeholder.as_str()).filter(|p| !p.is_empty()));
                }
                _ => return false,
            },
            None => return false,
        }
        self.set_focus(self.focus);
        true
    }

    pub fn set_checked(&mut self, name: &str, value: bool) -> bool {
        match self.field_mut(name).map(|f| &mut f.state) {
            Some(ControlState::Checkbox(checked)) => {
                *checked = value;
                true
            }
            _ => false,
        }
    }

    /// Selects `value` in a select field, or toggles it on in a multiselect.
    pub fn choose(&mut self, name: &str, value: &str) -> bool {
        let Some(field) = self.field_mut(name) else {
            return false;
        };
        let Some(position) = field.options().iter().position(|o| o.value == value) else {
            return false;
        };
        match &mut field.state {
            ControlState::Select { selected } => {
                *selected = position;
                true
            }
            ControlState::MultiSelect { chosen, .. } => {
                chosen[position] = true;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::render;
    use crate::models::FieldDescriptor;
    use serde_json::json;

    fn form() -> FormState {
        let fields: Vec<FieldDescriptor> = serde_json::from_value(json!([
            {"name":"who","label":"Who","type":"text","default":"ada","required":true},
            {"name":"count","label":"Count","type":"number"},
            {"name":"bad","label":"Bad","type":"color"},
            {"name":"dry","label":"Dry run","type":"checkbox","default":true},
            {"name":"env","label":"Env","type":"select","options":["dev","prod"],"default":"dev"},
            {"name":"tags","label":"Tags","type":"multiselect","options":["a","b","c"]},
            {"name":"notes","label":"Notes","type":"textarea"}
        ]))
        .unwrap();
        FormState::new(render(&fields))
    }

    fn key(key: Key) -> Input {
        Input {
            key,
            ..Input::default()
        }
    }

    #[test]
    fn values_are_extracted_by_type() {
        let values = form().values();
        assert_eq!(values["who"], FieldValue::Text("ada".into()));
        assert_eq!(values["count"], FieldValue::Text(String::new()));
        assert_eq!(values["dry"], FieldValue::Flag(true));
        assert_eq!(values["env"], FieldValue::Text("dev".into()));
        assert_eq!(values["tags"], FieldValue::Choices(vec![]));
        assert_eq!(values["notes"], FieldValue::Text(String::new()));
        assert!(!values.contains_key("bad"));
    }

    #[test]
    fn clear_resets_to_empty_states() {
        let mut form = form();
        form.choose("tags", "b");
        form.set_text("notes", "line one\nline two");
        form.clear();
        let values = form.values();
        assert_eq!(values["who"], FieldValue::Text(String::new()));
        assert_eq!(values["dry"], FieldValue::Flag(false));
        assert_eq!(values["env"], FieldValue::Text(String::new()));
        assert_eq!(values["tags"], FieldValue::Choices(vec![]));
        assert_eq!(values["notes"], FieldValue::Text(String::new()));
    }

    #[test]
    fn focus_skips_warning_fields() {
        let mut form = form();
        assert_eq!(form.focus(), Some(0));
        form.focus_next();
        assert_eq!(form.focus(), Some(1));
        form.focus_next();
        assert_eq!(form.focus(), Some(3));
        form.focus_prev();
        assert_eq!(form.focus(), Some(1));
        form.focus_prev();
        form.focus_prev();
        assert_eq!(form.focus(), Some(6));
    }

    #[test]
    fn number_field_rejects_letters() {
        let mut form = form();
        form.focus_next();
        assert!(!form.input(key(Key::Char('x'))));
        assert!(form.input(key(Key::Char('4'))));
        assert!(form.input(key(Key::Char('2'))));
        assert!(!form.input(key(Key::Enter)));
        assert_eq!(form.values()["count"], FieldValue::Text("42".into()));
    }

    #[test]
    fn typing_appends_to_default_text() {
        let mut form = form();
        form.input(key(Key::Char('!')));
        assert_eq!(form.values()["who"], FieldValue::Text("ada!".into()));
    }

    #[test]
    fn checkbox_select_and_multiselect_keys() {
        let mut form = form();
        form.focus_next();
        form.focus_next();
        assert!(form.input(key(Key::Char(' '))));
        assert_eq!(form.values()["dry"], FieldValue::Flag(false));

        form.focus_next();
        assert!(form.input(key(Key::Right)));
        assert_eq!(form.values()["env"], FieldValue::Text("prod".into()));
        assert!(form.input(key(Key::Right)));
        assert_eq!(form.values()["env"], FieldValue::Text(String::new()));
        assert!(form.input(key(Key::Left)));
        assert_eq!(form.values()["env"], FieldValue::Text("prod".into()));

        form.focus_next();
        form.input(key(Key::Char(' ')));
        form.input(key(Key::Down));
        form.input(key(Key::Down));
        form.input(key(Key::Char(' ')));
        assert_eq!(
            form.values()["tags"],
            FieldValue::Choices(vec!["a".into(), "c".into()])
        );
    }

    #[test]
    fn programmatic_setters() {
        let mut form = form();
        assert!(form.set_text("who", "grace"));
        assert!(form.set_checked("dry", false));
        assert!(form.choose("env", "prod"));
        assert!(!form.choose("env", "staging"));
        assert!(!form.set_checked("who", true));
        let values = form.values();
        assert_eq!(values["who"], FieldValue::Text("grace".into()));
        assert_eq!(values["dry"], FieldValue::Flag(false));
        assert_eq!(values["env"], FieldValue::Text("prod".into()));
    }
}
