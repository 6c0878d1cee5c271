use chrono::Utc;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Padding, Paragraph, Wrap},
};

use crate::app::{App, ClearTarget, InputMode, LogLevel, Pane};
use crate::form::Control;
use crate::form_state::{ControlState, FieldState};
use crate::presenter::{author_label, time_ago, version_label};
use crate::session::{ActiveScript, SessionState};

pub fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(6),
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    render_main_view(f, app, chunks[1]);
    render_footer(f, app, chunks[2]);

    if let InputMode::Confirm(target) = app.input_mode {
        render_confirm_popup(f, target);
    }
    if app.show_help {
        render_help_popup(f);
    }
}

fn border(color: Color) -> Style {
    Style::default().fg(color)
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let (health_text, health_color) = match app.controller.health() {
        Some(h) if h.is_healthy() => ("● connected".to_string(), Color::Green),
        Some(h) => (format!("● {}", h.status), Color::Red),
        None => ("○ unknown".to_string(), Color::DarkGray),
    };

    let mut spans = vec![
        Span::styled(&app.server, Style::default().fg(Color::Gray)),
        Span::raw("  "),
        Span::styled(health_text, Style::default().fg(health_color)),
        Span::raw("  "),
        Span::styled(
            app.controller.catalog().count_label(),
            Style::default().fg(Color::Cyan),
        ),
    ];
    if let Some(active) = app.controller.active() {
        spans.push(Span::styled("  ›  ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(
            &active.name,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
    }

    f.render_widget(
        Paragraph::new(Line::from(spans)).block(
            Block::default()
                .title("🧰 Tymbr")
                .borders(Borders::ALL)
                .border_style(border(Color::Cyan)),
        ),
        area,
    );
}

fn render_main_view(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);

    match app.controller.state() {
        SessionState::Overview => render_overview(f, app, chunks[0]),
        state => {
            if let Some(active) = state.active() {
                render_script_view(f, app, active, chunks[0]);
            }
        }
    }
    render_sidebar(f, app, chunks[1]);
}

fn render_alert(f: &mut Frame, message: &str, area: Rect) {
    f.render_widget(
        Paragraph::new(Span::styled(message, Style::default().fg(Color::Red)))
            .block(
                Block::default()
                    .title("✗ Error")
                    .borders(Borders::ALL)
                    .border_style(border(Color::Red)),
            )
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn render_overview(f: &mut Frame, app: &App, area: Rect) {
    let alert = app.controller.alert();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(if alert.is_some() { 3 } else { 0 }),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);

    if let Some(message) = alert {
        render_alert(f, message, chunks[0]);
    }

    let searching = app.input_mode == InputMode::Search;
    let mut search = vec![
        Span::styled("🔍 ", Style::default().fg(Color::Gray)),
        Span::styled(&app.search_buffer, Style::default().fg(Color::White)),
    ];
    if searching {
        search.push(Span::styled(
            "_",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::SLOW_BLINK),
        ));
    } else if app.search_buffer.is_empty() {
        search.push(Span::styled(
            "Press '/' to search scripts",
            Style::default().fg(Color::DarkGray),
        ));
    }
    f.render_widget(
        Paragraph::new(Line::from(search)).block(
            Block::default()
                .title("Search")
                .borders(Borders::ALL)
                .border_style(border(if searching { Color::Yellow } else { Color::DarkGray })),
        ),
        chunks[1],
    );

    let catalog = app.controller.catalog();
    let focused = app.pane == Pane::Scripts;
    let block = Block::default()
        .title(format!("📂 Scripts ({})", catalog.count_label()))
        .borders(Borders::ALL)
        .border_style(border(if focused { Color::Cyan } else { Color::DarkGray }));

    let filtered = catalog.filtered();
    if filtered.is_empty() {
        let (title, subtitle) = if catalog.scripts().is_empty() {
            ("No scripts available", "Add scripts on the server, then press 'r'")
        } else {
            ("No scripts match your search", "Try a different search term")
        };
        f.render_widget(
            Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    title,
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(subtitle, Style::default().fg(Color::Gray))),
            ])
            .block(block)
            .alignment(Alignment::Center),
            chunks[2],
        );
        return;
    }

    let items: Vec<ListItem> = filtered
        .iter()
        .enumerate()
        .map(|(i, script)| {
            let star = if app.controller.is_favorite(&script.name) {
                Span::styled("★ ", Style::default().fg(Color::Yellow))
            } else {
                Span::styled("☆ ", Style::default().fg(Color::DarkGray))
            };
            let title_style = if focused && i == app.selected_script {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(vec![
                Line::from(vec![
                    star,
                    Span::styled(&script.title, title_style),
                    Span::styled(
                        format!("  {}", version_label(script.version.as_deref())),
                        Style::default().fg(Color::Cyan),
                    ),
                    Span::styled(
                        format!("  {}", author_label(script.author.as_deref())),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]),
                Line::from(Span::styled(
                    format!("   {}", script.description),
                    Style::default().fg(Color::Gray),
                )),
            ])
        })
        .collect();

    f.render_widget(
        List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(Color::DarkGray)),
        chunks[2],
    );
}

fn render_script_view(f: &mut Frame, app: &App, active: &ActiveScript, area: Rect) {
    let state = app.controller.state();
    let panel_shown = app.controller.alert().is_some()
        || matches!(
            state,
            SessionState::ResultShown(..) | SessionState::ErrorShown(..) | SessionState::Executing(_)
        );
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Min(0),
            if panel_shown {
                Constraint::Percentage(40)
            } else {
                Constraint::Length(3)
            },
        ])
        .split(area);

    let meta = &active.metadata;
    let favorite = app.controller.is_favorite(&active.name);
    let header = vec![
        Line::from(vec![
            Span::styled(
                if favorite { "★ " } else { "☆ " },
                Style::default().fg(if favorite { Color::Yellow } else { Color::DarkGray }),
            ),
            Span::styled(
                &meta.name,
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}", version_label(meta.version.as_deref())),
                Style::default().fg(Color::Cyan),
            ),
            Span::styled(
                format!("  {}", author_label(meta.author.as_deref())),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(Span::styled(&meta.description, Style::default().fg(Color::Gray))),
    ];
    f.render_widget(
        Paragraph::new(header)
            .block(
                Block::default()
                    .title(format!("📋 {}", active.name))
                    .borders(Borders::ALL)
                    .border_style(border(Color::Cyan))
                    .padding(Padding::horizontal(1)),
            )
            .wrap(Wrap { trim: true }),
        chunks[0],
    );

    render_form(f, active, chunks[1]);
    render_outcome(f, app, chunks[2]);
}

fn field_height(field: &FieldState) -> u16 {
    match &field.state {
        ControlState::Multiline(_) => 6,
        ControlState::MultiSelect { chosen, .. } => chosen.len() as u16 + 3,
        _ => 3,
    }
}

fn render_form(f: &mut Frame, active: &ActiveScript, area: Rect) {
    let block = Block::default()
        .title("⚙️  Form")
        .borders(Borders::ALL)
        .border_style(border(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let fields = active.form.fields();
    if fields.is_empty() {
        f.render_widget(
            Paragraph::new(Span::styled(
                "This script takes no input",
                Style::default().fg(Color::DarkGray),
            )),
            inner,
        );
        return;
    }

    // scroll just far enough that the focused field is visible
    let focus = active.form.focus().unwrap_or(0);
    let mut start = 0;
    while start < focus
        && fields[start..=focus].iter().map(field_height).sum::<u16>() > inner.height
    {
        start += 1;
    }

    let visible = &fields[start..];
    let mut constraints: Vec<Constraint> = visible
        .iter()
        .map(|field| Constraint::Length(field_height(field)))
        .collect();
    constraints.push(Constraint::Min(0));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    for (offset, field) in visible.iter().enumerate() {
        let focused = active.form.focus() == Some(start + offset);
        render_field(f, field, focused, rows[offset]);
    }
}

fn render_field(f: &mut Frame, field: &FieldState, focused: bool, area: Rect) {
    if area.height == 0 {
        return;
    }
    let mut title = field.field.display_label();
    if let Control::Number { min, max, .. } = &field.field.control {
        match (min, max) {
            (Some(min), Some(max)) => title.push_str(&format!(" [{min}..{max}]")),
            (Some(min), None) => title.push_str(&format!(" [≥{min}]")),
            (None, Some(max)) => title.push_str(&format!(" [≤{max}]")),
            (None, None) => {}
        }
    }
    let color = if focused { Color::Yellow } else { Color::DarkGray };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border(color));
    let inner = block.inner(area);

    match &field.state {
        ControlState::Line(text) | ControlState::Multiline(text) => {
            f.render_widget(block, area);
            f.render_widget(text, inner);
        }
        ControlState::Checkbox(checked) => {
            let mark = if *checked { "[x]" } else { "[ ]" };
            f.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled(mark, Style::default().fg(Color::Cyan)),
                    Span::raw(" "),
                    Span::styled(&field.field.label, Style::default().fg(Color::White)),
                ]))
                .block(block),
                area,
            );
        }
        ControlState::Select { selected } => {
            let label = match &field.field.control {
                Control::Select { options, .. } => options
                    .get(*selected)
                    .map(|o| o.label.clone())
                    .unwrap_or_default(),
                _ => String::new(),
            };
            let value_style = if *selected == 0 {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::White)
            };
            f.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled("◀ ", Style::default().fg(color)),
                    Span::styled(label, value_style),
                    Span::styled(" ▶", Style::default().fg(color)),
                ]))
                .block(block),
                area,
            );
        }
        ControlState::MultiSelect { chosen, cursor } => {
            let (options, hint) = match &field.field.control {
                Control::MultiSelect { options, hint } => (options.as_slice(), *hint),
                _ => (&[][..], ""),
            };
            let mut lines: Vec<Line> = options
                .iter()
                .zip(chosen)
                .enumerate()
                .map(|(i, (option, on))| {
                    let style = if focused && i == *cursor {
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(Color::White)
                    };
                    Line::from(vec![
                        Span::styled(if *on { "[x] " } else { "[ ] " }, Style::default().fg(Color::Cyan)),
                        Span::styled(&option.label, style),
                    ])
                })
                .collect();
            lines.push(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))));
            f.render_widget(Paragraph::new(lines).block(block), area);
        }
        ControlState::Warning => {
            let field_type = match &field.field.control {
                Control::Unsupported { field_type } if !field_type.is_empty() => {
                    field_type.as_str()
                }
                _ => "(missing)",
            };
            f.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled(
                        "⚠ Unsupported field type: ",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(field_type, Style::default().fg(Color::Yellow)),
                ]))
                .block(
                    Block::default()
                        .title(field.field.label.as_str())
                        .borders(Borders::ALL)
                        .border_style(border(Color::Yellow)),
                ),
                area,
            );
        }
    }
}

fn render_outcome(f: &mut Frame, app: &App, area: Rect) {
    if let Some(message) = app.controller.alert() {
        render_alert(f, message, area);
        return;
    }

    match app.controller.state() {
        SessionState::Executing(_) => {
            f.render_widget(
                Paragraph::new(Span::styled(
                    "⏳ Executing... (submit disabled)",
                    Style::default().fg(Color::Yellow),
                ))
                .block(
                    Block::default()
                        .title("Result")
                        .borders(Borders::ALL)
                        .border_style(border(Color::Yellow)),
                ),
                area,
            );
        }
        SessionState::ResultShown(_, result) => {
            let mut lines: Vec<Line> = Vec::new();
            if !result.tags.is_empty() {
                let tags: Vec<Span> = result
                    .tags
                    .iter()
                    .flat_map(|tag| {
                        [
                            Span::styled(
                                format!(" {tag} "),
                                Style::default().fg(Color::Black).bg(Color::Gray),
                            ),
                            Span::raw(" "),
                        ]
                    })
                    .collect();
                lines.push(Line::from(tags));
                lines.push(Line::from(""));
            }
            lines.extend(
                result
                    .body
                    .lines()
                    .map(|l| Line::from(Span::styled(l, Style::default().fg(Color::Green)))),
            );
            f.render_widget(
                Paragraph::new(lines)
                    .block(
                        Block::default()
                            .title("✓ Result")
                            .borders(Borders::ALL)
                            .border_style(border(Color::Green))
                            .padding(Padding::horizontal(1)),
                    )
                    .wrap(Wrap { trim: false }),
                area,
            );
        }
        SessionState::ErrorShown(_, message) => render_alert(f, message, area),
        _ => {
            f.render_widget(
                Paragraph::new(Span::styled(
                    "Ctrl-E: Execute | Ctrl-L: Clear form",
                    Style::default().fg(Color::DarkGray),
                ))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(border(Color::DarkGray)),
                ),
                area,
            );
        }
    }
}

fn render_sidebar(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let now = Utc::now();
    let recent_focused = app.pane == Pane::Recent && app.controller.active().is_none();
    let recent: Vec<ListItem> = app
        .controller
        .recent()
        .entries()
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let style = if recent_focused && i == app.selected_recent {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(vec![
                Line::from(Span::styled(&entry.item.title, style)),
                Line::from(Span::styled(
                    format!("  {}", time_ago(entry.stamp, now)),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect();
    render_side_list(f, "🕘 Recent", recent, "No recent scripts", recent_focused, chunks[0]);

    let favorites_focused = app.pane == Pane::Favorites && app.controller.active().is_none();
    let favorites: Vec<ListItem> = app
        .controller
        .favorites()
        .entries()
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let style = if favorites_focused && i == app.selected_favorite {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled("★ ", Style::default().fg(Color::Yellow)),
                    Span::styled(&entry.item.title, style),
                ]),
                Line::from(Span::styled(
                    format!("  {}", author_label(entry.item.author.as_deref())),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect();
    render_side_list(
        f,
        "⭐ Favorites",
        favorites,
        "No favorite scripts",
        favorites_focused,
        chunks[1],
    );
}

fn render_side_list(
    f: &mut Frame,
    title: &str,
    items: Vec<ListItem>,
    empty: &str,
    focused: bool,
    area: Rect,
) {
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(border(if focused { Color::Cyan } else { Color::DarkGray }));
    if items.is_empty() {
        f.render_widget(
            Paragraph::new(Span::styled(empty.to_string(), Style::default().fg(Color::DarkGray)))
                .block(block)
                .alignment(Alignment::Center),
            area,
        );
    } else {
        f.render_widget(List::new(items).block(block), area);
    }
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(3)])
        .split(area);

    let keybinds = match (app.input_mode, app.controller.active().is_some()) {
        (InputMode::Search, _) => "Type to filter | Enter: Done | Esc: Clear search",
        (InputMode::Confirm(_), _) => "y: Confirm | any other key: Cancel",
        (InputMode::Normal, false) => {
            "↑↓: Select | Enter: Open | /: Search | f: Favorite | Tab: Pane | c: Clear list | r: Reload | ?: Help | q: Quit"
        }
        (InputMode::Normal, true) => {
            "Tab: Next field | Ctrl-E: Execute | Ctrl-L: Clear | Ctrl-F: Favorite | Esc: Back | F1: Help"
        }
    };

    f.render_widget(
        Paragraph::new(keybinds)
            .style(Style::default().fg(Color::Cyan))
            .block(
                Block::default()
                    .title("⌨️  Keybindings")
                    .borders(Borders::ALL)
                    .border_style(border(Color::DarkGray)),
            )
            .alignment(Alignment::Center),
        chunks[0],
    );

    let log_items: Vec<Line> = app
        .logs
        .iter()
        .rev()
        .take(1)
        .map(|log| {
            let (icon, color) = match log.level {
                LogLevel::Info => ("ℹ️", Color::Cyan),
                LogLevel::Success => ("✓", Color::Green),
                LogLevel::Error => ("✗", Color::Red),
                LogLevel::Warning => ("⚠", Color::Yellow),
            };

            Line::from(vec![
                Span::styled(format!("[{}] ", log.timestamp), Style::default().fg(Color::DarkGray)),
                Span::styled(format!("{} ", icon), Style::default().fg(color)),
                Span::styled(&log.message, Style::default().fg(color)),
            ])
        })
        .collect();

    f.render_widget(
        Paragraph::new(log_items).block(
            Block::default()
                .title("📝 Log")
                .borders(Borders::ALL)
                .border_style(border(Color::DarkGray)),
        ),
        chunks[1],
    );
}

fn render_confirm_popup(f: &mut Frame, target: ClearTarget) {
    let area = centered_rect(40, 20, f.area());
    let question = match target {
        ClearTarget::Recent => "Clear recent scripts history?",
        ClearTarget::Favorites => "Clear all favorite scripts?",
    };
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(vec![
            Line::from(Span::styled(question, Style::default().fg(Color::White))),
            Line::from(""),
            Line::from(Span::styled("y / n", Style::default().fg(Color::Yellow))),
        ])
        .block(
            Block::default()
                .title("Confirm")
                .borders(Borders::ALL)
                .border_style(border(Color::Yellow))
                .padding(Padding::uniform(1)),
        )
        .alignment(Alignment::Center),
        area,
    );
}

fn render_help_popup(f: &mut Frame) {
    let area = centered_rect(60, 70, f.area());

    let heading = |text: &'static str| Line::from(Span::styled(text, Style::default().fg(Color::Yellow)));
    let help_text = vec![
        Line::from(Span::styled(
            "Tymbr - Help",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        heading("Overview:"),
        Line::from("  ↑ / ↓            - Move within the focused list"),
        Line::from("  Tab / Shift+Tab  - Switch between scripts, recent and favorites"),
        Line::from("  Enter            - Open the highlighted script"),
        Line::from("  /                - Search by title, description, name or author"),
        Line::from("  f                - Toggle favorite"),
        Line::from("  c                - Clear the recent or favorites list"),
        Line::from("  r                - Reload the catalog"),
        Line::from("  q                - Quit"),
        Line::from(""),
        heading("Script form:"),
        Line::from("  Tab / Shift+Tab  - Next / previous field"),
        Line::from("  Space            - Toggle checkbox or multiselect option"),
        Line::from("  ← / →            - Change select option"),
        Line::from("  Ctrl-E / F5      - Execute"),
        Line::from("  Ctrl-L           - Clear form"),
        Line::from("  Ctrl-F           - Toggle favorite"),
        Line::from("  Esc              - Back to overview"),
        Line::from(""),
        Line::from(Span::styled("Press any key to close", Style::default().fg(Color::DarkGray))),
    ];

    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(help_text)
            .block(
                Block::default()
                    .title("❓ Help")
                    .borders(Borders::ALL)
                    .border_style(border(Color::Cyan))
                    .padding(Padding::uniform(2)),
            )
            .alignment(Alignment::Left),
        area,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
