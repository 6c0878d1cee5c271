mod common;

use common::{FakeBackend, controller, field, script};
use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::{Terminal, backend::TestBackend};
use tymbr_tui::app::{App, LogLevel, handle_input};
use tymbr_tui::ui::ui;

fn screen(app: &App) -> String {
    let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
    terminal.draw(|f| ui(f, app)).unwrap();
    let buffer = terminal.backend().buffer();
    let mut text = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            text.push_str(buffer[(x, y)].symbol());
        }
        text.push('\n');
    }
    text
}

fn press(app: &mut App, key: KeyCode) -> bool {
    handle_input(app, key, KeyModifiers::NONE)
}

#[test]
fn overview_lists_scripts_and_empty_sidebars() {
    let (session, _, _) = controller(FakeBackend::new(vec![
        script("backup", "Backup Database"),
        script("deploy", "Deploy Service"),
    ]));
    let app = App::new(session, "http://127.0.0.1:5000/");

    let text = screen(&app);
    assert!(text.contains("Backup Database"));
    assert!(text.contains("Deploy Service"));
    assert!(text.contains("2 scripts available"));
    assert!(text.contains("No recent scripts"));
    assert!(text.contains("No favorite scripts"));
}

#[test]
fn search_without_matches_shows_empty_state() {
    let (session, _, _) = controller(FakeBackend::new(vec![script("backup", "Backup Database")]));
    let mut app = App::new(session, "http://127.0.0.1:5000/");

    press(&mut app, KeyCode::Char('/'));
    for c in "zzz".chars() {
        press(&mut app, KeyCode::Char(c));
    }
    assert_eq!(app.search_buffer, "zzz");
    assert!(screen(&app).contains("No scripts match your search"));

    press(&mut app, KeyCode::Esc);
    assert!(app.search_buffer.is_empty());
    assert!(screen(&app).contains("Backup Database"));
}

#[test]
fn opening_a_script_renders_its_form() {
    let mut kind = field("kind", "date");
    kind.label = "Kind".into();
    let backend = FakeBackend::new(vec![script("backup", "Backup Database")])
        .with_form("backup", vec![field("target", "text"), kind]);
    let (session, _, _) = controller(backend);
    let mut app = App::new(session, "http://127.0.0.1:5000/");

    press(&mut app, KeyCode::Enter);
    let text = screen(&app);
    assert!(text.contains("TARGET"));
    assert!(text.contains("Unsupported field type: date"));
    assert!(text.contains("v1.0"));
    assert!(text.contains("Unknown"));

    // the sidebar picks up the selection
    assert_eq!(app.controller.recent().len(), 1);

    assert!(!press(&mut app, KeyCode::Esc));
    assert!(screen(&app).contains("Backup Database"));
}

#[test]
fn quit_keys() {
    let (session, _, _) = controller(FakeBackend::new(vec![script("backup", "Backup")]));
    let mut app = App::new(session, "http://127.0.0.1:5000/");
    assert!(handle_input(&mut app, KeyCode::Char('c'), KeyModifiers::CONTROL));
    assert!(press(&mut app, KeyCode::Char('q')));
}

#[test]
fn clearing_favorites_asks_for_confirmation() {
    let (session, _, _) = controller(FakeBackend::new(vec![script("backup", "Backup")]));
    let mut app = App::new(session, "http://127.0.0.1:5000/");

    press(&mut app, KeyCode::Char('f'));
    assert!(app.controller.is_favorite("backup"));

    press(&mut app, KeyCode::BackTab);
    press(&mut app, KeyCode::Char('c'));
    assert!(screen(&app).contains("Clear all favorite scripts?"));
    press(&mut app, KeyCode::Char('n'));
    assert!(app.controller.is_favorite("backup"));

    press(&mut app, KeyCode::Char('c'));
    press(&mut app, KeyCode::Char('y'));
    assert!(app.controller.favorites().is_empty());
}

#[test]
fn favoriting_a_script_gone_from_the_catalog_warns() {
    let (session, backend, _) = controller(FakeBackend::new(vec![script("backup", "Backup")]));
    let mut app = App::new(session, "http://127.0.0.1:5000/");

    press(&mut app, KeyCode::Enter);
    press(&mut app, KeyCode::Esc);
    *backend.scripts.lock().unwrap() = Ok(Vec::new());
    app.reload();

    press(&mut app, KeyCode::Tab);
    press(&mut app, KeyCode::Char('f'));

    assert!(app.controller.favorites().is_empty());
    let last = app.logs.last().unwrap();
    assert_eq!(last.level, LogLevel::Warning);
    assert!(last.message.contains("not in the catalog"));
    assert!(!last.message.contains("removed"));
}
