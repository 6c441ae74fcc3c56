//! Keyboard event handlers.

use crate::app::App;
use crate::state::{Focus, LoginForm, Screen};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::runtime::Runtime;

/// Handle a key event, returns true if the app should exit.
pub fn handle_key(app: &mut App, key: KeyEvent, runtime: &Runtime) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }
    if matches!(app.screen, Screen::Dashboard) {
        return handle_dashboard_key(app, key, runtime);
    }

    let mut form = match std::mem::replace(&mut app.screen, Screen::Dashboard) {
        Screen::Login(form) => form,
        Screen::Dashboard => return false,
    };
    match handle_login_key(app, &mut form, key, runtime) {
        LoginOutcome::Stay => app.screen = Screen::Login(form),
        LoginOutcome::LoggedIn => app.enter_dashboard(runtime),
        LoginOutcome::Quit => return true,
    }
    false
}

enum LoginOutcome {
    Stay,
    LoggedIn,
    Quit,
}

fn handle_login_key(
    app: &mut App,
    form: &mut LoginForm,
    key: KeyEvent,
    runtime: &Runtime,
) -> LoginOutcome {
    match key.code {
        KeyCode::Esc => return LoginOutcome::Quit,
        KeyCode::Enter => {
            if app.submit_login(form, runtime) {
                return LoginOutcome::LoggedIn;
            }
        }
        KeyCode::F(2) => form.toggle_mode(),
        KeyCode::Tab | KeyCode::Down => form.move_field(1),
        KeyCode::BackTab | KeyCode::Up => form.move_field(-1),
        KeyCode::Left => form.active_input_mut().move_left(),
        KeyCode::Right => form.active_input_mut().move_right(),
        KeyCode::Home => form.active_input_mut().move_home(),
        KeyCode::End => form.active_input_mut().move_end(),
        KeyCode::Backspace => form.active_input_mut().backspace(),
        KeyCode::Delete => form.active_input_mut().delete(),
        KeyCode::Char(c) => {
            if !key.modifiers.contains(KeyModifiers::CONTROL) {
                form.active_input_mut().insert(c);
            }
        }
        _ => {}
    }
    LoginOutcome::Stay
}

fn handle_dashboard_key(app: &mut App, key: KeyEvent, runtime: &Runtime) -> bool {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Tab => app.focus = app.focus.next(),
        KeyCode::Char('1') => app.focus = Focus::Initial,
        KeyCode::Char('2') => app.focus = Focus::Target,
        KeyCode::Char('3') => app.focus = Focus::History,
        KeyCode::Char('j') | KeyCode::Down => app.move_selection(1),
        KeyCode::Char('k') | KeyCode::Up => app.move_selection(-1),
        KeyCode::Char(' ') | KeyCode::Enter => app.pick(),
        KeyCode::Char('s') => app.save(runtime),
        KeyCode::Char('x') => app.reset_selection(),
        KeyCode::Char('r') => app.refresh(runtime),
        KeyCode::Char('c') => app.connect_spotify(),
        KeyCode::Char('p') => app.create_playlist(runtime),
        KeyCode::Char('L') => app.logout(),
        _ => {}
    }
    false
}
