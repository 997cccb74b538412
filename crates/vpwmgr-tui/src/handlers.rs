//! Keyboard event handling.

use crate::app::{App, AppState, Focus, FormField, InputMode};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use vpwmgr_core::SecretStore;

/// Handle a key event. Returns true if the app should quit.
pub fn handle_key<S: SecretStore>(app: &mut App<S>, key: KeyEvent) -> bool {
    match app.input_mode {
        InputMode::Login => handle_login_key(app, key),
        InputMode::Normal => handle_normal_key(app, key),
        InputMode::Edit => handle_edit_key(app, key),
        InputMode::Search => handle_search_key(app, key),
        InputMode::Confirm => handle_confirm_key(app, key),
    }
}

fn ctrl(key: &KeyEvent, c: char) -> bool {
    key.code == KeyCode::Char(c) && key.modifiers.contains(KeyModifiers::CONTROL)
}

fn handle_login_key<S: SecretStore>(app: &mut App<S>, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Enter => {
            app.try_login();
            false
        }
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            app.login.toggle();
            false
        }
        KeyCode::Char(c) => {
            app.login.input_mut().push(c);
            false
        }
        KeyCode::Backspace => {
            app.login.input_mut().pop();
            false
        }
        KeyCode::Esc => {
            app.state = AppState::Quit;
            true
        }
        _ => false,
    }
}

fn handle_normal_key<S: SecretStore>(app: &mut App<S>, key: KeyEvent) -> bool {
    if ctrl(&key, 'c') {
        app.state = AppState::Quit;
        return true;
    }

    if ctrl(&key, 'p') {
        app.start_search();
        return false;
    }

    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::Quit;
            true
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if app.focus == Focus::Sidebar {
                app.move_down();
            }
            false
        }
        KeyCode::Char('k') | KeyCode::Up => {
            if app.focus == Focus::Sidebar {
                app.move_up();
            }
            false
        }
        KeyCode::Char('h') | KeyCode::Left => {
            if app.focus == Focus::Sidebar {
                app.collapse_current();
            }
            false
        }
        KeyCode::Char('l') | KeyCode::Right => {
            if app.focus == Focus::Sidebar {
                app.expand_current();
            }
            false
        }
        KeyCode::Enter => {
            match app.focus {
                Focus::Sidebar => app.select_current_item(),
                Focus::Form => app.input_mode = InputMode::Edit,
            }
            false
        }
        KeyCode::Tab => {
            app.focus = match app.focus {
                Focus::Sidebar => Focus::Form,
                Focus::Form => Focus::Sidebar,
            };
            false
        }
        KeyCode::Char('e') => {
            app.focus = Focus::Form;
            app.input_mode = InputMode::Edit;
            false
        }
        KeyCode::Char('/') => {
            app.start_search();
            false
        }
        KeyCode::Char('n') => {
            app.clear_form();
            app.focus = Focus::Form;
            app.form.active = FormField::Group;
            app.input_mode = InputMode::Edit;
            app.status = Some("New entry".to_string());
            false
        }
        KeyCode::Char('a') => {
            app.submit(true, false);
            false
        }
        KeyCode::Char('u') => {
            app.submit(false, false);
            false
        }
        KeyCode::Char('d') => {
            app.request_delete();
            false
        }
        KeyCode::Char('r') => {
            app.refresh();
            false
        }
        KeyCode::Char('L') => {
            app.logout();
            false
        }
        KeyCode::Esc => {
            if app.focus == Focus::Form {
                app.focus = Focus::Sidebar;
            }
            false
        }
        _ => false,
    }
}

fn handle_edit_key<S: SecretStore>(app: &mut App<S>, key: KeyEvent) -> bool {
    if ctrl(&key, 's') {
        app.submit(false, false);
        return false;
    }
    if ctrl(&key, 'a') {
        app.submit(true, false);
        return false;
    }
    if ctrl(&key, 'r') {
        app.form.show_password = !app.form.show_password;
        return false;
    }
    // Unbound chords are not text
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return false;
    }

    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Tab | KeyCode::Down => {
            app.form.active = app.form.active.next();
        }
        KeyCode::BackTab | KeyCode::Up => {
            app.form.active = app.form.active.prev();
        }
        KeyCode::Left if app.form.active == FormField::Collection => {
            app.cycle_collection(false);
        }
        KeyCode::Right if app.form.active == FormField::Collection => {
            app.cycle_collection(true);
        }
        KeyCode::Enter => {
            if app.form.active == FormField::Notes {
                app.form.notes.push('\n');
            } else {
                app.form.active = app.form.active.next();
            }
        }
        KeyCode::Char(c) => {
            if let Some(input) = app.form.input_mut() {
                input.push(c);
            }
        }
        KeyCode::Backspace => {
            if let Some(input) = app.form.input_mut() {
                input.pop();
            }
        }
        _ => {}
    }
    false
}

fn handle_search_key<S: SecretStore>(app: &mut App<S>, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => {
            app.exit_search();
            false
        }
        KeyCode::Enter => {
            app.select_search_result();
            false
        }
        KeyCode::Up => {
            if app.search_selected_index > 0 {
                app.search_selected_index -= 1;
            }
            false
        }
        KeyCode::Down => {
            if app.search_selected_index + 1 < app.search_results.len() {
                app.search_selected_index += 1;
            }
            false
        }
        KeyCode::Char(c) => {
            app.search_query.push(c);
            app.perform_search();
            false
        }
        KeyCode::Backspace => {
            app.search_query.pop();
            app.perform_search();
            false
        }
        _ => false,
    }
}

fn handle_confirm_key<S: SecretStore>(app: &mut App<S>, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm(true),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.confirm(false),
        _ => {}
    }
    false
}
