//! UI rendering with Ratatui.

use crate::app::{App, AppState, Focus, FormField, InputMode, LoginField, TreeItemKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    prelude::*,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};
use vpwmgr_core::{Action, SecretStore};

/// Main render function.
pub fn render<S: SecretStore>(frame: &mut Frame, app: &App<S>) {
    match app.state {
        AppState::Locked => render_login(frame, app),
        AppState::Unlocked => render_unlocked(frame, app),
        AppState::Quit => {}
    }
}

/// Render the login screen.
fn render_login<S: SecretStore>(frame: &mut Frame, app: &App<S>) {
    let dialog_area = centered_rect(50, 9, frame.area());
    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .title(" vpwmgr - Vault Login ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(dialog_area);
    frame.render_widget(block, dialog_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    let masked = "*".repeat(app.login.password.chars().count());
    render_input(
        frame,
        "Vault ID",
        &app.login.id,
        chunks[0],
        app.login.active == LoginField::Id,
    );
    render_input(
        frame,
        "Password",
        &masked,
        chunks[1],
        app.login.active == LoginField::Password,
    );

    if let Some(ref error) = app.error_message {
        let error_msg = Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red));
        frame.render_widget(error_msg, chunks[3]);
    }

    let help = Paragraph::new("Tab: switch field | Enter: login | Esc: quit")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[4]);
}

fn render_input(frame: &mut Frame, label: &str, value: &str, area: Rect, active: bool) {
    let (marker, color) = if active {
        ("▸ ", Color::Yellow)
    } else {
        ("  ", Color::White)
    };
    let cursor = if active { "_" } else { "" };
    let line = Line::from(vec![
        Span::styled(marker, Style::default().fg(color)),
        Span::styled(format!("{label:<9}"), Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{value}{cursor}"), Style::default().fg(color)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// Render the main view with sidebar and entry form.
fn render_unlocked<S: SecretStore>(frame: &mut Frame, app: &App<S>) {
    let area = frame.area();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(rows[0]);

    render_sidebar(frame, app, chunks[0]);
    render_form(frame, app, chunks[1]);
    render_status(frame, app, rows[1]);
    render_help(frame, app, rows[2]);

    match app.input_mode {
        InputMode::Search => render_search_overlay(frame, app, area),
        InputMode::Confirm => render_confirm_overlay(frame, app, area),
        _ => {}
    }
}

/// Render the collection tree.
fn render_sidebar<S: SecretStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let is_focused = app.focus == Focus::Sidebar && app.input_mode == InputMode::Normal;
    let border_color = if is_focused { Color::Cyan } else { Color::DarkGray };

    let title = match app.manager.session().vault_id() {
        Some(id) => format!(" Collections ({id}) "),
        None => " Collections ".to_string(),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let items: Vec<ListItem> = app
        .tree_items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let indent = "  ".repeat(item.depth);
            let fold = if item.is_expanded {
                "▾"
            } else if item.has_children {
                "▸"
            } else {
                " "
            };

            let (icon, color) = match item.kind {
                TreeItemKind::Collection => (fold, Color::Magenta),
                TreeItemKind::Group => (fold, Color::Yellow),
                TreeItemKind::Entry(_) => ("•", Color::Cyan),
            };

            let style = if i == app.sidebar_selected_index {
                Style::default()
                    .bg(Color::Rgb(60, 60, 80))
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(color)
            };

            ListItem::new(Line::from(format!("{indent}{icon} {}", item.name))).style(style)
        })
        .collect();

    frame.render_widget(List::new(items), inner);
}

fn action_color(action: &Action) -> Color {
    match action {
        Action::New | Action::Update => Color::Green,
        Action::Rename | Action::Move => Color::Yellow,
        Action::Overwrite | Action::Invalid(_) => Color::Red,
        Action::Unchanged => Color::DarkGray,
    }
}

/// Render the entry form.
fn render_form<S: SecretStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let editing = app.input_mode == InputMode::Edit;
    let is_focused = app.focus == Focus::Form && matches!(app.input_mode, InputMode::Normal | InputMode::Edit);
    let border_color = if editing {
        Color::Yellow
    } else if is_focused {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let title = match app.manager.loaded() {
        Some(entry) => format!(" Entry {} ", entry.path),
        None => " New Entry ".to_string(),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // Collection
            Constraint::Length(1), // Group
            Constraint::Length(1), // Title
            Constraint::Length(1), // URL
            Constraint::Length(1), // User ID
            Constraint::Length(1), // Password
            Constraint::Min(3),    // Notes
            Constraint::Length(1), // Action
        ])
        .split(inner);

    for (i, field) in FormField::ALL.iter().copied().enumerate().take(6) {
        let value = match field {
            FormField::Collection => app
                .form_collection()
                .map(|id| format!("< {id} >"))
                .unwrap_or_default(),
            FormField::Password if !app.form.show_password => {
                "•".repeat(app.form.password.chars().count())
            }
            other => app.form.value(other).to_string(),
        };
        let color = match field {
            FormField::UserId => Color::Green,
            FormField::Password => Color::Yellow,
            FormField::Url => Color::Blue,
            _ => Color::White,
        };
        render_field(frame, field, &value, chunks[i], color, editing && app.form.active == field);
    }

    let notes_active = editing && app.form.active == FormField::Notes;
    let notes_block = Block::default().title(Span::styled(
        " Notes ",
        Style::default().fg(if notes_active { Color::Yellow } else { Color::DarkGray }),
    ));
    let notes_inner = notes_block.inner(chunks[6]);
    frame.render_widget(notes_block, chunks[6]);
    let notes = Paragraph::new(app.form.notes.as_str())
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: false });
    frame.render_widget(notes, notes_inner);

    if let Some(action) = app.current_action() {
        let line = Line::from(vec![
            Span::styled("Submit: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                action.to_string(),
                Style::default()
                    .fg(action_color(&action))
                    .add_modifier(Modifier::BOLD),
            ),
        ]);
        frame.render_widget(Paragraph::new(line), chunks[7]);
    }
}

fn render_field(frame: &mut Frame, field: FormField, value: &str, area: Rect, color: Color, active: bool) {
    let label_style = if active {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let cursor = if active && field != FormField::Collection { "_" } else { "" };
    let line = Line::from(vec![
        Span::styled(format!("{:<11}", format!("{}:", field.label())), label_style),
        Span::styled(format!("{value}{cursor}"), Style::default().fg(color)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_status<S: SecretStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
    if let Some(ref status) = app.status {
        let status = Paragraph::new(status.as_str()).style(Style::default().fg(Color::White));
        frame.render_widget(status, area);
    }
}

fn render_help<S: SecretStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let help = match app.input_mode {
        InputMode::Edit => {
            "Tab/↑↓: field | ←→: collection | ^S: update | ^A: add new | ^R: show password | Esc: done"
        }
        InputMode::Confirm => "y: confirm | n: cancel",
        InputMode::Search => "↑↓: select | Enter: open | Esc: close",
        _ => "Enter: open | e: edit | n: new | u: update | a: add | d: delete | r: refresh | /: search | L: logout | q: quit",
    };
    let help = Paragraph::new(help).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, area);
}

/// Render the search overlay.
fn render_search_overlay<S: SecretStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let dialog_width = 60.min(area.width.saturating_sub(4));
    let dialog_height = 15.min(area.height.saturating_sub(4));
    let dialog_area = centered_rect(dialog_width, dialog_height, area);

    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .title(" Search ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let inner = block.inner(dialog_area);
    frame.render_widget(block, dialog_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(inner);

    let input_line = Line::from(vec![
        Span::styled("▸ ", Style::default().fg(Color::Magenta)),
        Span::styled(&app.search_query, Style::default().fg(Color::White)),
        Span::styled("_", Style::default().fg(Color::White).add_modifier(Modifier::SLOW_BLINK)),
    ]);
    frame.render_widget(Paragraph::new(input_line), chunks[0]);

    if !app.search_results.is_empty() {
        let items: Vec<ListItem> = app
            .search_results
            .iter()
            .enumerate()
            .map(|(i, result)| {
                let style = if i == app.search_selected_index {
                    Style::default()
                        .bg(Color::Rgb(60, 40, 80))
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };

                let line = Line::from(vec![
                    Span::styled(&result.path.title, style),
                    Span::raw(" "),
                    Span::styled(&result.label, Style::default().fg(Color::DarkGray)),
                ]);

                ListItem::new(line).style(style)
            })
            .collect();

        frame.render_widget(List::new(items), chunks[1]);
    } else if !app.search_query.is_empty() {
        let no_results = Paragraph::new("No results found")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(no_results, chunks[1]);
    }
}

fn render_confirm_overlay<S: SecretStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let dialog_area = centered_rect(60.min(area.width.saturating_sub(4)), 5, area);
    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .title(" Confirm ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));
    let inner = block.inner(dialog_area);
    frame.render_widget(block, dialog_area);

    let question = app.status.as_deref().unwrap_or("Are you sure? (y/n)");
    let paragraph = Paragraph::new(question)
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

/// Helper to create a centered rectangle.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use ratatui::backend::TestBackend;
    use vpwmgr_core::{MemoryStore, PasswordManager};

    fn screen(app: &App<MemoryStore>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn login_screen_masks_password() {
        let mut app = App::new(PasswordManager::new(MemoryStore::demo()), &Config::default());
        app.login.id = "psparks".into();
        app.login.password = "secret".into();
        let text = screen(&app);
        assert!(text.contains("Vault Login"));
        assert!(text.contains("psparks"));
        assert!(!text.contains("secret"));
        assert!(text.contains("******"));
    }

    #[test]
    fn form_shows_pending_action() {
        let mut app = App::new(PasswordManager::new(MemoryStore::demo()), &Config::default());
        app.login.id = "psparks".into();
        app.login.password = "pw".into();
        app.try_login();
        app.form.group = "web".into();
        app.form.title = "Facepalm".into();
        let text = screen(&app);
        assert!(text.contains("psparks (personal)"));
        assert!(text.contains("Submit: New"));
    }
}
