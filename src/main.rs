//! plugdeck - Actor-based terminal dashboard for shared smart plugs
//!
//! Architecture:
//! - UI Layer (Ratatui) - synchronous terminal rendering
//! - App Layer - central state machine processing events
//! - Network Layer (Tokio) - async backend calls

use std::io;
use std::time::Duration;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::*,
};
use tokio::sync::mpsc;

use plugdeck::admin::{AdminPanel, AdminPopup, CreateUserField, ResetField};
use plugdeck::config::{data_dir, Config};
use plugdeck::constants::{APP_NAME, LOG_FILE};
use plugdeck::dashboard::TableRow;
use plugdeck::messages::ui_events::{key_to_ui_event, LoginField, Screen};
use plugdeck::messages::{NetworkCommand, NetworkResponse, RenderState, UiEvent};
use plugdeck::storage::FileTokenStore;
use plugdeck::ui::{
    alert_color, checkbox, control_span, mask, render_input, render_tabs, role_color, status_badge,
};
use plugdeck::{ApiClient, AppActor, AppState, NetworkActor};

/// Terminal cleanup guard
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging to file
    let file_appender = tracing_appender::rolling::never(".", LOG_FILE);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    let config = Config::load()?;
    let client = ApiClient::new(&config)?;
    let store = FileTokenStore::new(data_dir());
    tracing::info!(base_url = %config.base_url, "Starting {}", APP_NAME);

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let _terminal_guard = TerminalGuard;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create channels
    let (ui_tx, ui_rx) = mpsc::unbounded_channel::<UiEvent>();
    let (net_cmd_tx, net_cmd_rx) = mpsc::unbounded_channel::<NetworkCommand>();
    let (net_resp_tx, net_resp_rx) = mpsc::unbounded_channel::<NetworkResponse>();
    let (render_tx, mut render_rx) = mpsc::unbounded_channel::<RenderState>();

    // Spawn network actor
    let network_actor = NetworkActor::new(client, net_resp_tx);
    tokio::spawn(network_actor.run(net_cmd_rx));

    // Spawn app actor
    let state = AppState::new(config, Box::new(store));
    let app_actor = AppActor::new(state, net_cmd_tx, render_tx);
    tokio::spawn(app_actor.run(ui_rx, net_resp_rx));

    // Run UI loop (synchronous with async polling)
    run_ui_loop(&mut terminal, ui_tx, &mut render_rx).await?;

    tracing::info!("Exiting");
    Ok(())
}

/// Run the synchronous UI rendering loop
async fn run_ui_loop(
    terminal: &mut Terminal<impl Backend>,
    ui_tx: mpsc::UnboundedSender<UiEvent>,
    render_rx: &mut mpsc::UnboundedReceiver<RenderState>,
) -> anyhow::Result<()> {
    let mut current_state = RenderState::default();

    loop {
        // Draw with current state
        terminal.draw(|f| draw_ui(f, &current_state))?;

        // Poll for events with timeout
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if let Some(event) = key_to_ui_event(
                    key,
                    current_state.screen,
                    current_state.popup_kind(),
                    current_state.show_help,
                ) {
                    if matches!(event, UiEvent::Quit) {
                        let _ = ui_tx.send(event);
                        break;
                    }
                    let _ = ui_tx.send(event);
                }
            }
        }

        // Check for state updates (non-blocking)
        while let Ok(state) = render_rx.try_recv() {
            current_state = state;
        }
    }

    Ok(())
}

// ============================================================================
// UI Drawing Functions
// ============================================================================

fn draw_ui(f: &mut Frame, state: &RenderState) {
    let area = f.area();

    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title bar
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Alert
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    draw_title_bar(f, state, main_chunks[0]);

    match state.screen {
        Screen::Login => draw_login(f, state, main_chunks[1]),
        Screen::Dashboard => draw_dashboard(f, state, main_chunks[1]),
        Screen::Admin => draw_admin(f, state, main_chunks[1]),
    }

    draw_alert(f, state, main_chunks[2]);
    draw_status_bar(f, state, main_chunks[3]);

    // Popups
    if state.screen == Screen::Admin {
        if let Some(popup) = &state.admin.popup {
            draw_admin_popup(f, popup, area);
        }
    }

    if state.show_help {
        draw_help_popup(f, area);
    }
}

fn draw_title_bar(f: &mut Frame, state: &RenderState, area: Rect) {
    let mut spans = vec![
        Span::styled(" plugdeck ", Style::default().fg(Color::Black).bg(Color::Cyan).bold()),
        Span::raw(" "),
    ];
    if let Some(identity) = &state.identity {
        let label = if identity.is_empty() { "?" } else { identity.as_str() };
        spans.push(Span::styled(
            format!("user: {} ", label),
            Style::default().fg(Color::Yellow),
        ));
    }
    spans.push(Span::styled(
        state.base_url.clone(),
        Style::default().fg(Color::DarkGray),
    ));
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_login(f: &mut Frame, state: &RenderState, area: Rect) {
    let form_area = centered_rect(50, 60, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Login ")
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(form_area);
    f.render_widget(block, form_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2), // Expiry notice
            Constraint::Length(3), // Username
            Constraint::Length(3), // Password
            Constraint::Length(1),
            Constraint::Min(1),    // Error / progress
        ])
        .split(inner);

    let login = &state.login;
    if login.expired {
        let notice = Paragraph::new("Your session has expired. Please log in again.")
            .style(Style::default().fg(Color::Yellow))
            .wrap(Wrap { trim: true });
        f.render_widget(notice, chunks[0]);
    }

    f.render_widget(
        render_input(login.username.clone(), " Username ", login.field == LoginField::Username),
        chunks[1],
    );
    f.render_widget(
        render_input(mask(login.password_len), " Password ", login.field == LoginField::Password),
        chunks[2],
    );

    let footer = if login.submitting {
        Paragraph::new("Logging in...").style(Style::default().fg(Color::Cyan))
    } else if let Some(error) = &login.error {
        Paragraph::new(error.as_str())
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true })
    } else {
        Paragraph::new("")
    };
    f.render_widget(footer, chunks[4]);
}

fn draw_dashboard(f: &mut Frame, state: &RenderState, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Plugs ")
        .border_style(Style::default().fg(Color::Cyan));

    if !state.loaded {
        let loading = Paragraph::new("Loading plugs...")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(loading, area);
        return;
    }

    let header = Row::new(vec!["Plug", "IP", "Power", "Users", "Mine", "Actions"])
        .style(Style::default().fg(Color::Yellow).bold());

    let rows: Vec<Row> = state
        .rows
        .iter()
        .map(|row| match row {
            TableRow::Placeholder(text) => Row::new(vec![Cell::from(text.clone())])
                .style(Style::default().fg(Color::DarkGray)),
            TableRow::Device(device) => Row::new(vec![
                Cell::from(device.name.clone()),
                Cell::from(device.ip.clone().unwrap_or_else(|| String::from("-"))),
                Cell::from(Line::from(status_badge(device.status))),
                Cell::from(device.active_user_count.to_string()),
                Cell::from(if device.used_by_me { "yes" } else { "" }),
                Cell::from(Line::from(vec![
                    control_span("Use", device.use_enabled),
                    Span::raw(" "),
                    control_span("Leave", device.leave_enabled),
                ])),
            ]),
        })
        .collect();

    let widths = [
        Constraint::Percentage(25),
        Constraint::Length(16),
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Length(5),
        Constraint::Min(16),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");

    let has_devices = state.rows.iter().any(|r| matches!(r, TableRow::Device(_)));
    let mut table_state = TableState::default();
    if has_devices {
        table_state.select(Some(state.selected_row));
    }
    f.render_stateful_widget(table, area, &mut table_state);
}

fn draw_admin(f: &mut Frame, state: &RenderState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    let selected = match state.admin.panel {
        AdminPanel::Users => 0,
        AdminPanel::Permissions => 1,
    };
    f.render_widget(render_tabs(&[" Users ", " Permissions "], selected), chunks[0]);

    match state.admin.panel {
        AdminPanel::Users => draw_users_panel(f, state, chunks[1]),
        AdminPanel::Permissions => draw_permissions_panel(f, state, chunks[1]),
    }
}

fn draw_users_panel(f: &mut Frame, state: &RenderState, area: Rect) {
    let admin = &state.admin;
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Users ")
        .border_style(Style::default().fg(Color::Cyan));

    if !admin.users_loaded {
        f.render_widget(Paragraph::new("Loading users...").block(block), area);
        return;
    }
    if admin.users.is_empty() {
        let empty = Paragraph::new("No users are registered.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let me = state.identity.as_deref().unwrap_or("");
    let rows: Vec<Row> = admin
        .users
        .iter()
        .map(|user| {
            let name = if user.username == me {
                format!("{} (me)", user.username)
            } else {
                user.username.clone()
            };
            Row::new(vec![
                Cell::from(user.id.to_string()),
                Cell::from(name),
                Cell::from(Span::styled(
                    user.role.label(),
                    Style::default().fg(role_color(user.role)),
                )),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [Constraint::Length(6), Constraint::Min(20), Constraint::Length(14)],
    )
    .header(Row::new(vec!["ID", "Username", "Role"]).style(Style::default().fg(Color::Yellow).bold()))
    .block(block)
    .row_highlight_style(Style::default().bg(Color::DarkGray))
    .highlight_symbol("> ");

    let mut table_state = TableState::default().with_selected(Some(admin.selected_user));
    f.render_stateful_widget(table, area, &mut table_state);
}

fn draw_permissions_panel(f: &mut Frame, state: &RenderState, area: Rect) {
    let admin = &state.admin;
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Plug permissions ")
        .border_style(Style::default().fg(Color::Cyan));

    if !admin.matrix_loaded {
        f.render_widget(Paragraph::new("Loading permissions...").block(block), area);
        return;
    }

    let matrix = &admin.matrix;
    let mut header = vec![Cell::from("User")];
    header.extend(matrix.plugs.iter().map(|p| Cell::from(p.name.clone())));

    let mut rows: Vec<Row> = matrix
        .rows
        .iter()
        .enumerate()
        .map(|(r, user)| {
            let mut cells = vec![Cell::from(user.username.clone())];
            cells.extend(matrix.plugs.iter().enumerate().map(|(c, plug)| {
                let mark = checkbox(user.allowed_plugs.contains(&plug.name));
                let style = if r == admin.matrix_row && c == admin.matrix_col {
                    Style::default().fg(Color::Black).bg(Color::Yellow)
                } else {
                    Style::default()
                };
                Cell::from(Span::styled(mark, style))
            }));
            Row::new(cells)
        })
        .collect();

    if !matrix.admins.is_empty() {
        rows.push(
            Row::new(vec![Cell::from(format!(
                "Administrators (all plugs): {}",
                matrix.admins.join(", ")
            ))])
            .style(Style::default().fg(Color::DarkGray)),
        );
    }

    let mut widths = vec![Constraint::Length(20)];
    widths.extend(matrix.plugs.iter().map(|p| Constraint::Length(p.name.chars().count().max(3) as u16 + 2)));

    let table = Table::new(rows, widths)
        .header(Row::new(header).style(Style::default().fg(Color::Yellow).bold()))
        .block(block);
    f.render_widget(table, area);
}

fn draw_admin_popup(f: &mut Frame, popup: &AdminPopup, area: Rect) {
    match popup {
        AdminPopup::CreateUser(form) => {
            let popup_area = centered_rect(50, 50, area);
            let block = popup_block(" New user (Tab: next field, Space: role, Enter: create, Esc: cancel) ");
            let inner = block.inner(popup_area);
            f.render_widget(Clear, popup_area);
            f.render_widget(block, popup_area);

            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .margin(1)
                .constraints([Constraint::Length(3), Constraint::Length(3), Constraint::Length(3)])
                .split(inner);
            f.render_widget(
                render_input(form.username.clone(), " Username ", form.field == CreateUserField::Username),
                chunks[0],
            );
            f.render_widget(
                render_input(
                    mask(form.password.chars().count()),
                    " Password ",
                    form.field == CreateUserField::Password,
                ),
                chunks[1],
            );
            f.render_widget(
                render_input(form.role.label().to_string(), " Role ", form.field == CreateUserField::Role),
                chunks[2],
            );
        }
        AdminPopup::ResetPassword(form) => {
            let popup_area = centered_rect(50, 40, area);
            let title = format!(" Reset password of {} (Enter: save, Esc: cancel) ", form.username);
            let block = popup_block(&title);
            let inner = block.inner(popup_area);
            f.render_widget(Clear, popup_area);
            f.render_widget(block, popup_area);

            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .margin(1)
                .constraints([Constraint::Length(3), Constraint::Length(3)])
                .split(inner);
            f.render_widget(
                render_input(
                    mask(form.new_password.chars().count()),
                    " New password ",
                    form.field == ResetField::NewPassword,
                ),
                chunks[0],
            );
            f.render_widget(
                render_input(
                    mask(form.confirm.chars().count()),
                    " Confirm ",
                    form.field == ResetField::Confirm,
                ),
                chunks[1],
            );
        }
        AdminPopup::ConfirmDelete { username, .. } => {
            let popup_area = centered_rect(40, 20, area);
            let text = format!("\n Delete user '{}'? This cannot be undone.\n\n y: delete   n: cancel", username);
            let dialog = Paragraph::new(text)
                .block(popup_block(" Confirm "))
                .wrap(Wrap { trim: false });
            f.render_widget(Clear, popup_area);
            f.render_widget(dialog, popup_area);
        }
        AdminPopup::EditPermissions(editor) => {
            let popup_area = centered_rect(50, 60, area);
            let title = format!(" Plugs of {} (Space: toggle, Enter: save, Esc: cancel) ", editor.username);
            let items: Vec<ListItem> = editor
                .entries
                .iter()
                .map(|(name, checked)| ListItem::new(format!("{} {}", checkbox(*checked), name)))
                .collect();
            let list = List::new(items)
                .block(popup_block(&title))
                .highlight_style(Style::default().fg(Color::Yellow).bold())
                .highlight_symbol("> ");
            let mut list_state = ListState::default().with_selected(Some(editor.cursor));
            f.render_widget(Clear, popup_area);
            f.render_stateful_widget(list, popup_area, &mut list_state);
        }
    }
}

fn popup_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .style(Style::default().bg(Color::Black))
}

fn draw_alert(f: &mut Frame, state: &RenderState, area: Rect) {
    if let Some(alert) = &state.alert {
        let line = Paragraph::new(format!(" {}", alert.message))
            .style(Style::default().fg(alert_color(alert.kind)).bold());
        f.render_widget(line, area);
    }
}

fn draw_status_bar(f: &mut Frame, state: &RenderState, area: Rect) {
    let status = match state.screen {
        Screen::Login => " Tab:next field | Enter:log in | Esc:quit ",
        Screen::Dashboard => " ↑↓:select | u:use | l:leave | r:refresh | a:admin | o:logout | ?:help | q:quit ",
        Screen::Admin => match state.admin.panel {
            AdminPanel::Users => {
                " Tab:permissions | n:new | p:password | d:delete | e:plugs | r:reload | Esc:back | q:quit "
            }
            AdminPanel::Permissions => {
                " Tab:users | arrows:move | Space:toggle | e:edit user | r:reload | Esc:back | q:quit "
            }
        },
    };

    let bar = Paragraph::new(status)
        .style(Style::default().fg(Color::DarkGray));
    f.render_widget(bar, area);
}

fn draw_help_popup(f: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);

    let help_text = r#"
 PLUGDECK - Keyboard Shortcuts

 DASHBOARD
   ↑ / ↓ (k / j)      Select plug
   u / Enter          Use the selected plug
   l                  Leave the selected plug
   r                  Refresh now
   a                  Admin console
   o                  Log out

 ADMIN CONSOLE
   Tab                Users / Permissions
   n                  New user
   p                  Reset password
   d                  Delete user
   e                  Edit a user's plugs
   Space / Enter      Grant or revoke (matrix)
   r                  Reload
   Esc / b            Back to dashboard

 GENERAL
   ?                  Toggle this help
   q / Ctrl+C         Quit

 Press any key to close...
"#;

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Help ")
        .style(Style::default().bg(Color::Black));

    let help = Paragraph::new(help_text)
        .block(block)
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, popup_area);
    f.render_widget(help, popup_area);
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
