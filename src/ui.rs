use ratatui::{prelude::*, widgets::*};

use crate::messages::render::AlertKind;
use crate::models::{DeviceStatus, Role};

/// Renders a single-line input field
pub fn render_input<'a>(content: String, title: &'a str, is_focused: bool) -> Paragraph<'a> {
    let style = if is_focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(title);

    let content = if is_focused { format!("{}_", content) } else { content };
    Paragraph::new(content).block(block)
}

/// Password fields show one bullet per character
pub fn mask(len: usize) -> String {
    "•".repeat(len)
}

/// Renders tabs
pub fn render_tabs<'a>(titles: &[&'a str], selected: usize) -> Tabs<'a> {
    let titles: Vec<Line> = titles.iter().map(|t| Line::from(*t)).collect();

    Tabs::new(titles)
        .select(selected)
        .style(Style::default().fg(Color::DarkGray))
        .highlight_style(Style::default().fg(Color::Yellow).bold())
        .divider("|")
}

/// Power badge: success marker when on, neutral when off, `?` when unknown
pub fn status_badge(status: DeviceStatus) -> Span<'static> {
    match status {
        DeviceStatus::On => Span::styled("● ON ", Style::default().fg(Color::Green).bold()),
        DeviceStatus::Off => Span::styled("○ OFF", Style::default().fg(Color::Gray)),
        DeviceStatus::Unknown => Span::styled("  ?  ", Style::default().fg(Color::Yellow)),
    }
}

/// Button-like label, dimmed when disabled
pub fn control_span(label: &str, enabled: bool) -> Span<'static> {
    if enabled {
        Span::styled(format!("[{}]", label), Style::default().fg(Color::Cyan).bold())
    } else {
        Span::styled(format!("[{}]", label), Style::default().fg(Color::DarkGray))
    }
}

pub fn checkbox(checked: bool) -> &'static str {
    if checked {
        "[x]"
    } else {
        "[ ]"
    }
}

pub fn alert_color(kind: AlertKind) -> Color {
    match kind {
        AlertKind::Success => Color::Green,
        AlertKind::Error => Color::Red,
    }
}

pub fn role_color(role: Role) -> Color {
    match role {
        Role::Admin => Color::Magenta,
        Role::User => Color::Blue,
    }
}
