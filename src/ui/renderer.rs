// Style helpers shared by the layout

use {
    crate::{blocklist::BlockControl, state::ConnectionStatus},
    ratatui::style::{Color, Modifier, Style},
};

/// Header indicator style
pub fn status_style(status: ConnectionStatus) -> Style {
    let color = match status {
        ConnectionStatus::Live => Color::Green,
        ConnectionStatus::Offline => Color::Red,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

pub fn category_color(category: &str) -> Color {
    match category {
        "Internal" => Color::Cyan,
        "External" => Color::Magenta,
        _ => Color::Gray,
    }
}

/// Anything that was not allowed is drawn in red
pub fn action_color(action: &str) -> Color {
    if action.starts_with("allow") {
        Color::Green
    } else if action.starts_with("block") || action.starts_with("deny") || action.starts_with("drop") {
        Color::Red
    } else {
        Color::Yellow
    }
}

pub fn control_style(control: BlockControl) -> Style {
    match control {
        BlockControl::Block => Style::default().fg(Color::Yellow),
        BlockControl::Blocking => Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        BlockControl::Blocked => Style::default().fg(Color::Red).add_modifier(Modifier::DIM),
    }
}
