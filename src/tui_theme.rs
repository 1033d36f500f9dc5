// tui-devconsole/src/tui_theme.rs
use ratatui::style::{Color, Modifier, Style};

use crate::console::Category;

pub const BORDER_DEFAULT: Color = Color::Rgb(100, 100, 100);
pub const BORDER_FOCUSED: Color = Color::Yellow;
pub const BORDER_UNFOCUSED: Color = Color::Rgb(70, 70, 70);
pub const SEARCH_HIGHLIGHT_COLOR: Color = Color::Rgb(240, 180, 0);

pub const TEXT_FG: Color = Color::White;
pub const TEXT_BG: Color = Color::Black;
pub const ACTIVE_FG: Color = Color::Cyan;
pub const SELECTED_FG: Color = Color::Black;
pub const SELECTED_BG: Color = Color::Yellow;
pub const UNFOCUSED_FG: Color = Color::Rgb(170, 170, 170);
pub const HINT_FG: Color = Color::Rgb(70, 70, 70);

pub const PANEL_BG: Color = Color::Rgb(30, 30, 30);
pub const TITLE_BG: Color = Color::Rgb(51, 51, 51);
pub const LOG_FG: Color = Color::Rgb(220, 220, 220);
pub const WARN_FG: Color = Color::Rgb(253, 214, 99);
pub const ERROR_FG: Color = Color::Rgb(242, 139, 130);
pub const OBJECT_FG: Color = Color::Rgb(138, 212, 241);
pub const TIMESTAMP_FG: Color = Color::Rgb(120, 120, 120);

#[cfg(windows)]
pub const RESIZE_HANDLE: &str = "+";
#[cfg(not(windows))]
pub const RESIZE_HANDLE: &str = "◢";

pub fn category_fg(category: Category) -> Color {
    match category {
        Category::Log => LOG_FG,
        Category::Warn => WARN_FG,
        Category::Error => ERROR_FG,
    }
}

pub fn panel_style() -> Style {
    Style::default().fg(TEXT_FG).bg(PANEL_BG)
}

pub fn title_style() -> Style {
    Style::default()
        .fg(TEXT_FG)
        .bg(TITLE_BG)
        .add_modifier(Modifier::BOLD)
}

pub fn prompt_style() -> Style {
    Style::default().fg(ACTIVE_FG).add_modifier(Modifier::BOLD)
}

pub fn mark_style() -> Style {
    Style::default().fg(TEXT_BG).bg(SEARCH_HIGHLIGHT_COLOR)
}

pub fn button_style() -> Style {
    Style::default().fg(TEXT_FG).bg(TITLE_BG)
}

pub fn button_selected_style() -> Style {
    Style::default().fg(SELECTED_FG).bg(SELECTED_BG)
}
