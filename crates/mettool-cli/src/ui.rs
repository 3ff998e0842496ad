//! Styled console lines.

use console::{style, Color};

/// Colours are off when `NO_COLOR` is set.
#[must_use]
pub fn is_color_disabled() -> bool {
    std::env::var_os("NO_COLOR").is_some()
}

fn render(tag: &str, color: Color, message: &str) -> String {
    if is_color_disabled() {
        format!("{tag} {message}")
    } else {
        format!("{} {message}", style(tag).bold().fg(color))
    }
}

pub fn print_header(text: &str) {
    if is_color_disabled() {
        println!("== {text} ==");
    } else {
        println!("{}", style(format!("== {text} ==")).bold().cyan());
    }
}

pub fn print_success(text: &str) {
    println!("{}", render("[OK]", Color::Green, text));
}

pub fn print_error(text: &str) {
    eprintln!("{}", render("[ERROR]", Color::Red, text));
}

/// Indented detail line under a header.
pub fn print_detail(text: &str) {
    if is_color_disabled() {
        println!("  {text}");
    } else {
        println!("  {}", style(text).dim());
    }
}
