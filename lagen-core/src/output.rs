//! Terminal output formatting
//!
//! Status lines are built by pure functions; nothing here holds global state.

use owo_colors::{OwoColorize, Stream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Header,
    Info,
    Success,
    Warning,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Info,
    Success,
    Warning,
    Error,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Status::Info => "[Info]   ",
            Status::Success => "[Success]",
            Status::Warning => "[Warning]",
            Status::Error => "[Error]  ",
        }
    }

    fn color(self) -> Color {
        match self {
            Status::Info => Color::Info,
            Status::Success => Color::Success,
            Status::Warning => Color::Warning,
            Status::Error => Color::Fail,
        }
    }

    fn stream(self) -> Stream {
        match self {
            Status::Warning | Status::Error => Stream::Stderr,
            Status::Info | Status::Success => Stream::Stdout,
        }
    }
}

/// Color `text` for `stream`, or leave it plain when the stream has no color support.
pub fn paint(color: Color, text: &str, stream: Stream) -> String {
    match color {
        Color::Header => text.if_supports_color(stream, |t| t.magenta()).to_string(),
        Color::Info => text.if_supports_color(stream, |t| t.blue()).to_string(),
        Color::Success => text.if_supports_color(stream, |t| t.green()).to_string(),
        Color::Warning => text.if_supports_color(stream, |t| t.yellow()).to_string(),
        Color::Fail => text.if_supports_color(stream, |t| t.red()).to_string(),
    }
}

/// `[Label] message`, label colored.
pub fn status_line(status: Status, message: &str) -> String {
    format!(
        "{} {}",
        paint(status.color(), status.label(), status.stream()),
        message
    )
}

/// Underlined title centered under a dashed rule.
pub fn header(title: &str) -> String {
    let title = paint(Color::Header, title, Stream::Stdout)
        .if_supports_color(Stream::Stdout, |t| t.underline())
        .to_string();
    format!("{}\n{:^60}\n", "-".repeat(50), title)
}

pub fn print_status(status: Status, message: &str) {
    let line = status_line(status, message);
    match status.stream() {
        Stream::Stderr => eprintln!("{line}"),
        _ => println!("{line}"),
    }
}
