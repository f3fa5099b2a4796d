use std::io::{self, Write};
use std::sync::OnceLock;

use crossterm::style::Stylize;
use regex::{Captures, Regex};

use super::conversation_state::{ConversationState, Message, Role};
use super::session::API_ERROR_TAG;

const INDENT: &str = "  ";

fn display_math() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\\\[(.+?)\\\]").expect("valid regex"))
}

fn inline_math() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\\\((.+?)\\\)").expect("valid regex"))
}

/// Rewrite `\[ … \]` as `$$ … $$` and `\( … \)` as `$ … $`, the delimiters
/// markdown math renderers understand.
pub fn normalize_latex(text: &str) -> String {
    let text = display_math().replace_all(text, |caps: &Captures| format!("$${}$$", &caps[1]));
    inline_math()
        .replace_all(&text, |caps: &Captures| format!("${}$", &caps[1]))
        .into_owned()
}

/// Print one message as a labelled, indented block.
pub fn write_message(out: &mut dyn Write, message: &Message) -> io::Result<()> {
    match message.role() {
        Role::User => writeln!(out, "{}", "You".bold().blue())?,
        Role::Assistant => writeln!(out, "{}", "VERTEX".bold().cyan())?,
        Role::System => writeln!(out, "{}", "System".bold().dark_grey())?,
    }

    let body = match message.role() {
        Role::Assistant => normalize_latex(message.content()),
        _ => message.content().to_string(),
    };
    let failed = message.role() == Role::Assistant && body.starts_with(API_ERROR_TAG);

    for line in body.lines() {
        if failed {
            writeln!(out, "{}{}", INDENT, line.red())?;
        } else {
            writeln!(out, "{}{}", INDENT, line)?;
        }
    }
    writeln!(out)?;
    Ok(())
}

pub fn write_transcript(out: &mut dyn Write, conversation: &ConversationState) -> io::Result<()> {
    if conversation.is_empty() {
        writeln!(out, "{}", "No messages yet.".dark_grey())?;
        return Ok(());
    }
    for message in conversation.iter() {
        write_message(out, message)?;
    }
    Ok(())
}
