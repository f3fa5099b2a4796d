use winnow::ascii::space1;
use winnow::combinator::{alt, preceded};
use winnow::prelude::*;
use winnow::token::rest;

/// A slash command typed at the chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Attach(String),
    Detach,
    History,
    Clear,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    Prompt(String),
    Unknown(String),
}

/// Anything not starting with `/` is a prompt for the assistant and is kept
/// exactly as typed.
pub fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    if !trimmed.starts_with('/') {
        return Input::Prompt(line.to_string());
    }

    match command.parse(trimmed) {
        Ok(command) => Input::Command(command),
        Err(_) => Input::Unknown(trimmed.to_string()),
    }
}

fn command(input: &mut &str) -> ModalResult<Command> {
    alt((
        preceded(("/attach", space1), rest).map(|path| Command::Attach(unquote(path))),
        "/detach".value(Command::Detach),
        "/history".value(Command::History),
        "/clear".value(Command::Clear),
        "/help".value(Command::Help),
        alt(("/quit", "/exit")).value(Command::Quit),
    ))
    .parse_next(input)
}

fn unquote(path: &str) -> String {
    let path = path.trim();
    path.strip_prefix('"')
        .and_then(|p| p.strip_suffix('"'))
        .or_else(|| path.strip_prefix('\'').and_then(|p| p.strip_suffix('\'')))
        .unwrap_or(path)
        .to_string()
}
