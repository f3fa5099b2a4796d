use rustyline::{Config, Editor, Result};

/// The readline prompt, naming the staged attachment when there is one.
pub fn generate_prompt(attachment: Option<&str>) -> String {
    match attachment {
        Some(name) => format!("[{}] > ", name),
        None => "> ".to_string(),
    }
}

pub fn rl() -> Result<Editor<()>> {
    let config = Config::builder()
        .history_ignore_space(true)
        .history_ignore_dups(true)
        .completion_type(rustyline::CompletionType::List)
        .build();
    Editor::with_config(config)
}
