pub mod assemble;
pub mod command;
pub mod conversation_state;
pub mod ingest;
pub mod prompt;
pub mod render;
pub mod session;

use std::io::Write;
use std::ops::ControlFlow;
use std::path::Path;
use std::process::ExitCode;

use color_print::cstr;
use crossterm::style::Stylize;
use eyre::Result;
use tracing::{error, info};

use command::{Command, Input};
use ingest::Upload;
use prompt::generate_prompt;
use session::ChatSession;

const WELCOME_TEXT: &str = cstr!(
    "
<bold><blue>VERTEX</blue></bold>, your logistics assistant. Ask me anything.

Things to try
• What is the economic order quantity and how do I compute it?
• <cyan>/attach</cyan> stock.xlsx, then: which SKUs fall below their reorder point?
• Compare cross-docking with traditional warehousing.

<cyan>/help</cyan>         Show the help dialogue
<cyan>/quit</cyan>         Quit the application
"
);

const HELP_TEXT: &str = cstr!(
    "
<bold>VERTEX</bold>

<cyan>/attach</cyan> PATH    Attach a PDF, TXT, CSV or XLSX file to every following message
<cyan>/detach</cyan>        Remove the attached file
<cyan>/history</cyan>       Show the conversation so far
<cyan>/clear</cyan>         Start a new conversation
<cyan>/help</cyan>          Show this help dialogue
<cyan>/quit</cyan>          Quit the application

An empty line sends the attached file on its own.
"
);

/// Terminal front-end around a [`ChatSession`].
pub struct ChatContext {
    output: Box<dyn Write>,
    input: Option<String>,
    interactive: bool,
    session: ChatSession,
    attachment: Option<Upload>,
}

impl ChatContext {
    /// With an initial `input` or `attachment` the context answers once and
    /// exits; otherwise it runs an interactive loop.
    pub fn new(
        output: Box<dyn Write>,
        session: ChatSession,
        input: Option<String>,
        attachment: Option<Upload>,
    ) -> Self {
        let interactive = input.is_none() && attachment.is_none();
        Self {
            output,
            input,
            interactive,
            session,
            attachment,
        }
    }

    pub async fn run(&mut self) -> Result<ExitCode> {
        if !self.interactive {
            let input = self.input.take().unwrap_or_default();
            return self.run_once(&input).await;
        }

        self.print_welcome()?;
        self.run_interactive().await?;
        Ok(ExitCode::SUCCESS)
    }

    fn print_welcome(&mut self) -> Result<()> {
        writeln!(self.output, "{}", WELCOME_TEXT)?;
        Ok(())
    }

    async fn run_once(&mut self, input: &str) -> Result<ExitCode> {
        match self.session.send(input, self.attachment.as_ref()).await {
            Ok(reply) => {
                render::write_message(&mut *self.output, &reply)?;
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                writeln!(self.output, "{}", e.to_string().yellow())?;
                Ok(ExitCode::FAILURE)
            }
        }
    }

    async fn run_interactive(&mut self) -> Result<()> {
        let mut rl = prompt::rl()?;

        loop {
            let prompt_text = generate_prompt(self.attachment.as_ref().map(Upload::filename));
            let readline = rl.readline(&prompt_text);

            match readline {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str());
                    }

                    match self.handle_input(&line).await {
                        Ok(ControlFlow::Break(())) => break,
                        Ok(ControlFlow::Continue(())) => {}
                        Err(e) => writeln!(self.output, "Error: {}", e)?,
                    }
                }
                Err(rustyline::error::ReadlineError::Interrupted)
                | Err(rustyline::error::ReadlineError::Eof) => break,
                Err(e) => {
                    writeln!(self.output, "Error: {}", e)?;
                    break;
                }
            }
        }

        Ok(())
    }

    async fn handle_input(&mut self, line: &str) -> Result<ControlFlow<()>> {
        match command::parse_input(line) {
            Input::Command(Command::Quit) => return Ok(ControlFlow::Break(())),
            Input::Command(Command::Help) => {
                writeln!(self.output, "{}", HELP_TEXT)?;
            }
            Input::Command(Command::Clear) => {
                self.session.reset();
                writeln!(self.output, "Conversation cleared.")?;
            }
            Input::Command(Command::History) => {
                render::write_transcript(&mut *self.output, self.session.conversation())?;
            }
            Input::Command(Command::Attach(path)) => {
                self.attach(Path::new(&path)).await?;
            }
            Input::Command(Command::Detach) => match self.attachment.take() {
                Some(upload) => writeln!(self.output, "Detached {}.", upload.filename())?,
                None => writeln!(self.output, "No file is attached.")?,
            },
            Input::Unknown(text) => {
                writeln!(
                    self.output,
                    "Unknown command: {}. Type /help for the list of commands.",
                    text
                )?;
            }
            Input::Prompt(text) => {
                self.process_chat_input(&text).await?;
            }
        }

        Ok(ControlFlow::Continue(()))
    }

    async fn attach(&mut self, path: &Path) -> Result<()> {
        match Upload::from_path(path, None).await {
            Ok(upload) => {
                info!(filename = upload.filename(), kind = ?upload.kind(), "Attached file");
                writeln!(
                    self.output,
                    "Attached {} ({} bytes). It will be sent with every message until /detach.",
                    upload.filename(),
                    upload.bytes().len()
                )?;
                self.attachment = Some(upload);
            }
            Err(e) => {
                error!("{:#}", e);
                writeln!(self.output, "{}", format!("{:#}", e).red())?;
            }
        }
        Ok(())
    }

    async fn process_chat_input(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{}", "Analyzing...".dark_grey())?;
        self.output.flush()?;

        match self.session.send(text, self.attachment.as_ref()).await {
            Ok(reply) => render::write_message(&mut *self.output, &reply)?,
            Err(e) => writeln!(self.output, "{}", e.to_string().yellow())?,
        }

        Ok(())
    }
}
