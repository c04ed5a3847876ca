//! Line-based interactive prompts
//!
//! Used only by the binary's menu mode. The pipeline takes plain parameters
//! and never reads from the console itself.

use std::io::{self, BufRead, Write};

use crate::duplicate::DuplicateMode;

/// Top-level menu choice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Import,
    CheckHealth,
}

/// Prompt/answer loop over any reader and writer
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.output, "{}", line)
    }

    /// Print `question` and read one trimmed line. End of input reads as "".
    pub fn ask(&mut self, question: &str) -> io::Result<String> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;
        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        Ok(answer.trim().to_string())
    }

    /// Main menu. `None` for anything other than 1 or 2.
    pub fn choose_action(&mut self) -> io::Result<Option<MenuAction>> {
        self.say("📋 Review Database Import Tool")?;
        self.say("1. Import studies")?;
        self.say("2. Check file health")?;
        let choice = self.ask("\nChoose an option (1 or 2): ")?;
        Ok(match choice.as_str() {
            "1" => Some(MenuAction::Import),
            "2" => Some(MenuAction::CheckHealth),
            _ => None,
        })
    }

    /// Duplicate detection menu; unrecognised answers select basic mode
    pub fn choose_mode(&mut self) -> io::Result<DuplicateMode> {
        self.say("\n🔍 Duplicate Detection Options:")?;
        self.say("1. Skip duplicate detection (import all files)")?;
        self.say("2. Enhanced duplicate detection (same DOI/title + same dataset)")?;
        self.say("3. Basic duplicate detection (same DOI/title only)")?;
        let choice = self.ask("Choose duplicate detection method (1-3): ")?;
        let mode = DuplicateMode::from_menu_choice(&choice);
        match mode {
            DuplicateMode::Disabled => self.say("✅ Duplicate detection disabled - all files will be imported")?,
            DuplicateMode::Enhanced => self.say("✅ Enhanced duplicate detection enabled")?,
            DuplicateMode::Basic => self.say("✅ Basic duplicate detection enabled")?,
        }
        Ok(mode)
    }
}
