use crate::builtin::Builtin;
use crate::command::Command;
use crate::config::Limits;
use crate::error::ParseError;

pub const PIPE: &str = "|";

/// An ordered `|`-chain of stages. Only [`Pipeline::build`] creates one, so a
/// value of this type always has at least one stage, at most `max_stages`,
/// and a builtin never shares it with a pipe or a redirection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Command>,
    has_pipe: bool,
    has_redirect: bool,
    has_builtin: bool,
    background: bool,
}

impl Pipeline {
    /// Splits `command.argv` on pipe tokens. Every stage gets its own copy of
    /// its tokens and its own redirection scan.
    pub fn build(command: &Command, limits: &Limits) -> Result<Self, ParseError> {
        let argv = &command.argv;
        if argv.is_empty() {
            return Err(ParseError::EmptyCommand);
        }
        let mut stages: Vec<Command> = Vec::new();
        let mut current: Vec<String> = Vec::new();
        for (i, tok) in argv.iter().enumerate() {
            if tok != PIPE {
                current.push(tok.clone());
                continue;
            }
            if i == 0 || i + 1 == argv.len() || current.is_empty() {
                return Err(ParseError::InvalidPipePlacement);
            }
            // closing this stage still leaves the final one to come
            if stages.len() + 1 >= limits.max_stages {
                return Err(ParseError::TooManyStages { max: limits.max_stages });
            }
            stages.push(Command::new(std::mem::take(&mut current), command.background));
        }
        stages.push(Command::new(current, command.background));

        let mut has_redirect = false;
        let mut has_builtin = false;
        for stage in &stages {
            stage.redirect.validate(&stage.argv)?;
            if stage.redirect.exec_argv(&stage.argv).is_empty() {
                return Err(ParseError::MissingCommand);
            }
            has_redirect |= !stage.redirect.is_empty();
            has_builtin |= stage.program().and_then(Builtin::lookup).is_some();
        }
        let has_pipe = stages.len() > 1;
        if has_builtin && (has_pipe || has_redirect) {
            return Err(ParseError::BuiltinInPipeline);
        }
        Ok(Pipeline { stages, has_pipe, has_redirect, has_builtin, background: command.background })
    }

    pub fn stages(&self) -> &[Command] {
        &self.stages
    }

    pub fn has_pipe(&self) -> bool {
        self.has_pipe
    }

    pub fn has_redirect(&self) -> bool {
        self.has_redirect
    }

    pub fn has_builtin(&self) -> bool {
        self.has_builtin
    }

    pub fn background(&self) -> bool {
        self.background
    }

    /// The builtin to run in-process, if this is a builtin pipeline.
    pub fn builtin(&self) -> Option<Builtin> {
        if !self.has_builtin {
            return None;
        }
        self.stages[0].program().and_then(Builtin::lookup)
    }
}
