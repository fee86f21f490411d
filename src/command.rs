/// Command table, tokenizer and argument validation.
use thiserror::Error;

use crate::protocol::{
    ADD_ENDPOINT, DELETE_ENDPOINT, EDIT_ENDPOINT, LIST_ENDPOINT, TaskId, VIEW_ENDPOINT,
};

// ── Command table ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// Handled in-process, no network
    Local,
    /// Backed by this service endpoint
    Remote(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub usage: &'static str,
    pub summary: &'static str,
    pub handler: Handler,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec { name: "help",   usage: "help",        summary: "Show this help message",                 handler: Handler::Local },
    CommandSpec { name: "list",   usage: "list",        summary: "List all tasks",                         handler: Handler::Remote(LIST_ENDPOINT) },
    CommandSpec { name: "view",   usage: "view <id>",   summary: "View a task by ID",                      handler: Handler::Remote(VIEW_ENDPOINT) },
    CommandSpec { name: "add",    usage: "add",         summary: "Add a new task (opens the task form)",   handler: Handler::Remote(ADD_ENDPOINT) },
    CommandSpec { name: "edit",   usage: "edit <id>",   summary: "Edit a task by ID (opens the task form)", handler: Handler::Remote(EDIT_ENDPOINT) },
    CommandSpec { name: "delete", usage: "delete <id>", summary: "Delete a task by ID",                    handler: Handler::Remote(DELETE_ENDPOINT) },
    CommandSpec { name: "clear",  usage: "clear",       summary: "Clear the terminal",                     handler: Handler::Local },
];

pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|c| c.name == name)
}

/// The `help` output, one line per command.
pub fn help_lines() -> Vec<String> {
    std::iter::once("Available commands:".to_string())
        .chain(COMMANDS.iter().map(|c| format!("{}: {}", c.usage, c.summary)))
        .collect()
}

// ── Tokenizing ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    /// Remaining tokens rejoined with single spaces
    pub arg_string: String,
}

impl ParsedCommand {
    pub fn args(&self) -> impl Iterator<Item = &str> {
        self.arg_string.split_whitespace()
    }
}

pub fn tokenize(raw: &str) -> ParsedCommand {
    let mut tokens = raw.split_whitespace();
    let name = tokens.next().unwrap_or_default().to_string();
    let arg_string = tokens.collect::<Vec<_>>().join(" ");
    ParsedCommand { name, arg_string }
}

// ── Validated commands ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Clear,
    List { args: String },
    View(TaskId),
    /// Typed arguments are ignored; fields come from the form
    Add,
    Edit(TaskId),
    Delete(TaskId),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: '{0}'. Type 'help' for available commands.")]
    Unknown(String),
    #[error("Usage: {usage} (expected exactly one parameter: the task id)")]
    Usage { usage: &'static str },
}

impl TryFrom<&ParsedCommand> for Command {
    type Error = CommandError;

    fn try_from(parsed: &ParsedCommand) -> Result<Self, Self::Error> {
        let Some(entry) = lookup(&parsed.name) else {
            return Err(CommandError::Unknown(parsed.name.clone()));
        };

        let single_id = || {
            let mut args = parsed.args();
            match (args.next(), args.next()) {
                (Some(id), None) => Ok(TaskId(id.to_string())),
                _ => Err(CommandError::Usage { usage: entry.usage }),
            }
        };

        Ok(match entry.name {
            "help" => Command::Help,
            "clear" => Command::Clear,
            "list" => Command::List { args: parsed.arg_string.clone() },
            "view" => Command::View(single_id()?),
            "add" => Command::Add,
            "edit" => Command::Edit(single_id()?),
            "delete" => Command::Delete(single_id()?),
            other => return Err(CommandError::Unknown(other.to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<Command, CommandError> {
        Command::try_from(&tokenize(raw))
    }

    #[test]
    fn test_tokenize_collapses_whitespace() {
        let p = tokenize("  list   due\tsoon  ");
        assert_eq!(p.name, "list");
        assert_eq!(p.arg_string, "due soon");

        let p = tokenize("");
        assert_eq!(p.name, "");
        assert_eq!(p.arg_string, "");
    }

    #[test]
    fn test_local_commands_ignore_args() {
        assert_eq!(parse("help"), Ok(Command::Help));
        assert_eq!(parse("clear everything"), Ok(Command::Clear));
    }

    #[test]
    fn test_remote_commands() {
        assert_eq!(parse("list"), Ok(Command::List { args: String::new() }));
        assert_eq!(parse("list a  b"), Ok(Command::List { args: "a b".to_string() }));
        assert_eq!(parse("view 3"), Ok(Command::View(TaskId("3".to_string()))));
        assert_eq!(parse("add ignored words"), Ok(Command::Add));
        assert_eq!(parse("edit 4"), Ok(Command::Edit(TaskId("4".to_string()))));
        assert_eq!(parse("delete 5"), Ok(Command::Delete(TaskId("5".to_string()))));
    }

    #[test]
    fn test_id_commands_need_exactly_one_arg() {
        for raw in ["view", "view 1 2", "edit", "edit a b c", "delete", "delete 1 1"] {
            assert!(matches!(parse(raw), Err(CommandError::Usage { .. })), "{raw}");
        }
        assert_eq!(
            parse("view x y").unwrap_err().to_string(),
            "Usage: view <id> (expected exactly one parameter: the task id)"
        );
    }

    #[test]
    fn test_unknown_command_message() {
        assert_eq!(
            parse("unknowncmd").unwrap_err().to_string(),
            "Unknown command: 'unknowncmd'. Type 'help' for available commands."
        );
        // Names are case-sensitive.
        assert!(matches!(parse("LIST"), Err(CommandError::Unknown(_))));
    }

    #[test]
    fn test_help_lists_every_command() {
        let lines = help_lines();
        assert_eq!(lines.len(), COMMANDS.len() + 1);
        for usage in ["help", "list", "view <id>", "add", "edit <id>", "delete <id>", "clear"] {
            assert!(lines.iter().any(|l| l.starts_with(&format!("{usage}: "))), "{usage}");
        }
    }

    #[test]
    fn test_table_handlers() {
        assert_eq!(lookup("help").unwrap().handler, Handler::Local);
        assert_eq!(lookup("clear").unwrap().handler, Handler::Local);
        assert_eq!(lookup("edit").unwrap().handler, Handler::Remote("/terminal/edit"));
        assert!(lookup("quit").is_none());
    }
}
