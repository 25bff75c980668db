//! Slash commands for interactive mode

mod quick;
mod threads;

pub use quick::QuickCommand;
pub use threads::ThreadsCommand;

use sheba_chat::{Intent, ThreadSummary};

/// Result of executing a slash command
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// Forward an intent to the engine
    Intent(Intent),
    /// Show the active thread's transcript
    ShowHistory,
    /// Show a message to the user (not sent to the engine)
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command.
///
/// `threads` is the engine's thread list in creation order.
pub fn execute_command(input: &str, threads: &[ThreadSummary]) -> Option<CommandResult> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let parts: Vec<&str> = rest.splitn(2, ' ').collect();
    let command = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "new" | "n" => CommandResult::Intent(Intent::NewThread),

        "threads" | "t" => CommandResult::Message(ThreadsCommand::list_text(threads)),

        "open" | "o" => ThreadsCommand::open(args, threads),

        "delete" | "d" => ThreadsCommand::delete(args, threads),

        "quick" | "k" => QuickCommand::execute(args),

        "history" => CommandResult::ShowHistory,

        "quit" | "exit" | "q" => CommandResult::Exit,

        _ => CommandResult::Unknown(command),
    })
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?        Show this help message
  /new, /n             Start a new conversation
  /threads, /t         List saved conversations (newest first)
  /open, /o <n|id>     Switch to a conversation by list number or id
  /delete, /d <n|id>   Delete a conversation
  /quick, /k [n|id]    List quick questions, or ask one
  /history             Show the current conversation
  /quit, /exit, /q     Exit sheba

Examples:
  /threads             See what you asked before
  /open 2              Continue the second conversation in the list
  /quick nid           Ask how to correct an NID card"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert!(execute_command("hello", &[]).is_none());
        assert!(execute_command("  জন্ম নিবন্ধন", &[]).is_none());
    }

    #[test]
    fn test_basic_commands() {
        assert_eq!(
            execute_command("/new", &[]),
            Some(CommandResult::Intent(Intent::NewThread))
        );
        assert_eq!(execute_command(" /Q ", &[]), Some(CommandResult::Exit));
        assert_eq!(execute_command("/history", &[]), Some(CommandResult::ShowHistory));
        assert!(matches!(
            execute_command("/help", &[]),
            Some(CommandResult::Message(text)) if text.contains("/quick")
        ));
        assert_eq!(
            execute_command("/frobnicate now", &[]),
            Some(CommandResult::Unknown("frobnicate".into()))
        );
    }
}
