//! /quick command - canned questions

use super::CommandResult;
use sheba_chat::Intent;
use sheba_chat::persona::{QUICK_ACTIONS, find_quick_action};

pub struct QuickCommand;

impl QuickCommand {
    pub fn execute(args: &str) -> CommandResult {
        if args.is_empty() {
            return CommandResult::Message(Self::list_text());
        }

        match find_quick_action(args) {
            Some(action) => CommandResult::Intent(Intent::Send(action.query.to_string())),
            None => CommandResult::Message(format!(
                "No quick question matches '{}'.\n\n{}",
                args,
                Self::list_text()
            )),
        }
    }

    pub fn list_text() -> String {
        let mut output = String::from("Quick questions:\n");
        for (i, action) in QUICK_ACTIONS.iter().enumerate() {
            output.push_str(&format!("  {}. {:<10} {}\n", i + 1, action.id, action.label));
        }
        output.push_str("\nAsk one with: /quick <n|id>");
        output
    }
}
