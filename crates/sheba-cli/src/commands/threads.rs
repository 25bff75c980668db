//! /threads, /open and /delete commands

use super::CommandResult;
use sheba_chat::{Intent, ThreadSummary};

pub struct ThreadsCommand;

impl ThreadsCommand {
    pub fn list_text(threads: &[ThreadSummary]) -> String {
        if threads.is_empty() {
            return "No saved conversations yet.".to_string();
        }

        let mut output = format!("{:<4} {:<10} {:<20} {:<6} Title\n", "#", "ID", "Created", "Msgs");
        output.push_str(&"-".repeat(72));
        output.push('\n');
        for (i, thread) in newest_first(threads).into_iter().enumerate() {
            output.push_str(&format!(
                "{:<4} {:<10} {:<20} {:<6} {}\n",
                i + 1,
                short_id(&thread.id),
                thread.created_at_display(),
                thread.message_count,
                thread.title
            ));
        }
        output.push_str("\nOpen one with: /open <n|id>");
        output
    }

    pub fn open(args: &str, threads: &[ThreadSummary]) -> CommandResult {
        match resolve(args, threads) {
            Ok(id) => CommandResult::Intent(Intent::SelectThread(id)),
            Err(msg) => CommandResult::Message(msg),
        }
    }

    pub fn delete(args: &str, threads: &[ThreadSummary]) -> CommandResult {
        match resolve(args, threads) {
            Ok(id) => CommandResult::Intent(Intent::DeleteThread(id)),
            Err(msg) => CommandResult::Message(msg),
        }
    }
}

/// Threads ordered for display, most recently created first
pub fn newest_first(threads: &[ThreadSummary]) -> Vec<&ThreadSummary> {
    let mut ordered: Vec<&ThreadSummary> = threads.iter().rev().collect();
    ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    ordered
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Resolve a list number (as shown by /threads) or an id prefix to a thread id
fn resolve(args: &str, threads: &[ThreadSummary]) -> Result<String, String> {
    if args.is_empty() {
        return Err("Usage: /open <n|id> or /delete <n|id> (see /threads)".to_string());
    }

    if let Ok(n) = args.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| newest_first(threads).get(i).map(|t| t.id.clone()))
            .ok_or_else(|| format!("No conversation numbered {}.", n));
    }

    let matches: Vec<&ThreadSummary> = threads.iter().filter(|t| t.id.starts_with(args)).collect();
    match matches.as_slice() {
        [thread] => Ok(thread.id.clone()),
        [] => Err(format!("No conversation with id '{}'.", args)),
        _ => Err(format!("'{}' matches more than one conversation.", args)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: &str, title: &str, created_at: i64) -> ThreadSummary {
        ThreadSummary {
            id: id.to_string(),
            title: title.to_string(),
            created_at,
            message_count: 2,
        }
    }

    fn sample() -> Vec<ThreadSummary> {
        vec![
            summary("aaaa1111-0000", "oldest", 1_000),
            summary("bbbb2222-0000", "middle", 2_000),
            summary("bbbb3333-0000", "newest", 3_000),
        ]
    }

    #[test]
    fn test_list_is_newest_first() {
        let threads = sample();
        let titles: Vec<&str> = newest_first(&threads).iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["newest", "middle", "oldest"]);

        let text = ThreadsCommand::list_text(&threads);
        let newest = text.find("newest").unwrap();
        let oldest = text.find("oldest").unwrap();
        assert!(newest < oldest);
    }

    #[test]
    fn test_same_timestamp_keeps_later_creation_first() {
        let threads = vec![summary("a", "first", 5), summary("b", "second", 5)];
        assert_eq!(newest_first(&threads)[0].title, "second");
    }

    #[test]
    fn test_open_by_number_and_prefix() {
        let threads = sample();
        assert_eq!(
            ThreadsCommand::open("1", &threads),
            CommandResult::Intent(Intent::SelectThread("bbbb3333-0000".into()))
        );
        assert_eq!(
            ThreadsCommand::delete("aaaa", &threads),
            CommandResult::Intent(Intent::DeleteThread("aaaa1111-0000".into()))
        );
    }

    #[test]
    fn test_unresolvable_targets() {
        let threads = sample();
        assert!(matches!(ThreadsCommand::open("", &threads), CommandResult::Message(_)));
        assert!(matches!(ThreadsCommand::open("0", &threads), CommandResult::Message(_)));
        assert!(matches!(ThreadsCommand::open("4", &threads), CommandResult::Message(_)));
        assert!(matches!(ThreadsCommand::open("bbbb", &threads), CommandResult::Message(m) if m.contains("more than one")));
        assert!(matches!(ThreadsCommand::delete("zzz", &threads), CommandResult::Message(_)));
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(ThreadsCommand::list_text(&[]), "No saved conversations yet.");
    }
}
