use crate::error::{Error, Result};
use crate::store::Filter;

pub const HELP: &str = "\
Commands:
  dir                          - list tasks
  dir done | dir pending       - list completed / pending tasks
  add \"task\"                   - add a task
  done \"task\"                  - mark a task as completed
  undone \"task\"                - mark a task as pending
  del \"task\"                   - delete a task
  hist \"task\"                  - show the notes of a task
  edit hist \"task\"             - edit one note of a task
  addhist \"task\" note \"text\"   - append a note to a task
  cd \"task\"                    - focus a task (hist, addhist, back)
  busca \"term\" | search \"term\" - search titles and notes
  backup export                - write a timestamped backup
  backup import <name|path>    - replace all tasks with a backup
  backup list                  - list backups, newest first
  clear | cls                  - clear the screen
  help                         - show this help
  exit                         - leave (backs up on exit when enabled)";

pub const ADDHIST_USAGE: &str = "addhist \"task\" note \"text\"";
const BACKUP_USAGE: &str = "backup export | backup import <name|path> | backup list";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List(Filter),
    Add(String),
    Done(String),
    Undone(String),
    Delete(String),
    History(String),
    EditHistory(String),
    AddHistory { name: String, note: String },
    Focus(String),
    BackupExport,
    BackupImport(String),
    BackupList,
    Search(String),
    Clear,
    Help,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    List,
    Add,
    Done,
    Undone,
    Delete,
    History,
    EditHistory,
    AddHistory,
    Focus,
    BackupExport,
    BackupImport,
    BackupList,
    Backup,
    Edit,
    Search,
    Clear,
    Help,
    Exit,
}

// Multi-word verbs come before their one-word prefixes.
const VERBS: &[(&[&str], Verb)] = &[
    (&["edit", "hist"], Verb::EditHistory),
    (&["backup", "export"], Verb::BackupExport),
    (&["backup", "import"], Verb::BackupImport),
    (&["backup", "list"], Verb::BackupList),
    (&["backup"], Verb::Backup),
    (&["edit"], Verb::Edit),
    (&["addhist"], Verb::AddHistory),
    (&["add"], Verb::Add),
    (&["undone"], Verb::Undone),
    (&["done"], Verb::Done),
    (&["del"], Verb::Delete),
    (&["hist"], Verb::History),
    (&["dir"], Verb::List),
    (&["cd"], Verb::Focus),
    (&["busca"], Verb::Search),
    (&["search"], Verb::Search),
    (&["clear"], Verb::Clear),
    (&["cls"], Verb::Clear),
    (&["help"], Verb::Help),
    (&["exit"], Verb::Exit),
];

/// Keywords offered as completion hints.
pub fn keywords() -> Vec<&'static str> {
    let mut words: Vec<&'static str> = VERBS
        .iter()
        .flat_map(|(words, _)| words.iter().copied())
        .collect();
    words.sort_unstable();
    words.dedup();
    words
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some((verb, rest)) = split_verb(line) else {
        return Err(Error::UnrecognizedCommand(line.to_string()));
    };

    let command = match verb {
        Verb::List => {
            let lower = rest.to_lowercase();
            let filter = if lower.contains("done") {
                Filter::Done
            } else if lower.contains("pending") {
                Filter::Pending
            } else {
                Filter::All
            };
            Command::List(filter)
        }
        // Blank titles are rejected by the store with a dedicated error.
        Verb::Add => Command::Add(unquote(rest).to_string()),
        Verb::Done => Command::Done(required(rest, "done \"task\"")?),
        Verb::Undone => Command::Undone(required(rest, "undone \"task\"")?),
        Verb::Delete => Command::Delete(required(rest, "del \"task\"")?),
        Verb::History => Command::History(required(rest, "hist \"task\"")?),
        Verb::EditHistory => Command::EditHistory(required(rest, "edit hist \"task\"")?),
        Verb::Focus => Command::Focus(required(rest, "cd \"task\"")?),
        Verb::AddHistory => {
            let (name, note) = split_note(rest)?;
            Command::AddHistory { name, note }
        }
        Verb::BackupExport => no_args(rest, line, Command::BackupExport)?,
        Verb::BackupList => no_args(rest, line, Command::BackupList)?,
        Verb::BackupImport => Command::BackupImport(required(rest, "backup import <name|path>")?),
        Verb::Backup => return Err(Error::usage(BACKUP_USAGE)),
        Verb::Edit => return Err(Error::usage("edit hist \"task\"")),
        Verb::Search => Command::Search(required(rest, "busca \"term\"")?),
        Verb::Clear => no_args(rest, line, Command::Clear)?,
        Verb::Help => no_args(rest, line, Command::Help)?,
        Verb::Exit => no_args(rest, line, Command::Exit)?,
    };
    log::debug!("parsed command={command:?}");
    Ok(Some(command))
}

fn split_verb(line: &str) -> Option<(Verb, &str)> {
    VERBS
        .iter()
        .find_map(|(words, verb)| strip_words(line, words).map(|rest| (*verb, rest)))
}

/// Consumes whole whitespace-separated words, ignoring ASCII case.
fn strip_words<'a>(line: &'a str, words: &[&str]) -> Option<&'a str> {
    let mut rest = line.trim_start();
    for word in words {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        if !rest[..end].eq_ignore_ascii_case(word) {
            return None;
        }
        rest = rest[end..].trim_start();
    }
    Some(rest.trim_end())
}

/// Strips one layer of matching single or double quotes.
pub fn unquote(text: &str) -> &str {
    let text = text.trim();
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return text[1..text.len() - 1].trim();
        }
    }
    text
}

fn required(rest: &str, usage: &str) -> Result<String> {
    let value = unquote(rest);
    if value.is_empty() {
        return Err(Error::usage(usage));
    }
    Ok(value.to_string())
}

fn no_args(rest: &str, line: &str, command: Command) -> Result<Command> {
    if rest.is_empty() {
        Ok(command)
    } else {
        Err(Error::UnrecognizedCommand(line.to_string()))
    }
}

/// Splits `"task" note "text"` on the `note` keyword.
fn split_note(rest: &str) -> Result<(String, String)> {
    let usage = || Error::usage(ADDHIST_USAGE);
    let (name, note) = match leading_quoted(rest) {
        Some((name, after)) => {
            let note = strip_words(after, &["note"]).ok_or_else(usage)?;
            (name, unquote(note))
        }
        None => {
            let at = rest.to_ascii_lowercase().find(" note ").ok_or_else(usage)?;
            (unquote(&rest[..at]), unquote(&rest[at + " note ".len()..]))
        }
    };
    if name.is_empty() || note.is_empty() {
        return Err(usage());
    }
    Ok((name.to_string(), note.to_string()))
}

/// `"a b" tail` -> `("a b", "tail")` when the text opens with a closed quote.
fn leading_quoted(text: &str) -> Option<(&str, &str)> {
    let quote = text.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let close = text[1..].find(quote)? + 1;
    Some((text[1..close].trim(), &text[close + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(line: &str) -> Command {
        parse(line)
            .unwrap_or_else(|err| panic!("{line:?} failed: {err}"))
            .unwrap_or_else(|| panic!("{line:?} was blank"))
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("   \t ").unwrap(), None);
    }

    #[test]
    fn dir_filters_match_anywhere_in_line() {
        assert_eq!(cmd("dir"), Command::List(Filter::All));
        assert_eq!(cmd("DIR done"), Command::List(Filter::Done));
        assert_eq!(cmd("dir Pending"), Command::List(Filter::Pending));
        assert_eq!(cmd("dir all of them"), Command::List(Filter::All));
    }

    #[test]
    fn keywords_are_case_insensitive_and_arguments_keep_case() {
        assert_eq!(cmd("ADD \"Write Report\""), Command::Add("Write Report".into()));
        assert_eq!(cmd("Done 'Write Report'"), Command::Done("Write Report".into()));
        assert_eq!(cmd("undone Write Report"), Command::Undone("Write Report".into()));
        assert_eq!(cmd("del  Write Report "), Command::Delete("Write Report".into()));
        assert_eq!(cmd("hist \"x\""), Command::History("x".into()));
        assert_eq!(cmd("cd Plan trip"), Command::Focus("Plan trip".into()));
    }

    #[test]
    fn only_one_quote_layer_is_stripped() {
        assert_eq!(unquote("\"'nested'\""), "'nested'");
        assert_eq!(unquote("'half"), "'half");
        assert_eq!(unquote("\""), "\"");
        assert_eq!(unquote("  plain  "), "plain");
    }

    #[test]
    fn longer_verbs_win_over_prefixes() {
        assert_eq!(cmd("edit hist \"Report\""), Command::EditHistory("Report".into()));
        assert_eq!(cmd("EDIT   HIST Report"), Command::EditHistory("Report".into()));
        assert_eq!(cmd("backup export"), Command::BackupExport);
        assert_eq!(
            cmd("backup import backup_20261016_101010"),
            Command::BackupImport("backup_20261016_101010".into())
        );
        assert_eq!(cmd("backup list"), Command::BackupList);
        assert_eq!(
            cmd("addhist Report note Draft"),
            Command::AddHistory {
                name: "Report".into(),
                note: "Draft".into()
            }
        );
        // `add` followed by text that starts with another keyword is still an add.
        assert_eq!(cmd("add done list"), Command::Add("done list".into()));
        assert_eq!(cmd("add hist"), Command::Add("hist".into()));
    }

    #[test]
    fn verbs_must_be_whole_words() {
        assert!(matches!(parse("adder x"), Err(Error::UnrecognizedCommand(_))));
        assert!(matches!(parse("directory"), Err(Error::UnrecognizedCommand(_))));
        assert!(matches!(
            parse("frobnicate"),
            Err(Error::UnrecognizedCommand(line)) if line == "frobnicate"
        ));
    }

    #[test]
    fn addhist_accepts_quoted_and_bare_forms() {
        assert_eq!(
            cmd("addhist 'Write report' note 'Draft v1'"),
            Command::AddHistory {
                name: "Write report".into(),
                note: "Draft v1".into()
            }
        );
        assert_eq!(
            cmd("addhist \"Plan note taking\" NOTE buy a notebook"),
            Command::AddHistory {
                name: "Plan note taking".into(),
                note: "buy a notebook".into()
            }
        );
        assert_eq!(
            cmd("addhist Write report Note see notes"),
            Command::AddHistory {
                name: "Write report".into(),
                note: "see notes".into()
            }
        );
    }

    #[test]
    fn addhist_without_separator_or_sides_is_usage_error() {
        for line in [
            "addhist Write report",
            "addhist note Draft",
            "addhist Write report note",
            "addhist \"Write report\" Draft",
            "addhist \"\" note Draft",
            "addhist",
        ] {
            assert!(
                matches!(parse(line), Err(Error::Usage(ref u)) if u == ADDHIST_USAGE),
                "{line:?} should be a usage error"
            );
        }
    }

    #[test]
    fn missing_arguments_are_usage_errors() {
        for line in [
            "done",
            "undone ''",
            "del",
            "hist",
            "edit hist",
            "busca",
            "cd",
            "backup import",
        ] {
            assert!(matches!(parse(line), Err(Error::Usage(_))), "{line:?}");
        }
        assert!(matches!(parse("backup"), Err(Error::Usage(_))));
        assert!(matches!(parse("backup restore x"), Err(Error::Usage(_))));
        assert!(matches!(parse("edit note"), Err(Error::Usage(_))));
        // Blank titles are left to the store.
        assert_eq!(cmd("add"), Command::Add(String::new()));
        assert_eq!(cmd("add \"\""), Command::Add(String::new()));
    }

    #[test]
    fn argumentless_commands_reject_trailing_text() {
        assert_eq!(cmd("clear"), Command::Clear);
        assert_eq!(cmd("CLS"), Command::Clear);
        assert_eq!(cmd("help"), Command::Help);
        assert_eq!(cmd("exit"), Command::Exit);
        assert!(matches!(parse("exit now"), Err(Error::UnrecognizedCommand(_))));
        assert!(matches!(parse("backup export now"), Err(Error::UnrecognizedCommand(_))));
    }

    #[test]
    fn search_has_two_spellings() {
        assert_eq!(cmd("busca \"draft\""), Command::Search("draft".into()));
        assert_eq!(cmd("search Draft v1"), Command::Search("Draft v1".into()));
    }

    #[test]
    fn keywords_cover_every_verb_once() {
        let words = keywords();
        for word in ["dir", "add", "addhist", "edit", "hist", "backup", "export", "busca", "exit"] {
            assert!(words.contains(&word), "{word}");
        }
        let mut deduped = words.clone();
        deduped.dedup();
        assert_eq!(words, deduped);
    }
}
