use std::io;

use colored::Colorize;
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use crate::commands::{CommandCtx, Prompt};
use crate::events::{Event, SearchRow, Severity, TaskRow};
use crate::store::Filter;

/// Completes the word under the cursor against the current hints, ignoring case.
#[derive(Default)]
struct HintCompleter {
    hints: Vec<String>,
}

impl Completer for HintCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let head = &line[..pos];
        // Titles may contain spaces, so an open quote starts the word.
        let start = match head.rfind(is_quote) {
            Some(quote) if !head[quote + 1..].contains(is_quote) => quote + 1,
            _ => head
                .rfind(char::is_whitespace)
                .map(|i| i + 1)
                .unwrap_or(0),
        };
        let word = head[start..].to_lowercase();
        let candidates = self
            .hints
            .iter()
            .filter(|hint| hint.to_lowercase().starts_with(&word))
            .map(|hint| Pair {
                display: hint.clone(),
                replacement: hint.clone(),
            })
            .collect();
        Ok((start, candidates))
    }
}

fn is_quote(c: char) -> bool {
    c == '"' || c == '\''
}

impl Hinter for HintCompleter {
    type Hint = String;
}

impl Highlighter for HintCompleter {}

impl Validator for HintCompleter {}

impl Helper for HintCompleter {}

/// Line editor plus colored renderer for a real terminal.
pub struct ConsoleCtx {
    editor: Editor<HintCompleter, DefaultHistory>,
}

impl ConsoleCtx {
    pub fn new() -> rustyline::Result<Self> {
        let mut editor = Editor::new()?;
        editor.set_helper(Some(HintCompleter::default()));
        Ok(Self { editor })
    }
}

impl CommandCtx for ConsoleCtx {
    fn prompt(&mut self, prefix: &str, hints: &[String]) -> Prompt {
        if let Some(helper) = self.editor.helper_mut() {
            helper.hints = hints.to_vec();
        }
        match self.editor.readline(prefix) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    if let Err(err) = self.editor.add_history_entry(line.as_str()) {
                        log::debug!("history entry dropped: {err}");
                    }
                }
                Prompt::Line(line)
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Prompt::Cancelled,
            Err(err) => {
                log::error!("readline failed: {err}");
                Prompt::Cancelled
            }
        }
    }

    fn emit(&mut self, event: Event) {
        match event {
            Event::Status { severity, message } => print_status(severity, &message),
            Event::Tasks { filter, rows } => print_tasks(filter, &rows),
            Event::History { title, notes } => {
                if notes.is_empty() {
                    println!("{}", format!("'{title}' has no notes.").yellow());
                    return;
                }
                println!("\nNotes of '{}':", title.bold());
                for (i, note) in notes.iter().enumerate() {
                    println!("{}. {note}", i + 1);
                }
                println!();
            }
            Event::SearchResults { keyword, rows } => print_search(&keyword, &rows),
            Event::Backups(ids) => {
                if ids.is_empty() {
                    println!("{}", "No backups yet.".yellow());
                    return;
                }
                println!("\nBackups (newest first):");
                for id in ids {
                    println!("  {id}");
                }
                println!();
            }
            Event::Help(text) => println!("\n{text}\n"),
            Event::ClearScreen => {
                if let Err(err) = execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0)) {
                    log::warn!("clear screen failed: {err}");
                }
            }
        }
    }
}

fn print_status(severity: Severity, message: &str) {
    match severity {
        Severity::Info => println!("{}", message.cyan()),
        Severity::Success => println!("{}", message.green()),
        Severity::Warning => println!("{}", message.yellow()),
        Severity::Error => println!("{}", message.red()),
    }
}

fn task_line(row: &TaskRow) -> String {
    let line = if row.completed {
        format!("{}. [x] {}", row.index, row.title).green()
    } else {
        format!("{}. [ ] {}", row.index, row.title).yellow()
    };
    line.to_string()
}

fn print_tasks(filter: Filter, rows: &[TaskRow]) {
    if rows.is_empty() {
        let message = match filter {
            Filter::All => "No tasks found.",
            Filter::Done => "No completed tasks.",
            Filter::Pending => "No pending tasks.",
        };
        println!("{}", message.red());
        return;
    }
    println!("\nTasks:");
    for row in rows {
        println!("{}", task_line(row));
    }
    println!();
}

fn print_search(keyword: &str, rows: &[SearchRow]) {
    if rows.is_empty() {
        println!("{}", format!("Nothing matches '{keyword}'.").red());
        return;
    }
    println!("\nResults for '{}':", keyword.bold());
    for row in rows {
        println!("{}", task_line(&row.task));
        for (n, note) in &row.notes {
            println!("     {n}. {note}");
        }
    }
    println!();
}
