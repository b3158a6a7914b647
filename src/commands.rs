use crate::backup::{BackupCoordinator, StartupRestore};
use crate::error::{Error, Result};
use crate::events::{Event, SearchRow, TaskRow};
use crate::models::Settings;
use crate::parse::{self, unquote, Command, HELP};
use crate::storage::{Storage, StorageError};
use crate::store::{check_note_index, Filter, TaskStore, Transition};

const PROMPT: &str = "> ";
const FOCUS_WORDS: [&str; 3] = ["hist", "addhist", "back"];

/// Answer from the input provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Line(String),
    Cancelled,
}

/// The interpreter's collaborators: something that reads lines and something that renders events.
pub trait CommandCtx {
    fn prompt(&mut self, prefix: &str, hints: &[String]) -> Prompt;
    fn emit(&mut self, event: Event);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditState {
    AwaitingSelection,
    AwaitingReplacement { index: usize },
}

/// Interactive history edit: pick a note number, then supply its replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEdit {
    title: String,
    state: EditState,
}

impl HistoryEdit {
    pub fn start(store: &TaskStore, name: &str) -> Result<Self> {
        let task = store.get(name)?;
        if task.history.is_empty() {
            return Err(Error::EmptyHistory(task.title.clone()));
        }
        Ok(Self {
            title: task.title.clone(),
            state: EditState::AwaitingSelection,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn prompt(&self) -> &'static str {
        match self.state {
            EditState::AwaitingSelection => "Note number to edit: ",
            EditState::AwaitingReplacement { .. } => "New note: ",
        }
    }

    /// Feeds one answer; yields the note number and its new text once both are known.
    pub fn feed(&mut self, store: &TaskStore, input: &str) -> Result<Option<(usize, String)>> {
        match self.state {
            EditState::AwaitingSelection => {
                let number = note_number(input)?;
                check_note_index(store.get(&self.title)?, number)?;
                self.state = EditState::AwaitingReplacement {
                    index: number as usize,
                };
                Ok(None)
            }
            EditState::AwaitingReplacement { index } => {
                let note = input.trim();
                if note.is_empty() {
                    return Err(Error::InvalidNote);
                }
                Ok(Some((index, note.to_string())))
            }
        }
    }
}

/// Integers too large for `i64` are still numbers, just out of range.
fn note_number(input: &str) -> Result<i64> {
    let text = input.trim();
    if let Ok(number) = text.parse::<i64>() {
        return Ok(number);
    }
    let digits = text.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::usage("note number must be a whole number"));
    }
    Ok(if text.starts_with('-') { i64::MIN } else { i64::MAX })
}

/// One interactive run: owns the task store and the backup coordinator.
pub struct Session {
    store: TaskStore,
    backups: BackupCoordinator,
    confirm_delete: bool,
    startup: StartupRestore,
}

impl Session {
    pub fn open(storage: Storage, settings: &Settings) -> Result<Self> {
        let backups = BackupCoordinator::new(storage, settings.backup);
        let (store, startup) = backups.load()?;
        Ok(Self {
            store,
            backups,
            confirm_delete: settings.confirm_delete,
            startup,
        })
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn run(&mut self, ctx: &mut impl CommandCtx) {
        log::info!("session started tasks={}", self.store.len());
        ctx.emit(Event::info(
            "Task list ready. Type 'help' for the command list.",
        ));
        match &self.startup {
            StartupRestore::Restored(id) => {
                ctx.emit(Event::info(format!("Restored tasks from backup {id}.")))
            }
            StartupRestore::Failed(error) => ctx.emit(Event::warning(format!(
                "Latest backup could not be restored, keeping saved tasks: {error}"
            ))),
            StartupRestore::Skipped => {}
        }
        loop {
            let hints = self.completion_hints();
            let line = match ctx.prompt(PROMPT, &hints) {
                Prompt::Line(line) => line,
                Prompt::Cancelled => {
                    log::info!("input cancelled, leaving without exit backup");
                    break;
                }
            };
            if self.execute_line(ctx, &line) == Flow::Exit {
                break;
            }
        }
        log::info!("session ended tasks={}", self.store.len());
    }

    /// Every error stops at this boundary as an error event.
    pub fn execute_line(&mut self, ctx: &mut impl CommandCtx, line: &str) -> Flow {
        let result = match parse::parse(line) {
            Ok(Some(command)) => self.dispatch(ctx, command),
            Ok(None) => Ok(Flow::Continue),
            Err(error) => Err(error),
        };
        match result {
            Ok(flow) => flow,
            Err(error) => {
                report(ctx, &error);
                Flow::Continue
            }
        }
    }

    fn completion_hints(&self) -> Vec<String> {
        parse::keywords()
            .into_iter()
            .map(str::to_string)
            .chain(self.store.titles())
            .collect()
    }

    fn dispatch(&mut self, ctx: &mut impl CommandCtx, command: Command) -> Result<Flow> {
        match command {
            Command::List(filter) => self.list_impl(ctx, filter),
            Command::Add(title) => self.add_impl(ctx, &title)?,
            Command::Done(name) => self.set_completed_impl(ctx, &name, true)?,
            Command::Undone(name) => self.set_completed_impl(ctx, &name, false)?,
            Command::Delete(name) => self.delete_impl(ctx, &name)?,
            Command::History(name) => self.history_impl(ctx, &name)?,
            Command::EditHistory(name) => self.edit_history_impl(ctx, &name)?,
            Command::AddHistory { name, note } => self.add_history_impl(ctx, &name, &note)?,
            Command::Focus(name) => self.focus_impl(ctx, &name)?,
            Command::BackupExport => self.export_impl(ctx)?,
            Command::BackupImport(target) => self.import_impl(ctx, &target)?,
            Command::BackupList => ctx.emit(Event::Backups(self.backups.list()?)),
            Command::Search(keyword) => self.search_impl(ctx, &keyword),
            Command::Clear => ctx.emit(Event::ClearScreen),
            Command::Help => ctx.emit(Event::Help(HELP)),
            Command::Exit => return Ok(self.exit_impl(ctx)),
        }
        Ok(Flow::Continue)
    }

    fn commit(&self) -> Result<()> {
        self.backups.commit(&self.store)?;
        Ok(())
    }

    fn list_impl(&self, ctx: &mut impl CommandCtx, filter: Filter) {
        let rows = self
            .store
            .list(filter)
            .map(|(index, task)| TaskRow::new(index, task))
            .collect();
        ctx.emit(Event::Tasks { filter, rows });
    }

    fn add_impl(&mut self, ctx: &mut impl CommandCtx, title: &str) -> Result<()> {
        let title = self.store.add(title)?.title.clone();
        self.commit()?;
        log::info!("task added title={title:?}");
        ctx.emit(Event::success(format!("Task '{title}' added.")));
        Ok(())
    }

    fn set_completed_impl(
        &mut self,
        ctx: &mut impl CommandCtx,
        name: &str,
        completed: bool,
    ) -> Result<()> {
        let transition = if completed {
            self.store.complete(name)?
        } else {
            self.store.uncomplete(name)?
        };
        let title = self.store.get(name)?.title.clone();
        let state = if completed { "completed" } else { "pending" };
        if transition == Transition::Unchanged {
            ctx.emit(Event::warning(format!("Task '{title}' is already {state}.")));
            return Ok(());
        }
        self.commit()?;
        log::info!("task marked title={title:?} completed={completed}");
        ctx.emit(Event::success(format!("Task '{title}' marked as {state}.")));
        Ok(())
    }

    fn delete_impl(&mut self, ctx: &mut impl CommandCtx, name: &str) -> Result<()> {
        let title = self.store.get(name)?.title.clone();
        if self.confirm_delete && !confirm(ctx, &format!("Delete task '{title}'? [y/N] ")) {
            ctx.emit(Event::warning(format!("Deletion of '{title}' cancelled.")));
            return Ok(());
        }
        self.store.delete(&title)?;
        self.commit()?;
        log::info!("task deleted title={title:?}");
        ctx.emit(Event::success(format!("Task '{title}' deleted.")));
        Ok(())
    }

    fn history_impl(&self, ctx: &mut impl CommandCtx, name: &str) -> Result<()> {
        let task = self.store.get(name)?;
        ctx.emit(Event::History {
            title: task.title.clone(),
            notes: task.history.clone(),
        });
        Ok(())
    }

    fn add_history_impl(&mut self, ctx: &mut impl CommandCtx, name: &str, note: &str) -> Result<()> {
        let number = self.store.add_history(name, note)?;
        let title = self.store.get(name)?.title.clone();
        self.commit()?;
        log::info!("note added title={title:?} number={number}");
        ctx.emit(Event::success(format!("Note {number} added to '{title}'.")));
        Ok(())
    }

    fn edit_history_impl(&mut self, ctx: &mut impl CommandCtx, name: &str) -> Result<()> {
        let mut edit = HistoryEdit::start(&self.store, name)?;
        self.history_impl(ctx, edit.title())?;
        loop {
            let answer = match ctx.prompt(edit.prompt(), &[]) {
                Prompt::Line(line) => line,
                Prompt::Cancelled => {
                    ctx.emit(Event::warning("Edit cancelled."));
                    return Ok(());
                }
            };
            let Some((index, note)) = edit.feed(&self.store, &answer)? else {
                continue;
            };
            self.store.edit_history(edit.title(), index, &note)?;
            self.commit()?;
            log::info!("note edited title={:?} number={index}", edit.title());
            ctx.emit(Event::success(format!(
                "Note {index} of '{}' updated.",
                edit.title()
            )));
            return Ok(());
        }
    }

    fn focus_impl(&mut self, ctx: &mut impl CommandCtx, name: &str) -> Result<()> {
        let title = self.store.get(name)?.title.clone();
        ctx.emit(Event::info(format!(
            "Focused on '{title}'. Commands: hist, addhist [note], back."
        )));
        let prefix = format!("{title}> ");
        let hints: Vec<String> = FOCUS_WORDS.iter().map(|word| word.to_string()).collect();
        loop {
            let line = match ctx.prompt(&prefix, &hints) {
                Prompt::Line(line) => line,
                Prompt::Cancelled => break,
            };
            match self.focus_line(ctx, &title, &line) {
                Ok(Flow::Exit) => break,
                Ok(Flow::Continue) => {}
                Err(error) => report(ctx, &error),
            }
        }
        Ok(())
    }

    /// `Flow::Exit` here only leaves focus mode.
    fn focus_line(&mut self, ctx: &mut impl CommandCtx, title: &str, line: &str) -> Result<Flow> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Flow::Continue);
        }
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map(|(word, rest)| (word, rest.trim()))
            .unwrap_or((line, ""));
        match word.to_ascii_lowercase().as_str() {
            "back" if rest.is_empty() => return Ok(Flow::Exit),
            "hist" if rest.is_empty() => self.history_impl(ctx, title)?,
            "addhist" => {
                let note = if rest.is_empty() {
                    match ctx.prompt("Note: ", &[]) {
                        Prompt::Line(note) => note,
                        Prompt::Cancelled => return Ok(Flow::Continue),
                    }
                } else {
                    unquote(rest).to_string()
                };
                self.add_history_impl(ctx, title, &note)?;
            }
            _ => return Err(Error::usage("hist | addhist [note] | back")),
        }
        Ok(Flow::Continue)
    }

    fn export_impl(&self, ctx: &mut impl CommandCtx) -> Result<()> {
        let id = self.backups.export(&self.store)?;
        ctx.emit(Event::success(format!("Backup saved as {id}.")));
        Ok(())
    }

    fn import_impl(&mut self, ctx: &mut impl CommandCtx, target: &str) -> Result<()> {
        let source = self.backups.import(&mut self.store, target)?;
        ctx.emit(Event::success(format!(
            "Imported {} tasks from {source}.",
            self.store.len()
        )));
        Ok(())
    }

    fn search_impl(&self, ctx: &mut impl CommandCtx, keyword: &str) {
        let rows = self
            .store
            .search(keyword)
            .into_iter()
            .map(SearchRow::from)
            .collect();
        ctx.emit(Event::SearchResults {
            keyword: keyword.to_string(),
            rows,
        });
    }

    fn exit_impl(&self, ctx: &mut impl CommandCtx) -> Flow {
        match self.backups.on_exit(&self.store) {
            Ok(Some(id)) => ctx.emit(Event::info(format!("Backup saved as {id}."))),
            Ok(None) => {}
            Err(error) => report(ctx, &error),
        }
        ctx.emit(Event::info("Leaving..."));
        Flow::Exit
    }
}

fn confirm(ctx: &mut impl CommandCtx, question: &str) -> bool {
    let hints = ["y".to_string(), "n".to_string()];
    match ctx.prompt(question, &hints) {
        Prompt::Line(answer) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Prompt::Cancelled => false,
    }
}

fn report(ctx: &mut impl CommandCtx, error: &Error) {
    match error {
        Error::Storage(StorageError::Io(_) | StorageError::Json(_)) => {
            log::error!("storage failure: {error}")
        }
        _ => log::debug!("command failed: {error}"),
    }
    ctx.emit(Event::error(error.to_string()));
}
