use crate::error::{Error, Result};
use crate::models::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Done,
    Pending,
}

impl Filter {
    pub fn accepts(self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Done => task.completed,
            Filter::Pending => !task.completed,
        }
    }
}

/// Outcome of a completion toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Changed,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit<'a> {
    /// 1-based position in the store.
    pub index: usize,
    pub task: &'a Task,
    /// 1-based note numbers paired with the matching notes.
    pub notes: Vec<(usize, &'a str)>,
}

/// The ordered task collection. Titles are unique under case-insensitive comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks: dedup_titles(tasks),
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn titles(&self) -> Vec<String> {
        self.tasks.iter().map(|task| task.title.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Result<&Task> {
        self.tasks
            .iter()
            .find(|task| task.is_named(name))
            .ok_or_else(|| Error::NotFound(name.trim().to_string()))
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|task| task.is_named(name))
            .ok_or_else(|| Error::NotFound(name.trim().to_string()))
    }

    pub fn add(&mut self, title: &str) -> Result<&Task> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::InvalidTitle);
        }
        if self.tasks.iter().any(|task| task.is_named(title)) {
            return Err(Error::DuplicateTitle(title.to_string()));
        }
        self.tasks.push(Task::new(title));
        Ok(&self.tasks[self.tasks.len() - 1])
    }

    pub fn complete(&mut self, name: &str) -> Result<Transition> {
        self.set_completed(name, true)
    }

    pub fn uncomplete(&mut self, name: &str) -> Result<Transition> {
        self.set_completed(name, false)
    }

    fn set_completed(&mut self, name: &str, completed: bool) -> Result<Transition> {
        let task = self.get_mut(name)?;
        if task.completed == completed {
            return Ok(Transition::Unchanged);
        }
        task.completed = completed;
        Ok(Transition::Changed)
    }

    pub fn delete(&mut self, name: &str) -> Result<Task> {
        let index = self
            .tasks
            .iter()
            .position(|task| task.is_named(name))
            .ok_or_else(|| Error::NotFound(name.trim().to_string()))?;
        Ok(self.tasks.remove(index))
    }

    pub fn history(&self, name: &str) -> Result<&[String]> {
        Ok(&self.get(name)?.history)
    }

    /// Returns the number of the appended note.
    pub fn add_history(&mut self, name: &str, note: &str) -> Result<usize> {
        let task = self.get_mut(name)?;
        let note = note.trim();
        if note.is_empty() {
            return Err(Error::InvalidNote);
        }
        task.history.push(note.to_string());
        Ok(task.history.len())
    }

    /// `index` is 1-based. Returns the replaced note.
    pub fn edit_history(&mut self, name: &str, index: usize, new_note: &str) -> Result<String> {
        let task = self.get_mut(name)?;
        check_note_index(task, index as i64)?;
        let new_note = new_note.trim();
        if new_note.is_empty() {
            return Err(Error::InvalidNote);
        }
        Ok(std::mem::replace(
            &mut task.history[index - 1],
            new_note.to_string(),
        ))
    }

    /// Pairs each visible task with its 1-based position in the full collection.
    pub fn list(&self, filter: Filter) -> impl Iterator<Item = (usize, &Task)> + '_ {
        self.tasks
            .iter()
            .enumerate()
            .filter(move |(_, task)| filter.accepts(task))
            .map(|(i, task)| (i + 1, task))
    }

    pub fn search(&self, keyword: &str) -> Vec<SearchHit<'_>> {
        let needle = keyword.trim().to_lowercase();
        self.tasks
            .iter()
            .enumerate()
            .filter_map(|(i, task)| {
                let notes: Vec<(usize, &str)> = task
                    .history
                    .iter()
                    .enumerate()
                    .filter(|(_, note)| note.to_lowercase().contains(&needle))
                    .map(|(n, note)| (n + 1, note.as_str()))
                    .collect();
                let title_matches = task.title.to_lowercase().contains(&needle);
                if !title_matches && notes.is_empty() {
                    return None;
                }
                Some(SearchHit {
                    index: i + 1,
                    task,
                    notes,
                })
            })
            .collect()
    }

    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks = dedup_titles(tasks);
    }
}

/// Validates a user-supplied 1-based note number against a task's history.
pub fn check_note_index(task: &Task, index: i64) -> Result<()> {
    if task.history.is_empty() {
        return Err(Error::EmptyHistory(task.title.clone()));
    }
    let len = task.history.len();
    if index < 1 || index as usize > len {
        return Err(Error::IndexOutOfRange { index, len });
    }
    Ok(())
}

fn dedup_titles(tasks: Vec<Task>) -> Vec<Task> {
    let mut kept: Vec<Task> = Vec::with_capacity(tasks.len());
    for task in tasks {
        if kept.iter().any(|existing| existing.is_named(&task.title)) {
            log::warn!("dropping duplicate task title={:?}", task.title);
            continue;
        }
        kept.push(task);
    }
    kept
}
