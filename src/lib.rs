pub mod backup;
pub mod commands;
#[cfg(all(feature = "app", not(test)))]
mod console;
pub mod error;
pub mod events;
mod logging;
pub mod models;
pub mod parse;
pub mod storage;
pub mod store;

#[cfg(all(feature = "app", not(test)))]
use crate::commands::Session;
#[cfg(all(feature = "app", not(test)))]
use crate::console::ConsoleCtx;
#[cfg(all(feature = "app", not(test)))]
use crate::models::Settings;
#[cfg(all(feature = "app", not(test)))]
use crate::storage::Storage;

#[cfg(all(feature = "app", not(test)))]
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let root = storage::default_root();
    // Logging is best-effort; the task list still works without a log file.
    let _logger = match logging::init_logging(&root) {
        Ok(handle) => Some(handle),
        Err(err) => {
            eprintln!("logging disabled: {err}");
            None
        }
    };

    let settings = Storage::new(root.clone())
        .load_settings()
        .unwrap_or_else(|err| {
            log::warn!("settings unreadable, using defaults: {err}");
            Settings::default()
        });
    let storage = Storage::with_settings(root, &settings);

    let mut session = Session::open(storage, &settings).map_err(|err| {
        log::error!("failed to open task store: {err}");
        err
    })?;
    let mut console = ConsoleCtx::new()?;
    session.run(&mut console);
    Ok(())
}
