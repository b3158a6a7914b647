fn main() {
    if let Err(err) = task_shell_lib::run() {
        eprintln!("task-shell: {err}");
        std::process::exit(1);
    }
}
