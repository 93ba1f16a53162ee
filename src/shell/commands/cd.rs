use crate::shell::commands::CommandOutcome;
use crate::shell::context::{join_cwd, ShellState};

/// `cd` with no argument leaves the directory unchanged; extra arguments are ignored.
pub fn run(args: &[&str], state: &ShellState) -> CommandOutcome {
    match args.first() {
        Some(target) => CommandOutcome::set_cwd(join_cwd(&state.cwd, target)),
        None => CommandOutcome::empty(),
    }
}
