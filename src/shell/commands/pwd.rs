use crate::shell::commands::CommandOutcome;
use crate::shell::context::ShellState;

pub fn run(_args: &[&str], state: &ShellState) -> CommandOutcome {
    CommandOutcome::output(format!("{}\n", state.cwd))
}
