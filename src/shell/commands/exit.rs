use crate::shell::commands::CommandOutcome;
use crate::shell::context::ShellState;

pub fn run(_args: &[&str], _state: &ShellState) -> CommandOutcome {
    CommandOutcome::exit()
}
