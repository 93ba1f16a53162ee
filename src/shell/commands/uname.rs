use crate::shell::commands::CommandOutcome;
use crate::shell::context::ShellState;

/// Always the `uname -a` form, whatever flags were passed.
pub fn run(_args: &[&str], state: &ShellState) -> CommandOutcome {
    CommandOutcome::output(format!(
        "Linux {} 5.15.0-91-generic #101-Ubuntu SMP x86_64 GNU/Linux\n",
        state.hostname
    ))
}
