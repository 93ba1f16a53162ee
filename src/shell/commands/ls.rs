use crate::shell::commands::CommandOutcome;
use crate::shell::context::ShellState;

/// Same listing in every directory; flags and paths are ignored.
pub fn run(_args: &[&str], _state: &ShellState) -> CommandOutcome {
    CommandOutcome::output("file1.txt  file2.log  directory/\n")
}
