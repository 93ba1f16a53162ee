use crate::shell::commands::CommandOutcome;
use crate::shell::context::ShellState;

const BAIT_FILE: &str = "file1.txt";

pub fn run(args: &[&str], _state: &ShellState) -> CommandOutcome {
    match args.first() {
        Some(&BAIT_FILE) => CommandOutcome::output("This is a fake honeypot file.\n"),
        _ => CommandOutcome::output("cat: No such file or directory\n"),
    }
}
