//! Canned system-status commands. Output never changes between calls.

use crate::shell::commands::CommandOutcome;
use crate::shell::context::ShellState;

const UPTIME: &str = " 16:42:13 up 8 days, 23:27, 1 user, load average: 0.08, 0.03, 0.01\n";

const DF: &str = "Filesystem     1K-blocks      Used Available Use% Mounted on\n\
/dev/sda1      41251136  12164412  27033340  32% /\n";

const FREE: &str = "               total        used        free      shared  buff/cache   available\n\
Mem:        16280908     4521432     8944072      322160     2815404    11139656\n";

const PS: &str = "    PID TTY          TIME CMD\n   3264 pts/0    00:00:00 bash\n   3349 pts/0    00:00:00 ps\n";

pub fn uptime(_args: &[&str], _state: &ShellState) -> CommandOutcome {
    CommandOutcome::output(UPTIME)
}

pub fn df(_args: &[&str], _state: &ShellState) -> CommandOutcome {
    CommandOutcome::output(DF)
}

pub fn free(_args: &[&str], _state: &ShellState) -> CommandOutcome {
    CommandOutcome::output(FREE)
}

pub fn ps(_args: &[&str], _state: &ShellState) -> CommandOutcome {
    CommandOutcome::output(PS)
}
