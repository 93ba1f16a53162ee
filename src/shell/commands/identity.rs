use crate::shell::commands::CommandOutcome;
use crate::shell::context::ShellState;

pub fn whoami(_args: &[&str], state: &ShellState) -> CommandOutcome {
    CommandOutcome::output(format!("{}\n", state.username))
}

pub fn hostname(_args: &[&str], state: &ShellState) -> CommandOutcome {
    CommandOutcome::output(format!("{}\n", state.hostname))
}

/// Unprivileged uid 1000 in the stock Ubuntu admin groups.
pub fn id(_args: &[&str], state: &ShellState) -> CommandOutcome {
    let user = &state.username;
    CommandOutcome::output(format!(
        "uid=1000({user}) gid=1000({user}) groups=1000({user}),4(adm),24(cdrom),27(sudo)\n"
    ))
}
