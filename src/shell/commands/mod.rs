pub mod cat;
pub mod cd;
pub mod exit;
pub mod identity;
pub mod ls;
pub mod pwd;
pub mod sysinfo;
pub mod uname;

use crate::shell::context::ShellState;

/// Side effect a command has on the session, applied by the shell loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    None,
    SetCwd(String),
    Exit,
}

/// Result of executing a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub output: String,
    pub effect: StateChange,
}

impl CommandOutcome {
    pub fn output(text: impl Into<String>) -> Self {
        Self {
            output: text.into(),
            effect: StateChange::None,
        }
    }

    pub fn empty() -> Self {
        Self::output(String::new())
    }

    pub fn set_cwd(path: String) -> Self {
        Self {
            output: String::new(),
            effect: StateChange::SetCwd(path),
        }
    }

    pub fn exit() -> Self {
        Self {
            output: "\nlogout\nConnection closed.\n".to_string(),
            effect: StateChange::Exit,
        }
    }

    pub fn not_found(cmd: &str) -> Self {
        Self::output(format!("bash: {}: command not found\n", cmd))
    }

    pub fn is_exit(&self) -> bool {
        self.effect == StateChange::Exit
    }
}

pub type CommandFn = fn(&[&str], &ShellState) -> CommandOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Exit,
    Pwd,
    Whoami,
    Hostname,
    Uname,
    Id,
    Uptime,
    Df,
    Free,
    Ps,
    Ls,
    Cd,
    Cat,
}

/// Command names are matched exactly and case-sensitively on the first token.
pub const COMMAND_TABLE: &[(&str, CommandKind)] = &[
    ("exit", CommandKind::Exit),
    ("pwd", CommandKind::Pwd),
    ("whoami", CommandKind::Whoami),
    ("hostname", CommandKind::Hostname),
    ("uname", CommandKind::Uname),
    ("id", CommandKind::Id),
    ("uptime", CommandKind::Uptime),
    ("df", CommandKind::Df),
    ("free", CommandKind::Free),
    ("ps", CommandKind::Ps),
    ("ls", CommandKind::Ls),
    ("cd", CommandKind::Cd),
    ("cat", CommandKind::Cat),
];

impl CommandKind {
    pub fn lookup(name: &str) -> Option<Self> {
        COMMAND_TABLE
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, kind)| *kind)
    }

    pub fn name(self) -> &'static str {
        COMMAND_TABLE
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(n, _)| *n)
            .unwrap_or("")
    }

    pub fn handler(self) -> CommandFn {
        match self {
            CommandKind::Exit => exit::run,
            CommandKind::Pwd => pwd::run,
            CommandKind::Whoami => identity::whoami,
            CommandKind::Hostname => identity::hostname,
            CommandKind::Id => identity::id,
            CommandKind::Uname => uname::run,
            CommandKind::Uptime => sysinfo::uptime,
            CommandKind::Df => sysinfo::df,
            CommandKind::Free => sysinfo::free,
            CommandKind::Ps => sysinfo::ps,
            CommandKind::Ls => ls::run,
            CommandKind::Cd => cd::run,
            CommandKind::Cat => cat::run,
        }
    }
}

/// Table entry for the first token of `line`, if it names a known command.
pub fn classify(line: &str) -> Option<CommandKind> {
    line.split_whitespace().next().and_then(CommandKind::lookup)
}

/// Evaluate one decoded command line against the current shell state.
pub fn dispatch(line: &str, state: &ShellState) -> CommandOutcome {
    let mut tokens = line.split_whitespace();
    let Some(cmd) = tokens.next() else {
        return CommandOutcome::empty();
    };
    let args: Vec<&str> = tokens.collect();

    match CommandKind::lookup(cmd) {
        Some(kind) => (kind.handler())(&args, state),
        None => CommandOutcome::not_found(cmd),
    }
}
