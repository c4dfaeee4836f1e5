use crate::engine::state::ScanCommand;

/// App version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub const HELP: &str = "commands: start | stop | list | open <n> | quit";

/// Parse one console line. Returns `None` for blank or unknown input.
pub fn parse_command(line: &str) -> Option<ScanCommand> {
    let mut parts = line.split_whitespace();
    let verb = parts.next()?.to_ascii_lowercase();
    let arg = parts.next();
    if parts.next().is_some() {
        return None;
    }
    match (verb.as_str(), arg) {
        ("start", None) => Some(ScanCommand::Start),
        ("stop", None) => Some(ScanCommand::Stop),
        ("list" | "ls", None) => Some(ScanCommand::List),
        ("open", Some(n)) => n.parse().ok().map(ScanCommand::Open),
        ("quit" | "exit", None) => Some(ScanCommand::Shutdown),
        _ => None,
    }
}
