use crate::sync::DisplayCounters;

const BAR_WIDTH: usize = 20;

pub const HELP: &str = "\
commands:
  <enter> | tap              count one
  register <user> <pass>     create an account and sign in
  login <user> <pass>        sign in
  logout                     sign out (unsent taps are kept)
  targets <daily> <final>    set goals
  status                     show counters
  help                       this text
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Tap,
    Register { username: String, password: String },
    Login { username: String, password: String },
    Logout,
    Targets { daily: u64, final_target: u64 },
    Status,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(Command::Tap);
        };
        let args: Vec<&str> = words.collect();

        match (head, args.as_slice()) {
            ("tap" | "t", []) => Ok(Command::Tap),
            ("register", [username, password]) => Ok(Command::Register {
                username: username.to_string(),
                password: password.to_string(),
            }),
            ("login", [username, password]) => Ok(Command::Login {
                username: username.to_string(),
                password: password.to_string(),
            }),
            ("logout", []) => Ok(Command::Logout),
            ("targets", [daily, final_target]) => Ok(Command::Targets {
                daily: parse_target(daily)?,
                final_target: parse_target(final_target)?,
            }),
            ("status" | "s", []) => Ok(Command::Status),
            ("help" | "?", []) => Ok(Command::Help),
            ("quit" | "q" | "exit", []) => Ok(Command::Quit),
            _ => Err(format!("unknown command: {}", line.trim())),
        }
    }
}

fn parse_target(raw: &str) -> Result<u64, String> {
    match raw.parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(format!("target must be a positive whole number, got {raw:?}")),
    }
}

pub fn render_counters(display: &DisplayCounters, online: bool) -> String {
    let mut out = format!(
        "today    {:>6} / {:<6} {}\nlifetime {:>6} / {:<6} {}",
        display.daily,
        display.daily_target,
        bar(display.daily_progress()),
        display.total,
        display.final_target,
        bar(display.total_progress()),
    );
    if !display.is_synced() {
        let reason = if online { "" } else { ", offline" };
        out.push_str(&format!("\nnot synced: {} pending{reason}", display.pending));
    }
    out
}

fn bar(percent: f64) -> String {
    let filled = ((percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        percent.round() as u64
    )
}
