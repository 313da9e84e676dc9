//! Turns terminal lines into user commands.

/// One user action, as typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Connect,
    Disconnect,
    EndSession,
    NewSession,
    ClearChat,
    ToolProbe,
    /// `/prompt` lists the example prompts, `/prompt <n>` sends one.
    Prompt(Option<usize>),
    FetchSnapshot,
    Back,
    Status,
    Quit,
    Message(String),
    /// An unrecognised slash command, kept verbatim for the usage hint.
    Unknown(String),
}

pub const USAGE: &str = "Commands: /connect /disconnect /end /new /clear /tool /prompt [n] /data /back /status /quit. \
Anything else is sent as a message.";

/// Parses one input line. Blank lines yield `None`.
///
/// A line starting with `//` escapes the slash and is sent as a message.
pub fn parse_line(line: &str) -> Option<UserCommand> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(escaped) = trimmed.strip_prefix("//") {
        return Some(UserCommand::Message(format!("/{escaped}")));
    }
    let Some(command) = trimmed.strip_prefix('/') else {
        return Some(UserCommand::Message(trimmed.to_string()));
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, Some(arg.trim())),
        None => (command, None),
    };
    let unknown = || UserCommand::Unknown(trimmed.to_string());

    let name = name.to_ascii_lowercase();
    if name == "prompt" {
        return Some(match arg.map(str::parse::<usize>) {
            None => UserCommand::Prompt(None),
            Some(Ok(number)) => UserCommand::Prompt(Some(number)),
            Some(Err(_)) => unknown(),
        });
    }
    if arg.is_some() {
        return Some(unknown());
    }

    let command = match name.as_str() {
        "connect" => UserCommand::Connect,
        "disconnect" => UserCommand::Disconnect,
        "end" => UserCommand::EndSession,
        "new" => UserCommand::NewSession,
        "clear" => UserCommand::ClearChat,
        "tool" => UserCommand::ToolProbe,
        "data" => UserCommand::FetchSnapshot,
        "back" => UserCommand::Back,
        "status" => UserCommand::Status,
        "quit" | "exit" => UserCommand::Quit,
        _ => unknown(),
    };
    Some(command)
}
