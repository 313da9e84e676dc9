//! A line-oriented `ViewPort` for the terminal.

use chatwire_core::{ViewEvent, ViewPort, controller::Controls};
use chrono::Local;
use std::io::{self, Write};

/// Formats one view event as a single display line. Events with no terminal
/// representation yield `None`.
pub fn render(event: &ViewEvent) -> Option<String> {
    let line = match event {
        ViewEvent::StatusChanged(state) => format!("[status] {state}"),
        ViewEvent::Notice(text) => format!("[system] {text}"),
        ViewEvent::UserMessage(text) => format!("you> {text}"),
        ViewEvent::TypingStarted(_) => "[assistant is typing...]".to_string(),
        // Only the committed message is printed; the live buffer would flood the terminal.
        ViewEvent::TypingUpdated(_) | ViewEvent::TypingStopped => return None,
        ViewEvent::AssistantMessage(text) => format!("assistant> {text}"),
        ViewEvent::ToolResult { tool_name, result } => {
            let result = serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string());
            format!("[tool: {tool_name}]\n{result}")
        }
        ViewEvent::CountersChanged(counters) => format!(
            "[counters] messages: {} tool calls: {}",
            counters.messages, counters.tool_calls
        ),
        ViewEvent::SessionChanged {
            session_id,
            user_id,
        } => match user_id {
            Some(user_id) => format!("[session] {session_id} (user {user_id})"),
            None => format!("[session] {session_id}"),
        },
        ViewEvent::LocatorChanged(url) => format!("[page] {url}"),
        ViewEvent::ConnectedAt(at) => format!(
            "[connected at] {}",
            at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        ),
        ViewEvent::ChatCleared => "[chat cleared]".to_string(),
        ViewEvent::Snapshot(snapshot) => {
            let session = serde_json::to_string_pretty(&snapshot.session)
                .unwrap_or_else(|_| snapshot.session.to_string());
            format!(
                "[session data] {} stored events\n{session}",
                snapshot.events.len()
            )
        }
        ViewEvent::Alert(text) => format!("[alert] {text}"),
    };
    Some(line)
}

/// One line listing the commands that make sense right now.
pub fn render_controls(controls: Controls) -> String {
    let mut available = Vec::new();
    if controls.connect {
        available.push("/connect");
    }
    if controls.disconnect {
        available.push("/disconnect");
    }
    if controls.send {
        available.push("<message>");
    }
    if controls.end_session {
        available.push("/end");
    }
    if controls.tool_probe {
        available.push("/tool");
    }
    if controls.new_session {
        available.push("/new");
    }
    format!("[available] {}", available.join(" "))
}

/// Prints every renderable event, stamped with the local time. Each status
/// change is followed by the commands that state allows.
pub struct TerminalView<W> {
    out: W,
}

impl TerminalView<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Prints a line that did not come from the core, e.g. a usage hint.
    pub fn print(&mut self, line: &str) {
        self.write_line(line);
    }

    fn write_line(&mut self, line: &str) {
        let stamp = Local::now().format("%H:%M:%S");
        if let Err(e) = writeln!(self.out, "{stamp} {line}").and_then(|_| self.out.flush()) {
            tracing::warn!(error = %e, "Failed to write to terminal");
        }
    }
}

impl<W: Write> ViewPort for TerminalView<W> {
    fn notify(&mut self, event: ViewEvent) {
        if let Some(line) = render(&event) {
            self.write_line(&line);
        }
        if let ViewEvent::StatusChanged(state) = event {
            self.write_line(&render_controls(Controls::for_state(state)));
        }
    }
}
