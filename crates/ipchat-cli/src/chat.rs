use crate::common::{ctrl_c, finish_printer, spawn_event_printer};
use crate::events::{emit, EventStarted, EventSummary};
use crate::output::Output;
use ipchat_protocol::RuntimeChannels;
use ipchat_transport::{Destination, OutboundMessage};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Type a message and press Enter to send it.
  /to <address|group:name>   change target
  /file <path>               send a text file
  /help                      show this help
  /quit                      leave";

/// One line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Message(&'a str),
    File(&'a str),
    Target(&'a str),
    Help,
    Quit,
    Empty,
}

fn parse_input(line: &str) -> ChatInput<'_> {
    let line = line.trim();
    if line.is_empty() {
        return ChatInput::Empty;
    }
    let (command, arg) = match line.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    };
    match command {
        "/quit" | "/exit" => ChatInput::Quit,
        "/help" => ChatInput::Help,
        "/to" if !arg.is_empty() => ChatInput::Target(arg),
        "/file" if !arg.is_empty() => ChatInput::File(arg),
        "/to" | "/file" => ChatInput::Help,
        _ => ChatInput::Message(line),
    }
}

/// Interactive session: the delivery server runs in the background while
/// stdin lines are sent to the current target.
pub async fn run(
    channels: RuntimeChannels,
    name: &str,
    output: Arc<Output>,
    target: Option<String>,
) -> anyhow::Result<()> {
    let RuntimeChannels { handle, events } = channels;
    let local = handle.local_addr();

    emit(&EventStarted::new(name, "chat", Some(local.to_string())));
    eprintln!("Chatting as {name}, listening on {local}");
    eprintln!("{HELP}\n");

    let printer = spawn_event_printer(events, output.clone());
    let mut target = target;
    if let Some(t) = &target {
        eprintln!("Target: {t}");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = ctrl_c() => break,
        };
        let Some(line) = line else { break };

        let message = match parse_input(&line) {
            ChatInput::Empty => continue,
            ChatInput::Quit => break,
            ChatInput::Help => {
                eprintln!("{HELP}");
                continue;
            }
            ChatInput::Target(t) => {
                match Destination::parse(t, handle.default_port()) {
                    Ok(dest) => {
                        eprintln!("Target: {dest}");
                        target = Some(t.to_string());
                    }
                    Err(e) => eprintln!("{e}"),
                }
                continue;
            }
            ChatInput::File(path) => match OutboundMessage::from_text_file(name, Path::new(path)) {
                Ok(message) => message,
                Err(e) => {
                    output.note(format!("[FILE ERROR] {path}: {e}"));
                    continue;
                }
            },
            ChatInput::Message(body) => OutboundMessage::text(name, body),
        };

        let Some(t) = target.as_deref() else {
            eprintln!("No target yet, use /to <address|group:name>");
            continue;
        };
        match handle.send(t, &message).await {
            Ok(report) => output.report(&report, &message),
            Err(e) => eprintln!("{e}"),
        }
    }

    handle.shutdown().await;
    let delivery_stats = handle.delivery_stats();
    let server_stats = handle.server_stats();
    drop(handle);
    finish_printer(printer).await;

    emit(&EventSummary {
        event: "summary",
        mode: "chat".into(),
        delivery: Some(delivery_stats.snapshot()),
        server: Some(server_stats.snapshot()),
        elapsed_s: output.elapsed_s(),
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_are_messages() {
        assert_eq!(parse_input("  hello there "), ChatInput::Message("hello there"));
        assert_eq!(parse_input("/shrug ok"), ChatInput::Message("/shrug ok"));
    }

    #[test]
    fn commands() {
        assert_eq!(parse_input("/quit"), ChatInput::Quit);
        assert_eq!(parse_input("/to group:friends"), ChatInput::Target("group:friends"));
        assert_eq!(parse_input("/file  notes.txt "), ChatInput::File("notes.txt"));
        assert_eq!(parse_input("/to"), ChatInput::Help);
        assert_eq!(parse_input("   "), ChatInput::Empty);
    }
}
