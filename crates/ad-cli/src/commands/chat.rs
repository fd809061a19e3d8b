use ad_core::config::Config;
use ad_core::pipeline::PipelineSnapshot;
use ad_core::types::{ChatMessage, ChatRole};
use ad_session::{ConversationManager, DeploymentSession};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::{backend, describe_event, format_log_entry, format_snapshot, status_line, LogCursor};

const HELP: &str = "commands: /reset /steps /logs /clear /reconnect /quit";

/// A line typed at the chat prompt.
#[derive(Debug, PartialEq, Eq)]
enum ReplInput<'a> {
    Message(&'a str),
    Reset,
    Steps,
    Logs,
    Clear,
    Reconnect,
    Quit,
    Unknown(&'a str),
}

fn parse_input(line: &str) -> ReplInput<'_> {
    let line = line.trim();
    if !line.starts_with('/') {
        return ReplInput::Message(line);
    }
    match line {
        "/reset" => ReplInput::Reset,
        "/steps" => ReplInput::Steps,
        "/logs" => ReplInput::Logs,
        "/clear" => ReplInput::Clear,
        "/reconnect" => ReplInput::Reconnect,
        "/quit" | "/exit" => ReplInput::Quit,
        other => ReplInput::Unknown(other),
    }
}

fn print_message(message: &ChatMessage) {
    match message.role {
        ChatRole::Agent => println!("\nassistant> {}\n", message.content),
        ChatRole::User => println!("you> {}", message.content),
    }
}

async fn prompt() -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"> ").await?;
    stdout.flush().await
}

/// Run the `chat` subcommand: a line-oriented front end for one session.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    let session = DeploymentSession::start(backend(config), config);
    let conversation = session.conversation();
    let mut chat = conversation.lock().await;
    let events = session.subscribe_events();
    let mut snapshots = session.store().subscribe_snapshot();
    let mut logs = session.logs().subscribe();
    let mut cursor = LogCursor::default();
    let mut last_steps: Option<PipelineSnapshot> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // The prompt loop is blocked while a message is dispatched, so the
    // status phrase is printed from here.
    let mut convo = chat.subscribe();
    let phrases = tokio::spawn(async move {
        let mut was_thinking = false;
        while convo.changed().await.is_ok() {
            let (thinking, phrase) = {
                let snap = convo.borrow_and_update();
                (snap.thinking, snap.status_phrase.clone())
            };
            if thinking && !was_thinking {
                eprintln!("{}", status_line(&phrase));
            }
            was_thinking = thinking;
        }
    });

    for message in chat.messages() {
        print_message(&message);
    }
    eprintln!("{}", status_line(HELP));
    prompt().await?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_line(&session, &mut chat, &line, &mut cursor).await {
                    break;
                }
                prompt().await?;
            }
            Ok(()) = snapshots.changed() => {
                let snap = snapshots.borrow_and_update().clone();
                if !snap.is_idle() && last_steps.as_ref() != Some(&snap) {
                    println!("\n{}", format_snapshot(&snap));
                    last_steps = Some(snap);
                }
            }
            Ok(()) = logs.changed() => {
                for entry in cursor.fresh(&logs.borrow_and_update()) {
                    println!("{}", status_line(&format_log_entry(&entry)));
                }
            }
            Ok(event) = events.recv_async() => {
                if let Some(line) = describe_event(&event) {
                    eprintln!("{}", status_line(&line));
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    phrases.abort();
    session.shutdown();
    Ok(())
}

/// Returns `false` when the user asked to quit.
async fn handle_line(
    session: &DeploymentSession,
    chat: &mut ConversationManager,
    line: &str,
    cursor: &mut LogCursor,
) -> bool {
    match parse_input(line) {
        ReplInput::Message("") => {}
        ReplInput::Message(text) => {
            let before = chat.messages().len();
            chat.submit(text).await;
            // The user's own line is already on screen.
            for message in chat.messages().iter().skip(before + 1) {
                print_message(message);
            }
        }
        ReplInput::Reset => {
            chat.reset();
            for message in chat.messages() {
                print_message(&message);
            }
        }
        ReplInput::Steps => println!("{}", format_snapshot(&session.store().snapshot())),
        ReplInput::Logs => {
            let entries = session.logs().entries();
            if entries.is_empty() {
                println!("(no log entries)");
            }
            for entry in &entries {
                println!("{}", format_log_entry(entry));
            }
        }
        ReplInput::Clear => {
            session.logs().clear();
            *cursor = LogCursor::default();
            eprintln!("{}", status_line("log window cleared"));
        }
        ReplInput::Reconnect => session.logs().reconnect(),
        ReplInput::Quit => return false,
        ReplInput::Unknown(cmd) => eprintln!("unknown command {cmd}; {HELP}"),
    }
    true
}
