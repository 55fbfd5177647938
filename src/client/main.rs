/**
 * XFCollab Pairing Client
 *
 * Terminal front end for one pairing session. Lines typed on stdin are either
 * commands or chat:
 *
 * - `/append <text>` - type a line at the end of the shared buffer
 * - `/lang <language>` - switch the editor language
 * - `/question <id>` - load a problem
 * - `/run` - run the buffer against the problem's test cases
 * - `/dismiss` - dismiss the partner notice
 * - `/quit` - leave the room
 * - `@partner <text>` - message the partner
 * - anything else - ask the coding assistant
 */
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use xfcollab::client::{CollabSession, SessionCommand, SessionConfig, SessionEvent};
use xfcollab::shared::{ChatRole, Language};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = SessionConfig::from_env()?;
    tracing::info!(
        "[STARTUP] Pairing client for room {}",
        config.app.room_id.as_deref().unwrap_or("<unset>")
    );

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (session, transport_events) = CollabSession::connect(&config, events_tx);

    tokio::spawn(render(events_rx));
    tokio::spawn(read_commands(commands_tx));

    session.run(transport_events, commands_rx).await;
    Ok(())
}

async fn read_commands(commands: mpsc::UnboundedSender<SessionCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                eprintln!("{}", message);
                continue;
            }
        };
        let quitting = command == SessionCommand::Quit;
        if commands.send(command).is_err() || quitting {
            break;
        }
    }
}

fn parse_command(line: &str) -> Result<Option<SessionCommand>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if !trimmed.starts_with('/') {
        return Ok(Some(SessionCommand::Chat(trimmed.to_string())));
    }

    let (name, rest) = trimmed.split_once(' ').unwrap_or((trimmed, ""));
    let command = match name {
        "/append" => SessionCommand::Append(format!("{}\n", rest)),
        "/lang" => {
            let language: Language = rest.parse().map_err(|e| format!("{}", e))?;
            SessionCommand::SetLanguage(language)
        }
        "/question" if !rest.trim().is_empty() => {
            SessionCommand::LoadQuestion(rest.trim().to_string())
        }
        "/run" => SessionCommand::Run,
        "/dismiss" => SessionCommand::DismissNotice,
        "/quit" => SessionCommand::Quit,
        other => return Err(format!("unknown command {}", other)),
    };
    Ok(Some(command))
}

async fn render(mut events: mpsc::UnboundedReceiver<SessionEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Status(status) => println!("[status] {}", status),
            SessionEvent::Document(content) => {
                println!("----- code -----\n{}\n----------------", content)
            }
            SessionEvent::ChatEntry(entry) => {
                let label = match entry.role {
                    ChatRole::SelfAuthored => "you → partner",
                    ChatRole::Peer => "partner",
                    ChatRole::User => "you → assistant",
                    ChatRole::Assistant => "assistant",
                    ChatRole::System => "system",
                };
                let state = if entry.pending { " (sending)" } else { "" };
                println!("[{}]{} {}", label, state, entry.content);
            }
            SessionEvent::ChatDelivered(index) => println!("[chat] message {} delivered", index),
            SessionEvent::Notice(Some(notice)) => println!("*** partner: {} ***", notice.content),
            SessionEvent::Notice(None) => {}
            SessionEvent::PeerLeft => println!("[status] your partner left the session"),
            SessionEvent::Question(question) => {
                println!("[question] {}\n{}", question.title, question.description)
            }
            SessionEvent::Execution(report) => println!("{}", report.summary()),
        }
    }
}
