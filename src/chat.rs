// Interactive terminal chat. Reads one line per action from stdin and redraws
// whenever the store publishes a new snapshot.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::constants::{CELEBRITIES, CUSTOM_LABEL, CUSTOM_SENTINEL, USER_LABEL};
use crate::session::{ChatState, Role};
use crate::store::{SendOutcome, Store};

const RESET_COMMAND: &str = "/reset";
const QUIT_COMMAND: &str = "/quit";

/// Where the selection screen is while no session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prompt {
    Celebrity,
    CustomName,
}

/// What the terminal has already shown of the current snapshot.
#[derive(Debug, Default)]
struct Rendered {
    session_id: Option<String>,
    messages: usize,
}

pub async fn run_terminal_chat(store: Store) -> Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    run_chat(store, stdin, tokio::io::stdout()).await
}

/// Drives a chat over any line-based input and text output.
///
/// On end of input, waits for outstanding replies and renders them before
/// returning. `/quit` returns immediately.
pub async fn run_chat<R, W>(store: Store, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("Starting terminal chat");
    let mut lines = input.lines();
    let mut updates = store.subscribe();
    let mut rendered = Rendered::default();
    let mut prompt = Prompt::Celebrity;
    let mut in_flight: Vec<JoinHandle<SendOutcome>> = Vec::new();

    write_selection_screen(&mut output).await?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    debug!(pending = in_flight.len(), "Input closed");
                    for handle in in_flight.drain(..) {
                        handle.await.context("Send task failed")?;
                    }
                    render(&store.snapshot(), &mut rendered, &mut output).await?;
                    break;
                };
                let line = line.trim_end_matches('\r');

                if store.snapshot().is_started() {
                    match line.trim() {
                        QUIT_COMMAND => break,
                        RESET_COMMAND => {
                            store.reset_session();
                            prompt = Prompt::Celebrity;
                            write_selection_screen(&mut output).await?;
                        }
                        _ => {
                            store.draft_message(line);
                            if let Some(handle) = store.spawn_send() {
                                in_flight.retain(|h| !h.is_finished());
                                in_flight.push(handle);
                            }
                        }
                    }
                    continue;
                }

                match line.trim() {
                    QUIT_COMMAND => break,
                    RESET_COMMAND => {
                        store.reset_session();
                        prompt = Prompt::Celebrity;
                        write_selection_screen(&mut output).await?;
                        continue;
                    }
                    _ => {}
                }
                prompt = handle_selection(&store, prompt, line, &mut output).await?;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                render(&snapshot, &mut rendered, &mut output).await?;
            }
        }
    }

    info!("Terminal chat finished");
    Ok(())
}

// Selection screen input. A number picks from the catalogue; any other text is
// taken as a custom celebrity name.
async fn handle_selection<W>(store: &Store, prompt: Prompt, line: &str, output: &mut W) -> Result<Prompt>
where
    W: AsyncWrite + Unpin,
{
    let choice = line.trim();
    if choice.is_empty() {
        return Ok(prompt);
    }

    match prompt {
        Prompt::Celebrity => match choice.parse::<usize>() {
            Ok(n) if (1..=CELEBRITIES.len()).contains(&n) => {
                store.select_celebrity(CELEBRITIES[n - 1]);
                store.start_chat();
                Ok(Prompt::Celebrity)
            }
            Ok(n) if n == CELEBRITIES.len() + 1 => {
                store.select_celebrity(CUSTOM_SENTINEL);
                write_line(output, "Type the celebrity name...").await?;
                Ok(Prompt::CustomName)
            }
            Ok(_) => {
                write_line(output, "No such choice.").await?;
                Ok(Prompt::Celebrity)
            }
            Err(_) => {
                store.select_celebrity(CUSTOM_SENTINEL);
                store.set_custom_name(choice);
                store.start_chat();
                Ok(Prompt::Celebrity)
            }
        },
        Prompt::CustomName => {
            store.set_custom_name(choice);
            store.start_chat();
            Ok(Prompt::Celebrity)
        }
    }
}

async fn render<W>(snapshot: &ChatState, rendered: &mut Rendered, output: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let session_id = snapshot.session_id().map(str::to_string);
    if session_id != rendered.session_id {
        rendered.session_id = session_id;
        rendered.messages = 0;
        if snapshot.is_started() {
            write_line(output, &format!("Chat with {}", snapshot.celebrity_name())).await?;
            write_line(output, &format!("({} to start over, {} to exit)", RESET_COMMAND, QUIT_COMMAND)).await?;
        }
    }

    let history = snapshot.history();
    if rendered.messages > history.len() {
        rendered.messages = history.len();
    }
    for message in &history[rendered.messages..] {
        let speaker = match message.role {
            Role::User => USER_LABEL,
            Role::Assistant => snapshot.celebrity_name(),
        };
        write_line(output, &format!("{}: {}", speaker, message.content)).await?;
    }
    rendered.messages = history.len();
    Ok(())
}

async fn write_selection_screen<W>(output: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    write_line(output, "Select or Type a Celebrity to Chat With").await?;
    for (i, name) in CELEBRITIES.iter().enumerate() {
        write_line(output, &format!("  {}. {}", i + 1, name)).await?;
    }
    write_line(output, &format!("  {}. {}", CELEBRITIES.len() + 1, CUSTOM_LABEL)).await
}

async fn write_line<W>(output: &mut W, text: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await.context("Failed to write to terminal")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ChatBackend, ChatError, ChatRequest};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Echo;

    #[async_trait]
    impl ChatBackend for Echo {
        async fn chat(&self, request: &ChatRequest) -> Result<String, ChatError> {
            Ok(format!("{} says: {}", request.celebrity_name, request.message))
        }
    }

    async fn run(input: &str) -> (Store, String) {
        let store = Store::new(Arc::new(Echo));
        let mut output = Vec::new();
        run_chat(store.clone(), input.as_bytes(), &mut output).await.unwrap();
        (store, String::from_utf8(output).unwrap())
    }

    #[tokio::test]
    async fn test_selection_screen_lists_catalogue() {
        let (_, output) = run("").await;
        assert!(output.contains("Select or Type a Celebrity to Chat With"));
        assert!(output.contains("3. Tom Hanks"));
        assert!(output.contains("9. Custom Celebrity"));
    }

    #[tokio::test]
    async fn test_numbered_choice_starts_chat_and_waits_for_reply() {
        let (store, output) = run("3\nHello\n").await;
        let state = store.snapshot();
        assert!(state.is_started());
        assert_eq!(state.celebrity_name(), "Tom Hanks");
        assert_eq!(state.history().len(), 2);
        assert!(output.contains("Chat with Tom Hanks"));
        assert!(output.contains("You: Hello"));
        assert!(output.contains("Tom Hanks: Tom Hanks says: Hello"));
    }

    #[tokio::test]
    async fn test_custom_entry_prompts_for_name() {
        let (store, output) = run("9\nZendaya\n").await;
        assert!(output.contains("Type the celebrity name..."));
        assert_eq!(store.snapshot().celebrity_name(), "Zendaya");
        assert!(store.snapshot().is_custom());
    }

    #[tokio::test]
    async fn test_typed_name_is_custom_celebrity() {
        let (store, _) = run("Keanu Reeves\n").await;
        let state = store.snapshot();
        assert!(state.is_started());
        assert!(state.is_custom());
        assert_eq!(state.celebrity_name(), "Keanu Reeves");
    }

    #[tokio::test]
    async fn test_out_of_range_choice_is_rejected() {
        let (store, output) = run("42\n").await;
        assert!(output.contains("No such choice."));
        assert!(!store.snapshot().is_started());
    }

    #[tokio::test]
    async fn test_reset_returns_to_selection() {
        let (store, output) = run("1\n/reset\n").await;
        assert_eq!(store.snapshot(), ChatState::new());
        assert_eq!(output.matches("Select or Type a Celebrity").count(), 2);
    }

    #[tokio::test]
    async fn test_blank_lines_send_nothing() {
        let (store, _) = run("1\n\n   \n").await;
        assert!(store.snapshot().history().is_empty());
    }

    #[tokio::test]
    async fn test_quit_stops_reading() {
        let (store, _) = run("2\n/quit\nHello\n").await;
        assert!(store.snapshot().history().is_empty());
    }

    #[tokio::test]
    async fn test_reset_on_selection_screen_is_not_a_name() {
        let (store, output) = run("/reset\n").await;
        assert!(!store.snapshot().is_started());
        assert_eq!(store.snapshot().celebrity_name(), "");
        assert_eq!(output.matches("Select or Type a Celebrity").count(), 2);
    }

    #[tokio::test]
    async fn test_reset_abandons_custom_name_prompt() {
        let (store, _) = run("9\n/reset\n").await;
        assert_eq!(store.snapshot(), ChatState::new());
    }
}
