use nutrichat_core::message::{ChatMessage, QUICK_SUGGESTIONS, Role};
use nutrichat_dialogue::{Conversation, DialogueController};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// One line typed at the chat prompt.
#[derive(Debug, PartialEq, Eq)]
pub enum ChatLine {
    Quit,
    ListSuggestions,
    /// `/1`..`/4`: send the quick suggestion with that number
    Suggestion(&'static str),
    Message(String),
    Blank,
    Unknown(String),
}

pub fn parse_line(line: &str) -> ChatLine {
    let line = line.trim();
    if line.is_empty() {
        return ChatLine::Blank;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ChatLine::Message(line.to_string());
    };
    match command {
        "quit" | "exit" | "q" => ChatLine::Quit,
        "suggest" | "s" => ChatLine::ListSuggestions,
        other => match other.parse::<usize>() {
            Ok(n) if (1..=QUICK_SUGGESTIONS.len()).contains(&n) => {
                ChatLine::Suggestion(QUICK_SUGGESTIONS[n - 1])
            }
            _ => ChatLine::Unknown(line.to_string()),
        },
    }
}

fn render(message: &ChatMessage) -> String {
    let who = match message.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    format!("[{}] {who}: {}", message.display_time(), message.text)
}

/// Interactive chat loop on stdin/stdout.
///
/// The prompt is only shown again once the current turn has finished, so a
/// second message can never be submitted while one is in flight.
pub async fn run(
    controller: &DialogueController,
    user_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut conversation = Conversation::new(user_id);
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    for message in conversation.transcript.messages() {
        stdout.write_all(format!("{}\n", render(message)).as_bytes()).await?;
    }
    stdout
        .write_all(b"(type /suggest for ideas, /quit to leave)\n")
        .await?;

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let text = match parse_line(&line) {
            ChatLine::Quit => break,
            ChatLine::Blank => continue,
            ChatLine::ListSuggestions => {
                for (i, suggestion) in QUICK_SUGGESTIONS.iter().enumerate() {
                    stdout
                        .write_all(format!("  /{} {suggestion}\n", i + 1).as_bytes())
                        .await?;
                }
                continue;
            }
            ChatLine::Unknown(command) => {
                stdout
                    .write_all(format!("unknown command: {command}\n").as_bytes())
                    .await?;
                continue;
            }
            ChatLine::Suggestion(text) => {
                stdout.write_all(format!("{text}\n").as_bytes()).await?;
                text.to_string()
            }
            ChatLine::Message(text) => text,
        };

        if controller.run_turn(&mut conversation, &text).await.is_some() {
            if let Some(reply) = conversation.transcript.last() {
                stdout.write_all(format!("{}\n", render(reply)).as_bytes()).await?;
            }
        }
    }

    tracing::debug!(
        messages = conversation.transcript.len(),
        state = ?conversation.state,
        "chat closed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(
            parse_line("  two eggs and toast "),
            ChatLine::Message("two eggs and toast".to_string())
        );
    }

    #[test]
    fn slash_commands_are_recognised() {
        assert_eq!(parse_line("/quit"), ChatLine::Quit);
        assert_eq!(parse_line("/suggest"), ChatLine::ListSuggestions);
        assert_eq!(parse_line("/2"), ChatLine::Suggestion("What should I eat for lunch?"));
        assert_eq!(parse_line("   "), ChatLine::Blank);
    }

    #[test]
    fn out_of_range_suggestion_is_unknown() {
        assert_eq!(parse_line("/0"), ChatLine::Unknown("/0".to_string()));
        assert_eq!(parse_line("/9"), ChatLine::Unknown("/9".to_string()));
        assert_eq!(parse_line("/help"), ChatLine::Unknown("/help".to_string()));
    }

    #[test]
    fn render_labels_roles() {
        let line = render(&ChatMessage::assistant("How many grams?"));
        assert!(line.ends_with("assistant: How many grams?"));
        assert!(line.starts_with('['));
    }
}
