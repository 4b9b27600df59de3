use nutrichat_dialogue::{Conversation, DialogueController, TurnOutcome};

use crate::util::{exit_error, print_json};

/// Run a single turn and print the turn report.
///
/// Each invocation starts a new conversation, so an answer to an earlier
/// question is only recognised through the session store. Without
/// `DATABASE_URL` every message goes out as a fresh meal description.
///
/// Exit codes: 0=reply received, 3=interpreter unreachable, 4=usage error
pub async fn run(controller: &DialogueController, user_id: &str, message: &str) -> i32 {
    let mut conversation = Conversation::new(user_id);
    let Some(report) = controller.run_turn(&mut conversation, message).await else {
        exit_error(
            "Message must not be blank.",
            Some("Pass the meal text, e.g. `nutrichat send \"two eggs\"`"),
        );
    };

    if let Err(e) = print_json(&report) {
        eprintln!("{e}");
        return 1;
    }

    match report.outcome {
        TurnOutcome::DeliveryFailed => 3,
        _ => 0,
    }
}
