use nutrichat_core::error::ErrorBody;
use nutrichat_dialogue::SessionStore;
use serde_json::json;

use crate::util::{print_error, print_json};

/// Print the user's pending clarification session, or `null`.
///
/// Exit codes: 0=looked up (found or not), 3=store unreachable
pub async fn run(store: &dyn SessionStore, user_id: &str) -> i32 {
    match store.find_pending(user_id).await {
        Ok(pending) => match print_json(&json!({ "user_id": user_id, "pending": pending })) {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("{e}");
                1
            }
        },
        Err(e) => {
            print_error(
                &ErrorBody::new(e.code(), e.to_string())
                    .with_hint("Check DATABASE_URL and that the clarification_sessions table exists."),
            );
            3
        }
    }
}
