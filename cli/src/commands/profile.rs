use serde_json::json;

use crate::util::{StoredProfile, exit_error, print_json, profile_path, save_profile};

/// Save `user_id` as the default for later commands.
pub fn use_user(user_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        exit_error("User id must not be blank.", None);
    }

    let profile = StoredProfile {
        user_id: user_id.to_string(),
        saved_at: chrono::Utc::now(),
    };
    save_profile(&profile)?;

    print_json(&json!({
        "status": "saved",
        "user_id": profile.user_id,
        "profile_path": profile_path().to_string_lossy()
    }))
}
