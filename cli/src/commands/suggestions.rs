use nutrichat_core::message::QUICK_SUGGESTIONS;

use crate::util::print_json;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    print_json(&QUICK_SUGGESTIONS)
}
