use crate::db::models::EmojiPreference;
use crate::flow::machine::BotDraft;

/// Assemble the system prompt for a bot created by the dialogue.
/// Pure function of the collected data: the same draft always yields the
/// same prompt.
pub fn build_system_prompt(draft: &BotDraft) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!("# {}\n\n", draft.name));

    prompt.push_str("## Purpose\n");
    prompt.push_str(&format!(
        "You are {}, a personal assistant focused on {} matters.\n",
        draft.name,
        draft.purpose_category.to_lowercase()
    ));
    prompt.push_str(&format!(
        "Your main job: {}\n\n",
        draft.purpose_description.trim()
    ));

    prompt.push_str("## Communication\n");
    prompt.push_str(&format!(
        "Keep a {} tone in every reply.\n",
        draft.communication_style.to_lowercase()
    ));
    match draft.use_emojis {
        EmojiPreference::Yes => prompt.push_str("Use emojis freely to add warmth.\n"),
        EmojiPreference::No => prompt.push_str("Do not use emojis.\n"),
        EmojiPreference::Sometimes => {
            prompt.push_str("Use emojis sparingly, only when they genuinely help.\n")
        }
    }

    if let Some(ref lang) = draft.detected_language {
        if lang != "en" {
            prompt.push_str(&format!(
                "The user writes in \"{}\"; answer in that language unless asked otherwise.\n",
                lang
            ));
        }
    }

    prompt
}
