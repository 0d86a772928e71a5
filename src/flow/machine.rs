use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::db::models::EmojiPreference;
use crate::flow::language;

/// Chat command that starts the dialogue.
pub const CREATE_COMMAND: &str = "/create";

/// Fixed menu for the purpose-category step (rendered 1-5).
pub const PURPOSE_CATEGORIES: [&str; 5] = ["Work", "Personal", "Creative", "Learning", "Other"];
/// Fixed menu for the style step (rendered 1-4).
pub const COMMUNICATION_STYLES: [&str; 4] = ["Professional", "Casual", "Playful", "Technical"];

/// Cursor of the creation dialogue. Each variant carries only the data that
/// is valid at that step, so out-of-order population cannot be represented:
/// there is no way to hold a style without a name, category, and description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "step", rename_all = "kebab-case")]
pub enum FlowStep {
    Idle,
    Name {
        /// Last batch of generated candidate names (empty while fetching)
        suggestions: Vec<String>,
    },
    PurposeCategory {
        name: String,
    },
    PurposeDescription {
        name: String,
        category: String,
    },
    Style {
        name: String,
        category: String,
        description: String,
    },
    Emoji {
        name: String,
        category: String,
        description: String,
        style: String,
    },
    Summary {
        name: String,
        category: String,
        description: String,
        style: String,
        use_emojis: EmojiPreference,
    },
}

impl FlowStep {
    pub fn is_idle(&self) -> bool {
        matches!(self, FlowStep::Idle)
    }

    /// Short step name matching the dialogue documentation.
    pub fn label(&self) -> &'static str {
        match self {
            FlowStep::Idle => "idle",
            FlowStep::Name { .. } => "name",
            FlowStep::PurposeCategory { .. } => "purpose-category",
            FlowStep::PurposeDescription { .. } => "purpose-description",
            FlowStep::Style { .. } => "style",
            FlowStep::Emoji { .. } => "emoji",
            FlowStep::Summary { .. } => "summary",
        }
    }
}

/// Everything collected by a completed dialogue. The service combines this
/// with a random icon/color, the default model, and the default tool set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BotDraft {
    pub name: String,
    pub purpose_category: String,
    pub purpose_description: String,
    pub communication_style: String,
    pub use_emojis: EmojiPreference,
    pub detected_language: Option<String>,
}

/// What a dialogue turn produced. Consumed by the driver; rejections are
/// values here, never errors thrown through the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowSignal {
    /// The machine is idle and the input was not the create command.
    Inactive,
    /// State advanced or re-prompted; the text is the assistant turn.
    Prompt(String),
    /// Duplicate bot name: still in the name step, re-prompting.
    DuplicateName { name: String, prompt: String },
    /// Entered the name step or the user asked for "more": the driver must
    /// issue a (superseding) suggestion fetch. Any accompanying text is the
    /// assistant turn to append right away.
    RequestSuggestions { prompt: Option<String> },
    /// Summary confirmed; the dialogue is idle again.
    Completed { draft: BotDraft, prompt: String },
    /// Cancelled from some non-idle step; the dialogue is idle again.
    Cancelled { prompt: String },
}

/// The pure state machine behind the `/create` dialogue. Single instance
/// per client; persistence and async effects live in the service.
#[derive(Debug, Clone, Default)]
pub struct FlowMachine {
    step: FlowStep,
}

impl Default for FlowStep {
    fn default() -> Self {
        FlowStep::Idle
    }
}

impl FlowMachine {
    pub fn new() -> Self {
        Self { step: FlowStep::Idle }
    }

    /// Rebuild from a persisted snapshot (resuming an interrupted dialogue).
    pub fn from_step(step: FlowStep) -> Self {
        Self { step }
    }

    pub fn step(&self) -> &FlowStep {
        &self.step
    }

    pub fn is_active(&self) -> bool {
        !self.step.is_idle()
    }

    /// Feed one user turn into the dialogue.
    ///
    /// `existing_names` is the live bot collection at this moment; the name
    /// uniqueness check happens against it (case-insensitive, trimmed).
    pub fn handle(&mut self, raw: &str, existing_names: &[String]) -> FlowSignal {
        let input = raw.trim();
        let lowered = input.to_lowercase();

        // Global cancel from any non-idle step
        if self.is_active() && lowered == "cancel" {
            self.step = FlowStep::Idle;
            return FlowSignal::Cancelled {
                prompt: "Okay, I've discarded the setup. Type /create whenever you want to start again.".into(),
            };
        }

        match std::mem::take(&mut self.step) {
            FlowStep::Idle => {
                if lowered == CREATE_COMMAND {
                    self.step = FlowStep::Name { suggestions: Vec::new() };
                    FlowSignal::RequestSuggestions {
                        prompt: Some(
                            "Let's set up a new bot! I'm thinking of some names...".into(),
                        ),
                    }
                } else {
                    FlowSignal::Inactive
                }
            }

            FlowStep::Name { suggestions } => {
                // A second /create mid-flow is rejected, not silently restarted
                if lowered == CREATE_COMMAND {
                    let prompt = in_progress_prompt();
                    self.step = FlowStep::Name { suggestions };
                    return FlowSignal::Prompt(prompt);
                }
                if lowered == "more" {
                    self.step = FlowStep::Name { suggestions };
                    return FlowSignal::RequestSuggestions { prompt: None };
                }

                // Numeric pick within range, otherwise the input is the name
                let candidate = match pick_from(input, &suggestions) {
                    Some(picked) => picked.to_string(),
                    None => input.to_string(),
                };

                if candidate.is_empty() {
                    self.step = FlowStep::Name { suggestions };
                    return FlowSignal::Prompt(
                        "I need a name to continue. Pick a number, type one, or \"more\" for fresh ideas.".into(),
                    );
                }

                let taken = existing_names
                    .iter()
                    .any(|n| n.trim().eq_ignore_ascii_case(candidate.trim()));
                if taken {
                    let prompt = format!(
                        "There's already a bot named \"{}\". Pick a different name, or \"more\" for fresh ideas.",
                        candidate.trim()
                    );
                    self.step = FlowStep::Name { suggestions };
                    return FlowSignal::DuplicateName { name: candidate, prompt };
                }

                let name = candidate.trim().to_string();
                self.step = FlowStep::PurposeCategory { name: name.clone() };
                FlowSignal::Prompt(purpose_category_prompt(&name))
            }

            FlowStep::PurposeCategory { name } => {
                if lowered == CREATE_COMMAND {
                    let prompt = in_progress_prompt();
                    self.step = FlowStep::PurposeCategory { name };
                    return FlowSignal::Prompt(prompt);
                }
                if input.is_empty() {
                    self.step = FlowStep::PurposeCategory { name };
                    return FlowSignal::Prompt(
                        "Pick a number from the list or describe the purpose in your own words.".into(),
                    );
                }
                // Menu pick or lenient free text
                let category = pick_from(input, &PURPOSE_CATEGORIES)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| input.to_string());
                self.step = FlowStep::PurposeDescription { name, category };
                FlowSignal::Prompt(
                    "Got it. In a sentence or two, what should this bot help with day to day?".into(),
                )
            }

            FlowStep::PurposeDescription { name, category } => {
                if lowered == CREATE_COMMAND {
                    let prompt = in_progress_prompt();
                    self.step = FlowStep::PurposeDescription { name, category };
                    return FlowSignal::Prompt(prompt);
                }
                if input.is_empty() {
                    self.step = FlowStep::PurposeDescription { name, category };
                    return FlowSignal::Prompt(
                        "A short sentence is enough. What should it help with?".into(),
                    );
                }
                self.step = FlowStep::Style {
                    name,
                    category,
                    description: input.to_string(),
                };
                FlowSignal::Prompt(style_prompt())
            }

            FlowStep::Style { name, category, description } => {
                if lowered == CREATE_COMMAND {
                    let prompt = in_progress_prompt();
                    self.step = FlowStep::Style { name, category, description };
                    return FlowSignal::Prompt(prompt);
                }
                if input.is_empty() {
                    self.step = FlowStep::Style { name, category, description };
                    return FlowSignal::Prompt(
                        "Pick a number from the list or describe the tone yourself.".into(),
                    );
                }
                let style = pick_from(input, &COMMUNICATION_STYLES)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| input.to_string());
                self.step = FlowStep::Emoji { name, category, description, style };
                FlowSignal::Prompt(emoji_prompt())
            }

            FlowStep::Emoji { name, category, description, style } => {
                if lowered == CREATE_COMMAND {
                    let prompt = in_progress_prompt();
                    self.step = FlowStep::Emoji { name, category, description, style };
                    return FlowSignal::Prompt(prompt);
                }
                match parse_emoji_preference(&lowered) {
                    Some(use_emojis) => {
                        let prompt = summary_prompt(&name, &category, &description, &style, use_emojis);
                        self.step = FlowStep::Summary {
                            name,
                            category,
                            description,
                            style,
                            use_emojis,
                        };
                        FlowSignal::Prompt(prompt)
                    }
                    None => {
                        self.step = FlowStep::Emoji { name, category, description, style };
                        FlowSignal::Prompt(
                            "Just let me know about emojis: 1. yes, 2. no, or 3. sometimes.".into(),
                        )
                    }
                }
            }

            FlowStep::Summary { name, category, description, style, use_emojis } => {
                match lowered.as_str() {
                    "confirm" | "yes" | "create" => {
                        let detected_language = language::incremental_detect(&[
                            &category,
                            &description,
                            &style,
                        ]);
                        let draft = BotDraft {
                            name: name.clone(),
                            purpose_category: category,
                            purpose_description: description,
                            communication_style: style,
                            use_emojis,
                            detected_language,
                        };
                        self.step = FlowStep::Idle;
                        FlowSignal::Completed {
                            draft,
                            prompt: format!("{} is ready! I've opened a fresh chat for you two.", name),
                        }
                    }
                    "no" => {
                        // "cancel" is handled globally above; "no" declines too
                        self.step = FlowStep::Idle;
                        FlowSignal::Cancelled {
                            prompt: "No problem, nothing was created. Type /create to start over.".into(),
                        }
                    }
                    _ => {
                        let prompt = format!(
                            "Type \"confirm\" to create {}, or \"cancel\" to discard the setup.",
                            name
                        );
                        self.step = FlowStep::Summary { name, category, description, style, use_emojis };
                        FlowSignal::Prompt(prompt)
                    }
                }
            }
        }
    }

    /// Apply a finished suggestion fetch. Returns the assistant turn listing
    /// the batch, or `None` when the flow is no longer waiting in the name
    /// step (the stale result is dropped).
    pub fn apply_suggestions(&mut self, batch: Vec<String>) -> Option<String> {
        match &mut self.step {
            FlowStep::Name { suggestions } => {
                *suggestions = batch;
                Some(name_prompt(suggestions))
            }
            _ => None,
        }
    }

    /// Convert a failed suggestion fetch into the graceful fallback turn.
    /// The flow stays in the name step; typing a name still works.
    pub fn suggestions_failed(&mut self) -> Option<String> {
        match &self.step {
            FlowStep::Name { .. } => Some(
                "I couldn't come up with names right now, so just type the name you'd like.".into(),
            ),
            _ => None,
        }
    }

    /// Reset to idle, discarding any collected data.
    pub fn reset(&mut self) {
        self.step = FlowStep::Idle;
    }
}

// ---------------------------------------------------------------------------
// Input parsing
// ---------------------------------------------------------------------------

/// Numeric menu pick: `"2"` selects the second option. Anything out of
/// range or non-numeric yields `None` and falls back to free text.
fn pick_from<'a, S: AsRef<str>>(input: &str, options: &'a [S]) -> Option<&'a str> {
    let n: usize = input.parse().ok()?;
    if (1..=options.len()).contains(&n) {
        Some(options[n - 1].as_ref())
    } else {
        None
    }
}

/// Lenient emoji-preference parsing: menu number or keyword, any case.
fn parse_emoji_preference(lowered: &str) -> Option<EmojiPreference> {
    match lowered {
        "1" | "y" | "yes" | "yeah" | "yep" => Some(EmojiPreference::Yes),
        "2" | "n" | "no" | "nope" => Some(EmojiPreference::No),
        "3" | "s" | "sometimes" | "maybe" => Some(EmojiPreference::Sometimes),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Assistant turns
// ---------------------------------------------------------------------------

fn in_progress_prompt() -> String {
    "A bot setup is already in progress. Finish it, or type \"cancel\" to discard it first.".into()
}

fn name_prompt(suggestions: &[String]) -> String {
    let mut text = String::from("How about one of these names?\n");
    for (i, name) in suggestions.iter().enumerate() {
        text.push_str(&format!("{}. {}\n", i + 1, name));
    }
    text.push_str("Pick a number, type your own name, or say \"more\" for fresh ideas.");
    text
}

fn purpose_category_prompt(name: &str) -> String {
    let mut text = format!("{} it is! What will {} mainly help with?\n", name, name);
    for (i, cat) in PURPOSE_CATEGORIES.iter().enumerate() {
        text.push_str(&format!("{}. {}\n", i + 1, cat));
    }
    text.push_str("Pick a number or describe it in your own words.");
    text
}

fn style_prompt() -> String {
    let mut text = String::from("How should it talk to you?\n");
    for (i, style) in COMMUNICATION_STYLES.iter().enumerate() {
        text.push_str(&format!("{}. {}\n", i + 1, style));
    }
    text.push_str("Pick a number or describe the tone yourself.");
    text
}

fn emoji_prompt() -> String {
    "Should it use emojis?\n1. Yes\n2. No\n3. Sometimes".into()
}

fn summary_prompt(
    name: &str,
    category: &str,
    description: &str,
    style: &str,
    use_emojis: EmojiPreference,
) -> String {
    format!(
        "Here's what I have:\n\
         • Name: {name}\n\
         • Purpose: {category} ({description})\n\
         • Style: {style}\n\
         • Emojis: {use_emojis}\n\
         Type \"confirm\" to create the bot, or \"cancel\" to discard."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_names() -> Vec<String> {
        Vec::new()
    }

    /// Drive a fresh machine to the name step with the given suggestions.
    fn machine_in_name(suggestions: &[&str]) -> FlowMachine {
        let mut m = FlowMachine::new();
        assert!(matches!(
            m.handle("/create", &no_names()),
            FlowSignal::RequestSuggestions { .. }
        ));
        m.apply_suggestions(suggestions.iter().map(|s| s.to_string()).collect())
            .unwrap();
        m
    }

    #[test]
    fn test_idle_ignores_ordinary_input() {
        let mut m = FlowMachine::new();
        assert_eq!(m.handle("hello there", &no_names()), FlowSignal::Inactive);
        assert!(m.step().is_idle());
    }

    #[test]
    fn test_full_happy_path_step_order() {
        let mut m = machine_in_name(&["Nova", "Atlas", "Echo"]);
        assert_eq!(m.step().label(), "name");

        m.handle("2", &no_names());
        assert_eq!(m.step().label(), "purpose-category");

        m.handle("1", &no_names());
        assert_eq!(m.step().label(), "purpose-description");

        m.handle("Help with email", &no_names());
        assert_eq!(m.step().label(), "style");

        m.handle("Casual", &no_names());
        assert_eq!(m.step().label(), "emoji");

        m.handle("no", &no_names());
        assert_eq!(m.step().label(), "summary");

        let signal = m.handle("confirm", &no_names());
        let FlowSignal::Completed { draft, .. } = signal else {
            panic!("expected completion, got {signal:?}");
        };
        assert!(m.step().is_idle());

        assert_eq!(draft.name, "Atlas");
        assert_eq!(draft.purpose_category, "Work");
        assert_eq!(draft.purpose_description, "Help with email");
        assert_eq!(draft.communication_style, "Casual");
        assert_eq!(draft.use_emojis, EmojiPreference::No);
    }

    #[test]
    fn test_numeric_mapping_is_deterministic() {
        // "2" in purpose-category is always Personal
        let mut m = machine_in_name(&["Nova"]);
        m.handle("Nova", &no_names());
        m.handle("2", &no_names());
        let FlowStep::PurposeDescription { category, .. } = m.step() else {
            panic!("wrong step");
        };
        assert_eq!(category, "Personal");

        // "3" in style is always Playful
        m.handle("whatever it takes", &no_names());
        m.handle("3", &no_names());
        let FlowStep::Emoji { style, .. } = m.step() else {
            panic!("wrong step");
        };
        assert_eq!(style, "Playful");

        // "1" in emoji is always yes
        m.handle("1", &no_names());
        let FlowStep::Summary { use_emojis, .. } = m.step() else {
            panic!("wrong step");
        };
        assert_eq!(*use_emojis, EmojiPreference::Yes);
    }

    #[test]
    fn test_duplicate_name_stays_in_name_step() {
        let existing = vec!["Max".to_string()];
        for attempt in ["max", "MAX", "Max "] {
            let mut m = machine_in_name(&["Nova"]);
            let signal = m.handle(attempt, &existing);
            assert!(
                matches!(signal, FlowSignal::DuplicateName { .. }),
                "{attempt:?} should collide"
            );
            assert_eq!(m.step().label(), "name");
        }

        // Picking the colliding suggestion by number collides too
        let mut m = machine_in_name(&["Max", "Nova"]);
        let signal = m.handle("1", &existing);
        assert!(matches!(signal, FlowSignal::DuplicateName { .. }));
        assert_eq!(m.step().label(), "name");
    }

    #[test]
    fn test_out_of_range_number_becomes_free_text_name() {
        let mut m = machine_in_name(&["Nova", "Atlas"]);
        m.handle("7", &no_names());
        let FlowStep::PurposeCategory { name } = m.step() else {
            panic!("wrong step");
        };
        assert_eq!(name, "7");
    }

    #[test]
    fn test_more_requests_fresh_suggestions() {
        let mut m = machine_in_name(&["Nova"]);
        let signal = m.handle("more", &no_names());
        assert_eq!(signal, FlowSignal::RequestSuggestions { prompt: None });
        assert_eq!(m.step().label(), "name");

        let text = m.apply_suggestions(vec!["Pixel".into(), "Sage".into()]).unwrap();
        assert!(text.contains("1. Pixel"));
        assert!(text.contains("2. Sage"));
    }

    #[test]
    fn test_cancel_resets_from_every_step() {
        let inputs: [&[&str]; 5] = [
            &[],
            &["Nova"],
            &["Nova", "1"],
            &["Nova", "1", "emails"],
            &["Nova", "1", "emails", "2"],
        ];
        for steps in inputs {
            let mut m = machine_in_name(&["Nova"]);
            for s in steps {
                m.handle(s, &no_names());
            }
            let signal = m.handle("CANCEL", &no_names());
            assert!(matches!(signal, FlowSignal::Cancelled { .. }));
            assert!(m.step().is_idle());
            // Restarting works and carries no leftover data
            assert!(matches!(
                m.handle("/create", &no_names()),
                FlowSignal::RequestSuggestions { .. }
            ));
            assert_eq!(m.step(), &FlowStep::Name { suggestions: vec![] });
        }
    }

    #[test]
    fn test_second_create_is_rejected_mid_flow() {
        let mut m = machine_in_name(&["Nova"]);
        m.handle("Nova", &no_names());

        let signal = m.handle("/create", &no_names());
        assert!(matches!(signal, FlowSignal::Prompt(_)));
        // Still at purpose-category, data intact
        let FlowStep::PurposeCategory { name } = m.step() else {
            panic!("flow was restarted");
        };
        assert_eq!(name, "Nova");
    }

    #[test]
    fn test_unrecognized_emoji_input_reprompts() {
        let mut m = machine_in_name(&["Nova"]);
        m.handle("Nova", &no_names());
        m.handle("1", &no_names());
        m.handle("emails", &no_names());
        m.handle("1", &no_names());

        let signal = m.handle("purple", &no_names());
        assert!(matches!(signal, FlowSignal::Prompt(_)));
        assert_eq!(m.step().label(), "emoji");

        // Lenient keyword still lands
        m.handle("YES", &no_names());
        assert_eq!(m.step().label(), "summary");
    }

    #[test]
    fn test_summary_decline_discards() {
        let mut m = machine_in_name(&["Nova"]);
        for s in ["Nova", "1", "emails", "1", "2"] {
            m.handle(s, &no_names());
        }
        assert_eq!(m.step().label(), "summary");

        let signal = m.handle("no", &no_names());
        assert!(matches!(signal, FlowSignal::Cancelled { .. }));
        assert!(m.step().is_idle());
    }

    #[test]
    fn test_stale_suggestions_dropped_after_name_step() {
        let mut m = machine_in_name(&["Nova"]);
        m.handle("Nova", &no_names());

        assert!(m.apply_suggestions(vec!["Late".into()]).is_none());
        assert!(m.suggestions_failed().is_none());
    }

    #[test]
    fn test_free_text_category_and_style_accepted_as_is() {
        let mut m = machine_in_name(&["Nova"]);
        m.handle("Nova", &no_names());
        m.handle("gardening club admin", &no_names());
        let FlowStep::PurposeDescription { category, .. } = m.step() else {
            panic!("wrong step");
        };
        assert_eq!(category, "gardening club admin");

        m.handle("track the watering schedule", &no_names());
        m.handle("warm but brief", &no_names());
        let FlowStep::Emoji { style, .. } = m.step() else {
            panic!("wrong step");
        };
        assert_eq!(style, "warm but brief");
    }

    #[test]
    fn test_step_snapshot_round_trip() {
        let mut m = machine_in_name(&["Nova"]);
        m.handle("Nova", &no_names());
        m.handle("1", &no_names());

        let json = serde_json::to_string(m.step()).unwrap();
        let restored: FlowStep = serde_json::from_str(&json).unwrap();
        assert_eq!(&restored, m.step());

        // An interrupted dialogue resumes exactly where it stopped
        let mut resumed = FlowMachine::from_step(restored);
        resumed.handle("answer emails", &no_names());
        assert_eq!(resumed.step().label(), "style");
    }
}
