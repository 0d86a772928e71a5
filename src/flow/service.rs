use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::db::models::{Bot, Chat, CreateBotInput, CreateChatInput, CreateMessageInput};
use crate::db::repos::{bots, chats, messages, models, settings};
use crate::db::DbPool;
use crate::error::AppError;
use crate::flow::machine::{BotDraft, FlowMachine, FlowSignal, FlowStep};
use crate::flow::{palette, prompt};

/// Source of candidate bot names. The platform client implements this
/// against the backend; tests substitute their own.
#[async_trait]
pub trait NameSuggester: Send + Sync {
    async fn suggest_names(&self, existing: &[String]) -> Result<Vec<String>, AppError>;
}

/// Persisted part of the flow state. Deliberately excludes the suggestion
/// generation counter and any in-flight flags, so a reload can never
/// resume into a stale loading state.
#[derive(Debug, Serialize, Deserialize)]
struct FlowSnapshot {
    step: FlowStep,
    chat_id: Option<String>,
}

struct FlowInner {
    machine: FlowMachine,
    /// Chat carrying the dialogue transcript
    chat_id: Option<String>,
    /// Identity token for suggestion fetches; a completion whose token no
    /// longer matches is discarded instead of corrupting a later step.
    suggestion_gen: u64,
}

/// Outcome of routing one line of user input through the flow.
#[derive(Debug)]
pub enum FlowTurn {
    /// The flow is idle and the input was not `/create`; send it to the
    /// normal chat path instead.
    NotHandled,
    Handled {
        /// Chat that received the user/assistant turns
        chat_id: String,
        /// Assistant turn appended this round, if any
        assistant: Option<String>,
        /// Set when the driver must now call `fetch_suggestions` with it
        suggestion_token: Option<u64>,
        /// Set on confirm: the created bot and its fresh chat
        created: Option<(Bot, Chat)>,
    },
}

/// Drives the creation dialogue against the stores: transcript appends,
/// snapshot persistence, suggestion fetches, and final bot construction.
/// One instance per client; only one flow can be active at a time.
pub struct FlowService {
    pool: DbPool,
    suggester: Arc<dyn NameSuggester>,
    inner: Mutex<FlowInner>,
}

impl FlowService {
    pub fn new(pool: DbPool, suggester: Arc<dyn NameSuggester>) -> Self {
        Self {
            pool,
            suggester,
            inner: Mutex::new(FlowInner {
                machine: FlowMachine::new(),
                chat_id: None,
                suggestion_gen: 0,
            }),
        }
    }

    /// Restore an interrupted dialogue from its persisted snapshot.
    pub async fn restore(&self) -> Result<bool, AppError> {
        let raw = match settings::get(&self.pool, settings::CREATION_FLOW_SNAPSHOT)? {
            Some(raw) => raw,
            None => return Ok(false),
        };
        let snapshot: FlowSnapshot = match serde_json::from_str(&raw) {
            Ok(s) => s,
            Err(e) => {
                // Unreadable snapshot: drop it and start clean
                tracing::warn!(error = %e, "Discarding unreadable flow snapshot");
                settings::delete(&self.pool, settings::CREATION_FLOW_SNAPSHOT)?;
                return Ok(false);
            }
        };

        let mut inner = self.inner.lock().await;
        let resumed = !snapshot.step.is_idle();
        inner.machine = FlowMachine::from_step(snapshot.step);
        inner.chat_id = snapshot.chat_id;
        if resumed {
            tracing::info!(step = inner.machine.step().label(), "Creation flow resumed");
        }
        Ok(resumed)
    }

    /// Whether a dialogue is currently in progress.
    pub async fn is_active(&self) -> bool {
        self.inner.lock().await.machine.is_active()
    }

    /// Chat id the current dialogue writes its transcript to.
    pub async fn active_chat(&self) -> Option<String> {
        self.inner.lock().await.chat_id.clone()
    }

    /// Route one user turn. `active_chat` is reused as the dialogue chat
    /// when a flow starts inside an existing conversation.
    pub async fn handle_input(
        &self,
        raw: &str,
        active_chat: Option<&str>,
    ) -> Result<FlowTurn, AppError> {
        let existing_names = bots::get_all_names(&self.pool)?;
        let mut inner = self.inner.lock().await;

        let signal = inner.machine.handle(raw, &existing_names);
        if signal == FlowSignal::Inactive {
            return Ok(FlowTurn::NotHandled);
        }

        // Resolve the transcript chat: reuse the flow's, then the caller's,
        // otherwise open one for the dialogue.
        let chat_id = match inner.chat_id.clone() {
            Some(id) => id,
            None => {
                let id = match active_chat {
                    Some(id) => id.to_string(),
                    None => {
                        chats::create(
                            &self.pool,
                            CreateChatInput {
                                bot_id: None,
                                title: "New bot setup".into(),
                                origin: None,
                                platform_channel_id: None,
                            },
                        )?
                        .id
                    }
                };
                inner.chat_id = Some(id.clone());
                id
            }
        };

        // Each turn appends the user message first, then the assistant reply
        self.append(&chat_id, "user", raw.trim(), None)?;

        let turn = match signal {
            FlowSignal::Inactive => unreachable!("handled above"),

            FlowSignal::Prompt(text) | FlowSignal::DuplicateName { prompt: text, .. } => {
                self.append(&chat_id, "assistant", &text, None)?;
                FlowTurn::Handled {
                    chat_id: chat_id.clone(),
                    assistant: Some(text),
                    suggestion_token: None,
                    created: None,
                }
            }

            FlowSignal::RequestSuggestions { prompt } => {
                if let Some(ref text) = prompt {
                    self.append(&chat_id, "assistant", text, None)?;
                }
                inner.suggestion_gen += 1;
                let token = inner.suggestion_gen;
                FlowTurn::Handled {
                    chat_id: chat_id.clone(),
                    assistant: prompt,
                    suggestion_token: Some(token),
                    created: None,
                }
            }

            FlowSignal::Cancelled { prompt } => {
                self.append(&chat_id, "assistant", &prompt, None)?;
                inner.chat_id = None;
                inner.suggestion_gen += 1; // invalidate any in-flight fetch
                FlowTurn::Handled {
                    chat_id: chat_id.clone(),
                    assistant: Some(prompt),
                    suggestion_token: None,
                    created: None,
                }
            }

            FlowSignal::Completed { draft, prompt } => {
                let (bot, bot_chat) = self.create_bot(&draft)?;
                self.append(&chat_id, "assistant", &prompt, None)?;
                inner.chat_id = None;
                inner.suggestion_gen += 1;
                tracing::info!(bot = %bot.name, "Bot created by guided flow");
                FlowTurn::Handled {
                    chat_id: chat_id.clone(),
                    assistant: Some(prompt),
                    suggestion_token: None,
                    created: Some((bot, bot_chat)),
                }
            }
        };

        self.persist(&inner)?;
        Ok(turn)
    }

    /// Complete a suggestion fetch issued by `handle_input`.
    ///
    /// The result applies only while `token` is still the latest request
    /// and the dialogue is still waiting in the name step; anything else is
    /// discarded silently. A failed fetch degrades to a single fallback
    /// assistant turn and never surfaces as an error.
    pub async fn fetch_suggestions(&self, token: u64) -> Result<Option<String>, AppError> {
        let existing_names = bots::get_all_names(&self.pool)?;
        let result = self.suggester.suggest_names(&existing_names).await;

        let mut inner = self.inner.lock().await;
        if inner.suggestion_gen != token {
            tracing::debug!(token, current = inner.suggestion_gen, "Stale suggestion batch discarded");
            return Ok(None);
        }

        let text = match result {
            Ok(batch) => inner.machine.apply_suggestions(batch),
            Err(e) => {
                tracing::warn!(error = %e, "Name suggestion fetch failed");
                inner.machine.suggestions_failed()
            }
        };

        if let Some(ref text) = text {
            if let Some(chat_id) = inner.chat_id.clone() {
                self.append(&chat_id, "assistant", text, None)?;
            }
            self.persist(&inner)?;
        }
        Ok(text)
    }

    /// Abort the dialogue without a user turn (e.g. the UI's escape hatch).
    pub async fn reset(&self) -> Result<(), AppError> {
        let mut inner = self.inner.lock().await;
        inner.machine.reset();
        inner.chat_id = None;
        inner.suggestion_gen += 1;
        self.persist(&inner)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn append(
        &self,
        chat_id: &str,
        role: &str,
        content: &str,
        reply_to_id: Option<String>,
    ) -> Result<(), AppError> {
        messages::create(
            &self.pool,
            CreateMessageInput {
                chat_id: chat_id.to_string(),
                role: role.to_string(),
                content: content.to_string(),
                reply_to_id,
                metadata: None,
            },
        )?;
        chats::touch(&self.pool, chat_id)?;
        Ok(())
    }

    fn persist(&self, inner: &FlowInner) -> Result<(), AppError> {
        if inner.machine.is_active() {
            let snapshot = FlowSnapshot {
                step: inner.machine.step().clone(),
                chat_id: inner.chat_id.clone(),
            };
            settings::set(
                &self.pool,
                settings::CREATION_FLOW_SNAPSHOT,
                &serde_json::to_string(&snapshot)?,
            )?;
        } else {
            settings::delete(&self.pool, settings::CREATION_FLOW_SNAPSHOT)?;
        }
        Ok(())
    }

    /// Construct the bot from a confirmed draft: collected preferences plus
    /// a random icon/color, the platform default model, the default tool
    /// set, and the generated system prompt. Also opens the bot's first
    /// chat with a welcome message.
    fn create_bot(&self, draft: &BotDraft) -> Result<(Bot, Chat), AppError> {
        let system_prompt = prompt::build_system_prompt(draft);
        let model_id = models::get_default(&self.pool)?.map(|m| m.id);

        let bot = bots::create(
            &self.pool,
            CreateBotInput {
                name: draft.name.clone(),
                system_prompt,
                description: Some(draft.purpose_description.clone()),
                icon: Some(palette::random_icon()),
                color: Some(palette::random_color()),
                model_id,
                tools: Some(palette::default_tools()),
                personality: Some(crate::db::models::BotPersonality {
                    purpose_category: draft.purpose_category.clone(),
                    purpose_description: draft.purpose_description.clone(),
                    communication_style: draft.communication_style.clone(),
                    use_emojis: draft.use_emojis,
                    detected_language: draft.detected_language.clone(),
                }),
            },
        )?;

        let chat = chats::create(
            &self.pool,
            CreateChatInput {
                bot_id: Some(bot.id.clone()),
                title: bot.name.clone(),
                origin: None,
                platform_channel_id: None,
            },
        )?;
        self.append(
            &chat.id,
            "assistant",
            &format!(
                "Hi, I'm {}! Ask me anything about {}.",
                bot.name,
                draft.purpose_description.trim()
            ),
            None,
        )?;

        Ok((bot, chat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;
    use crate::db::models::EmojiPreference;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Suggester returning fixed batches per call, with an optional failure.
    struct ScriptedSuggester {
        batches: Vec<Result<Vec<String>, String>>,
        calls: AtomicUsize,
    }

    impl ScriptedSuggester {
        fn new(batches: Vec<Result<Vec<String>, String>>) -> Arc<Self> {
            Arc::new(Self { batches, calls: AtomicUsize::new(0) })
        }

        fn ok(names: &[&str]) -> Arc<Self> {
            Self::new(vec![Ok(names.iter().map(|s| s.to_string()).collect())])
        }
    }

    #[async_trait]
    impl NameSuggester for ScriptedSuggester {
        async fn suggest_names(&self, _existing: &[String]) -> Result<Vec<String>, AppError> {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst);
            let batch = self
                .batches
                .get(idx.min(self.batches.len().saturating_sub(1)))
                .cloned()
                .unwrap_or_else(|| Ok(vec![]));
            batch.map_err(AppError::Api)
        }
    }

    async fn start_flow(svc: &FlowService) -> u64 {
        let turn = svc.handle_input("/create", None).await.unwrap();
        let FlowTurn::Handled { suggestion_token: Some(token), .. } = turn else {
            panic!("expected suggestion request");
        };
        svc.fetch_suggestions(token).await.unwrap();
        token
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let pool = init_test_db().unwrap();
        let svc = FlowService::new(pool.clone(), ScriptedSuggester::ok(&["Nova", "Atlas", "Echo"]));

        start_flow(&svc).await;
        for input in ["2", "1", "Help with email", "Casual", "no"] {
            let turn = svc.handle_input(input, None).await.unwrap();
            assert!(matches!(turn, FlowTurn::Handled { .. }));
        }

        let turn = svc.handle_input("confirm", None).await.unwrap();
        let FlowTurn::Handled { created: Some((bot, chat)), .. } = turn else {
            panic!("expected a created bot");
        };

        assert_eq!(bot.name, "Atlas");
        let personality = bot.parsed_personality().unwrap();
        assert_eq!(personality.purpose_category, "Work");
        assert_eq!(personality.purpose_description, "Help with email");
        assert_eq!(personality.communication_style, "Casual");
        assert_eq!(personality.use_emojis, EmojiPreference::No);
        assert!(bot.model_id.is_some());
        assert!(!bot.tool_names().is_empty());
        assert!(bot.system_prompt.contains("Atlas"));

        // Fresh chat with a welcome message; flow reset to idle
        assert_eq!(chat.bot_id, Some(bot.id.clone()));
        let welcome = messages::get_by_chat(&pool, &chat.id).unwrap();
        assert_eq!(welcome.len(), 1);
        assert_eq!(welcome[0].role, "assistant");
        assert!(!svc.is_active().await);
        assert!(settings::get(&pool, settings::CREATION_FLOW_SNAPSHOT)
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_transcript_appends_user_then_assistant() {
        let pool = init_test_db().unwrap();
        let svc = FlowService::new(pool.clone(), ScriptedSuggester::ok(&["Nova"]));

        start_flow(&svc).await;
        let chat_id = svc.active_chat().await.unwrap();
        svc.handle_input("Nova", None).await.unwrap();

        let log = messages::get_by_chat(&pool, &chat_id).unwrap();
        // /create + thinking, suggestions, Nova + category menu
        let roles: Vec<&str> = log.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, ["user", "assistant", "assistant", "user", "assistant"]);
        assert_eq!(log[0].content, "/create");
        assert!(log[2].content.contains("1. Nova"));
    }

    #[tokio::test]
    async fn test_suggestion_failure_falls_back_once() {
        let pool = init_test_db().unwrap();
        let svc = FlowService::new(
            pool.clone(),
            ScriptedSuggester::new(vec![Err("backend down".into())]),
        );

        let turn = svc.handle_input("/create", None).await.unwrap();
        let FlowTurn::Handled { suggestion_token: Some(token), .. } = turn else {
            panic!("expected suggestion request");
        };

        // No error escapes; one fallback assistant turn is appended
        let text = svc.fetch_suggestions(token).await.unwrap().unwrap();
        assert!(text.contains("type the name"));
        assert!(svc.is_active().await);

        let chat_id = svc.active_chat().await.unwrap();
        let fallbacks = messages::get_by_chat(&pool, &chat_id)
            .unwrap()
            .into_iter()
            .filter(|m| m.content.contains("type the name"))
            .count();
        assert_eq!(fallbacks, 1);

        // Typing a name directly still works
        svc.handle_input("Scout", None).await.unwrap();
        assert_eq!(svc.inner.lock().await.machine.step().label(), "purpose-category");
    }

    #[tokio::test]
    async fn test_rapid_more_only_applies_latest_batch() {
        let pool = init_test_db().unwrap();
        let svc = FlowService::new(
            pool.clone(),
            ScriptedSuggester::new(vec![
                Ok(vec!["First".into()]),
                Ok(vec!["Second".into()]),
            ]),
        );

        let turn = svc.handle_input("/create", None).await.unwrap();
        let FlowTurn::Handled { suggestion_token: Some(t1), .. } = turn else {
            panic!("expected suggestion request");
        };
        // "more" before the first fetch lands supersedes it
        let turn = svc.handle_input("more", None).await.unwrap();
        let FlowTurn::Handled { suggestion_token: Some(t2), .. } = turn else {
            panic!("expected suggestion request");
        };
        assert!(t2 > t1);

        // First fetch completes late: discarded
        assert!(svc.fetch_suggestions(t1).await.unwrap().is_none());
        // Second applies
        let text = svc.fetch_suggestions(t2).await.unwrap().unwrap();
        assert!(text.contains("Second"));

        let FlowStep::Name { suggestions } = svc.inner.lock().await.machine.step().clone() else {
            panic!("not in name step");
        };
        assert_eq!(suggestions, vec!["Second".to_string()]);
    }

    #[tokio::test]
    async fn test_late_fetch_after_cancel_is_ignored() {
        let pool = init_test_db().unwrap();
        let svc = FlowService::new(pool.clone(), ScriptedSuggester::ok(&["Nova"]));

        let turn = svc.handle_input("/create", None).await.unwrap();
        let FlowTurn::Handled { suggestion_token: Some(token), .. } = turn else {
            panic!("expected suggestion request");
        };
        svc.handle_input("cancel", None).await.unwrap();
        assert!(!svc.is_active().await);

        assert!(svc.fetch_suggestions(token).await.unwrap().is_none());
        assert!(!svc.is_active().await);
    }

    #[tokio::test]
    async fn test_duplicate_name_keeps_flow_and_snapshot_in_name_step() {
        let pool = init_test_db().unwrap();
        bots::create(
            &pool,
            CreateBotInput {
                name: "Max".into(),
                system_prompt: "prompt".into(),
                description: None,
                icon: None,
                color: None,
                model_id: None,
                tools: None,
                personality: None,
            },
        )
        .unwrap();

        let svc = FlowService::new(pool.clone(), ScriptedSuggester::ok(&["Nova"]));
        start_flow(&svc).await;

        let turn = svc.handle_input("max", None).await.unwrap();
        let FlowTurn::Handled { assistant: Some(text), created, .. } = turn else {
            panic!("expected handled turn");
        };
        assert!(text.contains("already a bot named"));
        assert!(created.is_none());

        let raw = settings::get(&pool, settings::CREATION_FLOW_SNAPSHOT)
            .unwrap()
            .unwrap();
        assert!(raw.contains("\"step\":\"name\""));
    }

    #[tokio::test]
    async fn test_snapshot_restores_interrupted_dialogue() {
        let pool = init_test_db().unwrap();
        {
            let svc = FlowService::new(pool.clone(), ScriptedSuggester::ok(&["Nova"]));
            start_flow(&svc).await;
            svc.handle_input("Nova", None).await.unwrap();
            svc.handle_input("1", None).await.unwrap();
        } // client "restarts" here

        let svc = FlowService::new(pool.clone(), ScriptedSuggester::ok(&["Nova"]));
        assert!(svc.restore().await.unwrap());
        assert!(svc.is_active().await);

        // Continue right where the dialogue stopped: purpose description
        svc.handle_input("Help with email", None).await.unwrap();
        assert_eq!(svc.inner.lock().await.machine.step().label(), "style");
    }

    #[tokio::test]
    async fn test_reuses_callers_active_chat() {
        let pool = init_test_db().unwrap();
        let chat = chats::create(
            &pool,
            CreateChatInput {
                bot_id: None,
                title: "Existing chat".into(),
                origin: None,
                platform_channel_id: None,
            },
        )
        .unwrap();

        let svc = FlowService::new(pool.clone(), ScriptedSuggester::ok(&["Nova"]));
        let turn = svc.handle_input("/create", Some(&chat.id)).await.unwrap();
        let FlowTurn::Handled { chat_id, .. } = turn else {
            panic!("expected handled turn");
        };
        assert_eq!(chat_id, chat.id);
    }
}
