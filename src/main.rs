use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use botforge_desktop::api::client::ChatSendRequest;
use botforge_desktop::api::{session, sync};
use botforge_desktop::db::models::{Bot, CreateChatInput, CreateMessageInput};
use botforge_desktop::db::repos::{bots, chats, messages, models};
use botforge_desktop::error::AppError;
use botforge_desktop::flow::FlowTurn;
use botforge_desktop::host::NoopHost;
use botforge_desktop::{logging, prefs, AppState};

const DEFAULT_API_URL: &str = "http://localhost:3001";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init();

    tracing::info!("Starting Botforge v{}", env!("CARGO_PKG_VERSION"));

    let app_data_dir = dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("botforge");
    logging::install_crash_hook(&app_data_dir);

    let base_url =
        std::env::var("BOTFORGE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

    let state = match AppState::bootstrap(&app_data_dir, base_url, Arc::new(NoopHost)).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            std::process::exit(1);
        }
    };

    if let Err(e) = repl(state).await {
        tracing::error!(error = %e, "Session ended with an error");
        std::process::exit(1);
    }
}

/// Line-oriented chat loop. `/create` starts the guided bot setup; any
/// other non-command input goes to the active bot.
async fn repl(state: AppState) -> Result<(), AppError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    let mut active_bot = default_bot(&state)?;
    let mut active_chat: Option<String> = state.flow.active_chat().await;

    if state.session.lock().await.setup_required {
        say(&mut stdout, "First run: create the admin account with /setup <email> <password> <name>.").await?;
    }
    say(&mut stdout, &format!(
        "Chatting with {}. Type /create for a new bot, /bots to switch, /quit to exit.",
        active_bot.name
    ))
    .await?;

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "/quit" {
            break;
        }

        if let Some(output) = command(&state, &mut active_bot, &mut active_chat, input).await? {
            say(&mut stdout, &output).await?;
            continue;
        }

        // The creation flow gets first claim on every remaining line
        match state
            .flow
            .handle_input(input, active_chat.as_deref())
            .await?
        {
            FlowTurn::Handled { chat_id, assistant, suggestion_token, created } => {
                active_chat = Some(chat_id);
                if let Some(text) = assistant {
                    say(&mut stdout, &text).await?;
                }
                if let Some(token) = suggestion_token {
                    if let Some(text) = state.flow.fetch_suggestions(token).await? {
                        say(&mut stdout, &text).await?;
                    }
                }
                if let Some((bot, chat)) = created {
                    sync::spawn_bot_upsert(state.platform.clone(), bot.clone());
                    active_bot = bot;
                    active_chat = Some(chat.id);
                }
                continue;
            }
            FlowTurn::NotHandled => {}
        }

        match chat_turn(&state, &active_bot, &mut active_chat, input).await {
            Ok(reply) => say(&mut stdout, &reply).await?,
            Err(e) => {
                tracing::warn!(error = %e, "Chat turn failed");
                say(&mut stdout, &format!("Something went wrong: {}", e)).await?;
            }
        }
    }

    Ok(())
}

/// Handle slash commands other than `/create`. Returns the text to print,
/// or `None` when the input is not a command here.
async fn command(
    state: &AppState,
    active_bot: &mut Bot,
    active_chat: &mut Option<String>,
    input: &str,
) -> Result<Option<String>, AppError> {
    if input == "/bots" {
        let mut out = String::new();
        for bot in bots::get_all(&state.db)? {
            let marker = if bot.id == active_bot.id { "*" } else { " " };
            out.push_str(&format!("{} {}\n", marker, bot.name));
        }
        return Ok(Some(out.trim_end().to_string()));
    }

    if let Some(name) = input.strip_prefix("/use ") {
        return Ok(Some(match bots::find_by_name(&state.db, name)? {
            Some(bot) => {
                *active_bot = bot;
                *active_chat = None;
                format!("Switched to {}.", active_bot.name)
            }
            None => format!("No bot named \"{}\".", name.trim()),
        }));
    }

    if let Some(name) = input.strip_prefix("/delete ") {
        return Ok(Some(match bots::find_by_name(&state.db, name)? {
            Some(bot) => match bots::delete(&state.db, &bot.id) {
                Ok(_) => {
                    sync::spawn_bot_delete(state.platform.clone(), bot.id.clone());
                    if active_bot.id == bot.id {
                        *active_bot = default_bot(state)?;
                        *active_chat = None;
                    }
                    format!("Deleted {}.", bot.name)
                }
                Err(AppError::Validation(msg)) => msg,
                Err(e) => return Err(e),
            },
            None => format!("No bot named \"{}\".", name.trim()),
        }));
    }

    if input == "/archive" {
        let Some(chat_id) = active_chat.take() else {
            return Ok(Some("No active chat to archive.".to_string()));
        };
        let chat = chats::set_archived(&state.db, &chat_id, true)?;
        sync::spawn_chat_archive(state.platform.clone(), chat, true);
        return Ok(Some("Chat archived.".to_string()));
    }

    if input == "/models" {
        let mut out = String::new();
        for model in models::get_all(&state.db)? {
            out.push_str(&format!("{} ({})\n", model.name, model.provider));
        }
        return Ok(Some(out.trim_end().to_string()));
    }

    if let Some(rest) = input.strip_prefix("/theme ") {
        let mut settings = prefs::load(&state.db)?;
        settings.theme = match rest.trim() {
            "light" => prefs::Theme::Light,
            "dark" => prefs::Theme::Dark,
            "system" => prefs::Theme::System,
            other => return Ok(Some(format!("Unknown theme \"{}\".", other))),
        };
        prefs::save(&state.db, &settings)?;
        return Ok(Some(format!("Theme set to {}.", rest.trim())));
    }

    if let Some(rest) = input.strip_prefix("/login ") {
        let mut parts = rest.split_whitespace();
        let (Some(email), Some(password)) = (parts.next(), parts.next()) else {
            return Ok(Some("Usage: /login <email> <password>".to_string()));
        };
        let mut session_state = state.session.lock().await;
        return Ok(Some(
            match session::login(&state.platform, &mut session_state, email, password).await {
                Ok(()) => "Logged in.".to_string(),
                Err(e) => format!("Login failed: {}", e),
            },
        ));
    }

    if let Some(rest) = input.strip_prefix("/setup ") {
        let mut parts = rest.split_whitespace();
        let (Some(email), Some(password), Some(name)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Ok(Some("Usage: /setup <email> <password> <name>".to_string()));
        };
        let mut session_state = state.session.lock().await;
        return Ok(Some(
            match session::setup_admin(&state.platform, &mut session_state, email, password, name)
                .await
            {
                Ok(()) => "Admin account created and signed in.".to_string(),
                Err(e) => format!("Setup failed: {}", e),
            },
        ));
    }

    Ok(None)
}

/// Send one message to the active bot and record both sides locally.
async fn chat_turn(
    state: &AppState,
    bot: &Bot,
    active_chat: &mut Option<String>,
    input: &str,
) -> Result<String, AppError> {
    let chat_id = match active_chat {
        Some(id) => id.clone(),
        None => {
            let chat = chats::create(
                &state.db,
                CreateChatInput {
                    bot_id: Some(bot.id.clone()),
                    title: bot.name.clone(),
                    origin: None,
                    platform_channel_id: None,
                },
            )?;
            *active_chat = Some(chat.id.clone());
            chat.id
        }
    };

    messages::create(
        &state.db,
        CreateMessageInput {
            chat_id: chat_id.clone(),
            role: "user".to_string(),
            content: input.to_string(),
            reply_to_id: None,
            metadata: None,
        },
    )?;

    let reply = state
        .platform
        .send_chat_message(&ChatSendRequest {
            bot_id: bot.id.clone(),
            chat_id: chat_id.clone(),
            system_prompt: bot.system_prompt.clone(),
            model_id: bot.model_id.clone(),
            tools: bot.tool_names(),
            content: input.to_string(),
            reply_to_id: None,
        })
        .await?;

    let metadata = match &reply.metadata {
        Some(meta) => Some(serde_json::to_string(meta)?),
        None => None,
    };
    messages::create(
        &state.db,
        CreateMessageInput {
            chat_id: chat_id.clone(),
            role: "assistant".to_string(),
            content: reply.content.clone(),
            reply_to_id: None,
            metadata,
        },
    )?;
    chats::touch(&state.db, &chat_id)?;

    Ok(reply.content)
}

fn default_bot(state: &AppState) -> Result<Bot, AppError> {
    let all = bots::get_all(&state.db)?;
    all.iter()
        .find(|b| b.is_default)
        .or_else(|| all.first())
        .cloned()
        .ok_or_else(|| AppError::Internal("No bots available".to_string()))
}

async fn say(stdout: &mut tokio::io::Stdout, text: &str) -> Result<(), AppError> {
    stdout.write_all(text.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}
