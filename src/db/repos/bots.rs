use rusqlite::{params, Row};

use crate::db::models::{Bot, CreateBotInput, UpdateBotInput};
use crate::db::DbPool;
use crate::error::AppError;

fn row_to_bot(row: &Row) -> rusqlite::Result<Bot> {
    Ok(Bot {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        system_prompt: row.get("system_prompt")?,
        icon: row.get("icon")?,
        color: row.get("color")?,
        model_id: row.get("model_id")?,
        tools: row.get("tools")?,
        personality: row.get("personality")?,
        is_default: row.get::<_, i32>("is_default")? != 0,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn get_all(pool: &DbPool) -> Result<Vec<Bot>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare("SELECT * FROM bots ORDER BY created_at DESC")?;
    let rows = stmt.query_map([], row_to_bot)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn get_by_id(pool: &DbPool, id: &str) -> Result<Bot, AppError> {
    let conn = pool.get()?;
    conn.query_row("SELECT * FROM bots WHERE id = ?1", params![id], row_to_bot)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("Bot {id}")),
            other => AppError::Database(other),
        })
}

/// Case-insensitive lookup on the trimmed name. Used by the creation flow's
/// uniqueness check.
pub fn find_by_name(pool: &DbPool, name: &str) -> Result<Option<Bot>, AppError> {
    let conn = pool.get()?;
    let result = conn.query_row(
        "SELECT * FROM bots WHERE name = ?1 COLLATE NOCASE LIMIT 1",
        params![name.trim()],
        row_to_bot,
    );
    match result {
        Ok(bot) => Ok(Some(bot)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(AppError::Database(e)),
    }
}

/// All bot names, for the suggestion endpoint's exclusion list.
pub fn get_all_names(pool: &DbPool) -> Result<Vec<String>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare("SELECT name FROM bots ORDER BY name")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn create(pool: &DbPool, input: CreateBotInput) -> Result<Bot, AppError> {
    if input.name.trim().is_empty() {
        return Err(AppError::Validation("Name cannot be empty".into()));
    }
    if input.system_prompt.trim().is_empty() {
        return Err(AppError::Validation("System prompt cannot be empty".into()));
    }
    if find_by_name(pool, &input.name)?.is_some() {
        return Err(AppError::Validation(format!(
            "A bot named \"{}\" already exists",
            input.name.trim()
        )));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let tools = serde_json::to_string(&input.tools.unwrap_or_default())?;
    let personality = input.personality.map(|p| p.to_json_string());

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO bots
         (id, name, description, system_prompt, icon, color, model_id,
          tools, personality, is_default, created_at, updated_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,0,?10,?10)",
        params![
            id,
            input.name.trim(),
            input.description,
            input.system_prompt,
            input.icon,
            input.color,
            input.model_id,
            tools,
            personality,
            now,
        ],
    )?;

    get_by_id(pool, &id)
}

pub fn update(pool: &DbPool, id: &str, input: UpdateBotInput) -> Result<Bot, AppError> {
    // Verify exists
    let existing = get_by_id(pool, id)?;

    if let Some(ref name) = input.name {
        if name.trim().is_empty() {
            return Err(AppError::Validation("Name cannot be empty".into()));
        }
        // Renaming onto another bot's name is a collision; keeping your own is not
        if let Some(other) = find_by_name(pool, name)? {
            if other.id != existing.id {
                return Err(AppError::Validation(format!(
                    "A bot named \"{}\" already exists",
                    name.trim()
                )));
            }
        }
    }
    if let Some(ref prompt) = input.system_prompt {
        if prompt.trim().is_empty() {
            return Err(AppError::Validation("System prompt cannot be empty".into()));
        }
    }

    let now = chrono::Utc::now().to_rfc3339();
    let tools_json = match input.tools {
        Some(ref t) => Some(serde_json::to_string(t)?),
        None => None,
    };
    let personality_json = input
        .personality
        .as_ref()
        .map(|opt| opt.as_ref().map(|p| p.to_json_string()));

    let conn = pool.get()?;

    // Build dynamic SET clause
    let mut sets: Vec<String> = vec!["updated_at = ?1".into()];
    let mut param_idx = 2u32;

    push_field!(input.name, "name", sets, param_idx);
    push_field!(input.description, "description", sets, param_idx);
    push_field!(input.system_prompt, "system_prompt", sets, param_idx);
    push_field!(input.icon, "icon", sets, param_idx);
    push_field!(input.color, "color", sets, param_idx);
    push_field!(input.model_id, "model_id", sets, param_idx);
    push_field!(tools_json, "tools", sets, param_idx);
    push_field!(personality_json, "personality", sets, param_idx);

    let sql = format!("UPDATE bots SET {} WHERE id = ?{}", sets.join(", "), param_idx);

    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(now)];

    if let Some(ref v) = input.name {
        param_values.push(Box::new(v.trim().to_string()));
    }
    if let Some(ref v) = input.description {
        param_values.push(Box::new(v.clone()));
    }
    if let Some(ref v) = input.system_prompt {
        param_values.push(Box::new(v.clone()));
    }
    if let Some(ref v) = input.icon {
        param_values.push(Box::new(v.clone()));
    }
    if let Some(ref v) = input.color {
        param_values.push(Box::new(v.clone()));
    }
    if let Some(ref v) = input.model_id {
        param_values.push(Box::new(v.clone()));
    }
    if let Some(ref v) = tools_json {
        param_values.push(Box::new(v.clone()));
    }
    if let Some(ref v) = personality_json {
        param_values.push(Box::new(v.clone()));
    }
    param_values.push(Box::new(id.to_string()));

    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(|p| p.as_ref()).collect();
    conn.execute(&sql, params_ref.as_slice())?;

    get_by_id(pool, id)
}

/// Delete a bot. The designated default bot is protected.
pub fn delete(pool: &DbPool, id: &str) -> Result<bool, AppError> {
    let bot = get_by_id(pool, id)?;
    if bot.is_default {
        return Err(AppError::Validation(
            "The default bot cannot be deleted".into(),
        ));
    }

    let conn = pool.get()?;
    let rows = conn.execute("DELETE FROM bots WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;
    use crate::db::models::{BotPersonality, EmojiPreference};

    fn base_input(name: &str) -> CreateBotInput {
        CreateBotInput {
            name: name.into(),
            system_prompt: "You are a test bot.".into(),
            description: None,
            icon: None,
            color: None,
            model_id: None,
            tools: None,
            personality: None,
        }
    }

    #[test]
    fn test_crud_bot() {
        let pool = init_test_db().unwrap();

        let mut input = base_input("Max");
        input.description = Some("Email helper".into());
        input.color = Some("#06b6d4".into());
        let bot = create(&pool, input).unwrap();
        assert_eq!(bot.name, "Max");
        assert!(!bot.is_default);

        let fetched = get_by_id(&pool, &bot.id).unwrap();
        assert_eq!(fetched.description, Some("Email helper".into()));

        // Seeded default bot plus ours
        let all = get_all(&pool).unwrap();
        assert_eq!(all.len(), 2);

        let updated = update(
            &pool,
            &bot.id,
            UpdateBotInput {
                name: Some("Maxine".into()),
                icon: Some(Some("owl".into())),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.name, "Maxine");
        assert_eq!(updated.icon, Some("owl".into()));

        let deleted = delete(&pool, &bot.id).unwrap();
        assert!(deleted);
        assert!(get_by_id(&pool, &bot.id).is_err());
    }

    #[test]
    fn test_name_uniqueness_is_case_insensitive() {
        let pool = init_test_db().unwrap();
        create(&pool, base_input("Max")).unwrap();

        assert!(create(&pool, base_input("max")).is_err());
        assert!(create(&pool, base_input("MAX")).is_err());
        assert!(create(&pool, base_input("Max ")).is_err());

        assert!(find_by_name(&pool, "mAx").unwrap().is_some());
        assert!(find_by_name(&pool, "Nova").unwrap().is_none());
    }

    #[test]
    fn test_default_bot_cannot_be_deleted() {
        let pool = init_test_db().unwrap();
        let default = get_all(&pool)
            .unwrap()
            .into_iter()
            .find(|b| b.is_default)
            .unwrap();

        let result = delete(&pool, &default.id);
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(get_by_id(&pool, &default.id).is_ok());
    }

    #[test]
    fn test_update_rejects_colliding_rename() {
        let pool = init_test_db().unwrap();
        create(&pool, base_input("Nova")).unwrap();
        let atlas = create(&pool, base_input("Atlas")).unwrap();

        let result = update(
            &pool,
            &atlas.id,
            UpdateBotInput {
                name: Some("nova".into()),
                ..Default::default()
            },
        );
        assert!(result.is_err());

        // Renaming to your own name (different case) is fine
        let result = update(
            &pool,
            &atlas.id,
            UpdateBotInput {
                name: Some("ATLAS".into()),
                ..Default::default()
            },
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_personality_round_trip() {
        let pool = init_test_db().unwrap();
        let mut input = base_input("Echo");
        input.personality = Some(BotPersonality {
            purpose_category: "Work".into(),
            purpose_description: "Help with email".into(),
            communication_style: "Casual".into(),
            use_emojis: EmojiPreference::No,
            detected_language: Some("en".into()),
        });
        input.tools = Some(vec!["web_search".into()]);

        let bot = create(&pool, input).unwrap();
        let personality = bot.parsed_personality().unwrap();
        assert_eq!(personality.purpose_category, "Work");
        assert_eq!(personality.use_emojis, EmojiPreference::No);
        assert_eq!(bot.tool_names(), vec!["web_search".to_string()]);
    }
}
