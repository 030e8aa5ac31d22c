use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult, FieldError},
    models::{CatalogEntry, ChatMessage},
    services::{
        ai::ConversationModel,
        profile::{bullet_list, rated_list, tag_list, ProfileContext},
    },
};

pub const MAX_HISTORY_TURNS: usize = 10;

const PROMPT_TOP_RATED: usize = 30;
const PROMPT_WATCHLIST: usize = 20;
const PROMPT_SEEN_SAMPLE: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub message: String,
    pub conversation_history: Vec<ChatMessage>,
}

/// Keeps only the most recent turns
pub fn trim_history(mut history: Vec<ChatMessage>) -> Vec<ChatMessage> {
    if history.len() > MAX_HISTORY_TURNS {
        history.drain(..history.len() - MAX_HISTORY_TURNS);
    }
    history
}

pub fn build_system_prompt(profile: &ProfileContext) -> String {
    let stats = &profile.stats;
    let average = stats
        .average_rating
        .map(|a| format!("{a:.2}/10"))
        .unwrap_or_else(|| "n/a".to_string());

    let top_rated: Vec<_> = profile.highly_rated.iter().take(PROMPT_TOP_RATED).cloned().collect();

    format!(
        "You are CinePath, a friendly movie and TV expert chatting with a viewer about \
         their taste. Use their history below to give specific, personal answers. \
         Keep replies conversational and concise, and do not suggest titles they have \
         already watched unless they ask about them.\n\n\
         LIBRARY: {} watched movies, {} shows, {} on the watchlist, average rating {}\n\n\
         TOP RATED:\n{}\n\n\
         LIKED:\n{}\n\n\
         DISLIKED:\n{}\n\n\
         FAVORITE TAGS: {}\n\n\
         WATCHLIST:\n{}\n\n\
         ALREADY WATCHED (sample):\n{}",
        stats.watched,
        stats.shows,
        stats.want_to_watch,
        average,
        rated_list(&top_rated),
        rated_list(&profile.liked),
        rated_list(&profile.disliked),
        tag_list(&profile.top_tags),
        bullet_list(profile.watchlist.iter().take(PROMPT_WATCHLIST)),
        bullet_list(profile.seen_titles.iter().take(PROMPT_SEEN_SAMPLE)),
    )
}

/// Answers one chat message in the context of the user's catalog
pub async fn chat(
    model: &dyn ConversationModel,
    entries: &[CatalogEntry],
    history: Vec<ChatMessage>,
    message: &str,
) -> AppResult<ChatReply> {
    let message = message.trim();
    if message.is_empty() {
        return Err(AppError::Validation(vec![FieldError::new(
            "message",
            "Message is required",
        )]));
    }

    let profile = ProfileContext::from_catalog(entries);
    let system_prompt = build_system_prompt(&profile);

    let mut conversation = trim_history(history);
    conversation.push(ChatMessage::user(message));

    let reply = model
        .reply(&system_prompt, &conversation)
        .await
        .map_err(|e| AppError::from_ai(e, "Failed to get chat response"))?;

    tracing::info!(turns = conversation.len(), "Chat reply generated");

    conversation.push(ChatMessage::assistant(reply.clone()));
    Ok(ChatReply {
        message: reply,
        conversation_history: conversation,
    })
}
