use serde_json::{Map, Value};

use crate::{
    error::{AppError, AppResult},
    models::{CatalogEntry, Recommendation, RecommendationKind},
    services::{
        ai::{AiError, AiProvider},
        profile::{bullet_list, rated_list, tag_list, ProfileContext},
    },
};

const DEFAULT_CONFIDENCE: f64 = 0.5;

const RESPONSE_FORMAT: &str = r#"Respond with JSON only, in exactly this shape:
{"recommendations": [{"title": "string", "reason": "string", "confidence": 0.0, "genres": ["string"]}]}
"confidence" is a number between 0 and 1."#;

/// Builds the system and user prompts for a recommendation request
pub fn build_prompts(profile: &ProfileContext, kind: RecommendationKind) -> (String, String) {
    let system = format!(
        "You are CinePath, a film and television expert who gives personalized \
         recommendations based on a viewer's ratings history. Never recommend a title \
         the viewer has already watched.\n\n{}",
        RESPONSE_FORMAT
    );

    let taste = format!(
        "FAVORITES (rated 9 and above):\n{}\n\n\
         LIKED (rated 8 to 9):\n{}\n\n\
         DISLIKED (rated below 6):\n{}\n\n\
         FAVORITE TAGS: {}\n\n\
         ALREADY WATCHED (do not recommend these):\n{}",
        rated_list(&profile.highly_rated),
        rated_list(&profile.liked),
        rated_list(&profile.disliked),
        tag_list(&profile.top_tags),
        bullet_list(&profile.seen_titles),
    );

    let user = match kind {
        RecommendationKind::General => format!(
            "{}\n\nRecommend 10 movies or shows this viewer has not seen and is likely to love. \
             Explain each pick in one or two sentences that refer to their favorites.",
            taste
        ),
        RecommendationKind::Watchlist => format!(
            "{}\n\nWANT TO WATCH:\n{}\n\nFrom the WANT TO WATCH list only, pick up to 10 titles \
             this viewer should watch first and rank them by how well they match their taste. \
             Explain each pick in one or two sentences.",
            taste,
            bullet_list(&profile.watchlist),
        ),
    };

    (system, user)
}

/// Accepts the shapes models actually return and yields a uniform list
///
/// A bare array, `{"recommendations": [...]}`, `{"movies": [...]}` and a single
/// recommendation object are all understood. Items without a title are dropped.
pub fn normalize_recommendations(value: Value) -> Result<Vec<Recommendation>, AiError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            if let Some(Value::Array(items)) = map.remove("recommendations") {
                items
            } else if let Some(Value::Array(items)) = map.remove("movies") {
                items
            } else if map.contains_key("title") {
                vec![Value::Object(map)]
            } else {
                return Err(AiError::UnexpectedFormat);
            }
        }
        _ => return Err(AiError::UnexpectedFormat),
    };

    Ok(items.into_iter().filter_map(recommendation_from).collect())
}

fn recommendation_from(item: Value) -> Option<Recommendation> {
    let map: Map<String, Value> = match item {
        Value::Object(map) => map,
        Value::String(title) => {
            let title = title.trim();
            return (!title.is_empty()).then(|| Recommendation {
                title: title.to_string(),
                reason: String::new(),
                confidence: DEFAULT_CONFIDENCE,
                genres: None,
            });
        }
        _ => return None,
    };

    let title = map.get("title").and_then(Value::as_str).map(str::trim)?;
    if title.is_empty() {
        return None;
    }

    let reason = map
        .get("reason")
        .and_then(Value::as_str)
        .map(|r| r.trim().to_string())
        .unwrap_or_default();

    Some(Recommendation {
        title: title.to_string(),
        reason,
        confidence: map.get("confidence").and_then(confidence).unwrap_or(DEFAULT_CONFIDENCE),
        genres: map.get("genres").and_then(genres),
    })
}

fn confidence(value: &Value) -> Option<f64> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    // Percentages
    let scaled = if raw > 1.0 && raw <= 100.0 { raw / 100.0 } else { raw };
    Some(scaled.clamp(0.0, 1.0))
}

fn genres(value: &Value) -> Option<Vec<String>> {
    let genres: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect(),
        _ => return None,
    };
    (!genres.is_empty()).then_some(genres)
}

/// Drops recommendations the user already watched
pub fn filter_seen(recommendations: Vec<Recommendation>, profile: &ProfileContext) -> Vec<Recommendation> {
    recommendations
        .into_iter()
        .filter(|r| !profile.has_seen(&r.title))
        .collect()
}

/// Generates recommendations for a catalog through the given provider
pub async fn recommend(
    provider: &dyn AiProvider,
    entries: &[CatalogEntry],
    kind: RecommendationKind,
) -> AppResult<Vec<Recommendation>> {
    let profile = ProfileContext::from_catalog(entries);
    let (system_prompt, user_prompt) = build_prompts(&profile, kind);

    tracing::debug!(
        provider = provider.name(),
        kind = ?kind,
        perfect = profile.perfect.len(),
        favorites = profile.highly_rated.len(),
        seen = profile.seen_titles.len(),
        "Requesting recommendations"
    );

    let context = "Failed to generate recommendations";
    let value = provider
        .generate(&system_prompt, &user_prompt)
        .await
        .map_err(|e| AppError::from_ai(e, context))?;

    let candidates = normalize_recommendations(value).map_err(|e| AppError::from_ai(e, context))?;
    let total = candidates.len();
    let recommendations = filter_seen(candidates, &profile);

    tracing::info!(
        provider = provider.name(),
        returned = total,
        kept = recommendations.len(),
        "Recommendations generated"
    );

    Ok(recommendations)
}
