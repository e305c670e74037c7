//! Turns raw model text into a [`Story`].

use crate::models::{Story, StoryPage};
use crate::{prompts, Error, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelStory {
    title: String,
    #[serde(default)]
    character_description: Option<String>,
    pages: Vec<ModelPage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelPage {
    text: String,
    #[serde(default)]
    image_prompt: Option<String>,
    #[serde(default)]
    scene_action: Option<String>,
}

/// Remove a Markdown code fence (```` ```json ```` or bare ```` ``` ````)
/// wrapping the payload. Text that does not open with a fence is only
/// trimmed.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let body = body.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    let body = match closing_fence(body) {
        Some(close) => &body[..close],
        None => body.trim_end().strip_suffix("```").unwrap_or(body),
    };
    body.trim()
}

/// Offset of the first line after the opening one that holds only a fence.
fn closing_fence(body: &str) -> Option<usize> {
    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        if offset > 0 && line.trim() == "```" {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

fn parse_document(raw: &str) -> serde_json::Result<ModelStory> {
    let trimmed = raw.trim();
    match serde_json::from_str(trimmed) {
        Ok(parsed) => Ok(parsed),
        Err(e) => {
            let payload = strip_code_fences(raw);
            if payload.len() == trimmed.len() {
                return Err(e);
            }
            serde_json::from_str(payload)
        }
    }
}

/// Parse model output into a story, composing page image prompts from the
/// shared character description when the model returned scene actions.
pub fn extract_story(raw: &str) -> Result<Story> {
    let parsed = parse_document(raw).map_err(|e| {
        tracing::error!("Model response is not a story document: {}", e);
        Error::MalformedResponse {
            message: e.to_string(),
            raw: raw.to_string(),
        }
    })?;

    if parsed.pages.is_empty() {
        return Err(Error::MalformedResponse {
            message: "story has no pages".to_string(),
            raw: raw.to_string(),
        });
    }

    let expected_pages = prompts::STORY_CONTRACT.page_count;
    if parsed.pages.len() != expected_pages {
        tracing::warn!(
            "Model returned {} pages, expected {}",
            parsed.pages.len(),
            expected_pages
        );
    }

    let character_description = parsed
        .character_description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    let pages = parsed
        .pages
        .into_iter()
        .enumerate()
        .map(|(i, page)| {
            let image_prompt = resolve_image_prompt(&page, character_description.as_deref())
                .ok_or_else(|| Error::MalformedResponse {
                    message: format!("page {} has neither sceneAction nor imagePrompt", i + 1),
                    raw: raw.to_string(),
                })?;

            Ok(StoryPage {
                text: page.text,
                image_prompt,
                image_url: None,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Story {
        title: parsed.title,
        character_description,
        pages,
    })
}

fn resolve_image_prompt(page: &ModelPage, character_description: Option<&str>) -> Option<String> {
    let non_empty = |s: &Option<String>| {
        s.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    match (non_empty(&page.scene_action), character_description) {
        (Some(scene), Some(description)) => Some(prompts::page_image_prompt(description, &scene)),
        (scene, None) => non_empty(&page.image_prompt).or_else(|| {
            scene.map(|scene| {
                prompts::page_image_prompt("", &scene)
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
            })
        }),
        (None, Some(_)) => non_empty(&page.image_prompt),
    }
}
