//! Versioned prompt templates for story text and page illustrations.

use crate::models::{StoryRequest, STORY_PAGE_COUNT};

/// Bumped whenever the wording or slots of the templates change.
pub const STORY_TEMPLATE_VERSION: &str = "v1";

pub const STORY: &str = include_str!("../data/prompts/story.txt");
pub const PAGE_IMAGE: &str = include_str!("../data/prompts/page_image.txt");

pub const STYLE_PREFIX: &str =
    "Children's picture-book illustration, soft watercolor, warm vibrant colors, gentle lighting.";
pub const STYLE_SUFFIX: &str =
    "Same character design in every scene. No text, letters or words anywhere in the image.";

const UNSPECIFIED: &str = "free choice";

/// Shape the model is asked to answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseContract {
    pub page_count: usize,
}

pub const STORY_CONTRACT: ResponseContract = ResponseContract {
    page_count: STORY_PAGE_COUNT,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryPrompt {
    pub version: &'static str,
    pub text: String,
    pub contract: ResponseContract,
}

/// Render the story prompt for a request. Pure: identical requests give
/// byte-identical prompts.
pub fn build_story_prompt(request: &StoryRequest) -> StoryPrompt {
    let age = request.age.to_string();
    let page_count = STORY_CONTRACT.page_count.to_string();

    let text = render(
        STORY,
        &[
            ("name", request.name.trim()),
            ("age", &age),
            ("theme", or_unspecified(&request.theme)),
            ("interests", or_unspecified(&request.interests)),
            ("language", request.locale.language_name()),
            ("page_count", &page_count),
        ],
    );

    StoryPrompt {
        version: STORY_TEMPLATE_VERSION,
        text,
        contract: STORY_CONTRACT,
    }
}

/// Compose a page illustration prompt from the shared character description
/// and the page's scene action.
pub fn page_image_prompt(character_description: &str, scene_action: &str) -> String {
    render(
        PAGE_IMAGE.trim(),
        &[
            ("style_prefix", STYLE_PREFIX),
            ("character_description", character_description.trim()),
            ("scene_action", scene_action.trim()),
            ("style_suffix", STYLE_SUFFIX),
        ],
    )
}

fn or_unspecified(value: &str) -> &str {
    let value = value.trim();
    if value.is_empty() {
        UNSPECIFIED
    } else {
        value
    }
}

/// Replace `{{key}}` placeholders in a template string.
///
/// Single pass: substituted values are never scanned for placeholders, and
/// unknown placeholders are left untouched.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];

        match after_open.find("}}") {
            Some(end) => {
                let key = &after_open[..end];
                match vars.iter().find(|(k, _)| *k == key) {
                    Some((_, value)) => result.push_str(value),
                    None => {
                        result.push_str("{{");
                        result.push_str(key);
                        result.push_str("}}");
                    }
                }
                rest = &after_open[end + 2..];
            }
            None => {
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    result.push_str(rest);
    result
}
