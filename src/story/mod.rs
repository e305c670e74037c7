//! Story text pipeline: prompt, model call, extraction, and reading.

pub mod extract;
pub mod generator;
pub mod reader;

pub use extract::{extract_story, strip_code_fences};
pub use generator::{StoryGenerator, StorySource};
pub use reader::{Illustration, PageView, StoryReader};
