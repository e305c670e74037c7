//! Page-by-page navigation over a persisted story.

use crate::models::Story;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Illustration<'a> {
    Image(&'a str),
    /// No image was produced; the description stands in for it.
    Placeholder(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView<'a> {
    pub number: usize,
    pub total: usize,
    pub text: &'a str,
    pub illustration: Illustration<'a>,
}

pub struct StoryReader {
    story: Story,
    current: usize,
}

impl StoryReader {
    pub fn new(story: Story) -> Self {
        Self { story, current: 0 }
    }

    pub fn story(&self) -> &Story {
        &self.story
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 >= self.story.pages.len()
    }

    /// Advance one page. Returns false when already on the last page.
    pub fn next(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.current += 1;
        true
    }

    pub fn prev(&mut self) -> bool {
        if self.is_first() {
            return false;
        }
        self.current -= 1;
        true
    }

    pub fn view(&self) -> Option<PageView<'_>> {
        let page = self.story.pages.get(self.current)?;
        let illustration = match page.image_url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => Illustration::Image(url),
            None => Illustration::Placeholder(&page.image_prompt),
        };

        Some(PageView {
            number: self.current + 1,
            total: self.story.pages.len(),
            text: &page.text,
            illustration,
        })
    }
}
