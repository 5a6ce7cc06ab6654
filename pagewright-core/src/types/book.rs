//! The Book type - the root of everything a user edits

use super::{Chapter, Configuration, ImageBlob};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use uuid::Uuid;

/// Corner of the cover where the author image sits
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AuthorImagePosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

impl AuthorImagePosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorImagePosition::TopLeft => "top-left",
            AuthorImagePosition::TopRight => "top-right",
            AuthorImagePosition::BottomLeft => "bottom-left",
            AuthorImagePosition::BottomRight => "bottom-right",
        }
    }

    pub fn is_top(&self) -> bool {
        matches!(
            self,
            AuthorImagePosition::TopLeft | AuthorImagePosition::TopRight
        )
    }

    pub fn is_left(&self) -> bool {
        matches!(
            self,
            AuthorImagePosition::TopLeft | AuthorImagePosition::BottomLeft
        )
    }
}

impl fmt::Display for AuthorImagePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthorImagePosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "top-left" => Ok(AuthorImagePosition::TopLeft),
            "top-right" => Ok(AuthorImagePosition::TopRight),
            "bottom-left" => Ok(AuthorImagePosition::BottomLeft),
            "bottom-right" => Ok(AuthorImagePosition::BottomRight),
            other => Err(format!("unknown author image position '{}'", other)),
        }
    }
}

/// Everything about a book the author edits directly.
///
/// A [`Book`] derefs to its content for reading; changes go through
/// [`Book::edit`] so the timestamp always moves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookContent {
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub publisher: String,

    /// Free-form text printed on the cover
    pub cover_text: String,

    pub cover_image: Option<ImageBlob>,
    pub author_image: Option<ImageBlob>,
    pub author_image_position: AuthorImagePosition,

    /// Ordered list of chapters
    pub chapters: Vec<Chapter>,

    /// Formatting used to lay the book out
    pub config: Configuration,
}

/// The complete book being authored.
///
/// Books are values: every mutator consumes the book and returns the
/// updated one with a strictly later `last_modified`. The id never changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Book {
    id: Uuid,

    #[serde(flatten)]
    content: BookContent,

    last_modified: DateTime<Utc>,
}

impl Deref for Book {
    type Target = BookContent;

    fn deref(&self) -> &BookContent {
        &self.content
    }
}

impl Book {
    /// Create a new, empty book with a fresh id
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), title)
    }

    /// Create a book that keeps an existing id (e.g. when loading)
    pub fn with_id(id: Uuid, title: impl Into<String>) -> Self {
        Self {
            id,
            content: BookContent {
                title: title.into(),
                subtitle: String::new(),
                author: String::new(),
                publisher: String::new(),
                cover_text: String::new(),
                cover_image: None,
                author_image: None,
                author_image_position: AuthorImagePosition::default(),
                chapters: Vec::new(),
                config: Configuration::default(),
            },
            last_modified: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    /// Content access that leaves the timestamp alone. Only used when loading.
    pub(crate) fn content_mut(&mut self) -> &mut BookContent {
        &mut self.content
    }

    /// Restore a persisted timestamp. Only used when loading.
    pub(crate) fn set_last_modified(&mut self, at: DateTime<Utc>) {
        self.last_modified = at;
    }

    /// Advance `last_modified`, strictly, even if the clock has not moved
    fn touch(mut self) -> Self {
        let now = Utc::now();
        self.last_modified = if now > self.last_modified {
            now
        } else {
            self.last_modified + Duration::milliseconds(1)
        };
        self
    }

    /// Apply an arbitrary edit and bump the timestamp
    pub fn edit(mut self, f: impl FnOnce(&mut BookContent)) -> Self {
        f(&mut self.content);
        self.touch()
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        let title = title.into();
        self.edit(|b| b.title = title)
    }

    pub fn with_subtitle(self, subtitle: impl Into<String>) -> Self {
        let subtitle = subtitle.into();
        self.edit(|b| b.subtitle = subtitle)
    }

    pub fn with_author(self, author: impl Into<String>) -> Self {
        let author = author.into();
        self.edit(|b| b.author = author)
    }

    pub fn with_publisher(self, publisher: impl Into<String>) -> Self {
        let publisher = publisher.into();
        self.edit(|b| b.publisher = publisher)
    }

    pub fn with_cover_text(self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.edit(|b| b.cover_text = text)
    }

    pub fn with_cover_image(self, image: Option<ImageBlob>) -> Self {
        self.edit(|b| b.cover_image = image)
    }

    pub fn with_author_image(self, image: Option<ImageBlob>) -> Self {
        self.edit(|b| b.author_image = image)
    }

    pub fn with_author_image_position(self, position: AuthorImagePosition) -> Self {
        self.edit(|b| b.author_image_position = position)
    }

    pub fn with_config(self, config: Configuration) -> Self {
        self.edit(|b| b.config = config)
    }

    /// Append a chapter
    pub fn with_chapter(self, chapter: Chapter) -> Self {
        self.edit(|b| b.chapters.push(chapter))
    }

    /// Replace the chapter at `index`; out-of-range indices leave the book unchanged
    pub fn with_chapter_at(self, index: usize, chapter: Chapter) -> Self {
        if index >= self.chapters.len() {
            return self;
        }
        self.edit(|b| b.chapters[index] = chapter)
    }

    /// Remove the chapter at `index`; out-of-range indices leave the book unchanged
    pub fn without_chapter(self, index: usize) -> Self {
        if index >= self.chapters.len() {
            return self;
        }
        self.edit(|b| {
            b.chapters.remove(index);
        })
    }

    /// Move a chapter to a new position
    pub fn with_chapter_moved(self, from: usize, to: usize) -> Self {
        if from >= self.chapters.len() || to >= self.chapters.len() || from == to {
            return self;
        }
        self.edit(|b| {
            let chapter = b.chapters.remove(from);
            b.chapters.insert(to, chapter);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_creation() {
        let book = Book::new("Test Book").with_chapter(Chapter::new("Chapter 1").with_content("Hello, world!"));
        assert_eq!(book.title, "Test Book");
        assert_eq!(book.chapters.len(), 1);
        assert_eq!(book.chapters[0].title, "Chapter 1");
    }

    #[test]
    fn test_mutation_advances_timestamp_and_keeps_id() {
        let book = Book::new("Original");
        let id = book.id();
        let before = book.last_modified();

        let book = book.with_title("Renamed");
        assert!(book.last_modified() > before);
        assert_eq!(book.id(), id);

        let mid = book.last_modified();
        let book = book.with_author("A. Writer").with_subtitle("Sub");
        assert!(book.last_modified() > mid);
    }

    #[test]
    fn test_every_edit_advances_timestamp() {
        let book = Book::new("Edited");
        let before = book.last_modified();
        let book = book.edit(|content| content.chapters.push(Chapter::new("Late")));
        assert!(book.last_modified() > before);
        assert_eq!(book.chapters.len(), 1);

        let stamp = book.last_modified();
        let book = book.edit(|_| {});
        assert!(book.last_modified() > stamp);
    }

    #[test]
    fn test_chapter_reordering() {
        let book = Book::new("B")
            .with_chapter(Chapter::new("One"))
            .with_chapter(Chapter::new("Two"))
            .with_chapter(Chapter::new("Three"))
            .with_chapter_moved(2, 0);
        let titles: Vec<_> = book.chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["Three", "One", "Two"]);

        let stamp = book.last_modified();
        let book = book.without_chapter(10);
        assert_eq!(book.last_modified(), stamp);
    }

    #[test]
    fn test_book_serialization() {
        let book = Book::new("Serialization Test").with_author("Someone");
        let json = serde_json::to_string(&book).unwrap();
        let deserialized: Book = serde_json::from_str(&json).unwrap();
        assert_eq!(book, deserialized);
    }

    #[test]
    fn test_position_parsing() {
        assert_eq!(
            "Top-Left".parse::<AuthorImagePosition>().unwrap(),
            AuthorImagePosition::TopLeft
        );
        assert!("middle".parse::<AuthorImagePosition>().is_err());
    }
}
