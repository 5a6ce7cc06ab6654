//! Flat-file save and load
//!
//! A book file is UTF-8 text:
//!
//! ```text
//! %pagewright-book 1
//! id: 0b7c...
//! title: My Book
//! ...
//! === chapter: First
//! chapter content, verbatim
//! === chapter: Second
//! ...
//! ```
//!
//! Header values escape `\` and line breaks. Content lines starting with
//! `=== ` or `\` get an extra leading `\`. Every line ends with `\n`.

use crate::error::ParseError;
use crate::types::{AuthorImagePosition, Book, Chapter, ImageBlob};
use chrono::{DateTime, SecondsFormat, Utc};
use std::io::{Read, Write};
use uuid::Uuid;

/// First line of every book file
pub const SIGNATURE: &str = "%pagewright-book 1";

/// Conventional file extension
pub const EXTENSION: &str = "book";

const CHAPTER_MARKER: &str = "=== chapter: ";
const MARKER_PREFIX: &str = "=== ";

/// Serialize `book` to the flat text format
pub fn save(book: &Book) -> String {
    let mut out = String::new();
    out.push_str(SIGNATURE);
    out.push('\n');

    let image = |blob: &Option<ImageBlob>| blob.as_ref().map(ImageBlob::to_data_uri).unwrap_or_default();
    let fields = [
        ("id", book.id().to_string()),
        ("title", book.title.clone()),
        ("subtitle", book.subtitle.clone()),
        ("author", book.author.clone()),
        ("publisher", book.publisher.clone()),
        ("cover-text", book.cover_text.clone()),
        ("author-image-position", book.author_image_position.to_string()),
        ("cover-image", image(&book.cover_image)),
        ("author-image", image(&book.author_image)),
        (
            "modified",
            book.last_modified()
                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
        ),
    ];
    for (key, value) in fields {
        out.push_str(&format!("{}: {}\n", key, escape(&value)));
    }

    for chapter in &book.chapters {
        out.push_str(CHAPTER_MARKER);
        out.push_str(&escape(&chapter.title));
        out.push('\n');
        if chapter.content.is_empty() {
            continue;
        }
        for line in chapter.content.split('\n') {
            if line.starts_with(MARKER_PREFIX) || line.starts_with('\\') {
                out.push('\\');
            }
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Write `book` to `writer`
pub fn save_to(book: &Book, writer: &mut dyn Write) -> std::io::Result<()> {
    writer.write_all(save(book).as_bytes())
}

/// Parse a book file. Either the whole book is returned or an error
/// naming the offending line.
pub fn load(text: &str) -> Result<Book, ParseError> {
    let mut lines: Vec<&str> = text.split('\n').collect();
    if text.ends_with('\n') {
        lines.pop();
    }

    let mut lines = lines.into_iter().enumerate().map(|(i, l)| (i + 1, l)).peekable();

    match lines.next() {
        Some((_, first)) if first.trim_end_matches('\r') == SIGNATURE => {}
        _ => return Err(ParseError::MissingSignature { expected: SIGNATURE }),
    }

    let mut header = Header::default();
    while let Some(&(line_no, line)) = lines.peek() {
        if line.starts_with(MARKER_PREFIX) {
            break;
        }
        lines.next();
        header.apply(line_no, line)?;
    }

    let mut chapters: Vec<(Chapter, Vec<String>)> = Vec::new();
    for (line_no, line) in lines {
        if let Some(title) = line.strip_prefix(CHAPTER_MARKER) {
            chapters.push((Chapter::new(unescape(line_no, title)?), Vec::new()));
            continue;
        }
        if line.starts_with(MARKER_PREFIX) {
            return Err(ParseError::UnexpectedMarker {
                line: line_no,
                content: line.to_string(),
            });
        }
        match chapters.last_mut() {
            Some((_, content)) => {
                let line = line.strip_prefix('\\').unwrap_or(line);
                content.push(line.to_string());
            }
            None => {
                return Err(ParseError::MalformedHeader {
                    line: line_no,
                    content: line.to_string(),
                })
            }
        }
    }

    let mut book = header.into_book()?;
    book.content_mut().chapters = chapters
        .into_iter()
        .map(|(chapter, content)| chapter.with_content(content.join("\n")))
        .collect();
    Ok(book)
}

/// Read and parse a book file from `reader`
pub fn load_from(reader: &mut dyn Read) -> crate::Result<Book> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(load(&text)?)
}

/// Header fields gathered before any chapter
#[derive(Default)]
struct Header {
    id: Option<Uuid>,
    title: Option<String>,
    subtitle: String,
    author: String,
    publisher: String,
    cover_text: String,
    position: AuthorImagePosition,
    cover_image: Option<ImageBlob>,
    author_image: Option<ImageBlob>,
    modified: Option<DateTime<Utc>>,
}

impl Header {
    fn apply(&mut self, line_no: usize, line: &str) -> Result<(), ParseError> {
        let (key, raw) = line.split_once(':').ok_or_else(|| ParseError::MalformedHeader {
            line: line_no,
            content: line.to_string(),
        })?;
        let raw = raw.strip_prefix(' ').unwrap_or(raw);
        let value = unescape(line_no, raw)?;
        let invalid = |reason: String| ParseError::InvalidValue {
            line: line_no,
            field: key.to_string(),
            reason,
        };

        match key {
            "id" => self.id = Some(Uuid::parse_str(value.trim()).map_err(|e| invalid(e.to_string()))?),
            "title" => self.title = Some(value),
            "subtitle" => self.subtitle = value,
            "author" => self.author = value,
            "publisher" => self.publisher = value,
            "cover-text" => self.cover_text = value,
            "author-image-position" => self.position = value.parse().map_err(invalid)?,
            "cover-image" => self.cover_image = parse_image(&value).map_err(invalid)?,
            "author-image" => self.author_image = parse_image(&value).map_err(invalid)?,
            "modified" => {
                let at = DateTime::parse_from_rfc3339(value.trim()).map_err(|e| invalid(e.to_string()))?;
                self.modified = Some(at.with_timezone(&Utc));
            }
            other => {
                return Err(ParseError::UnknownField {
                    line: line_no,
                    field: other.to_string(),
                })
            }
        }
        Ok(())
    }

    fn into_book(self) -> Result<Book, ParseError> {
        let id = self.id.ok_or_else(|| ParseError::MissingField("id".to_string()))?;
        let title = self
            .title
            .ok_or_else(|| ParseError::MissingField("title".to_string()))?;

        let mut book = Book::with_id(id, title);
        let content = book.content_mut();
        content.subtitle = self.subtitle;
        content.author = self.author;
        content.publisher = self.publisher;
        content.cover_text = self.cover_text;
        content.author_image_position = self.position;
        content.cover_image = self.cover_image;
        content.author_image = self.author_image;
        if let Some(at) = self.modified {
            book.set_last_modified(at);
        }
        Ok(book)
    }
}

fn parse_image(value: &str) -> Result<Option<ImageBlob>, String> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    ImageBlob::from_data_uri(value.trim())
        .map(Some)
        .map_err(|e| e.to_string())
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}

fn unescape(line_no: usize, value: &str) -> Result<String, ParseError> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            _ => return Err(ParseError::InvalidEscape { line: line_no }),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Book {
        Book::new("Round Trip")
            .with_subtitle("Line one\nline two")
            .with_author("Back\\slash")
            .with_cover_image(Some(ImageBlob::new("image/png", vec![1, 2, 3])))
            .with_author_image_position(AuthorImagePosition::TopLeft)
            .with_chapter(Chapter::new("First").with_content(
                "Plain\n=== chapter: not a marker\n\\leading slash\n\n[[PAGEBREAK]]\ntrailing\n",
            ))
            .with_chapter(Chapter::new("Empty"))
            .with_chapter(Chapter::new("").with_content("untitled"))
    }

    #[test]
    fn test_round_trip() {
        let book = sample();
        let text = save(&book);
        let loaded = load(&text).unwrap();

        assert_eq!(loaded.id(), book.id());
        assert_eq!(loaded.title, book.title);
        assert_eq!(loaded.subtitle, book.subtitle);
        assert_eq!(loaded.author, book.author);
        assert_eq!(loaded.cover_image, book.cover_image);
        assert_eq!(loaded.author_image_position, AuthorImagePosition::TopLeft);
        assert_eq!(loaded.chapters, book.chapters);
        assert_eq!(loaded.last_modified(), book.last_modified());
    }

    #[test]
    fn test_every_line_is_terminated() {
        let text = save(&sample());
        assert!(text.starts_with("%pagewright-book 1\n"));
        assert!(text.ends_with('\n'));
        assert!(text.contains("\\=== chapter: not a marker\n"));
        assert!(text.contains("\\\\leading slash\n"));
    }

    #[test]
    fn test_missing_signature() {
        assert!(matches!(
            load("title: nope\n"),
            Err(ParseError::MissingSignature { .. })
        ));
        assert!(matches!(load(""), Err(ParseError::MissingSignature { .. })));
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let id = Uuid::new_v4();
        let unknown = format!("{}\nid: {}\ntitle: T\ncolour: red\n", SIGNATURE, id);
        assert!(matches!(
            load(&unknown),
            Err(ParseError::UnknownField { line: 4, .. })
        ));

        let bad_escape = format!("{}\nid: {}\ntitle: T\\q\n", SIGNATURE, id);
        assert!(matches!(
            load(&bad_escape),
            Err(ParseError::InvalidEscape { line: 3 })
        ));

        let bad_position = format!("{}\nid: {}\ntitle: T\nauthor-image-position: middle\n", SIGNATURE, id);
        assert!(matches!(
            load(&bad_position),
            Err(ParseError::InvalidValue { line: 4, .. })
        ));

        let stray = format!("{}\nid: {}\ntitle: T\n=== chapter: A\ntext\n=== part\n", SIGNATURE, id);
        assert!(matches!(
            load(&stray),
            Err(ParseError::UnexpectedMarker { line: 6, .. })
        ));
    }

    #[test]
    fn test_missing_required_fields() {
        let text = format!("{}\ntitle: Untethered\n", SIGNATURE);
        assert!(matches!(load(&text), Err(ParseError::MissingField(f)) if f == "id"));
    }

    #[test]
    fn test_minimal_file() {
        let id = Uuid::new_v4();
        let book = load(&format!("{}\nid: {}\ntitle: Bare\n", SIGNATURE, id)).unwrap();
        assert_eq!(book.id(), id);
        assert!(book.chapters.is_empty());
        assert!(book.cover_image.is_none());
    }
}
