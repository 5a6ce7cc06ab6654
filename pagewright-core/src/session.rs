//! Latest-wins preview session
//!
//! Holds the book being edited and the most recent document rendered from
//! it. Every mutation bumps a generation counter; a render started for an
//! older generation is discarded when it completes, so a slow render can
//! never overwrite a newer preview.

use crate::layout::assemble;
use crate::types::{Book, DocumentModel};
use std::sync::Arc;

/// Identifies the book generation a render was started for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RenderTicket {
    generation: u64,
}

impl RenderTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// A book plus its latest accepted preview
#[derive(Debug, Clone)]
pub struct PreviewSession {
    book: Book,
    generation: u64,
    preview: Option<Arc<DocumentModel>>,
    preview_generation: u64,
}

impl PreviewSession {
    pub fn new(book: Book) -> Self {
        Self {
            book,
            generation: 1,
            preview: None,
            preview_generation: 0,
        }
    }

    pub fn book(&self) -> &Book {
        &self.book
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Ticket for the current generation
    pub fn ticket(&self) -> RenderTicket {
        RenderTicket {
            generation: self.generation,
        }
    }

    /// Apply a mutation and return the ticket for the new generation
    pub fn update(&mut self, edit: impl FnOnce(Book) -> Book) -> RenderTicket {
        self.book = edit(self.book.clone());
        self.generation += 1;
        self.ticket()
    }

    /// Replace the book wholesale (e.g. after loading a file)
    pub fn replace(&mut self, book: Book) -> RenderTicket {
        self.update(|_| book)
    }

    /// Copy of the current book with its ticket, for rendering elsewhere
    pub fn snapshot(&self) -> (RenderTicket, Book) {
        (self.ticket(), self.book.clone())
    }

    /// Offer a finished render. Accepted only if no mutation happened since
    /// the ticket was issued; returns whether it was accepted.
    pub fn accept(&mut self, ticket: RenderTicket, doc: Arc<DocumentModel>) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!(
                stale = ticket.generation,
                current = self.generation,
                "discarding stale preview"
            );
            return false;
        }
        self.preview = Some(doc);
        self.preview_generation = ticket.generation;
        true
    }

    /// Latest accepted document, possibly older than the book
    pub fn preview(&self) -> Option<Arc<DocumentModel>> {
        self.preview.clone()
    }

    /// Whether the book changed since the preview was rendered
    pub fn is_stale(&self) -> bool {
        self.preview_generation != self.generation
    }

    /// Render synchronously if the preview is stale and return it
    pub fn render(&mut self) -> Arc<DocumentModel> {
        if !self.is_stale() {
            if let Some(doc) = &self.preview {
                return Arc::clone(doc);
            }
        }
        let ticket = self.ticket();
        let doc = Arc::new(assemble(&self.book));
        self.accept(ticket, Arc::clone(&doc));
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chapter;

    #[test]
    fn test_stale_render_is_discarded() {
        let mut session = PreviewSession::new(Book::new("Draft"));
        let (old_ticket, old_book) = session.snapshot();

        let new_ticket = session.update(|b| b.with_chapter(Chapter::new("Added")));
        assert!(new_ticket > old_ticket);

        let (_, new_book) = session.snapshot();
        assert!(session.accept(new_ticket, Arc::new(assemble(&new_book))));
        assert!(!session.accept(old_ticket, Arc::new(assemble(&old_book))));

        let preview = session.preview().unwrap();
        assert_eq!(preview.toc().len(), 1);
        assert!(!session.is_stale());
    }

    #[test]
    fn test_render_reuses_fresh_preview() {
        let mut session = PreviewSession::new(Book::new("Draft"));
        assert!(session.is_stale());

        let first = session.render();
        let second = session.render();
        assert!(Arc::ptr_eq(&first, &second));

        session.update(|b| b.with_title("Renamed"));
        assert!(session.is_stale());
        assert_eq!(session.render().title(), "Renamed");
    }
}
