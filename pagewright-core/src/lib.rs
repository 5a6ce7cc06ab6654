//! Pagewright Core Library
//!
//! Turns a book (chapters of lightly marked-up text, cover metadata and a
//! formatting configuration) into a paginated [`DocumentModel`]. The same
//! model drives the live preview and every export format, so what the
//! author sees is what gets exported.
//!
//! Pipeline: [`markup::resolve`] → [`layout::paginate`] →
//! [`layout::assemble`] → [`encoder::export`].

pub mod bookfile;
pub mod encoder;
pub mod error;
pub mod image;
pub mod layout;
pub mod markup;
pub mod session;
pub mod settings;
pub mod storage;
pub mod types;

pub use encoder::{export, ExportFormat};
pub use error::{
    ConfigError, ExportError, ImageError, PagewrightError, ParseError, Result, StorageError,
};
pub use layout::{assemble, build_toc, paginate};
pub use markup::{resolve, resolve_with_diagnostics, MalformedDirective};
pub use session::{PreviewSession, RenderTicket};
pub use settings::{JsonFileSettings, MemorySettings, SettingsStore};
pub use types::{
    AuthorImagePosition, Book, BookContent, Chapter, Configuration, DocumentModel, ImageBlob,
    ImageSource, Page, PageKind, PageNumberAlignment, ResolvedNode, TextRun, TextStyle, TocEntry,
};
