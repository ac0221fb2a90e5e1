//! Textbook index and note loading.

mod index;
mod note;
mod service;

pub use crate::error::TextbookError;
pub use index::{IndexEntry, TextbookIndex};
pub use note::{RenderedNote, decode_note, plain_text, title_from_filename};
pub use service::TextbookService;
