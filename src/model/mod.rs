//! Page units and the tokens they carry.
//!
//! A [`PageUnit`] is what the renderer emits for every page of a document:
//! an encoded image, layout-labelled text with tokens, or a placeholder
//! recording why the page failed.

mod token;
mod unit;

pub use token::{
    tokenize, Token, TokenStyle, TokenWriter, FONT_SIZE_HEADING, FONT_SIZE_TEXT, SEPARATOR,
};
pub use unit::{PageContent, PageFailure, PageImage, PageSpans, PageUnit, SpanBlock};
