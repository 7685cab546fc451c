//! Page units: what a single PDF page becomes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::token::{Token, TokenWriter};
use crate::config::ImageFormat;
use crate::parser::{BoundingBox, LayoutLabel, PageLayout};
use crate::source::document_title;

/// One page's annotation artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageUnit {
    /// Document the page belongs to
    pub path: PathBuf,
    /// 0-based page index
    pub page: u32,
    pub content: PageContent,
}

/// Payload of a [`PageUnit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageContent {
    /// Rasterized page
    Image(PageImage),
    /// Layout-labelled text
    Spans(PageSpans),
    /// The page could not be rendered
    Failed(PageFailure),
}

/// A rendered page image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    pub dpi: u32,
    pub format: ImageFormat,
    /// `data:` URI holding the encoded image
    pub data_uri: String,
}

/// Text of a page split into labelled blocks and tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSpans {
    /// Block texts joined by [`SEPARATOR`](super::token::SEPARATOR)
    pub text: String,
    pub tokens: Vec<Token>,
    pub blocks: Vec<SpanBlock>,
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
    /// Rendered page shown next to the text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<PageImage>,
}

/// A layout block located within [`PageSpans::text`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanBlock {
    pub text: String,
    pub label: LayoutLabel,
    /// Character offset of the first character
    pub start: usize,
    /// Character offset past the last character
    pub end: usize,
    /// Id of the first token
    pub token_start: usize,
    /// Id of the last token (inclusive)
    pub token_end: usize,
    /// Region on the page in points, top-left origin
    pub bbox: BoundingBox,
}

/// Placeholder for a page that failed to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageFailure {
    pub reason: String,
}

impl PageUnit {
    pub fn new(path: impl Into<PathBuf>, page: u32, content: PageContent) -> Self {
        Self {
            path: path.into(),
            page,
            content,
        }
    }

    /// Placeholder unit for a failed page.
    pub fn failed(path: impl Into<PathBuf>, page: u32, reason: impl ToString) -> Self {
        Self::new(
            path,
            page,
            PageContent::Failed(PageFailure {
                reason: reason.to_string(),
            }),
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.content, PageContent::Failed(_))
    }

    pub fn image(&self) -> Option<&PageImage> {
        match &self.content {
            PageContent::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn spans(&self) -> Option<&PageSpans> {
        match &self.content {
            PageContent::Spans(spans) => Some(spans),
            _ => None,
        }
    }

    /// Failure reason of a placeholder unit.
    pub fn failure(&self) -> Option<&str> {
        match &self.content {
            PageContent::Failed(failure) => Some(&failure.reason),
            _ => None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File stem of the source document.
    pub fn title(&self) -> String {
        document_title(&self.path)
    }
}

impl PageSpans {
    /// Lay out the blocks of `layout` as one text with tokens.
    pub fn from_layout(layout: PageLayout) -> Self {
        let mut writer = TokenWriter::new();
        let mut blocks = Vec::with_capacity(layout.blocks.len());

        for (i, block) in layout.blocks.into_iter().enumerate() {
            if i > 0 {
                writer.push_separator();
            }
            let start = writer.char_len();
            let token_start = writer.token_count();
            writer.push_text(&block.text, block.label);
            blocks.push(SpanBlock {
                start,
                end: writer.char_len(),
                token_start,
                token_end: writer.token_count().saturating_sub(1).max(token_start),
                label: block.label,
                bbox: block.bbox,
                text: block.text,
            });
        }

        let (text, tokens) = writer.finish();
        Self {
            text,
            tokens,
            blocks,
            width: layout.width,
            height: layout.height,
            preview: None,
        }
    }

    /// Attach a rendered preview.
    pub fn with_preview(mut self, preview: PageImage) -> Self {
        self.preview = Some(preview);
        self
    }

    /// Tokens covering `block`.
    pub fn block_tokens(&self, block: &SpanBlock) -> &[Token] {
        let end = (block.token_end + 1).min(self.tokens.len());
        &self.tokens[block.token_start.min(end)..end]
    }
}
