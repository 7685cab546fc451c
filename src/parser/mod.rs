//! PDF parsing module.

pub mod backend;
mod layout;

pub use backend::{decode_text_simple, ContentOp, LopdfBackend, PageId, PdfBackend, PdfValue};
pub use layout::{
    build_layout, collect_spans, BoundingBox, FontStatistics, LayoutAnalyzer, LayoutBlock,
    LayoutLabel, PageLayout, TextLine, TextSpan,
};
