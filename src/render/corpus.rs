//! Page units across many documents.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use super::renderer::{DocumentRenderer, PageStream};
use crate::error::Result;
use crate::model::PageUnit;
use crate::source::discover;

/// Iterates the pages of several documents in order.
///
/// A document that cannot be opened yields a single `Err` and the iteration
/// moves on to the next document.
#[derive(Debug)]
pub struct CorpusStream {
    renderer: DocumentRenderer,
    pending: VecDeque<PathBuf>,
    current: Option<PageStream>,
    documents_opened: usize,
}

impl CorpusStream {
    pub fn new<I, P>(renderer: DocumentRenderer, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            renderer,
            pending: paths.into_iter().map(Into::into).collect(),
            current: None,
            documents_opened: 0,
        }
    }

    /// Stream every PDF found at `source` (a file or a directory).
    pub fn discover<P: AsRef<Path>>(renderer: DocumentRenderer, source: P) -> Result<Self> {
        Ok(Self::new(renderer, discover(source)?))
    }

    /// Documents not yet started.
    pub fn remaining_documents(&self) -> usize {
        self.pending.len()
    }

    /// Documents opened so far.
    pub fn documents_opened(&self) -> usize {
        self.documents_opened
    }
}

impl Iterator for CorpusStream {
    type Item = Result<PageUnit>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(unit) = self.current.as_mut().and_then(Iterator::next) {
                return Some(Ok(unit));
            }
            self.current = None;

            let path = self.pending.pop_front()?;
            match self.renderer.render(&path) {
                Ok(stream) => {
                    self.documents_opened += 1;
                    self.current = Some(stream);
                }
                Err(e) => {
                    log::warn!("Skipping {}: {}", path.display(), e);
                    return Some(Err(e));
                }
            }
        }
    }
}
