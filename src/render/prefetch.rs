//! Lookahead buffering between the renderer and its consumer.
//!
//! [`Prefetch`] renders ahead on the consumer's thread; [`BackgroundPrefetch`]
//! renders on a worker thread so rendering overlaps with whatever the
//! consumer does between pulls. Both hand out units strictly in order and
//! never hold more than the lookahead in materialized, un-yielded units.

use std::collections::VecDeque;
use std::fmt;
use std::iter::Fuse;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver};

use super::renderer::DocumentRenderer;
use super::CorpusStream;
use crate::error::Result;
use crate::model::PageUnit;

/// Wrap `units` in a [`Prefetch`] buffer of depth `lookahead`.
pub fn stream<I: IntoIterator>(units: I, lookahead: usize) -> Prefetch<I::IntoIter> {
    Prefetch::new(units.into_iter(), lookahead)
}

/// Iterator adapter that keeps up to `lookahead` items materialized ahead
/// of the consumer.
///
/// Each pull hands out the oldest buffered item (or pulls one straight
/// through when the buffer is empty) and then tops the buffer up again.
pub struct Prefetch<I: Iterator> {
    inner: Fuse<I>,
    buffer: VecDeque<I::Item>,
    lookahead: usize,
    position: usize,
    peak: usize,
}

impl<I: Iterator> Prefetch<I> {
    pub fn new(inner: I, lookahead: usize) -> Self {
        Self {
            inner: inner.fuse(),
            buffer: VecDeque::with_capacity(lookahead),
            lookahead,
            position: 0,
            peak: 0,
        }
    }

    /// Fill the buffer before the first pull.
    pub fn prime(&mut self) -> &mut Self {
        self.fill();
        self
    }

    /// Items materialized but not yet handed out.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Largest number of buffered items seen so far.
    pub fn peak_buffered(&self) -> usize {
        self.peak
    }

    /// Number of items handed out so far.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn lookahead(&self) -> usize {
        self.lookahead
    }

    fn fill(&mut self) {
        while self.buffer.len() < self.lookahead {
            match self.inner.next() {
                Some(item) => self.buffer.push_back(item),
                None => break,
            }
        }
        self.peak = self.peak.max(self.buffer.len());
    }
}

impl<I: Iterator> fmt::Debug for Prefetch<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prefetch")
            .field("lookahead", &self.lookahead)
            .field("buffered", &self.buffer.len())
            .field("position", &self.position)
            .finish()
    }
}

impl<I: Iterator> Iterator for Prefetch<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.buffer.pop_front().or_else(|| self.inner.next())?;
        self.position += 1;
        self.fill();
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (lo, hi) = self.inner.size_hint();
        let buffered = self.buffer.len();
        (
            lo.saturating_add(buffered),
            hi.and_then(|h| h.checked_add(buffered)),
        )
    }
}

/// Items produced on a worker thread and handed over through a bounded
/// channel.
///
/// The channel holds `lookahead - 1` items and the worker holds the one it
/// is trying to send, so at most `lookahead` items wait for the consumer.
/// A lookahead of 0 behaves like 1: the worker can always finish one item
/// ahead. Dropping the consumer stops the worker at its next send.
#[derive(Debug)]
pub struct BackgroundPrefetch<T> {
    receiver: Option<Receiver<T>>,
    handle: Option<JoinHandle<()>>,
    position: usize,
}

impl<T: Send + 'static> BackgroundPrefetch<T> {
    /// Run `producer` on a worker thread.
    ///
    /// The producer calls its `emit` argument for each item; `emit` returns
    /// `false` once the consumer is gone, and the producer should return.
    pub fn spawn<F>(lookahead: usize, producer: F) -> Self
    where
        F: FnOnce(&mut dyn FnMut(T) -> bool) + Send + 'static,
    {
        let (sender, receiver) = bounded(lookahead.saturating_sub(1));
        let handle = thread::spawn(move || {
            let mut emit = |item: T| sender.send(item).is_ok();
            producer(&mut emit);
        });
        Self {
            receiver: Some(receiver),
            handle: Some(handle),
            position: 0,
        }
    }

    /// Number of items handed out so far.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl BackgroundPrefetch<Result<PageUnit>> {
    /// Render `paths` on a worker thread.
    ///
    /// The renderer is built on the worker by `make_renderer`, since
    /// rasterizers are bound to the thread that created them. If it fails,
    /// its error is the only item.
    pub fn render<F>(paths: Vec<PathBuf>, lookahead: usize, make_renderer: F) -> Self
    where
        F: FnOnce() -> Result<DocumentRenderer> + Send + 'static,
    {
        Self::spawn(lookahead, move |emit| {
            let renderer = match make_renderer() {
                Ok(renderer) => renderer,
                Err(e) => {
                    emit(Err(e));
                    return;
                }
            };
            for item in CorpusStream::new(renderer, paths) {
                if !emit(item) {
                    log::debug!("Consumer dropped, stopping background rendering");
                    return;
                }
            }
        })
    }
}

impl<T> Iterator for BackgroundPrefetch<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.receiver.as_ref()?.recv().ok()?;
        self.position += 1;
        Some(item)
    }
}

impl<T> Drop for BackgroundPrefetch<T> {
    fn drop(&mut self) {
        // Disconnect first so a blocked worker wakes up and exits.
        self.receiver.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("Background prefetch worker panicked");
            }
        }
    }
}
