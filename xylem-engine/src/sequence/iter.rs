use bitflags::bitflags;

use crate::error;

use super::core::Sequence;
use super::item::Item;

bitflags! {
    /// Statically known properties of a sequence iterator.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IterProperties: u8 {
        /// All items are resident; `grounded()` is free.
        const GROUNDED = 1 << 0;
        /// `last_position()` answers without exhausting the iterator.
        const LAST_POSITION_FINDER = 1 << 1;
        /// `has_next()` answers without disturbing `next()`.
        const LOOKAHEAD = 1 << 2;
        /// The sequence can be delivered in reverse order cheaply.
        const REVERSIBLE = 1 << 3;
    }
}

/// The backend of a [`SequenceIter`].
///
/// Implementations deliver items in producer order and construct fresh
/// restarted copies of themselves. An error yielded from `next_item` aborts
/// the iteration; it must be yielded, never swallowed.
pub trait ItemSource {
    fn next_item(&mut self) -> Option<error::Result<Item>>;

    /// A fresh source over the same logical sequence, positioned before the
    /// first item.
    fn another(&self) -> Box<dyn ItemSource>;

    fn properties(&self) -> IterProperties {
        IterProperties::empty()
    }

    /// The total number of items, when [`IterProperties::LAST_POSITION_FINDER`]
    /// is advertised.
    fn last_position(&self) -> Option<usize> {
        None
    }

    /// Whether another item follows, when [`IterProperties::LOOKAHEAD`] is
    /// advertised. Must not affect the next `next_item`.
    fn has_next(&self) -> Option<bool> {
        None
    }
}

/// The pull iterator over an XDM sequence.
///
/// Tracks the 1-based position and the current item, the bookkeeping the
/// dynamic context's focus is built from.
pub struct SequenceIter {
    source: Box<dyn ItemSource>,
    position: usize,
    current: Option<Item>,
    done: bool,
}

impl SequenceIter {
    pub fn new(source: Box<dyn ItemSource>) -> Self {
        SequenceIter {
            source,
            position: 0,
            current: None,
            done: false,
        }
    }

    /// An iterator over a grounded sequence.
    pub fn from_sequence(sequence: Sequence) -> Self {
        Self::new(Box::new(GroundedSource {
            sequence,
            index: 0,
        }))
    }

    /// Deliver the next item, advancing the position.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<error::Result<Item>> {
        if self.done {
            return None;
        }
        match self.source.next_item() {
            Some(Ok(item)) => {
                self.position += 1;
                self.current = Some(item.clone());
                Some(Ok(item))
            }
            Some(Err(e)) => {
                self.done = true;
                Some(Err(e))
            }
            None => {
                self.done = true;
                self.current = None;
                None
            }
        }
    }

    /// The 1-based position of the current item; 0 before the first
    /// `next`.
    pub fn position(&self) -> usize {
        self.position
    }

    /// The item most recently delivered.
    pub fn current(&self) -> Option<&Item> {
        self.current.as_ref()
    }

    pub fn properties(&self) -> IterProperties {
        self.source.properties()
    }

    /// A fresh iterator over the same logical sequence, positioned before
    /// the first item.
    pub fn another(&self) -> SequenceIter {
        SequenceIter::new(self.source.another())
    }

    /// The total item count, when the source can answer directly.
    pub fn last_position(&self) -> Option<usize> {
        self.source.last_position()
    }

    /// Whether more items follow, when the source supports lookahead.
    pub fn has_next(&self) -> Option<bool> {
        if self.done {
            return Some(false);
        }
        self.source.has_next()
    }

    /// Materialize the remainder into a grounded sequence.
    pub fn grounded(mut self) -> error::Result<Sequence> {
        let mut items = Vec::new();
        while let Some(item) = self.next() {
            items.push(item?);
        }
        Ok(Sequence::from_items(items))
    }
}

impl Iterator for SequenceIter {
    type Item = error::Result<Item>;

    fn next(&mut self) -> Option<Self::Item> {
        SequenceIter::next(self)
    }
}

impl From<Sequence> for SequenceIter {
    fn from(sequence: Sequence) -> Self {
        SequenceIter::from_sequence(sequence)
    }
}

// every grounded sequence is its own source
struct GroundedSource {
    sequence: Sequence,
    index: usize,
}

impl ItemSource for GroundedSource {
    fn next_item(&mut self) -> Option<error::Result<Item>> {
        let item = self.sequence.get(self.index)?;
        self.index += 1;
        Some(Ok(item))
    }

    fn another(&self) -> Box<dyn ItemSource> {
        Box::new(GroundedSource {
            sequence: self.sequence.clone(),
            index: 0,
        })
    }

    fn properties(&self) -> IterProperties {
        IterProperties::GROUNDED
            | IterProperties::LAST_POSITION_FINDER
            | IterProperties::LOOKAHEAD
            | IterProperties::REVERSIBLE
    }

    fn last_position(&self) -> Option<usize> {
        Some(self.sequence.len())
    }

    fn has_next(&self) -> Option<bool> {
        Some(self.index < self.sequence.len())
    }
}

/// Exactly one item, or exactly one deferred error.
///
/// A failure observed while setting up a lazy iterator is delivered on the
/// first `next` rather than swallowed.
pub(crate) struct ErrorSource {
    error: error::Error,
    delivered: bool,
}

impl ErrorSource {
    pub(crate) fn new(error: error::Error) -> Self {
        ErrorSource {
            error,
            delivered: false,
        }
    }
}

impl ItemSource for ErrorSource {
    fn next_item(&mut self) -> Option<error::Result<Item>> {
        if self.delivered {
            None
        } else {
            self.delivered = true;
            Some(Err(self.error.clone()))
        }
    }

    fn another(&self) -> Box<dyn ItemSource> {
        Box::new(ErrorSource::new(self.error.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_and_current() {
        let mut iter = SequenceIter::from_sequence(Sequence::range(10, 12));
        assert_eq!(iter.position(), 0);
        assert_eq!(iter.current(), None);
        iter.next().unwrap().unwrap();
        assert_eq!(iter.position(), 1);
        assert_eq!(iter.current(), Some(&Item::from(10i64)));
        iter.next().unwrap().unwrap();
        iter.next().unwrap().unwrap();
        assert_eq!(iter.position(), 3);
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_another_restarts() {
        let mut iter = SequenceIter::from_sequence(Sequence::range(1, 3));
        iter.next().unwrap().unwrap();
        iter.next().unwrap().unwrap();
        let restarted = iter.another();
        assert_eq!(restarted.position(), 0);
        let original: Vec<_> = iter.another().map(|i| i.unwrap()).collect();
        let again: Vec<_> = restarted.map(|i| i.unwrap()).collect();
        assert_eq!(original, again);
        assert_eq!(original.len(), 3);
    }

    #[test]
    fn test_grounded_properties() {
        let iter = SequenceIter::from_sequence(Sequence::range(1, 5));
        assert!(iter.properties().contains(IterProperties::GROUNDED));
        assert_eq!(iter.last_position(), Some(5));
        assert_eq!(iter.has_next(), Some(true));
    }

    #[test]
    fn test_lookahead_is_side_effect_free() {
        let mut iter = SequenceIter::from_sequence(Sequence::range(1, 2));
        assert_eq!(iter.has_next(), Some(true));
        assert_eq!(iter.has_next(), Some(true));
        assert_eq!(iter.next().unwrap().unwrap(), Item::from(1i64));
        iter.next().unwrap().unwrap();
        assert_eq!(iter.has_next(), Some(false));
    }

    #[test]
    fn test_error_source_defers_error_once() {
        let mut iter = SequenceIter::new(Box::new(ErrorSource::new(error::Error::XPTY0004)));
        assert_eq!(iter.next().unwrap(), Err(error::Error::XPTY0004));
        assert!(iter.next().is_none());
    }
}
