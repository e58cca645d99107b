//! Book registry: one book per unordered asset pair.
//!
//! Books are created once and live for the lifetime of the registry. Ids
//! are assigned densely from zero in creation order.

use std::collections::HashMap;

use pairbook_matchcore::OrderBook;
use pairbook_types::{AssetId, BookConfig, BookId, PairbookError, Result};

/// Maps asset pairs to their order books.
#[derive(Debug, Default, Clone)]
pub struct BookRegistry {
    books: Vec<OrderBook>,
    /// `(asset0, asset1) -> book`, keyed in the orientation the book was
    /// created with.
    by_pair: HashMap<(AssetId, AssetId), BookId>,
}

impl BookRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a book for `config`'s pair.
    ///
    /// A pair may only be registered once, in either orientation.
    pub fn create_book(&mut self, config: &BookConfig) -> Result<BookId> {
        config.validate()?;
        if self.by_pair.contains_key(&(config.asset0, config.asset1))
            || self.by_pair.contains_key(&(config.asset1, config.asset0))
        {
            return Err(PairbookError::DuplicatePair {
                asset0: config.asset0,
                asset1: config.asset1,
            });
        }
        let raw = u8::try_from(self.books.len()).map_err(|_| PairbookError::BookIdExhausted)?;
        let book_id = BookId(raw);

        let book = OrderBook::new(book_id, config)?;
        self.books.push(book);
        self.by_pair.insert((config.asset0, config.asset1), book_id);

        tracing::info!(
            book = %book_id,
            asset0 = %config.asset0,
            asset1 = %config.asset1,
            log_size_tick = config.log_size_tick,
            log_price_tick = config.log_price_tick,
            "Book created"
        );
        Ok(book_id)
    }

    pub fn book(&self, book_id: BookId) -> Result<&OrderBook> {
        self.books
            .get(usize::from(book_id.0))
            .ok_or(PairbookError::BookNotFound(book_id))
    }

    pub fn book_mut(&mut self, book_id: BookId) -> Result<&mut OrderBook> {
        self.books
            .get_mut(usize::from(book_id.0))
            .ok_or(PairbookError::BookNotFound(book_id))
    }

    /// The book trading exactly `asset0/asset1` in that orientation.
    #[must_use]
    pub fn book_id_for_pair(&self, asset0: AssetId, asset1: AssetId) -> Option<BookId> {
        self.by_pair.get(&(asset0, asset1)).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.books.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OrderBook> {
        self.books.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(n: u32) -> AssetId {
        AssetId::from_symbol(&format!("TKN{n}"))
    }

    #[test]
    fn assigns_dense_ids() {
        let mut reg = BookRegistry::new();
        let a = reg.create_book(&BookConfig::unit(asset(0), asset(1))).unwrap();
        let b = reg.create_book(&BookConfig::unit(asset(0), asset(2))).unwrap();
        assert_eq!((a, b), (BookId(0), BookId(1)));
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.book(b).unwrap().info().asset1, asset(2));
        assert_eq!(reg.book_id_for_pair(asset(0), asset(2)), Some(b));
        assert_eq!(reg.book_id_for_pair(asset(2), asset(0)), None);
    }

    #[test]
    fn duplicate_pair_rejected_in_both_orientations() {
        let mut reg = BookRegistry::new();
        reg.create_book(&BookConfig::unit(asset(0), asset(1))).unwrap();
        for config in [
            BookConfig::unit(asset(0), asset(1)),
            BookConfig::new(asset(1), asset(0), 2, 2, 6),
        ] {
            assert!(matches!(
                reg.create_book(&config),
                Err(PairbookError::DuplicatePair { .. })
            ));
        }
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn identical_assets_rejected() {
        let mut reg = BookRegistry::new();
        let err = reg.create_book(&BookConfig::unit(asset(0), asset(0))).unwrap_err();
        assert_eq!(err, PairbookError::IdenticalAssets(asset(0)));
    }

    #[test]
    fn bad_ticks_do_not_consume_an_id() {
        let mut reg = BookRegistry::new();
        assert!(reg.create_book(&BookConfig::new(asset(0), asset(1), 39, 0, 0)).is_err());
        let id = reg.create_book(&BookConfig::unit(asset(0), asset(1))).unwrap();
        assert_eq!(id, BookId(0));
    }

    #[test]
    fn id_space_is_one_byte() {
        let mut reg = BookRegistry::new();
        for n in 1..=256 {
            reg.create_book(&BookConfig::unit(asset(0), asset(n))).unwrap();
        }
        let err = reg.create_book(&BookConfig::unit(asset(0), asset(999))).unwrap_err();
        assert_eq!(err, PairbookError::BookIdExhausted);
    }

    #[test]
    fn unknown_book() {
        let reg = BookRegistry::new();
        assert_eq!(reg.book(BookId(3)).unwrap_err(), PairbookError::BookNotFound(BookId(3)));
    }
}
