//! Event root hashing for replica consistency checks.
//!
//! Two books fed the same calls in the same order must emit the same
//! events. The event root is a SHA-256 digest over the ordered event log
//! that lets replicas compare execution without shipping full payloads.

use pairbook_types::{BookEvent, Identity, OrderId, Side, U256};
use sha2::{Digest, Sha256};

/// Compute the root hash of an ordered event log.
///
/// Covers the event kind, book, order ids, owners, amounts and side of
/// every event. The same events in the same order always produce the same
/// root.
#[must_use]
pub fn compute_event_root(events: &[BookEvent]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"pairbook:event_root:v1:");
    hasher.update((events.len() as u64).to_le_bytes());

    for event in events {
        hasher.update([event.tag(), event.book_id().0]);
        match event {
            BookEvent::LimitOrderCreated { id, owner, amount0, amount1, side, .. }
            | BookEvent::LimitOrderUpdated { id, owner, amount0, amount1, side, .. }
            | BookEvent::LimitOrderCanceled { id, owner, amount0, amount1, side, .. }
            | BookEvent::MarketOrderCreated { id, owner, amount0, amount1, side, .. } => {
                hash_order(&mut hasher, *id, owner);
                hash_amount(&mut hasher, amount0);
                hash_amount(&mut hasher, amount1);
                hasher.update([u8::from(*side == Side::Ask)]);
            }
            BookEvent::Swap {
                ask_id,
                ask_owner,
                bid_id,
                bid_owner,
                amount0,
                amount1,
                ..
            } => {
                hash_order(&mut hasher, *ask_id, ask_owner);
                hash_order(&mut hasher, *bid_id, bid_owner);
                hash_amount(&mut hasher, amount0);
                hash_amount(&mut hasher, amount1);
            }
        }
    }

    let result = hasher.finalize();
    let mut root = [0u8; 32];
    root.copy_from_slice(&result);
    root
}

/// Verify that `expected_root` matches the root recomputed from `events`.
#[must_use]
pub fn verify_event_root(events: &[BookEvent], expected_root: &[u8; 32]) -> bool {
    compute_event_root(events) == *expected_root
}

fn hash_order(hasher: &mut Sha256, id: OrderId, owner: &Identity) {
    hasher.update(id.0.to_be_bytes());
    hasher.update(owner.as_bytes());
}

fn hash_amount(hasher: &mut Sha256, amount: &U256) {
    let mut buf = [0u8; 32];
    amount.to_big_endian(&mut buf);
    hasher.update(buf);
}

#[cfg(test)]
mod tests {
    use pairbook_types::BookId;

    use super::*;

    fn make_swap(ask: u32, amount0: u64) -> BookEvent {
        BookEvent::Swap {
            book_id: BookId(0),
            ask_id: OrderId(ask),
            ask_owner: Identity([1; 20]),
            bid_id: OrderId(9),
            bid_owner: Identity([2; 20]),
            amount0: U256::from(amount0),
            amount1: U256::from(amount0 * 10),
        }
    }

    fn make_created(side: Side) -> BookEvent {
        BookEvent::LimitOrderCreated {
            book_id: BookId(0),
            id: OrderId(2),
            owner: Identity([1; 20]),
            amount0: U256::from(10),
            amount1: U256::from(100),
            side,
        }
    }

    #[test]
    fn empty_log_deterministic() {
        assert_eq!(compute_event_root(&[]), compute_event_root(&[]));
    }

    #[test]
    fn same_events_same_root() {
        let events = vec![make_created(Side::Ask), make_swap(2, 10)];
        assert_eq!(compute_event_root(&events), compute_event_root(&events.clone()));
    }

    #[test]
    fn amounts_and_side_are_covered() {
        assert_ne!(
            compute_event_root(&[make_swap(2, 10)]),
            compute_event_root(&[make_swap(2, 11)])
        );
        assert_ne!(
            compute_event_root(&[make_created(Side::Ask)]),
            compute_event_root(&[make_created(Side::Bid)])
        );
    }

    #[test]
    fn order_matters() {
        let a = make_swap(2, 1);
        let b = make_swap(3, 1);
        assert_ne!(
            compute_event_root(&[a.clone(), b.clone()]),
            compute_event_root(&[b, a]),
            "Order of events must affect root hash"
        );
    }

    #[test]
    fn verify_roots() {
        let events = vec![make_swap(2, 5)];
        let root = compute_event_root(&events);
        assert!(verify_event_root(&events, &root));
        assert!(!verify_event_root(&events, &[0xAB; 32]));
    }
}
