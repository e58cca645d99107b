//! Compact binary calldata for book operations.
//!
//! All integers are big-endian and fields are packed with no padding:
//!
//! ```text
//! [opcode u8][book u8] payload
//!
//! 0x01 create   count u8, count x (amount0Base u64, priceBase u64, isAsk u8, hint u32)
//! 0x02 update   count u8, count x (id u32, amount0Base u64, priceBase u64, hint u32)
//! 0x03 cancel   count u8, count x (id u32)
//! 0x04 market   amount0Base u64, priceBase u64, isAsk u8
//! ```
//!
//! A batch carries between 1 and 255 entries. The order owner never
//! appears in calldata; it is always the authenticated caller.

use serde::{Deserialize, Serialize};

use pairbook_types::{BookId, OrderId, PairbookError, Result, Side, constants};

pub const OP_CREATE_LIMIT_ORDERS: u8 = 0x01;
pub const OP_UPDATE_LIMIT_ORDERS: u8 = 0x02;
pub const OP_CANCEL_LIMIT_ORDERS: u8 = 0x03;
pub const OP_CREATE_MARKET_ORDER: u8 = 0x04;

/// Bytes per entry of a create batch.
pub const CREATE_ENTRY_LEN: usize = 8 + 8 + 1 + 4;
/// Bytes per entry of an update batch.
pub const UPDATE_ENTRY_LEN: usize = 4 + 8 + 8 + 4;
/// Bytes per entry of a cancel batch.
pub const CANCEL_ENTRY_LEN: usize = 4;

/// One limit order to place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLimitOrder {
    pub amount0_base: u64,
    pub price_base: u64,
    pub side: Side,
    pub hint: OrderId,
}

/// New size and price for a resting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrderUpdate {
    pub id: OrderId,
    pub amount0_base: u64,
    pub price_base: u64,
    pub hint: OrderId,
}

/// An immediate-or-cancel order with a worst-price bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketOrder {
    pub amount0_base: u64,
    pub price_base: u64,
    pub side: Side,
}

/// A decoded call against one book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Call {
    CreateLimitOrders {
        book_id: BookId,
        orders: Vec<NewLimitOrder>,
    },
    UpdateLimitOrders {
        book_id: BookId,
        updates: Vec<LimitOrderUpdate>,
    },
    CancelLimitOrders {
        book_id: BookId,
        ids: Vec<OrderId>,
    },
    CreateMarketOrder {
        book_id: BookId,
        order: MarketOrder,
    },
}

/// What a committed call returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallOutcome {
    /// Ids allocated to each order, in batch order.
    Created(Vec<OrderId>),
    /// Per update: `false` if the order was no longer active.
    Updated(Vec<bool>),
    /// Per cancel: `false` if the order was no longer active.
    Canceled(Vec<bool>),
    MarketExecuted(OrderId),
}

impl Call {
    #[must_use]
    pub fn book_id(&self) -> BookId {
        match self {
            Self::CreateLimitOrders { book_id, .. }
            | Self::UpdateLimitOrders { book_id, .. }
            | Self::CancelLimitOrders { book_id, .. }
            | Self::CreateMarketOrder { book_id, .. } => *book_id,
        }
    }

    #[must_use]
    pub fn opcode(&self) -> u8 {
        match self {
            Self::CreateLimitOrders { .. } => OP_CREATE_LIMIT_ORDERS,
            Self::UpdateLimitOrders { .. } => OP_UPDATE_LIMIT_ORDERS,
            Self::CancelLimitOrders { .. } => OP_CANCEL_LIMIT_ORDERS,
            Self::CreateMarketOrder { .. } => OP_CREATE_MARKET_ORDER,
        }
    }

    /// Number of book operations the call performs.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::CreateLimitOrders { orders, .. } => orders.len(),
            Self::UpdateLimitOrders { updates, .. } => updates.len(),
            Self::CancelLimitOrders { ids, .. } => ids.len(),
            Self::CreateMarketOrder { .. } => 1,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode one call. The input must be consumed exactly.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        let opcode = r.u8("opcode")?;
        if !(OP_CREATE_LIMIT_ORDERS..=OP_CREATE_MARKET_ORDER).contains(&opcode) {
            return Err(PairbookError::UnknownOpcode(opcode));
        }
        let book_id = BookId(r.u8("book id")?);

        let call = match opcode {
            OP_CREATE_LIMIT_ORDERS => {
                let count = r.count(CREATE_ENTRY_LEN)?;
                let mut orders = Vec::with_capacity(count);
                for _ in 0..count {
                    orders.push(NewLimitOrder {
                        amount0_base: r.u64("amount0Base")?,
                        price_base: r.u64("priceBase")?,
                        side: r.side()?,
                        hint: OrderId(r.u32("hint")?),
                    });
                }
                Self::CreateLimitOrders { book_id, orders }
            }
            OP_UPDATE_LIMIT_ORDERS => {
                let count = r.count(UPDATE_ENTRY_LEN)?;
                let mut updates = Vec::with_capacity(count);
                for _ in 0..count {
                    updates.push(LimitOrderUpdate {
                        id: OrderId(r.u32("id")?),
                        amount0_base: r.u64("amount0Base")?,
                        price_base: r.u64("priceBase")?,
                        hint: OrderId(r.u32("hint")?),
                    });
                }
                Self::UpdateLimitOrders { book_id, updates }
            }
            OP_CANCEL_LIMIT_ORDERS => {
                let count = r.count(CANCEL_ENTRY_LEN)?;
                let mut ids = Vec::with_capacity(count);
                for _ in 0..count {
                    ids.push(OrderId(r.u32("id")?));
                }
                Self::CancelLimitOrders { book_id, ids }
            }
            _ => Self::CreateMarketOrder {
                book_id,
                order: MarketOrder {
                    amount0_base: r.u64("amount0Base")?,
                    price_base: r.u64("priceBase")?,
                    side: r.side()?,
                },
            },
        };

        r.finish()?;
        Ok(call)
    }

    /// Encode the call. Fails if a batch is empty or longer than 255.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = vec![self.opcode(), self.book_id().0];
        match self {
            Self::CreateLimitOrders { orders, .. } => {
                out.push(batch_count(orders.len())?);
                for o in orders {
                    out.extend_from_slice(&o.amount0_base.to_be_bytes());
                    out.extend_from_slice(&o.price_base.to_be_bytes());
                    out.push(u8::from(o.side.is_ask()));
                    out.extend_from_slice(&o.hint.0.to_be_bytes());
                }
            }
            Self::UpdateLimitOrders { updates, .. } => {
                out.push(batch_count(updates.len())?);
                for u in updates {
                    out.extend_from_slice(&u.id.0.to_be_bytes());
                    out.extend_from_slice(&u.amount0_base.to_be_bytes());
                    out.extend_from_slice(&u.price_base.to_be_bytes());
                    out.extend_from_slice(&u.hint.0.to_be_bytes());
                }
            }
            Self::CancelLimitOrders { ids, .. } => {
                out.push(batch_count(ids.len())?);
                for id in ids {
                    out.extend_from_slice(&id.0.to_be_bytes());
                }
            }
            Self::CreateMarketOrder { order, .. } => {
                out.extend_from_slice(&order.amount0_base.to_be_bytes());
                out.extend_from_slice(&order.price_base.to_be_bytes());
                out.push(u8::from(order.side.is_ask()));
            }
        }
        Ok(out)
    }
}

fn batch_count(len: usize) -> Result<u8> {
    match u8::try_from(len) {
        Ok(n) if n > 0 && usize::from(n) <= constants::MAX_BATCH_SIZE => Ok(n),
        _ => Err(malformed(format!(
            "batch of {len} entries, expected 1..={}",
            constants::MAX_BATCH_SIZE
        ))),
    }
}

fn malformed(reason: impl Into<String>) -> PairbookError {
    PairbookError::MalformedCalldata {
        reason: reason.into(),
    }
}

/// Cursor over calldata bytes.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take<const N: usize>(&mut self, field: &str) -> Result<[u8; N]> {
        let end = self.pos + N;
        let slice = self.bytes.get(self.pos..end).ok_or_else(|| {
            malformed(format!("truncated at byte {} reading {field}", self.pos))
        })?;
        let mut buf = [0u8; N];
        buf.copy_from_slice(slice);
        self.pos = end;
        Ok(buf)
    }

    fn u8(&mut self, field: &str) -> Result<u8> {
        Ok(self.take::<1>(field)?[0])
    }

    fn u32(&mut self, field: &str) -> Result<u32> {
        Ok(u32::from_be_bytes(self.take(field)?))
    }

    fn u64(&mut self, field: &str) -> Result<u64> {
        Ok(u64::from_be_bytes(self.take(field)?))
    }

    fn side(&mut self) -> Result<Side> {
        match self.u8("isAsk")? {
            0 => Ok(Side::Bid),
            1 => Ok(Side::Ask),
            other => Err(malformed(format!("isAsk must be 0 or 1, got {other}"))),
        }
    }

    /// Read a batch count and check the remaining length up front.
    fn count(&mut self, entry_len: usize) -> Result<usize> {
        let count = usize::from(self.u8("count")?);
        if count == 0 {
            return Err(malformed("empty batch"));
        }
        let expected = count * entry_len;
        let remaining = self.bytes.len() - self.pos;
        if remaining != expected {
            return Err(malformed(format!(
                "{count} entries need {expected} bytes, got {remaining}"
            )));
        }
        Ok(count)
    }

    fn finish(&self) -> Result<()> {
        if self.pos != self.bytes.len() {
            return Err(malformed(format!(
                "{} trailing bytes",
                self.bytes.len() - self.pos
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_batch_layout() {
        let call = Call::CreateLimitOrders {
            book_id: BookId(7),
            orders: vec![NewLimitOrder {
                amount0_base: 10,
                price_base: 3,
                side: Side::Ask,
                hint: OrderId(5),
            }],
        };
        let bytes = call.encode().unwrap();
        assert_eq!(bytes.len(), 3 + CREATE_ENTRY_LEN);
        assert_eq!(&bytes[..3], &[0x01, 7, 1]);
        assert_eq!(&bytes[3..11], &10u64.to_be_bytes());
        assert_eq!(&bytes[11..19], &3u64.to_be_bytes());
        assert_eq!(bytes[19], 1);
        assert_eq!(&bytes[20..], &5u32.to_be_bytes());
        assert_eq!(Call::decode(&bytes).unwrap(), call);
    }

    #[test]
    fn update_and_cancel_decode() {
        let update = Call::UpdateLimitOrders {
            book_id: BookId(0),
            updates: vec![
                LimitOrderUpdate { id: OrderId(2), amount0_base: 1, price_base: 2, hint: OrderId::HEAD },
                LimitOrderUpdate { id: OrderId(3), amount0_base: 4, price_base: 5, hint: OrderId(2) },
            ],
        };
        let bytes = update.encode().unwrap();
        assert_eq!(bytes.len(), 3 + 2 * UPDATE_ENTRY_LEN);
        assert_eq!(Call::decode(&bytes).unwrap(), update);

        let cancel = [0x03, 1, 2, 0, 0, 0, 9, 0, 0, 0, 4];
        assert_eq!(
            Call::decode(&cancel).unwrap(),
            Call::CancelLimitOrders { book_id: BookId(1), ids: vec![OrderId(9), OrderId(4)] }
        );
    }

    #[test]
    fn market_order_layout() {
        let call = Call::CreateMarketOrder {
            book_id: BookId(2),
            order: MarketOrder { amount0_base: 10, price_base: 10, side: Side::Bid },
        };
        let bytes = call.encode().unwrap();
        assert_eq!(bytes.len(), 2 + 8 + 8 + 1);
        assert_eq!(*bytes.last().unwrap(), 0);
        assert_eq!(Call::decode(&bytes).unwrap(), call);
        assert_eq!(call.len(), 1);
    }

    #[test]
    fn unknown_opcode() {
        assert_eq!(Call::decode(&[0x09, 0]).unwrap_err(), PairbookError::UnknownOpcode(0x09));
        assert_eq!(Call::decode(&[0x00]).unwrap_err(), PairbookError::UnknownOpcode(0x00));
    }

    #[test]
    fn malformed_inputs() {
        let cases: [&[u8]; 6] = [
            &[],
            &[0x03],
            &[0x03, 0, 0],
            &[0x03, 0, 2, 0, 0, 0, 1],
            &[0x03, 0, 1, 0, 0, 0, 1, 0xff],
            &[0x04, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 2],
        ];
        for bytes in cases {
            assert!(
                matches!(Call::decode(bytes), Err(PairbookError::MalformedCalldata { .. })),
                "accepted {bytes:?}"
            );
        }
    }

    #[test]
    fn market_trailing_bytes_rejected() {
        let mut bytes = Call::CreateMarketOrder {
            book_id: BookId(0),
            order: MarketOrder { amount0_base: 1, price_base: 1, side: Side::Ask },
        }
        .encode()
        .unwrap();
        bytes.push(0);
        assert!(matches!(
            Call::decode(&bytes),
            Err(PairbookError::MalformedCalldata { .. })
        ));
    }

    #[test]
    fn batch_size_bounds_on_encode() {
        let empty = Call::CancelLimitOrders { book_id: BookId(0), ids: vec![] };
        assert!(empty.encode().is_err());

        let full = Call::CancelLimitOrders { book_id: BookId(0), ids: vec![OrderId(2); 255] };
        assert_eq!(full.encode().unwrap().len(), 3 + 255 * CANCEL_ENTRY_LEN);

        let over = Call::CancelLimitOrders { book_id: BookId(0), ids: vec![OrderId(2); 256] };
        assert!(over.encode().is_err());
    }
}
