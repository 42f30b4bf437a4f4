//! Decoder for the binary stall list feed.
//!
//! The feed is an 8-byte header followed by fixed 930-byte stall chunks:
//!
//! | Offset | Size | Field                                   |
//! |--------|------|-----------------------------------------|
//! | 0      | 4    | stall number, `i32`, native byte order  |
//! | 4      | 32   | seller name, NUL padded                 |
//! | 36     | 64   | stall description, NUL padded           |
//! | 100    | 1    | kind flag (`1` = sell, otherwise buy)   |
//! | 101    | 32   | location, NUL padded                    |
//! | 138    | 792  | 18 slots of 44 bytes                    |
//!
//! Each slot is `u16` item id (LE), `u32` price (LE), `u8` quantity and 37
//! reserved bytes.
//!
//! The stall number is read in the byte order of the decoding machine, as the
//! feed producer wrote it. Only the slots are pinned to little-endian. The
//! number is not used downstream, so a big-endian host only garbles a field
//! nobody reads.
//!
//! A trailing chunk shorter than 930 bytes marks the end of the stream and is
//! dropped. There is no format version check: a layout change upstream will
//! decode as garbage rather than fail.

use bytes::Buf;

use crate::snapshot::{DaySnapshot, ItemId, Price, Quantity, SlotRecord, StallKind};

pub const HEADER_LEN: usize = 8;
pub const CHUNK_SIZE: usize = 930;
pub const SLOTS_PER_STALL: usize = 18;
pub const SLOT_BASE_OFFSET: usize = 138;
pub const SLOT_SIZE: usize = 44;

const SELLER_LEN: usize = 32;
const DESCRIPTION_LEN: usize = 64;
const LOCATION_LEN: usize = 32;
const SLOT_RESERVED_LEN: usize = 37;

/// One decoded stall chunk with its occupied slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StallRecord {
    pub number: i32,
    pub kind: StallKind,
    pub seller_name: String,
    /// Description text, or the location when the description is blank.
    pub stall_label: String,
    pub slots: Vec<SlotRecord>,
}

/// A sell-side slot flattened with its stall's identity, one per report row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellRow {
    pub item_id: ItemId,
    pub price: Price,
    pub quantity: Quantity,
    pub seller_name: String,
    pub stall_label: String,
}

/// Everything produced from one snapshot buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedSnapshot {
    pub stalls: Vec<StallRecord>,
    pub snapshot: DaySnapshot,
    pub sell_rows: Vec<SellRow>,
}

/// Decodes every complete stall chunk in `bytes`.
pub fn parse_stalls(bytes: &[u8]) -> Vec<StallRecord> {
    let body = bytes.get(HEADER_LEN..).unwrap_or_default();

    body.chunks_exact(CHUNK_SIZE).map(parse_chunk).collect()
}

/// Decodes a snapshot buffer and folds its slots into today's histograms.
///
/// Within one buffer, quantities for the same `(item_id, price)` are summed.
pub fn decode_snapshot(bytes: &[u8]) -> DecodedSnapshot {
    let stalls = parse_stalls(bytes);

    let mut snapshot = DaySnapshot::new();
    let mut sell_rows = Vec::new();

    for stall in &stalls {
        for slot in &stall.slots {
            snapshot.record(stall.kind, slot);

            if stall.kind == StallKind::Sell {
                sell_rows.push(SellRow {
                    item_id: slot.item_id,
                    price: slot.price,
                    quantity: slot.quantity,
                    seller_name: stall.seller_name.clone(),
                    stall_label: stall.stall_label.clone(),
                });
            }
        }
    }

    DecodedSnapshot {
        stalls,
        snapshot,
        sell_rows,
    }
}

fn parse_chunk(chunk: &[u8]) -> StallRecord {
    let mut info = chunk;

    let number = info.get_i32_ne();
    let seller_name = take_text(&mut info, SELLER_LEN);
    let description = take_text(&mut info, DESCRIPTION_LEN);
    let kind = StallKind::from_flag(info.get_u8());
    let location = take_text(&mut info, LOCATION_LEN);

    let stall_label = if description.is_empty() {
        location
    } else {
        description
    };

    let slots = chunk[SLOT_BASE_OFFSET..]
        .chunks_exact(SLOT_SIZE)
        .take(SLOTS_PER_STALL)
        .filter_map(parse_slot)
        .collect();

    StallRecord {
        number,
        kind,
        seller_name,
        stall_label,
        slots,
    }
}

/// Returns `None` for an empty slot (item id 0).
fn parse_slot(mut raw: &[u8]) -> Option<SlotRecord> {
    let item_id = raw.get_u16_le();
    let price = raw.get_u32_le();
    let quantity = raw.get_u8();
    raw.advance(SLOT_RESERVED_LEN);

    if item_id == 0 {
        return None;
    }

    Some(SlotRecord {
        item_id: ItemId::from(item_id),
        price,
        quantity: Quantity::from(quantity),
    })
}

fn take_text(buf: &mut &[u8], len: usize) -> String {
    let text = clean_text(&buf[..len]);
    buf.advance(len);
    text
}

/// Cuts at the first NUL, drops invalid UTF-8 sequences and trims whitespace.
fn clean_text(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());

    let mut text = String::with_capacity(end);
    for chunk in field[..end].utf8_chunks() {
        text.push_str(chunk.valid());
    }

    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestStall<'a> {
        number: i32,
        seller: &'a [u8],
        description: &'a [u8],
        flag: u8,
        location: &'a [u8],
        slots: &'a [(u16, u32, u8)],
    }

    fn encode_chunk(stall: &TestStall) -> Vec<u8> {
        let mut chunk = vec![0u8; CHUNK_SIZE];
        chunk[0..4].copy_from_slice(&stall.number.to_ne_bytes());
        chunk[4..4 + stall.seller.len()].copy_from_slice(stall.seller);
        chunk[36..36 + stall.description.len()].copy_from_slice(stall.description);
        chunk[100] = stall.flag;
        chunk[101..101 + stall.location.len()].copy_from_slice(stall.location);

        for (i, (item_id, price, quantity)) in stall.slots.iter().enumerate() {
            let off = SLOT_BASE_OFFSET + SLOT_SIZE * i;
            chunk[off..off + 2].copy_from_slice(&item_id.to_le_bytes());
            chunk[off + 2..off + 6].copy_from_slice(&price.to_le_bytes());
            chunk[off + 6] = *quantity;
            // reserved bytes are noise the decoder must ignore
            chunk[off + 7..off + SLOT_SIZE].fill(0xAB);
        }

        chunk
    }

    fn encode_feed(stalls: &[TestStall]) -> Vec<u8> {
        let mut bytes = vec![0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00];
        for stall in stalls {
            bytes.extend(encode_chunk(stall));
        }
        bytes
    }

    fn sell_stall<'a>(slots: &'a [(u16, u32, u8)]) -> TestStall<'a> {
        TestStall {
            number: 1,
            seller: b"Alice",
            description: b"Cheap potions",
            flag: 1,
            location: b"Argent City",
            slots,
        }
    }

    #[test]
    fn test_parse_empty_bytes() {
        assert!(parse_stalls(&[]).is_empty());
        assert!(parse_stalls(&[0u8; 3]).is_empty());
        assert!(decode_snapshot(&[]).snapshot.is_empty());
    }

    #[test]
    fn test_header_only() {
        assert!(parse_stalls(&[0u8; HEADER_LEN]).is_empty());
    }

    #[test]
    fn test_single_stall_fields() {
        let bytes = encode_feed(&[TestStall {
            number: -42,
            seller: b"  Alice  ",
            description: b"Cheap potions",
            flag: 1,
            location: b"Argent City",
            slots: &[(1847, 3_500, 99), (0, 10, 10), (12, 70_000, 1)],
        }]);

        let stalls = parse_stalls(&bytes);
        assert_eq!(stalls.len(), 1);

        let stall = &stalls[0];
        assert_eq!(stall.number, -42);
        assert_eq!(stall.kind, StallKind::Sell);
        assert_eq!(stall.seller_name, "Alice");
        assert_eq!(stall.stall_label, "Cheap potions");
        assert_eq!(
            stall.slots,
            vec![
                SlotRecord {
                    item_id: 1847,
                    price: 3_500,
                    quantity: 99
                },
                SlotRecord {
                    item_id: 12,
                    price: 70_000,
                    quantity: 1
                },
            ]
        );
    }

    #[test]
    fn test_label_falls_back_to_location() {
        let bytes = encode_feed(&[TestStall {
            number: 2,
            seller: b"Bob",
            description: b"   ",
            flag: 0,
            location: b"Shaitan City",
            slots: &[],
        }]);

        let stall = &parse_stalls(&bytes)[0];
        assert_eq!(stall.kind, StallKind::Buy);
        assert_eq!(stall.stall_label, "Shaitan City");
    }

    #[test]
    fn test_text_stops_at_nul_and_drops_invalid_utf8() {
        assert_eq!(clean_text(b"Ann\0garbage"), "Ann");
        assert_eq!(clean_text(b"A\xFFnn "), "Ann");
        assert_eq!(clean_text("Mañana".as_bytes()), "Mañana");
        assert_eq!(clean_text(b"\0\0\0"), "");
    }

    #[test]
    fn test_last_slot_is_read() {
        let mut slots = vec![(0u16, 0u32, 0u8); SLOTS_PER_STALL];
        slots[SLOTS_PER_STALL - 1] = (500, 1_234_567, 255);
        let bytes = encode_feed(&[sell_stall(&slots)]);

        let stall = &parse_stalls(&bytes)[0];
        assert_eq!(stall.slots.len(), 1);
        assert_eq!(stall.slots[0].item_id, 500);
        assert_eq!(stall.slots[0].price, 1_234_567);
        assert_eq!(stall.slots[0].quantity, 255);
    }

    #[test]
    fn test_decode_sums_within_one_pass() {
        let bytes = encode_feed(&[
            sell_stall(&[(7, 100, 3)]),
            sell_stall(&[(7, 100, 4), (7, 90, 1)]),
        ]);

        let decoded = decode_snapshot(&bytes);
        assert_eq!(decoded.snapshot.sell[&7][&100], 7);
        assert_eq!(decoded.snapshot.sell[&7][&90], 1);
        assert_eq!(decoded.sell_rows.len(), 3);
    }

    #[test]
    fn test_buy_slots_are_not_sell_rows() {
        let bytes = encode_feed(&[TestStall {
            number: 3,
            seller: b"Carol",
            description: b"Buying ore",
            flag: 0,
            location: b"",
            slots: &[(44, 15, 20)],
        }]);

        let decoded = decode_snapshot(&bytes);
        assert!(decoded.sell_rows.is_empty());
        assert_eq!(decoded.snapshot.buy[&44][&15], 20);
        assert!(decoded.snapshot.sell.is_empty());
    }

    #[test]
    fn test_sell_rows_carry_stall_identity() {
        let bytes = encode_feed(&[sell_stall(&[(7, 100, 3)])]);

        let rows = decode_snapshot(&bytes).sell_rows;
        assert_eq!(
            rows,
            vec![SellRow {
                item_id: 7,
                price: 100,
                quantity: 3,
                seller_name: "Alice".to_string(),
                stall_label: "Cheap potions".to_string(),
            }]
        );
    }

    #[test]
    fn test_chunk_boundary() {
        let stalls: Vec<_> = (0..3).map(|_| sell_stall(&[(7, 100, 1)])).collect();
        let exact = encode_feed(&stalls);
        assert_eq!(exact.len(), HEADER_LEN + CHUNK_SIZE * 3);
        assert_eq!(parse_stalls(&exact).len(), 3);

        for extra in [1, 137, CHUNK_SIZE - 1] {
            let mut padded = exact.clone();
            padded.extend(std::iter::repeat_n(0x11, extra));
            assert_eq!(parse_stalls(&padded).len(), 3, "extra = {extra}");
        }
    }

    #[test]
    fn test_decode_is_deterministic() {
        let bytes = encode_feed(&[
            sell_stall(&[(7, 100, 3), (8, 5, 2)]),
            TestStall {
                number: 9,
                seller: b"Dan",
                description: b"",
                flag: 0,
                location: b"Icicle",
                slots: &[(8, 4, 1)],
            },
        ]);

        assert_eq!(decode_snapshot(&bytes), decode_snapshot(&bytes));
    }
}
