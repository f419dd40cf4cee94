//! End-to-end decoding of captured byte streams.

use hex_literal::hex;
use lmwire_core::catalog::Entry;
use lmwire_core::dispatch::{GIFT_BATCH, GUILD_ROSTER};
use lmwire_core::model::MapPayload;
use lmwire_core::{
    CatalogKind, DecoderConfig, DecoratedRecord, Dispatch, Flow, FrameOutcome, Interest,
    MemoryCatalog, NullCatalog, Opcode, Record,
};
use pretty_assertions::assert_eq;

// one gift from Alice: a10b chest holding 3 x 3c0c
const GIFT_BATCH_FRAME: [u8; 48] = hex!(
    "3000370b000000000000000000000107000000018000596200000000a10b3c0c030002416c6963650000000000000000"
);

// roster page with a single R4 member
const ROSTER_FRAME: [u8; 55] = hex!(
    "3700060b00000187d61200000000001100416c69636500000000000000000480f0fa02000000009426000000000000c042686200000000"
);

// level 3 monster 2c00 on tile 250314
const MONSTER_RECORD: [u8; 49] = hex!(
    "2503140a032c00100e00000000974200000000000000000000000000000000000000000000000000000000000000000000"
);

fn replay(flow: &mut Flow, chunks: &[&[u8]]) -> Vec<FrameOutcome> {
    let mut outcomes = Vec::new();
    for (i, chunk) in chunks.iter().enumerate() {
        flow.feed(chunk, 1_651_000_000 + i as u64, |o| outcomes.push(o));
    }
    outcomes
}

fn records(outcomes: Vec<FrameOutcome>) -> Vec<Record> {
    outcomes
        .into_iter()
        .flat_map(|o| match o.result {
            Ok(Dispatch::Records(records)) => records,
            other => panic!("unexpected outcome {:?}", other),
        })
        .collect()
}

#[test]
fn gift_batch_split_across_chunks() {
    let mut flow = Flow::default();
    let (head, tail) = GIFT_BATCH_FRAME.split_at(20);
    let outcomes = replay(&mut flow, &[head, tail]);

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].opcode, GIFT_BATCH);
    assert_eq!(outcomes[0].timestamp, 1_651_000_001);

    let records = records(outcomes);
    let [Record::Gift(gift)] = &records[..] else {
        panic!("expected one gift, got {:?}", records);
    };
    assert_eq!(gift.sort_index, 7);
    assert_eq!(gift.time, 1_650_000_000);
    assert_eq!(gift.number_of_item, 3);
    assert_eq!(gift.player, "Alice");
    assert_eq!(gift.opened_at, 1_651_000_001);
}

#[test]
fn gift_is_decorated_from_catalog() {
    let mut catalog = MemoryCatalog::new();
    catalog.insert(
        CatalogKind::Items,
        "a10b",
        Entry {
            gift_rank: Some(3),
            monster: "Hellity".into(),
            ..Entry::named("Gold Chest")
        },
    );
    catalog.insert(CatalogKind::Items, "3c0c", Entry::named("Speed Up"));

    let mut flow = Flow::default();
    let records = records(replay(&mut flow, &[&GIFT_BATCH_FRAME]));
    let DecoratedRecord::Gift(gift) = records[0].clone().decorate(&catalog) else {
        panic!("expected a gift");
    };
    assert_eq!(gift.labels.gift_name.as_deref(), Some("Gold Chest"));
    assert_eq!(gift.labels.gift_rank, Some(3));
    assert_eq!(gift.labels.monster.as_deref(), Some("Hellity"));
    assert_eq!(gift.labels.item_name.as_deref(), Some("Speed Up"));

    let json = serde_json::to_value(records[0].clone().decorate(&NullCatalog)).unwrap();
    assert_eq!(json["type"], "gift");
    assert_eq!(json["player"], "Alice");
    assert!(json["labels"]["gift_name"].is_null());
}

#[test]
fn roster_after_unknown_frame() {
    let mut stream = vec![0x08, 0x00, 0x99, 0x99, 0x99, 0x01, 0x02, 0x03];
    stream.extend_from_slice(&ROSTER_FRAME);

    let mut flow = Flow::default();
    let outcomes = replay(&mut flow, &[&stream]);
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].opcode, GUILD_ROSTER);

    let records = records(outcomes);
    let [Record::Player(player)] = &records[..] else {
        panic!("expected one player, got {:?}", records);
    };
    assert_eq!(player.iggid, 1_234_567);
    assert_eq!(player.avatar_id, 17);
    assert_eq!(player.name, "Alice");
    assert_eq!(player.guild_rank, 4);
    assert_eq!(player.might, 50_000_000);
    assert_eq!(player.kills, 9_876);
    assert_eq!(player.lastseen, 1_651_000_000);

    let stats = flow.stats();
    assert_eq!(stats.filtered, 1);
    assert_eq!(stats.decoded, 1);
    assert_eq!(stats.framer.frames, 2);
}

#[test]
fn corrupt_header_resyncs_to_gift_batch() {
    let mut stream = vec![0x00, 0x00, 0xde, 0xad, 0xbe, 0xef];
    stream.extend_from_slice(&GIFT_BATCH_FRAME);

    let mut flow = Flow::new(DecoderConfig::new().interest(Interest::new().code(GIFT_BATCH)));
    let records = records(replay(&mut flow, &[&stream]));
    assert_eq!(records.len(), 1);
    assert_eq!(flow.stats().framer.resyncs, 1);
    assert_eq!(flow.stats().framer.bytes_dropped, 6);
}

#[test]
fn map_frame_is_rescanned_after_noise() {
    let opcode: Opcode = "ac080f".parse().unwrap();
    let mut payload = vec![0xee, 0xee];
    payload.extend_from_slice(&MONSTER_RECORD);
    payload.extend_from_slice(&MONSTER_RECORD);
    let mut frame = ((5 + payload.len()) as u16).to_le_bytes().to_vec();
    frame.extend_from_slice(opcode.as_bytes());
    frame.extend_from_slice(&payload);

    let mut flow = Flow::default();
    let records = records(replay(&mut flow, &[&frame]));
    assert_eq!(records.len(), 2);
    for record in &records {
        let Record::MapObject(object) = record else {
            panic!("expected a map object, got {:?}", record);
        };
        assert_eq!((object.coord.x, object.coord.y), (169, 0x321));
        assert!(matches!(&object.payload, MapPayload::Monster(m) if m.level == 3));
    }
}

#[test]
fn min_frame_len_applies_before_dispatch() {
    let mut flow = Flow::new(DecoderConfig::new().min_frame_len(50));
    let outcomes = replay(&mut flow, &[&GIFT_BATCH_FRAME, &ROSTER_FRAME]);

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].opcode, GUILD_ROSTER);
    assert_eq!(flow.stats().skipped, 1);
}
