//! Guild and world chat.

use super::{advise_bytes, advise_in, expect_in, DecodeContext};
use crate::codec::FieldReader;
use crate::error::{Error, Result};
use crate::model::{ChatBody, Comment, RawId, Record};
use crate::stream::Frame;
use tracing::warn;

const BODY_AT: usize = 53;

const KNOWN_PLACES: [&[u8]; 2] = [&[0x00, 0x01, 0x00], &[0xff, 0x01, 0x00]];

/// Chat types seen so far
const CHAT_TYPES: [u8; 8] = [0x00, 0x6d, 0x65, 0x66, 0x68, 0x69, 0x6a, 0x6c];

const TEXT: u8 = 0x00;
const EMOTICON: u8 = 0x6d;
const NOTICES_WITH_ACTOR: [u8; 2] = [0x68, 0x6c];

/// `bb0b00`: one chat line.
///
/// The body length at offset 51 must account for every byte after the
/// fixed header.
pub fn decode_chat(frame: &Frame, ctx: &DecodeContext) -> Result<Vec<Record>> {
    let payload = frame.payload();
    let reader = FieldReader::new(payload);

    let body_len = usize::from(reader.u16(51)?);
    if payload.len() != BODY_AT + body_len {
        return Err(Error::unexpected(
            "body length",
            51,
            format!("declares {} bytes, {} follow", body_len, payload.len().saturating_sub(BODY_AT)),
        ));
    }

    advise_bytes(&reader, "chat place", 0..3, &KNOWN_PLACES)?;
    ctx.soft_zero(&reader, "chat padding", 7..11)?;
    ctx.soft_zero(&reader, "chat padding", 15..19)?;
    ctx.soft_zero(&reader, "chat padding", 22..27)?;

    let chat_type = expect_in("chat type", 28, reader.u8(28)?, &CHAT_TYPES)?;
    let unk1 = reader.u8(44)?;
    advise_in("chat unk1", 44, &unk1, &[0x01, 0x02, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f]);
    let color = reader.u8(48)?;
    advise_in("chat color", 48, &color, &[0x00, 0x03, 0x04, 0x05, 0x09]);
    let title = reader.u8(49)?;
    if title > 0x14 {
        warn!("Unexpected chat title at offset 49: {:#04x}", title);
    }
    let unk2 = reader.u8(50)?;
    advise_in("chat unk2", 50, &unk2, &[0x00, 0x05]);

    let body = match chat_type {
        TEXT => ChatBody::Text(reader.text("chat body", BODY_AT, body_len)?),
        EMOTICON => ChatBody::Emoticon(hex::encode(reader.bytes(BODY_AT, body_len)?)),
        t if NOTICES_WITH_ACTOR.contains(&t) => ChatBody::Notice {
            actor: Some(reader.text("notice actor", BODY_AT, body_len)?),
        },
        _ if body_len != 0 => {
            return Err(Error::unexpected(
                "body length",
                51,
                format!("type {:#04x} carries no body, found {} bytes", chat_type, body_len),
            ))
        }
        _ => ChatBody::Notice { actor: None },
    };

    Ok(vec![Comment {
        chat_place: RawId(reader.raw(0)?),
        time: reader.u32(3)?,
        iggid: reader.u32(11)?,
        comment_count: reader.uint(19, 3)? as u32,
        chat_type,
        player: reader.text("player", 31, 13)?,
        unk1,
        guild_tag: reader.text("guild tag", 45, 3)?,
        color,
        title,
        unk2,
        body,
    }
    .into()])
}
