use serenity::builder::CreateMessage;
use serenity::http::Http;
use serenity::model::id::{ChannelId, MessageId};

/// Maximum characters per Discord message (2000 is the limit; we use 1950 for safety).
const CHUNK_MAX: usize = 1950;

/// Split `text` into chunks of at most [`CHUNK_MAX`] bytes, preferring
/// splits on newline/space boundaries and never cutting a UTF-8 character.
pub fn split_chunks(text: &str) -> Vec<String> {
    if text.len() <= CHUNK_MAX {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.len() > CHUNK_MAX {
        let mut end = CHUNK_MAX;
        while !remaining.is_char_boundary(end) {
            end -= 1;
        }

        // Prefer the last newline in the window, then the last space. Only
        // that one separator is dropped; indentation after it survives.
        let window = &remaining[..end];
        let separator = window
            .rfind('\n')
            .filter(|&i| i > 0)
            .or_else(|| window.rfind(' ').filter(|&i| i > 0));
        let (split_at, resume_at) = match separator {
            Some(i) => (i, i + 1),
            None => (end, end),
        };

        push_chunk(&mut chunks, &remaining[..split_at]);
        remaining = &remaining[resume_at..];
    }

    push_chunk(&mut chunks, remaining);
    chunks
}

/// Discord rejects blank messages, so whitespace-only pieces are dropped.
fn push_chunk(chunks: &mut Vec<String>, piece: &str) {
    if !piece.trim().is_empty() {
        chunks.push(piece.to_string());
    }
}

/// Send `text` to `channel_id` in ≤1950-byte chunks. The first chunk is a
/// reply to `reply_to`.
pub async fn send_response(
    http: &Http,
    channel_id: ChannelId,
    text: &str,
    reply_to: MessageId,
) -> Result<(), serenity::Error> {
    for (i, chunk) in split_chunks(text).into_iter().enumerate() {
        let mut msg = CreateMessage::new().content(chunk);
        if i == 0 {
            msg = msg.reference_message((channel_id, reply_to));
        }
        channel_id.send_message(http, msg).await?;
    }
    Ok(())
}
