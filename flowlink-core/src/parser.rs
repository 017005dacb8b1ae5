//! FlowParser: frame detection, validation and dispatch
//!
//! One call to [`process`] makes at most one step over the Rx buffer:
//!
//! - `AwaitingTag`: fewer than four bytes buffered
//! - `AwaitingPayload`: tag known, request payload still arriving
//! - `AwaitingChecksum`: payload complete, checksum still arriving
//! - then the frame is taken out of Rx, validated and dispatched, or
//!   discarded
//!
//! Nothing is consumed while a frame is incomplete. An unknown tag drops a
//! single byte so the next byte boundary is tried; a checksum mismatch
//! drops the whole frame. Callers loop until [`Outcome::Incomplete`].
//!
//! Rx is only touched while the frame is located and copied out, so a
//! [`Channel`](crate::Channel) holds its Rx lock for that short span and
//! never across checksum validation or the handler.

use flowlink_protocol::{
    encode_frame, seal_frame, verify_frame, Command, CommandTable, ErrorReply, Reply, Tag,
    CRC_LEN, TAG_LEN,
};

use crate::buffer::RingBuffer;
use crate::config::LinkConfig;

/// Byte sent back for a zero-byte sync request
const SYNC_REPLY: u8 = 0x00;

/// What an incomplete frame is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseState {
    AwaitingTag,
    AwaitingPayload,
    AwaitingChecksum,
}

/// Why input was thrown away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Discard {
    /// First buffered bytes are not a known tag; one byte was dropped
    UnknownTag,
    /// Whole frame dropped, checksum did not match
    ChecksumMismatch,
}

/// Fate of the reply produced by one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Response {
    /// This many bytes were appended to Tx
    Queued(usize),
    /// No reply is due
    Silent,
    /// A reply was due but Tx had no room for all of it
    Dropped,
}

/// Result of one parser step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// No complete frame buffered; nothing consumed
    Incomplete(ParseState),
    /// A valid frame was dispatched to its handler
    Processed { tag: Tag, response: Response },
    /// Input was dropped as a framing error
    Discarded { reason: Discard, response: Response },
    /// A zero-byte sync request was answered
    Synced { response: Response },
}

impl Outcome {
    /// Whether the step consumed input, i.e. another step may make progress
    pub const fn progressed(&self) -> bool {
        !matches!(self, Outcome::Incomplete(_))
    }
}

/// What was taken out of Rx
pub(crate) enum Take<'t, C> {
    Incomplete(ParseState),
    ZeroSync,
    UnknownTag,
    /// `len` bytes of a complete frame were copied into the scratch buffer
    Frame { command: &'t Command<C>, len: usize },
}

/// Locate the next frame in `rx` and move it into `frame`
///
/// `frame` must be at least as long as `rx`'s capacity.
pub(crate) fn take_frame<'t, C, const N: usize>(
    rx: &mut RingBuffer<N>,
    table: &CommandTable<'t, C>,
    config: &LinkConfig,
    frame: &mut [u8],
) -> Take<'t, C> {
    if config.zero_sync && rx.peek_byte() == Some(0x00) {
        rx.discard(1);
        return Take::ZeroSync;
    }

    let mut tag = [0u8; TAG_LEN];
    if !rx.peek_span(&mut tag) {
        return Take::Incomplete(ParseState::AwaitingTag);
    }

    let Some(command) = table.lookup(&Tag::new(tag)) else {
        rx.discard(1);
        return Take::UnknownTag;
    };

    let len = command.request_frame_len(config.checksum);
    if rx.len() < TAG_LEN + command.request_len {
        return Take::Incomplete(ParseState::AwaitingPayload);
    }
    if rx.len() < len {
        return Take::Incomplete(ParseState::AwaitingChecksum);
    }

    // len <= rx.len() <= N <= frame.len()
    rx.get_span(&mut frame[..len]);
    Take::Frame { command, len }
}

/// Run one step with caller-provided Rx and Tx access
///
/// `take` gets a scratch buffer of `N` bytes; `enqueue` must append all of
/// the given bytes to Tx or none of them.
pub(crate) fn step<'t, C: 't, const N: usize>(
    config: &LinkConfig,
    ctx: &mut C,
    take: impl FnOnce(&mut [u8]) -> Take<'t, C>,
    mut enqueue: impl FnMut(&[u8]) -> bool,
) -> Outcome {
    let mut frame = [0u8; N];

    match take(&mut frame) {
        Take::Incomplete(state) => Outcome::Incomplete(state),
        Take::ZeroSync => Outcome::Synced {
            response: send(&mut enqueue, &[SYNC_REPLY]),
        },
        Take::UnknownTag => Outcome::Discarded {
            reason: Discard::UnknownTag,
            response: error_reply(config, ErrorReply::Command, &mut enqueue),
        },
        Take::Frame { command, len } => match verify_frame(&frame[..len], config.checksum) {
            Ok((tag, payload)) => Outcome::Processed {
                tag,
                response: dispatch::<C, N>(command, payload, config, ctx, &mut enqueue),
            },
            Err(_) => Outcome::Discarded {
                reason: Discard::ChecksumMismatch,
                response: error_reply(config, ErrorReply::Data, &mut enqueue),
            },
        },
    }
}

/// Call the handler and queue its reply
fn dispatch<C, const N: usize>(
    command: &Command<C>,
    payload: &[u8],
    config: &LinkConfig,
    ctx: &mut C,
    enqueue: &mut impl FnMut(&[u8]) -> bool,
) -> Response {
    let mut reply = [0u8; N];
    let Some(response) = reply.get_mut(TAG_LEN..TAG_LEN + command.response_len) else {
        return Response::Dropped;
    };

    let sealed = match (command.handler)(ctx, payload, response) {
        Reply::Respond => seal_frame(command.tag, command.response_len, config.checksum, &mut reply),
        Reply::Reject(kind) => encode_frame(kind.tag(), &[], config.checksum, &mut reply),
        Reply::Silent => return Response::Silent,
    };

    match sealed {
        Ok(len) => send(enqueue, &reply[..len]),
        Err(_) => Response::Dropped,
    }
}

fn error_reply(
    config: &LinkConfig,
    kind: ErrorReply,
    enqueue: &mut impl FnMut(&[u8]) -> bool,
) -> Response {
    if !config.error_replies {
        return Response::Silent;
    }
    let mut reply = [0u8; TAG_LEN + CRC_LEN];
    match encode_frame(kind.tag(), &[], config.checksum, &mut reply) {
        Ok(len) => send(enqueue, &reply[..len]),
        Err(_) => Response::Dropped,
    }
}

fn send(enqueue: &mut impl FnMut(&[u8]) -> bool, bytes: &[u8]) -> Response {
    if enqueue(bytes) {
        Response::Queued(bytes.len())
    } else {
        Response::Dropped
    }
}

/// Make one parser step over a plain Rx/Tx buffer pair
///
/// For a single execution context that owns both buffers. Every request
/// and response frame of `table` must fit in `N` bytes.
pub fn process<C, const N: usize>(
    rx: &mut RingBuffer<N>,
    tx: &mut RingBuffer<N>,
    table: &CommandTable<'_, C>,
    config: &LinkConfig,
    ctx: &mut C,
) -> Outcome {
    step::<C, N>(
        config,
        ctx,
        |frame| take_frame(rx, table, config, frame),
        |bytes| tx.put_span(bytes),
    )
}
