//! Command table: tag → (payload lengths, handler).
//!
//! The table is supplied by the application and is read-only once built, so
//! it can be shared between channels without synchronization.

use core::fmt;

use crate::frame::{frame_len, ChecksumScope, ErrorReply, Tag};

/// What the parser should send back after a handler ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reply {
    /// Echo the tag with the response payload the handler wrote
    Respond,
    /// Answer with a bare error tag instead of the response
    Reject(ErrorReply),
    /// Send nothing
    Silent,
}

/// Command handler
///
/// Receives the application context, the request payload, and a zeroed
/// response buffer of exactly the command's response length. Handlers run
/// to completion inside the parser call and must not block. Command-level
/// failures belong in the response payload or in [`Reply::Reject`].
pub type HandlerFn<C> = fn(&mut C, &[u8], &mut [u8]) -> Reply;

/// One entry of the command table
pub struct Command<C> {
    /// Identifier at the start of request and response frames
    pub tag: Tag,
    /// Request payload length in bytes
    pub request_len: usize,
    /// Response payload length in bytes
    pub response_len: usize,
    pub handler: HandlerFn<C>,
}

impl<C> Command<C> {
    pub const fn new(
        tag: Tag,
        request_len: usize,
        response_len: usize,
        handler: HandlerFn<C>,
    ) -> Self {
        Self {
            tag,
            request_len,
            response_len,
            handler,
        }
    }

    /// Length of the request frame on the wire
    pub const fn request_frame_len(&self, scope: ChecksumScope) -> usize {
        frame_len(self.request_len, scope)
    }

    /// Length of the response frame on the wire
    pub const fn response_frame_len(&self, scope: ChecksumScope) -> usize {
        frame_len(self.response_len, scope)
    }
}

// Manual impls: a derive would require `C: Clone`
impl<C> Clone for Command<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Command<C> {}

impl<C> fmt::Debug for Command<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("tag", &self.tag)
            .field("request_len", &self.request_len)
            .field("response_len", &self.response_len)
            .finish()
    }
}

/// Errors detected while building a command table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TableError {
    /// Two commands share a tag
    DuplicateTag(Tag),
    /// Tag collides with `errc`, `errd` or `errv`
    ReservedTag(Tag),
    /// Tag starts with `0x00`, which is kept free for zero-byte sync
    ZeroLeadingTag(Tag),
}

/// Validated, immutable command table
pub struct CommandTable<'a, C> {
    commands: &'a [Command<C>],
}

impl<C> Clone for CommandTable<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for CommandTable<'_, C> {}

impl<C> fmt::Debug for CommandTable<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.commands.iter()).finish()
    }
}

impl<'a, C> CommandTable<'a, C> {
    /// Validate `commands` and wrap them
    pub fn new(commands: &'a [Command<C>]) -> Result<Self, TableError> {
        for (i, command) in commands.iter().enumerate() {
            let tag = command.tag;
            if tag.as_bytes()[0] == 0x00 {
                return Err(TableError::ZeroLeadingTag(tag));
            }
            if tag.is_error_reply() {
                return Err(TableError::ReservedTag(tag));
            }
            if commands[..i].iter().any(|other| other.tag == tag) {
                return Err(TableError::DuplicateTag(tag));
            }
        }

        Ok(Self { commands })
    }

    /// Find the command for `tag`
    pub fn lookup(&self, tag: &Tag) -> Option<&'a Command<C>> {
        self.commands.iter().find(|command| command.tag == *tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Command<C>> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Longest request or response frame any command can produce
    ///
    /// Error replies (bare tags) are included.
    pub fn max_frame_len(&self, scope: ChecksumScope) -> usize {
        self.commands
            .iter()
            .map(|c| c.request_frame_len(scope).max(c.response_frame_len(scope)))
            .fold(frame_len(0, scope), usize::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nop(_: &mut u32, _: &[u8], _: &mut [u8]) -> Reply {
        Reply::Respond
    }

    fn count(calls: &mut u32, _: &[u8], _: &mut [u8]) -> Reply {
        *calls += 1;
        Reply::Silent
    }

    const COMMANDS: [Command<u32>; 3] = [
        Command::new(Tag::from_ascii(b"gpos"), 0, 20, nop),
        Command::new(Tag::from_ascii(b"movr"), 12, 0, nop),
        Command::new(Tag::from_ascii(b"stop"), 0, 0, count),
    ];

    #[test]
    fn test_lookup() {
        let table = CommandTable::new(&COMMANDS).unwrap();
        let command = table.lookup(&Tag::from_ascii(b"movr")).unwrap();
        assert_eq!(command.request_len, 12);
        assert!(table.lookup(&Tag::from_ascii(b"xxxx")).is_none());
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_handler_is_called_through_table() {
        let table = CommandTable::new(&COMMANDS).unwrap();
        let command = table.lookup(&Tag::from_ascii(b"stop")).unwrap();
        let mut calls = 0;
        assert_eq!((command.handler)(&mut calls, &[], &mut []), Reply::Silent);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_max_frame_len() {
        let table = CommandTable::new(&COMMANDS).unwrap();
        // gpos response: 4 + 20 + 2
        assert_eq!(table.max_frame_len(ChecksumScope::TagAndPayload), 26);

        let empty: CommandTable<'_, u32> = CommandTable::new(&[]).unwrap();
        assert_eq!(empty.max_frame_len(ChecksumScope::PayloadOnly), 4);
    }

    #[test]
    fn test_rejects_duplicate_tag() {
        let commands = [
            Command::new(Tag::from_ascii(b"gpos"), 0, 4, nop),
            Command::new(Tag::from_ascii(b"gpos"), 4, 0, nop),
        ];
        assert_eq!(
            CommandTable::new(&commands).err(),
            Some(TableError::DuplicateTag(Tag::from_ascii(b"gpos")))
        );
    }

    #[test]
    fn test_rejects_reserved_and_zero_tags() {
        let reserved = [Command::new(Tag::ERRV, 0, 0, nop)];
        assert_eq!(
            CommandTable::new(&reserved).err(),
            Some(TableError::ReservedTag(Tag::ERRV))
        );

        let zero = [Command::new(Tag::new([0, b'a', b'b', b'c']), 0, 0, nop)];
        assert!(matches!(
            CommandTable::new(&zero),
            Err(TableError::ZeroLeadingTag(_))
        ));
    }
}
