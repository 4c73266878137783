use core::{iter::FusedIterator, slice};

use log::{trace, warn};

use super::{
    payload::PayloadView,
    tags::{next_tag_offset, RawTag, TagHeader, TagKind, TAG_ALIGN, TAG_HEADER_SIZE},
    validator::ValidatedBase,
    BootError, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagStep<'a> {
    /// A tag, the terminator included. The cursor already points past it.
    Tag(RawTag<'a>),
    /// The terminator was returned by an earlier step.
    EndOfList,
    Error(BootError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    Active,
    Finished,
    Failed(BootError),
}

/// Forward only walk over the tags behind a [`ValidatedBase`].
///
/// The only state is an offset from the base, so restarting means asking
/// the base for a new cursor. Once the terminator or an error is hit the
/// cursor keeps reporting that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCursor<'a> {
    base: ValidatedBase<'a>,
    offset: usize,
    state: CursorState,
}

impl<'a> TagCursor<'a> {
    pub(super) fn new(base: ValidatedBase<'a>) -> Self {
        Self {
            base,
            offset: 0,
            state: CursorState::Active,
        }
    }

    /// Offset of the next tag to read.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn step(&mut self) -> TagStep<'a> {
        match self.state {
            CursorState::Finished => return TagStep::EndOfList,
            CursorState::Failed(error) => return TagStep::Error(error),
            CursorState::Active => {}
        }

        match self.read_tag() {
            Ok((tag, next_offset)) => {
                trace!(
                    "tag {:?} at offset {:#x}, {} bytes",
                    tag.kind(),
                    tag.offset,
                    tag.header.size
                );

                if tag.kind() == TagKind::End {
                    if tag.header.size as usize != TAG_HEADER_SIZE {
                        warn!("terminator tag declares size {}", tag.header.size);
                    }
                    self.state = CursorState::Finished;
                } else {
                    self.offset = next_offset;
                }

                TagStep::Tag(tag)
            }
            Err(error) => {
                self.state = CursorState::Failed(error);
                TagStep::Error(error)
            }
        }
    }

    fn read_tag(&self) -> Result<(RawTag<'a>, usize)> {
        let offset = self.offset;
        debug_assert_eq!(offset % TAG_ALIGN, 0);

        let header_end = offset
            .checked_add(TAG_HEADER_SIZE)
            .ok_or(BootError::AddressOverflow { offset })?;
        self.check_bounds(offset, header_end)?;

        // bounds checked above, validation vouches for the memory itself
        let header = TagHeader::from_bytes(unsafe {
            (self.base.as_ptr().add(offset) as *const [u8; TAG_HEADER_SIZE]).read_unaligned()
        });

        // nothing behind the terminator is read, whatever size it declares
        if header.kind() == TagKind::End {
            let tag = RawTag {
                offset,
                header,
                payload: PayloadView::empty(),
            };
            return Ok((tag, header_end));
        }

        let payload_size = header.payload_size().ok_or(BootError::MalformedTagSize {
            offset,
            size: header.size,
        })?;
        let next_offset = next_tag_offset(self.base.address(), offset, header.size)?;

        let tag_end = header_end
            .checked_add(payload_size)
            .ok_or(BootError::AddressOverflow { offset })?;
        self.check_bounds(offset, tag_end)?;

        let payload =
            unsafe { slice::from_raw_parts(self.base.as_ptr().add(header_end), payload_size) };

        Ok((
            RawTag {
                offset,
                header,
                payload: PayloadView::new(payload),
            },
            next_offset,
        ))
    }

    fn check_bounds(&self, offset: usize, end: usize) -> Result<()> {
        match self.base.limit() {
            Some(limit) if end > limit => Err(BootError::Truncated { offset, limit }),
            Some(_) => Ok(()),
            None => self
                .base
                .address()
                .checked_add(end)
                .map(|_| ())
                .ok_or(BootError::AddressOverflow { offset }),
        }
    }
}

/// Yields every tag before the terminator, or the first error.
impl<'a> Iterator for TagCursor<'a> {
    type Item = Result<RawTag<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if let CursorState::Failed(_) = self.state {
            return None;
        }

        match self.step() {
            TagStep::Tag(tag) if tag.kind() == TagKind::End => None,
            TagStep::Tag(tag) => Some(Ok(tag)),
            TagStep::EndOfList => None,
            TagStep::Error(error) => Some(Err(error)),
        }
    }
}

impl FusedIterator for TagCursor<'_> {}
