// my take on https://www.gnu.org/software/grub/manual/multiboot2/multiboot.html#Boot-information-format
// walked before anything else in the kernel exists, so no heap and nothing to recover with

use log::trace;
use thiserror::Error;

use self::{
    cursor::{TagCursor, TagStep},
    dispatch::{DefaultHandler, DispatchOutcome, Dispatcher, TagHandler},
    tags::TagKind,
    validator::ValidatedBase,
};

pub mod cursor;
pub mod dispatch;
pub mod firmware;
pub mod framebuffer;
pub mod loader;
pub mod memory;
pub mod payload;
pub mod tags;
pub mod validator;

#[cfg(test)]
mod test_blob;

pub use dispatch::{LogHandler, Tag};
pub use validator::{validate, validate_bytes, validate_info_header, MULTIBOOT2_BOOTLOADER_MAGIC};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    #[error("boot loader magic {found:#x} is not 0x36d76289")]
    InvalidMagic { found: u32 },
    #[error("boot information address is null")]
    NullBase,
    #[error("tag at offset {offset:#x} declares size {size}, smaller than its header")]
    MalformedTagSize { offset: usize, size: u32 },
    #[error("tag at offset {offset:#x} with size {size:#x} does not advance the cursor")]
    NonMonotonicProgress { offset: usize, size: u32 },
    #[error("tag at offset {offset:#x} runs past the end of the address space")]
    AddressOverflow { offset: usize },
    #[error("tag at offset {offset:#x} runs past the end of the boot information ({limit:#x} bytes)")]
    Truncated { offset: usize, limit: usize },
    #[error("boot information declares a total size of {total_size} bytes")]
    MalformedInfoHeader { total_size: u32 },
    #[error("{kind:?} tag has {length} payload bytes, needs at least {required}")]
    PayloadTooShort {
        kind: TagKind,
        length: usize,
        required: usize,
    },
    #[error("{kind:?} tag rejected: {reason}")]
    Rejected { kind: TagKind, reason: &'static str },
}

pub type Result<T> = core::result::Result<T, BootError>;

/// Number of tags processed, the terminator not included.
pub type TagCount = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParseState<'a> {
    Validating(Result<ValidatedBase<'a>>),
    Iterating {
        cursor: TagCursor<'a>,
        count: TagCount,
    },
    Done(TagCount),
    Failed(BootError),
}

/// Validate once, then step and dispatch until the terminator or the first error.
pub struct ParseDriver<'a, 'h, H: TagHandler + ?Sized> {
    state: ParseState<'a>,
    dispatcher: Dispatcher<'h, H>,
}

impl<'a, 'h, H: TagHandler + ?Sized> ParseDriver<'a, 'h, H> {
    /// Takes the outcome of one of the `validate*` functions, so a failed
    /// validation ends the parse before any tag memory is touched.
    pub fn new(validation: Result<ValidatedBase<'a>>, handler: &'h mut H) -> Self {
        Self {
            state: ParseState::Validating(validation),
            dispatcher: Dispatcher::new(handler),
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, ParseState::Done(_) | ParseState::Failed(_))
    }

    /// Moves the state machine forward by one transition.
    pub fn advance(&mut self) {
        let next = match &mut self.state {
            ParseState::Validating(Ok(base)) => {
                trace!("boot information validated at {:#x}", base.address());
                ParseState::Iterating {
                    cursor: base.cursor(),
                    count: 0,
                }
            }
            ParseState::Validating(Err(error)) => ParseState::Failed(*error),
            ParseState::Iterating { cursor, count } => match cursor.step() {
                TagStep::Tag(tag) => {
                    let before = tag.offset;
                    match self.dispatcher.dispatch(tag.kind(), tag.payload) {
                        DispatchOutcome::Rejected(error) => ParseState::Failed(error),
                        _ if tag.kind() == TagKind::End => return,
                        _ => {
                            // the cursor owns advancing, make sure it did
                            if cursor.offset() <= before {
                                ParseState::Failed(BootError::NonMonotonicProgress {
                                    offset: before,
                                    size: tag.header.size,
                                })
                            } else {
                                *count += 1;
                                return;
                            }
                        }
                    }
                }
                TagStep::EndOfList => ParseState::Done(*count),
                TagStep::Error(error) => ParseState::Failed(error),
            },
            ParseState::Done(_) | ParseState::Failed(_) => return,
        };

        trace!("boot information parse: {:?}", next);
        self.state = next;
    }

    pub fn run(mut self) -> Result<TagCount> {
        loop {
            match self.state {
                ParseState::Done(count) => return Ok(count),
                ParseState::Failed(error) => return Err(error),
                _ => self.advance(),
            }
        }
    }
}

/// Walks the tag list at `base_address` with the default handler.
///
/// # Safety
/// `base_address` must point at the first tag, past the fixed
/// `total_size`/`reserved` header, of a tag list ending in a terminator. Only
/// read once `magic` matched.
pub unsafe fn parse_boot_info(magic: u32, base_address: usize) -> Result<TagCount> {
    parse_boot_info_with(magic, base_address, &mut DefaultHandler)
}

/// # Safety
/// Same as [`parse_boot_info`].
pub unsafe fn parse_boot_info_with<H: TagHandler + ?Sized>(
    magic: u32,
    base_address: usize,
    handler: &mut H,
) -> Result<TagCount> {
    ParseDriver::new(validate(magic, base_address), handler).run()
}

/// Walks the boot information as the boot loader hands it over, starting at
/// the fixed header and never reading past the size it declares.
///
/// # Safety
/// See [`validate_info_header`].
pub unsafe fn parse_boot_information<H: TagHandler + ?Sized>(
    magic: u32,
    header_address: usize,
    handler: &mut H,
) -> Result<TagCount> {
    ParseDriver::new(validate_info_header(magic, header_address), handler).run()
}

pub fn parse_boot_bytes<H: TagHandler + ?Sized>(
    magic: u32,
    bytes: &[u8],
    handler: &mut H,
) -> Result<TagCount> {
    ParseDriver::new(validate_bytes(magic, bytes), handler).run()
}
