use core::{marker::PhantomData, ptr::NonNull};

use log::{trace, warn};

use super::{cursor::TagCursor, tags::TAG_HEADER_SIZE, BootError, Result};

/// Value the boot loader leaves in `eax` when it hands over boot information.
pub const MULTIBOOT2_BOOTLOADER_MAGIC: u32 = 0x36D7_6289;
/// `total_size` and `reserved`, in front of the first tag.
pub const INFO_HEADER_SIZE: usize = 8;

/// Start of a tag list whose magic and address were checked.
///
/// Only [`validate`], [`validate_info_header`] and [`validate_bytes`] hand
/// these out, so a cursor can't be built over an unchecked address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedBase<'a> {
    base: NonNull<u8>,
    limit: Option<usize>,
    phantom: PhantomData<&'a [u8]>,
}

impl<'a> ValidatedBase<'a> {
    pub fn address(&self) -> usize {
        self.base.as_ptr() as usize
    }

    /// Length of the tag list when the blob told us, `None` when unbounded.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// A fresh cursor at the first tag, the list can be walked any number of times.
    pub fn cursor(&self) -> TagCursor<'a> {
        TagCursor::new(*self)
    }

    pub(super) fn as_ptr(&self) -> *const u8 {
        self.base.as_ptr()
    }
}

fn check_magic(magic: u32) -> Result<()> {
    if magic != MULTIBOOT2_BOOTLOADER_MAGIC {
        return Err(BootError::InvalidMagic { found: magic });
    }

    Ok(())
}

/// Checks the values the boot loader passed without touching the memory behind `base`.
///
/// `base` is the address of the first tag, the fixed boot information
/// header must already have been skipped by the caller.
///
/// # Safety
/// If this returns `Ok`, `base` must point at a readable tag list ending in a
/// terminator tag that stays valid and unmodified for `'a`.
pub unsafe fn validate<'a>(magic: u32, base: usize) -> Result<ValidatedBase<'a>> {
    check_magic(magic)?;
    let base = NonNull::new(base as *mut u8).ok_or(BootError::NullBase)?;

    Ok(ValidatedBase {
        base,
        limit: None,
        phantom: PhantomData,
    })
}

/// Like [`validate`], but starts at the fixed boot information header and
/// bounds the tag list by the size it declares.
///
/// # Safety
/// If magic and address check out, `header_addr` must point at boot
/// information of `total_size` readable bytes that stay valid for `'a`.
pub unsafe fn validate_info_header<'a>(magic: u32, header_addr: usize) -> Result<ValidatedBase<'a>> {
    check_magic(magic)?;
    let header = NonNull::new(header_addr as *mut u8).ok_or(BootError::NullBase)?;

    /*      +-------------------+
    u32     | total_size        |
    u32     | reserved          |
            +-------------------+ */
    let fields = header.as_ptr() as *const [u8; 4];
    let total_size = u32::from_ne_bytes(fields.read_unaligned());
    let reserved = u32::from_ne_bytes(fields.add(1).read_unaligned());

    if reserved != 0 {
        warn!("boot information reserved field is {:#x}, expected 0", reserved);
    }

    let total_size_bytes = total_size as usize;
    if total_size_bytes < INFO_HEADER_SIZE + TAG_HEADER_SIZE {
        return Err(BootError::MalformedInfoHeader { total_size });
    }

    let first_tag = header_addr
        .checked_add(INFO_HEADER_SIZE)
        .and_then(|addr| NonNull::new(addr as *mut u8))
        .ok_or(BootError::AddressOverflow { offset: 0 })?;

    trace!(
        "boot information at {:#x}, {} bytes",
        header_addr,
        total_size
    );

    Ok(ValidatedBase {
        base: first_tag,
        limit: Some(total_size_bytes - INFO_HEADER_SIZE),
        phantom: PhantomData,
    })
}

/// Validates a tag list that is already available as a slice.
pub fn validate_bytes(magic: u32, bytes: &[u8]) -> Result<ValidatedBase<'_>> {
    check_magic(magic)?;

    Ok(ValidatedBase {
        base: NonNull::from(bytes).cast(),
        limit: Some(bytes.len()),
        phantom: PhantomData,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multiboot::test_blob::BlobBuilder;

    #[test]
    fn wrong_magic_never_looks_at_base() {
        // neither address is dereferenced
        assert_eq!(
            unsafe { validate(0xDEADBEEF, 0x1) },
            Err(BootError::InvalidMagic { found: 0xDEADBEEF })
        );
        assert_eq!(
            unsafe { validate_info_header(0xDEADBEEF, usize::MAX - 3) },
            Err(BootError::InvalidMagic { found: 0xDEADBEEF })
        );
    }

    #[test]
    fn magic_is_checked_before_null() {
        assert_eq!(
            unsafe { validate(0, 0) },
            Err(BootError::InvalidMagic { found: 0 })
        );
    }

    #[test]
    fn null_base_is_rejected() {
        assert_eq!(
            unsafe { validate(MULTIBOOT2_BOOTLOADER_MAGIC, 0) },
            Err(BootError::NullBase)
        );
        assert_eq!(
            unsafe { validate_info_header(MULTIBOOT2_BOOTLOADER_MAGIC, 0) },
            Err(BootError::NullBase)
        );
    }

    #[test]
    fn unbounded_base_keeps_address() {
        let validated = unsafe { validate(MULTIBOOT2_BOOTLOADER_MAGIC, 0x10_0000) }.unwrap();
        assert_eq!(validated.address(), 0x10_0000);
        assert_eq!(validated.limit(), None);
    }

    #[test]
    fn info_header_bounds_the_tag_list() {
        let blob = BlobBuilder::new().basic_memory(639, 130048).end().build_with_info_header();

        let validated =
            unsafe { validate_info_header(MULTIBOOT2_BOOTLOADER_MAGIC, blob.address()) }.unwrap();
        assert_eq!(validated.address(), blob.address() + INFO_HEADER_SIZE);
        assert_eq!(validated.limit(), Some(blob.len() - INFO_HEADER_SIZE));
    }

    #[test]
    fn info_header_too_small_for_a_terminator() {
        let blob = BlobBuilder::new().build_with_info_header();

        assert_eq!(
            unsafe { validate_info_header(MULTIBOOT2_BOOTLOADER_MAGIC, blob.address()) },
            Err(BootError::MalformedInfoHeader { total_size: 8 })
        );
    }

    #[test]
    fn slices_are_bounded_by_their_length() {
        let blob = BlobBuilder::new().end().build();
        let validated = validate_bytes(MULTIBOOT2_BOOTLOADER_MAGIC, blob.as_bytes()).unwrap();
        assert_eq!(validated.limit(), Some(8));
        assert_eq!(
            validate_bytes(1, blob.as_bytes()),
            Err(BootError::InvalidMagic { found: 1 })
        );
    }
}
