use super::{payload::PayloadView, BootError, Result};

pub const TAG_HEADER_SIZE: usize = 8;
/// Tags start on 8 byte boundaries relative to the start of the tag list.
pub const TAG_ALIGN: usize = 8;

/// Every tag type defined for the boot information format, plus a catch-all.
///
/// https://www.gnu.org/software/grub/manual/multiboot2/multiboot.html#Boot-information-format
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TagKind {
    End,
    CommandLine,
    BootLoaderName,
    Module,
    BasicMemory,
    BootDevice,
    MemoryMap,
    Vbe,
    Framebuffer,
    ElfSections,
    ApmTable,
    EfiSystemTable32,
    EfiSystemTable64,
    Smbios,
    AcpiOld,
    AcpiNew,
    Network,
    EfiMemoryMap,
    EfiBootServices,
    EfiImageHandle32,
    EfiImageHandle64,
    LoadBaseAddr,
    Unknown(u32),
}

impl TagKind {
    pub const KNOWN: [TagKind; 21] = [
        TagKind::CommandLine,
        TagKind::BootLoaderName,
        TagKind::Module,
        TagKind::BasicMemory,
        TagKind::BootDevice,
        TagKind::MemoryMap,
        TagKind::Vbe,
        TagKind::Framebuffer,
        TagKind::ElfSections,
        TagKind::ApmTable,
        TagKind::EfiSystemTable32,
        TagKind::EfiSystemTable64,
        TagKind::Smbios,
        TagKind::AcpiOld,
        TagKind::AcpiNew,
        TagKind::Network,
        TagKind::EfiMemoryMap,
        TagKind::EfiBootServices,
        TagKind::EfiImageHandle32,
        TagKind::EfiImageHandle64,
        TagKind::LoadBaseAddr,
    ];

    pub const fn from_raw(tag_type: u32) -> Self {
        match tag_type {
            0 => TagKind::End,
            1 => TagKind::CommandLine,
            2 => TagKind::BootLoaderName,
            3 => TagKind::Module,
            4 => TagKind::BasicMemory,
            5 => TagKind::BootDevice,
            6 => TagKind::MemoryMap,
            7 => TagKind::Vbe,
            8 => TagKind::Framebuffer,
            9 => TagKind::ElfSections,
            10 => TagKind::ApmTable,
            11 => TagKind::EfiSystemTable32,
            12 => TagKind::EfiSystemTable64,
            13 => TagKind::Smbios,
            14 => TagKind::AcpiOld,
            15 => TagKind::AcpiNew,
            16 => TagKind::Network,
            17 => TagKind::EfiMemoryMap,
            18 => TagKind::EfiBootServices,
            19 => TagKind::EfiImageHandle32,
            20 => TagKind::EfiImageHandle64,
            21 => TagKind::LoadBaseAddr,
            other => TagKind::Unknown(other),
        }
    }

    pub const fn raw(self) -> u32 {
        match self {
            TagKind::End => 0,
            TagKind::CommandLine => 1,
            TagKind::BootLoaderName => 2,
            TagKind::Module => 3,
            TagKind::BasicMemory => 4,
            TagKind::BootDevice => 5,
            TagKind::MemoryMap => 6,
            TagKind::Vbe => 7,
            TagKind::Framebuffer => 8,
            TagKind::ElfSections => 9,
            TagKind::ApmTable => 10,
            TagKind::EfiSystemTable32 => 11,
            TagKind::EfiSystemTable64 => 12,
            TagKind::Smbios => 13,
            TagKind::AcpiOld => 14,
            TagKind::AcpiNew => 15,
            TagKind::Network => 16,
            TagKind::EfiMemoryMap => 17,
            TagKind::EfiBootServices => 18,
            TagKind::EfiImageHandle32 => 19,
            TagKind::EfiImageHandle64 => 20,
            TagKind::LoadBaseAddr => 21,
            TagKind::Unknown(other) => other,
        }
    }

    /// Size of the fixed fields that follow the header, `None` for unknown kinds.
    ///
    /// Variable trailing data (strings, entries, raw tables) is not counted.
    pub const fn min_payload_size(self) -> Option<usize> {
        let size = match self {
            TagKind::End => 0,
            TagKind::CommandLine | TagKind::BootLoaderName => 0,
            // mod_start, mod_end
            TagKind::Module => 8,
            // mem_lower, mem_upper
            TagKind::BasicMemory => 8,
            // biosdev, partition, sub_partition
            TagKind::BootDevice => 12,
            // entry_size, entry_version
            TagKind::MemoryMap => 8,
            // mode, interface seg/off/len, control_info[512], mode_info[256]
            TagKind::Vbe => 8 + 512 + 256,
            // addr, pitch, width, height, bpp, type, reserved
            TagKind::Framebuffer => 8 + 4 + 4 + 4 + 3,
            // num, entsize, shndx
            TagKind::ElfSections => 6,
            TagKind::ApmTable => 20,
            TagKind::EfiSystemTable32 | TagKind::EfiImageHandle32 => 4,
            TagKind::EfiSystemTable64 | TagKind::EfiImageHandle64 => 8,
            // major, minor, reserved[6]
            TagKind::Smbios => 8,
            TagKind::AcpiOld | TagKind::AcpiNew | TagKind::Network => 0,
            // descriptor_size, descriptor_version
            TagKind::EfiMemoryMap => 8,
            TagKind::EfiBootServices => 0,
            TagKind::LoadBaseAddr => 4,
            TagKind::Unknown(_) => return None,
        };

        Some(size)
    }

    pub const fn is_known(self) -> bool {
        !matches!(self, TagKind::Unknown(_))
    }
}

impl From<u32> for TagKind {
    fn from(tag_type: u32) -> Self {
        Self::from_raw(tag_type)
    }
}

impl From<TagKind> for u32 {
    fn from(kind: TagKind) -> Self {
        kind.raw()
    }
}

/*
        +-------------------+
u32     | type              |
u32     | size              |
        +-------------------+
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagHeader {
    pub tag_type: u32,
    pub size: u32,
}

impl TagHeader {
    pub fn from_bytes(bytes: [u8; TAG_HEADER_SIZE]) -> Self {
        let [t0, t1, t2, t3, s0, s1, s2, s3] = bytes;
        Self {
            tag_type: u32::from_ne_bytes([t0, t1, t2, t3]),
            size: u32::from_ne_bytes([s0, s1, s2, s3]),
        }
    }

    pub fn kind(&self) -> TagKind {
        TagKind::from_raw(self.tag_type)
    }

    pub fn payload_size(&self) -> Option<usize> {
        (self.size as usize).checked_sub(TAG_HEADER_SIZE)
    }
}

/// A tag as found in the blob: where it starts, its header and its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTag<'a> {
    pub offset: usize,
    pub header: TagHeader,
    pub payload: PayloadView<'a>,
}

impl<'a> RawTag<'a> {
    pub fn kind(&self) -> TagKind {
        self.header.kind()
    }
}

/// Rounds a declared tag size up to the tag alignment.
///
/// Done in the 32 bit width of the size field, so sizes within 7 of
/// `u32::MAX` wrap to a zero step.
pub const fn aligned_step(size: u32) -> u32 {
    size.wrapping_add(TAG_ALIGN as u32 - 1) & !(TAG_ALIGN as u32 - 1)
}

/// Offset of the tag following the one at `offset` in a list starting at `base`.
pub fn next_tag_offset(base: usize, offset: usize, size: u32) -> Result<usize> {
    let next_offset = offset
        .checked_add(aligned_step(size) as usize)
        .ok_or(BootError::AddressOverflow { offset })?;

    if next_offset <= offset {
        return Err(BootError::NonMonotonicProgress { offset, size });
    }

    base.checked_add(next_offset)
        .ok_or(BootError::AddressOverflow { offset })?;

    Ok(next_offset)
}
