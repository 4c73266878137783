use super::{dispatch::ParseTag, payload::PayloadView};

/// Amount of lower and upper memory in KiB
///
/// https://www.gnu.org/software/grub/manual/multiboot2/multiboot.html#Basic-memory-information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicMemory {
    pub mem_lower: u32,
    pub mem_upper: u32,
}

impl<'a> ParseTag<'a> for BasicMemory {
    fn parse(payload: PayloadView<'a>) -> Option<Self> {
        /*      +-------------------+
        u32     | mem_lower         |
        u32     | mem_upper         |
                +-------------------+ */
        Some(Self {
            mem_lower: payload.read_u32(0)?,
            mem_upper: payload.read_u32(4)?,
        })
    }
}

/// The BIOS memory map, left as raw entries.
///
/// Each entry is at least `{ base_addr: u64, length: u64, type: u32, reserved: u32 }`,
/// newer versions may append fields which is why `entry_size` has to be honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryMap<'a> {
    pub entry_size: u32,
    pub entry_version: u32,
    entries: &'a [u8],
}

impl<'a> MemoryMap<'a> {
    pub const MIN_ENTRY_SIZE: u32 = 24;

    pub fn entry_bytes(&self) -> &'a [u8] {
        self.entries
    }

    /// Number of whole entries in the tag, zero when `entry_size` is unusable.
    pub fn entry_count(&self) -> usize {
        if self.entry_size < Self::MIN_ENTRY_SIZE {
            return 0;
        }

        self.entries.len() / self.entry_size as usize
    }
}

impl<'a> ParseTag<'a> for MemoryMap<'a> {
    fn parse(payload: PayloadView<'a>) -> Option<Self> {
        /*       +-------------------+
        u32     | entry_size        |
        u32     | entry_version     |
        varies  | entries           |
                +-------------------+ */
        Some(Self {
            entry_size: payload.read_u32(0)?,
            entry_version: payload.read_u32(4)?,
            entries: payload.tail(8),
        })
    }
}

/// The EFI memory map as handed over by firmware, descriptors left raw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EfiMemoryMap<'a> {
    pub descriptor_size: u32,
    pub descriptor_version: u32,
    descriptors: &'a [u8],
}

impl<'a> EfiMemoryMap<'a> {
    pub fn descriptor_bytes(&self) -> &'a [u8] {
        self.descriptors
    }

    pub fn descriptor_count(&self) -> usize {
        match self.descriptor_size {
            0 => 0,
            size => self.descriptors.len() / size as usize,
        }
    }
}

impl<'a> ParseTag<'a> for EfiMemoryMap<'a> {
    fn parse(payload: PayloadView<'a>) -> Option<Self> {
        Some(Self {
            descriptor_size: payload.read_u32(0)?,
            descriptor_version: payload.read_u32(4)?,
            descriptors: payload.tail(8),
        })
    }
}
