// tags describing how the kernel was loaded and what came along with it

use core::{ffi::CStr, ops::Range};

use super::{dispatch::ParseTag, payload::PayloadView};

/// Boot command line.
///
/// https://www.gnu.org/software/grub/manual/multiboot2/multiboot.html#Boot-command-line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandLine<'a> {
    raw: &'a [u8],
}

impl<'a> CommandLine<'a> {
    /// The string up to its NUL, `None` if the boot loader forgot the terminator.
    pub fn cstr(&self) -> Option<&'a CStr> {
        CStr::from_bytes_until_nul(self.raw).ok()
    }

    pub fn as_str(&self) -> Option<&'a str> {
        self.cstr()?.to_str().ok()
    }
}

impl<'a> ParseTag<'a> for CommandLine<'a> {
    fn parse(payload: PayloadView<'a>) -> Option<Self> {
        /*      +-------------------+
        u8[n]   | string            |
                +-------------------+ */
        Some(Self {
            raw: payload.bytes(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootLoaderName<'a> {
    raw: &'a [u8],
}

impl<'a> BootLoaderName<'a> {
    pub fn cstr(&self) -> Option<&'a CStr> {
        CStr::from_bytes_until_nul(self.raw).ok()
    }

    pub fn as_str(&self) -> Option<&'a str> {
        self.cstr()?.to_str().ok()
    }
}

impl<'a> ParseTag<'a> for BootLoaderName<'a> {
    fn parse(payload: PayloadView<'a>) -> Option<Self> {
        Some(Self {
            raw: payload.bytes(),
        })
    }
}

/// A module loaded alongside the kernel
///
/// https://www.gnu.org/software/grub/manual/multiboot2/multiboot.html#Modules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Module<'a> {
    pub start: u32,
    pub end: u32,
    string: PayloadView<'a>,
}

impl<'a> Module<'a> {
    pub fn range(&self) -> Range<u32> {
        self.start..self.end
    }

    pub fn cstr(&self) -> Option<&'a CStr> {
        self.string.cstr(0)
    }

    pub fn as_str(&self) -> Option<&'a str> {
        self.cstr()?.to_str().ok()
    }
}

impl<'a> ParseTag<'a> for Module<'a> {
    fn parse(payload: PayloadView<'a>) -> Option<Self> {
        /*      +-------------------+
        u32     | mod_start         |
        u32     | mod_end           |
        u8[n]   | string            |
                +-------------------+ */
        Some(Self {
            start: payload.read_u32(0)?,
            end: payload.read_u32(4)?,
            string: PayloadView::new(payload.tail(8)),
        })
    }
}

/// BIOS boot device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootDevice {
    pub biosdev: u32,
    pub partition: u32,
    pub sub_partition: u32,
}

impl BootDevice {
    /// The boot loader reports `u32::MAX` for "no partition".
    pub const NO_PARTITION: u32 = u32::MAX;
}

impl<'a> ParseTag<'a> for BootDevice {
    fn parse(payload: PayloadView<'a>) -> Option<Self> {
        Some(Self {
            biosdev: payload.read_u32(0)?,
            partition: payload.read_u32(4)?,
            sub_partition: payload.read_u32(8)?,
        })
    }
}

/// Section headers of the loaded kernel image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfSections<'a> {
    pub num: u16,
    pub entsize: u16,
    pub shndx: u16,
    sections: &'a [u8],
}

impl<'a> ElfSections<'a> {
    pub fn section_bytes(&self) -> &'a [u8] {
        self.sections
    }

    /// Whether the declared `num * entsize` headers actually fit in the tag.
    pub fn is_complete(&self) -> bool {
        self.num as usize * self.entsize as usize <= self.sections.len()
    }
}

impl<'a> ParseTag<'a> for ElfSections<'a> {
    fn parse(payload: PayloadView<'a>) -> Option<Self> {
        Some(Self {
            num: payload.read_u16(0)?,
            entsize: payload.read_u16(2)?,
            shndx: payload.read_u16(4)?,
            sections: payload.tail(6),
        })
    }
}

/// Physical address the image was loaded at, for relocatable kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadBaseAddr {
    pub load_base_addr: u32,
}

impl<'a> ParseTag<'a> for LoadBaseAddr {
    fn parse(payload: PayloadView<'a>) -> Option<Self> {
        Some(Self {
            load_base_addr: payload.read_u32(0)?,
        })
    }
}
