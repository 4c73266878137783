// tags handing over firmware tables, mostly pointers or raw blobs we don't look into yet

use bitflags::bitflags;

use super::{dispatch::ParseTag, payload::PayloadView};

bitflags! {
    pub struct ApmFlags: u16 {
        const PROTECTED_MODE_16 = 1 << 0;
        const PROTECTED_MODE_32 = 1 << 1;
        const IDLE_SLOWS_CPU    = 1 << 2;
        const DISABLED          = 1 << 3;
        const DISENGAGED        = 1 << 4;
    }
}

/// https://www.gnu.org/software/grub/manual/multiboot2/multiboot.html#APM-table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApmTable {
    pub version: u16,
    pub cseg: u16,
    pub offset: u32,
    pub cseg_16: u16,
    pub dseg: u16,
    pub flags: ApmFlags,
    pub cseg_len: u16,
    pub cseg_16_len: u16,
    pub dseg_len: u16,
}

impl<'a> ParseTag<'a> for ApmTable {
    fn parse(payload: PayloadView<'a>) -> Option<Self> {
        Some(Self {
            version: payload.read_u16(0)?,
            cseg: payload.read_u16(2)?,
            offset: payload.read_u32(4)?,
            cseg_16: payload.read_u16(8)?,
            dseg: payload.read_u16(10)?,
            flags: ApmFlags::from_bits_truncate(payload.read_u16(12)?),
            cseg_len: payload.read_u16(14)?,
            cseg_16_len: payload.read_u16(16)?,
            dseg_len: payload.read_u16(18)?,
        })
    }
}

/// 32 bit EFI pointer, used by both the system table and image handle tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EfiPointer32 {
    pub pointer: u32,
}

impl<'a> ParseTag<'a> for EfiPointer32 {
    fn parse(payload: PayloadView<'a>) -> Option<Self> {
        Some(Self {
            pointer: payload.read_u32(0)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EfiPointer64 {
    pub pointer: u64,
}

impl<'a> ParseTag<'a> for EfiPointer64 {
    fn parse(payload: PayloadView<'a>) -> Option<Self> {
        Some(Self {
            pointer: payload.read_u64(0)?,
        })
    }
}

/// Present when the boot loader left EFI boot services running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EfiBootServices;

impl<'a> ParseTag<'a> for EfiBootServices {
    fn parse(_payload: PayloadView<'a>) -> Option<Self> {
        Some(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Smbios<'a> {
    pub major: u8,
    pub minor: u8,
    tables: &'a [u8],
}

impl<'a> Smbios<'a> {
    pub fn tables(&self) -> &'a [u8] {
        self.tables
    }
}

impl<'a> ParseTag<'a> for Smbios<'a> {
    fn parse(payload: PayloadView<'a>) -> Option<Self> {
        /*      +-------------------+
        u8      | major             |
        u8      | minor             |
        u8[6]   | reserved          |
        varies  | smbios tables     |
                +-------------------+ */
        Some(Self {
            major: payload.read_u8(0)?,
            minor: payload.read_u8(1)?,
            tables: payload.tail(8),
        })
    }
}

/// Copy of the ACPI root system description pointer, old (v1) or new (v2+).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rsdp<'a> {
    raw: PayloadView<'a>,
}

impl<'a> Rsdp<'a> {
    pub const SIGNATURE: &'static [u8; 8] = b"RSD PTR ";

    pub fn bytes(&self) -> &'a [u8] {
        self.raw.bytes()
    }

    pub fn signature(&self) -> Option<&'a [u8; 8]> {
        self.raw.array(0)
    }

    pub fn has_valid_signature(&self) -> bool {
        self.signature() == Some(Self::SIGNATURE)
    }

    pub fn revision(&self) -> Option<u8> {
        self.raw.read_u8(15)
    }
}

impl<'a> ParseTag<'a> for Rsdp<'a> {
    fn parse(payload: PayloadView<'a>) -> Option<Self> {
        Some(Self { raw: payload })
    }
}

/// The DHCP ACK the boot loader got when it booted from the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Network<'a> {
    dhcp_ack: &'a [u8],
}

impl<'a> Network<'a> {
    pub fn dhcp_ack(&self) -> &'a [u8] {
        self.dhcp_ack
    }
}

impl<'a> ParseTag<'a> for Network<'a> {
    fn parse(payload: PayloadView<'a>) -> Option<Self> {
        Some(Self {
            dhcp_ack: payload.bytes(),
        })
    }
}
