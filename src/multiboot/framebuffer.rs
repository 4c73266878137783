// display related tags, https://www.gnu.org/software/grub/manual/multiboot2/multiboot.html#Framebuffer-info

use super::{dispatch::ParseTag, payload::PayloadView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VbeInfo<'a> {
    pub mode: u16,
    pub interface_seg: u16,
    pub interface_off: u16,
    pub interface_len: u16,
    pub control_info: &'a [u8; 512],
    pub mode_info: &'a [u8; 256],
}

impl<'a> ParseTag<'a> for VbeInfo<'a> {
    fn parse(payload: PayloadView<'a>) -> Option<Self> {
        /*      +--------------------+
        u16     | vbe_mode           |
        u16     | vbe_interface_seg  |
        u16     | vbe_interface_off  |
        u16     | vbe_interface_len  |
        u8[512] | vbe_control_info   |
        u8[256] | vbe_mode_info      |
                +--------------------+ */
        Some(Self {
            mode: payload.read_u16(0)?,
            interface_seg: payload.read_u16(2)?,
            interface_off: payload.read_u16(4)?,
            interface_len: payload.read_u16(6)?,
            control_info: payload.array(8)?,
            mode_info: payload.array(8 + 512)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferType {
    Indexed,
    DirectRgb,
    EgaText,
    Unknown(u8),
}

impl From<u8> for FramebufferType {
    fn from(value: u8) -> Self {
        match value {
            0 => FramebufferType::Indexed,
            1 => FramebufferType::DirectRgb,
            2 => FramebufferType::EgaText,
            other => FramebufferType::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbLayout {
    pub red_field_position: u8,
    pub red_mask_size: u8,
    pub green_field_position: u8,
    pub green_mask_size: u8,
    pub blue_field_position: u8,
    pub blue_mask_size: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorInfo<'a> {
    /// `num_colors` entries of 3 bytes each
    Palette(&'a [u8]),
    Rgb(RgbLayout),
    Text,
}

impl<'a> ColorInfo<'a> {
    pub fn palette(self) -> impl Iterator<Item = PaletteColor> + 'a {
        let colors: &'a [u8] = match self {
            ColorInfo::Palette(colors) => colors,
            _ => &[],
        };

        colors.chunks_exact(3).map(|color| PaletteColor {
            red: color[0],
            green: color[1],
            blue: color[2],
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framebuffer<'a> {
    pub addr: u64,
    pub pitch: u32,
    pub width: u32,
    pub height: u32,
    pub bpp: u8,
    pub fb_type: FramebufferType,
    color_info: PayloadView<'a>,
}

impl<'a> Framebuffer<'a> {
    const COLOR_INFO_OFFSET: usize = 23;

    /// Decodes the block that follows the fixed fields, `None` if it is
    /// missing, too short for its type or the type is unknown.
    pub fn color_info(&self) -> Option<ColorInfo<'a>> {
        let info = self.color_info;

        match self.fb_type {
            FramebufferType::Indexed => {
                let num_colors = info.read_u32(0)? as usize;
                let end = num_colors.checked_mul(3)?.checked_add(4)?;
                info.bytes().get(4..end).map(ColorInfo::Palette)
            }
            FramebufferType::DirectRgb => Some(ColorInfo::Rgb(RgbLayout {
                red_field_position: info.read_u8(0)?,
                red_mask_size: info.read_u8(1)?,
                green_field_position: info.read_u8(2)?,
                green_mask_size: info.read_u8(3)?,
                blue_field_position: info.read_u8(4)?,
                blue_mask_size: info.read_u8(5)?,
            })),
            FramebufferType::EgaText => Some(ColorInfo::Text),
            FramebufferType::Unknown(_) => None,
        }
    }
}

impl<'a> ParseTag<'a> for Framebuffer<'a> {
    fn parse(payload: PayloadView<'a>) -> Option<Self> {
        /*      +--------------------+
        u64     | framebuffer_addr   |
        u32     | framebuffer_pitch  |
        u32     | framebuffer_width  |
        u32     | framebuffer_height |
        u8      | framebuffer_bpp    |
        u8      | framebuffer_type   |
        u8      | reserved           |
        varies  | color_info         |
                +--------------------+ */
        Some(Self {
            addr: payload.read_u64(0)?,
            pitch: payload.read_u32(8)?,
            width: payload.read_u32(12)?,
            height: payload.read_u32(16)?,
            bpp: payload.read_u8(20)?,
            fb_type: payload.read_u8(21)?.into(),
            color_info: PayloadView::new(payload.tail(Self::COLOR_INFO_OFFSET)),
        })
    }
}
