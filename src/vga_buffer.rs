// https://wiki.osdev.org/Text_UI for more info
// for now we will follow along with https://os.phil-opp.com/vga-text-mode/

use core::ptr::{read_volatile, write_volatile};

use modular_bitfield::{bitfield, BitfieldSpecifier};

const VGA_BUFFER_ADDRESS: usize = 0xb8000;

pub const DEFAULT_FOREGROUND: Color = Color::White;
pub const DEFAULT_BACKGROUND: Color = Color::Black;

/// Something text can be pushed into, one byte per character.
pub trait TextSink {
    /// Writes `text` up to its first NUL and returns how many bytes were consumed.
    fn write(&mut self, text: &[u8]) -> usize;
}

#[allow(dead_code)]
#[derive(BitfieldSpecifier, Clone, Copy, Debug, PartialEq, Eq)]
#[bits = 4]
pub enum Color {
    Black = 0,
    Blue = 1,
    Green = 2,
    Cyan = 3,
    Red = 4,
    Magenta = 5,
    Brown = 6,
    LightGray = 7,
    DarkGray = 8,
    LightBlue = 9,
    LightGreen = 10,
    LightCyan = 11,
    LightRed = 12,
    LightMagenta = 13,
    Yellow = 14,
    White = 15,
}

#[bitfield]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VgaColor {
    pub foreground: Color,
    pub background: Color,
}

impl VgaColor {
    pub fn with_colors(foreground: Color, background: Color) -> Self {
        VgaColor::new()
            .with_foreground(foreground)
            .with_background(background)
    }

    fn attribute(&self) -> u8 {
        self.into_bytes()[0]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
struct ScreenChar {
    ascii_character: u8,
    color_code: u8,
}

const BUFFER_HEIGHT: usize = 25;
const BUFFER_WIDTH: usize = 80;

#[repr(transparent)]
pub struct Buffer {
    chars: [[ScreenChar; BUFFER_WIDTH]; BUFFER_HEIGHT],
}

impl Buffer {
    pub const fn blank() -> Self {
        Self {
            chars: [[ScreenChar {
                ascii_character: b' ',
                color_code: 0,
            }; BUFFER_WIDTH]; BUFFER_HEIGHT],
        }
    }

    fn read(&self, row: usize, column: usize) -> ScreenChar {
        unsafe { read_volatile::<ScreenChar>(&self.chars[row][column] as *const ScreenChar) }
    }

    fn write(&mut self, row: usize, column: usize, char: ScreenChar) {
        unsafe {
            write_volatile(&mut self.chars[row][column] as *mut ScreenChar, char);
        }
    }
}

/// Handle to the text screen. Built once during boot and handed to whoever prints.
pub struct Writer {
    buffer: &'static mut Buffer,
    column_position: usize,
    color: VgaColor,
}

impl Writer {
    pub fn new(buffer: &'static mut Buffer, color: VgaColor) -> Self {
        Self {
            buffer,
            column_position: 0,
            color,
        }
    }

    /// # Safety
    /// Must only be called once, the VGA text buffer has to be identity mapped
    /// and nothing else may write to it.
    pub unsafe fn vga() -> Self {
        Self::new(
            &mut *(VGA_BUFFER_ADDRESS as *mut Buffer),
            VgaColor::with_colors(DEFAULT_FOREGROUND, DEFAULT_BACKGROUND),
        )
    }

    pub fn clear(&mut self) {
        for row in 0..BUFFER_HEIGHT {
            self.clear_row(row);
        }
        self.column_position = 0;
    }

    pub fn write_byte(&mut self, byte: u8) {
        match byte {
            b'\n' => self.new_line(),
            byte => {
                if self.column_position >= BUFFER_WIDTH {
                    self.new_line();
                }

                self.buffer.write(
                    BUFFER_HEIGHT - 1,
                    self.column_position,
                    ScreenChar {
                        ascii_character: byte,
                        color_code: self.color.attribute(),
                    },
                );

                self.column_position += 1;
            }
        }
    }

    fn new_line(&mut self) {
        for row in 1..BUFFER_HEIGHT {
            for column in 0..BUFFER_WIDTH {
                let char = self.buffer.read(row, column);
                self.buffer.write(row - 1, column, char);
            }
        }
        self.clear_row(BUFFER_HEIGHT - 1);
        self.column_position = 0;
    }

    fn clear_row(&mut self, row: usize) {
        let blank = ScreenChar {
            ascii_character: b' ',
            color_code: self.color.attribute(),
        };

        for col in 0..BUFFER_WIDTH {
            self.buffer.write(row, col, blank);
        }
    }
}

impl TextSink for Writer {
    fn write(&mut self, text: &[u8]) -> usize {
        let mut count = 0;

        for &byte in text.iter().take_while(|&&byte| byte != 0) {
            match byte {
                // is ASCII char or newline
                0x20..=0x7e | b'\n' => self.write_byte(byte),
                // not part of printable ASCII range
                _ => self.write_byte(0xfe),
            }
            count += 1;
        }

        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_writer() -> Writer {
        let buffer = Box::leak(Box::new(Buffer::blank()));
        Writer::new(buffer, VgaColor::with_colors(Color::Yellow, Color::Blue))
    }

    fn bottom_row(writer: &Writer) -> Vec<u8> {
        (0..BUFFER_WIDTH)
            .map(|column| writer.buffer.read(BUFFER_HEIGHT - 1, column).ascii_character)
            .collect()
    }

    #[test]
    fn color_attribute_packs_background_high() {
        let color = VgaColor::with_colors(Color::Yellow, Color::Blue);
        assert_eq!(color.attribute(), 0x1e);
        assert_eq!(color.foreground(), Color::Yellow);
        assert_eq!(color.background(), Color::Blue);
    }

    #[test]
    fn write_stops_at_nul() {
        let mut writer = test_writer();
        assert_eq!(writer.write(b"Hello, World!\0garbage"), 13);
        assert_eq!(&bottom_row(&writer)[..13], b"Hello, World!");
        assert_eq!(writer.buffer.read(BUFFER_HEIGHT - 1, 0).color_code, 0x1e);
    }

    #[test]
    fn unprintable_bytes_are_replaced() {
        let mut writer = test_writer();
        assert_eq!(writer.write(&[b'a', 0x07, b'b']), 3);
        assert_eq!(&bottom_row(&writer)[..3], &[b'a', 0xfe, b'b']);
    }

    #[test]
    fn newline_scrolls_up() {
        let mut writer = test_writer();
        writer.write(b"first\nsecond");

        let above = writer.buffer.read(BUFFER_HEIGHT - 2, 0).ascii_character;
        assert_eq!(above, b'f');
        assert_eq!(&bottom_row(&writer)[..6], b"second");
    }

    #[test]
    fn long_lines_wrap() {
        let mut writer = test_writer();
        let line = [b'x'; BUFFER_WIDTH + 2];
        assert_eq!(writer.write(&line), BUFFER_WIDTH + 2);
        assert_eq!(&bottom_row(&writer)[..3], b"xx ");
    }

    #[test]
    fn clear_blanks_everything() {
        let mut writer = test_writer();
        writer.write(b"junk");
        writer.clear();
        assert!(bottom_row(&writer).iter().all(|&byte| byte == b' '));
    }
}
