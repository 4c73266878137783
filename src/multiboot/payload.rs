use core::{ffi::CStr, mem::size_of};

/// The `size - 8` bytes that follow a tag header.
///
/// Every read is bounds checked against the view, so a decoder can never see
/// bytes that belong to the alignment padding or to the next tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PayloadView<'a> {
    bytes: &'a [u8],
}

macro_rules! impl_read_at_offset {
    ($($t:ty),*) => {
        ::paste::paste! {
            impl<'a> PayloadView<'a> {
                $(
                    pub fn [<read_ $t>](&self, offset: usize) -> Option<$t> {
                        let end = offset.checked_add(size_of::<$t>())?;
                        let bytes = self.bytes.get(offset..end)?;
                        Some(<$t>::from_ne_bytes(bytes.try_into().ok()?))
                    }
                )*
            }
        }
    };
}

impl_read_at_offset!(u8, u16, u32, u64);

impl<'a> PayloadView<'a> {
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub const fn empty() -> Self {
        Self { bytes: &[] }
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Everything from `offset` to the end of the payload, empty when out of range.
    pub fn tail(&self, offset: usize) -> &'a [u8] {
        self.bytes.get(offset..).unwrap_or(&[])
    }

    pub fn array<const N: usize>(&self, offset: usize) -> Option<&'a [u8; N]> {
        let end = offset.checked_add(N)?;
        self.bytes.get(offset..end)?.try_into().ok()
    }

    /// NUL-terminated string starting at `offset`.
    pub fn cstr(&self, offset: usize) -> Option<&'a CStr> {
        CStr::from_bytes_until_nul(self.tail(offset)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_stay_inside_the_view() {
        let bytes = [0x11, 0x22, 0x33, 0x44, 0x55];
        let view = PayloadView::new(&bytes);

        assert_eq!(view.read_u8(4), Some(0x55));
        assert_eq!(view.read_u32(0), Some(u32::from_ne_bytes([0x11, 0x22, 0x33, 0x44])));
        assert_eq!(view.read_u32(2), None);
        assert_eq!(view.read_u64(0), None);
        assert_eq!(view.read_u16(usize::MAX), None);
    }

    #[test]
    fn tail_and_array() {
        let bytes = [1, 2, 3, 4];
        let view = PayloadView::new(&bytes);

        assert_eq!(view.tail(2), &[3, 4]);
        assert!(view.tail(9).is_empty());
        assert_eq!(view.array::<2>(1), Some(&[2, 3]));
        assert_eq!(view.array::<4>(1), None);
    }

    #[test]
    fn cstr_requires_a_terminator() {
        let view = PayloadView::new(b"ab\0cd");
        assert_eq!(view.cstr(0).and_then(|s| s.to_str().ok()), Some("ab"));
        assert!(view.cstr(3).is_none());
    }
}
