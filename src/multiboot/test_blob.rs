// builds boot information blobs in memory the way a boot loader would lay them out

use super::tags::{TagKind, TAG_ALIGN};

#[derive(Default)]
pub struct BlobBuilder {
    bytes: Vec<u8>,
}

impl BlobBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tag whose size field matches its payload.
    pub fn tag(self, tag_type: u32, payload: &[u8]) -> Self {
        let size = (8 + payload.len()) as u32;
        self.raw_tag(tag_type, size, payload)
    }

    /// A tag with whatever size the test wants to lie about.
    pub fn raw_tag(mut self, tag_type: u32, size: u32, payload: &[u8]) -> Self {
        self.bytes.extend_from_slice(&tag_type.to_ne_bytes());
        self.bytes.extend_from_slice(&size.to_ne_bytes());
        self.bytes.extend_from_slice(payload);
        while self.bytes.len() % TAG_ALIGN != 0 {
            self.bytes.push(0);
        }
        self
    }

    pub fn kind(self, kind: TagKind, payload: &[u8]) -> Self {
        self.tag(kind.raw(), payload)
    }

    pub fn basic_memory(self, mem_lower: u32, mem_upper: u32) -> Self {
        let mut payload = Vec::new();
        payload.extend_from_slice(&mem_lower.to_ne_bytes());
        payload.extend_from_slice(&mem_upper.to_ne_bytes());
        self.kind(TagKind::BasicMemory, &payload)
    }

    pub fn end(self) -> Self {
        self.tag(0, &[])
    }

    pub fn build(self) -> Blob {
        Blob::new(self.bytes)
    }

    /// Prepends the `total_size` / `reserved` header the boot loader passes the address of.
    pub fn build_with_info_header(self) -> Blob {
        let total_size = (8 + self.bytes.len()) as u32;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&total_size.to_ne_bytes());
        bytes.extend_from_slice(&0u32.to_ne_bytes());
        bytes.extend_from_slice(&self.bytes);
        Blob::new(bytes)
    }
}

/// 8 byte aligned copy of a blob.
pub struct Blob {
    words: Vec<u64>,
    len: usize,
}

impl Blob {
    fn new(bytes: Vec<u8>) -> Self {
        let mut words = vec![0u64; (bytes.len() + 7) / 8];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks(8)) {
            let mut buffer = [0u8; 8];
            buffer[..chunk.len()].copy_from_slice(chunk);
            *word = u64::from_ne_bytes(buffer);
        }

        Self {
            words,
            len: bytes.len(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        unsafe { core::slice::from_raw_parts(self.words.as_ptr() as *const u8, self.len) }
    }

    pub fn address(&self) -> usize {
        self.words.as_ptr() as usize
    }

    pub fn len(&self) -> usize {
        self.len
    }
}

/// Smallest valid payload for every known kind.
pub fn minimal_payload(kind: TagKind) -> Vec<u8> {
    let mut payload = vec![0u8; kind.min_payload_size().unwrap_or(0)];
    match kind {
        TagKind::CommandLine | TagKind::BootLoaderName => payload.push(0),
        TagKind::Module => payload.extend_from_slice(b"mod\0"),
        _ => {}
    }
    payload
}
