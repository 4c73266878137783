use log::debug;

use super::{
    firmware::{ApmTable, EfiBootServices, EfiPointer32, EfiPointer64, Network, Rsdp, Smbios},
    framebuffer::{Framebuffer, VbeInfo},
    loader::{BootDevice, BootLoaderName, CommandLine, ElfSections, LoadBaseAddr, Module},
    memory::{BasicMemory, EfiMemoryMap, MemoryMap},
    payload::PayloadView,
    tags::TagKind,
    BootError, Result,
};

/// Represents a type that can be decoded from a tag payload.
///
/// Callers check the payload against [`TagKind::min_payload_size`] first,
/// `parse` still has to treat every read as fallible.
pub trait ParseTag<'a>: Sized {
    fn parse(payload: PayloadView<'a>) -> Option<Self>;
}

/// A known tag, decoded into the shape of its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag<'a> {
    End,
    CommandLine(CommandLine<'a>),
    BootLoaderName(BootLoaderName<'a>),
    Module(Module<'a>),
    BasicMemory(BasicMemory),
    BootDevice(BootDevice),
    MemoryMap(MemoryMap<'a>),
    Vbe(VbeInfo<'a>),
    Framebuffer(Framebuffer<'a>),
    ElfSections(ElfSections<'a>),
    ApmTable(ApmTable),
    EfiSystemTable32(EfiPointer32),
    EfiSystemTable64(EfiPointer64),
    Smbios(Smbios<'a>),
    AcpiOld(Rsdp<'a>),
    AcpiNew(Rsdp<'a>),
    Network(Network<'a>),
    EfiMemoryMap(EfiMemoryMap<'a>),
    EfiBootServices(EfiBootServices),
    EfiImageHandle32(EfiPointer32),
    EfiImageHandle64(EfiPointer64),
    LoadBaseAddr(LoadBaseAddr),
}

fn parse<'a, T: ParseTag<'a>>(kind: TagKind, payload: PayloadView<'a>) -> Result<T> {
    let required = kind.min_payload_size().unwrap_or(0);
    let too_short = BootError::PayloadTooShort {
        kind,
        length: payload.len(),
        required,
    };

    if payload.len() < required {
        return Err(too_short);
    }

    T::parse(payload).ok_or(too_short)
}

impl<'a> Tag<'a> {
    /// Length checks `payload` and decodes it, `None` for unknown kinds.
    pub fn decode(kind: TagKind, payload: PayloadView<'a>) -> Option<Result<Self>> {
        let tag = match kind {
            TagKind::End => Ok(Tag::End),
            TagKind::CommandLine => parse(kind, payload).map(Tag::CommandLine),
            TagKind::BootLoaderName => parse(kind, payload).map(Tag::BootLoaderName),
            TagKind::Module => parse(kind, payload).map(Tag::Module),
            TagKind::BasicMemory => parse(kind, payload).map(Tag::BasicMemory),
            TagKind::BootDevice => parse(kind, payload).map(Tag::BootDevice),
            TagKind::MemoryMap => parse(kind, payload).map(Tag::MemoryMap),
            TagKind::Vbe => parse(kind, payload).map(Tag::Vbe),
            TagKind::Framebuffer => parse(kind, payload).map(Tag::Framebuffer),
            TagKind::ElfSections => parse(kind, payload).map(Tag::ElfSections),
            TagKind::ApmTable => parse(kind, payload).map(Tag::ApmTable),
            TagKind::EfiSystemTable32 => parse(kind, payload).map(Tag::EfiSystemTable32),
            TagKind::EfiSystemTable64 => parse(kind, payload).map(Tag::EfiSystemTable64),
            TagKind::Smbios => parse(kind, payload).map(Tag::Smbios),
            TagKind::AcpiOld => parse(kind, payload).map(Tag::AcpiOld),
            TagKind::AcpiNew => parse(kind, payload).map(Tag::AcpiNew),
            TagKind::Network => parse(kind, payload).map(Tag::Network),
            TagKind::EfiMemoryMap => parse(kind, payload).map(Tag::EfiMemoryMap),
            TagKind::EfiBootServices => parse(kind, payload).map(Tag::EfiBootServices),
            TagKind::EfiImageHandle32 => parse(kind, payload).map(Tag::EfiImageHandle32),
            TagKind::EfiImageHandle64 => parse(kind, payload).map(Tag::EfiImageHandle64),
            TagKind::LoadBaseAddr => parse(kind, payload).map(Tag::LoadBaseAddr),
            TagKind::Unknown(_) => return None,
        };

        Some(tag)
    }

    pub fn kind(&self) -> TagKind {
        match self {
            Tag::End => TagKind::End,
            Tag::CommandLine(_) => TagKind::CommandLine,
            Tag::BootLoaderName(_) => TagKind::BootLoaderName,
            Tag::Module(_) => TagKind::Module,
            Tag::BasicMemory(_) => TagKind::BasicMemory,
            Tag::BootDevice(_) => TagKind::BootDevice,
            Tag::MemoryMap(_) => TagKind::MemoryMap,
            Tag::Vbe(_) => TagKind::Vbe,
            Tag::Framebuffer(_) => TagKind::Framebuffer,
            Tag::ElfSections(_) => TagKind::ElfSections,
            Tag::ApmTable(_) => TagKind::ApmTable,
            Tag::EfiSystemTable32(_) => TagKind::EfiSystemTable32,
            Tag::EfiSystemTable64(_) => TagKind::EfiSystemTable64,
            Tag::Smbios(_) => TagKind::Smbios,
            Tag::AcpiOld(_) => TagKind::AcpiOld,
            Tag::AcpiNew(_) => TagKind::AcpiNew,
            Tag::Network(_) => TagKind::Network,
            Tag::EfiMemoryMap(_) => TagKind::EfiMemoryMap,
            Tag::EfiBootServices(_) => TagKind::EfiBootServices,
            Tag::EfiImageHandle32(_) => TagKind::EfiImageHandle32,
            Tag::EfiImageHandle64(_) => TagKind::EfiImageHandle64,
            Tag::LoadBaseAddr(_) => TagKind::LoadBaseAddr,
        }
    }
}

/// Hook for whatever the kernel wants to do with a tag.
///
/// Both methods default to doing nothing, advancing past the tag is never
/// the handler's job.
pub trait TagHandler {
    /// Called with every known tag, the terminator included. An error aborts the parse.
    fn handle(&mut self, _tag: &Tag<'_>) -> Result<()> {
        Ok(())
    }

    /// Fallback for tag types this crate doesn't know, the payload is not validated.
    fn skip(&mut self, _tag_type: u32, _payload: PayloadView<'_>) {}
}

/// Accepts every tag.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHandler;

impl TagHandler for DefaultHandler {}

/// Logs a one line summary of each tag.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHandler;

impl TagHandler for LogHandler {
    fn handle(&mut self, tag: &Tag<'_>) -> Result<()> {
        match tag {
            Tag::End => {}
            Tag::CommandLine(line) => debug!("command line: {:?}", line.as_str()),
            Tag::BootLoaderName(name) => debug!("boot loader: {:?}", name.as_str()),
            Tag::Module(module) => debug!(
                "module {:?} at {:#x}..{:#x}",
                module.as_str(),
                module.start,
                module.end
            ),
            Tag::BasicMemory(memory) => debug!(
                "memory: {} KiB lower, {} KiB upper",
                memory.mem_lower, memory.mem_upper
            ),
            Tag::MemoryMap(map) => debug!(
                "memory map: {} entries of {} bytes",
                map.entry_count(),
                map.entry_size
            ),
            Tag::Framebuffer(framebuffer) => debug!(
                "framebuffer {:?} at {:#x}, {}x{}x{}",
                framebuffer.fb_type,
                framebuffer.addr,
                framebuffer.width,
                framebuffer.height,
                framebuffer.bpp
            ),
            Tag::LoadBaseAddr(base) => debug!("loaded at {:#x}", base.load_base_addr),
            other => debug!("{:?} tag", other.kind()),
        }

        Ok(())
    }

    fn skip(&mut self, tag_type: u32, payload: PayloadView<'_>) {
        debug!("skipping unknown tag {} ({} bytes)", tag_type, payload.len());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled(TagKind),
    /// Unknown type, left to the fallback.
    Skipped(u32),
    Rejected(BootError),
}

/// Routes each tag to its handler. Never moves the cursor.
pub struct Dispatcher<'h, H: TagHandler + ?Sized> {
    handler: &'h mut H,
}

impl<'h, H: TagHandler + ?Sized> Dispatcher<'h, H> {
    pub fn new(handler: &'h mut H) -> Self {
        Self { handler }
    }

    pub fn dispatch(&mut self, kind: TagKind, payload: PayloadView<'_>) -> DispatchOutcome {
        let tag = match Tag::decode(kind, payload) {
            Some(Ok(tag)) => tag,
            Some(Err(error)) => return DispatchOutcome::Rejected(error),
            None => {
                self.handler.skip(kind.raw(), payload);
                return DispatchOutcome::Skipped(kind.raw());
            }
        };

        match self.handler.handle(&tag) {
            Ok(()) => DispatchOutcome::Handled(kind),
            Err(error) => DispatchOutcome::Rejected(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multiboot::test_blob::minimal_payload;

    #[derive(Default)]
    struct Recorder {
        memory: Option<BasicMemory>,
        handled: Vec<TagKind>,
        skipped: Vec<(u32, usize)>,
    }

    impl TagHandler for Recorder {
        fn handle(&mut self, tag: &Tag<'_>) -> Result<()> {
            if let Tag::BasicMemory(memory) = tag {
                self.memory = Some(*memory);
            }
            self.handled.push(tag.kind());
            Ok(())
        }

        fn skip(&mut self, tag_type: u32, payload: PayloadView<'_>) {
            self.skipped.push((tag_type, payload.len()));
        }
    }

    #[test]
    fn basic_memory_reaches_the_handler() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&639u32.to_ne_bytes());
        payload.extend_from_slice(&130048u32.to_ne_bytes());

        let mut recorder = Recorder::default();
        let outcome = Dispatcher::new(&mut recorder)
            .dispatch(TagKind::BasicMemory, PayloadView::new(&payload));

        assert_eq!(outcome, DispatchOutcome::Handled(TagKind::BasicMemory));
        assert_eq!(
            recorder.memory,
            Some(BasicMemory {
                mem_lower: 639,
                mem_upper: 130048
            })
        );
    }

    #[test]
    fn every_known_kind_decodes_its_minimal_payload() {
        let mut recorder = Recorder::default();
        let mut dispatcher = Dispatcher::new(&mut recorder);

        for kind in TagKind::KNOWN {
            let payload = minimal_payload(kind);
            assert_eq!(
                dispatcher.dispatch(kind, PayloadView::new(&payload)),
                DispatchOutcome::Handled(kind),
                "{:?}",
                kind
            );
        }

        assert_eq!(recorder.handled, TagKind::KNOWN.to_vec());
    }

    #[test]
    fn short_payload_is_rejected() {
        let mut handler = DefaultHandler;
        let outcome =
            Dispatcher::new(&mut handler).dispatch(TagKind::BootDevice, PayloadView::new(&[0; 8]));

        assert_eq!(
            outcome,
            DispatchOutcome::Rejected(BootError::PayloadTooShort {
                kind: TagKind::BootDevice,
                length: 8,
                required: 12
            })
        );
    }

    #[test]
    fn unknown_kinds_go_to_the_fallback() {
        let mut recorder = Recorder::default();
        let outcome = Dispatcher::new(&mut recorder)
            .dispatch(TagKind::Unknown(9999), PayloadView::new(&[0xff; 3]));

        assert_eq!(outcome, DispatchOutcome::Skipped(9999));
        assert_eq!(recorder.skipped, vec![(9999, 3)]);
        assert!(recorder.handled.is_empty());
    }

    #[test]
    fn handler_errors_become_rejections() {
        struct Strict;

        impl TagHandler for Strict {
            fn handle(&mut self, tag: &Tag<'_>) -> Result<()> {
                Err(BootError::Rejected {
                    kind: tag.kind(),
                    reason: "not supported",
                })
            }
        }

        let outcome = Dispatcher::new(&mut Strict).dispatch(TagKind::EfiBootServices, PayloadView::empty());
        assert_eq!(
            outcome,
            DispatchOutcome::Rejected(BootError::Rejected {
                kind: TagKind::EfiBootServices,
                reason: "not supported"
            })
        );
    }

    #[test]
    fn log_handler_accepts_everything() {
        let mut handler = LogHandler;
        let mut dispatcher = Dispatcher::new(&mut handler);

        for kind in TagKind::KNOWN {
            let payload = minimal_payload(kind);
            assert_eq!(
                dispatcher.dispatch(kind, PayloadView::new(&payload)),
                DispatchOutcome::Handled(kind)
            );
        }
        assert_eq!(
            dispatcher.dispatch(TagKind::Unknown(42), PayloadView::empty()),
            DispatchOutcome::Skipped(42)
        );
    }
}
