#![cfg_attr(not(test), no_std)]

use log::LevelFilter;

use crate::{logger::Logger, vga_buffer::Writer};

pub mod logger;
pub mod multiboot;
pub mod mutex;
pub mod vga_buffer;
pub mod x86;

pub const LOG_LEVEL: LevelFilter = LevelFilter::Debug;
pub const BANNER: &[u8] = b"Hello, World!\n";

pub static LOGGER: Logger<Writer> = Logger::new(LOG_LEVEL);

/// Called by the boot assembly with the values the boot loader left in `eax` and `ebx`.
#[cfg(not(test))]
#[no_mangle]
pub extern "C" fn kernel_main(multiboot_magic: u32, multiboot_info_addr: usize) -> ! {
    use crate::{multiboot::LogHandler, vga_buffer::TextSink};

    let mut writer = unsafe { Writer::vga() };
    writer.clear();
    writer.write(BANNER);

    LOGGER.attach(writer);
    if LOGGER.init().is_err() {
        x86::hlt_loop();
    }

    // ebx holds the address of the fixed header, not of the first tag
    match unsafe {
        multiboot::parse_boot_information(multiboot_magic, multiboot_info_addr, &mut LogHandler)
    } {
        Ok(tags) => log::info!("boot information: {} tags", tags),
        Err(error) => log::error!("boot information rejected: {}", error),
    }

    x86::hlt_loop()
}

#[cfg(not(test))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    log::error!("{}", info);
    x86::hlt_loop()
}
