#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub unsafe fn hlt() {
    core::arch::asm!("hlt", options(nomem, nostack));
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
pub unsafe fn hlt() {
    core::hint::spin_loop();
}

/// Parks the CPU for good, there is nothing to return to this early in boot.
pub fn hlt_loop() -> ! {
    loop {
        unsafe {
            hlt();
        }
    }
}
