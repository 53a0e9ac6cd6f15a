use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

pub const SCREEN_WIDTH: usize = 320;
pub const SCREEN_HEIGHT: usize = 200;
pub const VGA_SIZE_BYTES: usize = SCREEN_WIDTH * SCREEN_HEIGHT;

/// The framebuffer and palette, one mutex for both. The CPU locks it per
/// pixel store; a rasterizer locks it once per frame to copy everything out.
pub struct VgaFrame {
    pub pixels: Vec<u8>,
    pub palette: [[u8; 3]; 256],
}

pub type SharedVga = Arc<Mutex<VgaFrame>>;

impl VgaFrame {
    pub fn new() -> Self {
        VgaFrame {
            pixels: vec![0; SCREEN_WIDTH * SCREEN_HEIGHT],
            palette: default_palette(),
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * SCREEN_WIDTH + x]
    }
}

impl Default for VgaFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// The standard VGA mode-13h startup palette: the 16 EGA colors, a 6x6x6
/// color cube, and a grayscale ramp.
fn default_palette() -> [[u8; 3]; 256] {
    let mut palette = [[0u8; 3]; 256];
    #[rustfmt::skip]
    let ega: [[u8; 3]; 16] = [
        [0, 0, 0], [0, 0, 170], [0, 170, 0], [0, 170, 170],
        [170, 0, 0], [170, 0, 170], [170, 85, 0], [170, 170, 170],
        [85, 85, 85], [85, 85, 255], [85, 255, 85], [85, 255, 255],
        [255, 85, 85], [255, 85, 255], [255, 255, 85], [255, 255, 255],
    ];
    palette[..16].copy_from_slice(&ega);

    let mut idx = 16;
    for r in 0..6u16 {
        for g in 0..6u16 {
            for b in 0..6u16 {
                palette[idx] = [(r * 51) as u8, (g * 51) as u8, (b * 51) as u8];
                idx += 1;
            }
        }
    }

    for i in 0..24u16 {
        let gray = (8 + i * 10) as u8;
        palette[232 + i as usize] = [gray, gray, gray];
    }
    palette
}

/// Single-slot vertical-retrace signal. Publishing coalesces: a pulse while
/// one is already pending is dropped. Waiting consumes the pending slot.
pub struct RetraceSignal {
    pending: Mutex<bool>,
    cond: Condvar,
}

impl RetraceSignal {
    pub fn new() -> Self {
        RetraceSignal {
            pending: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    /// Non-blocking publish from the rasterizer side.
    pub fn pulse(&self) {
        let mut pending = self.pending.lock().unwrap();
        if !*pending {
            *pending = true;
            self.cond.notify_one();
        }
    }

    /// Block until the next pulse. Returns false if the stop flag was raised
    /// while waiting.
    pub fn wait(&self, stop: &AtomicBool) -> bool {
        let mut pending = self.pending.lock().unwrap();
        loop {
            if *pending {
                *pending = false;
                return true;
            }
            if stop.load(Ordering::Acquire) {
                return false;
            }
            let (guard, _) = self
                .cond
                .wait_timeout(pending, Duration::from_millis(5))
                .unwrap();
            pending = guard;
        }
    }
}

impl Default for RetraceSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// BIOS keyboard state. The host's input handler is the single writer; the
/// CPU reads and clears it during INT 16h.
#[derive(Default)]
pub struct KeyboardPort {
    scancode: AtomicU8,
    ascii: AtomicU8,
    available: AtomicBool,
}

impl KeyboardPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self, scancode: u8, ascii: u8) {
        self.scancode.store(scancode, Ordering::Relaxed);
        self.ascii.store(ascii, Ordering::Relaxed);
        self.available.store(true, Ordering::Release);
    }

    /// Read and consume the pending key.
    pub fn take(&self) -> Option<(u8, u8)> {
        if self.available.swap(false, Ordering::Acquire) {
            Some((
                self.scancode.load(Ordering::Relaxed),
                self.ascii.load(Ordering::Relaxed),
            ))
        } else {
            None
        }
    }

    /// Non-destructive check.
    pub fn peek(&self) -> Option<(u8, u8)> {
        if self.available.load(Ordering::Acquire) {
            Some((
                self.scancode.load(Ordering::Relaxed),
                self.ascii.load(Ordering::Relaxed),
            ))
        } else {
            None
        }
    }
}

/// Signals from the host into the CPU task.
#[derive(Default)]
pub struct HostSignals {
    stop: AtomicBool,
    pub retrace: RetraceSignal,
}

impl HostSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub(crate) fn stop_flag(&self) -> &AtomicBool {
        &self.stop
    }
}

/// Host-facing callbacks raised by the CPU: mode-13h activation and palette
/// writes (DAC ports and INT 10h). Wired by the embedder; defaults discard.
pub trait VideoSink: Send {
    fn mode13h(&mut self) {}
    fn palette(&mut self, index: u8, rgb: [u8; 3]) {
        let _ = (index, rgb);
    }
}

/// Sink for headless runs.
pub struct NullSink;

impl VideoSink for NullSink {}

/// Writes palette updates into the shared frame, under the frame mutex.
pub struct PaletteSink {
    vga: SharedVga,
}

impl PaletteSink {
    pub fn new(vga: SharedVga) -> Self {
        PaletteSink { vga }
    }
}

impl VideoSink for PaletteSink {
    fn palette(&mut self, index: u8, rgb: [u8; 3]) {
        self.vga.lock().unwrap().palette[index as usize] = rgb;
    }
}
