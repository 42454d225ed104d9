//! PS/2 keyboard translation state machine
//!
//! Turns the raw set-1 scancode stream into key events. The decoder tracks
//! latched modifiers (shift, ctrl, AltGr, capslock) and the 0xE0 extended
//! prefix, translates make codes through the active layout's three planes,
//! remaps Ctrl+letter to control codes, and pushes non-zero symbols onto a
//! 64-entry drop-oldest ring. ASCII 0x03 additionally raises the Ctrl-C
//! software signal.
//!
//! The IRQ1 path feeds exactly one byte per interrupt and never touches the
//! status port; task-context consumers mask interrupts around ring reads.

pub mod layout;
pub mod ring;

use crate::interrupts::{self, Signal};
use bitflags::bitflags;
use core::sync::atomic::{AtomicU8, Ordering};
use layout::{Layout, DE, US};
use ring::EventRing;
use spin::Mutex;

bitflags! {
    /// Modifier bitfield carried on every event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CTRL = 1 << 1;
        const ALTGR = 1 << 2;
        const CAPS_LOCK = 1 << 3;
    }
}

/// One decoded key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub symbol: u8,
    pub modifiers: Modifiers,
    pub pressed: bool,
}

/// Non-ASCII sentinel symbols for extended keys.
pub mod keys {
    pub const ARROW_UP: u8 = 0x80;
    pub const ARROW_DOWN: u8 = 0x81;
    pub const ARROW_LEFT: u8 = 0x82;
    pub const ARROW_RIGHT: u8 = 0x83;
    pub const DELETE: u8 = 0x84;
    pub const HOME: u8 = 0x85;
    pub const END: u8 = 0x86;
}

/// Ctrl-C control code; raising the software signal hangs off this symbol.
pub const ETX: u8 = 0x03;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LayoutId {
    Us = 0,
    De = 1,
}

impl LayoutId {
    fn table(self) -> &'static Layout {
        match self {
            LayoutId::Us => &US,
            LayoutId::De => &DE,
        }
    }
}

/// Active layout; a plain atomic so switching is atomic with respect to the
/// IRQ path.
static ACTIVE_LAYOUT: AtomicU8 = AtomicU8::new(LayoutId::Us as u8);

pub fn set_layout(layout: LayoutId) {
    ACTIVE_LAYOUT.store(layout as u8, Ordering::Relaxed);
}

pub fn active_layout() -> LayoutId {
    match ACTIVE_LAYOUT.load(Ordering::Relaxed) {
        1 => LayoutId::De,
        _ => LayoutId::Us,
    }
}

// Set-1 modifier make codes.
const SC_LEFT_SHIFT: u8 = 0x2A;
const SC_RIGHT_SHIFT: u8 = 0x36;
const SC_CTRL: u8 = 0x1D;
const SC_ALT: u8 = 0x38;
const SC_CAPS_LOCK: u8 = 0x3A;
const SC_EXTENDED: u8 = 0xE0;
const BREAK_BIT: u8 = 0x80;

/// Latched decoder state. Only the scancode feed mutates it.
pub struct Decoder {
    left_shift: bool,
    right_shift: bool,
    left_ctrl: bool,
    right_ctrl: bool,
    capslock: bool,
    altgr: bool,
    extended_pending: bool,
}

impl Decoder {
    pub const fn new() -> Self {
        Self {
            left_shift: false,
            right_shift: false,
            left_ctrl: false,
            right_ctrl: false,
            capslock: false,
            altgr: false,
            extended_pending: false,
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        let mut m = Modifiers::empty();
        if self.left_shift || self.right_shift {
            m |= Modifiers::SHIFT;
        }
        if self.left_ctrl || self.right_ctrl {
            m |= Modifiers::CTRL;
        }
        if self.altgr {
            m |= Modifiers::ALTGR;
        }
        if self.capslock {
            m |= Modifiers::CAPS_LOCK;
        }
        m
    }

    /// Advance the state machine by one byte. Returns the decoded event for
    /// make codes that translate to a symbol; modifier traffic and break
    /// codes return None.
    pub fn feed(&mut self, byte: u8, layout: &Layout) -> Option<KeyEvent> {
        if byte == SC_EXTENDED {
            self.extended_pending = true;
            return None;
        }
        let extended = self.extended_pending;
        self.extended_pending = false;

        if byte & BREAK_BIT != 0 {
            self.handle_break(byte & !BREAK_BIT, extended);
            return None;
        }
        self.handle_make(byte, extended, layout)
    }

    fn handle_break(&mut self, code: u8, extended: bool) {
        match code {
            // 0xE0 0x2A/0xAA are fake shifts around extended keys; only
            // plain shift traffic touches the latches.
            SC_LEFT_SHIFT if !extended => self.left_shift = false,
            SC_RIGHT_SHIFT if !extended => self.right_shift = false,
            SC_CTRL => {
                if extended {
                    self.right_ctrl = false;
                } else {
                    self.left_ctrl = false;
                }
            }
            SC_ALT if extended => self.altgr = false,
            _ => {}
        }
    }

    fn handle_make(&mut self, code: u8, extended: bool, layout: &Layout) -> Option<KeyEvent> {
        match code {
            SC_LEFT_SHIFT if !extended => {
                self.left_shift = true;
                return None;
            }
            SC_RIGHT_SHIFT if !extended => {
                self.right_shift = true;
                return None;
            }
            SC_CTRL => {
                if extended {
                    self.right_ctrl = true;
                } else {
                    self.left_ctrl = true;
                }
                return None;
            }
            SC_ALT => {
                if extended {
                    self.altgr = true;
                }
                return None;
            }
            SC_CAPS_LOCK if !extended => {
                self.capslock = !self.capslock;
                return None;
            }
            _ => {}
        }

        let symbol = if extended {
            extended_symbol(code)
        } else {
            self.translate(code, layout)
        };
        if symbol == 0 {
            return None;
        }
        Some(KeyEvent {
            symbol,
            modifiers: self.modifiers(),
            pressed: true,
        })
    }

    /// Plane selection: AltGr plane when AltGr is latched and maps the key;
    /// else the shifted plane when shift XOR (capslock on a letter key)
    /// applies and maps it; else normal. Ctrl remaps letters to control
    /// codes.
    fn translate(&self, code: u8, layout: &Layout) -> u8 {
        if code as usize >= 128 {
            return 0;
        }
        let idx = code as usize;
        let base = layout.normal[idx];
        let is_letter = base.is_ascii_alphabetic();
        let shift = self.left_shift || self.right_shift;

        let mut symbol = base;
        if self.altgr && layout.altgr[idx] != 0 {
            symbol = layout.altgr[idx];
        } else if (shift ^ (self.capslock && is_letter)) && layout.shifted[idx] != 0 {
            symbol = layout.shifted[idx];
        }

        if (self.left_ctrl || self.right_ctrl) && symbol.is_ascii_alphabetic() {
            symbol &= 0x1F;
        }
        symbol
    }
}

fn extended_symbol(code: u8) -> u8 {
    match code {
        0x48 => keys::ARROW_UP,
        0x50 => keys::ARROW_DOWN,
        0x4B => keys::ARROW_LEFT,
        0x4D => keys::ARROW_RIGHT,
        0x53 => keys::DELETE,
        0x47 => keys::HOME,
        0x4F => keys::END,
        _ => 0,
    }
}

/// Event ring: capacity 64, oldest dropped on overflow.
static EVENTS: EventRing<KeyEvent, 64> = EventRing::new();

static DECODER: Mutex<Decoder> = Mutex::new(Decoder::new());

/// Feed one scancode byte. Called from the IRQ1 handler (exactly one byte
/// per interrupt) and from polling bring-up paths.
pub fn handle_scancode(byte: u8) {
    let event = {
        let mut decoder = DECODER.lock();
        decoder.feed(byte, active_layout().table())
    };
    if let Some(event) = event {
        EVENTS.push(event);
        if event.symbol == ETX {
            interrupts::raise(Signal::CtrlC);
        }
    }
}

/// Current latched modifier set.
pub fn modifiers() -> Modifiers {
    crate::arch::without_interrupts(|| DECODER.lock().modifiers())
}

/// Non-blocking event read; masks the IRQ producer around the ring access.
pub fn poll_event() -> Option<KeyEvent> {
    crate::arch::without_interrupts(|| EVENTS.pop())
}

/// Non-blocking symbol read.
pub fn poll_char() -> Option<u8> {
    poll_event().map(|e| e.symbol)
}

/// Blocking event read, spinning on poll.
pub fn read_event() -> KeyEvent {
    loop {
        if let Some(event) = poll_event() {
            return event;
        }
        core::hint::spin_loop();
    }
}

/// Blocking symbol read.
pub fn read_char() -> u8 {
    read_event().symbol
}
