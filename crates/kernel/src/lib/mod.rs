// Kernel support library: errors, logging, formatting, freestanding string
// routines.

pub mod error;
pub mod fmt;
pub mod printk;
pub mod string;
