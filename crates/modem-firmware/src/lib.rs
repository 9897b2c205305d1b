//! ESP32-S3 firmware-specific modules for the modem controller
//!
//! This crate contains hardware-specific code that cannot compile on desktop
//! targets: GPIO and UART setup for the Si2457 and the embassy loops that
//! drive the controller's tick handlers.

#![no_std]

pub mod board;
pub mod tasks;
