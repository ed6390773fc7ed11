//! Lark PortKit
//!
//! Architecture-agnostic pieces shared by Lark ports and board support
//! packages: the reentrant critical section counter, the interrupt handler
//! table, byte ring buffers, and the arithmetic used to program timers and
//! baud-rate generators.
#![deny(unsafe_op_in_unsafe_fn)]
#![cfg_attr(not(test), no_std)]

pub mod baud;
pub mod critical;
pub mod dispatch;
pub mod periodic;
pub mod ringbuf;
pub mod utils;
