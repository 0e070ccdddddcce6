// SPDX-License-Identifier: GPL-3.0-only

//! Wire models for the butter subvolume daemon
//!
//! The daemon speaks newline-delimited JSON on stdin/stdout. Each request is
//! an array whose first element names the command; each reply is a single
//! JSON value. These types are shared by the daemon and any client that
//! drives it.

pub mod listing;
pub mod request;

pub use listing::{CREATION_TIME_FORMAT, SubvolumeListing, format_creation_time};
pub use request::{Request, RequestError};
