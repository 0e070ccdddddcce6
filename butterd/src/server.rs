// SPDX-License-Identifier: GPL-3.0-only

use std::io::{BufRead, Write};

use butter_types::Request;

use crate::error::{DaemonError, Result};
use crate::handlers::Handlers;

/// Serve requests from `reader` until it is exhausted.
///
/// One reply line is written and flushed per request before the next line is
/// read. An unknown or malformed request ends the loop with
/// [`DaemonError::BadRequest`]. A failed enumeration ends it with
/// [`DaemonError::Btrfs`].
pub fn serve<R: BufRead, W: Write>(handlers: &Handlers, mut reader: R, mut writer: W) -> Result<()> {
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            tracing::debug!("End of input, shutting down");
            return Ok(());
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let request = Request::parse(trimmed).map_err(|source| DaemonError::BadRequest {
            line: trimmed.to_string(),
            source,
        })?;
        tracing::debug!("Handling {}", request.command());

        let reply = handlers.handle(&request)?;
        serde_json::to_writer(&mut writer, &reply)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
}
