use std::{
    fs::File,
    io::{self, BufWriter, Write},
};

use tracing::debug;

use crate::error::Result;

/// Output destination that stands for standard output
pub const STDOUT_MARKER: &str = "--";

/// Opens `path` for writing, truncating it, or standard output for [`STDOUT_MARKER`]
///
/// # Errors
/// Errors when the file cannot be created
pub fn open_or_stdout(path: &str) -> Result<Box<dyn Write>> {
    if path == STDOUT_MARKER {
        debug!("Writing to standard output");
        return Ok(Box::new(io::stdout().lock()));
    }

    debug!("Writing to {path}");
    Ok(Box::new(BufWriter::new(File::create(path)?)))
}

/// Writes `contents` to `path` (see [`open_or_stdout`]) and flushes it
///
/// # Errors
/// Errors when the destination cannot be opened or written to
pub fn write_output(path: &str, contents: &str) -> Result<()> {
    let mut out = open_or_stdout(path)?;
    out.write_all(contents.as_bytes())?;
    out.flush()?;
    Ok(())
}
