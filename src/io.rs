//! Catalog file access.

use std::{
    fs::File,
    io::{self, BufWriter, Read, Write},
    path::Path,
};

use crate::error::Error;

/// Reads a catalog, decoding UTF-16 and UTF-8 byte order marks.
///
/// Returns `Ok(None)` when the file does not exist; every other I/O failure is
/// an error.
pub fn read_to_string_if_exists<P: AsRef<Path>>(path: P) -> Result<Option<String>, Error> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::Io(e)),
    };
    // Auto-detect BOM, decode to UTF-8; passthrough UTF-8
    let mut decoder = encoding_rs_io::DecodeReaderBytesBuilder::new()
        .bom_override(true)
        .strip_bom(true)
        .build(file);

    let mut decoded = String::new();
    decoder.read_to_string(&mut decoded).map_err(Error::Io)?;
    Ok(Some(decoded))
}

/// Reads a catalog that must exist.
pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String, Error> {
    let path = path.as_ref();
    read_to_string_if_exists(path)?.ok_or_else(|| {
        Error::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        ))
    })
}

/// Writes catalog text as UTF-8, replacing the file.
pub fn write_catalog<P: AsRef<Path>>(path: P, content: &str) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(content.as_bytes())?;
    writer.flush()?;
    Ok(())
}
