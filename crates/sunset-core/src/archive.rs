//! Tombstone tarball packaging: a ustar archive of in-memory files, gzipped.
//!
//! Each entry is a 512-byte header (mode `0644`, uid/gid 0, mtime now) followed
//! by the content padded to the block size. Two zero blocks close the archive.

use std::collections::BTreeMap;
use std::io::{self, Write};

use flate2::{Compression, GzBuilder};
use tar::{Builder, EntryType, Header};

/// Archive block size.
pub const BLOCK_SIZE: usize = 512;

/// Longest entry path stored; the name field keeps one byte for its terminator.
pub const MAX_PATH_LEN: usize = 99;

/// Build the gzipped archive for `files` (path to UTF-8 content).
pub fn build(files: &BTreeMap<String, String>) -> io::Result<Vec<u8>> {
    let tar = build_tar(files)?;

    let mut encoder = GzBuilder::new()
        .operating_system(255)
        .write(Vec::with_capacity(tar.len() / 2), Compression::default());
    encoder.write_all(&tar)?;
    encoder.finish()
}

/// Build the uncompressed archive.
pub fn build_tar(files: &BTreeMap<String, String>) -> io::Result<Vec<u8>> {
    let mtime = chrono::Utc::now().timestamp().max(0) as u64;
    let mut builder = Builder::new(Vec::new());

    for (path, content) in files {
        let header = entry_header(path, content.len() as u64, mtime)?;
        builder.append(&header, content.as_bytes())?;
    }

    builder.into_inner()
}

fn entry_header(path: &str, size: u64, mtime: u64) -> io::Result<Header> {
    let mut header = Header::new_ustar();
    header.set_path(truncate_path(path))?;
    header.set_size(size);
    header.set_mode(0o644);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(mtime);
    header.set_entry_type(EntryType::Regular);
    header.set_cksum();
    Ok(header)
}

fn truncate_path(path: &str) -> &str {
    if path.len() <= MAX_PATH_LEN {
        return path;
    }
    let mut end = MAX_PATH_LEN;
    while !path.is_char_boundary(end) {
        end -= 1;
    }
    &path[..end]
}
