// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Decodes the gzip-compressed tar archive the API surface receives as
//! `sourceCode` (spec.md §6: `POST /v1/apps` body `{..., sourceCode
//! (base64 tarball), ...}`) into the flat path-to-contents map the
//! deploy pipeline's [`crate::pipeline::DetectStep`] and buildpacks
//! operate on.

use std::collections::BTreeMap;
use std::io::Read;

use flate2::read::GzDecoder;

use crate::error::AppManagerError;

/// Caps the number of entries a single tarball may unpack into, independent
/// of the byte-size cap `AppManager::validate` already enforces — a
/// pathological archive of many empty files would otherwise sail through
/// the size check.
const MAX_ENTRIES: usize = 10_000;

pub fn decode_tar_gz(bytes: &[u8]) -> Result<BTreeMap<String, Vec<u8>>, AppManagerError> {
    let decoder = GzDecoder::new(bytes);
    let mut archive = tar::Archive::new(decoder);
    let mut files = BTreeMap::new();

    let entries = archive.entries().map_err(|e| AppManagerError::BuildFailed(format!("malformed source tarball: {e}")))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| AppManagerError::BuildFailed(format!("malformed source tarball entry: {e}")))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        if files.len() >= MAX_ENTRIES {
            return Err(AppManagerError::BuildFailed(format!("source tarball exceeds {MAX_ENTRIES} entries")));
        }
        let path = entry.path().map_err(|e| AppManagerError::BuildFailed(format!("invalid path in source tarball: {e}")))?.to_string_lossy().into_owned();
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).map_err(|e| AppManagerError::BuildFailed(format!("failed to read source tarball entry {path}: {e}")))?;
        files.insert(path, contents);
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn build_tar_gz(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, contents) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *contents).unwrap();
        }
        let tar_bytes = builder.into_inner().unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&tar_bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn decodes_a_simple_archive() {
        let archive = build_tar_gz(&[("Procfile", b"web: node index.js"), ("package.json", b"{}")]);
        let files = decode_tar_gz(&archive).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files.get("Procfile").unwrap(), b"web: node index.js");
    }

    #[test]
    fn rejects_garbage_bytes() {
        let err = decode_tar_gz(b"not a tarball").unwrap_err();
        assert!(matches!(err, AppManagerError::BuildFailed(_)));
    }
}
