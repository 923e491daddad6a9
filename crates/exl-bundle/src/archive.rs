use std::io::Write;
use std::path::Path;

use crate::error::BundleError;

/// Fixed modification time stamped on every archive entry.
const ENTRY_MTIME: u64 = 0;
/// Fixed permission bits stamped on every archive entry.
const ENTRY_MODE: u32 = 0o644;

/// Write a deterministic tar archive at `dest`.
///
/// Entries are written in the order given, each with the fixed mtime and
/// mode, so two archives built from identical input bytes are themselves
/// byte-identical. The archive is assembled in a temp file next to
/// `dest` and renamed into place; a crash mid-write leaves nothing at
/// the final path.
pub fn write_archive(dest: &Path, entries: &[(&str, &[u8])]) -> Result<(), BundleError> {
    let dest_dir = dest.parent().ok_or_else(|| BundleError::Io {
        path: dest.display().to_string(),
        reason: "destination has no parent directory".into(),
    })?;

    let tmp = tempfile::NamedTempFile::new_in(dest_dir).map_err(|e| BundleError::io(dest, &e))?;
    let mut builder = tar::Builder::new(tmp);

    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(ENTRY_MODE);
        header.set_mtime(ENTRY_MTIME);
        builder
            .append_data(&mut header, name, *data)
            .map_err(|e| BundleError::io(dest, &e))?;
    }

    let mut tmp = builder.into_inner().map_err(|e| BundleError::io(dest, &e))?;
    tmp.flush().map_err(|e| BundleError::io(dest, &e))?;
    tmp.persist(dest).map_err(|e| BundleError::Io {
        path: dest.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_entries(path: &Path) -> Vec<(String, u64, u32, Vec<u8>)> {
        let file = std::fs::File::open(path).unwrap();
        let mut archive = tar::Archive::new(file);
        let mut out = Vec::new();
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            let name = entry.path().unwrap().display().to_string();
            let mtime = entry.header().mtime().unwrap();
            let mode = entry.header().mode().unwrap();
            let mut data = Vec::new();
            std::io::Read::read_to_end(&mut entry, &mut data).unwrap();
            out.push((name, mtime, mode, data));
        }
        out
    }

    #[test]
    fn entries_keep_order_bytes_and_fixed_metadata() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("bundle.tar");
        write_archive(
            &dest,
            &[("manifest.json", b"{}"), ("summary.txt", b"summary body")],
        )
        .unwrap();

        let entries = read_entries(&dest);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "manifest.json");
        assert_eq!(entries[1].0, "summary.txt");
        for (_, mtime, mode, _) in &entries {
            assert_eq!(*mtime, 0);
            assert_eq!(*mode, 0o644);
        }
        assert_eq!(entries[1].3, b"summary body");
    }

    #[test]
    fn identical_inputs_produce_identical_bytes() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.tar");
        let b = dir.path().join("b.tar");
        let entries: &[(&str, &[u8])] = &[("x.txt", b"same"), ("y.txt", b"bytes")];
        write_archive(&a, entries).unwrap();
        write_archive(&b, entries).unwrap();
        assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
    }

    #[test]
    fn no_file_appears_on_failure() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("missing_parent/bundle.tar");
        assert!(write_archive(&dest, &[("x", b"y")]).is_err());
        assert!(!dest.exists());
    }
}
