use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::{fs, io::Write};

/// Sibling temp path used while a write is in flight: `<file>.tmp`.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("state"), ToOwned::to_owned);
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replace `path` with `bytes` so that a crash leaves either the old or the new content.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = temp_path(path);
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(tmp, path)
}
