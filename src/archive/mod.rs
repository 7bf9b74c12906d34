//! Archive codec for moving a snapshot store around as a single blob.
//!
//! A store is packed into a zip container: one stored entry per directory
//! (so empty directories survive) and one deflated entry per file. Unix
//! permission bits and modification times are recorded on a best-effort basis.
//!
//! Packing always goes through a temporary file that is deleted on drop, so a
//! failed pack never leaves a half-written archive behind. Unpacking writes
//! straight into the destination; callers unpack into a fresh directory and
//! swap it into place themselves.

mod error;

use std::fs::{self, File};
use std::io::{self, BufReader, Cursor, Read, Seek, Write};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use chrono::{Datelike, NaiveDate, Timelike, Utc};
use filetime::FileTime;
use tempfile::NamedTempFile;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub use error::{PackError, UnpackError};

/// File extension used for packed snapshot archives.
pub const ARCHIVE_EXTENSION: &str = "zip";

const S_IFMT: u32 = 0o170000;
const S_IFREG: u32 = 0o100000;
const S_IFDIR: u32 = 0o040000;

/// A packed archive living in a temporary file.
///
/// The file is removed when this value is dropped unless it was persisted.
#[derive(Debug)]
pub struct PackedArchive {
    file: NamedTempFile,
    entries: usize,
}

impl PackedArchive {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Number of files and directories recorded in the archive.
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    /// Size of the archive in bytes.
    pub fn size(&self) -> io::Result<u64> {
        Ok(self.file.as_file().metadata()?.len())
    }

    /// Move the archive to its final location.
    ///
    /// `destination` must be on the same filesystem as the temporary file.
    pub fn persist(self, destination: &Path) -> Result<(), PackError> {
        self.file
            .persist(destination)
            .map_err(|e| PackError::Io(e.error))?;
        Ok(())
    }
}

/// Pack `source` into a temporary archive in the system temp directory.
pub fn pack(source: &Path) -> Result<PackedArchive, PackError> {
    pack_in(source, &std::env::temp_dir())
}

/// Pack `source` into a temporary archive created inside `scratch_dir`.
pub fn pack_in(source: &Path, scratch_dir: &Path) -> Result<PackedArchive, PackError> {
    ensure_directory(source)?;

    let mut file = tempfile::Builder::new()
        .prefix(".tapedeck-pack-")
        .suffix(&format!(".{ARCHIVE_EXTENSION}"))
        .tempfile_in(scratch_dir)?;
    // The scratch dir may sit inside `source`; never pack the archive into itself.
    let exclude = relative_inside(source, file.path());
    let entries = write_tree(source, file.as_file_mut(), exclude.as_deref())?;
    file.as_file().sync_all()?;

    tracing::info!(
        source = %source.display(),
        entries,
        "Packed snapshot directory"
    );
    Ok(PackedArchive { file, entries })
}

/// Pack `source` and atomically place the archive at `destination`.
///
/// Returns the number of entries written.
pub fn pack_to_path(source: &Path, destination: &Path) -> Result<usize, PackError> {
    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let packed = pack_in(source, &parent)?;
    let entries = packed.entry_count();
    packed.persist(destination)?;
    Ok(entries)
}

/// Pack `source` into an in-memory buffer.
pub fn pack_to_vec(source: &Path) -> Result<Vec<u8>, PackError> {
    ensure_directory(source)?;
    let mut buffer = Cursor::new(Vec::new());
    write_tree(source, &mut buffer, None)?;
    Ok(buffer.into_inner())
}

fn ensure_directory(source: &Path) -> Result<(), PackError> {
    if !source.is_dir() {
        return Err(PackError::NotADirectory(source.to_path_buf()));
    }
    Ok(())
}

/// `path` relative to `root` when it lies inside it.
fn relative_inside(root: &Path, path: &Path) -> Option<PathBuf> {
    let root = fs::canonicalize(root).ok()?;
    let path = fs::canonicalize(path).ok()?;
    path.strip_prefix(&root).ok().map(Path::to_path_buf)
}

/// Write every entry under `source` except `exclude` (relative to `source`).
fn write_tree<W: Write + Seek>(
    source: &Path,
    writer: W,
    exclude: Option<&Path>,
) -> Result<usize, PackError> {
    let mut zip = ZipWriter::new(writer);
    let mut entries = 0;

    for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        if exclude.is_some() && entry.path().strip_prefix(source).ok() == exclude {
            continue;
        }
        let name = archive_name(source, entry.path())?;
        let metadata = entry.metadata()?;
        let options = entry_options(&metadata);

        if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
        } else if entry.file_type().is_file() {
            zip.start_file(name, options)?;
            let mut file = File::open(entry.path())?;
            io::copy(&mut file, &mut zip)?;
        } else {
            tracing::warn!(
                path = %entry.path().display(),
                "Skipping unsupported entry while packing"
            );
            continue;
        }
        entries += 1;
    }

    let mut writer = zip.finish()?;
    writer.flush()?;
    Ok(entries)
}

/// Relative, `/`-separated entry name for `path` under `root`.
fn archive_name(root: &Path, path: &Path) -> Result<String, PackError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| PackError::NonUtf8Path(path.to_path_buf()))?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(
                part.to_str()
                    .ok_or_else(|| PackError::NonUtf8Path(path.to_path_buf()))?,
            ),
            _ => return Err(PackError::NonUtf8Path(path.to_path_buf())),
        }
    }
    Ok(parts.join("/"))
}

fn entry_options(metadata: &fs::Metadata) -> FileOptions {
    let mut options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        options = options.unix_permissions(metadata.permissions().mode() & 0o777);
    }
    if let Ok(modified) = metadata.modified() {
        options = options.last_modified_time(to_dos_time(modified));
    }
    options
}

fn to_dos_time(time: SystemTime) -> zip::DateTime {
    let utc: chrono::DateTime<Utc> = time.into();
    u16::try_from(utc.year())
        .ok()
        .and_then(|year| {
            zip::DateTime::from_date_and_time(
                year,
                utc.month() as u8,
                utc.day() as u8,
                utc.hour() as u8,
                utc.minute() as u8,
                utc.second() as u8,
            )
            .ok()
        })
        .unwrap_or_default()
}

fn to_file_time(time: zip::DateTime) -> Option<FileTime> {
    let date = NaiveDate::from_ymd_opt(
        i32::from(time.year()),
        u32::from(time.month()),
        u32::from(time.day()),
    )?;
    let naive = date.and_hms_opt(
        u32::from(time.hour()),
        u32::from(time.minute()),
        u32::from(time.second()),
    )?;
    Some(FileTime::from_unix_time(naive.and_utc().timestamp(), 0))
}

/// How to treat archive entries the codec cannot recreate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnpackOptions {
    /// Skip unsupported entries with a warning instead of failing.
    pub ignore_unsupported: bool,
}

impl Default for UnpackOptions {
    fn default() -> Self {
        Self {
            ignore_unsupported: true,
        }
    }
}

impl UnpackOptions {
    /// Fail on the first unsupported entry.
    pub fn strict() -> Self {
        Self {
            ignore_unsupported: false,
        }
    }
}

/// What an unpack produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UnpackSummary {
    pub files: usize,
    pub directories: usize,
    /// Names of entries that were skipped as unsupported.
    pub skipped: Vec<String>,
}

enum EntryKind {
    Directory,
    File,
    Unsupported(&'static str),
}

/// Unpack the archive at `archive` into `destination` with the lenient policy.
pub fn unpack(archive: &Path, destination: &Path) -> Result<UnpackSummary, UnpackError> {
    unpack_with(archive, destination, UnpackOptions::default())
}

pub fn unpack_with(
    archive: &Path,
    destination: &Path,
    options: UnpackOptions,
) -> Result<UnpackSummary, UnpackError> {
    let file = File::open(archive)?;
    unpack_from_reader(BufReader::new(file), destination, options)
}

/// Unpack an archive read from `reader` into `destination`.
pub fn unpack_from_reader<R: Read + Seek>(
    reader: R,
    destination: &Path,
    options: UnpackOptions,
) -> Result<UnpackSummary, UnpackError> {
    let mut archive = ZipArchive::new(reader)?;
    fs::create_dir_all(destination)?;

    let mut summary = UnpackSummary::default();
    // Directory metadata is applied last; writing children would clobber it.
    let mut directories = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = entry.name().to_string();

        let relative = entry.enclosed_name().map(Path::to_path_buf);
        let kind = match relative {
            None => EntryKind::Unsupported("path escapes destination"),
            Some(_) => classify(entry.is_dir(), entry.unix_mode()),
        };
        let relative = relative.unwrap_or_default();
        let out_path = destination.join(&relative);

        match kind {
            EntryKind::Unsupported(reason) => {
                if !options.ignore_unsupported {
                    return Err(UnpackError::UnsupportedEntry(name));
                }
                tracing::warn!(entry = %name, reason, "Skipping unsupported archive entry");
                summary.skipped.push(name);
            }
            EntryKind::Directory => {
                fs::create_dir_all(&out_path)?;
                directories.push((out_path, entry.unix_mode(), entry.last_modified()));
                summary.directories += 1;
            }
            EntryKind::File => {
                if let Some(parent) = out_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut out = File::create(&out_path)?;
                io::copy(&mut entry, &mut out)?;
                out.flush()?;
                drop(out);
                apply_metadata(&out_path, entry.unix_mode(), entry.last_modified());
                summary.files += 1;
            }
        }
    }

    for (path, mode, modified) in directories.into_iter().rev() {
        apply_metadata(&path, mode, modified);
    }

    tracing::info!(
        destination = %destination.display(),
        files = summary.files,
        directories = summary.directories,
        skipped = summary.skipped.len(),
        "Unpacked snapshot archive"
    );
    Ok(summary)
}

fn classify(is_dir: bool, unix_mode: Option<u32>) -> EntryKind {
    if is_dir {
        return EntryKind::Directory;
    }
    match unix_mode.map(|mode| mode & S_IFMT) {
        None | Some(0) | Some(S_IFREG) => EntryKind::File,
        Some(S_IFDIR) => EntryKind::Directory,
        Some(_) => EntryKind::Unsupported("special file type"),
    }
}

fn apply_metadata(path: &Path, unix_mode: Option<u32>, modified: zip::DateTime) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Some(mode) = unix_mode {
            let permissions = fs::Permissions::from_mode(mode & 0o777);
            if let Err(e) = fs::set_permissions(path, permissions) {
                tracing::debug!(path = %path.display(), error = %e, "Failed to restore permissions");
            }
        }
    }
    #[cfg(not(unix))]
    let _ = unix_mode;

    if let Some(mtime) = to_file_time(modified) {
        if let Err(e) = filetime::set_file_mtime(path, mtime) {
            tracing::debug!(path = %path.display(), error = %e, "Failed to restore mtime");
        }
    }
}
