//! Staging tree assembly and archive creation.
//!
//! The staging tree is rebuilt from nothing on every run so files from an
//! earlier build can never end up in a new archive. The archive is written
//! under a temporary name and renamed into place once complete.

use serde::Serialize;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::error::{Error, Result};
use crate::manifest::{Manifest, PackageMapping};
use crate::source::normalize;
use crate::utils::io as fs_io;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedMapping {
    pub from: String,
    pub to: String,
    pub files: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageOutput {
    pub staging_dir: String,
    pub archive: String,
    pub entries: usize,
    pub staged: Vec<StagedMapping>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
}

pub fn archive_name(version: &str) -> String {
    format!("{}.zip", version)
}

pub fn staging_dir(workspace: &Path, manifest: &Manifest) -> PathBuf {
    normalize(&workspace.join(&manifest.staging_dir))
}

/// Directory receiving the archive: `archive_dir`, else the staging tree's parent.
pub fn archive_dir(workspace: &Path, manifest: &Manifest) -> PathBuf {
    match &manifest.archive_dir {
        Some(dir) => normalize(&workspace.join(dir)),
        None => {
            let staging = staging_dir(workspace, manifest);
            staging
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| workspace.to_path_buf())
        }
    }
}

/// Build the staging tree and compress it into `<version>.zip`.
pub fn package(workspace: &Path, manifest: &Manifest, version: &str) -> Result<PackageOutput> {
    let staging = staging_dir(workspace, manifest);
    let (staged, skipped) = stage(workspace, &staging, &manifest.package)?;

    let dest_dir = archive_dir(workspace, manifest);
    fs_io::ensure_dir(&dest_dir).map_err(|e| {
        Error::package_failed("mkdir", dest_dir.to_string_lossy(), e.to_string())
    })?;

    let archive = dest_dir.join(archive_name(version));
    let entries = write_archive(&staging, &archive)?;
    log_status!("package", "Wrote {} ({} files)", archive.display(), entries);

    Ok(PackageOutput {
        staging_dir: staging.to_string_lossy().to_string(),
        archive: archive.to_string_lossy().to_string(),
        entries,
        staged,
        skipped,
    })
}

/// Recreate `staging` and copy every mapping into it.
///
/// Returns the staged mappings and the `from` paths of skipped optional ones.
pub fn stage(
    workspace: &Path,
    staging: &Path,
    mappings: &[PackageMapping],
) -> Result<(Vec<StagedMapping>, Vec<String>)> {
    fs_io::reset_dir(staging)
        .map_err(|e| Error::package_failed("mkdir", staging.to_string_lossy(), e.to_string()))?;

    let mut staged = Vec::with_capacity(mappings.len());
    let mut skipped = Vec::new();

    for mapping in mappings {
        let from = normalize(&workspace.join(&mapping.from));
        let to = normalize(&staging.join(&mapping.to));

        if !from.exists() {
            if mapping.optional {
                log_status!("package", "Skipping optional {} (not found)", mapping.from);
                skipped.push(mapping.from.clone());
                continue;
            }
            return Err(Error::package_failed(
                "copy",
                from.to_string_lossy(),
                "source path does not exist",
            ));
        }

        let files = copy_path(&from, &to, staging)
            .map_err(|e| Error::package_failed("copy", from.to_string_lossy(), e.to_string()))?;
        log_status!("package", "{} -> {} ({} files)", mapping.from, mapping.to, files);

        staged.push(StagedMapping {
            from: mapping.from.clone(),
            to: mapping.to.clone(),
            files,
        });
    }

    Ok((staged, skipped))
}

/// Copy a file to `to`, or a directory's contents into `to`, recursively.
/// `skip` (the staging tree itself) is never descended into.
fn copy_path(from: &Path, to: &Path, skip: &Path) -> io::Result<usize> {
    if from == skip {
        return Ok(0);
    }

    if !from.is_dir() {
        if let Some(parent) = to.parent() {
            fs_io::ensure_dir(parent)?;
        }
        fs::copy(from, to)?;
        return Ok(1);
    }

    fs_io::ensure_dir(to)?;
    let mut count = 0;
    for entry in sorted_entries(from)? {
        let name = match entry.file_name() {
            Some(name) => name.to_owned(),
            None => continue,
        };
        count += copy_path(&entry, &to.join(name), skip)?;
    }
    Ok(count)
}

fn sorted_entries(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

/// Zip the contents of `root` (not `root` itself) into `archive`.
///
/// Entries are sorted and carry a fixed timestamp, so unchanged inputs give
/// identical archives. Returns the number of file entries.
pub fn write_archive(root: &Path, archive: &Path) -> Result<usize> {
    let fail = |e: &dyn std::fmt::Display| {
        Error::package_failed("archive", archive.to_string_lossy(), e.to_string())
    };

    let mut entries = Vec::new();
    collect_entries(root, root, &mut entries).map_err(|e| fail(&e))?;

    let partial = archive.with_extension("zip.partial");
    let result = (|| -> Result<usize> {
        let file = File::create(&partial).map_err(|e| fail(&e))?;
        let mut zip = ZipWriter::new(file);
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());

        let mut files = 0;
        for (path, name, is_dir) in &entries {
            if *is_dir {
                zip.add_directory(name.as_str(), options).map_err(|e| fail(&e))?;
            } else {
                zip.start_file(name.as_str(), options).map_err(|e| fail(&e))?;
                let mut input = File::open(path).map_err(|e| fail(&e))?;
                io::copy(&mut input, &mut zip).map_err(|e| fail(&e))?;
                files += 1;
            }
        }

        zip.finish().map_err(|e| fail(&e))?;
        fs::rename(&partial, archive).map_err(|e| fail(&e))?;
        Ok(files)
    })();

    if result.is_err() {
        let _ = fs_io::remove_file_if_exists(&partial);
    }
    result
}

/// Depth-first, sorted walk producing `(path, zip entry name, is_dir)`.
fn collect_entries(
    root: &Path,
    dir: &Path,
    out: &mut Vec<(PathBuf, String, bool)>,
) -> io::Result<()> {
    for path in sorted_entries(dir)? {
        let relative = path
            .strip_prefix(root)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if path.is_dir() {
            out.push((path.clone(), format!("{}/", name), true));
            collect_entries(root, &path, out)?;
        } else {
            out.push((path, name, false));
        }
    }
    Ok(())
}
