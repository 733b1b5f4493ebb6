use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

use filetime::FileTime;

use crate::{EntryKind, FileHandle, FileSystem, FsError, Scheme, path};

/// The `file:` backend, a thin layer over `std::fs`.
///
/// Paths are the same absolute, slash-separated strings the rest of the
/// workspace uses; the backend assumes a unix-style path space. Ownership
/// names are resolved through the system user and group databases; on
/// platforms without them the owner and group fields come back empty and
/// ownership writes are rejected.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFs;

impl LocalFs {
    /// Creates the local backend.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl FileSystem for LocalFs {
    fn scheme(&self) -> Scheme {
        Scheme::File
    }

    fn stat(&self, path: &str) -> Result<FileHandle, FsError> {
        let meta = fs::metadata(path).map_err(|e| FsError::from_io(path, e))?;
        let kind = if meta.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        let mtime = FileTime::from_last_modification_time(&meta);
        let mtime_ms = mtime.unix_seconds() * 1000 + i64::from(mtime.nanoseconds()) / 1_000_000;
        let (perms, owner, group) = principal_fields(&meta);
        Ok(FileHandle::new(
            path,
            kind,
            if meta.is_dir() { 0 } else { meta.len() },
            mtime_ms,
            perms,
            owner,
            group,
        ))
    }

    fn exists(&self, path: &str) -> Result<bool, FsError> {
        match fs::metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FsError::from_io(path, e)),
        }
    }

    fn list(&self, path: &str) -> Result<Vec<FileHandle>, FsError> {
        let meta = fs::metadata(path).map_err(|e| FsError::from_io(path, e))?;
        if !meta.is_dir() {
            return Err(FsError::NotADirectory {
                path: path.to_owned(),
            });
        }
        let mut handles = Vec::new();
        let entries = fs::read_dir(path).map_err(|e| FsError::from_io(path, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| FsError::from_io(path, e))?;
            let child = path::join(path, &entry.file_name().to_string_lossy());
            handles.push(self.stat(&child)?);
        }
        Ok(handles)
    }

    fn mkdir(&self, path: &str) -> Result<(), FsError> {
        fs::create_dir_all(path).map_err(|e| FsError::from_io(path, e))
    }

    fn delete(&self, path: &str, recursive: bool) -> Result<(), FsError> {
        let meta = fs::metadata(path).map_err(|e| FsError::from_io(path, e))?;
        let result = if meta.is_dir() {
            if recursive {
                fs::remove_dir_all(path)
            } else {
                fs::remove_dir(path)
            }
        } else {
            fs::remove_file(path)
        };
        result.map_err(|e| FsError::from_io(path, e))
    }

    fn open(&self, path: &str) -> Result<Box<dyn Read + Send>, FsError> {
        let file = fs::File::open(path).map_err(|e| FsError::from_io(path, e))?;
        Ok(Box::new(file))
    }

    fn create(&self, path: &str, overwrite: bool) -> Result<Box<dyn Write + Send>, FsError> {
        let mut options = OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let file = options.open(path).map_err(|e| FsError::from_io(path, e))?;
        Ok(Box::new(file))
    }

    fn set_times(&self, path: &str, mtime_ms: i64) -> Result<(), FsError> {
        let seconds = mtime_ms.div_euclid(1000);
        let nanos = u32::try_from(mtime_ms.rem_euclid(1000)).unwrap_or(0) * 1_000_000;
        let mtime = FileTime::from_unix_time(seconds, nanos);
        filetime::set_file_mtime(Path::new(path), mtime).map_err(|e| FsError::from_io(path, e))
    }

    #[cfg(unix)]
    fn set_permission(&self, path: &str, perms: u32) -> Result<(), FsError> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(perms & 0o7777))
            .map_err(|e| FsError::from_io(path, e))
    }

    #[cfg(not(unix))]
    fn set_permission(&self, _path: &str, _perms: u32) -> Result<(), FsError> {
        Err(FsError::Unsupported {
            op: "set_permission",
            scheme: "file",
        })
    }

    #[cfg(unix)]
    fn set_owner(
        &self,
        path: &str,
        owner: Option<&str>,
        group: Option<&str>,
    ) -> Result<(), FsError> {
        use nix::unistd::{self, Group, User};

        let uid = match owner {
            Some(name) => Some(
                User::from_name(name)
                    .map_err(|e| FsError::from_io(path, e.into()))?
                    .ok_or_else(|| FsError::UnknownPrincipal {
                        name: name.to_owned(),
                        path: path.to_owned(),
                    })?
                    .uid,
            ),
            None => None,
        };
        let gid = match group {
            Some(name) => Some(
                Group::from_name(name)
                    .map_err(|e| FsError::from_io(path, e.into()))?
                    .ok_or_else(|| FsError::UnknownPrincipal {
                        name: name.to_owned(),
                        path: path.to_owned(),
                    })?
                    .gid,
            ),
            None => None,
        };
        unistd::chown(Path::new(path), uid, gid).map_err(|e| FsError::from_io(path, e.into()))
    }

    #[cfg(not(unix))]
    fn set_owner(
        &self,
        _path: &str,
        _owner: Option<&str>,
        _group: Option<&str>,
    ) -> Result<(), FsError> {
        Err(FsError::Unsupported {
            op: "set_owner",
            scheme: "file",
        })
    }

    fn is_directory(&self, path: &str) -> Result<bool, FsError> {
        match fs::metadata(path) {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FsError::from_io(path, e)),
        }
    }
}

#[cfg(unix)]
fn principal_fields(meta: &fs::Metadata) -> (u32, String, String) {
    use nix::unistd::{Gid, Group, Uid, User};
    use std::os::unix::fs::MetadataExt;

    let perms = meta.mode() & 0o7777;
    let owner = User::from_uid(Uid::from_raw(meta.uid()))
        .ok()
        .flatten()
        .map_or_else(|| meta.uid().to_string(), |user| user.name);
    let group = Group::from_gid(Gid::from_raw(meta.gid()))
        .ok()
        .flatten()
        .map_or_else(|| meta.gid().to_string(), |grp| grp.name);
    (perms, owner, group)
}

#[cfg(not(unix))]
fn principal_fields(meta: &fs::Metadata) -> (u32, String, String) {
    let perms = if meta.permissions().readonly() {
        0o444
    } else {
        0o644
    };
    (perms, String::new(), String::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn path_of(p: &std::path::Path) -> String {
        p.to_string_lossy().into_owned()
    }

    #[test]
    fn stat_reports_kind_len_and_mtime() {
        let temp = tempdir().expect("tempdir");
        let file = temp.path().join("data.bin");
        fs::write(&file, b"12345").expect("write");

        let fs = LocalFs::new();
        let handle = fs.stat(&path_of(&file)).expect("stat");
        assert_eq!(handle.kind(), EntryKind::File);
        assert_eq!(handle.len(), 5);
        assert!(handle.mtime_ms() > 0);

        let dir = fs.stat(&path_of(temp.path())).expect("stat dir");
        assert!(dir.is_dir());
        assert_eq!(dir.len(), 0);
    }

    #[test]
    fn list_returns_direct_children() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("a"), b"a").expect("write");
        fs::create_dir(temp.path().join("sub")).expect("mkdir");

        let fs = LocalFs::new();
        let mut names: Vec<String> = fs
            .list(&path_of(temp.path()))
            .expect("list")
            .into_iter()
            .map(|h| h.name().to_owned())
            .collect();
        names.sort();
        assert_eq!(names, ["a", "sub"]);
    }

    #[test]
    fn create_without_overwrite_rejects_existing() {
        let temp = tempdir().expect("tempdir");
        let file = temp.path().join("once");
        fs::write(&file, b"x").expect("write");

        let fs = LocalFs::new();
        let err = match fs.create(&path_of(&file), false) {
            Ok(_) => panic!("must fail"),
            Err(err) => err,
        };
        assert!(matches!(err, FsError::AlreadyExists { .. }));
    }

    #[test]
    fn set_times_round_trips_milliseconds() {
        let temp = tempdir().expect("tempdir");
        let file = temp.path().join("stamped");
        fs::write(&file, b"x").expect("write");

        let fs = LocalFs::new();
        let path = path_of(&file);
        fs.set_times(&path, 1_234_567_890_123).expect("set times");
        let handle = fs.stat(&path).expect("stat");
        assert_eq!(handle.mtime_ms(), 1_234_567_890_123);
    }

    #[test]
    fn glob_expands_star_within_component() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("one.log"), b"1").expect("write");
        fs::write(temp.path().join("two.log"), b"2").expect("write");
        fs::write(temp.path().join("keep.txt"), b"3").expect("write");

        let fs = LocalFs::new();
        let pattern = format!("{}/*.log", path_of(temp.path()));
        let matches = fs.glob(&pattern).expect("glob").expect("some matches");
        let names: Vec<&str> = matches.iter().map(FileHandle::name).collect();
        assert_eq!(names, ["one.log", "two.log"]);

        let none = fs
            .glob(&format!("{}/*.missing", path_of(temp.path())))
            .expect("glob");
        assert!(none.is_none());
    }
}
