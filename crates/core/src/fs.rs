use std::fs::{self, File, FileTimes};
use std::io;
use std::path::{Path, PathBuf};

/// The directory operations a batch needs. Names are plain entry names
/// relative to the directory; no traversal happens through this interface.
pub trait Directory {
    fn list_names(&self) -> io::Result<Vec<String>>;
    fn exists(&self, name: &str) -> io::Result<bool>;
    /// True when both names denote one physical file, e.g. `CaSe1q` and
    /// `case1q` on a case-preserving filesystem.
    fn is_same_file(&self, a: &str, b: &str) -> io::Result<bool>;
    fn rename(&self, from: &str, to: &str) -> io::Result<()>;
    /// Copies content, permission bits and access/modification times.
    fn copy_with_metadata(&self, from: &str, to: &str) -> io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct OsDirectory {
    root: PathBuf,
}

impl OsDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn current() -> Self {
        Self::new(".")
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Directory for OsDirectory {
    fn list_names(&self) -> io::Result<Vec<String>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            match entry.file_name().into_string() {
                Ok(name) => out.push(name),
                Err(raw) => log::warn!("skipping entry with non UTF-8 name: {raw:?}"),
            }
        }
        out.sort();
        Ok(out)
    }

    fn exists(&self, name: &str) -> io::Result<bool> {
        match fs::symlink_metadata(self.path(name)) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn is_same_file(&self, a: &str, b: &str) -> io::Result<bool> {
        if a.to_lowercase() != b.to_lowercase() {
            return Ok(false);
        }
        same_identity(&self.path(a), &self.path(b))
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        fs::rename(self.path(from), self.path(to))
    }

    fn copy_with_metadata(&self, from: &str, to: &str) -> io::Result<()> {
        let mut reader = File::open(self.path(from))?;
        let metadata = reader.metadata()?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{from} is not a regular file"),
            ));
        }

        // never truncate an existing entry, including the source itself
        let target = self.path(to);
        let mut writer = File::options().write(true).create_new(true).open(&target)?;
        if let Err(err) = fill_copy(&mut reader, &mut writer, &metadata) {
            drop(writer);
            if let Err(cleanup) = fs::remove_file(&target) {
                log::warn!("could not remove partial copy {}: {cleanup}", target.display());
            }
            return Err(err);
        }
        Ok(())
    }
}

fn fill_copy(reader: &mut File, writer: &mut File, metadata: &fs::Metadata) -> io::Result<()> {
    io::copy(reader, writer)?;
    let times = FileTimes::new()
        .set_accessed(metadata.accessed()?)
        .set_modified(metadata.modified()?);
    writer.set_times(times)?;
    writer.set_permissions(metadata.permissions())
}

#[cfg(unix)]
fn same_identity(a: &Path, b: &Path) -> io::Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let a = fs::metadata(a)?;
    let b = fs::metadata(b)?;
    Ok(a.dev() == b.dev() && a.ino() == b.ino())
}

#[cfg(not(unix))]
fn same_identity(a: &Path, b: &Path) -> io::Result<bool> {
    Ok(fs::canonicalize(a)? == fs::canonicalize(b)?)
}

#[cfg(test)]
pub(crate) mod memory {
    use super::Directory;
    use std::cell::RefCell;
    use std::io;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Entry {
        name: String,
        id: u64,
        content: String,
    }

    /// In-memory directory. With `case_preserving` set, lookups ignore case
    /// while listing keeps the stored spelling, like APFS or NTFS.
    #[derive(Debug, Default)]
    pub(crate) struct MemoryDirectory {
        entries: RefCell<Vec<Entry>>,
        next_id: RefCell<u64>,
        case_preserving: bool,
        pub(crate) mutations: RefCell<usize>,
    }

    impl MemoryDirectory {
        pub(crate) fn new(names: &[&str]) -> Self {
            Self::build(names, false)
        }

        pub(crate) fn case_preserving(names: &[&str]) -> Self {
            Self::build(names, true)
        }

        fn build(names: &[&str], case_preserving: bool) -> Self {
            let dir = Self {
                case_preserving,
                ..Self::default()
            };
            for name in names {
                if dir.find(name).is_none() {
                    dir.insert(name, name);
                }
            }
            dir
        }

        pub(crate) fn names(&self) -> Vec<String> {
            let mut names: Vec<String> = self
                .entries
                .borrow()
                .iter()
                .map(|e| e.name.clone())
                .collect();
            names.sort();
            names
        }

        pub(crate) fn content(&self, name: &str) -> Option<String> {
            let idx = self.find(name)?;
            Some(self.entries.borrow()[idx].content.clone())
        }

        fn insert(&self, name: &str, content: &str) {
            let mut next_id = self.next_id.borrow_mut();
            *next_id += 1;
            self.entries.borrow_mut().push(Entry {
                name: name.to_string(),
                id: *next_id,
                content: content.to_string(),
            });
        }

        fn matches(&self, stored: &str, wanted: &str) -> bool {
            if self.case_preserving {
                stored.to_lowercase() == wanted.to_lowercase()
            } else {
                stored == wanted
            }
        }

        fn find(&self, name: &str) -> Option<usize> {
            self.entries
                .borrow()
                .iter()
                .position(|e| self.matches(&e.name, name))
        }

        fn not_found(name: &str) -> io::Error {
            io::Error::new(io::ErrorKind::NotFound, format!("no entry named {name}"))
        }
    }

    impl Directory for MemoryDirectory {
        fn list_names(&self) -> io::Result<Vec<String>> {
            Ok(self.names())
        }

        fn exists(&self, name: &str) -> io::Result<bool> {
            Ok(self.find(name).is_some())
        }

        fn is_same_file(&self, a: &str, b: &str) -> io::Result<bool> {
            if a.to_lowercase() != b.to_lowercase() {
                return Ok(false);
            }
            let a = self.find(a).ok_or_else(|| Self::not_found(a))?;
            let b = self.find(b).ok_or_else(|| Self::not_found(b))?;
            let entries = self.entries.borrow();
            Ok(entries[a].id == entries[b].id)
        }

        fn rename(&self, from: &str, to: &str) -> io::Result<()> {
            *self.mutations.borrow_mut() += 1;
            let src = self.find(from).ok_or_else(|| Self::not_found(from))?;
            if let Some(dst) = self.find(to) {
                if dst != src {
                    self.entries.borrow_mut().remove(dst);
                }
            }
            let src = self.find(from).ok_or_else(|| Self::not_found(from))?;
            self.entries.borrow_mut()[src].name = to.to_string();
            Ok(())
        }

        fn copy_with_metadata(&self, from: &str, to: &str) -> io::Result<()> {
            *self.mutations.borrow_mut() += 1;
            let content = self.content(from).ok_or_else(|| Self::not_found(from))?;
            self.insert(to, &content);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    #[test]
    fn list_names_is_sorted_and_includes_directories() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("b"), b"b").expect("write b");
        fs::write(temp.path().join("a"), b"a").expect("write a");
        fs::create_dir(temp.path().join("c")).expect("create dir");

        let dir = OsDirectory::new(temp.path());
        assert_eq!(dir.list_names().expect("list"), vec!["a", "b", "c"]);
    }

    #[test]
    fn exists_and_rename() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("old"), b"x").expect("write");

        let dir = OsDirectory::new(temp.path());
        assert!(dir.exists("old").expect("exists"));
        dir.rename("old", "new").expect("rename");
        assert!(!dir.exists("old").expect("exists"));
        assert!(dir.exists("new").expect("exists"));
    }

    #[test]
    fn same_file_requires_case_insensitive_name_match() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("one"), b"x").expect("write");
        fs::hard_link(temp.path().join("one"), temp.path().join("two")).expect("hard link");

        let dir = OsDirectory::new(temp.path());
        assert!(dir.is_same_file("one", "one").expect("same"));
        assert!(!dir.is_same_file("one", "two").expect("same"));
    }

    #[test]
    fn copy_with_metadata_preserves_content_and_mtime() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("source");
        fs::write(&source, b"payload").expect("write");
        let past = SystemTime::now() - Duration::from_secs(86_400);
        File::options()
            .write(true)
            .open(&source)
            .expect("open")
            .set_modified(past)
            .expect("set mtime");

        let dir = OsDirectory::new(temp.path());
        dir.copy_with_metadata("source", "target")
            .expect("copy");

        let target = temp.path().join("target");
        assert_eq!(fs::read(&target).expect("read"), b"payload");
        assert!(source.exists());
        let copied = fs::metadata(&target)
            .expect("metadata")
            .modified()
            .expect("mtime");
        assert_eq!(copied, past);
    }

    #[test]
    fn copy_with_metadata_refuses_to_overwrite() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("source"), b"new").expect("write source");
        fs::write(temp.path().join("target"), b"old").expect("write target");

        let dir = OsDirectory::new(temp.path());
        let err = dir
            .copy_with_metadata("source", "target")
            .expect_err("target exists");
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(temp.path().join("target")).expect("read"), b"old");
    }

    #[test]
    fn copy_with_metadata_rejects_directory_without_leaving_target() {
        let temp = tempdir().expect("tempdir");
        fs::create_dir(temp.path().join("dir1")).expect("create dir");

        let dir = OsDirectory::new(temp.path());
        dir.copy_with_metadata("dir1", "copy1")
            .expect_err("directory source");
        assert_eq!(dir.list_names().expect("list"), vec!["dir1"]);
    }

    #[test]
    fn memory_directory_simulates_case_preserving_lookup() {
        let dir = memory::MemoryDirectory::case_preserving(&["CaSe1q", "case1q"]);
        assert_eq!(dir.names(), vec!["CaSe1q"]);
        assert!(dir.exists("CASE1Q").expect("exists"));
        assert!(dir.is_same_file("case1q", "CaSe1q").expect("same"));
        dir.rename("CaSe1q", "case1q").expect("rename");
        assert_eq!(dir.names(), vec!["case1q"]);
    }
}
