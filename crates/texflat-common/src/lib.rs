//! Common abstractions used in Texflat
//!
//! The flattening engine resolves and reads many files during a single run.
//! These operations are extracted to a trait so that they can be mocked out
//! in unit testing and in execution contexts without a real file system.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// File system operations the flattening engine may need to perform.
pub trait FileSystem {
    /// Whether `path` names an existing regular file.
    fn exists(&self, path: &Path) -> bool;

    /// Read the entire contents of a file into a string.
    ///
    /// This is implemented by [std::fs::read_to_string].
    fn read_to_string(&self, path: &Path) -> std::io::Result<String>;
}

/// Implementation of the file system trait that uses the real file system.
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// In-memory file system for use in unit tests.
///
/// This type mocks out the file system operations of the engine.
/// It provides an in-memory system to which "files" can be added before the
/// test runs.
///
/// ```
/// use texflat_common::{FileSystem, InMemoryFileSystem};
/// let mut file_system = InMemoryFileSystem::default();
/// file_system.add_file("chapters/intro.tex", "Hello");
/// assert!(file_system.exists(std::path::Path::new("chapters/intro.tex")));
/// ```
#[derive(Default)]
pub struct InMemoryFileSystem {
    files: HashMap<PathBuf, String>,
}

impl InMemoryFileSystem {
    /// Add a file to the in-memory file system.
    pub fn add_file<P: Into<PathBuf>, S: Into<String>>(&mut self, path: P, content: S) {
        self.files.insert(path.into(), content.into());
    }
}

impl FileSystem for InMemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }
    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        match self.files.get(path) {
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "not found",
            )),
            Some(content) => Ok(content.clone()),
        }
    }
}
