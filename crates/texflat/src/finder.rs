//! Resolution of import references to files.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use texflat_common::{FileSystem, RealFileSystem};

use crate::error::{Error, Result};
use crate::trace::SourceId;

/// Resolves author-written references against the file that contains them
/// and reads the targets.
///
/// Candidates are tried in this order, first existing file wins:
///
/// 1. the reference taken as an absolute path (when it is one),
/// 2. relative to the directory of the calling file,
/// 3. relative to the document root,
/// 4. relative to each ancestor directory of the calling file, walking up
///    to the file system root.
///
/// At every step a `.tex` suffix is also tried when the reference has no
/// suffix of its own. Candidate paths are normalized lexically; the
/// normalized path of the winning candidate becomes the target's canonical
/// source identifier.
///
/// The finder reads through the [FileSystem] abstraction, so tests can run
/// it against an in-memory tree.
pub struct FileFinder {
    root_dir: PathBuf,
    file_system: Box<dyn FileSystem>,
}

impl FileFinder {
    /// A finder over the real file system. `root_dir` is the directory of
    /// the document's root file.
    pub fn new<P: Into<PathBuf>>(root_dir: P) -> FileFinder {
        FileFinder::with_file_system(root_dir, Box::new(RealFileSystem))
    }

    pub fn with_file_system<P: Into<PathBuf>>(
        root_dir: P,
        file_system: Box<dyn FileSystem>,
    ) -> FileFinder {
        FileFinder {
            root_dir: normalize(&root_dir.into()),
            file_system,
        }
    }

    /// Read the document's root file. Only path normalization is applied;
    /// the root is the one file the author names directly.
    pub fn read_root(&self, path: &Path) -> Result<(SourceId, String)> {
        let normalized = normalize(path);
        if !self.file_system.exists(&normalized) {
            return Err(Error::FileNotFound {
                reference: path.display().to_string(),
                tried: vec![normalized],
            });
        }
        self.read(normalized)
    }

    /// Resolve `reference` against `calling_source` and read the target.
    pub fn fetch(&self, reference: &str, calling_source: &SourceId) -> Result<(SourceId, String)> {
        let mut tried = Vec::new();
        for candidate in self.candidates(reference, calling_source) {
            if self.file_system.exists(&candidate) {
                return self.read(candidate);
            }
            tried.push(candidate);
        }
        Err(Error::FileNotFound {
            reference: reference.to_string(),
            tried,
        })
    }

    fn read(&self, path: PathBuf) -> Result<(SourceId, String)> {
        let content = self
            .file_system
            .read_to_string(&path)
            .map_err(|source| Error::Io {
                path: path.clone(),
                source,
            })?;
        Ok((SourceId::new(path.to_string_lossy()), content))
    }

    /// All candidate paths for a reference, in resolution order, without
    /// duplicates.
    fn candidates(&self, reference: &str, calling_source: &SourceId) -> Vec<PathBuf> {
        let reference_path = Path::new(reference);
        let mut candidates = CandidateList::default();
        if reference_path.is_absolute() {
            candidates.push_with_suffix(normalize(reference_path));
        }
        let calling_dir = Path::new(calling_source.as_str())
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .to_path_buf();
        candidates.push_with_suffix(normalize(&calling_dir.join(reference_path)));
        candidates.push_with_suffix(normalize(&self.root_dir.join(reference_path)));
        let mut dir = calling_dir.as_path();
        while let Some(parent) = dir.parent() {
            candidates.push_with_suffix(normalize(&parent.join(reference_path)));
            dir = parent;
        }
        candidates.into_paths()
    }
}

#[derive(Default)]
struct CandidateList {
    paths: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl CandidateList {
    /// Add a candidate and, when it carries no suffix, its `.tex` variant.
    fn push_with_suffix(&mut self, path: PathBuf) {
        if path.extension().is_none() {
            let with_tex = path.with_extension("tex");
            self.push(path);
            self.push(with_tex);
        } else {
            self.push(path);
        }
    }

    fn push(&mut self, path: PathBuf) {
        if self.seen.insert(path.clone()) {
            self.paths.push(path);
        }
    }

    fn into_paths(self) -> Vec<PathBuf> {
        self.paths
    }
}

/// Lexically normalize a path: fold `.` and `..` components without
/// touching the file system.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `..` above the root stays at the root
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            _ => out.push(component.as_os_str()),
        }
    }
    out
}
