//! Changesets: named units of schema-changing SQL.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

/// A named series of queries advancing the database schema.
///
/// The name identifies the changeset in the changelog and must stay stable
/// once it was applied. The queries are hashed to detect later changes.
pub trait Changeset {
    /// Returns the name of the changeset.
    fn name(&self) -> &str;

    /// Returns the queries as raw SQL.
    ///
    /// The queries are run without arguments, so a literal `@` must be
    /// written as `@@`.
    fn queries(&self) -> Result<Cow<'_, str>>;
}

impl<C: Changeset + ?Sized> Changeset for &C {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn queries(&self) -> Result<Cow<'_, str>> {
        (**self).queries()
    }
}

impl<C: Changeset + ?Sized> Changeset for Box<C> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn queries(&self) -> Result<Cow<'_, str>> {
        (**self).queries()
    }
}

/// A changeset with its queries held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralChangeset {
    name: String,
    queries: String,
}

impl LiteralChangeset {
    /// Creates a new literal changeset.
    #[must_use]
    pub fn new(name: impl Into<String>, queries: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queries: queries.into(),
        }
    }
}

impl Changeset for LiteralChangeset {
    fn name(&self) -> &str {
        &self.name
    }

    fn queries(&self) -> Result<Cow<'_, str>> {
        Ok(Cow::Borrowed(&self.queries))
    }
}

/// A changeset read from a `.sql` file when its queries are needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChangeset {
    name: String,
    path: PathBuf,
}

impl FileChangeset {
    /// Creates a changeset for `path`, named after the file name.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { name, path }
    }

    /// Returns the path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Changeset for FileChangeset {
    fn name(&self) -> &str {
        &self.name
    }

    fn queries(&self) -> Result<Cow<'_, str>> {
        Ok(Cow::Owned(fs::read_to_string(&self.path)?))
    }
}

/// Loads all regular `*.sql` files of a directory, sorted by file name.
///
/// Subdirectories and other files are ignored. The files are not read until
/// their queries are needed.
pub fn load_dir(dir: impl AsRef<Path>) -> Result<Vec<FileChangeset>> {
    let dir = dir.as_ref();
    let mut changesets = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();

        if file_type.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
            changesets.push(FileChangeset::new(path));
        }
    }

    changesets.sort_by(|a, b| a.name.cmp(&b.name));

    debug!(dir = %dir.display(), count = changesets.len(), "Loaded changesets");
    Ok(changesets)
}
