//! Error types for the migration system.

use groundwork_sql::SqlError;

/// Errors that can occur while applying changesets.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Database error outside of a changeset, e.g. while creating the
    /// changelog table.
    #[error(transparent)]
    Sql(#[from] SqlError),

    /// IO error (reading changeset files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A changeset name exceeds the changelog column size.
    #[error("changeset name {name:?} is too long (max. {max} characters)")]
    NameTooLong {
        /// The offending name.
        name: String,
        /// The maximum number of characters.
        max: usize,
    },

    /// A changeset was already applied, but its queries changed since.
    #[error("changeset {name:?} was applied with hash {recorded}, but its queries now hash to {current}")]
    Drift {
        /// The changeset name.
        name: String,
        /// The hash stored in the changelog.
        recorded: String,
        /// The hash of the current queries.
        current: String,
    },

    /// Applying a changeset failed.
    #[error("changeset {name:?}: {source}")]
    Changeset {
        /// The changeset name.
        name: String,
        /// What went wrong.
        #[source]
        source: Box<MigrateError>,
    },
}

impl MigrateError {
    /// Returns the name of the changeset this error is about, if any.
    #[must_use]
    pub fn changeset(&self) -> Option<&str> {
        match self {
            Self::NameTooLong { name, .. }
            | Self::Drift { name, .. }
            | Self::Changeset { name, .. } => Some(name),
            Self::Sql(_) | Self::Io(_) => None,
        }
    }

    /// Returns whether this is a [`MigrateError::Drift`].
    #[must_use]
    pub const fn is_drift(&self) -> bool {
        matches!(self, Self::Drift { .. })
    }

    /// Attaches a changeset name, unless the error already names one.
    pub(crate) fn in_changeset(self, name: &str) -> Self {
        if self.changeset().is_some() {
            return self;
        }

        Self::Changeset {
            name: name.to_string(),
            source: Box::new(self),
        }
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_changeset_wraps_once() {
        let err = MigrateError::from(SqlError::NotFound).in_changeset("0001.sql");
        assert_eq!(err.changeset(), Some("0001.sql"));
        assert_eq!(
            err.to_string(),
            r#"changeset "0001.sql": no rows in result set"#
        );

        let err = err.in_changeset("other");
        assert_eq!(err.changeset(), Some("0001.sql"));
    }

    #[test]
    fn test_drift_is_not_wrapped() {
        let err = MigrateError::Drift {
            name: "2".into(),
            recorded: "a".into(),
            current: "b".into(),
        }
        .in_changeset("2");

        assert!(err.is_drift());
        assert_eq!(err.changeset(), Some("2"));
    }
}
