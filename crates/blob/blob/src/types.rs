use std::fmt;

/// A blob address: a named disk plus a relative path inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobLocation {
    pub disk: String,
    pub path: String,
}

impl BlobLocation {
    pub fn new(disk: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            disk: disk.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for BlobLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.disk, self.path)
    }
}
