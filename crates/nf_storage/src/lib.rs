use nf_core::{ArticleStorage, Error, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

pub mod backends;

pub use backends::*;

/// Which `ArticleStorage` implementation to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    #[default]
    Sqlite,
    Memory,
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(Error::Config(format!("Unknown storage backend: {}", other))),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Open a store. `db_path` is only used by file-backed backends.
pub async fn create_storage(kind: StorageKind, db_path: &Path) -> Result<Arc<dyn ArticleStorage>> {
    match kind {
        #[cfg(feature = "sqlite")]
        StorageKind::Sqlite => Ok(Arc::new(SQLiteStorage::new_with_path(db_path).await?)),
        #[cfg(not(feature = "sqlite"))]
        StorageKind::Sqlite => {
            let _ = db_path;
            Err(Error::Config("built without the sqlite feature".to_string()))
        }
        StorageKind::Memory => Ok(Arc::new(MemoryStorage::new())),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, StorageKind};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_kind_parsing() {
        assert_eq!("sqlite".parse::<StorageKind>().unwrap(), StorageKind::Sqlite);
        assert_eq!("Memory".parse::<StorageKind>().unwrap(), StorageKind::Memory);
        assert!("qdrant".parse::<StorageKind>().is_err());
        assert_eq!(StorageKind::default().to_string(), "sqlite");
    }

    #[tokio::test]
    async fn test_create_memory_storage() {
        let storage = create_storage(StorageKind::Memory, Path::new("unused.db")).await.unwrap();
        assert_eq!(storage.count().await.unwrap(), 0);
    }
}
