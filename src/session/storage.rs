//! Key/value storage for state that must survive between invocations (stashed client id,
//! access-token cookie).

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::_prelude::*;

/// Key under which the client identifier is stashed before the authorize redirect.
pub const STASHED_CLIENT_ID_KEY: &str = "supabase_client_id";

/// Error type produced by [`ClientStorage`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum StorageError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Synchronous string key/value store.
pub trait ClientStorage
where
	Self: Send + Sync,
{
	/// Returns the value stored under `key`.
	fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

	/// Stores `value` under `key`, replacing any previous value.
	fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

	/// Removes `key`; absent keys are not an error.
	fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Thread-safe in-process storage for tests and embedding.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage(Arc<RwLock<BTreeMap<String, String>>>);
impl ClientStorage for MemoryStorage {
	fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
		Ok(self.0.read().get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
		self.0.write().insert(key.to_owned(), value.to_owned());

		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), StorageError> {
		self.0.write().remove(key);

		Ok(())
	}
}

/// Persists entries to a JSON object file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStorage {
	path: PathBuf,
	inner: Arc<RwLock<BTreeMap<String, String>>>,
}
impl FileStorage {
	/// Opens (or creates) storage at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
		let path = path.into();

		ensure_parent_exists(&path)?;

		let snapshot = load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn persist_locked(&self, contents: &BTreeMap<String, String>) -> Result<(), StorageError> {
		ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StorageError::Serialization {
				message: format!("Failed to serialize storage snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StorageError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StorageError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StorageError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StorageError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl ClientStorage for FileStorage {
	fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
		Ok(self.inner.read().get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
		let mut guard = self.inner.write();

		guard.insert(key.to_owned(), value.to_owned());

		self.persist_locked(&guard)
	}

	fn remove(&self, key: &str) -> Result<(), StorageError> {
		let mut guard = self.inner.write();

		if guard.remove(key).is_none() {
			return Ok(());
		}

		self.persist_locked(&guard)
	}
}

fn load_snapshot(path: &Path) -> Result<BTreeMap<String, String>, StorageError> {
	if !path.exists() {
		return Ok(BTreeMap::new());
	}

	let bytes = fs::read(path).map_err(|e| StorageError::Backend {
		message: format!("Failed to read {}: {e}", path.display()),
	})?;

	if bytes.is_empty() {
		return Ok(BTreeMap::new());
	}

	serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization {
		message: format!("Failed to parse {}: {e}", path.display()),
	})
}

fn ensure_parent_exists(path: &Path) -> Result<(), StorageError> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(|e| StorageError::Backend {
			message: format!("Failed to create storage directory {}: {e}", parent.display()),
		})?;
	}

	Ok(())
}
