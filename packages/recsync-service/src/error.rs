use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to read {path:?}.")]
	ReadSource {
		path: PathBuf,
		#[source]
		source: csv::Error,
	},
	#[error("Failed to write {path:?}.")]
	WriteArtifact {
		path: PathBuf,
		#[source]
		source: csv::Error,
	},
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error(transparent)]
	Store(#[from] recsync_store::Error),
	#[error(transparent)]
	Write(#[from] recsync_store::WriteError),
}
impl Error {
	/// Batches committed before the run stopped, when the failure came from a bulk write.
	pub fn committed_batches(&self) -> Option<usize> {
		match self {
			Self::Write(err) => Some(err.committed_batches),
			_ => None,
		}
	}
}
