pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Extraction failed: {message}")]
	Extraction { message: String },
	#[error("Invalid timestamp: {message}")]
	Timestamp { message: String },
}
