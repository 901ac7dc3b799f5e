pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Configuration error: {message}")]
	Configuration { message: String },
	#[error("Provider rejected the credentials.")]
	Authentication,
	#[error("Provider rate limit exceeded.")]
	RateLimited,
	#[error("Extraction failed: {message}")]
	Extraction { message: String },
	#[error("Upstream unavailable: {message}")]
	UpstreamUnavailable { message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
}
impl From<quill_providers::Error> for Error {
	fn from(err: quill_providers::Error) -> Self {
		match err {
			quill_providers::Error::Configuration { message } => Self::Configuration { message },
			quill_providers::Error::Authentication { .. } => Self::Authentication,
			quill_providers::Error::RateLimited { .. } => Self::RateLimited,
			quill_providers::Error::Unavailable { message } =>
				Self::UpstreamUnavailable { message },
			err @ (quill_providers::Error::Rejected { .. }
			| quill_providers::Error::InvalidResponse { .. }) =>
				Self::Provider { message: err.to_string() },
		}
	}
}
impl From<quill_storage::Error> for Error {
	fn from(err: quill_storage::Error) -> Self {
		Self::UpstreamUnavailable { message: err.to_string() }
	}
}
impl From<quill_domain::Error> for Error {
	fn from(err: quill_domain::Error) -> Self {
		match err {
			quill_domain::Error::Extraction { message } => Self::Extraction { message },
			quill_domain::Error::Timestamp { message } => Self::InvalidRequest { message },
		}
	}
}
