use reqwest::StatusCode;

pub type Result<T, E = Error> = std::result::Result<T, E>;

const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{message}")]
	Configuration { message: String },
	#[error("Provider rejected the credentials with status {status}.")]
	Authentication { status: u16 },
	#[error("Provider rate limited the request with status {status}.")]
	RateLimited { status: u16, retry_after_ms: Option<u64> },
	#[error("Provider is unavailable: {message}")]
	Unavailable { message: String },
	#[error("Provider rejected the request with status {status}: {message}")]
	Rejected { status: u16, message: String },
	#[error("{message}")]
	InvalidResponse { message: String },
}
impl Error {
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::RateLimited { .. })
	}

	pub(crate) fn invalid_response(message: impl Into<String>) -> Self {
		Self::InvalidResponse { message: message.into() }
	}

	pub(crate) fn configuration(message: impl Into<String>) -> Self {
		Self::Configuration { message: message.into() }
	}

	pub(crate) fn from_status(
		status: StatusCode,
		retry_after_ms: Option<u64>,
		body: &str,
	) -> Self {
		let code = status.as_u16();

		match status {
			StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Authentication { status: code },
			StatusCode::TOO_MANY_REQUESTS => Self::RateLimited { status: code, retry_after_ms },
			status if status.is_server_error() => Self::Unavailable {
				message: format!("status {code}: {}", truncate_body(body)),
			},
			_ => Self::Rejected { status: code, message: truncate_body(body) },
		}
	}
}

impl From<reqwest::Error> for Error {
	fn from(err: reqwest::Error) -> Self {
		if let Some(status) = err.status() {
			return Self::from_status(status, None, "");
		}
		if err.is_decode() {
			return Self::InvalidResponse { message: err.to_string() };
		}
		if err.is_builder() {
			return Self::Configuration { message: err.to_string() };
		}

		Self::Unavailable { message: err.to_string() }
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Self::InvalidResponse { message: err.to_string() }
	}
}

impl From<reqwest::header::InvalidHeaderName> for Error {
	fn from(err: reqwest::header::InvalidHeaderName) -> Self {
		Self::Configuration { message: err.to_string() }
	}
}

impl From<reqwest::header::InvalidHeaderValue> for Error {
	fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
		Self::Configuration { message: err.to_string() }
	}
}

fn truncate_body(body: &str) -> String {
	let trimmed = body.trim();

	if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
		return trimmed.to_string();
	}

	let mut out: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();

	out.push_str("...");

	out
}
