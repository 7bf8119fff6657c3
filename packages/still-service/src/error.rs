pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Empty input: {message}")]
	EmptyInput { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Timed out: {message}")]
	Timeout { message: String },
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<still_storage::Error> for Error {
	fn from(err: still_storage::Error) -> Self {
		match err {
			still_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			still_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			still_storage::Error::NotFound(message) => Self::NotFound { message },
		}
	}
}

impl From<still_providers::Error> for Error {
	fn from(err: still_providers::Error) -> Self {
		match err {
			still_providers::Error::EmptyInput { message } => Self::EmptyInput { message },
			other => Self::Provider { message: other.to_string() },
		}
	}
}
