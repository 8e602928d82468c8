pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Connection to {host}:{port} failed after {attempts} attempt(s) ({source}).")]
	Connection { host: String, port: u16, attempts: u32, source: std::io::Error },
	#[error("Greeting from {host}:{port} failed ({source}).")]
	Greeting { host: String, port: u16, source: std::io::Error },
	#[error("Expected searchd protocol version 1 or greater, got {version}.")]
	Handshake { version: u32 },
	#[error("searchd error: {message}")]
	Daemon { message: String },
	#[error("temporary searchd error: {message}")]
	Retry { message: String },
	#[error("unknown status code {status}")]
	UnknownStatus { status: u32 },
	#[error("failed to read searchd response (status={status}, ver={version}, len={expected}, read={read})")]
	ShortRead { status: u16, version: u16, expected: u32, read: usize },
	#[error("received zero-sized searchd response")]
	EmptyResponse,
	#[error("Malformed searchd response: {message}")]
	Malformed { message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Blocking search task failed: {message}")]
	Blocking { message: String },
	#[error(transparent)]
	Io(#[from] std::io::Error),
}
impl Error {
	pub fn is_connection(&self) -> bool {
		matches!(self, Self::Connection { .. } | Self::Greeting { .. } | Self::Handshake { .. })
	}

	pub fn is_protocol(&self) -> bool {
		matches!(
			self,
			Self::Daemon { .. }
				| Self::Retry { .. }
				| Self::UnknownStatus { .. }
				| Self::ShortRead { .. }
				| Self::EmptyResponse
				| Self::Malformed { .. }
				| Self::Io(_)
		)
	}

	pub(crate) fn malformed(message: impl Into<String>) -> Self {
		Self::Malformed { message: message.into() }
	}

	pub(crate) fn invalid(message: impl Into<String>) -> Self {
		Self::InvalidRequest { message: message.into() }
	}
}
