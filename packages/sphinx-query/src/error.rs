pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Wire(#[from] sphinx_wire::Error),

	#[error("{message}")]
	Unsupported { message: String },

	#[error("Invalid query: {message}")]
	InvalidQuery { message: String },

	#[error("Negative indexing is not supported (got {index}).")]
	NegativeIndex { index: i64 },

	#[error("No record fetcher is registered for {attribute} = {value}.")]
	UnknownDiscriminator { attribute: String, value: u64 },
}
impl Error {
	pub(crate) fn invalid(message: impl Into<String>) -> Self {
		Self::InvalidQuery { message: message.into() }
	}
}
