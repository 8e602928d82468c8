use std::{fmt, sync::Arc};

use crate::{
	Error, Result,
	excerpt::ExcerptRequest,
	protocol::CommandVersion,
	request::SearchRequest,
	response::{self, QueryResult},
	transport::{Endpoint, TcpTransport, Transport},
	update::UpdateRequest,
};

#[derive(Clone)]
pub struct Client {
	transport: Arc<dyn Transport>,
	version: CommandVersion,
}
impl Client {
	pub fn from_config(server: &sphinx_config::Server) -> Result<Self> {
		let version = server.protocol.parse()?;
		let transport = TcpTransport::new(Endpoint::from_config(server));

		Ok(Self::with_transport(Arc::new(transport), version))
	}

	pub fn with_transport(transport: Arc<dyn Transport>, version: CommandVersion) -> Self {
		Self { transport, version }
	}

	pub fn version(&self) -> CommandVersion {
		self.version
	}

	pub fn search(&self, request: &SearchRequest) -> Result<QueryResult> {
		let encoded = request.encode(self.version)?;

		tracing::debug!(
			version = %self.version,
			indexes = %request.indexes,
			bytes = encoded.len(),
			"Sending search request."
		);

		let frame = self.transport.round_trip(&encoded)?;
		let result = response::decode_search(&frame, self.version)?;

		if let Some(warning) = &result.warning {
			tracing::warn!(indexes = %request.indexes, %warning, "searchd returned a warning.");
		}

		Ok(result)
	}

	pub async fn search_async(&self, request: SearchRequest) -> Result<QueryResult> {
		let client = self.clone();

		tokio::task::spawn_blocking(move || client.search(&request))
			.await
			.map_err(|err| Error::Blocking { message: err.to_string() })?
	}

	pub fn build_excerpts(&self, request: &ExcerptRequest) -> Result<Vec<String>> {
		if request.documents.is_empty() {
			return Ok(Vec::new());
		}

		let frame = self.transport.round_trip(&request.encode()?)?;

		request.decode(&frame)
	}

	pub fn update_attributes(&self, request: &UpdateRequest) -> Result<u32> {
		let frame = self.transport.round_trip(&request.encode()?)?;
		let updated = request.decode(&frame)?;

		tracing::debug!(index = %request.index, updated, "Attributes updated.");

		Ok(updated)
	}
}
impl fmt::Debug for Client {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Client").field("version", &self.version).finish_non_exhaustive()
	}
}
