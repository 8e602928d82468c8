use std::{
	io::{Read, Write},
	net::TcpStream,
	thread,
	time::Duration,
};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::{Error, Result, protocol::CLIENT_PROTOCOL, response::Frame};

pub trait Transport
where
	Self: Send + Sync,
{
	fn round_trip(&self, request: &[u8]) -> Result<Frame>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
	pub host: String,
	pub port: u16,
	pub retries: u32,
	pub retry_delay: Duration,
}
impl Endpoint {
	pub fn new(host: impl Into<String>, port: u16) -> Self {
		Self { host: host.into(), port, retries: 1, retry_delay: Duration::ZERO }
	}

	pub fn from_config(server: &sphinx_config::Server) -> Self {
		Self {
			host: server.host.clone(),
			port: server.port,
			retries: server.connect_retries,
			retry_delay: Duration::from_millis(server.connect_retry_delay_ms),
		}
	}
}

#[derive(Clone, Debug)]
pub struct TcpTransport {
	endpoint: Endpoint,
}
impl TcpTransport {
	pub fn new(endpoint: Endpoint) -> Self {
		Self { endpoint }
	}

	pub fn endpoint(&self) -> &Endpoint {
		&self.endpoint
	}
}
impl Transport for TcpTransport {
	fn round_trip(&self, request: &[u8]) -> Result<Frame> {
		connect(&self.endpoint)?.send_and_receive(request)
	}
}

#[derive(Debug)]
pub struct Connection {
	stream: TcpStream,
	server_version: u32,
}
impl Connection {
	pub fn server_version(&self) -> u32 {
		self.server_version
	}

	pub fn send_and_receive(mut self, request: &[u8]) -> Result<Frame> {
		self.stream.write_all(request)?;
		self.stream.flush()?;

		let status = self.stream.read_u16::<BigEndian>()?;
		let version = self.stream.read_u16::<BigEndian>()?;
		let expected = self.stream.read_u32::<BigEndian>()?;

		if expected == 0 {
			return Err(Error::EmptyResponse);
		}

		let mut body = Vec::new();
		let read = (&mut self.stream).take(u64::from(expected)).read_to_end(&mut body)?;

		if read < expected as usize {
			return Err(Error::ShortRead { status, version, expected, read });
		}

		tracing::debug!(status, version, len = expected, "Received searchd response.");

		Ok(Frame { status, version, body })
	}
}

pub fn connect(endpoint: &Endpoint) -> Result<Connection> {
	let attempts = endpoint.retries.max(1);
	let mut attempt = 1;
	let mut stream = loop {
		match TcpStream::connect((endpoint.host.as_str(), endpoint.port)) {
			Ok(stream) => break stream,
			Err(err) => {
				tracing::warn!(
					host = %endpoint.host,
					port = endpoint.port,
					attempt,
					attempts,
					error = %err,
					"Connection to searchd failed."
				);

				if attempt >= attempts {
					return Err(Error::Connection {
						host: endpoint.host.clone(),
						port: endpoint.port,
						attempts,
						source: err,
					});
				}

				attempt += 1;

				thread::sleep(endpoint.retry_delay);
			},
		}
	};
	let greeting_failed = |source| Error::Greeting {
		host: endpoint.host.clone(),
		port: endpoint.port,
		source,
	};
	let server_version = stream.read_u32::<BigEndian>().map_err(greeting_failed)?;

	if server_version < 1 {
		return Err(Error::Handshake { version: server_version });
	}

	stream.write_u32::<BigEndian>(CLIENT_PROTOCOL).map_err(greeting_failed)?;

	tracing::debug!(
		host = %endpoint.host,
		port = endpoint.port,
		server_version,
		"Connected to searchd."
	);

	Ok(Connection { stream, server_version })
}
