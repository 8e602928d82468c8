mod error;

pub use error::{Error, Result};

use std::{
	io::{Read, Write},
	net::{SocketAddr, TcpListener, TcpStream},
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	thread,
};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use tracing_subscriber::EnvFilter;

pub const VER_SEARCH_1_19: u16 = 0x113;
pub const VER_SEARCH_1_7: u16 = 0x107;
pub const ATTR_INTEGER: u32 = 1;
pub const ATTR_FLOAT: u32 = 5;
pub const ATTR_MULTI: u32 = 0x4000_0001;

const STATUS_OK: u16 = 0;
const STATUS_ERROR: u16 = 1;
const STATUS_WARNING: u16 = 3;

pub fn init_tracing() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
	let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
}

#[derive(Clone, Debug)]
pub enum Reply {
	Frame { status: u16, version: u16, body: Vec<u8> },
	Truncated { status: u16, version: u16, declared: u32, body: Vec<u8> },
	Handshake(u32),
	Hangup,
}
impl Reply {
	pub fn ok(body: Vec<u8>) -> Self {
		Self::Frame { status: STATUS_OK, version: VER_SEARCH_1_19, body }
	}

	pub fn ok_with_version(version: u16, body: Vec<u8>) -> Self {
		Self::Frame { status: STATUS_OK, version, body }
	}

	pub fn warning(message: &str, body: Vec<u8>) -> Self {
		let mut out = Vec::new();

		put_str(&mut out, message);
		out.extend_from_slice(&body);

		Self::Frame { status: STATUS_WARNING, version: VER_SEARCH_1_19, body: out }
	}

	pub fn error(message: &str) -> Self {
		let mut body = Vec::new();

		put_str(&mut body, message);

		Self::Frame { status: STATUS_ERROR, version: VER_SEARCH_1_19, body }
	}

	pub fn strings(snippets: &[&str]) -> Self {
		let mut body = Vec::new();

		for snippet in snippets {
			put_str(&mut body, snippet);
		}

		Self::Frame { status: STATUS_OK, version: 0x100, body }
	}
}

/// Scripted searchd on an ephemeral loopback port. Each accepted connection consumes the next
/// reply; once the script is exhausted the listener closes.
pub struct FakeSearchd {
	addr: SocketAddr,
	connections: Arc<AtomicUsize>,
	requests: Arc<Mutex<Vec<Vec<u8>>>>,
}
impl FakeSearchd {
	pub fn spawn(replies: Vec<Reply>) -> Result<Self> {
		let listener = TcpListener::bind("127.0.0.1:0")?;
		let addr = listener.local_addr()?;
		let connections = Arc::new(AtomicUsize::new(0));
		let requests = Arc::new(Mutex::new(Vec::new()));
		let thread_connections = connections.clone();
		let thread_requests = requests.clone();

		thread::Builder::new().name("fake-searchd".to_string()).spawn(move || {
			for reply in replies {
				let Ok((stream, _)) = listener.accept() else {
					return;
				};

				thread_connections.fetch_add(1, Ordering::SeqCst);

				if let Err(err) = serve(stream, reply, &thread_requests) {
					tracing::debug!(error = %err, "Fake searchd connection ended early.");
				}
			}
		})?;

		Ok(Self { addr, connections, requests })
	}

	pub fn host(&self) -> String {
		self.addr.ip().to_string()
	}

	pub fn port(&self) -> u16 {
		self.addr.port()
	}

	pub fn connections(&self) -> usize {
		self.connections.load(Ordering::SeqCst)
	}

	pub fn requests(&self) -> Vec<Vec<u8>> {
		self.requests.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}

pub fn closed_port() -> Result<u16> {
	let listener = TcpListener::bind("127.0.0.1:0")?;
	let port = listener.local_addr()?.port();

	drop(listener);

	Ok(port)
}

fn serve(mut stream: TcpStream, reply: Reply, requests: &Mutex<Vec<Vec<u8>>>) -> Result<()> {
	match reply {
		Reply::Handshake(version) => {
			stream.write_u32::<BigEndian>(version)?;

			return Ok(());
		},
		Reply::Hangup => return Ok(()),
		_ => {},
	}

	stream.write_u32::<BigEndian>(1)?;

	let client_version = stream.read_u32::<BigEndian>()?;

	if client_version != 1 {
		return Err(Error::Message(format!("Unexpected client version {client_version}.")));
	}

	let mut header = [0; 8];

	stream.read_exact(&mut header)?;

	let len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
	let mut body = vec![0; len as usize];

	stream.read_exact(&mut body)?;

	let mut request = header.to_vec();

	request.extend_from_slice(&body);
	requests.lock().unwrap_or_else(|err| err.into_inner()).push(request);

	let (status, version, declared, body) = match reply {
		Reply::Frame { status, version, body } => (status, version, body.len() as u32, body),
		Reply::Truncated { status, version, declared, body } => (status, version, declared, body),
		Reply::Handshake(_) | Reply::Hangup => return Ok(()),
	};

	stream.write_u16::<BigEndian>(status)?;
	stream.write_u16::<BigEndian>(version)?;
	stream.write_u32::<BigEndian>(declared)?;
	stream.write_all(&body)?;
	stream.flush()?;

	Ok(())
}

#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
	Uint(u32),
	Float(f32),
	Multi(Vec<u32>),
}

#[derive(Clone, Debug)]
pub struct ResponseBuilder {
	legacy: bool,
	query_status: Option<(u32, String)>,
	fields: Vec<String>,
	attrs: Vec<(String, u32)>,
	matches: Vec<(u64, u32, Vec<Cell>)>,
	totals: Option<(u32, u32, u32)>,
	words: Vec<(String, u32, u32)>,
}
impl ResponseBuilder {
	pub fn v1_19() -> Self {
		Self {
			legacy: false,
			query_status: None,
			fields: Vec::new(),
			attrs: Vec::new(),
			matches: Vec::new(),
			totals: None,
			words: Vec::new(),
		}
	}

	pub fn v1_7() -> Self {
		Self { legacy: true, ..Self::v1_19() }
	}

	pub fn field(mut self, name: &str) -> Self {
		self.fields.push(name.to_string());

		self
	}

	pub fn attr(mut self, name: &str, kind: u32) -> Self {
		self.attrs.push((name.to_string(), kind));

		self
	}

	pub fn matched(mut self, id: u64, weight: u32, cells: Vec<Cell>) -> Self {
		self.matches.push((id, weight, cells));

		self
	}

	pub fn totals(mut self, total: u32, total_found: u32, time_ms: u32) -> Self {
		self.totals = Some((total, total_found, time_ms));

		self
	}

	pub fn word(mut self, word: &str, docs: u32, hits: u32) -> Self {
		self.words.push((word.to_string(), docs, hits));

		self
	}

	pub fn query_status(mut self, status: u32, message: &str) -> Self {
		self.query_status = Some((status, message.to_string()));

		self
	}

	pub fn build(self) -> Vec<u8> {
		let mut out = Vec::new();

		if !self.legacy {
			match &self.query_status {
				Some((status, message)) => {
					put_u32(&mut out, *status);
					put_str(&mut out, message);

					if *status == 1 || *status == 2 {
						return out;
					}
				},
				None => put_u32(&mut out, 0),
			}
		}

		put_u32(&mut out, self.fields.len() as u32);

		for field in &self.fields {
			put_str(&mut out, field);
		}

		put_u32(&mut out, self.attrs.len() as u32);

		for (name, kind) in &self.attrs {
			put_str(&mut out, name);
			put_u32(&mut out, *kind);
		}

		put_u32(&mut out, self.matches.len() as u32);

		if !self.legacy {
			put_u32(&mut out, 1);
		}

		for (id, weight, cells) in &self.matches {
			if self.legacy {
				put_u32(&mut out, *id as u32);
			} else {
				let _ = out.write_u64::<BigEndian>(*id);
			}

			put_u32(&mut out, *weight);

			for cell in cells {
				match cell {
					Cell::Uint(value) => put_u32(&mut out, *value),
					Cell::Float(value) => {
						let _ = out.write_f32::<BigEndian>(*value);
					},
					Cell::Multi(values) => {
						put_u32(&mut out, values.len() as u32);

						for value in values {
							put_u32(&mut out, *value);
						}
					},
				}
			}
		}

		let count = self.matches.len() as u32;
		let (total, total_found, time_ms) = self.totals.unwrap_or((count, count, 0));

		put_u32(&mut out, total);
		put_u32(&mut out, total_found);
		put_u32(&mut out, time_ms);
		put_u32(&mut out, self.words.len() as u32);

		for (word, docs, hits) in &self.words {
			put_str(&mut out, word);
			put_u32(&mut out, *docs);
			put_u32(&mut out, *hits);
		}

		out
	}
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
	let _ = out.write_u32::<BigEndian>(value);
}

fn put_str(out: &mut Vec<u8>, value: &str) {
	put_u32(out, value.len() as u32);
	out.extend_from_slice(value.as_bytes());
}
