use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::{Error, Result};

#[derive(Debug, Default)]
pub(crate) struct BodyWriter {
	buf: Vec<u8>,
}
impl BodyWriter {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	pub(crate) fn u32(&mut self, value: u32) -> &mut Self {
		let _ = self.buf.write_u32::<BigEndian>(value);

		self
	}

	pub(crate) fn u64(&mut self, value: u64) -> &mut Self {
		let _ = self.buf.write_u64::<BigEndian>(value);

		self
	}

	pub(crate) fn f32(&mut self, value: f32) -> &mut Self {
		let _ = self.buf.write_f32::<BigEndian>(value);

		self
	}

	pub(crate) fn length(&mut self, len: usize) -> Result<&mut Self> {
		let len = u32::try_from(len)
			.map_err(|_| Error::invalid(format!("length {len} does not fit in 32 bits.")))?;

		Ok(self.u32(len))
	}

	pub(crate) fn bytes(&mut self, value: &[u8]) -> Result<&mut Self> {
		self.length(value.len())?;
		self.buf.extend_from_slice(value);

		Ok(self)
	}

	pub(crate) fn str(&mut self, value: &str) -> Result<&mut Self> {
		self.bytes(value.as_bytes())
	}

	pub(crate) fn finish(self) -> Vec<u8> {
		self.buf
	}
}

pub(crate) fn frame(
	command: u16,
	version: u16,
	body: &[u8],
	request_count: Option<u32>,
) -> Result<Vec<u8>> {
	let extra = if request_count.is_some() { 4 } else { 0 };
	let len = u32::try_from(body.len() + extra)
		.map_err(|_| Error::invalid("request body does not fit in 32 bits."))?;
	let mut out = Vec::with_capacity(8 + extra + body.len());
	let _ = out.write_u16::<BigEndian>(command);
	let _ = out.write_u16::<BigEndian>(version);
	let _ = out.write_u32::<BigEndian>(len);

	if let Some(count) = request_count {
		let _ = out.write_u32::<BigEndian>(count);
	}

	out.extend_from_slice(body);

	Ok(out)
}

pub(crate) struct BodyReader<'a> {
	cursor: Cursor<&'a [u8]>,
}
impl<'a> BodyReader<'a> {
	pub(crate) fn new(body: &'a [u8]) -> Self {
		Self { cursor: Cursor::new(body) }
	}

	pub(crate) fn u32(&mut self, what: &str) -> Result<u32> {
		self.cursor.read_u32::<BigEndian>().map_err(|_| truncated(what))
	}

	pub(crate) fn u64(&mut self, what: &str) -> Result<u64> {
		self.cursor.read_u64::<BigEndian>().map_err(|_| truncated(what))
	}

	pub(crate) fn f32(&mut self, what: &str) -> Result<f32> {
		self.cursor.read_f32::<BigEndian>().map_err(|_| truncated(what))
	}

	pub(crate) fn bytes(&mut self, what: &str) -> Result<&'a [u8]> {
		let len = self.u32(what)? as usize;
		let start = self.cursor.position() as usize;
		let body = *self.cursor.get_ref();
		let end = start
			.checked_add(len)
			.filter(|end| *end <= body.len())
			.ok_or_else(|| truncated(what))?;

		self.cursor.set_position(end as u64);

		Ok(&body[start..end])
	}

	pub(crate) fn string(&mut self, what: &str) -> Result<String> {
		Ok(String::from_utf8_lossy(self.bytes(what)?).into_owned())
	}

	pub(crate) fn rest(&self) -> &'a [u8] {
		let body = *self.cursor.get_ref();
		let position = (self.cursor.position() as usize).min(body.len());

		&body[position..]
	}
}

fn truncated(what: &str) -> Error {
	Error::malformed(format!("response ended while reading {what}."))
}
