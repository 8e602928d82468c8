use std::time::Duration;

use crate::{
	Error, Result,
	codec::BodyReader,
	protocol::{AttrType, CommandVersion, Status},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
	pub status: u16,
	pub version: u16,
	pub body: Vec<u8>,
}
impl Frame {
	pub fn open(&self, client_version: u16) -> Result<(&[u8], Option<String>)> {
		let status = Status::from_code(u32::from(self.status))
			.ok_or(Error::UnknownStatus { status: u32::from(self.status) })?;
		let mut reader = BodyReader::new(&self.body);

		match status {
			Status::Ok => {},
			Status::Warning => {
				let warning = reader.string("warning message")?;

				return Ok((reader.rest(), Some(warning)));
			},
			Status::Error => return Err(Error::Daemon { message: message_after_length(&self.body) }),
			Status::Retry => return Err(Error::Retry { message: message_after_length(&self.body) }),
		}

		let warning = (self.version < client_version).then(|| {
			format!(
				"searchd command v.{}.{} older than client's v.{}.{}, some options might not work",
				self.version >> 8,
				self.version & 0xff,
				client_version >> 8,
				client_version & 0xff
			)
		});

		Ok((&self.body, warning))
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Match {
	pub id: u64,
	pub weight: u32,
	pub attrs: Vec<(String, AttrValue)>,
}
impl Match {
	pub fn attr(&self, name: &str) -> Option<&AttrValue> {
		self.attrs.iter().find(|(attr, _)| attr == name).map(|(_, value)| value)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
	Uint(u32),
	Float(f32),
	Multi(Vec<u32>),
}
impl AttrValue {
	pub fn as_u64(&self) -> Option<u64> {
		match self {
			Self::Uint(value) => Some(u64::from(*value)),
			_ => None,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttrSchema {
	pub name: String,
	pub kind: AttrType,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordStats {
	pub word: String,
	pub docs: u32,
	pub hits: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryResult {
	pub fields: Vec<String>,
	pub attrs: Vec<AttrSchema>,
	pub matches: Vec<Match>,
	pub total: u32,
	pub total_found: u32,
	pub time_ms: u32,
	pub words: Vec<WordStats>,
	pub warning: Option<String>,
}
impl QueryResult {
	pub fn elapsed(&self) -> Duration {
		Duration::from_millis(u64::from(self.time_ms))
	}

	pub fn elapsed_secs(&self) -> f64 {
		f64::from(self.time_ms) / 1_000.0
	}

	pub fn has_attr(&self, name: &str) -> bool {
		self.attrs.iter().any(|attr| attr.name == name)
	}

	pub fn keywords(&self) -> String {
		self.words.iter().map(|word| word.word.as_str()).collect::<Vec<_>>().join(" ")
	}
}

pub fn decode_search(frame: &Frame, version: CommandVersion) -> Result<QueryResult> {
	let (payload, envelope_warning) = frame.open(version.as_u16())?;
	let mut reader = BodyReader::new(payload);
	let mut query_warning = None;

	if version == CommandVersion::V1_19 {
		let code = reader.u32("query status")?;

		match Status::from_code(code) {
			Some(Status::Ok) => {},
			Some(Status::Warning) => query_warning = Some(reader.string("query warning")?),
			Some(Status::Error) => {
				return Err(Error::Daemon { message: reader.string("query error")? });
			},
			Some(Status::Retry) => {
				return Err(Error::Retry { message: reader.string("query error")? });
			},
			None => return Err(Error::UnknownStatus { status: code }),
		}
	}

	let mut result = QueryResult::default();
	let field_count = reader.u32("field count")?;

	for _ in 0..field_count {
		result.fields.push(reader.string("field name")?);
	}

	let attr_count = reader.u32("attribute count")?;

	for _ in 0..attr_count {
		let name = reader.string("attribute name")?;
		let kind = AttrType::from_code(reader.u32("attribute type")?);

		result.attrs.push(AttrSchema { name, kind });
	}

	let match_count = reader.u32("match count")?;
	let wide_ids = match version {
		CommandVersion::V1_7 => false,
		CommandVersion::V1_19 => reader.u32("id64 flag")? != 0,
	};

	for _ in 0..match_count {
		let id =
			if wide_ids { reader.u64("document id")? } else { u64::from(reader.u32("document id")?) };
		let weight = reader.u32("match weight")?;
		let mut attrs = Vec::with_capacity(result.attrs.len());

		for schema in &result.attrs {
			let value = match schema.kind {
				AttrType::Float => AttrValue::Float(reader.f32(&schema.name)?),
				AttrType::Multi => {
					let count = reader.u32(&schema.name)?;
					let mut values = Vec::with_capacity(count.min(1_024) as usize);

					for _ in 0..count {
						values.push(reader.u32(&schema.name)?);
					}

					AttrValue::Multi(values)
				},
				_ => AttrValue::Uint(reader.u32(&schema.name)?),
			};

			attrs.push((schema.name.clone(), value));
		}

		result.matches.push(Match { id, weight, attrs });
	}

	result.total = reader.u32("total")?;
	result.total_found = reader.u32("total found")?;
	result.time_ms = reader.u32("elapsed time")?;

	let word_count = reader.u32("word count")?;

	for _ in 0..word_count {
		let word = reader.string("keyword")?;
		let docs = reader.u32("keyword docs")?;
		let hits = reader.u32("keyword hits")?;

		result.words.push(WordStats { word, docs, hits });
	}

	result.warning = match (envelope_warning, query_warning) {
		(Some(envelope), Some(query)) => Some(format!("{envelope}; {query}")),
		(envelope, query) => envelope.or(query),
	};

	Ok(result)
}

fn message_after_length(body: &[u8]) -> String {
	String::from_utf8_lossy(body.get(4..).unwrap_or_default()).into_owned()
}
