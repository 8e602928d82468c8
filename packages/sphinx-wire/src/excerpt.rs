use crate::{
	Result,
	codec::{self, BodyReader, BodyWriter},
	protocol::Command,
	response::Frame,
};

const FLAG_REMOVE_SPACES: u32 = 1;
const FLAG_EXACT_PHRASE: u32 = 2;
const FLAG_SINGLE_PASSAGE: u32 = 4;
const FLAG_USE_BOUNDARIES: u32 = 8;
const FLAG_WEIGHT_ORDER: u32 = 16;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExcerptOptions {
	pub before_match: String,
	pub after_match: String,
	pub chunk_separator: String,
	pub limit: u32,
	pub around: u32,
	pub exact_phrase: bool,
	pub single_passage: bool,
	pub use_boundaries: bool,
	pub weight_order: bool,
}
impl Default for ExcerptOptions {
	fn default() -> Self {
		Self {
			before_match: "<b>".to_string(),
			after_match: "</b>".to_string(),
			chunk_separator: " ... ".to_string(),
			limit: 256,
			around: 5,
			exact_phrase: false,
			single_passage: false,
			use_boundaries: false,
			weight_order: false,
		}
	}
}
impl ExcerptOptions {
	fn flags(&self) -> u32 {
		let mut flags = FLAG_REMOVE_SPACES;

		if self.exact_phrase {
			flags |= FLAG_EXACT_PHRASE;
		}
		if self.single_passage {
			flags |= FLAG_SINGLE_PASSAGE;
		}
		if self.use_boundaries {
			flags |= FLAG_USE_BOUNDARIES;
		}
		if self.weight_order {
			flags |= FLAG_WEIGHT_ORDER;
		}

		flags
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExcerptRequest {
	pub index: String,
	pub words: String,
	pub documents: Vec<String>,
	pub options: ExcerptOptions,
}
impl ExcerptRequest {
	pub fn encode(&self) -> Result<Vec<u8>> {
		let mut w = BodyWriter::new();

		w.u32(0)
			.u32(self.options.flags())
			.str(&self.index)?
			.str(&self.words)?
			.str(&self.options.before_match)?
			.str(&self.options.after_match)?
			.str(&self.options.chunk_separator)?
			.u32(self.options.limit)
			.u32(self.options.around)
			.length(self.documents.len())?;

		for document in &self.documents {
			w.str(document)?;
		}

		codec::frame(Command::Excerpt as u16, Command::Excerpt.version(), &w.finish(), None)
	}

	pub fn decode(&self, frame: &Frame) -> Result<Vec<String>> {
		let (payload, warning) = frame.open(Command::Excerpt.version())?;

		if let Some(warning) = warning {
			tracing::warn!(index = %self.index, %warning, "Excerpts returned with a warning.");
		}

		let mut reader = BodyReader::new(payload);

		self.documents.iter().map(|_| reader.string("excerpt")).collect()
	}
}
