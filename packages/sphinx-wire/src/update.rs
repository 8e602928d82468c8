use crate::{
	Error, Result,
	codec::{self, BodyReader, BodyWriter},
	protocol::Command,
	response::Frame,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateRequest {
	pub index: String,
	pub attributes: Vec<String>,
	pub values: Vec<(u64, Vec<u32>)>,
}
impl UpdateRequest {
	pub fn encode(&self) -> Result<Vec<u8>> {
		let mut w = BodyWriter::new();

		w.str(&self.index)?.length(self.attributes.len())?;

		for attribute in &self.attributes {
			w.str(attribute)?;
		}

		w.length(self.values.len())?;

		for (id, values) in &self.values {
			if values.len() != self.attributes.len() {
				return Err(Error::invalid(format!(
					"document {id} carries {} value(s) for {} attribute(s).",
					values.len(),
					self.attributes.len()
				)));
			}

			w.u64(*id);

			for value in values {
				w.u32(*value);
			}
		}

		codec::frame(Command::Update as u16, Command::Update.version(), &w.finish(), None)
	}

	pub fn decode(&self, frame: &Frame) -> Result<u32> {
		let (payload, warning) = frame.open(Command::Update.version())?;

		if let Some(warning) = warning {
			tracing::warn!(
				index = %self.index,
				%warning,
				"Attribute update returned with a warning."
			);
		}

		BodyReader::new(payload).u32("updated count")
	}
}
