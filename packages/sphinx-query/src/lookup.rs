use crate::{Error, Result};

const SEPARATOR: &str = "__";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup {
	Exact,
	Gt,
	Gte,
	Lt,
	Lte,
	Range,
	In,
}
impl Lookup {
	pub fn is_range(self) -> bool {
		matches!(self, Self::Gt | Self::Gte | Self::Lt | Self::Lte | Self::Range)
	}
}

pub fn parse(key: &str) -> Result<(&str, Lookup)> {
	let mut parts = key.split(SEPARATOR);
	let attribute = parts.next().unwrap_or_default();
	let lookup = parts.next();

	if parts.next().is_some() {
		return Err(Error::Unsupported {
			message: format!(
				"Related object and/or multiple field lookups are not supported ({key})."
			),
		});
	}
	if attribute.is_empty() {
		return Err(Error::invalid(format!("filter key {key:?} names no attribute.")));
	}

	let lookup = match lookup {
		None => Lookup::Exact,
		Some("gt") => Lookup::Gt,
		Some("gte") => Lookup::Gte,
		Some("lt") => Lookup::Lt,
		Some("lte") => Lookup::Lte,
		Some("range") => Lookup::Range,
		Some("in") => Lookup::In,
		Some(other) => {
			return Err(Error::Unsupported {
				message: format!("Field lookup {other:?} is not supported ({key})."),
			});
		},
	};

	Ok((attribute, lookup))
}
