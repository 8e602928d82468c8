use crate::{
	Error, Result,
	codec::{self, BodyWriter},
	protocol::{Command, CommandVersion, GroupFunc, MatchMode, RankMode, SortMode},
};

#[derive(Clone, Debug, PartialEq)]
pub struct SearchRequest {
	pub offset: u32,
	pub limit: u32,
	pub match_mode: MatchMode,
	pub rank_mode: RankMode,
	pub sort_mode: SortMode,
	pub sort_by: String,
	pub query: String,
	pub weights: Vec<u32>,
	pub field_weights: Vec<(String, u32)>,
	pub indexes: String,
	pub id_range: IdRange,
	pub filters: Vec<Filter>,
	pub group: Option<GroupBy>,
	pub group_distinct: String,
	pub max_matches: u32,
	pub cutoff: u32,
	pub retry_count: u32,
	pub retry_delay: u32,
	pub anchor: Option<GeoAnchor>,
	pub index_weights: Vec<(String, u32)>,
	pub max_query_time: u32,
	pub comment: String,
}
impl Default for SearchRequest {
	fn default() -> Self {
		Self {
			offset: 0,
			limit: 20,
			match_mode: MatchMode::All,
			rank_mode: RankMode::ProximityBm25,
			sort_mode: SortMode::Relevance,
			sort_by: String::new(),
			query: String::new(),
			weights: Vec::new(),
			field_weights: Vec::new(),
			indexes: "*".to_string(),
			id_range: IdRange::default(),
			filters: Vec::new(),
			group: None,
			group_distinct: String::new(),
			max_matches: 1_000,
			cutoff: 0,
			retry_count: 0,
			retry_delay: 0,
			anchor: None,
			index_weights: Vec::new(),
			max_query_time: 0,
			comment: String::new(),
		}
	}
}
impl SearchRequest {
	pub fn encode(&self, version: CommandVersion) -> Result<Vec<u8>> {
		if self.offset.checked_add(self.limit).is_none_or(|end| end > self.max_matches) {
			return Err(Error::invalid(format!(
				"offset {} plus limit {} exceeds max_matches {}.",
				self.offset, self.limit, self.max_matches
			)));
		}

		match version {
			CommandVersion::V1_7 => {
				let body = self.encode_v1_7()?;

				codec::frame(Command::Search as u16, version.as_u16(), &body, None)
			},
			CommandVersion::V1_19 => {
				let body = self.encode_v1_19()?;

				codec::frame(Command::Search as u16, version.as_u16(), &body, Some(1))
			},
		}
	}

	fn encode_v1_7(&self) -> Result<Vec<u8>> {
		if self.rank_mode != RankMode::ProximityBm25 {
			return Err(Error::invalid("rank modes require protocol 1.19."));
		}
		if !self.field_weights.is_empty() {
			return Err(Error::invalid("named field weights require protocol 1.19."));
		}
		if self.anchor.is_some() {
			return Err(Error::invalid("geo anchors require protocol 1.19."));
		}
		if matches!(self.match_mode, MatchMode::FullScan | MatchMode::Extended2) {
			return Err(Error::invalid("the requested match mode requires protocol 1.19."));
		}

		let mut w = BodyWriter::new();

		w.u32(self.offset)
			.u32(self.limit)
			.u32(self.match_mode as u32)
			.u32(self.sort_mode as u32)
			.str(&self.sort_by)?
			.str(&self.query)?
			.length(self.weights.len())?;

		for weight in &self.weights {
			w.u32(*weight);
		}

		let (min_id, max_id) = self.id_range.narrow()?;

		w.str(&self.indexes)?.u32(min_id).u32(max_id).length(self.filters.len())?;

		for filter in &self.filters {
			w.str(&filter.attribute)?;

			match &filter.values {
				FilterValues::Values(values) => {
					w.length(values.len())?;

					for value in values {
						w.u32(wire_int(&filter.attribute, *value)?);
					}
				},
				FilterValues::Range { min, max } => {
					w.u32(0)
						.u32(wire_int(&filter.attribute, *min)?)
						.u32(wire_int(&filter.attribute, *max)?);
				},
				FilterValues::FloatRange { .. } =>
					return Err(Error::invalid(format!(
						"float range filter on {} requires protocol 1.19.",
						filter.attribute
					))),
			}

			w.u32(filter.exclude as u32);
		}

		self.encode_grouping(&mut w)?;

		Ok(w.finish())
	}

	fn encode_v1_19(&self) -> Result<Vec<u8>> {
		let mut w = BodyWriter::new();

		w.u32(self.offset)
			.u32(self.limit)
			.u32(self.match_mode as u32)
			.u32(self.rank_mode as u32)
			.u32(self.sort_mode as u32)
			.str(&self.sort_by)?
			.str(&self.query)?
			.length(self.weights.len())?;

		for weight in &self.weights {
			w.u32(*weight);
		}

		w.str(&self.indexes)?
			.u32(1)
			.u64(self.id_range.min)
			.u64(self.id_range.max)
			.length(self.filters.len())?;

		for filter in &self.filters {
			w.str(&filter.attribute)?;

			match &filter.values {
				FilterValues::Values(values) => {
					w.u32(FilterKind::Values as u32).length(values.len())?;

					for value in values {
						w.u32(wire_int(&filter.attribute, *value)?);
					}
				},
				FilterValues::Range { min, max } => {
					w.u32(FilterKind::Range as u32)
						.u32(wire_int(&filter.attribute, *min)?)
						.u32(wire_int(&filter.attribute, *max)?);
				},
				FilterValues::FloatRange { min, max } => {
					w.u32(FilterKind::FloatRange as u32).f32(*min).f32(*max);
				},
			}

			w.u32(filter.exclude as u32);
		}

		self.encode_grouping(&mut w)?;
		w.u32(self.cutoff)
			.u32(self.retry_count)
			.u32(self.retry_delay)
			.str(&self.group_distinct)?;

		match &self.anchor {
			Some(anchor) => {
				w.u32(1)
					.str(&anchor.lat_attr)?
					.str(&anchor.long_attr)?
					.f32(anchor.lat)
					.f32(anchor.long);
			},
			None => {
				w.u32(0);
			},
		}

		w.length(self.index_weights.len())?;

		for (index, weight) in &self.index_weights {
			w.str(index)?.u32(*weight);
		}

		w.u32(self.max_query_time).length(self.field_weights.len())?;

		for (field, weight) in &self.field_weights {
			w.str(field)?.u32(*weight);
		}

		w.str(&self.comment)?;

		Ok(w.finish())
	}

	fn encode_grouping(&self, w: &mut BodyWriter) -> Result<()> {
		let (func, attribute, sort) = match &self.group {
			Some(group) => (group.func, group.attribute.as_str(), group.sort.as_str()),
			None => (GroupFunc::Day, "", GroupBy::DEFAULT_SORT),
		};

		w.u32(func as u32).str(attribute)?.u32(self.max_matches).str(sort)?;

		Ok(())
	}
}

/// Document id bounds. A zero upper bound means "no upper bound".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IdRange {
	pub min: u64,
	pub max: u64,
}
impl IdRange {
	fn narrow(&self) -> Result<(u32, u32)> {
		let min = u32::try_from(self.min)
			.map_err(|_| Error::invalid("64-bit document ids require protocol 1.19."))?;
		let max = match self.max {
			0 => u32::MAX,
			max => u32::try_from(max)
				.map_err(|_| Error::invalid("64-bit document ids require protocol 1.19."))?,
		};

		Ok((min, max))
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FilterKind {
	Values = 0,
	Range = 1,
	FloatRange = 2,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
	pub attribute: String,
	pub values: FilterValues,
	pub exclude: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FilterValues {
	Values(Vec<i64>),
	Range { min: i64, max: i64 },
	FloatRange { min: f32, max: f32 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupBy {
	pub attribute: String,
	pub func: GroupFunc,
	pub sort: String,
}
impl GroupBy {
	pub const DEFAULT_SORT: &'static str = "@group desc";
}

#[derive(Clone, Debug, PartialEq)]
pub struct GeoAnchor {
	pub lat_attr: String,
	pub long_attr: String,
	pub lat: f32,
	pub long: f32,
}

fn wire_int(attribute: &str, value: i64) -> Result<u32> {
	u32::try_from(value).map_err(|_| {
		Error::invalid(format!(
			"filter value {value} on {attribute} is outside the unsigned 32-bit range."
		))
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn u32_at(bytes: &[u8], offset: usize) -> u32 {
		u32::from_be_bytes(bytes[offset..offset + 4].try_into().expect("Slice of four bytes."))
	}

	#[test]
	fn legacy_layout_starts_with_paging_and_modes() {
		let request = SearchRequest {
			offset: 10,
			limit: 5,
			match_mode: MatchMode::Extended,
			sort_mode: SortMode::Extended,
			sort_by: "@id ASC".to_string(),
			query: "hello".to_string(),
			weights: vec![100, 1],
			indexes: "docs".to_string(),
			..SearchRequest::default()
		};
		let frame = request.encode(CommandVersion::V1_7).expect("Failed to encode request.");

		assert_eq!(&frame[0..4], &[0, 0, 0x01, 0x07]);
		assert_eq!(u32_at(&frame, 4) as usize, frame.len() - 8);
		assert_eq!(u32_at(&frame, 8), 10);
		assert_eq!(u32_at(&frame, 12), 5);
		assert_eq!(u32_at(&frame, 16), MatchMode::Extended as u32);
		assert_eq!(u32_at(&frame, 20), SortMode::Extended as u32);
		assert_eq!(u32_at(&frame, 24), 7);
		assert_eq!(&frame[28..35], b"@id ASC");
	}

	#[test]
	fn current_layout_carries_rank_mode_and_request_count() {
		let request = SearchRequest { rank_mode: RankMode::Bm25, ..SearchRequest::default() };
		let frame = request.encode(CommandVersion::V1_19).expect("Failed to encode request.");

		assert_eq!(&frame[0..4], &[0, 0, 0x01, 0x13]);
		assert_eq!(u32_at(&frame, 4) as usize, frame.len() - 8);
		assert_eq!(u32_at(&frame, 8), 1);
		assert_eq!(u32_at(&frame, 24), RankMode::Bm25 as u32);
	}

	#[test]
	fn legacy_layout_rejects_float_ranges() {
		let request = SearchRequest {
			filters: vec![Filter {
				attribute: "price".to_string(),
				values: FilterValues::FloatRange { min: 1.5, max: 3.0 },
				exclude: false,
			}],
			..SearchRequest::default()
		};
		let err = request.encode(CommandVersion::V1_7).expect_err("Expected a rejection.");

		assert!(err.to_string().contains("price"), "Unexpected error: {err}");
	}

	#[test]
	fn negative_filter_values_are_rejected() {
		let request = SearchRequest {
			filters: vec![Filter {
				attribute: "delta".to_string(),
				values: FilterValues::Values(vec![-1]),
				exclude: true,
			}],
			..SearchRequest::default()
		};

		assert!(matches!(
			request.encode(CommandVersion::V1_19),
			Err(Error::InvalidRequest { .. })
		));
	}

	#[test]
	fn paging_past_max_matches_is_rejected() {
		let request = SearchRequest { offset: 990, limit: 20, ..SearchRequest::default() };

		assert!(request.encode(CommandVersion::V1_19).is_err());
	}
}
