use std::{collections::BTreeMap, sync::LazyLock};

use regex::Regex;
use serde_json::{Map, Value};

use sphinx_config::QueryDefaults;
use sphinx_wire::{
	ExcerptOptions, FilterValues, GeoAnchor, GroupBy, GroupFunc, IdRange, MAX_INT, MatchMode,
	RankMode, SearchRequest, SortMode,
};

use crate::{
	Error, Result,
	lookup::{self, Lookup},
	value::{self, FilterValue, ToFilterValue},
};

pub const ID_ATTRIBUTE: &str = "id";

static EXTENDED_OPERATORS: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"([=\(\)|\-!@~"&/\\\^\$])"#).expect("Operator pattern must compile.")
});

pub fn escape(text: &str) -> String {
	EXTENDED_OPERATORS.replace_all(text, r"\$1").into_owned()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Weights {
	Positional(Vec<u32>),
	Named(BTreeMap<String, u32>),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Passthrough {
	pub select_related: bool,
	pub related_fields: Vec<String>,
	pub related_args: Map<String, Value>,
	pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq)]
struct FilterEntry {
	key: String,
	attribute: String,
	lookup: Lookup,
	values: Vec<FilterValue>,
}
impl FilterEntry {
	fn validate(&self, exclude: bool) -> Result<()> {
		let has_float = self.values.iter().any(FilterValue::is_float);

		match self.lookup {
			Lookup::Exact | Lookup::In if has_float => {
				return Err(Error::invalid(format!(
					"{} holds float values; filter floats with a range lookup.",
					self.key
				)));
			},
			Lookup::Gt | Lookup::Gte | Lookup::Lt | Lookup::Lte if self.values.len() != 1 => {
				return Err(Error::invalid(format!("{} takes exactly one value.", self.key)));
			},
			Lookup::Range if self.values.len() != 2 => {
				return Err(Error::invalid(format!("{} takes exactly two values.", self.key)));
			},
			_ => {},
		}

		if !self.lookup.is_range() {
			return Ok(());
		}

		let empty = match self.bounds()? {
			FilterValues::Range { min, max } =>
				min > max || (max == 0 && !exclude && self.attribute == ID_ATTRIBUTE),
			FilterValues::FloatRange { min, max } => min > max,
			FilterValues::Values(_) => false,
		};

		if empty {
			return Err(Error::invalid(format!("{} matches no values.", self.key)));
		}

		Ok(())
	}

	fn bounds(&self) -> Result<FilterValues> {
		let first = *self
			.values
			.first()
			.ok_or_else(|| Error::invalid(format!("{} has no values.", self.key)))?;
		let second = self.values.get(1).copied().unwrap_or(first);

		if self.values.iter().any(FilterValue::is_float) {
			let open = MAX_INT as f32;
			let (min, max) = match self.lookup {
				Lookup::Gt => (value::next_up(first.as_f32()), open),
				Lookup::Gte => (first.as_f32(), open),
				Lookup::Lt => (-open, value::next_down(first.as_f32())),
				Lookup::Lte => (-open, first.as_f32()),
				_ => (first.as_f32(), second.as_f32()),
			};

			return Ok(FilterValues::FloatRange { min, max });
		}

		let open = i64::from(MAX_INT);
		let (first, second) = (int(first), int(second));
		let (min, max) = match self.lookup {
			Lookup::Gt => (first.saturating_add(1), open),
			Lookup::Gte => (first, open),
			Lookup::Lt => (0, first.saturating_sub(1)),
			Lookup::Lte => (0, first),
			_ => (first, second),
		};

		Ok(FilterValues::Range { min, max })
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchQuery {
	index: String,
	text: String,
	match_mode: MatchMode,
	rank_mode: RankMode,
	sort: Option<(SortMode, String)>,
	weights: Weights,
	group: Option<GroupBy>,
	anchor: Option<GeoAnchor>,
	filters: Vec<FilterEntry>,
	excludes: Vec<FilterEntry>,
	offset: u32,
	limit: u32,
	max_matches: u32,
	retry_count: u32,
	retry_delay: u32,
	passthrough: Passthrough,
	passages: Option<ExcerptOptions>,
	empty: bool,
}
impl SearchQuery {
	pub fn new(index: impl Into<String>) -> Self {
		Self {
			index: index.into(),
			text: String::new(),
			match_mode: MatchMode::All,
			rank_mode: RankMode::ProximityBm25,
			sort: None,
			weights: Weights::Positional(vec![1, 100]),
			group: None,
			anchor: None,
			filters: Vec::new(),
			excludes: Vec::new(),
			offset: 0,
			limit: 20,
			max_matches: 1_000,
			retry_count: 0,
			retry_delay: 5,
			passthrough: Passthrough::default(),
			passages: None,
			empty: false,
		}
	}

	pub fn with_defaults(index: impl Into<String>, defaults: &QueryDefaults) -> Result<Self> {
		let weights = if defaults.field_weights.is_empty() {
			Weights::Positional(defaults.weights.clone())
		} else {
			Weights::Named(defaults.field_weights.clone())
		};
		let query = Self {
			match_mode: defaults.match_mode.parse()?,
			rank_mode: defaults.rank_mode.parse()?,
			weights,
			limit: defaults.limit,
			max_matches: defaults.max_matches,
			retry_count: defaults.agent_retries,
			retry_delay: defaults.agent_retry_delay_ms,
			..Self::new(index)
		};

		check_window(query.offset, query.limit, query.max_matches)?;

		Ok(query)
	}

	pub fn query(&self, text: impl Into<String>) -> Self {
		Self { text: text.into(), ..self.clone() }
	}

	/// Restricts matches to `values` of the attribute named by `key`, which may carry a lookup
	/// suffix (`rating__gte`). Repeated calls with the same key union their values.
	pub fn filter<I, V>(&self, key: &str, values: I) -> Result<Self>
	where
		I: IntoIterator<Item = V>,
		V: ToFilterValue,
	{
		self.add_filter(key, values, false)
	}

	pub fn exclude<I, V>(&self, key: &str, values: I) -> Result<Self>
	where
		I: IntoIterator<Item = V>,
		V: ToFilterValue,
	{
		self.add_filter(key, values, true)
	}

	pub fn order_by<I, S>(&self, keys: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let parts = keys
			.into_iter()
			.map(|key| {
				let key = key.as_ref();
				let (name, direction) = match key.strip_prefix('-') {
					Some(name) => (name, "DESC"),
					None => (key, "ASC"),
				};
				let name = if name == ID_ATTRIBUTE { "@id" } else { name };

				format!("{name} {direction}")
			})
			.collect::<Vec<_>>();

		if parts.is_empty() {
			return self.clone();
		}

		Self { sort: Some((SortMode::Extended, parts.join(", "))), ..self.clone() }
	}

	pub fn order_by_mode(&self, mode: SortMode, expression: impl Into<String>) -> Self {
		Self { sort: Some((mode, expression.into())), ..self.clone() }
	}

	pub fn group_by(&self, attribute: &str, func: GroupFunc, sort: &str) -> Self {
		let group = GroupBy { attribute: attribute.to_string(), func, sort: sort.to_string() };

		Self { group: Some(group), ..self.clone() }
	}

	pub fn weights(&self, weights: Vec<u32>) -> Self {
		Self { weights: Weights::Positional(weights), ..self.clone() }
	}

	pub fn field_weights<I, S>(&self, weights: I) -> Self
	where
		I: IntoIterator<Item = (S, u32)>,
		S: Into<String>,
	{
		let weights = weights.into_iter().map(|(field, weight)| (field.into(), weight)).collect();

		Self { weights: Weights::Named(weights), ..self.clone() }
	}

	pub fn on_index(&self, index: impl Into<String>) -> Self {
		Self { index: index.into(), ..self.clone() }
	}

	pub fn select_related<I, S>(&self, fields: I, args: Map<String, Value>) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut next = self.clone();

		next.passthrough.select_related = true;
		next.passthrough.related_fields.extend(fields.into_iter().map(Into::into));
		next.passthrough.related_args.extend(args);

		next
	}

	pub fn extra(&self, args: Map<String, Value>) -> Self {
		let mut next = self.clone();

		next.passthrough.extra.extend(args);

		next
	}

	pub fn geoanchor(&self, lat_attr: &str, long_attr: &str, lat: f64, long: f64) -> Self {
		let anchor = GeoAnchor {
			lat_attr: lat_attr.to_string(),
			long_attr: long_attr.to_string(),
			lat: lat as f32,
			long: long as f32,
		};

		Self { anchor: Some(anchor), ..self.clone() }
	}

	pub fn match_mode(&self, mode: MatchMode) -> Self {
		Self { match_mode: mode, ..self.clone() }
	}

	pub fn rank_mode(&self, mode: RankMode) -> Self {
		Self { rank_mode: mode, ..self.clone() }
	}

	pub fn max_matches(&self, max_matches: u32) -> Result<Self> {
		check_window(self.offset, self.limit, max_matches)?;

		Ok(Self { max_matches, ..self.clone() })
	}

	pub fn retries(&self, count: u32, delay_ms: u32) -> Self {
		Self { retry_count: count, retry_delay: delay_ms, ..self.clone() }
	}

	pub fn passages(&self, options: ExcerptOptions) -> Self {
		Self { passages: Some(options), ..self.clone() }
	}

	pub fn slice(&self, offset: i64, limit: i64) -> Result<Self> {
		let offset = non_negative(offset)?;
		let limit = non_negative(limit)?;

		check_window(offset, limit, self.max_matches)?;

		Ok(Self { offset, limit, ..self.clone() })
	}

	pub fn none(&self) -> Self {
		Self { empty: true, ..self.clone() }
	}

	pub fn index(&self) -> &str {
		&self.index
	}

	pub fn text(&self) -> &str {
		&self.text
	}

	pub fn offset(&self) -> u32 {
		self.offset
	}

	pub fn limit(&self) -> u32 {
		self.limit
	}

	pub fn max_match_count(&self) -> u32 {
		self.max_matches
	}

	pub fn is_none(&self) -> bool {
		self.empty
	}

	pub fn sort(&self) -> Option<(SortMode, &str)> {
		self.sort.as_ref().map(|(mode, expression)| (*mode, expression.as_str()))
	}

	pub fn weight_spec(&self) -> &Weights {
		&self.weights
	}

	pub fn group(&self) -> Option<&GroupBy> {
		self.group.as_ref()
	}

	pub fn filter_values(&self, key: &str) -> Option<&[FilterValue]> {
		self.filters.iter().find(|entry| entry.key == key).map(|entry| entry.values.as_slice())
	}

	pub fn exclude_values(&self, key: &str) -> Option<&[FilterValue]> {
		self.excludes.iter().find(|entry| entry.key == key).map(|entry| entry.values.as_slice())
	}

	pub fn passthrough(&self) -> &Passthrough {
		&self.passthrough
	}

	pub fn passage_options(&self) -> Option<&ExcerptOptions> {
		self.passages.as_ref()
	}

	pub fn compile(&self) -> Result<SearchRequest> {
		let mut request = SearchRequest {
			offset: self.offset,
			limit: self.limit,
			match_mode: self.match_mode,
			rank_mode: self.rank_mode,
			query: self.text.clone(),
			indexes: self.index.clone(),
			group: self.group.clone(),
			max_matches: self.max_matches,
			retry_count: self.retry_count,
			retry_delay: self.retry_delay,
			anchor: self.anchor.clone(),
			..SearchRequest::default()
		};

		if let Some((mode, expression)) = &self.sort {
			request.sort_mode = *mode;
			request.sort_by = expression.clone();
		}

		match &self.weights {
			Weights::Positional(weights) => request.weights = weights.clone(),
			Weights::Named(weights) =>
				request.field_weights =
					weights.iter().map(|(field, weight)| (field.clone(), *weight)).collect(),
		}

		for entry in &self.filters {
			compile_entry(entry, false, &mut request)?;
		}
		for entry in &self.excludes {
			compile_entry(entry, true, &mut request)?;
		}

		Ok(request)
	}

	fn add_filter<I, V>(&self, key: &str, values: I, exclude: bool) -> Result<Self>
	where
		I: IntoIterator<Item = V>,
		V: ToFilterValue,
	{
		let (attribute, lookup) = lookup::parse(key)?;
		let values = values
			.into_iter()
			.map(|value| value.to_filter_value())
			.collect::<Result<Vec<_>>>()?;

		if values.is_empty() {
			return Err(Error::invalid(format!("{key} needs at least one value.")));
		}

		let mut next = self.clone();
		let entries = if exclude { &mut next.excludes } else { &mut next.filters };
		let position = match entries.iter().position(|entry| entry.key == key) {
			Some(position) => position,
			None => {
				entries.push(FilterEntry {
					key: key.to_string(),
					attribute: attribute.to_string(),
					lookup,
					values: Vec::new(),
				});

				entries.len() - 1
			},
		};
		let entry = &mut entries[position];

		for value in values {
			if !entry.values.contains(&value) {
				entry.values.push(value);
			}
		}

		entry.validate(exclude)?;

		Ok(next)
	}
}

fn compile_entry(entry: &FilterEntry, exclude: bool, request: &mut SearchRequest) -> Result<()> {
	let values = if entry.lookup.is_range() {
		entry.bounds()?
	} else {
		FilterValues::Values(entry.values.iter().copied().map(int).collect())
	};

	if entry.attribute == ID_ATTRIBUTE && !exclude {
		if let FilterValues::Range { min, max } = values {
			let min = u64::try_from(min)
				.map_err(|_| Error::invalid(format!("{} resolves to a negative id.", entry.key)))?;
			let max = u64::try_from(max)
				.map_err(|_| Error::invalid(format!("{} resolves to a negative id.", entry.key)))?;

			request.id_range = IdRange { min, max };

			return Ok(());
		}
	}

	request.filters.push(sphinx_wire::Filter {
		attribute: entry.attribute.clone(),
		values,
		exclude,
	});

	Ok(())
}

fn int(value: FilterValue) -> i64 {
	match value {
		FilterValue::Int(value) => value,
		FilterValue::Float(value) => value as i64,
	}
}

pub(crate) fn non_negative(index: i64) -> Result<u32> {
	if index < 0 {
		return Err(Error::NegativeIndex { index });
	}

	u32::try_from(index).map_err(|_| Error::invalid(format!("index {index} is out of range.")))
}

fn check_window(offset: u32, limit: u32, max_matches: u32) -> Result<()> {
	if offset.checked_add(limit).is_none_or(|end| end > max_matches) {
		return Err(Error::invalid(format!(
			"offset {offset} plus limit {limit} exceeds max_matches {max_matches}."
		)));
	}

	Ok(())
}
