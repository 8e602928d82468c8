use std::{
	collections::{BTreeMap, HashMap, HashSet},
	ops::{Deref, DerefMut},
};

use sphinx_config::QueryDefaults;
use sphinx_wire::{AttrValue, Client, ExcerptOptions, ExcerptRequest, Match, QueryResult};

use crate::{Error, Result, query::Passthrough};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey(pub Vec<u64>);
impl RecordKey {
	pub fn single(id: u64) -> Self {
		Self(vec![id])
	}

	pub fn parts(&self) -> &[u64] {
		&self.0
	}
}
impl From<u64> for RecordKey {
	fn from(id: u64) -> Self {
		Self::single(id)
	}
}

pub trait RecordFetcher {
	type Record: Clone;
	type Error: From<Error>;

	/// Attribute names that make up the record key, in key order. When empty, or when the first
	/// column is not part of the response schema, the document id is the key.
	fn key_columns(&self) -> &[String] {
		&[]
	}

	fn fetch_by_keys(
		&self,
		keys: &[RecordKey],
		passthrough: &Passthrough,
	) -> Result<HashMap<RecordKey, Self::Record>, Self::Error>;

	fn field_text(&self, _record: &Self::Record, _field: &str) -> Option<String> {
		None
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchMeta {
	pub id: u64,
	pub weight: u32,
	pub key: RecordKey,
	pub attrs: Vec<(String, AttrValue)>,
	pub passages: Option<BTreeMap<String, String>>,
}
impl MatchMeta {
	fn new(matched: &Match, key: RecordKey) -> Self {
		Self {
			id: matched.id,
			weight: matched.weight,
			key,
			attrs: matched.attrs.clone(),
			passages: None,
		}
	}

	pub fn attr(&self, name: &str) -> Option<&AttrValue> {
		self.attrs.iter().find(|(attr, _)| attr == name).map(|(_, value)| value)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Hit<R> {
	record: R,
	meta: MatchMeta,
}
impl<R> Hit<R> {
	pub fn meta(this: &Self) -> &MatchMeta {
		&this.meta
	}

	pub fn passages(this: &Self) -> Option<&BTreeMap<String, String>> {
		this.meta.passages.as_ref()
	}

	pub fn into_inner(this: Self) -> R {
		this.record
	}

	pub fn into_parts(this: Self) -> (R, MatchMeta) {
		(this.record, this.meta)
	}
}
impl<R> Deref for Hit<R> {
	type Target = R;

	fn deref(&self) -> &Self::Target {
		&self.record
	}
}
impl<R> DerefMut for Hit<R> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.record
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum Row<R> {
	Record(Hit<R>),
	Raw(Match),
}
impl<R> Row<R> {
	pub fn id(&self) -> u64 {
		match self {
			Self::Record(hit) => Hit::meta(hit).id,
			Self::Raw(matched) => matched.id,
		}
	}

	pub fn as_record(&self) -> Option<&Hit<R>> {
		match self {
			Self::Record(hit) => Some(hit),
			Self::Raw(_) => None,
		}
	}
}

pub fn hydrate_bound<F>(
	result: &QueryResult,
	fetcher: &F,
	passthrough: &Passthrough,
) -> Result<Vec<Hit<F::Record>>, F::Error>
where
	F: RecordFetcher + ?Sized,
{
	let columns = key_columns_in(result, fetcher.key_columns());
	let keyed = result
		.matches
		.iter()
		.filter_map(|matched| key_of(matched, columns).map(|key| (matched, key)))
		.collect::<Vec<_>>();

	hydrate_keyed(keyed, fetcher, passthrough)
}

pub(crate) fn hydrate_keyed<F>(
	keyed: Vec<(&Match, RecordKey)>,
	fetcher: &F,
	passthrough: &Passthrough,
) -> Result<Vec<Hit<F::Record>>, F::Error>
where
	F: RecordFetcher + ?Sized,
{
	if keyed.is_empty() {
		return Ok(Vec::new());
	}

	let records = fetcher.fetch_by_keys(&unique_keys(&keyed), passthrough)?;
	let mut hits = Vec::with_capacity(keyed.len());

	for (matched, key) in keyed {
		match records.get(&key).cloned() {
			Some(record) => hits.push(Hit { record, meta: MatchMeta::new(matched, key) }),
			None => tracing::debug!(
				id = matched.id,
				key = ?key.parts(),
				"Dropping match without a record."
			),
		}
	}

	Ok(hits)
}

type BoxedFetcher<R, E> = Box<dyn RecordFetcher<Record = R, Error = E>>;

pub struct Discriminated<R, E> {
	attribute: String,
	fetchers: HashMap<u64, BoxedFetcher<R, E>>,
}
impl<R, E> Discriminated<R, E>
where
	R: Clone,
	E: From<Error>,
{
	pub fn new() -> Self {
		Self::with_attribute(sphinx_config::DEFAULT_DISCRIMINATOR)
	}

	pub fn with_defaults(defaults: &QueryDefaults) -> Self {
		Self::with_attribute(defaults.discriminator.as_str())
	}

	pub fn with_attribute(attribute: impl Into<String>) -> Self {
		Self { attribute: attribute.into(), fetchers: HashMap::new() }
	}

	pub fn attribute(&self) -> &str {
		&self.attribute
	}

	pub fn register<F>(mut self, value: u64, fetcher: F) -> Self
	where
		F: RecordFetcher<Record = R, Error = E> + 'static,
	{
		self.fetchers.insert(value, Box::new(fetcher));

		self
	}

	pub(crate) fn fetcher_for(&self, value: u64) -> Result<&BoxedFetcher<R, E>> {
		self.fetchers.get(&value).ok_or_else(|| Error::UnknownDiscriminator {
			attribute: self.attribute.clone(),
			value,
		})
	}

	pub fn hydrate(
		&self,
		result: &QueryResult,
		passthrough: &Passthrough,
	) -> Result<Vec<Row<R>>, E> {
		if !result.has_attr(&self.attribute) {
			return Ok(result.matches.iter().cloned().map(Row::Raw).collect());
		}

		let mut order = Vec::new();
		let mut groups = HashMap::<u64, Vec<(&Match, RecordKey)>>::new();
		let mut slots = Vec::with_capacity(result.matches.len());

		for matched in &result.matches {
			let Some(value) = matched.attr(&self.attribute).and_then(AttrValue::as_u64) else {
				tracing::debug!(id = matched.id, "Dropping match without a discriminator value.");
				slots.push(None);

				continue;
			};
			let fetcher = self.fetcher_for(value)?;
			let columns = key_columns_in(result, fetcher.key_columns());
			let Some(key) = key_of(matched, columns) else {
				slots.push(None);

				continue;
			};

			if !groups.contains_key(&value) {
				order.push(value);
			}

			groups.entry(value).or_default().push((matched, key.clone()));
			slots.push(Some((value, key)));
		}

		let mut fetched = HashMap::with_capacity(order.len());

		for value in order {
			let keyed = groups.remove(&value).unwrap_or_default();
			let fetcher = self.fetcher_for(value)?;
			let records = fetcher.fetch_by_keys(&unique_keys(&keyed), passthrough)?;

			fetched.insert(value, records);
		}

		let mut rows = Vec::with_capacity(slots.len());

		for (matched, slot) in result.matches.iter().zip(slots) {
			let Some((value, key)) = slot else {
				continue;
			};
			let record = fetched.get(&value).and_then(|records| records.get(&key)).cloned();

			match record {
				Some(record) => {
					let meta = MatchMeta::new(matched, key);

					rows.push(Row::Record(Hit { record, meta }));
				},
				None => tracing::debug!(id = matched.id, value, "Dropping match without a record."),
			}
		}

		Ok(rows)
	}
}
impl<R, E> Default for Discriminated<R, E>
where
	R: Clone,
	E: From<Error>,
{
	fn default() -> Self {
		Self::new()
	}
}

pub struct PassageContext<'a> {
	client: &'a Client,
	index: &'a str,
	options: &'a ExcerptOptions,
	fields: &'a [String],
	words: String,
}
impl<'a> PassageContext<'a> {
	pub fn new(
		client: &'a Client,
		index: &'a str,
		options: &'a ExcerptOptions,
		result: &'a QueryResult,
	) -> Self {
		Self { client, index, options, fields: &result.fields, words: result.keywords() }
	}

	pub fn attach<F>(&self, hit: &mut Hit<F::Record>, fetcher: &F) -> Result<()>
	where
		F: RecordFetcher + ?Sized,
	{
		let (fields, documents): (Vec<_>, Vec<_>) = self
			.fields
			.iter()
			.filter_map(|field| {
				fetcher.field_text(&hit.record, field).map(|text| (field.clone(), text))
			})
			.unzip();

		if documents.is_empty() {
			return Ok(());
		}

		let request = ExcerptRequest {
			index: self.index.to_string(),
			words: self.words.clone(),
			documents,
			options: self.options.clone(),
		};
		let excerpts = self.client.build_excerpts(&request)?;

		hit.meta.passages = Some(fields.into_iter().zip(excerpts).collect());

		Ok(())
	}
}

fn key_columns_in<'a>(result: &QueryResult, columns: &'a [String]) -> &'a [String] {
	match columns.first() {
		Some(first) if result.has_attr(first) => columns,
		_ => &[],
	}
}

fn key_of(matched: &Match, columns: &[String]) -> Option<RecordKey> {
	if columns.is_empty() {
		return Some(RecordKey::single(matched.id));
	}

	let parts = columns
		.iter()
		.map(|column| matched.attr(column).and_then(AttrValue::as_u64))
		.collect::<Option<Vec<_>>>();

	if parts.is_none() {
		tracing::debug!(id = matched.id, "Dropping match with an incomplete composite key.");
	}

	parts.map(RecordKey)
}

fn unique_keys(keyed: &[(&Match, RecordKey)]) -> Vec<RecordKey> {
	let mut seen = HashSet::with_capacity(keyed.len());

	keyed.iter().filter(|(_, key)| seen.insert(key)).map(|(_, key)| key.clone()).collect()
}
