use sphinx_wire::{Client, Match, QueryResult, WordStats};

use crate::{
	Error, Result,
	hydrate::{self, Discriminated, Hit, PassageContext, RecordFetcher, Row},
	query::{self, SearchQuery},
	related,
};

pub trait Materialize {
	type Item;
	type Error: From<Error>;

	fn prepare(&self, query: &SearchQuery) -> SearchQuery {
		query.clone()
	}

	fn materialize(
		&self,
		client: &Client,
		query: &SearchQuery,
		result: &QueryResult,
	) -> Result<Vec<Self::Item>, Self::Error>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Matches;
impl Materialize for Matches {
	type Error = Error;
	type Item = Match;

	fn materialize(
		&self,
		_client: &Client,
		_query: &SearchQuery,
		result: &QueryResult,
	) -> Result<Vec<Self::Item>> {
		Ok(result.matches.clone())
	}
}

#[derive(Clone, Debug)]
pub struct Bound<F>(pub F);
impl<F> Materialize for Bound<F>
where
	F: RecordFetcher,
{
	type Error = F::Error;
	type Item = Hit<F::Record>;

	fn materialize(
		&self,
		client: &Client,
		query: &SearchQuery,
		result: &QueryResult,
	) -> Result<Vec<Self::Item>, Self::Error> {
		let mut hits = hydrate::hydrate_bound(result, &self.0, query.passthrough())?;

		if let Some(options) = query.passage_options() {
			let passages = PassageContext::new(client, query.index(), options, result);

			for hit in &mut hits {
				passages.attach(hit, &self.0)?;
			}
		}

		Ok(hits)
	}
}

impl<R, E> Materialize for Discriminated<R, E>
where
	R: Clone,
	E: From<Error>,
{
	type Error = E;
	type Item = Row<R>;

	fn materialize(
		&self,
		client: &Client,
		query: &SearchQuery,
		result: &QueryResult,
	) -> Result<Vec<Self::Item>, Self::Error> {
		let mut rows = self.hydrate(result, query.passthrough())?;

		if let Some(options) = query.passage_options() {
			let passages = PassageContext::new(client, query.index(), options, result);

			for row in &mut rows {
				let Row::Record(hit) = row else {
					continue;
				};
				let value = Hit::meta(hit).attr(self.attribute()).and_then(|value| value.as_u64());

				if let Some(value) = value {
					let fetcher = self.fetcher_for(value)?;

					passages.attach(hit, &**fetcher)?;
				}
			}
		}

		Ok(rows)
	}
}

#[derive(Clone, Debug)]
pub struct Grouped<F> {
	pub fetcher: F,
	pub attribute: String,
	pub sort: String,
}
impl<F> Grouped<F> {
	pub fn new(fetcher: F, attribute: impl Into<String>) -> Self {
		Self { fetcher, attribute: attribute.into(), sort: related::DEFAULT_SORT.to_string() }
	}
}
impl<F> Materialize for Grouped<F>
where
	F: RecordFetcher,
{
	type Error = F::Error;
	type Item = Hit<F::Record>;

	fn prepare(&self, query: &SearchQuery) -> SearchQuery {
		related::related_query(query, &self.attribute, &self.sort)
	}

	fn materialize(
		&self,
		_client: &Client,
		query: &SearchQuery,
		result: &QueryResult,
	) -> Result<Vec<Self::Item>, Self::Error> {
		related::hydrate_grouped(result, &self.fetcher, query.passthrough())
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchMeta {
	pub total: u32,
	pub total_found: u32,
	pub time_ms: u32,
	pub fields: Vec<String>,
	pub words: Vec<WordStats>,
	pub warning: Option<String>,
}
impl SearchMeta {
	fn from_result(result: &QueryResult) -> Self {
		Self {
			total: result.total,
			total_found: result.total_found,
			time_ms: result.time_ms,
			fields: result.fields.clone(),
			words: result.words.clone(),
			warning: result.warning.clone(),
		}
	}
}

enum Window<T> {
	Empty,
	Populated { offset: u32, limit: u32, items: Vec<T>, meta: SearchMeta },
}

pub struct SearchSet<M>
where
	M: Materialize,
{
	client: Client,
	query: SearchQuery,
	materializer: M,
	window: Window<M::Item>,
}
impl<M> SearchSet<M>
where
	M: Materialize,
{
	pub fn new(client: Client, query: SearchQuery, materializer: M) -> Self {
		Self { client, query, materializer, window: Window::Empty }
	}

	pub fn query(&self) -> &SearchQuery {
		&self.query
	}

	pub fn is_cached(&self) -> bool {
		matches!(self.window, Window::Populated { .. })
	}

	pub fn get(&mut self, index: i64) -> Result<Option<&M::Item>, M::Error> {
		let index = query::non_negative(index)?;

		if !self.covers(index, 1) {
			self.execute(index, 1)?;
		}

		Ok(self.cached(index, index.saturating_add(1)).first())
	}

	pub fn slice(&mut self, start: i64, stop: i64) -> Result<&[M::Item], M::Error> {
		let start = query::non_negative(start)?;
		let stop = query::non_negative(stop)?;

		if stop < start {
			return Err(Error::invalid(format!("slice end {stop} precedes start {start}.")).into());
		}
		if !self.covers(start, stop - start) {
			self.execute(start, stop - start)?;
		}

		Ok(self.cached(start, stop))
	}

	pub fn items(&mut self) -> Result<&[M::Item], M::Error> {
		let start = i64::from(self.query.offset());
		let stop = start + i64::from(self.query.limit());

		self.slice(start, stop)
	}

	/// Matches retrievable for the query: `total_found` capped at max-matches.
	pub fn count(&mut self) -> Result<u32, M::Error> {
		let total_found = self.meta()?.total_found;

		Ok(total_found.min(self.query.max_match_count()))
	}

	pub fn meta(&mut self) -> Result<&SearchMeta, M::Error> {
		if let Window::Empty = self.window {
			self.execute(self.query.offset(), self.query.limit())?;
		}

		match &self.window {
			Window::Populated { meta, .. } => Ok(meta),
			Window::Empty => Err(Error::invalid("search window was not populated.").into()),
		}
	}

	pub fn warning(&self) -> Option<&str> {
		match &self.window {
			Window::Populated { meta, .. } => meta.warning.as_deref(),
			Window::Empty => None,
		}
	}

	pub fn refine<F>(&self, refine: F) -> Result<Self, M::Error>
	where
		F: FnOnce(&SearchQuery) -> Result<SearchQuery>,
		M: Clone,
	{
		let query = refine(&self.query)?;

		Ok(Self::new(self.client.clone(), query, self.materializer.clone()))
	}

	fn covers(&self, start: u32, len: u32) -> bool {
		match &self.window {
			Window::Populated { offset, limit, .. } => {
				let end = u64::from(start) + u64::from(len);

				start >= *offset && end <= u64::from(*offset) + u64::from(*limit)
			},
			Window::Empty => false,
		}
	}

	fn cached(&self, start: u32, stop: u32) -> &[M::Item] {
		match &self.window {
			Window::Populated { offset, items, .. } => {
				let from = (start.saturating_sub(*offset) as usize).min(items.len());
				let to = (stop.saturating_sub(*offset) as usize).clamp(from, items.len());

				&items[from..to]
			},
			Window::Empty => &[],
		}
	}

	fn execute(&mut self, offset: u32, limit: u32) -> Result<(), M::Error> {
		let windowed = self.query.slice(i64::from(offset), i64::from(limit))?;

		if limit == 0 || windowed.is_none() {
			self.window =
				Window::Populated { offset, limit, items: Vec::new(), meta: SearchMeta::default() };

			return Ok(());
		}

		let prepared = self.materializer.prepare(&windowed);
		let request = prepared.compile()?;
		let result = self.client.search(&request).map_err(Error::from)?;

		tracing::debug!(
			index = %prepared.index(),
			query = %prepared.text(),
			offset,
			limit,
			total = result.total,
			total_found = result.total_found,
			time_ms = result.time_ms,
			"Search executed."
		);

		let items = self.materializer.materialize(&self.client, &prepared, &result)?;

		self.window =
			Window::Populated { offset, limit, items, meta: SearchMeta::from_result(&result) };

		Ok(())
	}
}
