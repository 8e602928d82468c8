use sphinx_wire::{AttrValue, GroupFunc, QueryResult};

use crate::{
	hydrate::{self, Hit, RecordFetcher, RecordKey},
	query::{Passthrough, SearchQuery},
};

pub const GROUP_KEY: &str = "@groupby";
pub const GROUP_COUNT: &str = "@count";
pub const DEFAULT_SORT: &str = "@count desc";

pub fn related_query(query: &SearchQuery, attribute: &str, sort: &str) -> SearchQuery {
	query.group_by(attribute, GroupFunc::Attr, sort)
}

pub fn hydrate_grouped<F>(
	result: &QueryResult,
	fetcher: &F,
	passthrough: &Passthrough,
) -> Result<Vec<Hit<F::Record>>, F::Error>
where
	F: RecordFetcher + ?Sized,
{
	let keyed = result
		.matches
		.iter()
		.filter_map(|matched| {
			matched
				.attr(GROUP_KEY)
				.and_then(AttrValue::as_u64)
				.map(|value| (matched, RecordKey::single(value)))
		})
		.collect::<Vec<_>>();

	hydrate::hydrate_keyed(keyed, fetcher, passthrough)
}

pub fn group_count<R>(hit: &Hit<R>, max_matches: u32) -> u32 {
	Hit::meta(hit)
		.attr(GROUP_COUNT)
		.and_then(AttrValue::as_u64)
		.map_or(0, |count| count.min(u64::from(max_matches)) as u32)
}
