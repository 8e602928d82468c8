use std::{
	collections::HashMap,
	sync::{Arc, Mutex},
};

use sphinx_config::QueryDefaults;
use sphinx_query::{
	Bound, Discriminated, Error, Grouped, Hit, Matches, Passthrough, RecordFetcher, RecordKey,
	Row, SearchQuery, SearchSet, related,
};
use sphinx_testkit::{ATTR_INTEGER, Cell, FakeSearchd, Reply, ResponseBuilder};
use sphinx_wire::{Client, CommandVersion, Endpoint, ExcerptOptions, TcpTransport};

#[derive(Clone)]
struct Store {
	name: &'static str,
	columns: Vec<String>,
	records: HashMap<RecordKey, String>,
	calls: Arc<Mutex<Vec<Vec<RecordKey>>>>,
}
impl Store {
	fn new(name: &'static str, ids: &[u64]) -> Self {
		let records =
			ids.iter().map(|id| (RecordKey::single(*id), format!("{name}-{id}"))).collect();

		Self { name, columns: Vec::new(), records, calls: Arc::default() }
	}

	fn composite(name: &'static str, columns: [&str; 2], keys: &[[u64; 2]]) -> Self {
		let records = keys
			.iter()
			.map(|key| (RecordKey(key.to_vec()), format!("{name}-{}-{}", key[0], key[1])))
			.collect();

		Self {
			name,
			columns: columns.iter().map(|column| column.to_string()).collect(),
			records,
			calls: Arc::default(),
		}
	}

	fn calls(&self) -> Vec<Vec<RecordKey>> {
		self.calls.lock().expect("Store lock poisoned.").clone()
	}
}
impl RecordFetcher for Store {
	type Error = Error;
	type Record = String;

	fn key_columns(&self) -> &[String] {
		&self.columns
	}

	fn fetch_by_keys(
		&self,
		keys: &[RecordKey],
		_passthrough: &Passthrough,
	) -> Result<HashMap<RecordKey, String>, Error> {
		self.calls.lock().expect("Store lock poisoned.").push(keys.to_vec());

		Ok(keys
			.iter()
			.filter_map(|key| self.records.get(key).map(|record| (key.clone(), record.clone())))
			.collect())
	}

	fn field_text(&self, record: &String, field: &str) -> Option<String> {
		(field == "title").then(|| format!("{} by {}", record, self.name))
	}
}

#[derive(Debug)]
enum StoreError {
	Search(Error),
	Unavailable,
}
impl From<Error> for StoreError {
	fn from(err: Error) -> Self {
		Self::Search(err)
	}
}

struct BrokenStore;
impl RecordFetcher for BrokenStore {
	type Error = StoreError;
	type Record = String;

	fn fetch_by_keys(
		&self,
		_keys: &[RecordKey],
		_passthrough: &Passthrough,
	) -> Result<HashMap<RecordKey, String>, StoreError> {
		Err(StoreError::Unavailable)
	}
}

fn client(daemon: &FakeSearchd) -> Client {
	let endpoint = Endpoint::new(daemon.host(), daemon.port());

	Client::with_transport(Arc::new(TcpTransport::new(endpoint)), CommandVersion::V1_19)
}

fn body_with_ids(ids: impl IntoIterator<Item = u64>) -> Vec<u8> {
	ids.into_iter()
		.fold(ResponseBuilder::v1_19(), |builder, id| builder.matched(id, 1, Vec::new()))
		.build()
}

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
	u32::from_be_bytes(bytes[offset..offset + 4].try_into().expect("Slice of four bytes."))
}

#[test]
fn cached_window_serves_indexes_it_covers() {
	sphinx_testkit::init_tracing();

	let daemon = FakeSearchd::spawn(vec![
		Reply::ok(body_with_ids(0..10)),
		Reply::ok(body_with_ids([15])),
	])
	.expect("Failed to start fake searchd.");
	let query = SearchQuery::new("docs").slice(0, 10).expect("Slice failed.");
	let mut set = SearchSet::new(client(&daemon), query, Matches);

	assert_eq!(set.items().expect("Search failed.").len(), 10);
	assert_eq!(daemon.connections(), 1);
	assert_eq!(set.get(5).expect("Get failed.").map(|matched| matched.id), Some(5));
	assert_eq!(set.slice(2, 4).expect("Slice failed.").len(), 2);
	assert_eq!(daemon.connections(), 1);
	assert_eq!(set.get(15).expect("Get failed.").map(|matched| matched.id), Some(15));
	assert_eq!(set.get(15).expect("Get failed.").map(|matched| matched.id), Some(15));
	assert_eq!(daemon.connections(), 2);

	let second = &daemon.requests()[1];

	assert_eq!(u32_at(second, 12), 15);
	assert_eq!(u32_at(second, 16), 1);
}

#[test]
fn negative_indexes_fail_regardless_of_cache_state() {
	let daemon = FakeSearchd::spawn(vec![Reply::ok(body_with_ids(0..3))])
		.expect("Failed to start fake searchd.");
	let mut set = SearchSet::new(client(&daemon), SearchQuery::new("docs"), Matches);

	assert!(matches!(set.get(-1), Err(Error::NegativeIndex { index: -1 })));

	set.items().expect("Search failed.");

	assert!(matches!(set.slice(-2, 3), Err(Error::NegativeIndex { .. })));
	assert!(matches!(set.get(-7), Err(Error::NegativeIndex { .. })));
	assert_eq!(daemon.connections(), 1);
}

#[test]
fn empty_queries_never_reach_the_daemon() {
	let daemon = FakeSearchd::spawn(Vec::new()).expect("Failed to start fake searchd.");
	let mut none = SearchSet::new(client(&daemon), SearchQuery::new("docs").none(), Matches);
	let zero = SearchQuery::new("docs").slice(0, 0).expect("Slice failed.");
	let mut zero = SearchSet::new(client(&daemon), zero, Matches);

	assert!(none.items().expect("Empty search failed.").is_empty());
	assert_eq!(none.count().expect("Count failed."), 0);
	assert!(zero.items().expect("Empty search failed.").is_empty());
	assert_eq!(daemon.connections(), 0);
}

#[test]
fn window_past_max_matches_fails_before_io() {
	let daemon = FakeSearchd::spawn(Vec::new()).expect("Failed to start fake searchd.");
	let mut set = SearchSet::new(client(&daemon), SearchQuery::new("docs"), Matches);

	assert!(matches!(set.get(1_000), Err(Error::InvalidQuery { .. })));
	assert_eq!(daemon.connections(), 0);
}

#[test]
fn count_is_capped_at_max_matches() {
	let body = ResponseBuilder::v1_19().matched(1, 1, Vec::new()).totals(20, 5_000, 3).build();
	let daemon = FakeSearchd::spawn(vec![Reply::ok(body)]).expect("Failed to start fake searchd.");
	let mut set = SearchSet::new(client(&daemon), SearchQuery::new("docs"), Matches);

	assert_eq!(set.count().expect("Count failed."), 1_000);
	assert_eq!(set.meta().expect("Meta failed.").time_ms, 3);
	assert_eq!(daemon.connections(), 1);
}

#[test]
fn warnings_are_kept_on_the_set() {
	let daemon = FakeSearchd::spawn(vec![Reply::warning("index is stale", body_with_ids([4]))])
		.expect("Failed to start fake searchd.");
	let mut set = SearchSet::new(client(&daemon), SearchQuery::new("docs"), Matches);

	assert_eq!(set.items().expect("Search failed.").len(), 1);
	assert_eq!(set.warning(), Some("index is stale"));
}

#[test]
fn daemon_errors_surface_through_the_set() {
	let daemon = FakeSearchd::spawn(vec![Reply::error("unknown index 'docs'")])
		.expect("Failed to start fake searchd.");
	let mut set = SearchSet::new(client(&daemon), SearchQuery::new("docs"), Matches);
	let err = set.items().expect_err("Expected a daemon error.");

	assert!(matches!(err, Error::Wire(_)));
	assert!(err.to_string().contains("unknown index 'docs'"), "Unexpected error: {err}");
}

#[test]
fn bound_hydration_drops_matches_without_records() {
	let daemon = FakeSearchd::spawn(vec![Reply::ok(body_with_ids([3, 1, 2]))])
		.expect("Failed to start fake searchd.");
	let store = Store::new("article", &[1, 3]);
	let mut set = SearchSet::new(client(&daemon), SearchQuery::new("docs"), Bound(store.clone()));
	let hits = set.items().expect("Search failed.");

	let records = hits.iter().map(|hit| hit.as_str()).collect::<Vec<_>>();

	assert_eq!(records, vec!["article-3", "article-1"]);
	assert_eq!(Hit::meta(&hits[0]).id, 3);
	assert_eq!(store.calls(), vec![vec![
		RecordKey::single(3),
		RecordKey::single(1),
		RecordKey::single(2)
	]]);
}

#[test]
fn matches_sharing_a_key_each_get_the_record() {
	let daemon = FakeSearchd::spawn(vec![Reply::ok(body_with_ids([7, 7]))])
		.expect("Failed to start fake searchd.");
	let store = Store::new("article", &[7]);
	let mut set = SearchSet::new(client(&daemon), SearchQuery::new("docs"), Bound(store.clone()));
	let hits = set.items().expect("Search failed.");
	let records = hits.iter().map(|hit| hit.as_str()).collect::<Vec<_>>();

	assert_eq!(records, vec!["article-7", "article-7"]);
	assert_eq!(store.calls(), vec![vec![RecordKey::single(7)]]);
}

#[test]
fn composite_keys_join_and_drop_unmatched() {
	let body = ResponseBuilder::v1_19()
		.attr("shop_id", ATTR_INTEGER)
		.attr("sku", ATTR_INTEGER)
		.matched(1, 1, vec![Cell::Uint(1), Cell::Uint(100)])
		.matched(2, 1, vec![Cell::Uint(1), Cell::Uint(200)])
		.matched(3, 1, vec![Cell::Uint(2), Cell::Uint(200)])
		.build();
	let daemon = FakeSearchd::spawn(vec![Reply::ok(body)]).expect("Failed to start fake searchd.");
	let store = Store::composite("item", ["shop_id", "sku"], &[[1, 100], [2, 200]]);
	let mut set = SearchSet::new(client(&daemon), SearchQuery::new("items"), Bound(store));
	let hits = set.items().expect("Search failed.");

	assert_eq!(hits.len(), 2);
	assert_eq!(Hit::meta(&hits[0]).key, RecordKey(vec![1, 100]));
	assert_eq!(hits[1].as_str(), "item-2-200");
}

#[test]
fn discriminated_results_keep_match_order() {
	let body = ResponseBuilder::v1_19()
		.attr("content_type", ATTR_INTEGER)
		.matched(1, 1, vec![Cell::Uint(10)])
		.matched(2, 1, vec![Cell::Uint(20)])
		.matched(3, 1, vec![Cell::Uint(10)])
		.matched(4, 1, vec![Cell::Uint(20)])
		.build();
	let daemon = FakeSearchd::spawn(vec![Reply::ok(body)]).expect("Failed to start fake searchd.");
	let articles = Store::new("article", &[1, 3]);
	let authors = Store::new("author", &[2]);
	let registry =
		Discriminated::new().register(10, articles.clone()).register(20, authors.clone());
	let mut set = SearchSet::new(client(&daemon), SearchQuery::new("everything"), registry);
	let rows = set.items().expect("Search failed.");
	let records = rows
		.iter()
		.filter_map(Row::as_record)
		.map(|hit| hit.as_str())
		.collect::<Vec<_>>();

	assert_eq!(records, vec!["article-1", "author-2", "article-3"]);
	assert_eq!(articles.calls().len(), 1);
	assert_eq!(authors.calls(), vec![vec![RecordKey::single(2), RecordKey::single(4)]]);
}

#[test]
fn configured_discriminator_selects_the_fetcher() {
	let body = ResponseBuilder::v1_19()
		.attr("kind", ATTR_INTEGER)
		.matched(1, 1, vec![Cell::Uint(10)])
		.matched(1, 1, vec![Cell::Uint(10)])
		.build();
	let daemon = FakeSearchd::spawn(vec![Reply::ok(body)]).expect("Failed to start fake searchd.");
	let defaults = QueryDefaults { discriminator: "kind".to_string(), ..QueryDefaults::default() };
	let registry =
		Discriminated::with_defaults(&defaults).register(10, Store::new("article", &[1]));

	assert_eq!(registry.attribute(), "kind");

	let mut set = SearchSet::new(client(&daemon), SearchQuery::new("everything"), registry);
	let rows = set.items().expect("Search failed.");

	assert_eq!(rows.len(), 2);
	assert!(rows.iter().all(|row| row.as_record().is_some_and(|hit| hit.as_str() == "article-1")));
}

#[test]
fn unregistered_discriminator_fails() {
	let body = ResponseBuilder::v1_19()
		.attr("content_type", ATTR_INTEGER)
		.matched(1, 1, vec![Cell::Uint(99)])
		.build();
	let daemon = FakeSearchd::spawn(vec![Reply::ok(body)]).expect("Failed to start fake searchd.");
	let registry = Discriminated::new().register(10, Store::new("article", &[1]));
	let mut set = SearchSet::new(client(&daemon), SearchQuery::new("everything"), registry);

	assert!(matches!(set.items(), Err(Error::UnknownDiscriminator { value: 99, .. })));
}

#[test]
fn missing_discriminator_returns_raw_matches() {
	let daemon = FakeSearchd::spawn(vec![Reply::ok(body_with_ids([8, 9]))])
		.expect("Failed to start fake searchd.");
	let registry = Discriminated::new().register(10, Store::new("article", &[8]));
	let mut set = SearchSet::new(client(&daemon), SearchQuery::new("everything"), registry);
	let rows = set.items().expect("Search failed.");

	assert!(rows.iter().all(|row| matches!(row, Row::Raw(_))));
	assert_eq!(rows.iter().map(Row::id).collect::<Vec<_>>(), vec![8, 9]);
}

#[test]
fn fetcher_errors_propagate_unchanged() {
	let daemon = FakeSearchd::spawn(vec![Reply::ok(body_with_ids([1]))])
		.expect("Failed to start fake searchd.");
	let mut set = SearchSet::new(client(&daemon), SearchQuery::new("docs"), Bound(BrokenStore));

	assert!(matches!(set.items(), Err(StoreError::Unavailable)));
	assert!(matches!(set.get(-1), Err(StoreError::Search(Error::NegativeIndex { .. }))));
}

#[test]
fn grouped_results_hydrate_group_values() {
	let body = ResponseBuilder::v1_19()
		.attr(related::GROUP_KEY, ATTR_INTEGER)
		.attr(related::GROUP_COUNT, ATTR_INTEGER)
		.matched(11, 1, vec![Cell::Uint(5), Cell::Uint(3_000)])
		.matched(12, 1, vec![Cell::Uint(6), Cell::Uint(2)])
		.build();
	let daemon = FakeSearchd::spawn(vec![Reply::ok(body)]).expect("Failed to start fake searchd.");
	let authors = Store::new("author", &[5, 6]);
	let mut set = SearchSet::new(
		client(&daemon),
		SearchQuery::new("docs"),
		Grouped::new(authors, "author_id"),
	);
	let hits = set.items().expect("Search failed.");

	let records = hits.iter().map(|hit| hit.as_str()).collect::<Vec<_>>();

	assert_eq!(records, vec!["author-5", "author-6"]);
	assert_eq!(related::group_count(&hits[0], 1_000), 1_000);
	assert_eq!(related::group_count(&hits[1], 1_000), 2);

	let request = &daemon.requests()[0];
	let needle = b"author_id";

	assert!(request.windows(needle.len()).any(|window| window == needle));
}

#[test]
fn passages_are_built_per_hit() {
	let body = ResponseBuilder::v1_19()
		.field("title")
		.matched(1, 1, Vec::new())
		.word("rust", 1, 1)
		.build();
	let daemon = FakeSearchd::spawn(vec![Reply::ok(body), Reply::strings(&["<b>rust</b> notes"])])
		.expect("Failed to start fake searchd.");
	let query = SearchQuery::new("docs").query("rust").passages(ExcerptOptions::default());
	let mut set = SearchSet::new(client(&daemon), query, Bound(Store::new("article", &[1])));
	let hits = set.items().expect("Search failed.");
	let passages = Hit::passages(&hits[0]).expect("Passages missing.");

	assert_eq!(passages.get("title").map(String::as_str), Some("<b>rust</b> notes"));
	assert_eq!(daemon.connections(), 2);
}

#[test]
fn refined_sets_start_uncached() {
	let replies = vec![Reply::ok(body_with_ids([1])), Reply::ok(body_with_ids([2]))];
	let daemon = FakeSearchd::spawn(replies).expect("Failed to start fake searchd.");
	let mut set = SearchSet::new(client(&daemon), SearchQuery::new("docs"), Matches);

	set.items().expect("Search failed.");

	let mut refined = set
		.refine(|query| query.filter("rating__gte", [4]))
		.expect("Refine failed.");

	assert!(set.is_cached());
	assert!(!refined.is_cached());
	assert_eq!(refined.get(0).expect("Get failed.").map(|matched| matched.id), Some(2));
	assert_eq!(daemon.connections(), 2);
}
