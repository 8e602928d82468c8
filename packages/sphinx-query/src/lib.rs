pub mod hydrate;
pub mod lookup;
pub mod query;
pub mod related;
pub mod set;
pub mod value;

mod error;

pub use error::{Error, Result};
pub use hydrate::{Discriminated, Hit, MatchMeta, PassageContext, RecordFetcher, RecordKey, Row};
pub use lookup::Lookup;
pub use query::{Passthrough, SearchQuery, Weights, escape};
pub use set::{Bound, Grouped, Materialize, Matches, SearchMeta, SearchSet};
pub use value::{FilterValue, ToFilterValue};
