pub mod client;
pub mod excerpt;
pub mod protocol;
pub mod request;
pub mod response;
pub mod transport;
pub mod update;

mod codec;
mod error;

pub use client::Client;
pub use error::{Error, Result};
pub use excerpt::{ExcerptOptions, ExcerptRequest};
pub use protocol::{
	AttrType, CommandVersion, GroupFunc, MAX_INT, MatchMode, RankMode, SortMode, Status,
};
pub use request::{Filter, FilterValues, GeoAnchor, GroupBy, IdRange, SearchRequest};
pub use response::{AttrSchema, AttrValue, Frame, Match, QueryResult, WordStats, decode_search};
pub use transport::{Connection, Endpoint, TcpTransport, Transport, connect};
pub use update::UpdateRequest;
