use std::{fmt, str::FromStr};

use crate::{Error, Result};

pub const CLIENT_PROTOCOL: u32 = 1;
pub const MAX_INT: u32 = 0x7FFF_FFFF;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
	Search = 0,
	Excerpt = 1,
	Update = 2,
}
impl Command {
	pub fn version(self) -> u16 {
		match self {
			Self::Search => CommandVersion::V1_19.as_u16(),
			Self::Excerpt => 0x100,
			Self::Update => 0x101,
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommandVersion {
	V1_7,
	#[default]
	V1_19,
}
impl CommandVersion {
	pub fn as_u16(self) -> u16 {
		match self {
			Self::V1_7 => 0x107,
			Self::V1_19 => 0x113,
		}
	}
}
impl FromStr for CommandVersion {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw.trim() {
			"1.7" => Ok(Self::V1_7),
			"1.19" => Ok(Self::V1_19),
			other => Err(Error::invalid(format!("unknown protocol version {other:?}."))),
		}
	}
}
impl fmt::Display for CommandVersion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let version = self.as_u16();

		write!(f, "{}.{}", version >> 8, version & 0xff)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
	Ok,
	Error,
	Retry,
	Warning,
}
impl Status {
	pub fn from_code(code: u32) -> Option<Self> {
		match code {
			0 => Some(Self::Ok),
			1 => Some(Self::Error),
			2 => Some(Self::Retry),
			3 => Some(Self::Warning),
			_ => None,
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchMode {
	#[default]
	All = 0,
	Any = 1,
	Phrase = 2,
	Boolean = 3,
	Extended = 4,
	FullScan = 5,
	Extended2 = 6,
}
impl FromStr for MatchMode {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"all" => Ok(Self::All),
			"any" => Ok(Self::Any),
			"phrase" => Ok(Self::Phrase),
			"boolean" => Ok(Self::Boolean),
			"extended" => Ok(Self::Extended),
			"fullscan" => Ok(Self::FullScan),
			"extended2" => Ok(Self::Extended2),
			other => Err(Error::invalid(format!("unknown match mode {other:?}."))),
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RankMode {
	#[default]
	ProximityBm25 = 0,
	Bm25 = 1,
	None = 2,
	WordCount = 3,
}
impl FromStr for RankMode {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"proximity_bm25" => Ok(Self::ProximityBm25),
			"bm25" => Ok(Self::Bm25),
			"none" => Ok(Self::None),
			"wordcount" => Ok(Self::WordCount),
			other => Err(Error::invalid(format!("unknown rank mode {other:?}."))),
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortMode {
	#[default]
	Relevance = 0,
	AttrDesc = 1,
	AttrAsc = 2,
	TimeSegments = 3,
	Extended = 4,
	Expr = 5,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GroupFunc {
	#[default]
	Day = 0,
	Week = 1,
	Month = 2,
	Year = 3,
	Attr = 4,
	AttrPair = 5,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttrType {
	Integer,
	Timestamp,
	Ordinal,
	Bool,
	Float,
	Multi,
	Unknown(u32),
}
impl AttrType {
	const MULTI_FLAG: u32 = 0x4000_0000;

	pub fn from_code(code: u32) -> Self {
		if code & Self::MULTI_FLAG != 0 {
			return Self::Multi;
		}

		match code {
			1 => Self::Integer,
			2 => Self::Timestamp,
			3 => Self::Ordinal,
			4 => Self::Bool,
			5 => Self::Float,
			other => Self::Unknown(other),
		}
	}
}
