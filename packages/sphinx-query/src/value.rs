use time::{Date, OffsetDateTime, PrimitiveDateTime};

use crate::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterValue {
	Int(i64),
	Float(f64),
}
impl FilterValue {
	pub fn is_float(&self) -> bool {
		matches!(self, Self::Float(_))
	}

	pub(crate) fn as_f32(&self) -> f32 {
		match self {
			Self::Int(value) => *value as f32,
			Self::Float(value) => *value as f32,
		}
	}
}

pub trait ToFilterValue {
	fn to_filter_value(&self) -> Result<FilterValue>;
}

impl ToFilterValue for FilterValue {
	fn to_filter_value(&self) -> Result<FilterValue> {
		Ok(*self)
	}
}

impl<T> ToFilterValue for &T
where
	T: ToFilterValue + ?Sized,
{
	fn to_filter_value(&self) -> Result<FilterValue> {
		(**self).to_filter_value()
	}
}

impl ToFilterValue for bool {
	fn to_filter_value(&self) -> Result<FilterValue> {
		Ok(FilterValue::Int(i64::from(*self)))
	}
}

macro_rules! lossless_int {
	($($ty:ty),*) => {
		$(
			impl ToFilterValue for $ty {
				fn to_filter_value(&self) -> Result<FilterValue> {
					Ok(FilterValue::Int(i64::from(*self)))
				}
			}
		)*
	};
}

lossless_int!(i8, i16, i32, i64, u8, u16, u32);

impl ToFilterValue for u64 {
	fn to_filter_value(&self) -> Result<FilterValue> {
		i64::try_from(*self)
			.map(FilterValue::Int)
			.map_err(|_| Error::invalid(format!("filter value {self} is out of range.")))
	}
}

impl ToFilterValue for usize {
	fn to_filter_value(&self) -> Result<FilterValue> {
		i64::try_from(*self)
			.map(FilterValue::Int)
			.map_err(|_| Error::invalid(format!("filter value {self} is out of range.")))
	}
}

impl ToFilterValue for f32 {
	fn to_filter_value(&self) -> Result<FilterValue> {
		Ok(FilterValue::Float(f64::from(*self)))
	}
}

impl ToFilterValue for f64 {
	fn to_filter_value(&self) -> Result<FilterValue> {
		Ok(FilterValue::Float(*self))
	}
}

impl ToFilterValue for str {
	fn to_filter_value(&self) -> Result<FilterValue> {
		let raw = self.trim();

		if let Ok(value) = raw.parse::<i64>() {
			return Ok(FilterValue::Int(value));
		}

		raw.parse::<f64>()
			.map(FilterValue::Float)
			.map_err(|_| Error::invalid(format!("filter value {raw:?} is not numeric.")))
	}
}

impl ToFilterValue for String {
	fn to_filter_value(&self) -> Result<FilterValue> {
		self.as_str().to_filter_value()
	}
}

impl ToFilterValue for OffsetDateTime {
	fn to_filter_value(&self) -> Result<FilterValue> {
		Ok(FilterValue::Int(self.unix_timestamp()))
	}
}

impl ToFilterValue for PrimitiveDateTime {
	fn to_filter_value(&self) -> Result<FilterValue> {
		Ok(FilterValue::Int(self.assume_utc().unix_timestamp()))
	}
}

impl ToFilterValue for Date {
	fn to_filter_value(&self) -> Result<FilterValue> {
		Ok(FilterValue::Int(self.midnight().assume_utc().unix_timestamp()))
	}
}

pub(crate) fn next_up(value: f32) -> f32 {
	if value.is_nan() || value == f32::INFINITY {
		return value;
	}
	if value == 0.0 {
		return f32::from_bits(1);
	}

	let bits = value.to_bits();

	if value > 0.0 { f32::from_bits(bits + 1) } else { f32::from_bits(bits - 1) }
}

pub(crate) fn next_down(value: f32) -> f32 {
	-next_up(-value)
}
