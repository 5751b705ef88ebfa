// Copyright (c) 2023-2024 CMU Database Group
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! SQL value types and constant values carried by expression nodes.

use std::fmt::Display;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The semantic type of a value produced by an expression.
///
/// The declaration order is significant: arithmetic type promotion picks the maximum of the
/// operand types, and everything above [`ValueType::Decimal`] is not a valid arithmetic operand.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    #[default]
    Invalid,
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Decimal,
    Timestamp,
    Date,
    Varchar,
    Varbinary,
}

impl ValueType {
    /// The largest type arithmetic operators may promote to.
    pub const MAX_NUMERIC: ValueType = ValueType::Decimal;

    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            Self::TinyInt | Self::SmallInt | Self::Integer | Self::BigInt
        )
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Invalid => "invalid",
            Self::Boolean => "boolean",
            Self::TinyInt => "tinyint",
            Self::SmallInt => "smallint",
            Self::Integer => "integer",
            Self::BigInt => "bigint",
            Self::Decimal => "decimal",
            Self::Timestamp => "timestamp",
            Self::Date => "date",
            Self::Varchar => "varchar",
            Self::Varbinary => "varbinary",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SerializableOrderedF64(pub OrderedFloat<f64>);

impl Serialize for SerializableOrderedF64 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let float = self.0 .0;
        if !float.is_finite() {
            return Err(serde::ser::Error::custom(format!(
                "decimal {float} has no JSON representation"
            )));
        }
        float.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SerializableOrderedF64 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let float = f64::deserialize(deserializer)?;
        Ok(SerializableOrderedF64(OrderedFloat(float)))
    }
}

/// A constant value. `Null` carries the type of the missing value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Value {
    Null(ValueType),
    Boolean(bool),
    TinyInt(i8),
    SmallInt(i16),
    Integer(i32),
    BigInt(i64),
    Decimal(SerializableOrderedF64),
    /// Microseconds since the unix epoch.
    Timestamp(i64),
    /// Days since the unix epoch.
    Date(i32),
    Varchar(Arc<str>),
    Varbinary(Arc<[u8]>),
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null(_) => write!(f, "NULL"),
            Self::Boolean(x) => write!(f, "{x}"),
            Self::TinyInt(x) => write!(f, "{x}"),
            Self::SmallInt(x) => write!(f, "{x}"),
            Self::Integer(x) => write!(f, "{x}"),
            Self::BigInt(x) => write!(f, "{x}"),
            Self::Decimal(x) => write!(f, "{}", x.0),
            Self::Timestamp(x) => write!(f, "{x}(timestamp)"),
            Self::Date(x) => write!(f, "{x}(date)"),
            Self::Varchar(x) => write!(f, "'{x}'"),
            Self::Varbinary(x) => write!(f, "<len:{}>", x.len()),
        }
    }
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Null(typ) => *typ,
            Self::Boolean(_) => ValueType::Boolean,
            Self::TinyInt(_) => ValueType::TinyInt,
            Self::SmallInt(_) => ValueType::SmallInt,
            Self::Integer(_) => ValueType::Integer,
            Self::BigInt(_) => ValueType::BigInt,
            Self::Decimal(_) => ValueType::Decimal,
            Self::Timestamp(_) => ValueType::Timestamp,
            Self::Date(_) => ValueType::Date,
            Self::Varchar(_) => ValueType::Varchar,
            Self::Varbinary(_) => ValueType::Varbinary,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }

    pub fn decimal(x: f64) -> Self {
        Self::Decimal(SerializableOrderedF64(OrderedFloat(x)))
    }

    pub fn varchar(x: &str) -> Self {
        Self::Varchar(x.into())
    }

    /// Parses a `YYYY-MM-DD` literal into a date value.
    pub fn date_from_str(s: &str) -> Result<Self> {
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid date literal '{s}'"))?;
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).context("unix epoch out of range")?;
        let days_since_epoch = date.signed_duration_since(epoch).num_days();
        let days = i32::try_from(days_since_epoch)
            .with_context(|| format!("date literal '{s}' out of range"))?;
        Ok(Self::Date(days))
    }
}
