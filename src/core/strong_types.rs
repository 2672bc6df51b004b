// Strong Types - newtypes shared by the store, services and HTTP layer

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Object id for users, photos and comments.
///
/// Ids are 64-bit integers in the store but travel as decimal strings on
/// the wire: JavaScript numbers cannot hold the full range. Deserialization
/// accepts either form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, sqlx::Type)]
#[sqlx(transparent)]
pub struct Id(pub i64);

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Id {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<Id> for i64 {
    fn from(id: Id) -> Self {
        id.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError(String);

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid id: {:?}", self.0)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for Id {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .map(Id)
            .ok_or_else(|| ParseIdError(s.to_string()))
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

struct IdVisitor;

impl<'de> Visitor<'de> for IdVisitor {
    type Value = Id;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a positive integer id or its decimal string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Id, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Id, E> {
        if v > 0 {
            Ok(Id(v))
        } else {
            Err(E::custom(ParseIdError(v.to_string())))
        }
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Id, E> {
        i64::try_from(v)
            .map_err(|_| E::custom(ParseIdError(v.to_string())))
            .and_then(|v| self.visit_i64(v))
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IdVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Id(7203686740172800001)).unwrap();
        assert_eq!(json, "\"7203686740172800001\"");
    }

    #[test]
    fn test_deserializes_from_string_or_number() {
        let from_str: Id = serde_json::from_str("\"42\"").unwrap();
        let from_num: Id = serde_json::from_str("42").unwrap();
        assert_eq!(from_str, Id(42));
        assert_eq!(from_num, Id(42));
    }

    #[test]
    fn test_rejects_malformed_ids() {
        assert!("abc".parse::<Id>().is_err());
        assert!("-5".parse::<Id>().is_err());
        assert!("0".parse::<Id>().is_err());
        assert!(serde_json::from_str::<Id>("\"64f0c2\"").is_err());
    }
}
