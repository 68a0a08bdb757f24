//! Newtype wrappers around 64-bit snowflakes for guild, channel and user
//! identifiers.
//!
//! Using distinct types prevents accidentally passing a `UserId` where a
//! `ChannelId` is expected. The gateway encodes snowflakes as JSON strings,
//! so every ID serializes as a string and deserializes from either a string
//! or a number.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Macro to define a newtype ID wrapper around a `u64` snowflake.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            /// Create an identifier from a raw snowflake.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Return the raw snowflake value.
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u64>().map(Self)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_any(SnowflakeVisitor).map(Self)
            }
        }
    };
}

/// Accepts a snowflake encoded as a decimal string or an unsigned integer.
struct SnowflakeVisitor;

impl<'de> Visitor<'de> for SnowflakeVisitor {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a snowflake as a string or unsigned integer")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
        u64::try_from(v).map_err(|_| E::custom(format!("negative snowflake: {v}")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
        v.parse::<u64>()
            .map_err(|e| E::custom(format!("invalid snowflake '{v}': {e}")))
    }
}

define_id!(
    /// Identifier of a guild (the tenant-like group owning channels).
    GuildId
);

define_id!(
    /// Identifier of a voice or stage channel.
    ChannelId
);

define_id!(
    /// Identifier of a user account.
    UserId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_decimal() {
        assert_eq!(GuildId::new(81384788765712384).to_string(), "81384788765712384");
    }

    #[test]
    fn test_from_str() {
        let id: UserId = "80351110224678912".parse().expect("should parse");
        assert_eq!(id.get(), 80351110224678912);
        assert!("abc".parse::<UserId>().is_err());
    }

    #[test]
    fn test_deserialize_string_or_number() {
        let from_str: ChannelId = serde_json::from_str("\"41771983423143937\"").expect("string");
        let from_num: ChannelId = serde_json::from_str("41771983423143937").expect("number");
        assert_eq!(from_str, from_num);
        assert!(serde_json::from_str::<ChannelId>("-1").is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&UserId::new(7)).expect("serialize");
        assert_eq!(json, "\"7\"");
    }
}
