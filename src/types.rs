/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgTypeInfo, PgValueRef};
use sqlx::{Decode, Postgres, Type};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

/// Implements text-column decoding for enums stored as lowercase strings.
/// Values are always bound with `as_str()`, so only decoding is needed.
macro_rules! text_column {
    ($ty:ty) => {
        impl Type<Postgres> for $ty {
            fn type_info() -> PgTypeInfo {
                <String as Type<Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <String as Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> Decode<'r, Postgres> for $ty {
            fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
                let raw = <&str as Decode<Postgres>>::decode(value)?;
                Ok(raw.parse::<$ty>()?)
            }
        }
    };
}

/// Account role. Freelancers own portals and carry a plan; clients are invited into portals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Freelancer,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Freelancer => "freelancer",
            Role::Client => "client",
        }
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "freelancer" => Ok(Role::Freelancer),
            "client" => Ok(Role::Client),
            other => Err(ParseEnumError { kind: "role", value: other.to_string() }),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

text_column!(Role);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortalStatus {
    Active,
    Pending,
    Archived,
}

impl PortalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortalStatus::Active => "active",
            PortalStatus::Pending => "pending",
            PortalStatus::Archived => "archived",
        }
    }
}

impl FromStr for PortalStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(PortalStatus::Active),
            "pending" => Ok(PortalStatus::Pending),
            "archived" => Ok(PortalStatus::Archived),
            other => Err(ParseEnumError { kind: "portal status", value: other.to_string() }),
        }
    }
}

text_column!(PortalStatus);

/// What a one-time auth token may be exchanged for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    Otp,
    MagicLink,
    PasswordReset,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::Otp => "otp",
            TokenPurpose::MagicLink => "magic_link",
            TokenPurpose::PasswordReset => "password_reset",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_stored_values() {
        assert_eq!("freelancer".parse::<Role>().unwrap(), Role::Freelancer);
        assert_eq!("client".parse::<Role>().unwrap(), Role::Client);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Role::Client).unwrap(), serde_json::json!("client"));
    }

    #[test]
    fn portal_status_round_trips_through_as_str() {
        for status in [PortalStatus::Active, PortalStatus::Pending, PortalStatus::Archived] {
            assert_eq!(status.as_str().parse::<PortalStatus>().unwrap(), status);
        }
    }
}
