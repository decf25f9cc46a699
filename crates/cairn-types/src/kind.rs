use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The kind of a stored object.
///
/// Every object handle carries this discriminant explicitly; callers match
/// on it instead of probing content for methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Key-value map.
    Map,
    /// Ordered list; appends through the operation layer are de-duplicated.
    List,
    /// Append-only log; duplicates are valid.
    Log,
}

impl ObjectKind {
    /// Lowercase name used in schemas and headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Map => "map",
            Self::List => "list",
            Self::Log => "log",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "map" => Ok(Self::Map),
            "list" => Ok(Self::List),
            "log" => Ok(Self::Log),
            other => Err(TypeError::UnknownKind(other.to_string())),
        }
    }
}

/// Role of a member inside an access group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Reader,
    Writer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reader => "reader",
            Self::Writer => "writer",
            Self::Admin => "admin",
        }
    }

    /// Returns `true` if this role may mutate objects owned by the group.
    pub fn can_write(&self) -> bool {
        matches!(self, Self::Writer | Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reader" => Ok(Self::Reader),
            "writer" => Ok(Self::Writer),
            "admin" => Ok(Self::Admin),
            other => Err(TypeError::UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_display_and_parse() {
        for kind in [ObjectKind::Map, ObjectKind::List, ObjectKind::Log] {
            assert_eq!(kind.to_string().parse::<ObjectKind>().unwrap(), kind);
        }
        assert!(matches!(
            "comap".parse::<ObjectKind>(),
            Err(TypeError::UnknownKind(_))
        ));
    }

    #[test]
    fn kind_serde_lowercase() {
        assert_eq!(serde_json::to_string(&ObjectKind::Log).unwrap(), "\"log\"");
    }

    #[test]
    fn role_write_permission() {
        assert!(!Role::Reader.can_write());
        assert!(Role::Writer.can_write());
        assert!(Role::Admin.can_write());
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
    }
}
