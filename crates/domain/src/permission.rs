use std::fmt::{Display, Formatter};
use std::str::FromStr;

use sentra_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Suffix naming the sensitive-column facet of a base permission key.
pub const SENSITIVE_COLUMNS_SUFFIX: &str = ".sensibleColumns";

/// Access level attached to a permission grant.
///
/// `Read`, `Write` and `All` form a bitmask lattice where each level carries
/// the bits of the levels below it. `Deny` sits outside the lattice: it is a
/// sentinel that overrides any grant for the same key regardless of source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionType {
    /// Read-only access.
    Read,
    /// Write access, implies read.
    Write,
    /// Full access, implies write and read.
    All,
    /// Explicit refusal that wins over every grant.
    Deny,
}

impl PermissionType {
    /// Returns the stable storage code for this type.
    #[must_use]
    pub fn as_code(&self) -> i16 {
        match self {
            Self::Read => 1,
            Self::Write => 3,
            Self::All => 7,
            Self::Deny => 100,
        }
    }

    /// Parses a storage code, failing fast on unknown values.
    pub fn from_code(code: i16) -> AppResult<Self> {
        match code {
            1 => Ok(Self::Read),
            3 => Ok(Self::Write),
            7 => Ok(Self::All),
            100 => Ok(Self::Deny),
            other => Err(AppError::Validation(format!(
                "unknown permission type code '{other}'"
            ))),
        }
    }

    /// Returns a stable storage value for this type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::All => "all",
            Self::Deny => "deny",
        }
    }

    /// Returns whether a held type satisfies a required type.
    ///
    /// `Deny` is required only by callers probing for an explicit refusal:
    /// it is satisfied by `Deny` alone. A held `Deny` never satisfies any
    /// other requirement.
    #[must_use]
    pub fn satisfies(self, required: PermissionType) -> bool {
        if required == Self::Deny {
            return self == Self::Deny;
        }
        if self == Self::Deny {
            return false;
        }

        (self.as_code() & required.as_code()) == required.as_code()
    }

    /// Returns the types a grant editor may offer.
    ///
    /// `Write` is reachable only as an implied value and is deliberately
    /// absent from this list.
    #[must_use]
    pub fn authorable() -> &'static [Self] {
        const AUTHORABLE: &[PermissionType] = &[
            PermissionType::Read,
            PermissionType::All,
            PermissionType::Deny,
        ];

        AUTHORABLE
    }
}

impl FromStr for PermissionType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "all" => Ok(Self::All),
            "deny" => Ok(Self::Deny),
            _ => Err(AppError::Validation(format!(
                "unknown permission type value '{value}'"
            ))),
        }
    }
}

/// String key naming a protectable resource family or one of its facets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionKey(NonEmptyString);

impl PermissionKey {
    /// Creates a validated permission key.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        Ok(Self(NonEmptyString::new(value)?))
    }

    /// Returns the underlying key string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Derives the sensitive-column facet key for this base key.
    #[must_use]
    pub fn sensitive_columns_key(&self) -> Self {
        Self(
            NonEmptyString::new(format!("{}{SENSITIVE_COLUMNS_SUFFIX}", self.as_str()))
                .unwrap_or_else(|_| self.0.clone()),
        )
    }
}

impl Display for PermissionKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.as_str())
    }
}

/// Registered permission a role may reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDefinition {
    key: PermissionKey,
    section: String,
    name: String,
    description: Option<String>,
    from_system: bool,
}

impl PermissionDefinition {
    /// Creates a permission definition.
    pub fn new(
        key: PermissionKey,
        section: impl Into<String>,
        name: impl Into<String>,
        description: Option<String>,
        from_system: bool,
    ) -> Self {
        Self {
            key,
            section: section.into(),
            name: name.into(),
            description,
            from_system,
        }
    }

    /// Returns the permission key.
    #[must_use]
    pub fn key(&self) -> &PermissionKey {
        &self.key
    }

    /// Returns the grouping section used by administrative listings.
    #[must_use]
    pub fn section(&self) -> &str {
        self.section.as_str()
    }

    /// Returns the human-readable name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns whether the permission was seeded by the system and may not
    /// be deleted.
    #[must_use]
    pub fn is_from_system(&self) -> bool {
        self.from_system
    }
}
