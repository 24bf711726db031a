use conforma_core::{AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// A named regulatory standard (ISO 13485, MDR, ...) with a stable numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referential {
    id: i64,
    code: NonEmptyString,
    name: NonEmptyString,
}

impl Referential {
    /// Creates a validated referential.
    pub fn new(id: i64, code: impl Into<String>, name: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            id,
            code: NonEmptyString::new(code)?,
            name: NonEmptyString::new(name)?,
        })
    }

    /// Returns the stable numeric id.
    #[must_use]
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Returns the short machine code (e.g. `mdr`, `iso13485`).
    #[must_use]
    pub fn code(&self) -> &str {
        self.code.as_str()
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }
}
