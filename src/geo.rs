use serde::{Deserialize, Serialize};

/// A place identified by level, code and boundary-delineation version,
/// e.g. a ward, municipality or province. Opaque to the engine beyond
/// being the lookup key into the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Geography {
    pub level: String,
    pub code: String,
    pub version: String,
}

impl Geography {
    pub fn new(
        level: impl Into<String>,
        code: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            level: level.into(),
            code: code.into(),
            version: version.into(),
        }
    }

    /// Key used in per-geography result maps, e.g. "municipality-BUF".
    pub fn geo_key(&self) -> String {
        format!("{}-{}", self.level, self.code)
    }
}
