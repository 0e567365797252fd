//! Deterministic table identifiers derived from field sets.

/// Characters stripped from generated identifiers.
const BAD_CHARS: &[char] = &[' ', '/', '-'];

/// Object-name length limits imposed by the backing storage engine.
///
/// The default mirrors Postgres: 63-character object names, with 13
/// characters reserved for per-geo-level suffixes appended by the schema
/// builder. Storage engines with other limits supply their own values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameLimits {
    pub max_object_name: usize,
    pub reserved_suffix: usize,
}

impl NameLimits {
    pub const fn max_id_len(&self) -> usize {
        self.max_object_name - self.reserved_suffix
    }
}

impl Default for NameLimits {
    fn default() -> Self {
        Self {
            max_object_name: 63,
            reserved_suffix: 13,
        }
    }
}

/// Derive a storage-safe table id from a set of field names.
///
/// Fields are sorted lexicographically first, so the same field set always
/// yields the same id regardless of declaration order. Two field tables
/// declared with the same fields in different orders therefore collide;
/// the registry rejects the second registration rather than overwriting.
pub fn generate_table_id(fields: &[String], limits: &NameLimits) -> String {
    let mut sorted: Vec<&str> = fields.iter().map(String::as_str).collect();
    sorted.sort_unstable();

    sorted
        .join("_")
        .chars()
        .filter(|c| !BAD_CHARS.contains(c))
        .take(limits.max_id_len())
        .collect::<String>()
        .to_uppercase()
}
