//! ID generation utilities.

use std::sync::{Mutex, PoisonError};

use ulid::{Generator, Ulid};
use uuid::Uuid;

/// Process-wide monotonic source, shared by every [`IdGenerator`].
static ULIDS: Mutex<Generator> = Mutex::new(Generator::new());

/// ID generator for entities.
///
/// Ids are lowercase ULIDs from one monotonic generator, so within this
/// process a later id always sorts after an earlier one, even inside the
/// same millisecond.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    #[must_use]
    pub fn generate(&self) -> String {
        let next = ULIDS
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate();
        let ulid = match next {
            Ok(ulid) => ulid,
            Err(e) => {
                // Random part exhausted within one millisecond
                tracing::warn!(error = %e, "Monotonic ULID overflow, using a random one");
                Ulid::new()
            }
        };
        ulid.to_string().to_lowercase()
    }

    /// Generate an opaque access token.
    #[must_use]
    pub fn generate_token(&self) -> String {
        // No time component, unlike ULIDs
        Uuid::new_v4().simple().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ulid() {
        let id_gen = IdGenerator::new();
        let id1 = id_gen.generate();
        let id2 = id_gen.generate();

        assert_eq!(id1.len(), 26);
        assert_ne!(id1, id2);
        assert_eq!(id1, id1.to_lowercase());
    }

    #[test]
    fn test_ids_sort_in_creation_order() {
        let id_gen = IdGenerator::new();
        let other = IdGenerator::new();

        let ids: Vec<String> = (0..10_000)
            .map(|i| if i % 2 == 0 { id_gen.generate() } else { other.generate() })
            .collect();

        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(sorted, ids);
    }

    #[test]
    fn test_generate_token() {
        let id_gen = IdGenerator::new();
        let token = id_gen.generate_token();

        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
