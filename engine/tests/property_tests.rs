//! Property tests for the validation gate and the conversation store

use proptest::prelude::*;

use atlas_engine::store::ConversationStore;
use atlas_engine::validator::{SparqlValidator, ValidationError};

proptest! {
    /// Any query containing a blocked keyword fails validation, no
    /// matter what surrounds it or how it is cased.
    #[test]
    fn prop_blocked_keyword_always_rejected(
        prefix in "[a-z ?{}.]{0,40}",
        keyword in prop::sample::select(vec![
            "DELETE", "INSERT", "DROP", "CREATE", "CLEAR", "LOAD",
            "delete", "Insert", "dRoP",
        ]),
        suffix in "[a-z ?{}.]{0,40}",
    ) {
        let validator = SparqlValidator::new();
        let query = format!("{}{}{}", prefix, keyword, suffix);
        prop_assert!(matches!(
            validator.validate(&query),
            Err(ValidationError::ForbiddenKeyword(_))
        ));
    }

    /// Simple single-variable SELECT queries over arbitrary variable
    /// names parse and pass.
    #[test]
    fn prop_simple_select_passes(var in "[a-z][a-z0-9]{0,8}") {
        // A random variable name may itself spell a blocked keyword;
        // those cases belong to the property above, not this one.
        let upper = var.to_uppercase();
        prop_assume!(!["DELETE", "INSERT", "DROP", "CREATE", "CLEAR", "LOAD"]
            .iter()
            .any(|kw| upper.contains(kw)));

        let validator = SparqlValidator::new();
        let query = format!("SELECT ?{} WHERE {{ ?{} wdt:P31 wd:Q5 }}", var, var);
        prop_assert!(validator.validate(&query).is_ok());
    }

    /// The store never holds more conversations than its capacity,
    /// whatever the interleaving of creates and appends.
    #[test]
    fn prop_store_never_exceeds_capacity(
        capacity in 1usize..8,
        operations in prop::collection::vec(any::<bool>(), 1..50),
    ) {
        let mut store = ConversationStore::new(capacity);
        let mut ids: Vec<String> = Vec::new();

        for create in operations {
            if create || ids.is_empty() {
                ids.push(store.create(None).id);
            } else {
                // Touch some previously created conversation; it may
                // have been evicted, which is fine.
                let id = &ids[ids.len() / 2];
                let _ = store.append_user(id, "touch");
            }
            prop_assert!(store.len() <= capacity);
        }
    }

    /// Eviction keeps exactly `capacity` conversations once enough have
    /// been created, and the survivors are the most recent creations.
    #[test]
    fn prop_eviction_keeps_most_recent(capacity in 1usize..6, extra in 1usize..10) {
        let mut store = ConversationStore::new(capacity);
        let ids: Vec<String> = (0..capacity + extra)
            .map(|_| store.create(None).id)
            .collect();

        prop_assert_eq!(store.len(), capacity);
        for id in &ids[ids.len() - capacity..] {
            prop_assert!(store.get(id).is_ok());
        }
        for id in &ids[..ids.len() - capacity] {
            prop_assert!(store.get(id).is_err());
        }
    }
}
