//! Model registry: register model bytes under an ID and build runners from
//! them with [`ModelSource::Registered`](crate::ModelSource::Registered).

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;

static REGISTRY: Lazy<Mutex<HashMap<String, &'static [u8]>>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn registry() -> MutexGuard<'static, HashMap<String, &'static [u8]>> {
    // The map is always left consistent, so a poisoned lock is still usable.
    REGISTRY.lock().unwrap_or_else(|e| e.into_inner())
}

/// Registers a model with the given ID.
/// Registering the same ID twice replaces the previous registration.
pub fn register_model(id: &str, data: &'static [u8]) {
    registry().insert(id.to_string(), data);
}

/// Removes a registration. Returns true if the ID was registered.
pub fn unregister_model(id: &str) -> bool {
    registry().remove(id).is_some()
}

/// Returns the IDs of all registered models, sorted.
pub fn list_models() -> Vec<String> {
    let mut ids: Vec<String> = registry().keys().cloned().collect();
    ids.sort();
    ids
}

/// Returns true if the model is registered.
pub fn is_registered(id: &str) -> bool {
    registry().contains_key(id)
}

pub(crate) fn model_data(id: &str) -> Option<&'static [u8]> {
    registry().get(id).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup() {
        register_model("registry-test-a", b"abc");
        assert!(is_registered("registry-test-a"));
        assert_eq!(model_data("registry-test-a"), Some(&b"abc"[..]));
        assert!(list_models().contains(&"registry-test-a".to_string()));
    }

    #[test]
    fn reregister_replaces() {
        register_model("registry-test-b", b"one");
        register_model("registry-test-b", b"two");
        assert_eq!(model_data("registry-test-b"), Some(&b"two"[..]));
        assert!(unregister_model("registry-test-b"));
        assert!(!is_registered("registry-test-b"));
        assert!(!unregister_model("registry-test-b"));
    }
}
