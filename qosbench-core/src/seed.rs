//! Per-component seed derivation for reproducible workloads
//!
//! A single master seed from the profile is expanded into independent seeds
//! for each generator the workload engine owns. SHA-256 keeps the derived
//! seeds deterministic and uncorrelated between components.
//!
//! # Example
//!
//! ```
//! use qosbench_core::seed::{derive_seed, components};
//!
//! let keys = derive_seed(42, components::KEY_CHOOSER);
//! assert_eq!(keys, derive_seed(42, components::KEY_CHOOSER));
//! assert_ne!(keys, derive_seed(42, components::FIELD_CHOOSER));
//! ```

use sha2::{Digest, Sha256};

/// Derive a component-specific seed from a master seed using SHA-256
pub fn derive_seed(master_seed: u64, component: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(master_seed.to_be_bytes());
    hasher.update(component.as_bytes());
    let result = hasher.finalize();

    u64::from_be_bytes([
        result[0], result[1], result[2], result[3], result[4], result[5], result[6], result[7],
    ])
}

/// Derive a component seed only when a master seed was configured
pub fn derive_optional(master_seed: Option<u64>, component: &str) -> Option<u64> {
    master_seed.map(|m| derive_seed(m, component))
}

/// Component names for the generators owned by the workload engine
pub mod components {
    pub const KEY_CHOOSER: &str = "key_chooser";
    pub const FIELD_CHOOSER: &str = "field_chooser";
    pub const FIELD_COUNT: &str = "field_count";
    pub const OPERATION_CHOOSER: &str = "operation_chooser";
    pub const SCAN_LENGTH: &str = "scan_length";
    pub const QOS_DRAW: &str = "qos_draw";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_seed_deterministic() {
        assert_eq!(derive_seed(42, "test_component"), derive_seed(42, "test_component"));
    }

    #[test]
    fn test_derive_seed_different_masters() {
        assert_ne!(derive_seed(100, "test"), derive_seed(200, "test"));
    }

    #[test]
    fn test_component_constants_yield_unique_seeds() {
        use components::*;

        let master = 42;
        let seeds = [
            derive_seed(master, KEY_CHOOSER),
            derive_seed(master, FIELD_CHOOSER),
            derive_seed(master, FIELD_COUNT),
            derive_seed(master, OPERATION_CHOOSER),
            derive_seed(master, SCAN_LENGTH),
            derive_seed(master, QOS_DRAW),
        ];

        for i in 0..seeds.len() {
            for j in (i + 1)..seeds.len() {
                assert_ne!(seeds[i], seeds[j], "Seeds {} and {} are not unique", i, j);
            }
        }
    }

    #[test]
    fn test_derive_optional() {
        assert_eq!(derive_optional(None, components::KEY_CHOOSER), None);
        assert_eq!(
            derive_optional(Some(7), components::KEY_CHOOSER),
            Some(derive_seed(7, components::KEY_CHOOSER))
        );
    }
}
