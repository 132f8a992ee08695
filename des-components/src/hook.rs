//! Per-request metadata derived from the request key.
//!
//! The entry stage applies its hook once, right before a request enters the
//! pipeline. A hook is a pure function of the key: the trailing digits of the
//! key select one of three classes (`n % 3`), so identical keys always receive
//! identical metadata and a uniform keyspace fills the classes evenly.

use des_core::{DeadlineClass, EventMetadata, Request};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::HookError;

/// How the entry stage enriches a request before admission.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum MetadataHook {
    /// Leave metadata empty.
    #[default]
    None,
    /// Assign priority class `n % 3`.
    Priority,
    /// Assign a deadline class and its deadline (ticks, already scaled by the
    /// tick dilation). With `timeout_buffer` set, the request also gets a
    /// timeout budget of `deadline + buffer`.
    Deadline {
        deadlines: [f64; 3],
        timeout_buffer: Option<f64>,
    },
}

impl MetadataHook {
    /// Deadline hook with budgets `deadline + buffer`.
    pub fn deadline_with_timeout(deadlines: [f64; 3], buffer: f64) -> Self {
        MetadataHook::Deadline {
            deadlines,
            timeout_buffer: Some(buffer),
        }
    }

    /// Metadata this hook derives for `key`.
    pub fn derive(&self, key: &str) -> Result<EventMetadata, HookError> {
        let mut metadata = EventMetadata::default();
        match *self {
            MetadataHook::None => {}
            MetadataHook::Priority => {
                metadata.priority = Some((key_suffix(key)? % 3) as u8);
            }
            MetadataHook::Deadline {
                deadlines,
                timeout_buffer,
            } => {
                let class = DeadlineClass::from_index(key_suffix(key)?);
                let deadline = deadlines[class.index()];
                metadata.deadline = Some(deadline);
                metadata.deadline_class = Some(class);
                metadata.timeout_budget = timeout_buffer.map(|buffer| deadline + buffer);
            }
        }
        Ok(metadata)
    }

    /// Derive metadata for `request.key` and store it on the request.
    pub fn apply(&self, request: &mut Request) -> Result<(), HookError> {
        request.metadata = self.derive(&request.key)?;
        trace!(key = %request.key, metadata = ?request.metadata, "Applied metadata hook");
        Ok(())
    }
}

/// Trailing run of ASCII digits in `key`, e.g. `42` for `k-42`.
pub fn key_suffix(key: &str) -> Result<u64, HookError> {
    let digits_start = key
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)
        .ok_or_else(|| HookError::MissingKeySuffix(key.to_string()))?;
    key[digits_start..]
        .parse()
        .map_err(|_| HookError::SuffixOutOfRange(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use des_core::SimTime;

    const D: f64 = 3.0;

    fn latency_hook() -> MetadataHook {
        MetadataHook::deadline_with_timeout([40.0 * D, 45.0 * D, 50.0 * D], 10.0)
    }

    #[test]
    fn suffix_parsing() {
        assert_eq!(key_suffix("k-10001"), Ok(10001));
        assert_eq!(key_suffix("7"), Ok(7));
        assert_eq!(
            key_suffix("k-"),
            Err(HookError::MissingKeySuffix("k-".to_string()))
        );
        assert!(matches!(
            key_suffix("k-99999999999999999999999"),
            Err(HookError::SuffixOutOfRange(_))
        ));
    }

    #[test]
    fn priority_is_key_mod_three() {
        let hook = MetadataHook::Priority;
        assert_eq!(hook.derive("k-9999").unwrap().priority, Some(0));
        assert_eq!(hook.derive("k-10000").unwrap().priority, Some(1));
        assert_eq!(hook.derive("k-10001").unwrap().priority, Some(2));
        assert_eq!(hook.derive("k-10001").unwrap().deadline, None);
    }

    #[test]
    fn deadline_classes_and_budgets() {
        let metadata = latency_hook().derive("k-10001").unwrap();
        assert_eq!(metadata.deadline_class, Some(DeadlineClass::Slow));
        assert_eq!(metadata.deadline, Some(150.0));
        assert_eq!(metadata.timeout_budget, Some(160.0));
        assert_eq!(metadata.priority, None);

        let no_budget = MetadataHook::Deadline {
            deadlines: [1.0, 2.0, 3.0],
            timeout_buffer: None,
        };
        let metadata = no_budget.derive("k-3").unwrap();
        assert_eq!(metadata.deadline_class, Some(DeadlineClass::Fast));
        assert_eq!(metadata.timeout_budget, None);
    }

    #[test]
    fn identical_keys_yield_identical_metadata() {
        let hook = latency_hook();
        for n in 9_000..9_100 {
            let key = format!("k-{n}");
            assert_eq!(hook.derive(&key), hook.derive(&key));
        }
    }

    #[test]
    fn classes_are_evenly_filled_over_a_uniform_keyspace() {
        let hook = MetadataHook::Priority;
        let mut counts = [0usize; 3];
        for n in 0..3_000u64 {
            let priority = hook.derive(&format!("k-{n}")).unwrap().priority.unwrap();
            counts[priority as usize] += 1;
        }
        assert_eq!(counts, [1_000, 1_000, 1_000]);
    }

    #[test]
    fn apply_overwrites_request_metadata() {
        let mut request = Request::new("k-4", SimTime::zero());
        MetadataHook::Priority.apply(&mut request).unwrap();
        assert_eq!(request.metadata.priority, Some(1));

        let mut bad = Request::new("no-digits", SimTime::zero());
        assert!(MetadataHook::Priority.apply(&mut bad).is_err());
        assert_eq!(bad.metadata, EventMetadata::default());
    }
}
