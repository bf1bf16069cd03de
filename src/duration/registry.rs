//! One shared [`DurationEstimator`] per language.
//!
//! The registry is created once by the process composition root and passed
//! to whoever needs an estimator.  Every caller asking for the same language
//! gets the same `Arc`, so correction-factor updates from one job are seen
//! by every other job narrating in that language.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::EstimatorConfig;

use super::estimator::DurationEstimator;
use super::language::{primary_subtag, LanguageProfile};

/// Lazily-populated map of language → estimator.
///
/// ```rust
/// use std::sync::Arc;
/// use narration_sync::config::EstimatorConfig;
/// use narration_sync::duration::EstimatorRegistry;
///
/// let registry = EstimatorRegistry::new(EstimatorConfig::default());
/// let a = registry.get("ko-KR");
/// let b = registry.get("ko");
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
#[derive(Debug)]
pub struct EstimatorRegistry {
    config: EstimatorConfig,
    estimators: Mutex<HashMap<String, Arc<DurationEstimator>>>,
}

impl EstimatorRegistry {
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            config,
            estimators: Mutex::new(HashMap::new()),
        }
    }

    /// The estimator for `language`, created on first use.
    ///
    /// An empty language tag resolves to the configured default language.
    pub fn get(&self, language: &str) -> Arc<DurationEstimator> {
        let mut key = primary_subtag(language);
        if key.is_empty() {
            key = primary_subtag(&self.config.default_language);
        }

        let mut estimators = self
            .estimators
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        Arc::clone(estimators.entry(key).or_insert_with_key(|key| {
            log::debug!("estimator: creating model for language {key:?}");
            Arc::new(DurationEstimator::new(LanguageProfile::from_config(
                key,
                &self.config,
            )))
        }))
    }

    /// The estimator for the configured default language.
    pub fn default_estimator(&self) -> Arc<DurationEstimator> {
        self.get(&self.config.default_language)
    }

    /// Languages with an estimator already created.
    pub fn languages(&self) -> Vec<String> {
        let estimators = self
            .estimators
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut languages: Vec<String> = estimators.keys().cloned().collect();
        languages.sort();
        languages
    }
}

impl Default for EstimatorRegistry {
    fn default() -> Self {
        Self::new(EstimatorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_language_shares_state() {
        let registry = EstimatorRegistry::default();
        registry.get("ko").record_observation(1.0, 2.0);
        assert!((registry.get("ko-KR").correction_factor() - 1.1).abs() < 1e-9);
    }

    #[test]
    fn languages_are_independent() {
        let registry = EstimatorRegistry::default();
        registry.get("ko").record_observation(1.0, 2.0);
        assert_eq!(registry.get("en").correction_factor(), 1.0);
        assert_eq!(registry.languages(), vec!["en".to_string(), "ko".to_string()]);
    }

    #[test]
    fn empty_tag_uses_default_language() {
        let registry = EstimatorRegistry::default();
        assert_eq!(registry.get("").language(), "ko");
        assert!(Arc::ptr_eq(&registry.get(""), &registry.default_estimator()));
    }

    #[test]
    fn config_overrides_reach_estimators() {
        let mut config = EstimatorConfig::default();
        config.reading_speed_overrides.insert("en".into(), 200.0);
        let registry = EstimatorRegistry::new(config);
        assert!((registry.get("en").profile().units_per_minute - 200.0).abs() < 1e-9);
    }
}
