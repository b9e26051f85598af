//! Run profile management.
//!
//! Profiles name a group of sources plus the tunable pipeline constants
//! (fan-out budgets, scoring thresholds, selector policy). Everything has
//! sensible defaults; the exact threshold values are deliberately config,
//! not code.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::types::Source;

// ============================================================================
// Default Values
// ============================================================================

/// Default results requested per source
pub const DEFAULT_LIMIT: u32 = 25;

/// Default per-source timeout in milliseconds
pub const DEFAULT_SOURCE_TIMEOUT_MS: u64 = 8000;

/// Default global fan-out deadline in milliseconds
pub const DEFAULT_GLOBAL_TIMEOUT_MS: u64 = 12000;

/// Default maximum citations in the final answer
pub const DEFAULT_MAX_CITATIONS: usize = 8;

/// Default relevance floor below which candidates are never selected
pub const DEFAULT_RELEVANCE_FLOOR: f64 = 0.35;

// ============================================================================
// FanoutDefaults
// ============================================================================

/// Fan-out parameters applied to all sources in a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutDefaults {
    /// Maximum results per source (default: 25)
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Per-source timeout in milliseconds (default: 8000)
    #[serde(default = "default_source_timeout_ms")]
    pub source_timeout_ms: u64,

    /// Global deadline for the whole fan-out in milliseconds (default: 12000)
    #[serde(default = "default_global_timeout_ms")]
    pub global_timeout_ms: u64,
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

fn default_source_timeout_ms() -> u64 {
    DEFAULT_SOURCE_TIMEOUT_MS
}

fn default_global_timeout_ms() -> u64 {
    DEFAULT_GLOBAL_TIMEOUT_MS
}

impl Default for FanoutDefaults {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            source_timeout_ms: DEFAULT_SOURCE_TIMEOUT_MS,
            global_timeout_ms: DEFAULT_GLOBAL_TIMEOUT_MS,
        }
    }
}

// ============================================================================
// ScoringConfig
// ============================================================================

/// Relevance-scoring thresholds. The shape of the policy (domain gate →
/// lexical overlap → specificity gate → intent bonus → clamp) is fixed;
/// the magnitudes are tunable here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Minimum domain-term hits in title+abstract to pass the domain gate
    #[serde(default = "default_min_domain_hits")]
    pub min_domain_hits: usize,

    /// Score contribution per matched query term found in the title
    #[serde(default = "default_title_term_weight")]
    pub title_term_weight: f64,

    /// Score contribution per matched query term found only in the abstract
    #[serde(default = "default_abstract_term_weight")]
    pub abstract_term_weight: f64,

    /// Minimum fraction of query terms that must match at all
    #[serde(default = "default_specificity_min_ratio")]
    pub specificity_min_ratio: f64,

    /// Score cap applied when the specificity gate trips
    #[serde(default = "default_specificity_cap")]
    pub specificity_cap: f64,

    /// Bonus for candidates matching the query's intent vocabulary
    #[serde(default = "default_intent_bonus")]
    pub intent_bonus: f64,

    /// Multiplier for purely descriptive papers under an interventional query
    #[serde(default = "default_descriptive_penalty")]
    pub descriptive_penalty: f64,
}

fn default_min_domain_hits() -> usize {
    2
}

fn default_title_term_weight() -> f64 {
    0.6
}

fn default_abstract_term_weight() -> f64 {
    0.4
}

fn default_specificity_min_ratio() -> f64 {
    0.2
}

fn default_specificity_cap() -> f64 {
    0.25
}

fn default_intent_bonus() -> f64 {
    0.15
}

fn default_descriptive_penalty() -> f64 {
    0.6
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_domain_hits: default_min_domain_hits(),
            title_term_weight: default_title_term_weight(),
            abstract_term_weight: default_abstract_term_weight(),
            specificity_min_ratio: default_specificity_min_ratio(),
            specificity_cap: default_specificity_cap(),
            intent_bonus: default_intent_bonus(),
            descriptive_penalty: default_descriptive_penalty(),
        }
    }
}

// ============================================================================
// SelectorConfig
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Hard cap on citations returned (default: 8)
    #[serde(default = "default_max_citations")]
    pub max_citations: usize,

    /// Candidates scoring below this are excluded even under the cap
    #[serde(default = "default_relevance_floor")]
    pub relevance_floor: f64,

    /// Fewer survivors than this flags the result as low-confidence
    #[serde(default = "default_min_confident")]
    pub min_confident_results: usize,
}

fn default_max_citations() -> usize {
    DEFAULT_MAX_CITATIONS
}

fn default_relevance_floor() -> f64 {
    DEFAULT_RELEVANCE_FLOOR
}

fn default_min_confident() -> usize {
    3
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            max_citations: DEFAULT_MAX_CITATIONS,
            relevance_floor: DEFAULT_RELEVANCE_FLOOR,
            min_confident_results: default_min_confident(),
        }
    }
}

// ============================================================================
// RunProfile
// ============================================================================

/// A named pipeline configuration.
///
/// Profiles can be:
/// - Built-in (shipped with Evidex)
/// - User-defined (in ~/.config/evidex/profiles.yaml)
/// - Extended from other profiles using `extends`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunProfile {
    /// Profile name
    pub name: String,

    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Base profile to extend (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// Sources to query (if not extending)
    #[serde(default)]
    pub sources: Vec<String>,

    /// Sources to add (when extending)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add: Vec<String>,

    /// Sources to exclude (when extending)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,

    /// Fan-out parameters
    #[serde(default)]
    pub defaults: FanoutDefaults,

    /// Per-source result-count overrides
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub limits: HashMap<String, u32>,

    /// Relevance-scoring thresholds
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Selection policy
    #[serde(default)]
    pub selector: SelectorConfig,
}

impl RunProfile {
    /// Create a new profile with the given name and sources.
    pub fn new(name: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            extends: None,
            sources,
            add: Vec::new(),
            exclude: Vec::new(),
            defaults: FanoutDefaults::default(),
            limits: HashMap::new(),
            scoring: ScoringConfig::default(),
            selector: SelectorConfig::default(),
        }
    }

    /// Get a built-in profile by name.
    pub fn get_builtin(name: &str) -> Option<Self> {
        BUILTIN_PROFILES.iter().find(|p| p.name == name).cloned()
    }

    /// List all built-in profiles.
    pub fn list_builtin() -> &'static [RunProfile] {
        &BUILTIN_PROFILES
    }

    /// Get the effective sources for this profile, resolving the
    /// inheritance chain and parsing out unknown names.
    pub fn effective_sources(&self, store: Option<&ProfileStore>) -> Vec<Source> {
        let base_names = if let Some(ref extends) = self.extends {
            let base = store
                .and_then(|s| s.load(extends))
                .or_else(|| Self::get_builtin(extends));

            base.map(|p| {
                p.effective_sources(store)
                    .iter()
                    .map(|s| s.as_str().to_string())
                    .collect()
            })
            .unwrap_or_default()
        } else {
            self.sources.clone()
        };

        // Apply add/exclude
        let mut names: Vec<String> = base_names
            .into_iter()
            .filter(|s| !self.exclude.contains(s))
            .collect();

        for source in &self.add {
            if !names.contains(source) {
                names.push(source.clone());
            }
        }

        names.iter().filter_map(|n| Source::parse(n)).collect()
    }

    /// Get the result limit for a specific source.
    pub fn limit_for(&self, source: Source) -> u32 {
        self.limits
            .get(source.as_str())
            .copied()
            .unwrap_or(self.defaults.limit)
    }
}

// ============================================================================
// Built-in Profiles
// ============================================================================

fn all_source_names() -> Vec<String> {
    Source::all().iter().map(|s| s.as_str().to_string()).collect()
}

/// Built-in profiles shipped with Evidex.
static BUILTIN_PROFILES: Lazy<Vec<RunProfile>> = Lazy::new(|| {
    vec![
        RunProfile {
            name: "default".to_string(),
            description: Some("All sources, balanced budgets".to_string()),
            ..RunProfile::new("default", all_source_names())
        },
        RunProfile {
            name: "fast".to_string(),
            description: Some("Primary literature only, tight deadlines".to_string()),
            defaults: FanoutDefaults {
                limit: 10,
                source_timeout_ms: 4000,
                global_timeout_ms: 6000,
            },
            ..RunProfile::new(
                "fast",
                vec![
                    "pubmed".to_string(),
                    "europepmc".to_string(),
                    "crossref".to_string(),
                ],
            )
        },
        RunProfile {
            name: "preprints".to_string(),
            description: Some("Preprint servers and open aggregators".to_string()),
            ..RunProfile::new(
                "preprints",
                vec![
                    "medrxiv".to_string(),
                    "europepmc".to_string(),
                    "openalex".to_string(),
                ],
            )
        },
        RunProfile {
            name: "regulatory".to_string(),
            description: Some("Labels, trials and the indexed literature".to_string()),
            ..RunProfile::new(
                "regulatory",
                vec![
                    "openfda".to_string(),
                    "clinicaltrials".to_string(),
                    "pubmed".to_string(),
                ],
            )
        },
    ]
});

// ============================================================================
// ProfileStore
// ============================================================================

/// Storage for user-defined profiles.
///
/// Profiles are stored in YAML format at `~/.config/evidex/profiles.yaml`.
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    /// Create a new profile store at the default location.
    pub fn new_default() -> Self {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|p| p.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        let path = base.join("evidex").join("profiles.yaml");
        Self { path }
    }

    /// Create a profile store at a custom path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Load all user-defined profiles.
    pub fn load_all(&self) -> HashMap<String, RunProfile> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_yaml::from_str(&content).unwrap_or_default(),
            Err(_) => HashMap::new(),
        }
    }

    /// Load a specific profile by name.
    ///
    /// Resolution order:
    /// 1. User profiles (from file)
    /// 2. Built-in profiles
    pub fn load(&self, name: &str) -> Option<RunProfile> {
        if let Some(profile) = self.load_all().get(name).cloned() {
            return Some(profile);
        }
        RunProfile::get_builtin(name)
    }

    /// Save a profile.
    pub fn save(&self, profile: &RunProfile) -> Result<(), ProfileStoreError> {
        let mut profiles = self.load_all();
        profiles.insert(profile.name.clone(), profile.clone());
        self.write_all(&profiles)
    }

    /// List all available profiles (user + built-in).
    pub fn list_all(&self) -> Vec<RunProfile> {
        let mut profiles: Vec<RunProfile> = self.load_all().into_values().collect();

        for builtin in RunProfile::list_builtin() {
            if !profiles.iter().any(|p| p.name == builtin.name) {
                profiles.push(builtin.clone());
            }
        }

        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        profiles
    }

    fn write_all(&self, profiles: &HashMap<String, RunProfile>) -> Result<(), ProfileStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ProfileStoreError::Io(e.to_string()))?;
        }

        let content = serde_yaml::to_string(profiles)
            .map_err(|e| ProfileStoreError::Serialize(e.to_string()))?;

        std::fs::write(&self.path, content).map_err(|e| ProfileStoreError::Io(e.to_string()))?;

        Ok(())
    }
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::new_default()
    }
}

/// Errors from profile storage operations.
#[derive(Debug, thiserror::Error)]
pub enum ProfileStoreError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialize(String),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_profiles() {
        let default = RunProfile::get_builtin("default").unwrap();
        assert_eq!(
            default.effective_sources(None).len(),
            Source::all().len()
        );
        assert_eq!(default.defaults.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_all_builtin_profiles_exist() {
        for name in &["default", "fast", "preprints", "regulatory"] {
            assert!(
                RunProfile::get_builtin(name).is_some(),
                "Built-in profile '{}' should exist",
                name
            );
        }
    }

    #[test]
    fn test_profile_extension() {
        let mut child = RunProfile::new("my-run", Vec::new());
        child.extends = Some("fast".to_string());
        child.add = vec!["openalex".to_string()];
        child.exclude = vec!["crossref".to_string()];

        let effective = child.effective_sources(None);
        assert!(effective.contains(&Source::PubMed));
        assert!(effective.contains(&Source::OpenAlex));
        assert!(!effective.contains(&Source::Crossref));
    }

    #[test]
    fn test_unknown_source_names_are_dropped() {
        let profile = RunProfile::new(
            "test",
            vec!["pubmed".to_string(), "gopherdb".to_string()],
        );
        assert_eq!(profile.effective_sources(None), vec![Source::PubMed]);
    }

    #[test]
    fn test_limit_overrides() {
        let mut profile = RunProfile::new("test", vec!["pubmed".to_string()]);
        profile.limits.insert("pubmed".to_string(), 5);

        assert_eq!(profile.limit_for(Source::PubMed), 5);
        assert_eq!(profile.limit_for(Source::Crossref), DEFAULT_LIMIT);
    }

    #[test]
    fn test_yaml_round_trip() {
        let profile = RunProfile::new("test", vec!["pubmed".to_string()]);
        let yaml = serde_yaml::to_string(&profile).unwrap();
        assert!(yaml.contains("name: test"));

        let parsed: RunProfile = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.name, "test");
        assert_eq!(parsed.selector.max_citations, DEFAULT_MAX_CITATIONS);
    }

    #[test]
    fn test_scoring_defaults_in_range() {
        let scoring = ScoringConfig::default();
        assert!(scoring.title_term_weight > scoring.abstract_term_weight);
        assert!(scoring.specificity_min_ratio > 0.0 && scoring.specificity_min_ratio < 1.0);
        assert!(scoring.descriptive_penalty < 1.0);
    }
}
