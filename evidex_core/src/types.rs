//! Core types for the retrieval pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// External bibliographic databases the pipeline can fan out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    PubMed,
    EuropePmc,
    SemanticScholar,
    Crossref,
    OpenAlex,
    OpenFda,
    MedRxiv,
    ClinicalTrials,
}

impl Source {
    /// Stable identifier used in logs, CLI flags and profile files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::PubMed => "pubmed",
            Source::EuropePmc => "europepmc",
            Source::SemanticScholar => "semantic-scholar",
            Source::Crossref => "crossref",
            Source::OpenAlex => "openalex",
            Source::OpenFda => "openfda",
            Source::MedRxiv => "medrxiv",
            Source::ClinicalTrials => "clinicaltrials",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "pubmed" => Some(Source::PubMed),
            "europepmc" | "europe-pmc" => Some(Source::EuropePmc),
            "semantic-scholar" | "semantic_scholar" => Some(Source::SemanticScholar),
            "crossref" => Some(Source::Crossref),
            "openalex" => Some(Source::OpenAlex),
            "openfda" | "fda" => Some(Source::OpenFda),
            "medrxiv" => Some(Source::MedRxiv),
            "clinicaltrials" | "ctgov" => Some(Source::ClinicalTrials),
            _ => None,
        }
    }

    /// Rank used to decide whose metadata wins when a deduplicated work has
    /// contributions from several sources. Lower wins.
    ///
    /// The ordering encodes the evidence-quality philosophy: curated primary
    /// literature indexes first (Cochrane reviews arrive through these),
    /// then the trial registry, then scholarly aggregators and preprints,
    /// with the regulatory adverse-event database last.
    pub fn priority_rank(&self) -> u8 {
        match self {
            Source::PubMed => 0,
            Source::EuropePmc => 1,
            Source::ClinicalTrials => 2,
            Source::SemanticScholar => 3,
            Source::OpenAlex => 4,
            Source::Crossref => 5,
            Source::MedRxiv => 6,
            Source::OpenFda => 7,
        }
    }

    pub fn all() -> &'static [Source] {
        &[
            Source::PubMed,
            Source::EuropePmc,
            Source::SemanticScholar,
            Source::Crossref,
            Source::OpenAlex,
            Source::OpenFda,
            Source::MedRxiv,
            Source::ClinicalTrials,
        ]
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One paper as returned by one source, after normalization into the
/// common schema. Request-scoped; discarded once merged or filtered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Non-empty by construction; adapters drop items without a title.
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,

    /// Plain display names, already flattened from whatever author
    /// structure the upstream uses.
    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    /// Normalized DOI (lowercase, no resolver prefix). Strong identity key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,

    /// PMID or other source-native strong identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    pub source: Source,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// 1-indexed rank within the source's own relevance ordering, kept as a
    /// tie-break hint.
    pub source_rank: usize,
}

impl Candidate {
    pub fn new(source: Source, title: impl Into<String>, source_rank: usize) -> Self {
        Self {
            title: title.into(),
            abstract_text: None,
            authors: Vec::new(),
            journal: None,
            year: None,
            doi: None,
            external_id: None,
            source,
            url: None,
            source_rank,
        }
    }

    pub fn with_abstract(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.is_empty() {
            self.abstract_text = Some(text);
        }
        self
    }

    pub fn with_authors(mut self, authors: Vec<String>) -> Self {
        self.authors = authors;
        self
    }

    pub fn with_journal(mut self, journal: impl Into<String>) -> Self {
        let journal = journal.into();
        if !journal.is_empty() {
            self.journal = Some(journal);
        }
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_doi(mut self, doi: impl Into<String>) -> Self {
        self.doi = Some(doi.into());
        self
    }

    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// The deduplicated representative of one or more Candidates believed to be
/// the same underlying work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedCandidate {
    /// Metadata of the highest-priority contributor, with its missing
    /// fields filled from the others in rank order.
    #[serde(flatten)]
    pub record: Candidate,

    /// All sources that returned this work. Never empty.
    pub contributing_sources: Vec<Source>,

    /// `priority_rank` of the winning contributor.
    pub priority_rank: u8,
}

impl MergedCandidate {
    pub fn singleton(candidate: Candidate) -> Self {
        let rank = candidate.source.priority_rank();
        let source = candidate.source;
        Self {
            record: candidate,
            contributing_sources: vec![source],
            priority_rank: rank,
        }
    }
}

/// Evidence-hierarchy tier, ordered from strongest study design down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceTier {
    SystematicReview,
    Guideline,
    RandomizedTrial,
    Cohort,
    CrossSectional,
    CaseReport,
}

impl EvidenceTier {
    /// Weight used as the primary sort key. Strictly monotonic with tier
    /// and spaced so that tier always dominates relevance in the final
    /// ordering.
    pub fn weight(&self) -> u32 {
        match self {
            EvidenceTier::SystematicReview => 1000,
            EvidenceTier::Guideline => 500,
            EvidenceTier::RandomizedTrial => 250,
            EvidenceTier::Cohort => 100,
            EvidenceTier::CrossSectional => 50,
            EvidenceTier::CaseReport => 10,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EvidenceTier::SystematicReview => "systematic review / meta-analysis",
            EvidenceTier::Guideline => "clinical guideline",
            EvidenceTier::RandomizedTrial => "randomized controlled trial",
            EvidenceTier::Cohort => "cohort / case-control",
            EvidenceTier::CrossSectional => "cross-sectional",
            EvidenceTier::CaseReport => "case report / expert opinion",
        }
    }
}

/// A merged candidate plus scoring and classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub merged: MergedCandidate,

    /// Clamped to [0, 1]. Forced to 0 when `in_domain` is false.
    pub relevance_score: f64,

    /// False excludes the candidate from all downstream ranking.
    pub in_domain: bool,

    pub evidence_tier: EvidenceTier,

    pub evidence_weight: u32,
}

/// Display-ready output unit handed to the synthesizer and the user.
/// Ordering within the final list is significant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,

    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    /// DOI when present, otherwise the source-native identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    pub evidence_tier: EvidenceTier,

    pub evidence_label: String,

    pub relevance_score: f64,

    pub sources: Vec<Source>,
}

impl Citation {
    pub fn from_scored(scored: &ScoredCandidate) -> Self {
        let record = &scored.merged.record;
        let identifier = record
            .doi
            .as_ref()
            .map(|d| format!("doi:{}", d))
            .or_else(|| record.external_id.clone());
        Self {
            title: record.title.clone(),
            authors: record.authors.clone(),
            journal: record.journal.clone(),
            year: record.year,
            identifier,
            url: record.url.clone(),
            evidence_tier: scored.evidence_tier,
            evidence_label: scored.evidence_tier.label().to_string(),
            relevance_score: scored.relevance_score,
            sources: scored.merged.contributing_sources.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_builder() {
        let c = Candidate::new(Source::PubMed, "Test Article", 1)
            .with_abstract("An abstract.")
            .with_authors(vec!["Smith J".to_string(), "Jones A".to_string()])
            .with_doi("10.1000/xyz123")
            .with_external_id("PMID:12345678")
            .with_year(2023);

        assert_eq!(c.title, "Test Article");
        assert_eq!(c.authors.len(), 2);
        assert_eq!(c.doi.as_deref(), Some("10.1000/xyz123"));
        assert_eq!(c.year, Some(2023));
        assert_eq!(c.source_rank, 1);
    }

    #[test]
    fn test_empty_optional_fields_stay_none() {
        let c = Candidate::new(Source::Crossref, "T", 1)
            .with_abstract("")
            .with_journal("");
        assert!(c.abstract_text.is_none());
        assert!(c.journal.is_none());
    }

    #[test]
    fn test_priority_ranks_are_distinct() {
        let mut ranks: Vec<u8> = Source::all().iter().map(|s| s.priority_rank()).collect();
        ranks.sort_unstable();
        ranks.dedup();
        assert_eq!(ranks.len(), Source::all().len());
    }

    #[test]
    fn test_primary_literature_outranks_aggregators_and_fda() {
        assert!(Source::PubMed.priority_rank() < Source::SemanticScholar.priority_rank());
        assert!(Source::EuropePmc.priority_rank() < Source::Crossref.priority_rank());
        assert_eq!(
            Source::OpenFda.priority_rank(),
            Source::all()
                .iter()
                .map(|s| s.priority_rank())
                .max()
                .unwrap()
        );
    }

    #[test]
    fn test_evidence_weight_monotonic() {
        let tiers = [
            EvidenceTier::SystematicReview,
            EvidenceTier::Guideline,
            EvidenceTier::RandomizedTrial,
            EvidenceTier::Cohort,
            EvidenceTier::CrossSectional,
            EvidenceTier::CaseReport,
        ];
        for pair in tiers.windows(2) {
            assert!(pair[0].weight() > pair[1].weight());
        }
    }

    #[test]
    fn test_source_parse_round_trip() {
        for s in Source::all() {
            assert_eq!(Source::parse(s.as_str()), Some(*s));
        }
        assert_eq!(Source::parse("fda"), Some(Source::OpenFda));
        assert_eq!(Source::parse("gopher"), None);
    }

    #[test]
    fn test_citation_prefers_doi_identifier() {
        let mut c = Candidate::new(Source::PubMed, "T", 1)
            .with_doi("10.1/abc")
            .with_external_id("PMID:1");
        let scored = ScoredCandidate {
            merged: MergedCandidate::singleton(c.clone()),
            relevance_score: 0.8,
            in_domain: true,
            evidence_tier: EvidenceTier::Cohort,
            evidence_weight: EvidenceTier::Cohort.weight(),
        };
        assert_eq!(
            Citation::from_scored(&scored).identifier.as_deref(),
            Some("doi:10.1/abc")
        );

        c.doi = None;
        let scored = ScoredCandidate {
            merged: MergedCandidate::singleton(c),
            relevance_score: 0.8,
            in_domain: true,
            evidence_tier: EvidenceTier::Cohort,
            evidence_weight: EvidenceTier::Cohort.weight(),
        };
        assert_eq!(
            Citation::from_scored(&scored).identifier.as_deref(),
            Some("PMID:1")
        );
    }
}
