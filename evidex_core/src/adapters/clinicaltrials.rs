//! ClinicalTrials.gov v2 API adapter.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{build_client, DEFAULT_USER_AGENT};
use crate::error::SourceError;
use crate::types::{Candidate, Source};
use crate::SourceAdapter;

const STUDIES_URL: &str = "https://clinicaltrials.gov/api/v2/studies";

#[derive(Debug, Deserialize)]
struct StudiesResponse {
    #[serde(default)]
    studies: Vec<Study>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Study {
    protocol_section: Option<ProtocolSection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProtocolSection {
    identification_module: Option<IdentificationModule>,
    description_module: Option<DescriptionModule>,
    status_module: Option<StatusModule>,
    sponsor_collaborators_module: Option<SponsorModule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentificationModule {
    nct_id: Option<String>,
    brief_title: Option<String>,
    official_title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescriptionModule {
    brief_summary: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusModule {
    start_date_struct: Option<DateStruct>,
}

#[derive(Debug, Deserialize)]
struct DateStruct {
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SponsorModule {
    lead_sponsor: Option<Sponsor>,
}

#[derive(Debug, Deserialize)]
struct Sponsor {
    name: Option<String>,
}

pub struct ClinicalTrialsAdapter {
    client: reqwest::Client,
}

impl ClinicalTrialsAdapter {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(DEFAULT_USER_AGENT)?,
        })
    }

    fn build_url(query: &str, limit: usize) -> Result<Url, SourceError> {
        let mut url = Url::parse(STUDIES_URL)
            .map_err(|e| SourceError::Other(format!("bad clinicaltrials url: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("query.term", query)
            .append_pair("pageSize", &limit.to_string())
            .append_pair(
                "fields",
                "IdentificationModule,DescriptionModule,StatusModule,SponsorCollaboratorsModule",
            );
        Ok(url)
    }
}

#[async_trait]
impl SourceAdapter for ClinicalTrialsAdapter {
    fn source(&self) -> Source {
        Source::ClinicalTrials
    }

    fn description(&self) -> &'static str {
        "ClinicalTrials.gov: registered interventional and observational studies."
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>, SourceError> {
        let url = Self::build_url(query, limit)?;
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(SourceError::from_status(response.status(), self.source()));
        }

        let body: StudiesResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(format!("clinicaltrials json: {}", e)))?;

        debug!(target: "evidex::adapters::clinicaltrials", count = body.studies.len(), "clinicaltrials search returned");
        Ok(normalize_studies(body.studies))
    }
}

fn normalize_studies(studies: Vec<Study>) -> Vec<Candidate> {
    studies
        .into_iter()
        .enumerate()
        .filter_map(|(idx, study)| normalize_study(study, idx + 1))
        .collect()
}

fn normalize_study(study: Study, rank: usize) -> Option<Candidate> {
    let protocol = study.protocol_section?;
    let ident = protocol.identification_module?;

    let title = ident
        .brief_title
        .as_deref()
        .or(ident.official_title.as_deref())
        .map(str::trim)
        .unwrap_or("");
    if title.is_empty() {
        return None;
    }

    let mut candidate =
        Candidate::new(Source::ClinicalTrials, title, rank).with_journal("ClinicalTrials.gov");

    if let Some(summary) = protocol
        .description_module
        .and_then(|d| d.brief_summary)
    {
        candidate = candidate.with_abstract(summary);
    }
    if let Some(sponsor) = protocol
        .sponsor_collaborators_module
        .and_then(|s| s.lead_sponsor)
        .and_then(|s| s.name)
    {
        candidate = candidate.with_authors(vec![sponsor]);
    }
    // Start dates arrive as "2021-05" or "2021-05-14"; the year prefix is
    // all the ranking needs.
    if let Some(year) = protocol
        .status_module
        .and_then(|s| s.start_date_struct)
        .and_then(|d| d.date)
        .as_deref()
        .and_then(|d| d.get(0..4))
        .and_then(|y| y.parse::<i32>().ok())
    {
        candidate = candidate.with_year(year);
    }
    if let Some(nct_id) = ident.nct_id {
        candidate.url = Some(format!("https://clinicaltrials.gov/study/{}", nct_id));
        candidate = candidate.with_external_id(nct_id);
    }

    Some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn study_from_json(value: serde_json::Value) -> Study {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_normalize_study() {
        let study = study_from_json(serde_json::json!({
            "protocolSection": {
                "identificationModule": {
                    "nctId": "NCT04179474",
                    "briefTitle": "Rimegepant for Migraine Prevention"
                },
                "descriptionModule": {
                    "briefSummary": "A phase 3 trial of rimegepant."
                },
                "statusModule": {
                    "startDateStruct": {"date": "2019-11-14"}
                },
                "sponsorCollaboratorsModule": {
                    "leadSponsor": {"name": "Biohaven Pharmaceuticals"}
                }
            }
        }));

        let c = normalize_study(study, 1).unwrap();
        assert_eq!(c.title, "Rimegepant for Migraine Prevention");
        assert_eq!(c.external_id.as_deref(), Some("NCT04179474"));
        assert_eq!(c.year, Some(2019));
        assert_eq!(c.authors, vec!["Biohaven Pharmaceuticals"]);
        assert_eq!(
            c.url.as_deref(),
            Some("https://clinicaltrials.gov/study/NCT04179474")
        );
    }

    #[test]
    fn test_study_without_protocol_dropped() {
        let study = study_from_json(serde_json::json!({}));
        assert!(normalize_study(study, 1).is_none());
    }

    #[test]
    fn test_official_title_fallback() {
        let study = study_from_json(serde_json::json!({
            "protocolSection": {
                "identificationModule": {
                    "nctId": "NCT1",
                    "officialTitle": "An Official Title"
                }
            }
        }));
        let c = normalize_study(study, 1).unwrap();
        assert_eq!(c.title, "An Official Title");
    }
}
