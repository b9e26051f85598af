//! DOI/PMID extraction and normalization shared by adapters and dedup.

use once_cell::sync::Lazy;
use regex::Regex;

static DOI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^10\.\d{4,9}/\S+$").expect("doi regex"));

static PMID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,9}$").expect("pmid regex"));

/// Normalize a DOI to its bare lowercase form, or reject it.
///
/// Accepts resolver URLs (`https://doi.org/10.x/y`), `doi:` prefixes and
/// surrounding whitespace; anything that does not validate as
/// `10.<registrant>/<suffix>` afterwards is dropped rather than carried as
/// a broken identity key.
pub fn normalize_doi(raw: &str) -> Option<String> {
    let mut doi = raw.trim().to_lowercase();
    for prefix in [
        "https://doi.org/",
        "http://doi.org/",
        "https://dx.doi.org/",
        "http://dx.doi.org/",
        "doi.org/",
        "doi:",
    ] {
        if let Some(stripped) = doi.strip_prefix(prefix) {
            doi = stripped.trim_start().to_string();
            break;
        }
    }
    let doi = doi.trim_end_matches(['.', ',', ';']).to_string();
    if DOI_RE.is_match(&doi) {
        Some(doi)
    } else {
        None
    }
}

/// Validate a PMID: all digits, sane length. Returns the trimmed digits.
pub fn normalize_pmid(raw: &str) -> Option<String> {
    let pmid = raw.trim().trim_start_matches("PMID:").trim();
    if PMID_RE.is_match(pmid) {
        Some(pmid.to_string())
    } else {
        None
    }
}
