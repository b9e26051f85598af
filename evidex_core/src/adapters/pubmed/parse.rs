//! Parser for PubMed efetch XML (`PubmedArticleSet`).

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::SourceError;

#[derive(Debug, Default, Clone)]
pub struct ParsedArticle {
    pub pmid: Option<String>,
    pub title: String,
    pub abstract_text: String,
    pub journal: String,
    pub year: Option<i32>,
    pub authors: Vec<String>,
    pub doi: Option<String>,
}

#[derive(Debug, Default)]
struct AuthorParts {
    last_name: String,
    fore_name: String,
    initials: String,
    collective: String,
}

impl AuthorParts {
    /// PubMed display convention: "LastName Initials", collective names
    /// verbatim. Never a struct dump.
    fn display_name(&self) -> Option<String> {
        if !self.collective.is_empty() {
            Some(self.collective.clone())
        } else if !self.last_name.is_empty() && !self.initials.is_empty() {
            Some(format!("{} {}", self.last_name, self.initials))
        } else if !self.last_name.is_empty() && !self.fore_name.is_empty() {
            Some(format!("{} {}", self.last_name, self.fore_name))
        } else if !self.last_name.is_empty() {
            Some(self.last_name.clone())
        } else {
            None
        }
    }
}

/// Parse every `PubmedArticle` in an efetch response. Articles missing
/// required pieces come back with empty fields and are dropped by the
/// caller's normalization, not here.
pub fn parse_efetch_articles(xml: &str) -> Result<Vec<ParsedArticle>, SourceError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut articles = Vec::new();
    let mut current: Option<ParsedArticle> = None;
    let mut current_author: Option<AuthorParts> = None;

    // Element path from the document root down to the current node;
    // PubMed reuses tag names (PMID, Title, Year) in different contexts.
    let mut path: Vec<String> = Vec::new();
    let mut article_id_type: Option<String> = None;

    let mut buffer = Vec::new();

    loop {
        match reader.read_event_into(&mut buffer) {
            Ok(Event::Start(ref e)) => {
                let tag_name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                match tag_name.as_str() {
                    "PubmedArticle" => {
                        current = Some(ParsedArticle::default());
                    }
                    "Author" => {
                        current_author = Some(AuthorParts::default());
                    }
                    "ArticleId" | "ELocationID" => {
                        article_id_type = e
                            .attributes()
                            .filter_map(Result::ok)
                            .find(|a| {
                                matches!(a.key.as_ref(), b"IdType" | b"EIdType")
                            })
                            .map(|a| String::from_utf8_lossy(&a.value).to_lowercase());
                    }
                    _ => {}
                }

                path.push(tag_name);
            }
            Ok(Event::Text(ref e)) => {
                let Some(article) = current.as_mut() else {
                    buffer.clear();
                    continue;
                };
                let text = e
                    .unescape()
                    .map_err(|e| SourceError::Malformed(format!("efetch xml text: {}", e)))?
                    .to_string();

                if in_path(&path, "ArticleTitle") {
                    push_text(&mut article.title, &text);
                } else if in_path(&path, "AbstractText") {
                    push_text(&mut article.abstract_text, &text);
                } else if ends_with(&path, &["Journal", "Title"]) {
                    push_text(&mut article.journal, &text);
                } else if ends_with(&path, &["MedlineCitation", "PMID"]) {
                    if article.pmid.is_none() {
                        article.pmid = Some(text);
                    }
                } else if ends_with(&path, &["PubDate", "Year"]) {
                    article.year = text.parse::<i32>().ok();
                } else if ends_with(&path, &["PubDate", "MedlineDate"]) {
                    // "2019 Nov-Dec" style ranges; the leading year is
                    // all that matters.
                    if article.year.is_none() {
                        article.year = text.get(0..4).and_then(|y| y.parse::<i32>().ok());
                    }
                } else if let Some(author) = current_author.as_mut() {
                    match path.last().map(String::as_str) {
                        Some("LastName") => author.last_name = text,
                        Some("ForeName") => author.fore_name = text,
                        Some("Initials") => author.initials = text,
                        Some("CollectiveName") => author.collective = text,
                        _ => {}
                    }
                } else if path.last().map(String::as_str) == Some("ArticleId")
                    || path.last().map(String::as_str) == Some("ELocationID")
                {
                    if article_id_type.as_deref() == Some("doi") && article.doi.is_none() {
                        article.doi = Some(text);
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                let tag_name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                match tag_name.as_str() {
                    "PubmedArticle" => {
                        if let Some(article) = current.take() {
                            articles.push(article);
                        }
                    }
                    "Author" => {
                        if let Some(author) = current_author.take() {
                            if let (Some(name), Some(article)) =
                                (author.display_name(), current.as_mut())
                            {
                                article.authors.push(name);
                            }
                        }
                    }
                    "ArticleId" | "ELocationID" => {
                        article_id_type = None;
                    }
                    _ => {}
                }

                if path.last().map(String::as_str) == Some(tag_name.as_str()) {
                    path.pop();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SourceError::Malformed(format!("efetch xml: {}", e)));
            }
            _ => {}
        }

        buffer.clear();
    }

    Ok(articles)
}

/// True when `tag` appears anywhere on the current path; used for title
/// and abstract, whose text is split by inline markup (<i>, <sup>).
fn in_path(path: &[String], tag: &str) -> bool {
    path.iter().any(|p| p == tag)
}

fn ends_with(path: &[String], suffix: &[&str]) -> bool {
    path.len() >= suffix.len()
        && path[path.len() - suffix.len()..]
            .iter()
            .zip(suffix)
            .all(|(a, b)| a == b)
}

fn push_text(field: &mut String, text: &str) {
    if !field.is_empty() {
        field.push(' ');
    }
    field.push_str(text.trim());
}
