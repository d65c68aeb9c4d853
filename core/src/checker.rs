//! End-to-end page check: locate, fetch, extract, filter, check, map back.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::engine::{Finding, RuleCategory, RuleEngine};
use crate::error::{CheckError, FetchError, NotFoundReason};
use crate::fetch::{HttpFetcher, PageFetcher};
use crate::filter::filter;
use crate::language::Language;
use crate::links::strip_links;
use crate::locator::Locator;
use crate::mapping::PlainTextMapping;
use crate::replacer::{apply, ErrorMarker, RuleMatchApplication};
use crate::revision::{extract_revision, RevisionContent};
use crate::CheckerConfig;

/// Pipeline stages, in the order a check passes through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Fetching,
    ExtractingRevision,
    CheckingEmptiness,
    Filtering,
    RuleChecking,
    MappingBack,
    Aggregated,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validating => "validating",
            Stage::Fetching => "fetching",
            Stage::ExtractingRevision => "extracting-revision",
            Stage::CheckingEmptiness => "checking-emptiness",
            Stage::Filtering => "filtering",
            Stage::RuleChecking => "rule-checking",
            Stage::MappingBack => "mapping-back",
            Stage::Aggregated => "aggregated",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A finding together with its applications to the original markup.
#[derive(Debug, Clone, Serialize)]
pub struct AppliedFinding {
    pub finding: Finding,
    pub applications: Vec<RuleMatchApplication>,
}

/// Outcome of checking one page.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub locator: Locator,
    pub revision: RevisionContent,
    pub applied: Vec<AppliedFinding>,
    /// Findings dropped because their offsets could not be mapped back.
    pub internal_errors: usize,
}

/// Findings for text that was checked as-is, without markup.
#[derive(Debug, Clone, Serialize)]
pub struct PlainCheckResult {
    pub plain_text: String,
    pub findings: Vec<Finding>,
    pub language: Language,
}

pub struct Checker<F = HttpFetcher> {
    config: CheckerConfig,
    fetcher: F,
}

impl Checker<HttpFetcher> {
    pub fn new(config: CheckerConfig) -> Result<Self, FetchError> {
        Ok(Self::with_fetcher(config, HttpFetcher::new()?))
    }
}

impl<F: PageFetcher> Checker<F> {
    pub fn with_fetcher(config: CheckerConfig, fetcher: F) -> Self {
        Self { config, fetcher }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Checks the current revision of the page at `url`.
    pub fn check_page(&self, url: &str) -> Result<CheckResult, CheckError> {
        let span = info_span!("check_page", url);
        let _entered = span.enter();

        let result = self.fetch_and_check(url);
        if let Err(err) = &result {
            debug!(stage = %Stage::Failed, error = %err, "check aborted");
        }
        result
    }

    fn fetch_and_check(&self, url: &str) -> Result<CheckResult, CheckError> {
        debug!(stage = %Stage::Validating);
        let locator = Locator::parse(url)?;
        let api_url = locator.api_url()?;

        debug!(stage = %Stage::Fetching, api_url = %api_url);
        let payload = self
            .fetcher
            .fetch(&api_url)
            .map_err(|source| CheckError::Fetch {
                url: api_url.to_string(),
                source,
            })?;

        debug!(stage = %Stage::ExtractingRevision, bytes = payload.len());
        let revision = extract_revision(&payload)?;

        self.check_revision(locator, revision)
    }

    /// Runs the pipeline on a revision the caller already holds.
    pub fn check_revision(
        &self,
        locator: Locator,
        revision: RevisionContent,
    ) -> Result<CheckResult, CheckError> {
        debug!(stage = %Stage::CheckingEmptiness, title = locator.title());
        ensure_has_content(
            locator.title(),
            &revision.content,
            &self.config.redirect_keywords,
        )?;

        debug!(stage = %Stage::Filtering);
        let mapping = filter(&revision.content);

        debug!(stage = %Stage::RuleChecking, plain_bytes = mapping.plain_text().len());
        let findings = {
            let engine = self.rule_engine(locator.language())?;
            engine.check(mapping.plain_text())
        };

        debug!(stage = %Stage::MappingBack, findings = findings.len());
        let original: Arc<str> = Arc::from(revision.content.as_str());
        let (applied, internal_errors) =
            apply_findings(&mapping, &original, findings, self.config.marker.as_ref());

        info!(
            stage = %Stage::Aggregated,
            title = locator.title(),
            findings = applied.len(),
            internal_errors,
            "page checked"
        );
        Ok(CheckResult {
            locator,
            revision,
            applied,
            internal_errors,
        })
    }

    /// Runs the rules over text that needs no markup handling.
    pub fn check_plain_text(
        &self,
        text: &str,
        language: Language,
    ) -> Result<PlainCheckResult, CheckError> {
        let findings = {
            let engine = self.rule_engine(language)?;
            engine.check(text)
        };
        Ok(PlainCheckResult {
            plain_text: text.to_string(),
            findings,
            language,
        })
    }

    fn rule_engine(&self, language: Language) -> Result<RuleEngine, CheckError> {
        let mut engine = RuleEngine::new(language, &self.config.rules, self.config.workers);
        engine.enable_category(RuleCategory::Wikipedia);
        for rule_id in &self.config.disabled_rules {
            engine.disable_rule(rule_id);
        }
        if let Some(dir) = &self.config.ngram_dir {
            engine.activate_language_model(dir)?;
        }
        engine.disable_dictionary_spelling();
        Ok(engine)
    }
}

/// Maps every finding back onto `original`. Findings that cannot be mapped
/// are logged and dropped; their number is returned alongside.
pub fn apply_findings(
    mapping: &PlainTextMapping,
    original: &Arc<str>,
    findings: Vec<Finding>,
    marker: Option<&ErrorMarker>,
) -> (Vec<AppliedFinding>, usize) {
    let mut applied = Vec::with_capacity(findings.len());
    let mut internal_errors = 0;
    for finding in findings {
        match apply(mapping, Arc::clone(original), &finding, marker) {
            Ok(applications) => applied.push(AppliedFinding {
                finding,
                applications,
            }),
            Err(err) => {
                warn!(rule = %finding.rule_id, error = %err, "dropping finding");
                internal_errors += 1;
            }
        }
    }
    (applied, internal_errors)
}

/// Fails with `PageNotFound` for blank revisions and redirects.
pub fn ensure_has_content(
    title: &str,
    content: &str,
    redirect_keywords: &[String],
) -> Result<(), CheckError> {
    let not_found = |reason| CheckError::PageNotFound {
        title: title.to_string(),
        reason,
    };
    let trimmed = content.trim_start();
    if trimmed.is_empty() {
        return Err(not_found(NotFoundReason::Empty));
    }
    let lowered = trimmed.to_lowercase();
    if redirect_keywords
        .iter()
        .any(|keyword| lowered.starts_with(&keyword.to_lowercase()))
    {
        return Err(not_found(NotFoundReason::Redirect));
    }
    Ok(())
}

/// Plain text of the revision in an API payload.
pub fn plain_text(payload: &str) -> Result<String, CheckError> {
    Ok(plain_text_mapping(payload)?.into_plain_text())
}

/// Mapping between the plain text and the raw revision in an API payload.
pub fn plain_text_mapping(payload: &str) -> Result<PlainTextMapping, CheckError> {
    let revision = extract_revision(payload)?;
    Ok(filter(&revision.content))
}

/// Link-stripped markup of the revision in an API payload.
pub fn cleaned_markup(payload: &str) -> Result<String, CheckError> {
    Ok(strip_links(&extract_revision(payload)?.content))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords() -> Vec<String> {
        CheckerConfig::default().redirect_keywords
    }

    #[test]
    fn detects_blank_and_redirect_revisions() {
        let err = ensure_has_content("A", "  \n\t", &keywords()).unwrap_err();
        assert!(matches!(
            err,
            CheckError::PageNotFound {
                reason: NotFoundReason::Empty,
                ..
            }
        ));

        for content in ["#REDIRECT [[Other Page]]", "\n #Weiterleitung [[Ziel]]"] {
            let err = ensure_has_content("A", content, &keywords()).unwrap_err();
            assert!(
                matches!(
                    err,
                    CheckError::PageNotFound {
                        reason: NotFoundReason::Redirect,
                        ..
                    }
                ),
                "{content:?} should count as a redirect"
            );
        }

        assert!(ensure_has_content("A", "Text about #redirect.", &keywords()).is_ok());
    }

    #[test]
    fn unmappable_findings_are_counted_not_fatal() {
        let mapping = PlainTextMapping::identity("short text");
        let original: Arc<str> = Arc::from("short text");
        let findings = vec![
            Finding::new("OK", RuleCategory::Style, "fine", (0, 5)),
            Finding::new("BROKEN", RuleCategory::Style, "past the end", (6, 40)),
        ];
        let (applied, errors) = apply_findings(&mapping, &original, findings, None);
        assert_eq!(errors, 1);
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].finding.rule_id, "OK");
    }

    #[test]
    fn payload_helpers_return_plain_text() {
        let payload = r#"<api><query><pages><page><revisions><rev timestamp="2011-01-01T00:00:00Z">'''Bold''' text.[[de:Text]]</rev></revisions></page></pages></query></api>"#;
        assert_eq!(plain_text(payload).unwrap(), "Bold text.");
        assert_eq!(cleaned_markup(payload).unwrap(), "'''Bold''' text.");
        let mapping = plain_text_mapping(payload).unwrap();
        assert_eq!(mapping.to_original_range(0..4).unwrap(), 3..7);
    }

    #[test]
    fn stages_render_in_kebab_case() {
        assert_eq!(Stage::ExtractingRevision.to_string(), "extracting-revision");
    }
}
