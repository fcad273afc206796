//! # Filters Module
//!
//! Field-exclusion filters and the LLM-based semantic filter, applied to the
//! de-duplicated batch.

use std::collections::HashSet;

use tracing::{ debug, info };

use crate::judge::JobJudge;
use crate::posting::{ normalize, Posting, PostingField };
use crate::retry::RetryPolicy;

/// Removes postings whose `field` is one of the excluded values.
///
/// Comparison is trimmed and case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    pub field: PostingField,
    exclude: HashSet<String>,
}

impl FilterSpec {
    pub fn new<I, S>(field: PostingField, values: I) -> Self
        where I: IntoIterator<Item = S>, S: AsRef<str>
    {
        FilterSpec {
            field,
            exclude: values
                .into_iter()
                .map(|value| normalize(value.as_ref()))
                .collect(),
        }
    }

    /// True if `posting` should be dropped.
    ///
    /// A missing field reads as `""`, so an excluded `""` drops postings lacking the field.
    pub fn excludes(&self, posting: &Posting) -> bool {
        !self.exclude.is_empty() && self.exclude.contains(&normalize(posting.field(self.field)))
    }

    pub fn is_empty(&self) -> bool {
        self.exclude.is_empty()
    }
}

/// Applies `specs` one after another; a posting removed by one never comes back.
pub fn apply(postings: Vec<Posting>, specs: &[FilterSpec]) -> Vec<Posting> {
    specs.iter().fold(postings, |remaining, spec| {
        let before = remaining.len();
        let kept: Vec<Posting> = remaining
            .into_iter()
            .filter(|posting| !spec.excludes(posting))
            .collect();
        info!(field = ?spec.field, removed = before - kept.len(), "applied field filter");
        kept
    })
}

/// Keeps postings the judge approves of.
///
/// Each decision goes through `policy`; when every attempt fails the policy's
/// fallback decides, which for [`RetryPolicy::fail_open`] means keep.
pub async fn apply_llm(
    postings: Vec<Posting>,
    judge: &dyn JobJudge,
    policy: &RetryPolicy<bool>
) -> Vec<Posting> {
    let before = postings.len();
    let mut kept = Vec::with_capacity(before);

    for posting in postings {
        let title = posting.title.as_deref().unwrap_or("");
        let location = posting.location.as_deref().unwrap_or("");
        let description = posting.description.as_deref().unwrap_or("");

        let keep = policy.run("llm filter", || judge.decide(title, location, description)).await;

        debug!(title, keep, "LLM filter decision");
        if keep {
            kept.push(posting);
        }
    }

    info!(removed = before - kept.len(), kept = kept.len(), "applied LLM filter");
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ JobsiftError, Result };
    use async_trait::async_trait;
    use std::sync::atomic::{ AtomicUsize, Ordering };
    use std::time::Duration;

    fn at(location: &str) -> Posting {
        Posting {
            title: Some("Eng".into()),
            location: Some(location.into()),
            ..Default::default()
        }
    }

    fn locations(postings: &[Posting]) -> Vec<&str> {
        postings
            .iter()
            .map(|p| p.field(PostingField::Location))
            .collect()
    }

    #[test]
    fn location_filter_is_case_insensitive() {
        let spec = FilterSpec::new(PostingField::Location, ["remote"]);
        let kept = apply(vec![at("Remote"), at("NYC")], &[spec]);
        assert_eq!(locations(&kept), vec!["NYC"]);
    }

    #[test]
    fn empty_exclusion_set_is_a_no_op() {
        let spec = FilterSpec::new(PostingField::Company, Vec::<String>::new());
        assert!(spec.is_empty());
        let kept = apply(vec![at("NYC"), Posting::default()], &[spec]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn empty_string_exclusion_drops_postings_missing_the_field() {
        let spec = FilterSpec::new(PostingField::Company, [""]);
        let with_company = Posting {
            company: Some("Acme".into()),
            ..Default::default()
        };
        let kept = apply(vec![Posting::default(), with_company.clone()], &[spec]);
        assert_eq!(kept, vec![with_company]);
    }

    #[test]
    fn specs_apply_cumulatively() {
        let specs = vec![
            FilterSpec::new(PostingField::Location, ["remote"]),
            FilterSpec::new(PostingField::Title, [" ENG "])
        ];
        let mut pm = at("NYC");
        pm.title = Some("PM".into());
        let kept = apply(vec![at("Remote"), at("NYC"), pm.clone()], &specs);
        assert_eq!(kept, vec![pm]);
    }

    /// Keeps postings whose title contains "keep", and counts calls.
    struct TitleJudge {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl JobJudge for TitleJudge {
        async fn decide(&self, title: &str, _location: &str, _description: &str) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(title.contains("keep"))
        }
    }

    struct BrokenJudge {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl JobJudge for BrokenJudge {
        async fn decide(&self, _title: &str, _location: &str, _description: &str) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(JobsiftError::Llm("connection refused".into()))
        }
    }

    fn titled(title: &str) -> Posting {
        Posting {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn llm_filter_keeps_approved_postings() {
        let judge = TitleJudge { calls: AtomicUsize::new(0) };
        let kept = apply_llm(
            vec![titled("keep me"), titled("drop me")],
            &judge,
            &RetryPolicy::fail_open()
        ).await;
        assert_eq!(kept, vec![titled("keep me")]);
        assert_eq!(judge.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn llm_filter_fails_open_after_max_attempts() {
        let judge = BrokenJudge { calls: AtomicUsize::new(0) };
        let policy = RetryPolicy::fail_open();

        let kept = apply_llm(vec![titled("anything")], &judge, &policy).await;

        assert_eq!(kept.len(), 1);
        assert_eq!(judge.calls.load(Ordering::SeqCst), policy.max_attempts as usize);
    }

    #[tokio::test]
    async fn fail_closed_policy_drops_on_exhaustion() {
        let judge = BrokenJudge { calls: AtomicUsize::new(0) };
        let policy = RetryPolicy::new(1, Duration::ZERO, false);
        let kept = apply_llm(vec![titled("anything")], &judge, &policy).await;
        assert!(kept.is_empty());
    }
}
