//! Input checks applied to job submissions.
//!
//! Both validators are pure predicates; [`validate_submission`] turns them
//! into the typed [`SubmitError`] the store reports to callers.

use reqwest::Url;

use crate::error::SubmitError;

/// Returns `true` for `owner/repo` paths: exactly one `/` between two
/// non-empty segments of ASCII letters, digits, `-` and `_`.
pub fn is_valid_repo_path(path: &str) -> bool {
    let Some((owner, repo)) = path.split_once('/') else {
        return false;
    };
    is_valid_segment(owner) && is_valid_segment(repo)
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Returns `true` for absolute `http`/`https` URLs with a host and no
/// whitespace anywhere in the raw string.
///
/// The raw string must spell out `<scheme>://<authority>` itself; inputs the
/// URL parser would repair, such as `http:example.com` or backslash
/// separators, are rejected.
pub fn is_valid_callback_url(url: &str) -> bool {
    if url.is_empty() || url.contains('\\') || url.chars().any(char::is_whitespace) {
        return false;
    }
    if !has_explicit_authority(url) {
        return false;
    }
    match Url::parse(url) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https")
                && parsed.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}

fn has_explicit_authority(url: &str) -> bool {
    let Some((scheme, rest)) = url.split_once("://") else {
        return false;
    };
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    (scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https"))
        && !authority.is_empty()
}

/// Checks a submission in order: repository, prompt, callback URL.
pub fn validate_submission(
    upstream_repo: &str,
    prompt: &str,
    callback_url: Option<&str>,
) -> Result<(), SubmitError> {
    if !is_valid_repo_path(upstream_repo) {
        return Err(SubmitError::InvalidRepository(upstream_repo.to_string()));
    }
    if prompt.trim().is_empty() {
        return Err(SubmitError::EmptyPrompt);
    }
    if let Some(url) = callback_url
        && !is_valid_callback_url(url)
    {
        return Err(SubmitError::InvalidCallbackUrl(url.to_string()));
    }
    Ok(())
}
