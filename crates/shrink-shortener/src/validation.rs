use url::Url;

pub const MAX_URL_LENGTH: usize = 2048;

pub const BLANK: &str = "Original url can't be blank";
pub const INVALID_FORMAT: &str = "Original url must be a valid URL";

/// Checks that `url` is a well-formed absolute `http`/`https` URL.
///
/// Returns every violated constraint. The URL is not normalized: the
/// string that passes is the string that gets stored.
pub fn validate_url(url: &str) -> Result<(), Vec<String>> {
    let mut reasons = Vec::new();

    if url.trim().is_empty() {
        reasons.push(BLANK.to_string());
    }
    if url.chars().count() > MAX_URL_LENGTH {
        reasons.push(format!(
            "Original url is too long (maximum is {MAX_URL_LENGTH} characters)"
        ));
    }
    if !is_http_url(url) {
        reasons.push(INVALID_FORMAT.to_string());
    }

    if reasons.is_empty() {
        Ok(())
    } else {
        Err(reasons)
    }
}

fn is_http_url(url: &str) -> bool {
    // The parser silently trims and strips whitespace; such input would be
    // stored differently from what was validated.
    if url.chars().any(|c| c.is_whitespace() || c.is_control()) {
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
