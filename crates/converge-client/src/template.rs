use url::Url;

use crate::error::ClientError;

fn is_lower_word(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_lowercase())
}

/// `central1`: letters then digits.
fn is_area(s: &str) -> bool {
    let digits = s.trim_start_matches(|c: char| c.is_ascii_lowercase());
    digits.len() < s.len() && !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// `us-central1`
pub fn is_region(location: &str) -> bool {
    let parts: Vec<&str> = location.split('-').collect();
    matches!(parts.as_slice(), [geo, area] if is_lower_word(geo) && is_area(area))
}

/// `us-central1-a`
pub fn is_zone(location: &str) -> bool {
    let parts: Vec<&str> = location.split('-').collect();
    matches!(
        parts.as_slice(),
        [geo, area, zone]
            if is_lower_word(geo) && is_area(area) && zone.len() == 1 && is_lower_word(zone)
    )
}

/// Substitute `{{name}}` placeholders. Every placeholder must be supplied.
pub fn expand(template: &str, params: &[(&str, &str)]) -> Result<String, ClientError> {
    let mut out = template.to_string();
    for (key, value) in params {
        out = out.replace(&format!("{{{{{key}}}}}"), value);
    }
    if let Some(start) = out.find("{{") {
        let rest = &out[start + 2..];
        let param = rest.split("}}").next().unwrap_or(rest).to_string();
        return Err(ClientError::UrlParam {
            template: template.to_string(),
            param,
        });
    }
    Ok(out)
}

/// Join a base path and a relative path with exactly one slash.
pub fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Append query parameters, percent-encoding values.
pub fn with_query(url: &str, params: &[(&str, String)]) -> Result<String, ClientError> {
    if params.is_empty() {
        return Ok(url.to_string());
    }
    let mut parsed = Url::parse(url).map_err(|e| ClientError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    {
        let mut pairs = parsed.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }
    Ok(parsed.into())
}
