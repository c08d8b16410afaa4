//! `Link` header continuation parsing.
//!
//! Collection endpoints paginate with a `Link` response header of the form
//! `<https://host/api/v1/...?max_id=123>; rel="next", <...>; rel="prev"`.
//! Only the `rel="next"` element drives the pagination cursor.

/// Extract the `rel="next"` URL from a `Link` header value, if present.
pub fn next_url(header: &str) -> Option<String> {
    rel_url(header, "next")
}

/// Extract the `rel="prev"` URL from a `Link` header value, if present.
pub fn prev_url(header: &str) -> Option<String> {
    rel_url(header, "prev")
}

fn rel_url(header: &str, rel: &str) -> Option<String> {
    for element in header.split(',') {
        let mut parts = element.split(';');
        let target = parts.next()?.trim();
        if !target.starts_with('<') || !target.ends_with('>') {
            continue;
        }

        let matches_rel = parts.any(|param| {
            let param = param.trim();
            param
                .strip_prefix("rel=")
                .map(|value| value.trim_matches('"') == rel)
                .unwrap_or(false)
        });

        if matches_rel {
            return Some(target[1..target.len() - 1].to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = concat!(
        "<https://mastodon.social/api/v1/timelines/home?max_id=103035>; rel=\"next\", ",
        "<https://mastodon.social/api/v1/timelines/home?min_id=103216>; rel=\"prev\""
    );

    #[test]
    fn extracts_next_url() {
        assert_eq!(
            next_url(HEADER).as_deref(),
            Some("https://mastodon.social/api/v1/timelines/home?max_id=103035")
        );
    }

    #[test]
    fn extracts_prev_url() {
        assert_eq!(
            prev_url(HEADER).as_deref(),
            Some("https://mastodon.social/api/v1/timelines/home?min_id=103216")
        );
    }

    #[test]
    fn missing_rel_is_none() {
        let header = "<https://example.com/page2>; rel=\"prev\"";
        assert_eq!(next_url(header), None);
    }

    #[test]
    fn empty_header_is_none() {
        assert_eq!(next_url(""), None);
    }

    #[test]
    fn tolerates_whitespace_and_order() {
        let header = " <https://example.com/p>;  rel=\"next\" ";
        assert_eq!(next_url(header).as_deref(), Some("https://example.com/p"));
    }
}
