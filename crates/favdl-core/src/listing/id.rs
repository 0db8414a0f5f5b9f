//! Listing id extraction from user input.

use url::form_urlencoded;
use url::Url;

use super::error::InvalidListingId;

/// Accepts a bare numeric listing id or a favorites URL such as
/// `https://space.bilibili.com/123/favlist?fid=456&ftype=create` and returns
/// the id. The scheme may be omitted; `fid` is also looked up in the fragment.
pub fn parse_listing_id(input: &str) -> Result<String, InvalidListingId> {
    let input = input.trim();
    if is_numeric_id(input) {
        return Ok(input.to_string());
    }

    let url = Url::parse(input).or_else(|_| Url::parse(&format!("https://{}", input)));
    if let Ok(url) = url {
        let from_query = fid_in(url.query().unwrap_or_default());
        if let Some(fid) = from_query.or_else(|| fid_in(url.fragment().unwrap_or_default())) {
            return Ok(fid);
        }
    }
    Err(InvalidListingId(input.to_string()))
}

fn fid_in(pairs: &str) -> Option<String> {
    form_urlencoded::parse(pairs.as_bytes())
        .find(|(key, _)| key == "fid")
        .map(|(_, value)| value.into_owned())
        .filter(|value| is_numeric_id(value))
}

fn is_numeric_id(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_id() {
        assert_eq!(parse_listing_id("123456").unwrap(), "123456");
        assert_eq!(parse_listing_id("  42 \n").unwrap(), "42");
    }

    #[test]
    fn favorites_url() {
        let url = "https://space.bilibili.com/17819768/favlist?fid=960110068&ftype=create";
        assert_eq!(parse_listing_id(url).unwrap(), "960110068");
    }

    #[test]
    fn fid_not_first_and_no_scheme() {
        assert_eq!(
            parse_listing_id("space.bilibili.com/1/favlist?ftype=create&fid=77").unwrap(),
            "77"
        );
    }

    #[test]
    fn fid_in_fragment() {
        assert_eq!(
            parse_listing_id("https://space.bilibili.com/1/favlist#fid=88&x=1").unwrap(),
            "88"
        );
    }

    #[test]
    fn rejects_other_input() {
        for input in [
            "",
            "abc",
            "12a",
            "https://www.bilibili.com/video/BV1xx411c7mD",
            "https://space.bilibili.com/1/favlist?fid=",
            "https://space.bilibili.com/1/favlist?fid=abc",
            "https://space.bilibili.com/1/favlist?media_id=5",
        ] {
            let err = parse_listing_id(input).unwrap_err();
            assert_eq!(err, InvalidListingId(input.trim().to_string()));
        }
    }
}
