//! Page navigation for the provider APIs
//!
//! Each provider advertises the next page differently. [`PageStyle`] names
//! the convention and [`PageStyle::next_page`] reads it from a response.

use reqwest::header::HeaderMap;
use serde_json::Value;

/// How the next page of a resource is located
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStyle {
    /// A single request with no paging
    Single,

    /// RFC 5988 `Link: <...>; rel="next"` header (Canvas REST)
    LinkHeader,

    /// Absolute next URL inside the body at a JSON pointer (Schoology `/links/next`)
    BodyLink(String),

    /// Body `nextPageToken`, sent back as the `pageToken` query parameter (Google)
    PageToken,

    /// GraphQL connection; `hasNextPage` and `endCursor` read under the given
    /// `pageInfo` pointer and sent back as the `after` variable (Canvas GraphQL)
    GraphQl { page_info: String },
}

/// Where the following request should go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// Request this absolute URL as-is
    Url(String),
    /// Repeat the first request with `pageToken=<token>`
    Token(String),
    /// Repeat the GraphQL query with `after: <cursor>`
    Cursor(String),
}

impl PageStyle {
    /// Schoology's body link
    pub fn body_link() -> Self {
        PageStyle::BodyLink("/links/next".to_string())
    }

    /// Determine the next page from a response, `None` at the end
    pub fn next_page(&self, headers: &HeaderMap, body: &Value) -> Option<NextPage> {
        match self {
            PageStyle::Single => None,
            PageStyle::LinkHeader => headers
                .get_all(reqwest::header::LINK)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .find_map(next_link)
                .map(NextPage::Url),
            PageStyle::BodyLink(pointer) => body
                .pointer(pointer)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(|s| NextPage::Url(s.to_string())),
            PageStyle::PageToken => body
                .get("nextPageToken")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(|s| NextPage::Token(s.to_string())),
            PageStyle::GraphQl { page_info } => {
                let info = body.pointer(page_info)?;
                let has_next = info
                    .get("hasNextPage")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                if !has_next {
                    return None;
                }
                info.get("endCursor")
                    .and_then(Value::as_str)
                    .map(|s| NextPage::Cursor(s.to_string()))
            }
        }
    }
}

/// Find the `rel="next"` target in one `Link` header value
pub fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut segments = part.split(';');
        let target = segments.next()?.trim();
        let is_next = segments.any(|param| {
            let param = param.trim();
            param.eq_ignore_ascii_case("rel=\"next\"") || param.eq_ignore_ascii_case("rel=next")
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

/// Records of one page
///
/// An empty pointer means the body itself is the array. A missing key yields
/// an empty page; some endpoints omit the array when there is nothing to list.
pub fn page_records(body: &Value, pointer: &str) -> Vec<Value> {
    let located = if pointer.is_empty() {
        Some(body)
    } else {
        body.pointer(pointer)
    };
    match located {
        Some(Value::Array(items)) => items.iter().filter(|v| !v.is_null()).cloned().collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, LINK};
    use serde_json::json;

    #[test]
    fn test_next_link_parsing() {
        let header = r#"<https://canvas.test/api/v1/courses?page=1>; rel="current", <https://canvas.test/api/v1/courses?page=2&per_page=100>; rel="next", <https://canvas.test/api/v1/courses?page=5>; rel="last""#;
        assert_eq!(
            next_link(header).as_deref(),
            Some("https://canvas.test/api/v1/courses?page=2&per_page=100")
        );
    }

    #[test]
    fn test_link_header_without_next() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static(r#"<https://canvas.test/x?page=1>; rel="first""#),
        );
        assert_eq!(PageStyle::LinkHeader.next_page(&headers, &json!([])), None);
    }

    #[test]
    fn test_body_link() {
        let body = json!({"user": [], "links": {"next": "https://api.schoology.com/v1/users?start=100&limit=100"}});
        assert_eq!(
            PageStyle::body_link().next_page(&HeaderMap::new(), &body),
            Some(NextPage::Url(
                "https://api.schoology.com/v1/users?start=100&limit=100".to_string()
            ))
        );
        assert_eq!(
            PageStyle::body_link().next_page(&HeaderMap::new(), &json!({"links": {"self": "x"}})),
            None
        );
    }

    #[test]
    fn test_page_token() {
        let body = json!({"courses": [], "nextPageToken": "abc"});
        assert_eq!(
            PageStyle::PageToken.next_page(&HeaderMap::new(), &body),
            Some(NextPage::Token("abc".to_string()))
        );
        assert_eq!(
            PageStyle::PageToken.next_page(&HeaderMap::new(), &json!({"courses": []})),
            None
        );
    }

    #[test]
    fn test_graphql_cursor() {
        let style = PageStyle::GraphQl {
            page_info: "/data/account/coursesConnection/pageInfo".to_string(),
        };
        let more = json!({"data": {"account": {"coursesConnection": {
            "nodes": [], "pageInfo": {"hasNextPage": true, "endCursor": "MQ"}}}}});
        let done = json!({"data": {"account": {"coursesConnection": {
            "nodes": [], "pageInfo": {"hasNextPage": false, "endCursor": "Mg"}}}}});

        assert_eq!(
            style.next_page(&HeaderMap::new(), &more),
            Some(NextPage::Cursor("MQ".to_string()))
        );
        assert_eq!(style.next_page(&HeaderMap::new(), &done), None);
    }

    #[test]
    fn test_page_records() {
        assert_eq!(page_records(&json!([{"id": 1}, null]), "").len(), 1);
        assert_eq!(page_records(&json!({"user": [{"uid": 1}]}), "/user").len(), 1);
        assert!(page_records(&json!({"total": 0}), "/user").is_empty());
    }
}
