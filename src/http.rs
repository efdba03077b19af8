//! Out-of-band HTTP fetches
//!
//! Downloads bypass the browser: the link target is fetched directly with the
//! browser's cookies, and binary responses are handed back for storage.

use async_trait::async_trait;
use url::Url;

use crate::error::Result;
use crate::session::CookieJar;

/// Response of an out-of-band fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpResponse {
    /// Textual content, returned to the caller as is
    Text(String),
    /// Binary content to be saved
    Binary { content: Vec<u8>, file_name: String },
}

/// HTTP GET with the browser's session
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &Url, cookies: &CookieJar) -> Result<HttpResponse>;
}

/// Decide between text and binary and name the file
///
/// Attachments and non-textual content types are binary. The file name comes
/// from `Content-Disposition`, else the last path segment of the URL.
pub fn classify_response(
    url: &Url,
    content_type: Option<&str>,
    content_disposition: Option<&str>,
    body: Vec<u8>,
) -> HttpResponse {
    let attachment = content_disposition.is_some_and(|d| d.trim_start().starts_with("attachment"));
    let textual = match content_type {
        Some(ct) => is_textual(ct),
        None => std::str::from_utf8(&body).is_ok(),
    };

    if textual && !attachment {
        return HttpResponse::Text(String::from_utf8_lossy(&body).into_owned());
    }

    let file_name = content_disposition
        .and_then(file_name_from_disposition)
        .or_else(|| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "download".to_string());

    HttpResponse::Binary {
        content: body,
        file_name,
    }
}

fn is_textual(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.starts_with("text/")
        || mime.ends_with("/json")
        || mime.ends_with("+json")
        || mime.ends_with("/xml")
        || mime.ends_with("+xml")
        || mime == "application/javascript"
}

/// `filename` parameter of a `Content-Disposition` header
pub fn file_name_from_disposition(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|param| param.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}

#[cfg(feature = "http")]
pub use reqwest_client::ReqwestClient;

#[cfg(feature = "http")]
mod reqwest_client {
    use async_trait::async_trait;
    use reqwest::header::{HeaderMap, HeaderName, CONTENT_DISPOSITION, CONTENT_TYPE, COOKIE};
    use url::Url;

    use super::{classify_response, HttpClient, HttpResponse};
    use crate::error::{Error, Result};
    use crate::session::CookieJar;

    /// [`HttpClient`] backed by reqwest
    #[derive(Debug, Clone, Default)]
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Use a preconfigured reqwest client (proxies, timeouts, ...)
        pub fn with_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    fn header_value(headers: &HeaderMap, name: HeaderName) -> Option<String> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    #[async_trait]
    impl HttpClient for ReqwestClient {
        async fn get(&self, url: &Url, cookies: &CookieJar) -> Result<HttpResponse> {
            let mut request = self.client.get(url.as_str());
            if let Some(header) = cookies.cookie_header(url) {
                request = request.header(COOKIE, header);
            }

            let response = request
                .send()
                .await
                .map_err(|e| Error::Http(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::Http(format!("GET {} returned {}", url, status)));
            }

            let content_type = header_value(response.headers(), CONTENT_TYPE);
            let disposition = header_value(response.headers(), CONTENT_DISPOSITION);

            let body = response
                .bytes()
                .await
                .map_err(|e| Error::Http(e.to_string()))?;
            tracing::debug!("GET {} -> {} ({} bytes)", url, status, body.len());

            Ok(classify_response(
                url,
                content_type.as_deref(),
                disposition.as_deref(),
                body.to_vec(),
            ))
        }
    }
}
