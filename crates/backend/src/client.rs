//! HTTP client for the site backend.
//!
//! Async client using `reqwest` with API key authentication. Storage
//! endpoints live under `/storage/v1`, the settings table under `/rest/v1`.

use std::time::Duration;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;
use crate::store::{ObjectStore, SettingsStore, SparseRecord, StoreFuture};

const DEFAULT_TABLE: &str = "site_settings";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Characters left as-is inside a path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Connection settings for [`Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend root, e.g. `https://abc.example.co`.
    pub base_url: String,
    /// Public (anon) API key.
    pub api_key: String,
    /// Table holding settings overrides.
    pub settings_table: String,
    /// Timeout applied to every request.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            settings_table: DEFAULT_TABLE.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// One row of the settings table.
#[derive(Debug, Deserialize)]
struct SettingRow {
    key: String,
    #[serde(default)]
    value: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct SettingUpsert<'a> {
    key: &'a str,
    value: &'a str,
    updated_at: String,
}

#[derive(Debug, Serialize)]
struct RemoveRequest<'a> {
    prefixes: &'a [String],
}

/// Backend HTTP client implementing both [`ObjectStore`] and [`SettingsStore`].
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    settings_table: String,
}

impl Client {
    /// Creates a new client.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::InvalidUrl(config.base_url));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(&config.api_key).map_err(|_| Error::InvalidKey)?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .map_err(|_| Error::InvalidKey)?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            base_url,
            settings_table: config.settings_table,
        })
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds the public URL of an object. Pure; no request is made.
    pub fn object_public_url(&self, bucket: &str, path: &str) -> Option<String> {
        let path = path.trim_matches('/');
        if bucket.is_empty() || path.is_empty() {
            return None;
        }
        Some(format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            encode_segment(bucket),
            encode_path(path)
        ))
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            encode_segment(bucket),
            encode_path(path.trim_matches('/'))
        )
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.settings_table)
    }

    async fn head(&self, url: &str) -> Result<bool, Error> {
        let resp = self.http.head(url).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(true);
        }
        if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
            return Ok(false);
        }
        Err(Error::Api {
            status: status.as_u16(),
            body: String::new(),
        })
    }

    async fn put_object(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), Error> {
        let len = data.len();
        let resp = self
            .http
            .post(self.object_url(bucket, path))
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .header("cache-control", "max-age=3600")
            .body(data)
            .send()
            .await?;
        check(resp).await?;
        debug!(bucket, path, bytes = len, "uploaded object");
        Ok(())
    }

    async fn delete_objects(&self, bucket: &str, paths: &[String]) -> Result<(), Error> {
        let url = format!(
            "{}/storage/v1/object/{}",
            self.base_url,
            encode_segment(bucket)
        );
        let resp = self
            .http
            .delete(url)
            .json(&RemoveRequest { prefixes: paths })
            .send()
            .await?;
        check(resp).await?;
        debug!(bucket, count = paths.len(), "removed objects");
        Ok(())
    }

    async fn fetch_settings(&self) -> Result<SparseRecord, Error> {
        let resp = self
            .http
            .get(self.table_url())
            .query(&[("select", "key,value")])
            .send()
            .await?;
        let body = check(resp).await?;
        let rows: Vec<SettingRow> = serde_json::from_slice(&body)?;
        // Duplicate keys: last row wins.
        Ok(rows.into_iter().map(|r| (r.key, r.value)).collect())
    }

    async fn upsert_setting(&self, key: &str, value: &str) -> Result<(), Error> {
        let row = SettingUpsert {
            key,
            value,
            updated_at: chrono::Utc::now().to_rfc3339(),
        };
        let resp = self
            .http
            .post(self.table_url())
            .query(&[("on_conflict", "key")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[row])
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    async fn delete_setting(&self, key: &str) -> Result<(), Error> {
        let filter = format!("eq.{key}");
        let resp = self
            .http
            .delete(self.table_url())
            .query(&[("key", filter.as_str())])
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}

impl ObjectStore for Client {
    fn public_url<'a>(&'a self, bucket: &'a str, path: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(async move { Ok(self.object_public_url(bucket, path)) })
    }

    fn exists<'a>(&'a self, url: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(self.head(url))
    }

    fn upload<'a>(
        &'a self,
        bucket: &'a str,
        path: &'a str,
        data: Vec<u8>,
        content_type: &'a str,
        upsert: bool,
    ) -> StoreFuture<'a, ()> {
        Box::pin(self.put_object(bucket, path, data, content_type, upsert))
    }

    fn remove<'a>(&'a self, bucket: &'a str, paths: &'a [String]) -> StoreFuture<'a, ()> {
        Box::pin(self.delete_objects(bucket, paths))
    }
}

impl SettingsStore for Client {
    fn get_all(&self) -> StoreFuture<'_, SparseRecord> {
        Box::pin(self.fetch_settings())
    }

    fn upsert<'a>(&'a self, key: &'a str, value: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(self.upsert_setting(key, value))
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(self.delete_setting(key))
    }
}

/// Returns the body of a successful response, or an API error.
async fn check(resp: reqwest::Response) -> Result<Vec<u8>, Error> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp.bytes().await?.to_vec())
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Percent-encodes each `/`-separated segment of an object path.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::oneshot;

    /// Reads one HTTP request (headers plus `Content-Length` body).
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let content_length = text[..end]
                    .lines()
                    .find_map(|l| {
                        let lower = l.to_ascii_lowercase();
                        lower
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Starts a mock HTTP server answering one request with `status` and
    /// `body`. The received request text is sent back on the channel.
    async fn mock_server(
        status: u16,
        body: &str,
    ) -> (String, oneshot::Receiver<String>, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}");
        let body = body.to_string();
        let (tx, rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let request = read_request(&mut stream).await;
                let _ = tx.send(request);

                let resp = format!(
                    "HTTP/1.1 {status} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(resp.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (url, rx, handle)
    }

    fn client(url: &str) -> Client {
        Client::new(ClientConfig::new(url, "anon-key")).unwrap()
    }

    #[test]
    fn new_rejects_non_http_url() {
        let err = Client::new(ClientConfig::new("ftp://x", "k")).err().unwrap();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn new_rejects_invalid_key() {
        let err = Client::new(ClientConfig::new("https://x", "bad\nkey"))
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidKey));
    }

    #[test]
    fn public_url_encodes_segments() {
        let c = client("https://backend.test/");
        assert_eq!(
            c.object_public_url("site-images", "hero.jpg").as_deref(),
            Some("https://backend.test/storage/v1/object/public/site-images/hero.jpg")
        );
        assert_eq!(
            c.object_public_url("site-images", "before-after/1 before.jpg")
                .as_deref(),
            Some(
                "https://backend.test/storage/v1/object/public/site-images/before-after/1%20before.jpg"
            )
        );
    }

    #[test]
    fn public_url_none_for_empty_path() {
        let c = client("https://backend.test");
        assert!(c.object_public_url("site-images", "").is_none());
        assert!(c.object_public_url("", "hero.jpg").is_none());
    }

    #[tokio::test]
    async fn exists_true_on_200() {
        let (url, rx, handle) = mock_server(200, "").await;
        let c = client(&url);
        let target = format!("{url}/storage/v1/object/public/site-images/hero.jpg");

        assert!(c.exists(&target).await.unwrap());
        let request = rx.await.unwrap();
        assert!(request.starts_with("HEAD /storage/v1/object/public/site-images/hero.jpg"));
        assert!(request.to_ascii_lowercase().contains("apikey: anon-key"));

        handle.abort();
    }

    #[tokio::test]
    async fn exists_false_on_404() {
        let (url, _rx, handle) = mock_server(404, "").await;
        let c = client(&url);
        assert!(!c.exists(&format!("{url}/x.jpg")).await.unwrap());
        handle.abort();
    }

    #[tokio::test]
    async fn exists_errors_on_500() {
        let (url, _rx, handle) = mock_server(500, "").await;
        let c = client(&url);
        let err = c.exists(&format!("{url}/x.jpg")).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        handle.abort();
    }

    #[tokio::test]
    async fn get_all_collects_rows() {
        let json = r#"[
            {"key":"phone","value":"Z"},
            {"key":"business_name","value":"Glow"},
            {"key":"phone","value":"Z2"},
            {"key":"promo"}
        ]"#;
        let (url, rx, handle) = mock_server(200, json).await;
        let c = client(&url);

        let record = c.get_all().await.unwrap();
        assert_eq!(record.len(), 3);
        assert_eq!(record["phone"], "Z2");
        assert_eq!(record["business_name"], "Glow");
        assert!(record["promo"].is_null());

        let request = rx.await.unwrap();
        assert!(request.starts_with("GET /rest/v1/site_settings?select=key%2Cvalue"));

        handle.abort();
    }

    #[tokio::test]
    async fn get_all_missing_table_error() {
        let body = r#"{"code":"42P01","message":"relation \"public.site_settings\" does not exist"}"#;
        let (url, _rx, handle) = mock_server(404, body).await;
        let c = client(&url);

        let err = c.get_all().await.unwrap_err();
        assert!(err.is_missing_container(), "unexpected error: {err}");

        handle.abort();
    }

    #[tokio::test]
    async fn get_all_rejects_non_array() {
        let (url, _rx, handle) = mock_server(200, r#"{"phone":"Z"}"#).await;
        let c = client(&url);
        assert!(matches!(c.get_all().await, Err(Error::Json(_))));
        handle.abort();
    }

    #[tokio::test]
    async fn upsert_posts_merge_duplicates() {
        let (url, rx, handle) = mock_server(201, "").await;
        let c = client(&url);

        c.upsert("phone", "+44 1").await.unwrap();
        let request = rx.await.unwrap();
        assert!(request.starts_with("POST /rest/v1/site_settings?on_conflict=key"));
        assert!(
            request
                .to_ascii_lowercase()
                .contains("prefer: resolution=merge-duplicates")
        );
        assert!(request.contains(r#""key":"phone""#));
        assert!(request.contains(r#""value":"+44 1""#));
        assert!(request.contains("updated_at"));

        handle.abort();
    }

    #[tokio::test]
    async fn delete_filters_by_key() {
        let (url, rx, handle) = mock_server(204, "").await;
        let c = client(&url);

        c.delete("phone").await.unwrap();
        let request = rx.await.unwrap();
        assert!(request.starts_with("DELETE /rest/v1/site_settings?key=eq.phone"));

        handle.abort();
    }

    #[tokio::test]
    async fn upload_sends_upsert_header() {
        let (url, rx, handle) = mock_server(200, r#"{"Key":"site-images/hero.jpg"}"#).await;
        let c = client(&url);

        c.upload("site-images", "hero.jpg", b"JPEG".to_vec(), "image/jpeg", true)
            .await
            .unwrap();
        let request = rx.await.unwrap();
        let lower = request.to_ascii_lowercase();
        assert!(request.starts_with("POST /storage/v1/object/site-images/hero.jpg"));
        assert!(lower.contains("x-upsert: true"));
        assert!(lower.contains("content-type: image/jpeg"));
        assert!(request.ends_with("JPEG"));

        handle.abort();
    }

    #[tokio::test]
    async fn upload_missing_bucket_error() {
        let body = r#"{"statusCode":"404","error":"Bucket not found","message":"Bucket not found"}"#;
        let (url, _rx, handle) = mock_server(400, body).await;
        let c = client(&url);

        let err = c
            .upload("site-images", "hero.jpg", vec![1], "image/jpeg", true)
            .await
            .unwrap_err();
        assert!(err.is_missing_container());
        let msg = err.to_string();
        assert!(msg.contains("400"), "error should mention 400: {msg}");

        handle.abort();
    }

    #[tokio::test]
    async fn remove_sends_prefixes() {
        let (url, rx, handle) = mock_server(200, "[]").await;
        let c = client(&url);

        let paths = vec!["hero.jpg".to_string()];
        c.remove("site-images", &paths).await.unwrap();
        let request = rx.await.unwrap();
        assert!(request.starts_with("DELETE /storage/v1/object/site-images "));
        assert!(request.contains(r#"{"prefixes":["hero.jpg"]}"#));

        handle.abort();
    }
}
