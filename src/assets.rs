use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use tokio::sync::{Mutex, OnceCell};
use url::Url;

use crate::fetcher::Fetcher;
use crate::generate::ASSETS_DIR;
use crate::progress::Progress;

pub struct ImageStore {
    out_dir: PathBuf,
    fetcher: Fetcher,
    progress: Option<Arc<Progress>>,
    entries: Mutex<HashMap<String, Arc<OnceCell<Result<String, String>>>>>,
}

impl ImageStore {
    pub fn new(out_dir: PathBuf, fetcher: Fetcher, progress: Option<Arc<Progress>>) -> Self {
        Self {
            out_dir,
            fetcher,
            progress,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, url: &str) -> anyhow::Result<String> {
        let cell = {
            let mut entries = self.entries.lock().await;
            let is_unique = !entries.contains_key(url);
            if let Some(progress) = &self.progress {
                progress.image_request(is_unique);
            }
            entries
                .entry(url.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let stored = cell
            .get_or_init(|| async {
                match self.fetch_and_store(url).await {
                    Ok(v) => Ok(v),
                    Err(e) => Err(format!("{:#}", e)),
                }
            })
            .await;

        match stored {
            Ok(v) => Ok(v.clone()),
            Err(e) => Err(anyhow::anyhow!("{e}")),
        }
    }

    pub async fn localize_all(&self, urls: &[&str]) -> HashMap<String, String> {
        let mut mapped = HashMap::new();
        for &url in urls {
            match self.get(url).await {
                Ok(local) => {
                    mapped.insert(url.to_string(), local);
                }
                Err(e) => tracing::warn!(url, error = %e, "image not localized; keeping remote url"),
            }
        }
        mapped
    }

    async fn fetch_and_store(&self, raw: &str) -> anyhow::Result<String> {
        let url = Url::parse(raw).with_context(|| format!("parse image url {raw}"))?;
        let (bytes, headers) = self.fetcher.get_bytes(&url).await?;
        let content_type = headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let ext = sniff_ext(&bytes, content_type, &url);
        let rel = write_asset_file(&self.out_dir, ASSETS_DIR, &bytes, ext)?;
        Ok(format!("/{rel}"))
    }
}

fn write_asset_file(
    out_dir: &Path,
    assets_dir_name: &str,
    bytes: &[u8],
    ext: &str,
) -> anyhow::Result<String> {
    let hash = blake3::hash(bytes).to_hex().to_string();
    let rel = format!("{}/img/{}.{}", assets_dir_name, hash, ext);
    let abs = out_dir.join(&rel);
    if let Some(parent) = abs.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    if !abs.exists() {
        std::fs::write(&abs, bytes).with_context(|| format!("write {}", abs.display()))?;
    }
    Ok(rel)
}

fn sniff_ext(bytes: &[u8], content_type: Option<&str>, url: &Url) -> &'static str {
    if let Some(ext) = content_type
        .and_then(|s| s.split(';').next())
        .and_then(|mime| mime_to_ext(mime.trim()))
    {
        return ext;
    }

    // Best-effort magic bytes
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        return "png";
    }
    if bytes.starts_with(b"\xff\xd8\xff") {
        return "jpg";
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return "gif";
    }
    if bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(&b"WEBP"[..]) {
        return "webp";
    }

    ext_from_url(url).unwrap_or("bin")
}

fn mime_to_ext(mime: &str) -> Option<&'static str> {
    match mime {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/svg+xml" => Some("svg"),
        "image/avif" => Some("avif"),
        _ => None,
    }
}

fn ext_from_url(url: &Url) -> Option<&'static str> {
    let ext = url.path().rsplit('.').next()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("png"),
        "jpg" | "jpeg" => Some("jpg"),
        "gif" => Some("gif"),
        "webp" => Some("webp"),
        "svg" => Some("svg"),
        "avif" => Some("avif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_prefers_content_type_then_magic_then_url() {
        let url = Url::parse("https://images.example/banner.jpeg?auto=compress").unwrap();
        assert_eq!(sniff_ext(b"whatever", Some("image/webp; q=1"), &url), "webp");
        assert_eq!(sniff_ext(b"\x89PNG\r\n\x1a\n....", None, &url), "png");
        assert_eq!(sniff_ext(b"????", Some("application/octet-stream"), &url), "jpg");
        let bare = Url::parse("https://images.example/banner").unwrap();
        assert_eq!(sniff_ext(b"????", None, &bare), "bin");
    }

    #[test]
    fn assets_are_content_addressed() {
        let tmp = tempfile::tempdir().unwrap();
        let a = write_asset_file(tmp.path(), "assets", b"same", "png").unwrap();
        let b = write_asset_file(tmp.path(), "assets", b"same", "png").unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("assets/img/"));
        assert!(tmp.path().join(&a).exists());
    }
}
