//! Packs a file into a base64 payload for JSON transports.

use std::path::PathBuf;

use {
    anyhow::{Context, Result},
    async_trait::async_trait,
    base64::Engine,
    serde::Deserialize,
    serde_json::{Value, json},
    sha2::{Digest, Sha256},
    svcplug_common::{Service, TaskSet},
};

use crate::paths::join_relative;

pub static TASKS: [&str; 1] = ["make_b64_payload"];

const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug)]
pub struct PayloadMaker {
    uploads: PathBuf,
}

#[async_trait]
impl Service for PayloadMaker {
    fn register_tasks(tasks: &mut TaskSet<Self>) {
        tasks.blocking("make_b64_payload", PayloadMaker::make_b64_payload);
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PayloadOptions {
    path: Option<String>,
    rel_path: Option<String>,
    mime: Option<String>,
    add_prefix: bool,
}

impl Default for PayloadOptions {
    fn default() -> Self {
        Self {
            path: None,
            rel_path: None,
            mime: None,
            add_prefix: true,
        }
    }
}

fn rejected(error: impl Into<String>) -> Result<Value> {
    Ok(json!({ "ok": false, "error": error.into() }))
}

impl PayloadMaker {
    pub fn new(uploads: impl Into<PathBuf>) -> Self {
        Self {
            uploads: uploads.into(),
        }
    }

    /// Reads `rel_path` (under the uploads root) or `path` and returns
    /// `{ok, content_b64, size, sha256, mime, filename}`. `content_b64` is a
    /// `data:` URL unless `add_prefix` is false.
    pub fn make_b64_payload(&self, payload: Value) -> Result<Value> {
        let opts: PayloadOptions = match serde_json::from_value(payload) {
            Ok(opts) => opts,
            Err(e) => return rejected(format!("invalid options: {e}")),
        };

        let path = match (non_empty(&opts.rel_path), non_empty(&opts.path)) {
            (Some(rel), _) => match join_relative(&self.uploads, rel) {
                Ok(path) => path,
                Err(e) => return rejected(e),
            },
            (None, Some(path)) => PathBuf::from(path),
            (None, None) => return rejected("provide path or rel_path"),
        };

        if !path.is_file() {
            return rejected(format!("file not found: {}", path.display()));
        }
        let data = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        if data.is_empty() {
            return rejected("empty file");
        }

        let mime = match non_empty(&opts.mime) {
            Some(mime) => mime.to_string(),
            None => path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(mime_from_extension)
                .unwrap_or(FALLBACK_MIME)
                .to_string(),
        };

        let b64 = base64::engine::general_purpose::STANDARD.encode(&data);
        let content_b64 = if opts.add_prefix {
            format!("data:{mime};base64,{b64}")
        } else {
            b64
        };
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(json!({
            "ok": true,
            "content_b64": content_b64,
            "size": data.len(),
            "sha256": format!("{:x}", Sha256::digest(&data)),
            "mime": mime,
            "filename": filename,
        }))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Map a file extension to its MIME type.
fn mime_from_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "txt" => Some("text/plain"),
        "md" => Some("text/markdown"),
        "csv" => Some("text/csv"),
        "html" | "htm" => Some("text/html"),
        "json" => Some("application/json"),
        "pdf" => Some("application/pdf"),
        "zip" => Some("application/zip"),
        "doc" => Some("application/msword"),
        "docx" => Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        "mp3" => Some("audio/mpeg"),
        "wav" => Some("audio/x-wav"),
        "ogg" => Some("audio/ogg"),
        "mp4" => Some("video/mp4"),
        "webm" => Some("video/webm"),
        _ => None,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::test_support::registered};

    fn maker() -> (tempfile::TempDir, PayloadMaker) {
        let tmp = tempfile::tempdir().unwrap();
        let uploads = tmp.path().join("uploads");
        std::fs::create_dir_all(uploads.join("img")).unwrap();
        std::fs::write(uploads.join("img/dot.PNG"), b"abc").unwrap();
        std::fs::write(uploads.join("empty.txt"), b"").unwrap();
        (tmp, PayloadMaker::new(uploads))
    }

    #[test]
    fn encodes_with_data_url_prefix() {
        let (_tmp, maker) = maker();
        let out = maker.make_b64_payload(json!({"rel_path": "img/dot.PNG"})).unwrap();
        assert_eq!(out["ok"], true);
        assert_eq!(out["content_b64"], "data:image/png;base64,YWJj");
        assert_eq!(out["size"], 3);
        assert_eq!(
            out["sha256"],
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(out["mime"], "image/png");
        assert_eq!(out["filename"], "dot.PNG");
    }

    #[test]
    fn absolute_path_without_prefix_and_explicit_mime() {
        let (tmp, maker) = maker();
        let path = tmp.path().join("uploads/img/dot.PNG");
        let out = maker
            .make_b64_payload(json!({
                "path": path.display().to_string(),
                "add_prefix": false,
                "mime": "application/x-test",
            }))
            .unwrap();
        assert_eq!(out["content_b64"], "YWJj");
        assert_eq!(out["mime"], "application/x-test");
    }

    #[test]
    fn unknown_extension_falls_back() {
        let (tmp, maker) = maker();
        std::fs::write(tmp.path().join("uploads/blob.xyz"), b"1").unwrap();
        let out = maker.make_b64_payload(json!({"rel_path": "blob.xyz"})).unwrap();
        assert_eq!(out["mime"], FALLBACK_MIME);
    }

    #[test]
    fn rejections() {
        let (_tmp, maker) = maker();
        for payload in [
            json!({}),
            json!({"rel_path": "missing.bin"}),
            json!({"rel_path": "empty.txt"}),
            json!({"rel_path": "../outside"}),
            json!({"add_prefix": "yes"}),
        ] {
            let out = maker.make_b64_payload(payload.clone()).unwrap();
            assert_eq!(out["ok"], false, "{payload} should be rejected");
        }
    }

    #[test]
    fn declared_tasks_match_registered() {
        assert_eq!(svcplug_extract::extract_tasks(include_str!("mod.rs")), TASKS);
        assert_eq!(registered::<PayloadMaker>(), TASKS);
    }
}
