//! Saves text into the uploads root.
//!
//! `save_text` payload:
//!
//! | field           | default        | meaning                                   |
//! |-----------------|----------------|-------------------------------------------|
//! | `text`          | required       | content to write                          |
//! | `rel_path`      |                | target path relative to the uploads root  |
//! | `dir`           | `text`         | directory used when `rel_path` is absent  |
//! | `filename`      | `output.txt`   | file name used when `rel_path` is absent  |
//! | `append`        | `false`        | append instead of truncating              |
//! | `ensure_unique` | `false`        | pick `name(1).ext`, `name(2).ext`, ...    |
//! | `newline`       |                | `"\n"` or `"\r\n"` to normalise endings   |
//! | `bom`           | `false`        | prefix a UTF-8 BOM (new files only)       |
//! | `normalize`     |                | `{strip: true, collapse_spaces: false}`   |
//!
//! Invalid requests return `{"ok": false, "error": ...}`; I/O failures are
//! task errors.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use {
    anyhow::{Context, Result},
    async_trait::async_trait,
    serde::Deserialize,
    serde_json::{Value, json},
    svcplug_common::{Service, TaskSet},
    tracing::debug,
};

use crate::paths::join_relative;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const DEFAULT_DIR: &str = "text";
const DEFAULT_FILENAME: &str = "output.txt";

pub fn get_tasks() -> Vec<&'static str> {
    vec!["save_text"]
}

#[derive(Debug)]
pub struct TextTools {
    uploads: PathBuf,
}

#[async_trait]
impl Service for TextTools {
    async fn load(&mut self) -> Result<()> {
        tokio::fs::create_dir_all(&self.uploads)
            .await
            .with_context(|| format!("creating {}", self.uploads.display()))
    }

    fn register_tasks(tasks: &mut TaskSet<Self>) {
        tasks.blocking("save_text", TextTools::save_text);
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SaveOptions {
    text: Option<String>,
    rel_path: Option<String>,
    dir: Option<String>,
    filename: Option<String>,
    append: bool,
    ensure_unique: bool,
    encoding: Option<String>,
    newline: Option<String>,
    bom: bool,
    normalize: Option<Normalize>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Normalize {
    strip: bool,
    collapse_spaces: bool,
}

impl Default for Normalize {
    fn default() -> Self {
        Self {
            strip: true,
            collapse_spaces: false,
        }
    }
}

fn rejected(error: impl Into<String>) -> Result<Value> {
    Ok(json!({ "ok": false, "error": error.into() }))
}

impl TextTools {
    pub fn new(uploads: impl Into<PathBuf>) -> Self {
        Self {
            uploads: uploads.into(),
        }
    }

    pub fn save_text(&self, payload: Value) -> Result<Value> {
        if !payload.is_object() {
            return rejected("payload must be an object");
        }
        let opts: SaveOptions = match serde_json::from_value(payload) {
            Ok(opts) => opts,
            Err(e) => return rejected(format!("invalid options: {e}")),
        };
        let Some(text) = opts.text.as_deref() else {
            return rejected("text is required (string)");
        };
        if let Some(encoding) = &opts.encoding
            && !is_utf8(encoding)
        {
            return rejected(format!("unsupported encoding: {encoding}"));
        }

        let mut path = match self.target_path(&opts) {
            Ok(path) => path,
            Err(e) => return rejected(e),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        if opts.ensure_unique {
            path = unique_path(&path);
        }

        let text = normalize_text(text, opts.normalize.as_ref());
        let text = apply_newline(text, opts.newline.as_deref());

        let mut data = Vec::with_capacity(text.len() + UTF8_BOM.len());
        if opts.bom && !opts.append {
            data.extend_from_slice(UTF8_BOM);
        }
        data.extend_from_slice(text.as_bytes());

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(opts.append)
            .truncate(!opts.append)
            .open(&path)
            .with_context(|| format!("opening {}", path.display()))?;
        file.write_all(&data)
            .with_context(|| format!("writing {}", path.display()))?;

        debug!(path = %path.display(), bytes = data.len(), "text saved");
        Ok(json!({
            "ok": true,
            "saved_to": path.display().to_string(),
            "bytes_written": data.len(),
        }))
    }

    fn target_path(&self, opts: &SaveOptions) -> Result<PathBuf, String> {
        if let Some(rel) = opts.rel_path.as_deref().filter(|r| !r.is_empty()) {
            return join_relative(&self.uploads, rel);
        }
        let dir = join_relative(&self.uploads, opts.dir.as_deref().unwrap_or(DEFAULT_DIR))?;
        let name = sanitize_filename(opts.filename.as_deref().unwrap_or(DEFAULT_FILENAME));
        Ok(dir.join(name))
    }
}

fn is_utf8(encoding: &str) -> bool {
    encoding.to_ascii_lowercase().replace(['-', '_'], "") == "utf8"
}

fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if "<>:\"/\\|?*".contains(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// First of `stem(1).ext`, `stem(2).ext`, ... that does not exist yet.
fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (1..)
        .map(|i| path.with_file_name(format!("{stem}({i}){ext}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

fn normalize_text(text: &str, opts: Option<&Normalize>) -> String {
    let Some(opts) = opts else {
        return text.to_string();
    };
    let text = if opts.strip { text.trim() } else { text };
    if opts.collapse_spaces {
        text.lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        text.to_string()
    }
}

fn apply_newline(text: String, newline: Option<&str>) -> String {
    match newline {
        Some("\n") => text.replace("\r\n", "\n").replace('\r', "\n"),
        Some("\r\n") => text
            .replace("\r\n", "\n")
            .replace('\r', "\n")
            .replace('\n', "\r\n"),
        _ => text,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::test_support::registered};

    fn tools() -> (tempfile::TempDir, TextTools) {
        let tmp = tempfile::tempdir().unwrap();
        let tools = TextTools::new(tmp.path().join("uploads"));
        (tmp, tools)
    }

    #[test]
    fn saves_to_default_location() {
        let (tmp, tools) = tools();
        let out = tools.save_text(json!({"text": "hello"})).unwrap();
        assert_eq!(out["ok"], true);
        assert_eq!(out["bytes_written"], 5);

        let path = tmp.path().join("uploads/text/output.txt");
        assert_eq!(out["saved_to"], path.display().to_string());
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello");
    }

    #[test]
    fn rel_path_append_and_bom() {
        let (tmp, tools) = tools();
        let payload = json!({"text": "a", "rel_path": "notes/log.txt", "bom": true});
        tools.save_text(payload).unwrap();
        let out = tools
            .save_text(json!({"text": "b", "rel_path": "notes/log.txt", "append": true, "bom": true}))
            .unwrap();
        assert_eq!(out["bytes_written"], 1);

        let bytes = std::fs::read(tmp.path().join("uploads/notes/log.txt")).unwrap();
        assert_eq!(bytes, b"\xEF\xBB\xBFab");
    }

    #[test]
    fn ensure_unique_numbers_files() {
        let (tmp, tools) = tools();
        let payload = json!({"text": "x", "filename": "a.txt", "ensure_unique": true});
        tools.save_text(payload.clone()).unwrap();
        tools.save_text(payload.clone()).unwrap();
        let out = tools.save_text(payload).unwrap();

        let dir = tmp.path().join("uploads/text");
        assert!(dir.join("a.txt").is_file());
        assert!(dir.join("a(1).txt").is_file());
        assert_eq!(out["saved_to"], dir.join("a(2).txt").display().to_string());
    }

    #[test]
    fn normalizes_text_and_newlines() {
        let (tmp, tools) = tools();
        tools
            .save_text(json!({
                "text": "  one   two \r\nthree\t four  ",
                "filename": "n.txt",
                "newline": "\r\n",
                "normalize": {"collapse_spaces": true},
            }))
            .unwrap();
        let saved = std::fs::read_to_string(tmp.path().join("uploads/text/n.txt")).unwrap();
        assert_eq!(saved, "one two\r\nthree four");
    }

    #[test]
    fn filename_is_sanitized() {
        assert_eq!(sanitize_filename("a/b:c?.txt"), "a_b_c_.txt");
        assert_eq!(sanitize_filename("   "), "output.txt");
    }

    #[test]
    fn invalid_requests_are_rejected() {
        let (_tmp, tools) = tools();
        for payload in [
            json!("text"),
            json!({}),
            json!({"text": 5}),
            json!({"text": "x", "rel_path": "../escape.txt"}),
            json!({"text": "x", "encoding": "latin-1"}),
        ] {
            let out = tools.save_text(payload.clone()).unwrap();
            assert_eq!(out["ok"], false, "{payload} should be rejected");
            assert!(out["error"].is_string());
        }
    }

    #[tokio::test]
    async fn load_creates_uploads_root() {
        let (tmp, mut tools) = tools();
        tools.load().await.unwrap();
        assert!(tmp.path().join("uploads").is_dir());
    }

    #[test]
    fn declared_tasks_match_registered() {
        assert_eq!(
            svcplug_extract::extract_tasks(include_str!("mod.rs")),
            get_tasks()
        );
        assert_eq!(registered::<TextTools>(), get_tasks());
    }
}
