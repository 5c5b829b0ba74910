use crate::error::{ServerError, ServerResult};
use crate::fs::{DirEntry, FileSystem, StdFileSystem};
use crate::http::{HttpContext, Response};
use crate::middleware::Middleware;
use crate::mime;
use minijinja::{context, Environment};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const INDEX_FILES: [&str; 4] = ["index.html", "index.htm", "default.html", "default.htm"];

// The `.html` name turns on auto-escaping for every interpolated value.
const LISTING_NAME: &str = "listing.html";
const LISTING: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Index of {{ title }}</title></head>
<body>
<h1>Index of {{ title }}</h1>
<table>
<tr><th>Name</th><th>Size</th><th>Last modified</th></tr>
{% for row in rows %}<tr><td><a href="{{ base }}{{ row.href }}">{{ row.name }}</a></td><td>{{ row.size }}</td><td>{{ row.modified }}</td></tr>
{% endfor %}</table>
</body>
</html>
"#;

#[derive(Serialize)]
struct ListingRow {
    href: String,
    name: String,
    size: String,
    modified: String,
}

/// Serves a directory tree.
///
/// Files are sent whole with a content type guessed from their extension.
/// A directory is answered with its first index document, or with a
/// generated listing when it has none. Paths that do not exist, or that
/// would leave the root, pass to the next stage.
#[derive(Clone)]
pub struct StaticFiles {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self::with_fs(root, StdFileSystem)
    }

    pub fn with_fs<P: Into<PathBuf>>(root: P, fs: impl FileSystem) -> Self {
        Self {
            root: root.into(),
            fs: Arc::new(fs),
        }
    }

    /// Decodes a request path into segments below the root, collapsing `.`
    /// and `..`.
    ///
    /// Returns `None` when the path cannot be decoded or climbs above the
    /// root.
    fn segments(url_path: &str) -> Option<Vec<String>> {
        let decoded = urlencoding::decode(url_path).ok()?;
        let mut segments: Vec<String> = Vec::new();
        for segment in decoded.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop()?;
                }
                s if s.contains('\\') || s.contains('\0') => return None,
                s => segments.push(s.to_owned()),
            }
        }
        Some(segments)
    }

    fn locate(&self, segments: &[String]) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(segments);
        path
    }

    fn serve_file(&self, path: &Path, res: &mut Response) -> ServerResult<()> {
        let contents = self.fs.read_all(path)?;
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        res.header("Content-Type", mime::guess_or_default(name))
            .data(contents);
        Ok(())
    }

    fn serve_listing(&self, dir: &Path, segments: &[String], res: &mut Response) -> ServerResult<()> {
        let entries = self.fs.list_entries(dir)?;
        res.html(render_listing(segments, &entries)?);
        Ok(())
    }
}

impl Middleware for StaticFiles {
    fn handle(&self, ctx: &mut HttpContext) -> ServerResult<bool> {
        let Some(segments) = Self::segments(ctx.request.path()) else {
            tracing::debug!(path = ctx.request.path(), "static path rejected");
            return Ok(false);
        };
        let path = self.locate(&segments);

        if self.fs.is_file(&path) {
            self.serve_file(&path, &mut ctx.response)?;
            return Ok(true);
        }
        if !self.fs.is_dir(&path) {
            return Ok(false);
        }
        for index in INDEX_FILES {
            let candidate = path.join(index);
            if self.fs.is_file(&candidate) {
                self.serve_file(&candidate, &mut ctx.response)?;
                return Ok(true);
            }
        }
        self.serve_listing(&path, &segments, &mut ctx.response)?;
        Ok(true)
    }
}

/// Renders the listing for the directory at `segments`. Links are built
/// from the normalized segments, never from the raw request path.
fn render_listing(segments: &[String], entries: &[DirEntry]) -> ServerResult<String> {
    let mut base = String::from("/");
    let mut title = String::from("/");
    for segment in segments {
        base.push_str(&urlencoding::encode(segment));
        base.push('/');
        title.push_str(segment);
        title.push('/');
    }

    let rows: Vec<ListingRow> = entries
        .iter()
        .map(|entry| {
            let suffix = if entry.is_file { "" } else { "/" };
            ListingRow {
                href: format!("{}{}", urlencoding::encode(&entry.name), suffix),
                name: format!("{}{}", entry.name, suffix),
                size: if entry.is_file {
                    entry.size.to_string()
                } else {
                    String::new()
                },
                modified: entry
                    .modified
                    .map(httpdate::fmt_http_date)
                    .unwrap_or_default(),
            }
        })
        .collect();

    let mut env = Environment::new();
    env.add_template(LISTING_NAME, LISTING)
        .map_err(|err| ServerError::InternalError(err.to_string()))?;
    env.get_template(LISTING_NAME)
        .and_then(|tmpl| tmpl.render(context! { title, base, rows }))
        .map_err(|err| ServerError::InternalError(format!("listing template: {}", err)))
}
