//! Stylesheet compilation task.
//!
//! Transform chain, strictly ordered: SCSS to CSS, vendor prefixing for the
//! declared browser matrix, duplicate media-query grouping, WebP URL
//! rewriting, IE 11 grid prefixing, then the expanded artifact, then
//! minification and the `.min` artifact with its source map. Prefixing must
//! run before grouping, and grouping before the WebP rewrite; each pass
//! assumes the normalized output of the one before it.
//!
//! Entry stylesheets are the non-partial `.scss` files at the top of the
//! scss directory; partials (`_*.scss`) only participate through `@use` /
//! `@import`. The staleness base is the newest mtime anywhere in the scss
//! tree, so editing a partial rebuilds every entry that might include it.

use super::{discover, source_map_stub, write_output, TaskError};
use crate::build::{stale, FileResult, TaskReport};
use crate::paths::{AssetKind, PathRegistry};
use crate::reload::Reloader;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use std::path::Path;
use std::time::Instant;

/// Browser support matrix for vendor prefixing.
const BROWSERSLIST: [&str; 1] = ["last 4 versions"];

pub fn run(registry: &PathRegistry, reloader: &Reloader, force: bool) -> TaskReport {
    let start = Instant::now();
    let entry = registry.resolve(AssetKind::Styles);
    let mut report = TaskReport::new(AssetKind::Styles);

    let sources = match discover(&entry.source_glob) {
        Ok(sources) => sources,
        Err(e) => return TaskReport::task_failed(AssetKind::Styles, e.to_string()),
    };
    let sources: Vec<_> = sources.into_iter().filter(|p| !is_partial(p)).collect();

    let tree_newest = stale::newest_mtime(stale::glob_paths(&entry.watch_glob));

    for source in sources {
        let stem = match source.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem.to_string(),
            None => continue,
        };
        let expanded_path = entry.out_dir.join(format!("{}.css", stem));
        let min_path = entry.out_dir.join(format!("{}.min.css", stem));
        let map_path = entry.out_dir.join(format!("{}.min.css.map", stem));

        let outputs = [expanded_path.as_path(), min_path.as_path(), map_path.as_path()];
        if !force && !stale::any_stale(outputs, tree_newest) {
            report.push(FileResult::skipped(source));
            continue;
        }

        match compile_one(&source, &entry.base_dir, &expanded_path, &min_path, &map_path) {
            Ok(()) => {
                report.push(FileResult::built(source, vec![expanded_path, min_path, map_path]))
            }
            Err(e) => {
                tracing::warn!(stylesheet = %source.display(), "{}", e);
                report.push(FileResult::failed(source, e.to_string()));
            }
        }
    }

    if report.changed() {
        reloader.broadcast(AssetKind::Styles);
    }
    report.duration = start.elapsed();
    report
}

fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('_'))
        .unwrap_or(false)
}

fn compile_one(
    source: &Path,
    base_dir: &Path,
    expanded_path: &Path,
    min_path: &Path,
    map_path: &Path,
) -> Result<(), TaskError> {
    let scss = std::fs::read_to_string(source)?;
    let css = grass::from_string(scss, &grass::Options::default().load_path(base_dir))
        .map_err(|e| TaskError::Sass(e.to_string()))?;

    let prefixed = transform_css(&css, false)?;
    let grouped = group_media_queries(&prefixed);
    let rewritten = rewrite_webp_urls(&grouped);
    write_output(expanded_path, prefix_grid(&rewritten).as_bytes())?;

    // Grid prefixes are added after each lightningcss pass so the parser
    // never sees the -ms- declarations it does not model.
    let mut minified = prefix_grid(&transform_css(&rewritten, true)?).into_owned();
    let map_name = map_path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    minified.push_str(&format!("\n/*# sourceMappingURL={} */\n", map_name));
    write_output(min_path, minified.as_bytes())?;

    let min_name = min_path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    let expanded_name = expanded_path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    write_output(map_path, source_map_stub(&min_name, &expanded_name).as_bytes())?;
    Ok(())
}

fn browser_targets() -> Targets {
    match Browsers::from_browserslist(BROWSERSLIST) {
        Ok(Some(browsers)) => Targets::from(browsers),
        _ => Targets::default(),
    }
}

/// Prefix (and optionally minify) CSS for the browser matrix. Minification
/// drops every comment, special comments included.
fn transform_css(css: &str, minify: bool) -> Result<String, TaskError> {
    let targets = browser_targets();
    let mut sheet =
        StyleSheet::parse(css, ParserOptions::default()).map_err(|e| TaskError::Css(e.to_string()))?;
    sheet
        .minify(MinifyOptions { targets, ..Default::default() })
        .map_err(|e| TaskError::Css(e.to_string()))?;
    let result = sheet
        .to_css(PrinterOptions { minify, targets, ..Default::default() })
        .map_err(|e| TaskError::Css(e.to_string()))?;
    Ok(result.code)
}

/// IE 11 grid-layout prefixes. lightningcss does not emit `-ms-grid` for any
/// target, so the old-spec translations with a direct equivalent are applied
/// here: the grid display values, the template properties, and explicit line
/// placement. Auto-placement has no -ms- counterpart and is left alone.
fn prefix_grid(css: &str) -> std::borrow::Cow<'_, str> {
    let decl = regex::Regex::new(
        r"(?i)\b(display|grid-template-columns|grid-template-rows|grid-row-start|grid-column-start)\s*:\s*([^;{}]+)",
    )
    .expect("static regex");

    decl.replace_all(css, |caps: &regex::Captures| match ms_grid_equivalent(&caps[1], &caps[2]) {
        Some(prefixed) => format!("{};{}", prefixed, &caps[0]),
        None => caps[0].to_string(),
    })
}

fn ms_grid_equivalent(property: &str, value: &str) -> Option<String> {
    let value = value.trim();
    match property.to_ascii_lowercase().as_str() {
        "display" => match value.to_ascii_lowercase().as_str() {
            "grid" => Some("display:-ms-grid".to_string()),
            "inline-grid" => Some("display:-ms-inline-grid".to_string()),
            _ => None,
        },
        "grid-template-columns" => Some(format!("-ms-grid-columns:{}", value)),
        "grid-template-rows" => Some(format!("-ms-grid-rows:{}", value)),
        "grid-row-start" => Some(format!("-ms-grid-row:{}", value)),
        "grid-column-start" => Some(format!("-ms-grid-column:{}", value)),
        _ => None,
    }
}

/// A top-level segment of a stylesheet.
enum Segment {
    /// `prelude { body }`
    Rule { prelude: String, body: String },
    /// Anything outside a block (at-rule statements, comments, whitespace)
    Raw(String),
}

/// Split a stylesheet into top-level segments by brace matching. Braces
/// inside string literals and comments are not structural; a `}` in a
/// `content` value must not close the block.
fn split_top_level(css: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut cursor = 0usize;
    let mut block_open = 0usize;

    let mut chars = css.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                chars.next();
                let mut star = false;
                for (_, c2) in chars.by_ref() {
                    if star && c2 == '/' {
                        break;
                    }
                    star = c2 == '*';
                }
            }
            '"' | '\'' => {
                let mut escaped = false;
                for (_, c2) in chars.by_ref() {
                    if escaped {
                        escaped = false;
                    } else if c2 == '\\' {
                        escaped = true;
                    } else if c2 == c {
                        break;
                    }
                }
            }
            '{' => {
                if depth == 0 {
                    block_open = i;
                }
                depth += 1;
            }
            // A stray top-level '}' is not ours to match; it falls through
            // into the trailing raw segment.
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    segments.push(Segment::Rule {
                        prelude: css[cursor..block_open].to_string(),
                        body: css[block_open + 1..i].to_string(),
                    });
                    cursor = i + 1;
                }
            }
            _ => {}
        }
    }
    if cursor < css.len() {
        segments.push(Segment::Raw(css[cursor..].to_string()));
    }
    segments
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Merge duplicate top-level `@media` blocks and move them after the plain
/// rules, preserving first-seen query order.
pub(crate) fn group_media_queries(css: &str) -> String {
    let mut out = String::new();
    // (normalized query, original prelude, merged body)
    let mut media: Vec<(String, String, String)> = Vec::new();

    for segment in split_top_level(css) {
        match segment {
            Segment::Rule { prelude, body } if prelude.trim_start().starts_with("@media") => {
                let key = normalize_ws(&prelude);
                match media.iter_mut().find(|(k, _, _)| *k == key) {
                    Some((_, _, merged)) => {
                        merged.push('\n');
                        merged.push_str(body.trim_matches('\n'));
                    }
                    None => media.push((key, prelude, body.trim_matches('\n').to_string())),
                }
            }
            Segment::Rule { prelude, body } => {
                out.push_str(&prelude);
                out.push('{');
                out.push_str(&body);
                out.push('}');
            }
            Segment::Raw(raw) => out.push_str(&raw),
        }
    }

    for (_, prelude, body) in media {
        if !out.ends_with('\n') && !out.is_empty() {
            out.push('\n');
        }
        out.push_str(prelude.trim_end());
        out.push_str(" {\n");
        out.push_str(&body);
        out.push_str("\n}\n");
    }
    out
}

/// Append, after every rule referencing a raster image `url(...)`, a
/// companion rule scoped under a `.webp` class offering the `.webp` variant
/// of the same image. Recurses into `@media` blocks.
pub(crate) fn rewrite_webp_urls(css: &str) -> String {
    let url_decl = regex::Regex::new(
        r#"(?m)([-a-zA-Z]+)\s*:[^;{}]*url\(\s*['"]?([^'")]+?\.(?:png|jpe?g))['"]?\s*\)[^;{}]*"#,
    )
    .expect("static regex");

    let mut out = String::new();
    for segment in split_top_level(css) {
        match segment {
            Segment::Rule { prelude, body } if prelude.trim_start().starts_with("@media") => {
                out.push_str(&prelude);
                out.push('{');
                out.push_str(&rewrite_webp_urls(&body));
                out.push('}');
            }
            Segment::Rule { prelude, body } if !prelude.trim_start().starts_with('@') => {
                out.push_str(&prelude);
                out.push('{');
                out.push_str(&body);
                out.push('}');

                let decls: Vec<(String, String)> = url_decl
                    .captures_iter(&body)
                    .map(|c| (c[1].to_string(), webp_variant(&c[2])))
                    .collect();
                if !decls.is_empty() {
                    let selector = prelude
                        .trim()
                        .split(',')
                        .map(|s| format!(".webp {}", s.trim()))
                        .collect::<Vec<_>>()
                        .join(", ");
                    out.push('\n');
                    out.push_str(&selector);
                    out.push_str(" {\n");
                    for (prop, url) in decls {
                        out.push_str(&format!("  {}: url(\"{}\");\n", prop, url));
                    }
                    out.push_str("}\n");
                }
            }
            Segment::Rule { prelude, body } => {
                out.push_str(&prelude);
                out.push('{');
                out.push_str(&body);
                out.push('}');
            }
            Segment::Raw(raw) => out.push_str(&raw),
        }
    }
    out
}

fn webp_variant(url: &str) -> String {
    match url.rfind('.') {
        Some(dot) => format!("{}.webp", &url[..dot]),
        None => url.to_string(),
    }
}
