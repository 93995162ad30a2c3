//! HTML directory index

use std::fmt::Write;

use mediabrowser_core::{escape_html, format_bytes, format_timestamp};

use crate::paths::encode_path;
use crate::services::File;

/// Render the "Index of" page for `prefix`
pub fn render_listing(prefix: &str, files: &[File]) -> String {
    let title = escape_html(&format!("Index of /{}", prefix));
    let mut html = String::with_capacity(512 + files.len() * 160);

    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{}</title>", title);
    html.push_str("<link rel=\"icon\" href=\"/favicon.ico\">\n</head>\n<body>\n");
    let _ = writeln!(html, "<h1>{}</h1>", title);
    html.push_str("<table>\n<tr><th>Name</th><th>Size</th><th>Last modified</th></tr>\n");

    for file in files {
        let size = match (file.is_directory, file.size) {
            (false, Some(size)) => format_bytes(size.max(0) as u64),
            _ => "-".to_string(),
        };
        let modified = file
            .last_modified
            .as_ref()
            .map(format_timestamp)
            .unwrap_or_else(|| "-".to_string());

        let _ = writeln!(
            html,
            "<tr><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td></tr>",
            escape_html(&encode_path(&file.path)),
            escape_html(&file.name),
            size,
            modified
        );
    }

    html.push_str("</table>\n</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_renders_entries() {
        let document = File {
            name: "b c.txt".to_string(),
            is_directory: false,
            path: "/a/b c.txt".to_string(),
            content_type: Some("text/plain".to_string()),
            size: Some(1536),
            last_modified: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 15).unwrap()),
        };

        let html = render_listing("a/", &[File::parent("a/"), File::directory("a/c/"), document]);

        assert!(html.contains("<title>Index of /a/</title>"));
        assert!(html.contains("<a href=\"/\">..</a>"));
        assert!(html.contains("<a href=\"/a/c/\">c/</a>"));
        assert!(html.contains("<a href=\"/a/b%20c.txt\">b c.txt</a>"));
        assert!(html.contains("1.5 KB"));
        assert!(html.contains("2024-05-01 12:30"));
    }

    #[test]
    fn test_escapes_names() {
        let file = File::directory("<script>/");
        let html = render_listing("", &[file]);

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;/"));
    }
}
