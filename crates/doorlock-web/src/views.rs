//! HTML pages for the admin surface.

use doorlock_core::store::{LogEntry, UserRecord};
use std::fmt::Write;

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Percent-encode a file name for use inside a URL path segment.
fn url_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(b as char);
        } else {
            let _ = write!(out, "%{b:02X}");
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body>\n<nav><a href=\"/\">Register</a> | <a href=\"/users\">Users</a> | \
         <a href=\"/logs\">Access log</a></nav>\n<h1>{title}</h1>\n{body}</body>\n</html>\n",
        title = escape(title),
    )
}

pub fn register_form() -> String {
    page(
        "Register face",
        "<form action=\"/register\" method=\"post\" enctype=\"multipart/form-data\">\n\
         <label>Name <input type=\"text\" name=\"name\" required></label>\n\
         <label>Photo <input type=\"file\" name=\"image\" accept=\"image/*\" required></label>\n\
         <button type=\"submit\">Register</button>\n</form>\n",
    )
}

pub fn logs(entries: &[LogEntry]) -> String {
    let mut body = String::from(
        "<table>\n<tr><th>Name</th><th>Capture</th><th>Access time</th></tr>\n",
    );
    for entry in entries {
        let capture = match &entry.log_capture {
            Some(file) => format!(
                "<a href=\"/captures/{}\"><img src=\"/captures/{}\" width=\"120\" alt=\"capture\"></a>",
                url_segment(file),
                url_segment(file)
            ),
            None => "-".to_string(),
        };
        let _ = writeln!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&entry.name),
            capture,
            escape(&entry.access_time)
        );
    }
    body.push_str("</table>\n");
    page("Access log", &body)
}

pub fn users(users: &[UserRecord]) -> String {
    let mut body = String::from("<table>\n<tr><th>ID</th><th>Image</th><th></th></tr>\n");
    for user in users {
        let _ = writeln!(
            body,
            "<tr><td>{id}</td><td>{path}</td><td><form action=\"/delete_user/{id}\" method=\"post\">\
             <button type=\"submit\">Delete</button></form></td></tr>",
            id = user.id,
            path = escape(&user.image_path)
        );
    }
    body.push_str("</table>\n");
    page("Registered users", &body)
}
