//! HTML page for the open pull request triage report.

use chrono::{DateTime, Utc};

use crate::analysis::OpenPrRow;

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn link(href: &str, text: &str) -> String {
    format!("<a href=\"{}\">{}</a>", escape(href), escape(text))
}

pub fn render_open_prs(rows: &[OpenPrRow], generated_at: DateTime<Utc>) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<title>Open pull requests</title>\n");
    html.push_str(
        "<style>table { border-collapse: collapse; } \
         td, th { border: 1px solid #ccc; padding: 4px 8px; text-align: left; }</style>\n",
    );
    html.push_str("</head>\n<body>\n");
    html.push_str("<h1>Open pull requests</h1>\n");
    html.push_str(&format!(
        "<p>Generated {} UTC. {} open pull requests.</p>\n",
        generated_at.format("%Y-%m-%d %H:%M:%S"),
        rows.len()
    ));
    html.push_str(
        "<p>Association is the author's GitHub relationship to the repository \
         (member, contributor, ...). Team membership badges are not shown.</p>\n",
    );

    html.push_str("<table>\n<thead>\n<tr>");
    for heading in [
        "Tool",
        "PR",
        "Age (days)",
        "Owner",
        "Association",
        "Title",
        "Last comment",
        "By",
        "Last activity (days)",
    ] {
        html.push_str(&format!("<th>{}</th>", heading));
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");

    for row in rows {
        html.push_str("<tr>");
        html.push_str(&format!("<td>{}</td>", link(&row.address, &row.tool)));
        html.push_str(&format!("<td>{}</td>", link(&row.url, &format!("#{}", row.pr))));
        html.push_str(&format!("<td>{}</td>", row.age));
        html.push_str(&format!("<td>{}</td>", escape(&row.owner)));
        html.push_str(&format!("<td>{}</td>", row.author_association));
        html.push_str(&format!("<td>{}</td>", escape(&row.title)));
        html.push_str(&format!("<td>{}</td>", escape(&row.last_comment)));
        html.push_str(&format!("<td>{}</td>", escape(&row.by)));
        html.push_str(&format!("<td>{}</td>", row.age_comment));
        html.push_str("</tr>\n");
    }

    html.push_str("</tbody>\n</table>\n</body>\n</html>\n");
    html
}
