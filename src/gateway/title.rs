use log::trace;

/// Extract the document title: the trimmed text of the first `<title>` element.
///
/// Matching is ASCII case-insensitive, the opening tag may carry attributes and
/// the title may span lines. A missing or blank title yields `None`.
pub fn extract_title(html: &str) -> Option<String> {
    let interior = element_interior(html, "title")?;
    let title = interior.trim();
    if title.is_empty() {
        trace!("Found <title> element but it is blank");
        return None;
    }
    Some(title.to_string())
}

/// Text between the first `<body ...>` and the following `</body>`, if both exist.
pub fn body_interior(html: &str) -> Option<&str> {
    element_interior(html, "body")
}

fn element_interior<'a>(html: &'a str, tag: &str) -> Option<&'a str> {
    // ASCII lowercasing keeps byte offsets identical to the input.
    let lower = html.to_ascii_lowercase();
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);

    let mut search_from = 0;
    while let Some(found) = lower[search_from..].find(&open) {
        let name_end = search_from + found + open.len();
        let boundary = lower[name_end..].chars().next();
        let is_tag = matches!(boundary, Some(c) if c == '>' || c == '/' || c.is_whitespace());
        if !is_tag {
            search_from = name_end;
            continue;
        }

        let content_start = name_end + lower[name_end..].find('>')? + 1;
        let content_end = content_start + lower[content_start..].find(&close)?;
        return Some(&html[content_start..content_end]);
    }

    None
}
