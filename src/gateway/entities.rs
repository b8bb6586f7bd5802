/// Entities decoded by the builtin converter, and what they decode to.
/// Anything else starting with `&` passes through untouched.
const ENTITIES: [(&str, &str); 6] = [
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&nbsp;", " "),
];

/// Decode the six supported HTML entities in a single left-to-right pass.
///
/// Output of one replacement is never rescanned, so `&amp;lt;` becomes `&lt;`
/// rather than `<`.
pub fn decode_entities(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(idx) = rest.find('&') {
        result.push_str(&rest[..idx]);
        rest = &rest[idx..];

        match ENTITIES.iter().find(|(entity, _)| rest.starts_with(entity)) {
            Some((entity, decoded)) => {
                result.push_str(decoded);
                rest = &rest[entity.len()..];
            }
            None => {
                result.push('&');
                rest = &rest[1..];
            }
        }
    }

    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_all_supported_entities() {
        let decoded = decode_entities("&amp; &lt; &gt; &quot; &#39; a&nbsp;b");
        assert_eq!(decoded, "& < > \" ' a b");
    }

    #[test]
    fn test_plain_text_is_unchanged() {
        let text = "Nothing to decode here, even with a lone & sign.";
        assert_eq!(decode_entities(text), text);
    }

    #[test]
    fn test_no_cascading_decode() {
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
        assert_eq!(decode_entities("&amp;amp;"), "&amp;");
    }

    #[test]
    fn test_unknown_entities_pass_through() {
        assert_eq!(decode_entities("&copy; &#169; &#x27; &hellip;"), "&copy; &#169; &#x27; &hellip;");
        assert_eq!(decode_entities("trailing &"), "trailing &");
        assert_eq!(decode_entities("&&lt;"), "&<");
    }

    #[test]
    fn test_multibyte_text_around_entities() {
        assert_eq!(decode_entities("café &amp; thé — ok"), "café & thé — ok");
    }
}
