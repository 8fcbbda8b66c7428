use crate::dom::{Attributes, Dom};
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub(crate) struct ParseOutput {
    pub(crate) dom: Dom,
}

pub(crate) fn parse_html(html: &str) -> Result<ParseOutput> {
    let mut dom = Dom::new();

    let mut stack = vec![dom.root];
    let bytes = html.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        if starts_with_at(bytes, i, b"<!--") {
            if let Some(end) = find_subslice(bytes, i + 4, b"-->") {
                i = end + 3;
            } else {
                return Err(Error::HtmlParse("unclosed HTML comment".into()));
            }
            continue;
        }

        if starts_with_at(bytes, i, b"<!") {
            // Doctype and other markup declarations carry nothing we model.
            let end = find_subslice(bytes, i + 2, b">")
                .ok_or_else(|| Error::HtmlParse("unclosed markup declaration".into()))?;
            i = end + 1;
            continue;
        }

        if bytes[i] == b'<' && bytes.get(i + 1).is_some_and(|b| is_tag_start(*b)) {
            let (tag, attrs, self_closing, next) = parse_start_tag(html, i)?;
            i = next;

            let parent = *stack
                .last()
                .ok_or_else(|| Error::HtmlParse("missing parent element".into()))?;
            let node = dom.create_element(parent, tag.clone(), attrs);

            if is_raw_text_tag(&tag) && !self_closing {
                let close = find_case_insensitive_end_tag(bytes, i, tag.as_bytes())
                    .ok_or_else(|| Error::HtmlParse(format!("unclosed <{tag}>")))?;
                if let Some(body) = html.get(i..close) {
                    if !body.is_empty() {
                        dom.create_text(node, body.to_string());
                    }
                }
                let (_, after_end) = parse_end_tag(html, close)?;
                i = after_end;
                continue;
            }

            if !self_closing && !is_void_tag(&tag) {
                stack.push(node);
            }
            continue;
        }

        if starts_with_at(bytes, i, b"</") {
            let (tag, next) = parse_end_tag(html, i)?;
            i = next;

            // Stray end tags (including `</input>`) close nothing.
            let open = stack
                .iter()
                .skip(1)
                .rposition(|node| dom.tag_name(*node) == Some(tag.as_str()));
            if let Some(pos) = open {
                stack.truncate(pos + 1);
            }
            continue;
        }

        let text_start = i;
        i += 1;
        while i < bytes.len() && bytes[i] != b'<' {
            i += 1;
        }

        if let Some(text) = html.get(text_start..i) {
            let parent = *stack
                .last()
                .ok_or_else(|| Error::HtmlParse("missing parent element".into()))?;
            dom.create_text(parent, decode_entities(text));
        }
    }

    dom.initialize_form_control_values();
    Ok(ParseOutput { dom })
}

fn parse_start_tag(html: &str, at: usize) -> Result<(String, Attributes, bool, usize)> {
    let bytes = html.as_bytes();
    let mut i = at;
    if bytes.get(i) != Some(&b'<') {
        return Err(Error::HtmlParse("expected '<'".into()));
    }
    i += 1;

    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }

    let tag = html
        .get(tag_start..i)
        .ok_or_else(|| Error::HtmlParse("invalid tag name".into()))?
        .to_ascii_lowercase();

    if tag.is_empty() {
        return Err(Error::HtmlParse("empty tag name".into()));
    }

    let mut attrs = Attributes::default();
    let mut self_closing = false;

    loop {
        skip_ws(bytes, &mut i);
        if i >= bytes.len() {
            return Err(Error::HtmlParse(format!("unclosed start tag <{tag}")));
        }

        if bytes[i] == b'>' {
            i += 1;
            break;
        }

        if bytes[i] == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'>' {
            self_closing = true;
            i += 2;
            break;
        }

        let name_start = i;
        while i < bytes.len() && is_attr_name_char(bytes[i]) {
            i += 1;
        }

        let name = html
            .get(name_start..i)
            .ok_or_else(|| Error::HtmlParse("invalid attribute name".into()))?
            .to_ascii_lowercase();

        if name.is_empty() {
            return Err(Error::HtmlParse(format!("invalid attribute name in <{tag}>")));
        }

        skip_ws(bytes, &mut i);

        let value = if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            skip_ws(bytes, &mut i);
            parse_attr_value(html, bytes, &mut i)?
        } else {
            String::new()
        };

        // First occurrence wins, as in browsers.
        if !attrs.contains_key(&name) {
            attrs.insert(name, value);
        }
    }

    Ok((tag, attrs, self_closing, i))
}

fn parse_end_tag(html: &str, at: usize) -> Result<(String, usize)> {
    let bytes = html.as_bytes();
    let mut i = at;

    if !(bytes.get(i) == Some(&b'<') && bytes.get(i + 1) == Some(&b'/')) {
        return Err(Error::HtmlParse("expected end tag".into()));
    }
    i += 2;
    skip_ws(bytes, &mut i);

    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }

    let tag = html
        .get(tag_start..i)
        .ok_or_else(|| Error::HtmlParse("invalid end tag".into()))?
        .to_ascii_lowercase();

    while i < bytes.len() && bytes[i] != b'>' {
        i += 1;
    }
    if i >= bytes.len() {
        return Err(Error::HtmlParse("unclosed end tag".into()));
    }

    Ok((tag, i + 1))
}

fn parse_attr_value(html: &str, bytes: &[u8], i: &mut usize) -> Result<String> {
    if *i >= bytes.len() {
        return Err(Error::HtmlParse("missing attribute value".into()));
    }

    if bytes[*i] == b'\'' || bytes[*i] == b'"' {
        let quote = bytes[*i];
        *i += 1;
        let start = *i;
        while *i < bytes.len() && bytes[*i] != quote {
            *i += 1;
        }
        if *i >= bytes.len() {
            return Err(Error::HtmlParse("unclosed quoted attribute value".into()));
        }
        let value = html
            .get(start..*i)
            .ok_or_else(|| Error::HtmlParse("invalid attribute value".into()))?;
        *i += 1;
        return Ok(decode_entities(value));
    }

    let start = *i;
    while *i < bytes.len()
        && !bytes[*i].is_ascii_whitespace()
        && bytes[*i] != b'>'
        && !(bytes[*i] == b'/' && *i + 1 < bytes.len() && bytes[*i + 1] == b'>')
    {
        *i += 1;
    }

    let value = html
        .get(start..*i)
        .ok_or_else(|| Error::HtmlParse("invalid attribute value".into()))?;
    Ok(decode_entities(value))
}

/// Decode the character references the serializer emits plus numeric ones.
/// Anything unrecognized is kept verbatim.
pub(crate) fn decode_entities(src: &str) -> String {
    if !src.contains('&') {
        return src.to_string();
    }

    let mut out = String::with_capacity(src.len());
    let mut rest = src;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail.find(';').filter(|pos| *pos <= 10) else {
            out.push('&');
            rest = &tail[1..];
            continue;
        };
        let name = &tail[1..semi];
        let decoded = match name {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" | "#39" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => decode_numeric_reference(name),
        };
        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_numeric_reference(name: &str) -> Option<char> {
    let digits = name.strip_prefix('#')?;
    let code = if let Some(hex) = digits
        .strip_prefix('x')
        .or_else(|| digits.strip_prefix('X'))
    {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        digits.parse::<u32>().ok()?
    };
    char::from_u32(code)
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn is_tag_start(b: u8) -> bool {
    b.is_ascii_alphabetic()
}

fn is_tag_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

fn is_attr_name_char(b: u8) -> bool {
    !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/' | b'"' | b'\'' | b'<')
}

pub(crate) fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_raw_text_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

fn starts_with_at(bytes: &[u8], at: usize, needle: &[u8]) -> bool {
    bytes
        .get(at..at + needle.len())
        .is_some_and(|window| window == needle)
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || from > bytes.len() {
        return None;
    }

    let mut i = from;
    while i + needle.len() <= bytes.len() {
        if &bytes[i..i + needle.len()] == needle {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn find_case_insensitive_end_tag(bytes: &[u8], from: usize, tag: &[u8]) -> Option<usize> {
    let mut i = from;
    while i + 2 + tag.len() <= bytes.len() {
        if bytes[i] == b'<'
            && bytes[i + 1] == b'/'
            && bytes[i + 2..i + 2 + tag.len()].eq_ignore_ascii_case(tag)
        {
            let after = bytes.get(i + 2 + tag.len()).copied();
            if after.is_none_or(|b| b == b'>' || b.is_ascii_whitespace()) {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn void_inputs_do_not_swallow_siblings() -> Result<()> {
        let ParseOutput { dom } =
            parse_html("<div id='row'><input name='a'><input name='b'></input><span id='s'></span></div>")?;
        let row = dom.by_id("row").expect("row");
        let tags = dom
            .element_children(row)
            .into_iter()
            .filter_map(|child| dom.tag_name(child).map(str::to_string))
            .collect::<Vec<_>>();
        assert_eq!(tags, vec!["input", "input", "span"]);
        Ok(())
    }

    #[test]
    fn boolean_and_unquoted_attributes_are_kept() -> Result<()> {
        let ParseOutput { dom } = parse_html("<input id=flag type=checkbox checked>")?;
        let flag = dom.by_id("flag").expect("flag");
        assert_eq!(dom.attr(flag, "type").as_deref(), Some("checkbox"));
        assert_eq!(dom.attr(flag, "checked").as_deref(), Some(""));
        Ok(())
    }

    #[test]
    fn first_duplicate_attribute_wins() -> Result<()> {
        let ParseOutput { dom } = parse_html("<p id='a' class='x' class='y'></p>")?;
        let p = dom.by_id("a").expect("p");
        assert_eq!(dom.attr(p, "class").as_deref(), Some("x"));
        Ok(())
    }

    #[test]
    fn stray_end_tags_are_ignored() -> Result<()> {
        let ParseOutput { dom } = parse_html("<div id='a'></span><p id='b'></p></div>")?;
        let a = dom.by_id("a").expect("a");
        let b = dom.by_id("b").expect("b");
        assert_eq!(dom.parent(b), Some(a));
        Ok(())
    }

    #[test]
    fn comments_and_doctype_are_skipped() -> Result<()> {
        let ParseOutput { dom } = parse_html("<!DOCTYPE html><!-- note --><p id='p'>x</p>")?;
        assert_eq!(dom.element_children(dom.root()).len(), 1);
        Ok(())
    }

    #[test]
    fn entities_decode_in_text_and_attributes() -> Result<()> {
        let ParseOutput { dom } =
            parse_html("<p id='p' title='&quot;q&quot; &amp; &#65;&#x42;'>a &lt;b&gt; &unknown; &</p>")?;
        let p = dom.by_id("p").expect("p");
        assert_eq!(dom.attr(p, "title").as_deref(), Some("\"q\" & AB"));
        assert_eq!(dom.text_content(p), "a <b> &unknown; &");
        Ok(())
    }

    #[test]
    fn script_body_is_raw_text() -> Result<()> {
        let ParseOutput { dom } = parse_html("<script id='s'>if (a < b) { x = '<p>'; }</script>")?;
        let s = dom.by_id("s").expect("script");
        assert_eq!(dom.text_content(s), "if (a < b) { x = '<p>'; }");
        assert!(dom.query_selector("p")?.is_none());
        Ok(())
    }

    #[test]
    fn unterminated_markup_is_an_error() {
        assert!(matches!(
            parse_html("<div class='x"),
            Err(Error::HtmlParse(_))
        ));
        assert!(matches!(parse_html("<!-- open"), Err(Error::HtmlParse(_))));
        assert!(matches!(
            parse_html("<script>never closed"),
            Err(Error::HtmlParse(_))
        ));
    }

    #[test]
    fn lone_angle_bracket_is_text() -> Result<()> {
        let ParseOutput { dom } = parse_html("<p id='p'>1 < 2</p>")?;
        let p = dom.by_id("p").expect("p");
        assert_eq!(dom.text_content(p), "1 < 2");
        Ok(())
    }
}
