//! Parser for `uiautomator dump` hierarchy XML.
//!
//! The dump format is small and regular (one `<node …>` element per UI node,
//! all data in attributes), so this walks the bytes directly instead of
//! pulling in an XML crate.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::element::{Bounds, UiElementAttributes};
use crate::errors::AutomationError;

static BOUNDS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(-?\d+),(-?\d+)\]\[(-?\d+),(-?\d+)\]$").unwrap());

/// One parsed node of the hierarchy. Children are shared so that element
/// handles can hold subtrees without copying the dump.
#[derive(Debug, Clone, Default)]
pub struct UiNode {
    pub attrs: UiElementAttributes,
    pub children: Vec<Arc<UiNode>>,
}

impl UiNode {
    /// Depth-first walk over the whole tree, root included.
    pub fn walk(self: &Arc<Self>) -> Vec<Arc<UiNode>> {
        let mut out = Vec::new();
        fn visit(node: &Arc<UiNode>, out: &mut Vec<Arc<UiNode>>) {
            out.push(node.clone());
            for child in &node.children {
                visit(child, out);
            }
        }
        visit(self, &mut out);
        out
    }
}

fn parse_bounds(raw: &str) -> Option<Bounds> {
    let caps = BOUNDS_RE.captures(raw)?;
    Some(Bounds {
        left: caps[1].parse().ok()?,
        top: caps[2].parse().ok()?,
        right: caps[3].parse().ok()?,
        bottom: caps[4].parse().ok()?,
    })
}

fn unescape_xml(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let Some(end) = rest.find(';') else {
            out.push_str(rest);
            return out;
        };
        let entity = &rest[1..end];
        match entity {
            "amp" => out.push('&'),
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            _ => {
                let decoded = entity
                    .strip_prefix("#x")
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32);
                match decoded {
                    Some(ch) => out.push(ch),
                    None => {
                        // Unknown entity: keep it verbatim.
                        out.push_str(&rest[..=end]);
                    }
                }
            }
        }
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    out
}

fn attrs_from_pairs(pairs: &[(String, String)]) -> UiElementAttributes {
    let get = |name: &str| {
        pairs
            .iter()
            .find(|(attr_name, _)| attr_name == name)
            .map(|(_, value)| value.clone())
            .unwrap_or_default()
    };
    UiElementAttributes {
        resource_id: get("resource-id"),
        text: get("text"),
        class: get("class"),
        package: get("package"),
        content_desc: get("content-desc"),
        clickable: get("clickable") == "true",
        enabled: get("enabled") == "true",
        bounds: parse_bounds(&get("bounds")),
    }
}

struct OpenNode {
    attrs: UiElementAttributes,
    children: Vec<Arc<UiNode>>,
}

/// Parse a hierarchy dump into a tree. Leading adb noise before the first
/// `<` is skipped; declarations and comments are ignored.
pub fn parse_hierarchy(xml: &str) -> Result<Arc<UiNode>, AutomationError> {
    let malformed = |what: &str| AutomationError::PlatformError(format!("Malformed dump: {what}"));

    let bytes = xml.as_bytes();
    let mut index = xml.find('<').unwrap_or(xml.len());
    let mut stack: Vec<OpenNode> = Vec::new();
    let mut roots: Vec<Arc<UiNode>> = Vec::new();

    while index < bytes.len() {
        if bytes[index] != b'<' {
            index += 1;
            continue;
        }
        if index + 1 >= bytes.len() {
            break;
        }
        match bytes[index + 1] {
            b'/' => {
                index += 2;
                while index < bytes.len() && bytes[index] != b'>' {
                    index += 1;
                }
                if index < bytes.len() {
                    index += 1;
                }
                let done = stack.pop().ok_or_else(|| malformed("stray closing tag"))?;
                let node = Arc::new(UiNode {
                    attrs: done.attrs,
                    children: done.children,
                });
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => roots.push(node),
                }
            }
            b'!' => {
                index += 2;
                while index + 2 < bytes.len()
                    && !(bytes[index] == b'-' && bytes[index + 1] == b'-' && bytes[index + 2] == b'>')
                {
                    index += 1;
                }
                index = (index + 3).min(bytes.len());
            }
            b'?' => {
                index += 2;
                while index + 1 < bytes.len() && !(bytes[index] == b'?' && bytes[index + 1] == b'>')
                {
                    index += 1;
                }
                index = (index + 2).min(bytes.len());
            }
            _ => {
                let start = index + 1;
                let mut cursor = start;
                while cursor < bytes.len() {
                    let ch = bytes[cursor];
                    if ch == b'/' || ch == b'>' || ch.is_ascii_whitespace() {
                        break;
                    }
                    cursor += 1;
                }
                let mut attrs: Vec<(String, String)> = Vec::new();
                let mut self_closing = false;
                let mut attr_cursor = cursor;
                loop {
                    while attr_cursor < bytes.len() && bytes[attr_cursor].is_ascii_whitespace() {
                        attr_cursor += 1;
                    }
                    if attr_cursor >= bytes.len() {
                        return Err(malformed("unterminated tag"));
                    }
                    let ch = bytes[attr_cursor];
                    if ch == b'>' {
                        attr_cursor += 1;
                        break;
                    }
                    if ch == b'/' {
                        self_closing = true;
                        attr_cursor += 1;
                        if attr_cursor < bytes.len() && bytes[attr_cursor] == b'>' {
                            attr_cursor += 1;
                        }
                        break;
                    }

                    let name_start = attr_cursor;
                    while attr_cursor < bytes.len()
                        && bytes[attr_cursor] != b'='
                        && !bytes[attr_cursor].is_ascii_whitespace()
                    {
                        attr_cursor += 1;
                    }
                    let name_end = attr_cursor;
                    while attr_cursor < bytes.len() && bytes[attr_cursor].is_ascii_whitespace() {
                        attr_cursor += 1;
                    }
                    if attr_cursor >= bytes.len() || bytes[attr_cursor] != b'=' {
                        return Err(malformed("attribute without value"));
                    }
                    attr_cursor += 1;
                    while attr_cursor < bytes.len() && bytes[attr_cursor].is_ascii_whitespace() {
                        attr_cursor += 1;
                    }
                    if attr_cursor >= bytes.len() {
                        return Err(malformed("missing attribute value"));
                    }
                    let quote = bytes[attr_cursor];
                    if quote != b'"' && quote != b'\'' {
                        return Err(malformed("unquoted attribute value"));
                    }
                    attr_cursor += 1;
                    let value_start = attr_cursor;
                    while attr_cursor < bytes.len() && bytes[attr_cursor] != quote {
                        attr_cursor += 1;
                    }
                    if attr_cursor >= bytes.len() {
                        return Err(malformed("unterminated attribute value"));
                    }
                    attrs.push((
                        xml[name_start..name_end].to_string(),
                        unescape_xml(&xml[value_start..attr_cursor]),
                    ));
                    attr_cursor += 1;
                }
                index = attr_cursor;

                let node_attrs = attrs_from_pairs(&attrs);
                if self_closing {
                    let node = Arc::new(UiNode {
                        attrs: node_attrs,
                        children: Vec::new(),
                    });
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => roots.push(node),
                    }
                } else {
                    stack.push(OpenNode {
                        attrs: node_attrs,
                        children: Vec::new(),
                    });
                }
            }
        }
    }

    // Tolerate a truncated dump by closing whatever is still open.
    while let Some(done) = stack.pop() {
        let node = Arc::new(UiNode {
            attrs: done.attrs,
            children: done.children,
        });
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        }
    }

    match roots.len() {
        0 => Err(malformed("no elements")),
        1 => Ok(roots.into_iter().next().unwrap()),
        _ => Ok(Arc::new(UiNode {
            attrs: UiElementAttributes::default(),
            children: roots,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>
<hierarchy rotation="0">
  <!-- trimmed -->
  <node index="0" text="" resource-id="com.dialog.suota:id/mainItemsList" class="android.widget.ListView" package="com.dialog.suota" content-desc="" clickable="false" enabled="true" bounds="[0,0][1080,1920]">
    <node index="0" text="Firmware &amp; Co" resource-id="com.dialog.suota:id/itemValue" class="android.widget.TextView" package="com.dialog.suota" content-desc="" clickable="true" enabled="true" bounds="[10,20][110,60]"/>
  </node>
</hierarchy>
"#;

    #[test]
    fn parses_nested_nodes_and_attributes() {
        let root = parse_hierarchy(SAMPLE).expect("parse");
        let all = root.walk();
        let item = all
            .iter()
            .find(|n| n.attrs.resource_id == "com.dialog.suota:id/itemValue")
            .expect("itemValue node present");
        assert_eq!(item.attrs.text, "Firmware & Co");
        assert_eq!(item.attrs.class, "android.widget.TextView");
        assert!(item.attrs.clickable);
        assert_eq!(
            item.attrs.bounds,
            Some(Bounds {
                left: 10,
                top: 20,
                right: 110,
                bottom: 60
            })
        );
    }

    #[test]
    fn skips_leading_adb_noise() {
        let noisy = format!("UI hierchary dumped to: /dev/tty\n{SAMPLE}");
        assert!(parse_hierarchy(&noisy).is_ok());
    }

    #[test]
    fn tolerates_truncated_dump() {
        let cut = &SAMPLE[..SAMPLE.find("</node>").unwrap()];
        let root = parse_hierarchy(cut).expect("parse truncated");
        assert!(!root.walk().is_empty());
    }

    #[test]
    fn rejects_attribute_garbage() {
        assert!(parse_hierarchy("<node text=unquoted>").is_err());
        assert!(parse_hierarchy("no tags at all").is_err());
    }

    #[test]
    fn parses_bounds_strings() {
        assert_eq!(
            parse_bounds("[-2,0][1080,1920]"),
            Some(Bounds {
                left: -2,
                top: 0,
                right: 1080,
                bottom: 1920
            })
        );
        assert_eq!(parse_bounds("1080x1920"), None);
    }

    #[test]
    fn unescapes_entities() {
        assert_eq!(unescape_xml("a &lt;b&gt; &#39;c&#x41;&quot;"), "a <b> 'cA\"");
        assert_eq!(unescape_xml("&bogus; stays"), "&bogus; stays");
    }
}
