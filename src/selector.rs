//! Ways to locate an element in a uiautomator hierarchy dump.

/// Represents ways to locate a UI element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Select by `resource-id`
    ResourceId(String),
    /// Select by exact `text`
    Text(String),
    /// Select by `resource-id` and exact `text` together
    ResourceIdText { resource_id: String, text: String },
    /// Select using a path expression (`//*[@resource-id="…"]/Class[n]/…`)
    Path(String),
    /// Represents an invalid selector string, with a reason.
    Invalid(String),
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() {
            return Selector::Invalid(
                "Empty selector: provide at least one of a path expression, \
                 a resource-id, or a text value"
                    .to_string(),
            );
        }

        // id:...|text:... pins both attributes on one node
        if s.contains('|') {
            let parts: Vec<&str> = s.splitn(2, '|').collect();
            let id_part = parts[0].trim();
            let text_part = parts[1].trim();
            if let (Some(id), Some(text)) = (
                id_part.strip_prefix("id:"),
                text_part.strip_prefix("text:"),
            ) {
                return Selector::ResourceIdText {
                    resource_id: id.to_string(),
                    text: text.to_string(),
                };
            }
            return Selector::Invalid(format!(
                "Combined selector must be \"id:…|text:…\", got \"{s}\""
            ));
        }

        match s {
            _ if s.starts_with("//") => Selector::Path(s.to_string()),
            _ if s.starts_with("id:") => Selector::ResourceId(s[3..].to_string()),
            _ if s.starts_with('#') => Selector::ResourceId(s[1..].to_string()),
            _ if s.starts_with("text:") => Selector::Text(s[5..].to_string()),
            _ => Selector::Invalid(format!(
                "Unknown selector format: \"{s}\". Use \"//…\" for a path, \
                 \"id:\" or \"#\" for a resource-id, \"text:\" for text."
            )),
        }
    }
}

impl From<String> for Selector {
    fn from(s: String) -> Self {
        Selector::from(s.as_str())
    }
}

/// A parsed path expression: a resource-id anchor followed by indexed child
/// steps, e.g. `//*[@resource-id="pkg:id/list"]/android.widget.RelativeLayout[4]`.
///
/// This is the entire subset the upgrade flow needs; anything else is an
/// invalid selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    pub anchor_resource_id: String,
    /// `(class name, 1-based index among children of that class)` per step.
    pub steps: Vec<(String, usize)>,
}

impl PathExpr {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let rest = raw
            .strip_prefix("//*[@resource-id=\"")
            .ok_or_else(|| format!("Path must start with //*[@resource-id=\"…\"]: {raw}"))?;
        let close = rest
            .find("\"]")
            .ok_or_else(|| format!("Unterminated resource-id in path: {raw}"))?;
        let anchor_resource_id = rest[..close].to_string();
        if anchor_resource_id.is_empty() {
            return Err(format!("Empty resource-id in path: {raw}"));
        }

        let mut steps = Vec::new();
        let mut tail = &rest[close + 2..];
        while !tail.is_empty() {
            tail = tail
                .strip_prefix('/')
                .ok_or_else(|| format!("Expected '/' between path steps: {raw}"))?;
            let open = tail
                .find('[')
                .ok_or_else(|| format!("Path step needs a [n] index: {raw}"))?;
            let class = tail[..open].to_string();
            let end = tail
                .find(']')
                .ok_or_else(|| format!("Unterminated index in path step: {raw}"))?;
            let index: usize = tail[open + 1..end]
                .parse()
                .map_err(|_| format!("Path step index must be a number: {raw}"))?;
            if class.is_empty() || index == 0 {
                return Err(format!("Path step indices are 1-based class names: {raw}"));
            }
            steps.push((class, index));
            tail = &tail[end + 1..];
        }

        Ok(Self {
            anchor_resource_id,
            steps,
        })
    }
}
