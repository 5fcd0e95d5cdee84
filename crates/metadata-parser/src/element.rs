//! In-memory tree model for metadata records.

/// A single element in a parsed metadata record.
///
/// Element and attribute names are stored without namespace prefixes.
/// Children keep document order and may repeat under the same name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataElement {
    text: Option<String>,
    attrs: Vec<(String, String)>,
    children: Vec<(String, MetadataElement)>,
}

impl MetadataElement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trimmed text content, or the empty string when there is none.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("").trim()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    pub(crate) fn append_text(&mut self, fragment: &str) {
        match &mut self.text {
            Some(existing) => existing.push_str(fragment),
            None => self.text = Some(fragment.to_string()),
        }
    }

    /// Attribute value by (prefix-stripped) name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn push_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attrs.push((name.into(), value.into()));
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&MetadataElement> {
        self.children
            .iter()
            .find(|(child_name, _)| child_name == name)
            .map(|(_, child)| child)
    }

    /// One-or-many normalization: every child with the given name, in
    /// document order. Absent coerces to an empty list, a single element
    /// to a one-element list. This is the only shape branching in the
    /// whole pipeline.
    pub fn children_named(&self, name: &str) -> Vec<&MetadataElement> {
        self.children
            .iter()
            .filter(|(child_name, _)| child_name == name)
            .map(|(_, child)| child)
            .collect()
    }

    /// All children in document order, with their names.
    pub fn children(&self) -> impl Iterator<Item = (&str, &MetadataElement)> {
        self.children
            .iter()
            .map(|(name, child)| (name.as_str(), child))
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// No text, no attributes, no children.
    pub fn is_blank(&self) -> bool {
        self.text().is_empty() && self.attrs.is_empty() && self.children.is_empty()
    }

    /// Trimmed text of the first child with the given name, when present
    /// and non-empty.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(MetadataElement::text).filter(|t| !t.is_empty())
    }

    pub fn push_child(&mut self, name: impl Into<String>, child: MetadataElement) {
        self.children.push((name.into(), child));
    }

    /// Replace the text of the first child with the given name, creating
    /// the child when absent. Used by the validator to substitute defaults.
    pub fn set_child_text(&mut self, name: &str, text: impl Into<String>) {
        if let Some((_, child)) = self
            .children
            .iter_mut()
            .find(|(child_name, _)| child_name == name)
        {
            child.set_text(text);
        } else {
            let mut child = MetadataElement::new();
            child.set_text(text);
            self.children.push((name.to_string(), child));
        }
    }
}
