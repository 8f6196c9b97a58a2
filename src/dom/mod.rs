//! In-memory document model
//!
//! An arena of element and text nodes with just enough form-control state
//! (values, checkedness, selectedness, attached files, display toggling) to
//! drive the fixture pages deterministically.

pub mod locator;

pub use locator::{Locator, Position};

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }

    pub fn from_index(index: usize) -> Self {
        Self(index)
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// Element state
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    /// Text as typed into an input or textarea, before sanitization
    pub raw_value: String,
    pub checked: bool,
    pub selected: bool,
    pub files: Vec<String>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// The inline style's last `display` declaration is `none`
    pub fn is_hidden(&self) -> bool {
        self.attr("style")
            .and_then(|style| style.split(';').filter_map(display_value).last())
            .map(|display| display.eq_ignore_ascii_case("none"))
            .unwrap_or(false)
    }

    /// Rewrite the inline style's `display`, keeping other declarations
    pub fn set_hidden(&mut self, hidden: bool) {
        let mut declarations: Vec<String> = self
            .attr("style")
            .unwrap_or("")
            .split(';')
            .map(str::trim)
            .filter(|d| !d.is_empty() && display_value(d).is_none())
            .map(str::to_string)
            .collect();
        if hidden {
            declarations.push("display: none".to_string());
        }
        if declarations.is_empty() {
            self.attrs.remove("style");
        } else {
            self.attrs.insert("style".to_string(), declarations.join("; "));
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Lowercased `type` of an input, `text` when absent
    pub fn input_type(&self) -> String {
        self.attr("type")
            .map(|t| t.to_ascii_lowercase())
            .unwrap_or_else(|| "text".to_string())
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    /// Inputs that hold a boolean state instead of text
    pub fn is_checkable(&self) -> bool {
        self.is("input") && matches!(self.input_type().as_str(), "checkbox" | "radio")
    }

    /// Inputs and textareas that accept keystrokes
    pub fn is_text_field(&self) -> bool {
        if self.is("textarea") {
            return true;
        }
        self.is("input")
            && !matches!(
                self.input_type().as_str(),
                "checkbox" | "radio" | "file" | "submit" | "button" | "hidden" | "reset"
            )
    }
}

/// A loaded page's DOM
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    body: NodeId,
    title: String,
}

impl Document {
    /// Create a document with `<html><body></body></html>`
    pub fn new(title: &str) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            body: NodeId(0),
            title: title.to_string(),
        };
        doc.root = doc.push_node(None, NodeKind::Element(element("html", &[])));
        doc.body = doc.push_node(Some(doc.root), NodeKind::Element(element("body", &[])));
        doc
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    fn push_node(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            kind,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    /// Append an element to `parent`
    ///
    /// `value`, `checked`, `selected` and an inline `display: none` style
    /// seed the element's initial state.
    pub fn append_element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        self.push_node(Some(parent), NodeKind::Element(element(tag, attrs)))
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push_node(Some(parent), NodeKind::Text(text.to_string()))
    }

    /// Still part of the tree; `set_text_content` detaches replaced children
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes.get(id.0)?.kind {
            NodeKind::Element(element) => Some(element),
            NodeKind::Text(_) => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(id.0)?.kind {
            NodeKind::Element(element) => Some(element),
            NodeKind::Text(_) => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    /// Element children in document order
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .filter(|c| self.element(*c).is_some())
            .collect()
    }

    /// Every attached element in document order
    pub fn elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if self.element(id).is_some() {
                out.push(id);
            }
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        out
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|n| self.element(*n).and_then(|e| e.attr("id")) == Some(id))
    }

    pub fn get_elements_by_class(&self, class: &str) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|n| self.element(*n).map(|e| e.has_class(class)).unwrap_or(false))
            .collect()
    }

    /// Closest ancestor (excluding `id`) with the given tag
    pub fn find_ancestor(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if self.element(node).map(|e| e.is(tag)).unwrap_or(false) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element(_) => {
                for child in &self.nodes[id.0].children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Replace all children of `id` with a single text node
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
        self.append_text(id, text);
    }

    /// Rendered: neither the element nor an ancestor has `display: none`
    pub fn is_visible(&self, id: NodeId) -> bool {
        let Some(element) = self.element(id) else {
            return false;
        };
        if element.is("input") && element.input_type() == "hidden" {
            return false;
        }
        let mut current = Some(id);
        while let Some(node) = current {
            if self.element(node).map(|e| e.is_hidden()).unwrap_or(false) {
                return false;
            }
            current = self.parent(node);
        }
        true
    }

    /// `<option>` children of a select, in document order
    pub fn options(&self, select: NodeId) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|n| {
                self.element(*n).map(|e| e.is("option")).unwrap_or(false)
                    && self.find_ancestor(*n, "select") == Some(select)
            })
            .collect()
    }

    /// An option's value: its `value` attribute, or its text
    pub fn option_value(&self, option: NodeId) -> String {
        match self.element(option).and_then(|e| e.attr("value")) {
            Some(value) => value.to_string(),
            None => self.text_content(option).trim().to_string(),
        }
    }

    /// The `value` property of a form control, `None` for other elements
    pub fn value(&self, id: NodeId) -> Option<String> {
        let element = self.element(id)?;
        if element.is("textarea") {
            return Some(element.raw_value.clone());
        }
        if element.is("select") {
            let options = self.options(id);
            let selected = options
                .iter()
                .find(|o| self.element(**o).map(|e| e.selected).unwrap_or(false))
                .or_else(|| options.first());
            return Some(selected.map(|o| self.option_value(*o)).unwrap_or_default());
        }
        if element.is("option") {
            return Some(self.option_value(id));
        }
        if !element.is("input") {
            return None;
        }
        let value = match element.input_type().as_str() {
            "checkbox" | "radio" => element.attr("value").unwrap_or("on").to_string(),
            "file" => element
                .files
                .first()
                .map(|name| format!("C:\\fakepath\\{name}"))
                .unwrap_or_default(),
            "number" => {
                if is_valid_float(&element.raw_value) {
                    element.raw_value.clone()
                } else {
                    String::new()
                }
            }
            _ => element.raw_value.clone(),
        };
        Some(value)
    }
}

fn element(tag: &str, attrs: &[(&str, &str)]) -> Element {
    let attrs: BTreeMap<String, String> = attrs
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
        .collect();
    Element {
        tag: tag.to_ascii_lowercase(),
        raw_value: attrs.get("value").cloned().unwrap_or_default(),
        checked: attrs.contains_key("checked"),
        selected: attrs.contains_key("selected"),
        files: Vec::new(),
        attrs,
    }
}

/// Value of a `display: ...` style declaration
fn display_value(declaration: &str) -> Option<&str> {
    let (property, value) = declaration.split_once(':')?;
    property
        .trim()
        .eq_ignore_ascii_case("display")
        .then(|| value.trim())
}

/// Keystrokes a `type=number` input lets through
pub fn is_number_keystroke(ch: char) -> bool {
    ch.is_ascii_digit() || matches!(ch, '-' | '+' | '.' | 'e' | 'E')
}

/// HTML "valid floating-point number": `-?(d+|d+.d+|.d+)([eE][+-]?d+)?`
pub fn is_valid_float(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    if bytes.first() == Some(&b'-') {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == frac_start {
            return false;
        }
        digits += i - frac_start;
    }
    if digits == 0 {
        return false;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }
    i == bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new("t");
        let body = doc.body();
        let banner = doc.append_element(body, "span", &[("class", "error"), ("style", "display: none")]);
        let strong = doc.append_element(banner, "strong", &[]);
        doc.append_text(strong, "Valide os campos");
        let select = doc.append_element(body, "select", &[("id", "product")]);
        let placeholder = doc.append_element(select, "option", &[("value", ""), ("disabled", ""), ("selected", "")]);
        doc.append_text(placeholder, "Selecione");
        let blog = doc.append_element(select, "option", &[("value", "blog")]);
        doc.append_text(blog, "Blog");
        let phone = doc.append_element(body, "input", &[("id", "phone"), ("type", "number")]);
        (doc, strong, select, phone)
    }

    #[test]
    fn test_visibility_follows_hidden_ancestors() {
        let (mut doc, strong, _, _) = form();
        assert!(!doc.is_visible(strong));
        let banner = doc.parent(strong).unwrap();
        doc.element_mut(banner).unwrap().set_hidden(false);
        assert!(doc.is_visible(strong));
    }

    #[test]
    fn test_visibility_tracks_the_style_attribute() {
        let (mut doc, strong, _, _) = form();
        let banner = doc.parent(strong).unwrap();
        let el = doc.element_mut(banner).unwrap();
        el.attrs.remove("style");
        assert!(doc.is_visible(strong));

        let el = doc.element_mut(banner).unwrap();
        el.attrs.insert("style".to_string(), "color: red;display:none".to_string());
        assert!(!doc.is_visible(strong));

        let el = doc.element_mut(banner).unwrap();
        el.set_hidden(false);
        assert_eq!(el.attr("style"), Some("color: red"));
        el.set_hidden(true);
        assert_eq!(el.attr("style"), Some("color: red; display: none"));
        assert!(!doc.is_visible(strong));
    }

    #[test]
    fn test_select_value_uses_selected_option() {
        let (mut doc, _, select, _) = form();
        assert_eq!(doc.value(select).as_deref(), Some(""));
        let options = doc.options(select);
        doc.element_mut(options[0]).unwrap().selected = false;
        doc.element_mut(options[1]).unwrap().selected = true;
        assert_eq!(doc.value(select).as_deref(), Some("blog"));
    }

    #[test]
    fn test_number_input_reports_empty_for_invalid_text() {
        let (mut doc, _, _, phone) = form();
        doc.element_mut(phone).unwrap().raw_value = "e".to_string();
        assert_eq!(doc.value(phone).as_deref(), Some(""));
        doc.element_mut(phone).unwrap().raw_value = "21999999999".to_string();
        assert_eq!(doc.value(phone).as_deref(), Some("21999999999"));
    }

    #[test]
    fn test_valid_float_grammar() {
        for ok in ["0", "-1", "1.5", ".5", "1e3", "1E-3", "2.5e+10"] {
            assert!(is_valid_float(ok), "{ok}");
        }
        for bad in ["", "-", ".", "e", "1.", "1e", "+1", "1-", "--1", "1e+"] {
            assert!(!is_valid_float(bad), "{bad}");
        }
    }

    #[test]
    fn test_set_text_content_detaches_old_children() {
        let (mut doc, strong, _, _) = form();
        let banner = doc.parent(strong).unwrap();
        doc.set_text_content(banner, "novo");
        assert_eq!(doc.text_content(banner), "novo");
        assert!(!doc.is_attached(strong));
        assert!(doc.is_attached(banner));
    }

    #[test]
    fn test_elements_are_in_document_order() {
        let (doc, _, select, phone) = form();
        let all = doc.elements();
        let pos = |id| all.iter().position(|n| *n == id).unwrap();
        assert!(pos(select) < pos(phone));
        assert_eq!(all[0], doc.root);
        assert_eq!(all[1], doc.body());
    }
}
