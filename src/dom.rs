use std::collections::{HashMap, HashSet};

use crate::html::{ParseOutput, is_void_tag, parse_html};
use crate::selector::parse_selector_groups;
use crate::{Error, Result};

/// Handle to a node inside a [`Dom`] arena.
///
/// Handles stay valid for the lifetime of the document, including after the
/// node has been detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node_type: NodeType,
}

/// Attributes in source order. Lookups are linear; elements carry a handful.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub(crate) fn get(&self, name: &str) -> Option<&String> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub(crate) fn contains_key(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    pub(crate) fn insert(&mut self, name: String, value: String) -> Option<String> {
        if let Some(entry) = self.entries.iter_mut().find(|(key, _)| *key == name) {
            return Some(std::mem::replace(&mut entry.1, value));
        }
        self.entries.push((name, value));
        None
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    pub(crate) attrs: Attributes,
    // Live value of form controls; the `value` attribute only seeds it.
    pub(crate) value: String,
}

/// Arena-backed HTML document.
///
/// Nodes are never freed: removing a node detaches it, and its [`NodeId`]
/// keeps pointing at the detached subtree.
#[derive(Debug, Clone)]
pub struct Dom {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    id_index: HashMap<String, NodeId>,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    pub(crate) fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            id_index: HashMap::new(),
        }
    }

    fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    /// Parser entry point; the new element is always connected under `parent`.
    pub(crate) fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: String,
        attrs: Attributes,
    ) -> NodeId {
        let value = attrs.get("value").cloned().unwrap_or_default();
        let element = Element {
            tag_name,
            attrs,
            value,
        };
        let id_attr = element.attrs.get("id").cloned();
        let id = self.create_node(Some(parent), NodeType::Element(element));
        if let Some(id_attr) = id_attr.filter(|id| !id.is_empty()) {
            self.id_index.entry(id_attr).or_insert(id);
        }
        id
    }

    pub(crate) fn create_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(Some(parent), NodeType::Text(text))
    }

    pub(crate) fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.nodes.get(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, node_id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    /// The document node every connected element descends from.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Lower-cased tag name, or `None` for text and document nodes.
    pub fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|e| e.tag_name.as_str())
    }

    pub fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(node_id.0).and_then(|node| node.parent)
    }

    pub fn children(&self, node_id: NodeId) -> &[NodeId] {
        self.nodes
            .get(node_id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    pub fn element_children(&self, node_id: NodeId) -> Vec<NodeId> {
        self.children(node_id)
            .iter()
            .copied()
            .filter(|child| self.element(*child).is_some())
            .collect()
    }

    pub fn is_descendant_of(&self, node_id: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = self.parent(node_id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Whether the node is still attached to the document root.
    pub fn is_connected(&self, node_id: NodeId) -> bool {
        let mut cursor = Some(node_id);
        while let Some(node) = cursor {
            if node == self.root {
                return true;
            }
            cursor = self.parent(node);
        }
        false
    }

    pub fn by_id(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    pub fn attr(&self, node_id: NodeId, name: &str) -> Option<String> {
        self.element(node_id)
            .and_then(|e| e.attrs.get(&name.to_ascii_lowercase()).cloned())
    }

    pub fn has_class(&self, node_id: NodeId, class_name: &str) -> bool {
        self.element(node_id)
            .is_some_and(|element| has_class(element, class_name))
    }

    pub fn text_content(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        for node in self.preorder(node_id) {
            if let NodeType::Text(text) = &self.nodes[node.0].node_type {
                out.push_str(text);
            }
        }
        out
    }

    /// Current value of a form control.
    pub fn value(&self, node_id: NodeId) -> Result<String> {
        let element = self
            .element(node_id)
            .ok_or_else(|| Error::Dom("value target is not an element".into()))?;
        Ok(element.value.clone())
    }

    pub(crate) fn set_value(&mut self, node_id: NodeId, value: &str) -> Result<()> {
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::Dom("value target is not an element".into()))?;
        element.value = value.to_string();
        Ok(())
    }

    pub(crate) fn initialize_form_control_values(&mut self) {
        for node in self.all_element_nodes() {
            let is_textarea = self
                .tag_name(node)
                .is_some_and(|tag| tag.eq_ignore_ascii_case("textarea"));
            if is_textarea {
                let text = self.text_content(node);
                if let Some(element) = self.element_mut(node) {
                    element.value = text;
                }
            }
        }
    }

    pub(crate) fn set_attr(&mut self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        let lowered = name.to_ascii_lowercase();
        let connected = self.is_connected(node_id);
        let old = {
            let element = self
                .element_mut(node_id)
                .ok_or_else(|| Error::Dom("setAttribute target is not an element".into()))?;
            if lowered == "value" {
                element.value = value.to_string();
            }
            element.attrs.insert(lowered.clone(), value.to_string())
        };

        if lowered == "id" && connected {
            if let Some(old) = old {
                if self.id_index.get(&old) == Some(&node_id) {
                    self.id_index.remove(&old);
                }
            }
            if !value.is_empty() {
                self.id_index.insert(value.to_string(), node_id);
            }
        }
        Ok(())
    }

    pub(crate) fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if !self.can_have_children(parent) {
            return Err(Error::Dom("appendChild target cannot have children".into()));
        }
        if child == self.root || child == parent || !self.is_valid_node(child) {
            return Err(Error::Dom("invalid appendChild node".into()));
        }
        self.ensure_no_cycle(parent, child, "appendChild")?;

        if let Some(old_parent) = self.parent(child) {
            self.nodes[old_parent.0].children.retain(|id| *id != child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        self.rebuild_id_index();
        Ok(())
    }

    pub(crate) fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> Result<()> {
        if !self.can_have_children(parent) {
            return Err(Error::Dom("insertBefore target cannot have children".into()));
        }
        if child == self.root || child == parent {
            return Err(Error::Dom("invalid insertBefore node".into()));
        }
        if !self.is_valid_node(child) || !self.is_valid_node(reference) {
            return Err(Error::Dom("insertBefore node is invalid".into()));
        }
        if self.parent(reference) != Some(parent) {
            return Err(Error::Dom(
                "insertBefore reference is not a direct child".into(),
            ));
        }
        if child == reference {
            return Ok(());
        }
        self.ensure_no_cycle(parent, child, "insertBefore")?;

        if let Some(old_parent) = self.parent(child) {
            self.nodes[old_parent.0].children.retain(|id| *id != child);
        }

        let Some(index) = self.nodes[parent.0]
            .children
            .iter()
            .position(|id| *id == reference)
        else {
            return Err(Error::Dom("insertBefore reference is missing".into()));
        };

        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(index, child);
        self.rebuild_id_index();
        Ok(())
    }

    /// Detach `node` from its parent. Detaching an already detached node is a no-op.
    pub(crate) fn remove_node(&mut self, node: NodeId) -> Result<()> {
        if node == self.root {
            return Err(Error::Dom("cannot remove document root".into()));
        }
        let Some(parent) = self.parent(node) else {
            return Ok(());
        };
        self.nodes[parent.0].children.retain(|id| *id != node);
        self.nodes[node.0].parent = None;
        self.rebuild_id_index();
        Ok(())
    }

    /// Parse `html` and copy its top-level nodes into this arena as detached
    /// subtrees, in source order.
    pub(crate) fn parse_fragment(&mut self, html: &str) -> Result<Vec<NodeId>> {
        let ParseOutput { dom: fragment } = parse_html(html)?;
        let mut out = Vec::new();
        for child in fragment.children(fragment.root).to_vec() {
            out.push(self.clone_subtree_from_dom(&fragment, child, None)?);
        }
        Ok(out)
    }

    fn clone_subtree_from_dom(
        &mut self,
        source: &Dom,
        source_node: NodeId,
        parent: Option<NodeId>,
    ) -> Result<NodeId> {
        let node_type = match &source.nodes[source_node.0].node_type {
            NodeType::Document => {
                return Err(Error::Dom("cannot import a document node".into()));
            }
            NodeType::Element(element) => NodeType::Element(element.clone()),
            NodeType::Text(text) => NodeType::Text(text.clone()),
        };

        let node = self.create_node(parent, node_type);
        // Template markup nests one call per level.
        stacker::maybe_grow(64 * 1024, 1024 * 1024, || {
            for child in &source.nodes[source_node.0].children {
                self.clone_subtree_from_dom(source, *child, Some(node))?;
            }
            Ok(node)
        })
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        let all = self.query_selector_all(selector)?;
        Ok(all.into_iter().next())
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let groups = parse_selector_groups(selector)?;

        if groups.len() == 1 && groups[0].len() == 1 {
            if let Some(id) = groups[0][0].step.id_only() {
                return Ok(self.by_id(id).into_iter().collect());
            }
        }

        let mut ids = Vec::new();
        self.collect_elements_dfs(self.root, &mut ids);
        Ok(self.filter_matching(ids, &groups))
    }

    /// Descendants of `root` (excluding `root`) matching `selector`, in document order.
    pub fn query_selector_all_from(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        let groups = parse_selector_groups(selector)?;
        let mut ids = Vec::new();
        self.collect_elements_descendants_dfs(root, &mut ids);
        Ok(self.filter_matching(ids, &groups))
    }

    pub fn query_selector_from(&self, root: NodeId, selector: &str) -> Result<Option<NodeId>> {
        let all = self.query_selector_all_from(root, selector)?;
        Ok(all.into_iter().next())
    }

    fn filter_matching(
        &self,
        candidates: Vec<NodeId>,
        groups: &[Vec<crate::selector::SelectorPart>],
    ) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut matched = Vec::new();
        for candidate in candidates {
            if groups
                .iter()
                .any(|steps| self.matches_selector_chain(candidate, steps))
                && seen.insert(candidate)
            {
                matched.push(candidate);
            }
        }
        matched
    }

    pub fn matches_selector(&self, node_id: NodeId, selector: &str) -> Result<bool> {
        if self.element(node_id).is_none() {
            return Ok(false);
        }

        let groups = parse_selector_groups(selector)?;
        Ok(groups
            .iter()
            .any(|steps| self.matches_selector_chain(node_id, steps)))
    }

    /// Nearest inclusive ancestor of `node_id` matching `selector`.
    pub fn closest(&self, node_id: NodeId, selector: &str) -> Result<Option<NodeId>> {
        if self.element(node_id).is_none() {
            return Ok(None);
        }

        let groups = parse_selector_groups(selector)?;
        let mut cursor = Some(node_id);
        while let Some(current) = cursor {
            if groups
                .iter()
                .any(|steps| self.matches_selector_chain(current, steps))
            {
                return Ok(Some(current));
            }
            cursor = self.parent(current);
        }
        Ok(None)
    }

    fn can_have_children(&self, node_id: NodeId) -> bool {
        matches!(
            self.nodes.get(node_id.0).map(|n| &n.node_type),
            Some(NodeType::Document | NodeType::Element(_))
        )
    }

    fn is_valid_node(&self, node_id: NodeId) -> bool {
        node_id.0 < self.nodes.len()
    }

    fn ensure_no_cycle(&self, parent: NodeId, child: NodeId, op: &str) -> Result<()> {
        let mut cursor = Some(parent);
        while let Some(node) = cursor {
            if node == child {
                return Err(Error::Dom(format!("{op} would create a cycle")));
            }
            cursor = self.parent(node);
        }
        Ok(())
    }

    pub(crate) fn rebuild_id_index(&mut self) {
        let mut next = HashMap::new();
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            if let NodeType::Element(element) = &self.nodes[node.0].node_type {
                if let Some(id) = element.attrs.get("id") {
                    if !id.is_empty() {
                        next.entry(id.clone()).or_insert(node);
                    }
                }
            }
            for child in self.nodes[node.0].children.iter().rev() {
                stack.push(*child);
            }
        }
        self.id_index = next;
    }

    /// `node_id` and everything below it, in document order. Walks with an
    /// explicit stack so nesting depth is bounded by memory, not the call stack.
    fn preorder(&self, node_id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if node_id.0 >= self.nodes.len() {
            return out;
        }
        let mut stack = vec![node_id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.nodes[node.0].children.iter().rev().copied());
        }
        out
    }

    fn collect_elements_dfs(&self, node_id: NodeId, out: &mut Vec<NodeId>) {
        out.extend(
            self.preorder(node_id)
                .into_iter()
                .filter(|node| matches!(self.nodes[node.0].node_type, NodeType::Element(_))),
        );
    }

    fn collect_elements_descendants_dfs(&self, node_id: NodeId, out: &mut Vec<NodeId>) {
        for child in self.children(node_id) {
            self.collect_elements_dfs(*child, out);
        }
    }

    fn all_element_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements_dfs(self.root, &mut out);
        out
    }

    pub(crate) fn next_element_sibling(&self, node_id: NodeId) -> Option<NodeId> {
        let parent = self.parent(node_id)?;
        let children = &self.nodes[parent.0].children;
        let pos = children.iter().position(|id| *id == node_id)?;
        children
            .iter()
            .skip(pos + 1)
            .copied()
            .find(|sibling| self.element(*sibling).is_some())
    }

    pub(crate) fn previous_element_sibling(&self, node_id: NodeId) -> Option<NodeId> {
        let parent = self.parent(node_id)?;
        let children = &self.nodes[parent.0].children;
        let pos = children.iter().position(|id| *id == node_id)?;
        children[..pos]
            .iter()
            .rev()
            .copied()
            .find(|sibling| self.element(*sibling).is_some())
    }

    /// Serialized markup of the node including its own tag.
    pub fn outer_html(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        self.dump_node(node_id, &mut out);
        out
    }

    /// Serialized markup of the node's children.
    pub fn inner_html(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(node_id) {
            self.dump_node(*child, &mut out);
        }
        out
    }

    fn dump_node(&self, node_id: NodeId, out: &mut String) {
        // Deeply nested markup recurses once per level.
        stacker::maybe_grow(64 * 1024, 1024 * 1024, || {
            let Some(node) = self.nodes.get(node_id.0) else {
                return;
            };
            match &node.node_type {
                NodeType::Document => {
                    for child in &node.children {
                        self.dump_node(*child, out);
                    }
                }
                NodeType::Text(text) => out.push_str(&escape_text(text)),
                NodeType::Element(element) => {
                    out.push('<');
                    out.push_str(&element.tag_name);
                    for (k, v) in element.attrs.iter() {
                        out.push(' ');
                        out.push_str(k);
                        out.push_str("=\"");
                        out.push_str(&escape_attr(v));
                        out.push('"');
                    }
                    out.push('>');
                    if is_void_tag(&element.tag_name) {
                        return;
                    }
                    for child in &node.children {
                        self.dump_node(*child, out);
                    }
                    out.push_str("</");
                    out.push_str(&element.tag_name);
                    out.push('>');
                }
            }
        });
    }
}

pub(crate) fn has_class(element: &Element, class_name: &str) -> bool {
    element
        .attrs
        .get("class")
        .map(|classes| classes.split_whitespace().any(|c| c == class_name))
        .unwrap_or(false)
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dom(html: &str) -> Dom {
        parse_html(html).expect("markup should parse").dom
    }

    #[test]
    fn insert_before_places_child_ahead_of_reference() -> Result<()> {
        let mut dom = dom("<ul id='list'><li id='a'>A</li><li id='c'>C</li></ul>");
        let list = dom.by_id("list").expect("list");
        let c = dom.by_id("c").expect("c");
        let new = dom.parse_fragment("<li id='b'>B</li>")?;
        dom.insert_before(list, new[0], c)?;
        assert_eq!(
            dom.outer_html(list),
            r#"<ul id="list"><li id="a">A</li><li id="b">B</li><li id="c">C</li></ul>"#
        );
        assert_eq!(dom.by_id("b"), Some(new[0]));
        Ok(())
    }

    #[test]
    fn insert_before_rejects_foreign_reference() -> Result<()> {
        let mut dom = dom("<div id='a'><span id='inner'></span></div><div id='b'></div>");
        let b = dom.by_id("b").expect("b");
        let inner = dom.by_id("inner").expect("inner");
        let new = dom.parse_fragment("<p></p>")?;
        let err = dom
            .insert_before(b, new[0], inner)
            .expect_err("reference lives under another parent");
        assert_eq!(
            err,
            Error::Dom("insertBefore reference is not a direct child".into())
        );
        Ok(())
    }

    #[test]
    fn append_child_rejects_cycles() {
        let mut dom = dom("<div id='outer'><div id='inner'></div></div>");
        let outer = dom.by_id("outer").expect("outer");
        let inner = dom.by_id("inner").expect("inner");
        let err = dom
            .append_child(inner, outer)
            .expect_err("moving an ancestor under its descendant must fail");
        assert_eq!(err, Error::Dom("appendChild would create a cycle".into()));
    }

    #[test]
    fn removed_node_keeps_its_subtree_and_leaves_id_index() -> Result<()> {
        let mut dom = dom("<div id='wrap'><p id='gone'><b id='bold'>x</b></p></div>");
        let gone = dom.by_id("gone").expect("gone");
        dom.remove_node(gone)?;
        assert!(!dom.is_connected(gone));
        assert_eq!(dom.by_id("gone"), None);
        assert_eq!(dom.by_id("bold"), None);
        assert_eq!(dom.outer_html(gone), r#"<p id="gone"><b id="bold">x</b></p>"#);
        dom.remove_node(gone)?;
        Ok(())
    }

    #[test]
    fn set_attr_moves_id_index_entry() -> Result<()> {
        let mut dom = dom("<input id='id_form-0-name' name='form-0-name'>");
        let input = dom.by_id("id_form-0-name").expect("input");
        dom.set_attr(input, "id", "id_form-1-name")?;
        assert_eq!(dom.by_id("id_form-0-name"), None);
        assert_eq!(dom.by_id("id_form-1-name"), Some(input));
        Ok(())
    }

    #[test]
    fn value_is_seeded_from_attribute_and_tracks_updates() -> Result<()> {
        let mut dom = dom("<input id='n' value='3'><textarea id='t'>hello</textarea>");
        let n = dom.by_id("n").expect("n");
        let t = dom.by_id("t").expect("t");
        assert_eq!(dom.value(n)?, "3");
        assert_eq!(dom.value(t)?, "hello");
        dom.set_value(n, "4")?;
        assert_eq!(dom.value(n)?, "4");
        assert_eq!(dom.attr(n, "value").as_deref(), Some("3"));
        Ok(())
    }

    #[test]
    fn outer_html_escapes_and_skips_void_end_tags() {
        let dom = dom(r#"<p id="p" title="a &quot;b&quot;">1 &lt; 2<br></p>"#);
        let p = dom.by_id("p").expect("p");
        assert_eq!(
            dom.outer_html(p),
            r#"<p id="p" title="a &quot;b&quot;">1 &lt; 2<br></p>"#
        );
    }

    #[test]
    fn closest_includes_the_node_itself() -> Result<()> {
        let dom = dom("<div class='row' id='r'><a class='x' id='link'></a></div>");
        let link = dom.by_id("link").expect("link");
        let row = dom.by_id("r").expect("row");
        assert_eq!(dom.closest(link, ".row")?, Some(row));
        assert_eq!(dom.closest(link, "a.x")?, Some(link));
        assert_eq!(dom.closest(link, ".missing")?, None);
        Ok(())
    }

    #[test]
    fn query_selector_all_from_excludes_root() -> Result<()> {
        let dom = dom("<div class='box' id='outer'><div class='box' id='inner'></div></div>");
        let outer = dom.by_id("outer").expect("outer");
        let found = dom.query_selector_all_from(outer, ".box")?;
        assert_eq!(found, vec![dom.by_id("inner").expect("inner")]);
        Ok(())
    }

    #[test]
    fn deeply_nested_markup_is_walked_without_recursion() -> Result<()> {
        let depth = 50_000;
        let mut html = "<div>".repeat(depth);
        html.push_str("<textarea id='deep'>bottom</textarea>");
        let dom = dom(&html);
        let deep = dom.by_id("deep").expect("deep");
        assert_eq!(dom.value(deep)?, "bottom");
        assert_eq!(dom.query_selector_all("div")?.len(), depth);
        assert_eq!(dom.text_content(dom.root()), "bottom");
        assert_eq!(dom.closest(deep, "div")?, dom.parent(deep));
        Ok(())
    }
}
