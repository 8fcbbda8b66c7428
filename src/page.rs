use tracing::trace;

use crate::dom::{Dom, NodeId};
use crate::formset::{
    AddOutcome, ClickAction, CounterFields, Formset, FormsetCallbacks, FormsetId, FormsetOptions,
};
use crate::html::{ParseOutput, parse_html};
use crate::{Error, Result};

/// An in-memory document with formsets attached to it.
///
/// Clicks are simulated with [`Page::click`]; they propagate from the target
/// up to the document root, and the first formset that recognizes a node on
/// that path as one of its controls handles the click and stops propagation.
#[derive(Debug)]
pub struct Page {
    dom: Dom,
    formsets: Vec<Formset>,
}

impl Page {
    pub fn from_html(html: &str) -> Result<Self> {
        let ParseOutput { dom } = parse_html(html)?;
        Ok(Self {
            dom,
            formsets: Vec::new(),
        })
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    /// Attach a formset to the first element matching `selector`, locating
    /// its counters by the conventional `id_<prefix>-...` ids.
    pub fn attach_formset(&mut self, selector: &str, options: FormsetOptions) -> Result<FormsetId> {
        self.attach_formset_with(selector, options, FormsetCallbacks::default())
    }

    pub fn attach_formset_with(
        &mut self,
        selector: &str,
        options: FormsetOptions,
        callbacks: FormsetCallbacks,
    ) -> Result<FormsetId> {
        let counters = CounterFields::locate(&self.dom, &options.prefix)?;
        self.attach_formset_with_counters(selector, options, callbacks, counters)
    }

    /// Attach a formset using explicitly supplied counter fields.
    pub fn attach_formset_with_counters(
        &mut self,
        selector: &str,
        options: FormsetOptions,
        callbacks: FormsetCallbacks,
        counters: CounterFields,
    ) -> Result<FormsetId> {
        let container = self.select_one(selector)?;
        let formset = Formset::attach(&mut self.dom, container, options, callbacks, counters)?;
        self.formsets.push(formset);
        Ok(FormsetId(self.formsets.len() - 1))
    }

    /// Locate the counter fields of `prefix` by conventional id.
    pub fn counter_fields(&self, prefix: &str) -> Result<CounterFields> {
        CounterFields::locate(&self.dom, prefix)
    }

    pub fn formset(&self, id: FormsetId) -> Result<&Formset> {
        self.formsets.get(id.0).ok_or(Error::UnknownFormset(id.0))
    }

    /// Same as clicking the formset's add control.
    pub fn add_form(&mut self, id: FormsetId) -> Result<AddOutcome> {
        let formset = self
            .formsets
            .get_mut(id.0)
            .ok_or(Error::UnknownFormset(id.0))?;
        formset.handle_add(&mut self.dom)
    }

    /// Same as clicking a delete control inside the form containing `node`.
    pub fn delete_form(&mut self, id: FormsetId, node: NodeId) -> Result<Option<NodeId>> {
        let formset = self
            .formsets
            .get_mut(id.0)
            .ok_or(Error::UnknownFormset(id.0))?;
        formset.handle_delete(&mut self.dom, node)
    }

    pub fn total_forms(&self, id: FormsetId) -> Result<i64> {
        self.formset(id)?.total_forms(&self.dom)
    }

    pub fn forms(&self, id: FormsetId) -> Result<Vec<NodeId>> {
        self.formset(id)?.forms(&self.dom)
    }

    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.click_node(target)
    }

    pub fn click_node(&mut self, target: NodeId) -> Result<()> {
        if self.dom.attr(target, "disabled").is_some() {
            return Ok(());
        }
        stacker::grow(32 * 1024 * 1024, || self.dispatch_click(target))
    }

    fn dispatch_click(&mut self, target: NodeId) -> Result<()> {
        let mut path = Vec::new();
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            path.push(node);
            cursor = self.dom.parent(node);
        }

        for node in path {
            for index in 0..self.formsets.len() {
                let Some(action) = self.formsets[index].route_click(&self.dom, node)? else {
                    continue;
                };
                trace!(formset = index, ?action, "click handled");
                let formset = &mut self.formsets[index];
                match action {
                    ClickAction::Add => {
                        formset.handle_add(&mut self.dom)?;
                    }
                    ClickAction::Delete(form) => {
                        formset.handle_delete(&mut self.dom, form)?;
                    }
                }
                return Ok(());
            }
        }
        Ok(())
    }

    pub fn value(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        self.dom.value(target)
    }

    pub fn text(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.text_content(target))
    }

    pub fn count(&self, selector: &str) -> Result<usize> {
        Ok(self.dom.query_selector_all(selector)?.len())
    }

    pub fn assert_value(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.value(target)?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.text_content(target);
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        let _ = self.select_one(selector)?;
        Ok(())
    }

    pub fn assert_count(&self, selector: &str, expected: usize) -> Result<()> {
        let actual = self.count(selector)?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
                dom_snippet: truncate_chars(&self.dom.outer_html(self.dom.root()), 200),
            });
        }
        Ok(())
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.outer_html(target))
    }

    pub fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    fn node_snippet(&self, node_id: NodeId) -> String {
        truncate_chars(&self.dom.outer_html(node_id), 200)
    }
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    let mut it = value.chars();
    let mut out = String::new();
    for _ in 0..max_chars {
        let Some(ch) = it.next() else {
            return out;
        };
        out.push(ch);
    }
    if it.next().is_some() {
        out.push_str("...");
    }
    out
}
