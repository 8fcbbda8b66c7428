use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::dom::{Dom, NodeId};
use crate::{Error, Result};

/// Token in template names and ids replaced by the new form's index.
pub const TEMPLATE_PLACEHOLDER: &str = "__prefix__";

const FORM_FIELD_SELECTOR: &str = "input, select, textarea";

/// Settings of one formset, fixed at attach time.
///
/// Deserializes from camelCase option objects, missing keys taking their
/// defaults:
///
/// ```
/// use dynamic_formset::FormsetOptions;
///
/// let options = FormsetOptions::from_json(r#"{"prefix": "ingredientes", "deleteText": "quitar"}"#)?;
/// assert_eq!(options.prefix, "ingredientes");
/// assert_eq!(options.delete_text, "quitar");
/// assert_eq!(options.form_css_class, ".dynamic-form");
/// # Ok::<(), dynamic_formset::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormsetOptions {
    /// Namespace of the counter fields and of every form field name.
    pub prefix: String,
    /// Markup for new forms. When absent the last form present at attach time is used.
    pub form_template: Option<String>,
    /// Class of the add control inside the container. A leading `.` is ignored.
    pub add_css_class: String,
    /// Selector of the insertion anchor, consulted when no add control with
    /// `add_css_class` exists inside the container.
    pub add_css_selector: Option<String>,
    /// Selector of an add trigger anywhere in the document. Replaces the
    /// in-container add control as the trigger when set.
    pub add_button: Option<String>,
    /// Class of delete controls inside each form. A leading `.` is ignored.
    pub delete_css_class: String,
    pub add_text: String,
    pub delete_text: String,
    /// Selector identifying one form of the set.
    pub form_css_class: String,
}

impl Default for FormsetOptions {
    fn default() -> Self {
        Self {
            prefix: "form".to_string(),
            form_template: None,
            add_css_class: "add-row".to_string(),
            add_css_selector: None,
            add_button: None,
            delete_css_class: "delete-row".to_string(),
            add_text: "add another".to_string(),
            delete_text: "remove".to_string(),
            form_css_class: ".dynamic-form".to_string(),
        }
    }
}

impl FormsetOptions {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| Error::InvalidOptions(err.to_string()))
    }

    /// `id` of the `<prefix>-TOTAL_FORMS` field as rendered by Django.
    pub fn total_forms_id(&self) -> String {
        format!("id_{}-TOTAL_FORMS", self.prefix)
    }

    pub fn max_forms_id(&self) -> String {
        format!("id_{}-MAX_NUM_FORMS", self.prefix)
    }

    pub fn min_forms_id(&self) -> String {
        format!("id_{}-MIN_NUM_FORMS", self.prefix)
    }

    fn add_class(&self) -> &str {
        self.add_css_class.trim().trim_start_matches('.')
    }

    fn delete_class(&self) -> &str {
        self.delete_css_class.trim().trim_start_matches('.')
    }
}

pub type FormCallback = Box<dyn FnMut(&Dom, NodeId)>;

/// Hooks run after a form was added or removed.
///
/// `removed` receives the detached form, which can still be inspected
/// through the [`Dom`].
#[derive(Default)]
pub struct FormsetCallbacks {
    added: Option<FormCallback>,
    removed: Option<FormCallback>,
}

impl FormsetCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_added(mut self, callback: impl FnMut(&Dom, NodeId) + 'static) -> Self {
        self.added = Some(Box::new(callback));
        self
    }

    pub fn on_removed(mut self, callback: impl FnMut(&Dom, NodeId) + 'static) -> Self {
        self.removed = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for FormsetCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormsetCallbacks")
            .field("added", &self.added.is_some())
            .field("removed", &self.removed.is_some())
            .finish()
    }
}

/// The management fields of a formset.
///
/// Only `total` is ever written. A missing `max` means no upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterFields {
    pub total: NodeId,
    pub max: Option<NodeId>,
    pub min: Option<NodeId>,
}

impl CounterFields {
    /// Find the counters by their conventional ids, `id_<prefix>-TOTAL_FORMS` and friends.
    pub fn locate(dom: &Dom, prefix: &str) -> Result<Self> {
        let total_id = format!("id_{prefix}-TOTAL_FORMS");
        let total = dom
            .by_id(&total_id)
            .ok_or_else(|| Error::MissingCounter(total_id))?;
        Ok(Self {
            total,
            max: dom.by_id(&format!("id_{prefix}-MAX_NUM_FORMS")),
            min: dom.by_id(&format!("id_{prefix}-MIN_NUM_FORMS")),
        })
    }
}

/// Handle to a formset attached to a [`crate::Page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormsetId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A form was inserted; holds its root element.
    Added(NodeId),
    /// `MAX_NUM_FORMS` was reached and nothing changed.
    AtCapacity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClickAction {
    Add,
    Delete(NodeId),
}

#[derive(Debug)]
pub struct Formset {
    options: FormsetOptions,
    container: NodeId,
    anchor: Option<NodeId>,
    counters: CounterFields,
    template: String,
    callbacks: FormsetCallbacks,
}

impl Formset {
    pub(crate) fn attach(
        dom: &mut Dom,
        container: NodeId,
        options: FormsetOptions,
        callbacks: FormsetCallbacks,
        counters: CounterFields,
    ) -> Result<Self> {
        ensure_delete_controls(dom, container, &options)?;
        ensure_add_control(dom, container, &options)?;

        let template = match &options.form_template {
            Some(template) => template.clone(),
            None => {
                let forms = dom.query_selector_all_from(container, &options.form_css_class)?;
                let last = forms
                    .last()
                    .copied()
                    .ok_or_else(|| Error::MissingTemplate(options.form_css_class.clone()))?;
                dom.outer_html(last)
            }
        };

        let anchor = insertion_anchor(dom, container, &options)?;
        let forms = dom
            .query_selector_all_from(container, &options.form_css_class)?
            .len();

        debug!(
            prefix = %options.prefix,
            forms,
            template_len = template.len(),
            "formset attached"
        );

        Ok(Self {
            options,
            container,
            anchor,
            counters,
            template,
            callbacks,
        })
    }

    pub fn options(&self) -> &FormsetOptions {
        &self.options
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn counters(&self) -> CounterFields {
        self.counters
    }

    /// Markup every new form is stamped from, captured once at attach time.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Live forms inside the container, in document order.
    pub fn forms(&self, dom: &Dom) -> Result<Vec<NodeId>> {
        dom.query_selector_all_from(self.container, &self.options.form_css_class)
    }

    pub fn total_forms(&self, dom: &Dom) -> Result<i64> {
        let raw = dom.value(self.counters.total)?;
        parse_int(&raw).ok_or_else(|| Error::InvalidCounter {
            field: format!("{}-TOTAL_FORMS", self.options.prefix),
            value: raw,
        })
    }

    pub fn max_forms(&self, dom: &Dom) -> Option<i64> {
        let node = self.counters.max?;
        dom.value(node).ok().as_deref().and_then(parse_int)
    }

    /// Read for completeness; no operation enforces the lower bound.
    pub fn min_forms(&self, dom: &Dom) -> Option<i64> {
        let node = self.counters.min?;
        dom.value(node).ok().as_deref().and_then(parse_int)
    }

    fn at_capacity(&self, dom: &Dom, current: i64) -> Result<bool> {
        let Some(max_node) = self.counters.max else {
            return Ok(false);
        };
        let raw = dom.value(max_node)?;
        if raw.is_empty() {
            return Ok(false);
        }
        // An unparsable maximum never blocks, the comparison with NaN fails.
        Ok(js_number(&raw).is_some_and(|max| max - current as f64 <= 0.0))
    }

    pub(crate) fn handle_add(&mut self, dom: &mut Dom) -> Result<AddOutcome> {
        let current = self.total_forms(dom)?;
        if self.at_capacity(dom, current)? {
            debug!(
                prefix = %self.options.prefix,
                total = current,
                max = ?self.max_forms(dom),
                "add refused: formset at capacity"
            );
            return Ok(AddOutcome::AtCapacity);
        }

        let (Some(previous), Some(next)) = (current.checked_sub(1), current.checked_add(1)) else {
            return Err(self.counter_out_of_range(current));
        };
        let markup = self
            .template
            .replace(TEMPLATE_PLACEHOLDER, &current.to_string());
        let nodes = dom.parse_fragment(&markup)?;
        let form = nodes
            .iter()
            .copied()
            .find(|node| dom.tag_name(*node).is_some())
            .ok_or_else(|| Error::MissingTemplate("template has no element".into()))?;

        let anchor = self
            .anchor
            .and_then(|anchor| dom.parent(anchor).map(|parent| (parent, anchor)));
        for node in nodes {
            match anchor {
                Some((parent, anchor)) => dom.insert_before(parent, node, anchor)?,
                None => dom.append_child(self.container, node)?,
            }
        }

        // Shifts `-{N-1}-` rather than the placeholder; fields whose names
        // already carry the new index are left alone.
        let old_token = format!("-{previous}-");
        let new_token = format!("-{current}-");
        for field in dom.query_selector_all_from(form, FORM_FIELD_SELECTOR)? {
            let Some(name) = dom.attr(field, "name").filter(|name| !name.is_empty()) else {
                continue;
            };
            dom.set_attr(field, "name", &name.replacen(&old_token, &new_token, 1))?;
            if let Some(id) = dom.attr(field, "id") {
                dom.set_attr(field, "id", &id.replacen(&old_token, &new_token, 1))?;
            }
        }

        dom.set_value(self.counters.total, &next.to_string())?;
        debug!(prefix = %self.options.prefix, index = current, total = next, "form added");

        if let Some(added) = self.callbacks.added.as_mut() {
            added(&*dom, form);
        }
        Ok(AddOutcome::Added(form))
    }

    /// Remove the form enclosing `node` (or `node` itself when it is a form).
    /// Returns the detached form, or `None` when `node` is not inside one of
    /// this formset's forms.
    pub(crate) fn handle_delete(&mut self, dom: &mut Dom, node: NodeId) -> Result<Option<NodeId>> {
        let Some(form) = self.enclosing_form(dom, node)? else {
            return Ok(None);
        };

        let current = self.total_forms(dom)?;
        let total = current
            .checked_sub(1)
            .ok_or_else(|| self.counter_out_of_range(current))?;
        dom.remove_node(form)?;
        dom.set_value(self.counters.total, &total.to_string())?;
        debug!(prefix = %self.options.prefix, total, "form removed");

        if let Some(removed) = self.callbacks.removed.as_mut() {
            removed(&*dom, form);
        }
        Ok(Some(form))
    }

    fn counter_out_of_range(&self, current: i64) -> Error {
        Error::InvalidCounter {
            field: format!("{}-TOTAL_FORMS", self.options.prefix),
            value: current.to_string(),
        }
    }

    fn enclosing_form(&self, dom: &Dom, node: NodeId) -> Result<Option<NodeId>> {
        let form = dom.closest(node, &self.options.form_css_class)?;
        Ok(form.filter(|form| dom.is_descendant_of(*form, self.container)))
    }

    /// Decide whether a click reaching `node` on its propagation path
    /// belongs to this formset.
    pub(crate) fn route_click(&self, dom: &Dom, node: NodeId) -> Result<Option<ClickAction>> {
        let delete_class = self.options.delete_class();
        if !delete_class.is_empty() && dom.has_class(node, delete_class) {
            if let Some(form) = self.enclosing_form(dom, node)? {
                trace!(prefix = %self.options.prefix, "delete control clicked");
                return Ok(Some(ClickAction::Delete(form)));
            }
        }

        let is_add_trigger = match &self.options.add_button {
            Some(selector) => dom.matches_selector(node, selector)?,
            None => {
                let add_class = self.options.add_class();
                !add_class.is_empty()
                    && dom.has_class(node, add_class)
                    && dom.is_descendant_of(node, self.container)
            }
        };
        if is_add_trigger {
            trace!(prefix = %self.options.prefix, "add control clicked");
            return Ok(Some(ClickAction::Add));
        }
        Ok(None)
    }
}

/// Give every form present at attach time a delete control if it lacks one.
fn ensure_delete_controls(dom: &mut Dom, container: NodeId, options: &FormsetOptions) -> Result<()> {
    let delete_class = options.delete_class();
    if delete_class.is_empty() {
        return Ok(());
    }
    let control_selector = format!(".{delete_class}");
    for form in dom.query_selector_all_from(container, &options.form_css_class)? {
        if dom.query_selector_from(form, &control_selector)?.is_some() {
            continue;
        }
        let markup = control_markup(delete_class, &options.delete_text);
        for node in dom.parse_fragment(&markup)? {
            dom.append_child(form, node)?;
        }
    }
    Ok(())
}

fn ensure_add_control(dom: &mut Dom, container: NodeId, options: &FormsetOptions) -> Result<()> {
    let add_class = options.add_class();
    if add_class.is_empty() || options.add_button.is_some() {
        return Ok(());
    }
    if dom
        .query_selector_from(container, &format!(".{add_class}"))?
        .is_some()
    {
        return Ok(());
    }
    let markup = control_markup(add_class, &options.add_text);
    for node in dom.parse_fragment(&markup)? {
        dom.append_child(container, node)?;
    }
    Ok(())
}

fn insertion_anchor(dom: &Dom, container: NodeId, options: &FormsetOptions) -> Result<Option<NodeId>> {
    let add_class = options.add_class();
    if !add_class.is_empty() {
        if let Some(anchor) = dom.query_selector_from(container, &format!(".{add_class}"))? {
            return Ok(Some(anchor));
        }
    }
    match &options.add_css_selector {
        Some(selector) => dom.query_selector(selector),
        None => Ok(None),
    }
}

fn control_markup(class_name: &str, text: &str) -> String {
    format!(
        r#"<a class="{}" href="javascript:void(0)">{}</a>"#,
        escape_markup(class_name),
        escape_markup(text)
    )
}

fn escape_markup(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Leading-integer parse in the manner of `parseInt(value)` without a radix:
/// a `0x`/`0X` prefix switches to hexadecimal. Values outside `i64` are `None`.
fn parse_int(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let (radix, digits) = match unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        Some(hex) => (16, hex),
        None => (10, unsigned),
    };
    let end = digits
        .bytes()
        .position(|b| !(b as char).is_digit(radix))
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude = i64::from_str_radix(&digits[..end], radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Whole-string numeric conversion in the manner of `Number(value)`.
///
/// `None` stands for `NaN`. Besides decimal literals this accepts the
/// signed `Infinity` spellings and unsigned `0x`, `0o` and `0b` integers.
fn js_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    match trimmed {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    let prefixed = [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)]
        .into_iter()
        .find_map(|(prefix, radix)| trimmed.strip_prefix(prefix).map(|rest| (rest, radix)));
    if let Some((digits, radix)) = prefixed {
        return u128::from_str_radix(digits, radix)
            .ok()
            .filter(|_| !digits.starts_with(['+', '-']))
            .map(|number| number as f64);
    }
    // Rust also reads `inf` and `NaN`; only exponents may carry letters here.
    if trimmed
        .chars()
        .any(|ch| ch.is_ascii_alphabetic() && !matches!(ch, 'e' | 'E'))
    {
        return None;
    }
    trimmed.parse::<f64>().ok()
}
