//! Dynamic formsets over an in-memory HTML document.
//!
//! A [`Page`] parses markup into an arena [`Dom`], formsets are attached to a
//! container with [`Page::attach_formset`], and simulated clicks on the add and
//! delete controls grow or shrink the set of form groups while the
//! `<prefix>-TOTAL_FORMS` counter follows along.
//!
//! ```
//! use dynamic_formset::{FormsetOptions, Page};
//!
//! let html = r#"
//! <input type="hidden" name="form-TOTAL_FORMS" id="id_form-TOTAL_FORMS" value="1">
//! <div id="items">
//!   <div class="dynamic-form"><input name="form-0-name" id="id_form-0-name"></div>
//!   <a class="add-row" href="javascript:void(0)">add another</a>
//! </div>
//! "#;
//!
//! let mut page = Page::from_html(html)?;
//! page.attach_formset("#items", FormsetOptions::default())?;
//! page.click(".add-row")?;
//! page.assert_value("#id_form-TOTAL_FORMS", "2")?;
//! page.assert_exists("#id_form-1-name")?;
//! # Ok::<(), dynamic_formset::Error>(())
//! ```

mod dom;
mod formset;
mod html;
mod page;
mod selector;

pub use dom::{Dom, NodeId};
pub use formset::{
    AddOutcome, CounterFields, FormCallback, Formset, FormsetCallbacks, FormsetId, FormsetOptions,
    TEMPLATE_PLACEHOLDER,
};
pub use page::Page;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("html parse error: {0}")]
    HtmlParse(String),
    #[error("selector not found: {0}")]
    SelectorNotFound(String),
    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),
    #[error("dom error: {0}")]
    Dom(String),
    #[error("formset counter field missing: {0}")]
    MissingCounter(String),
    #[error("formset counter {field} is not an integer: {value:?}")]
    InvalidCounter { field: String, value: String },
    #[error("formset has no template: {0}")]
    MissingTemplate(String),
    #[error("unknown formset id: {0}")]
    UnknownFormset(usize),
    #[error("invalid formset options: {0}")]
    InvalidOptions(String),
    #[error(
        "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
    )]
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
}
