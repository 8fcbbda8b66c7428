use dynamic_formset::Page;
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::test_runner::TestCaseResult;

fn tag_strategy() -> BoxedStrategy<&'static str> {
    prop_oneof![
        Just("div"),
        Just("p"),
        Just("span"),
        Just("table"),
        Just("tr"),
        Just("td"),
        Just("fieldset"),
        Just("textarea"),
        Just("script"),
    ]
    .boxed()
}

fn attr_strategy() -> BoxedStrategy<String> {
    prop_oneof![
        Just("class=\"dynamic-form\"".to_string()),
        Just("class='add-row'".to_string()),
        Just("id=items".to_string()),
        Just("disabled".to_string()),
        Just("name=\"form-0-x\" id=\"id_form-0-x\"".to_string()),
        Just("data-x=\"a &amp; b\"".to_string()),
        Just("title=\"&#x3c;&lt;&#60;\"".to_string()),
        Just("value=\"\"".to_string()),
    ]
    .boxed()
}

fn text_strategy() -> BoxedStrategy<String> {
    prop_oneof![
        Just("plain".to_string()),
        Just("a &amp; b".to_string()),
        Just("&unknown;".to_string()),
        Just("&#xZZ;".to_string()),
        Just("<".to_string()),
        Just(" > ".to_string()),
        Just("</input>".to_string()),
        Just("</div>".to_string()),
        Just("<!-- note -->".to_string()),
        Just("<br>".to_string()),
        Just("<input name='form-__prefix__-y'>".to_string()),
        Just("日本語".to_string()),
    ]
    .boxed()
}

fn markup_strategy() -> BoxedStrategy<String> {
    let leaf = text_strategy();
    leaf.prop_recursive(4, 64, 6, |inner| {
        (tag_strategy(), vec(attr_strategy(), 0..=3), vec(inner, 0..=4))
            .prop_map(|(tag, attrs, children)| {
                format!("<{tag} {}>{}</{tag}>", attrs.join(" "), children.concat())
            })
    })
    .boxed()
}

fn selector_strategy() -> BoxedStrategy<String> {
    prop_oneof![
        Just(".dynamic-form".to_string()),
        Just("#items > *".to_string()),
        Just("div + p".to_string()),
        Just("td ~ td".to_string()),
        Just("[name^='form-']".to_string()),
        Just("span:not(.add-row)".to_string()),
        Just("tr:first-child, tr:last-child".to_string()),
        Just("div[".to_string()),
        Just(">".to_string()),
        Just(":hover".to_string()),
    ]
    .boxed()
}

fn assert_parse_and_query_never_panic(markup: &str, selectors: &[String]) -> TestCaseResult {
    let outcome = std::panic::catch_unwind(|| -> dynamic_formset::Result<()> {
        let page = Page::from_html(markup)?;
        for selector in selectors {
            let _ = page.count(selector);
        }
        let _ = page.dump_dom("*");
        Ok(())
    });
    prop_assert!(
        outcome.is_ok(),
        "parsing or querying panicked for markup:\n{markup}\nselectors: {selectors:?}"
    );
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 192,
        .. ProptestConfig::default()
    })]

    #[test]
    fn parser_and_selectors_handle_arbitrary_markup(
        markup in markup_strategy(),
        selectors in vec(selector_strategy(), 1..=4),
    ) {
        assert_parse_and_query_never_panic(&markup, &selectors)?;
    }
}
