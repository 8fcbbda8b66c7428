use dynamic_formset::{AddOutcome, FormsetId, FormsetOptions, Page};
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::test_runner::{FileFailurePersistence, TestCaseError, TestCaseResult};

const FORMSET_PROPTEST_REGRESSION_FILE: &str =
    "tests/proptest-regressions/formset_property_fuzz_test.txt";
const DEFAULT_FORMSET_PROPTEST_CASES: u32 = 128;

#[derive(Clone, Debug)]
enum FormsetAction {
    ClickAdd,
    AddDirect,
    DeleteNth(usize),
    ClickOutside,
}

fn formset_proptest_cases() -> u32 {
    std::env::var("DYNAMIC_FORMSET_PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_FORMSET_PROPTEST_CASES)
}

fn formset_html(initial: usize, max: Option<usize>) -> String {
    let mut rows = String::new();
    for index in 0..initial {
        rows.push_str(&format!(
            r#"<div class="dynamic-form"><input name="form-{index}-title" id="id_form-{index}-title"></div>"#
        ));
    }
    let max = max.map(|max| max.to_string()).unwrap_or_default();
    format!(
        r#"
        <p id="outside">outside</p>
        <input type="hidden" name="form-TOTAL_FORMS" id="id_form-TOTAL_FORMS" value="{initial}">
        <input type="hidden" name="form-MAX_NUM_FORMS" id="id_form-MAX_NUM_FORMS" value="{max}">
        <div id="items">{rows}<a class="add-row" href="javascript:void(0)">add another</a></div>
        "#
    )
}

fn action_strategy() -> BoxedStrategy<FormsetAction> {
    prop_oneof![
        4 => Just(FormsetAction::ClickAdd),
        2 => Just(FormsetAction::AddDirect),
        4 => (0usize..8).prop_map(FormsetAction::DeleteNth),
        1 => Just(FormsetAction::ClickOutside),
    ]
    .boxed()
}

fn fail(err: dynamic_formset::Error) -> TestCaseError {
    TestCaseError::fail(format!("{err:?}"))
}

fn run_action(page: &mut Page, id: FormsetId, action: &FormsetAction) -> dynamic_formset::Result<()> {
    match action {
        FormsetAction::ClickAdd => page.click("#items > .add-row"),
        FormsetAction::AddDirect => page.add_form(id).map(|_| ()),
        FormsetAction::DeleteNth(nth) => {
            let forms = page.forms(id)?;
            if forms.is_empty() {
                return Ok(());
            }
            let form = forms[nth % forms.len()];
            match page.dom().query_selector_from(form, ".delete-row")? {
                Some(control) => page.click_node(control),
                None => Ok(()),
            }
        }
        FormsetAction::ClickOutside => page.click("#outside"),
    }
}

fn assert_counter_tracks_forms(
    initial: usize,
    max: Option<usize>,
    actions: &[FormsetAction],
) -> TestCaseResult {
    let mut page = Page::from_html(&formset_html(initial, max)).map_err(fail)?;
    let id = page
        .attach_formset("#items", FormsetOptions::default())
        .map_err(fail)?;
    let mut expected = initial as i64;

    for (step, action) in actions.iter().enumerate() {
        let before = expected;
        match action {
            FormsetAction::ClickAdd | FormsetAction::AddDirect => {
                if max.is_none_or(|max| (max as i64) > expected) {
                    expected += 1;
                }
            }
            FormsetAction::DeleteNth(_) => {
                if expected > 0 {
                    expected -= 1;
                }
            }
            FormsetAction::ClickOutside => {}
        }

        run_action(&mut page, id, action).map_err(fail)?;

        let total = page.total_forms(id).map_err(fail)?;
        let forms = page.forms(id).map_err(fail)?.len() as i64;
        prop_assert_eq!(
            total,
            expected,
            "counter after step {} ({:?}) from {}, actions={:?}",
            step,
            action,
            before,
            actions
        );
        prop_assert_eq!(forms, total, "live forms disagree with counter at step {}", step);
        if let Some(max) = max {
            prop_assert!(
                total <= (max as i64).max(initial as i64),
                "counter {} exceeded max {} at step {}",
                total,
                max,
                step
            );
        }
    }

    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: formset_proptest_cases(),
        failure_persistence: Some(Box::new(
            FileFailurePersistence::Direct(FORMSET_PROPTEST_REGRESSION_FILE),
        )),
        .. ProptestConfig::default()
    })]

    #[test]
    fn counter_follows_adds_and_deletes(
        initial in 1usize..=3,
        max in proptest::option::of(1usize..=6),
        actions in vec(action_strategy(), 1..=20),
    ) {
        assert_counter_tracks_forms(initial, max, &actions)?;
    }

    #[test]
    fn n_adds_without_max_grow_by_n(initial in 1usize..=4, adds in 0usize..=12) {
        let mut page = Page::from_html(&formset_html(initial, None)).map_err(fail)?;
        let id = page.attach_formset("#items", FormsetOptions::default()).map_err(fail)?;
        for _ in 0..adds {
            let outcome = page.add_form(id).map_err(fail)?;
            prop_assert!(matches!(outcome, AddOutcome::Added(_)));
        }
        prop_assert_eq!(page.total_forms(id).map_err(fail)?, (initial + adds) as i64);
        prop_assert_eq!(page.forms(id).map_err(fail)?.len(), initial + adds);
    }
}
