//! Property-based tests for branch forking.

use std::collections::HashMap;

use proptest::prelude::*;

use super::*;

#[derive(Clone, Debug)]
enum Op {
    Append(Role, String),
    SetResult(String, String),
}

/// What a branch should contain given only the operations applied to it.
#[derive(Clone, Debug, Default)]
struct Model {
    turns: Vec<(Role, String)>,
    results: HashMap<String, String>,
}

impl Model {
    fn apply(&mut self, op: &Op) {
        match op {
            Op::Append(role, content) => self.turns.push((*role, content.clone())),
            Op::SetResult(name, value) => {
                self.results.insert(name.clone(), value.clone());
            }
        }
    }
}

fn apply(branch: &mut Branch, model: &mut Model, ops: &[Op]) {
    for op in ops {
        match op {
            Op::Append(role, content) => branch.append(*role, content.as_str()),
            Op::SetResult(name, value) => {
                branch.set_result(name.as_str(), value.as_str())
            }
        }
        model.apply(op);
    }
}

fn assert_matches(branch: &Branch, model: &Model) -> Result<(), TestCaseError> {
    let turns: Vec<_> = branch
        .turns()
        .iter()
        .map(|turn| (turn.role(), turn.content().to_owned()))
        .collect();
    prop_assert_eq!(&turns, &model.turns);
    for (name, value) in &model.results {
        prop_assert_eq!(branch.result(name), Some(value.as_str()));
    }
    // Names the model never set must be absent.
    for name in ["a", "b", "c", "d"] {
        if !model.results.contains_key(name) {
            prop_assert_eq!(branch.result(name), None);
        }
    }
    Ok(())
}

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::System), Just(Role::User), Just(Role::Assistant)]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (arb_role(), "[a-z ]{0,12}").prop_map(|(role, content)| Op::Append(role, content)),
        ("[a-d]", "[0-9]{1,3}").prop_map(|(name, value)| Op::SetResult(name, value)),
    ]
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(arb_op(), 0..12)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn fork_never_shares_state(
        before in arb_ops(),
        parent_after in arb_ops(),
        child_after in arb_ops(),
    ) {
        let mut parent = Branch::new();
        let mut parent_model = Model::default();
        apply(&mut parent, &mut parent_model, &before);

        let mut child = parent.fork();
        let mut child_model = parent_model.clone();
        assert_matches(&child, &child_model)?;

        apply(&mut parent, &mut parent_model, &parent_after);
        apply(&mut child, &mut child_model, &child_after);

        assert_matches(&parent, &parent_model)?;
        assert_matches(&child, &child_model)?;
    }

    #[test]
    fn nested_forks_are_independent(
        before in arb_ops(),
        middle in arb_ops(),
        after in arb_ops(),
    ) {
        let mut root = Branch::new();
        let mut root_model = Model::default();
        apply(&mut root, &mut root_model, &before);

        let mut child = root.fork();
        let mut child_model = root_model.clone();
        apply(&mut child, &mut child_model, &middle);

        let mut grandchild = child.fork();
        let mut grandchild_model = child_model.clone();
        apply(&mut grandchild, &mut grandchild_model, &after);
        apply(&mut root, &mut root_model, &after);

        assert_matches(&root, &root_model)?;
        assert_matches(&child, &child_model)?;
        assert_matches(&grandchild, &grandchild_model)?;
    }
}
