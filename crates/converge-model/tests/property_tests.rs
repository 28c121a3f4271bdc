use converge_model::{
    Mapping, Path, PathIndex, PathPattern, Scalar, Segment, ValueTree, compute_difference,
};
use proptest::prelude::*;

fn scalar() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        "[a-z0-9]{0,4}".prop_map(Scalar::String),
        (-100i64..100).prop_map(Scalar::from),
        any::<bool>().prop_map(Scalar::Bool),
        Just(Scalar::Undefined),
    ]
}

/// Trees without empty containers, so every container has at least one leaf
fn tree() -> impl Strategy<Value = ValueTree> {
    scalar().prop_map(ValueTree::Scalar).prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(ValueTree::Sequence),
            prop::collection::btree_map("[a-e]{1,2}", inner, 1..4)
                .prop_map(|map| ValueTree::Mapping(map.into_iter().collect::<Mapping>())),
        ]
    })
}

fn segment() -> impl Strategy<Value = Segment> {
    prop_oneof![
        "[a-z/*\\[]{0,3}".prop_map(Segment::Key),
        (0usize..5).prop_map(Segment::Index),
    ]
}

fn path() -> impl Strategy<Value = Path> {
    prop::collection::vec(segment(), 0..5).prop_map(Path::from_segments)
}

proptest! {
    #[test]
    fn index_has_one_entry_per_leaf(t in tree()) {
        let index = PathIndex::from_tree(&t);
        prop_assert_eq!(index.len(), t.leaves().count());
        for (path, leaf) in t.leaves() {
            prop_assert_eq!(index.get(&path), Some(leaf));
        }
    }

    #[test]
    fn index_roundtrips_to_tree(t in tree()) {
        let rebuilt = PathIndex::from_tree(&t).to_tree();
        prop_assert_eq!(rebuilt, t);
    }

    #[test]
    fn diff_against_self_is_empty(t in tree()) {
        let index = PathIndex::from_tree(&t);
        prop_assert!(compute_difference(&index, &index).is_empty());
    }

    #[test]
    fn applying_diffs_converges(desired in tree(), current in tree()) {
        let desired = PathIndex::from_tree(&desired);
        let mut current = PathIndex::from_tree(&current);
        for diff in compute_difference(&desired, &current) {
            current.apply(&diff);
        }
        prop_assert_eq!(current, desired);
    }

    #[test]
    fn path_display_roundtrips(p in path()) {
        let parsed: Path = p.to_string().parse().unwrap();
        prop_assert_eq!(parsed, p);
    }

    #[test]
    fn literal_pattern_matches_only_itself(p in path(), extra in segment()) {
        let pattern = PathPattern::compile(&p.to_string()).unwrap();
        prop_assert!(pattern.is_literal());
        prop_assert!(pattern.matches(&p));
        prop_assert!(!pattern.matches(&p.child(extra)));
        if let Some(parent) = p.parent() {
            prop_assert!(!pattern.matches(&parent));
        }
    }

    #[test]
    fn any_depth_matches_any_middle(prefix in path(), middle in path(), suffix in path()) {
        let pattern_text = match (prefix.is_empty(), suffix.is_empty()) {
            (true, true) => "**".to_string(),
            (true, false) => format!("**/{}", suffix),
            (false, true) => format!("{}/**", prefix),
            (false, false) => format!("{}/**/{}", prefix, suffix),
        };
        let pattern = PathPattern::compile(&pattern_text).unwrap();

        let mut segments = prefix.segments().to_vec();
        segments.extend_from_slice(middle.segments());
        segments.extend_from_slice(suffix.segments());
        prop_assert!(pattern.matches(&Path::from_segments(segments)));
    }
}
