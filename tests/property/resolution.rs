use proptest::prelude::*;

use assetpipe::errors::AssetpipeError;
use assetpipe::template::{resolve_tree, ConfigNode};

fn resolve(doc: toml::Table) -> Result<assetpipe::template::ConfigTree, AssetpipeError> {
    resolve_tree(&ConfigNode::from_toml(toml::Value::Table(doc)))
}

// A chain v0 <- v1 <- ... <- vN where each link appends one segment.
fn chain_doc(base: &str, segments: &[String]) -> toml::Table {
    let mut doc = toml::Table::new();
    doc.insert("v0".into(), base.into());
    for (i, seg) in segments.iter().enumerate() {
        doc.insert(
            format!("v{}", i + 1),
            format!("<%= v{i} %>/{seg}").into(),
        );
    }
    doc
}

proptest! {
    #[test]
    fn chains_resolve_to_the_concatenation(
        base in "[a-z]{1,8}",
        segments in proptest::collection::vec("[a-z0-9_]{1,6}", 0..12),
    ) {
        let tree = resolve(chain_doc(&base, &segments)).unwrap();
        let mut expected = base.clone();
        for seg in &segments {
            expected.push('/');
            expected.push_str(seg);
        }
        let last = format!("v{}", segments.len());
        prop_assert_eq!(tree.get_str(&last), Some(expected.as_str()));
    }

    #[test]
    fn resolution_is_idempotent(
        base in "[a-z]{1,8}",
        segments in proptest::collection::vec("[a-z]{1,4}", 0..8),
    ) {
        let first = resolve(chain_doc(&base, &segments)).unwrap();
        let second = resolve_tree(first.root()).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn closing_a_chain_into_a_loop_is_always_a_cycle(len in 1usize..10) {
        let mut doc = toml::Table::new();
        for i in 0..len {
            let next = (i + 1) % len;
            doc.insert(format!("k{i}"), format!("x<%= k{next} %>").into());
        }
        match resolve(doc) {
            Err(AssetpipeError::CyclicReference { chain }) => {
                prop_assert_eq!(chain.first(), chain.last());
                prop_assert_eq!(chain.len(), len + 1);
            }
            other => prop_assert!(false, "expected a cycle, got {:?}", other),
        }
    }
}
