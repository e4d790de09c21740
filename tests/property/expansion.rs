use std::collections::BTreeSet;
use std::path::Path;

use proptest::prelude::*;

use assetpipe::fs::mock::MockFileSystem;
use assetpipe::patterns::{expand, PatternGroup};

// Relative file paths like "src/a/b.js" under a couple of directories.
fn file_set() -> impl Strategy<Value = BTreeSet<String>> {
    let dir = prop_oneof![Just("src"), Just("src/lib"), Just("src/skip"), Just("vendor")];
    let stem = "[a-e]{1,3}";
    let ext = prop_oneof![Just("js"), Just("css"), Just("md")];
    proptest::collection::btree_set(
        (dir, stem, ext).prop_map(|(d, s, e)| format!("{d}/{s}.{e}")),
        0..24,
    )
}

fn mock_with(files: &BTreeSet<String>) -> MockFileSystem {
    let fs = MockFileSystem::new();
    // Reverse insertion order so directory listings are not pre-sorted.
    for f in files.iter().rev() {
        fs.add_file(format!("./{f}"), f.as_bytes());
    }
    fs
}

proptest! {
    #[test]
    fn expansion_matches_the_group_exactly(files in file_set()) {
        let fs = mock_with(&files);
        let group = PatternGroup::new(["src/**/*.js", "!src/skip/**"]).unwrap();

        let expansion = expand(&fs, Path::new("."), "", &group).unwrap();

        let expected: BTreeSet<&String> = files
            .iter()
            .filter(|f| f.starts_with("src/") && f.ends_with(".js") && !f.starts_with("src/skip/"))
            .collect();
        let got: BTreeSet<&String> = expansion.files.iter().collect();
        prop_assert_eq!(got, expected);

        // No duplicates, and the group agrees with every returned path.
        prop_assert_eq!(expansion.files.len(), expansion.files.iter().collect::<BTreeSet<_>>().len());
        for f in &expansion.files {
            prop_assert!(group.matches(f));
        }
    }

    #[test]
    fn expansion_is_deterministic_and_sorted_per_include(files in file_set()) {
        let fs = mock_with(&files);
        let group = PatternGroup::new(["**/*.css", "**/*.js"]).unwrap();

        let first = expand(&fs, Path::new("."), "", &group).unwrap();
        let second = expand(&fs, Path::new("."), "", &group).unwrap();
        prop_assert_eq!(&first, &second);

        // All css matches come first (first include), each block sorted.
        let split = first.files.iter().position(|f| f.ends_with(".js")).unwrap_or(first.files.len());
        let (css, js) = first.files.split_at(split);
        prop_assert!(css.iter().all(|f| f.ends_with(".css")));
        prop_assert!(js.iter().all(|f| f.ends_with(".js")));
        prop_assert!(css.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(js.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn excluding_everything_leaves_nothing(files in file_set()) {
        let fs = mock_with(&files);
        let group = PatternGroup::new(["**/*", "!**/*"]).unwrap();
        prop_assert!(expand(&fs, Path::new("."), "", &group).unwrap().is_empty());
    }
}
