use mirror_fs::NormalizedPath;
use proptest::prelude::*;

proptest! {
    #[test]
    fn normalization_invariants(s in "\\PC*") {
        let path = NormalizedPath::new(&s);
        let as_str = path.as_str();

        // No backslashes and no empty components survive
        prop_assert!(!as_str.contains('\\'));
        prop_assert!(!as_str.contains("//"));
        prop_assert!(!as_str.ends_with('/') || as_str == "/");

        // Normalizing twice changes nothing
        let again = NormalizedPath::new(as_str);
        prop_assert_eq!(&path, &again);
    }

    #[test]
    fn resolve_then_relative_to_round_trips(
        base in "[a-z]{1,6}(/[a-z]{1,6}){0,3}",
        leaf in "[a-z0-9_.]{0,5}[a-z0-9_]",
    ) {
        let root = std::path::Path::new("/mirror/root");
        let dir = NormalizedPath::new(&base);
        let path = NormalizedPath::new(format!("{base}/{leaf}"));

        let back = NormalizedPath::relative_to(root, &path.resolve(root)).unwrap();
        prop_assert_eq!(&back, &path);
        prop_assert!(path.is_within(&dir));
        prop_assert!(!dir.is_within(&path));
    }

    #[test]
    fn sibling_prefix_is_not_within(name in "[a-z]{1,6}", suffix in "[a-z]{1,3}") {
        let dir = NormalizedPath::new(&name);
        let sibling = NormalizedPath::new(format!("{name}{suffix}/file"));
        prop_assert!(!sibling.is_within(&dir));
    }
}
