use super::ObjectPath;

#[test]
fn legal_paths() {
    assert!(ObjectPath::new("").is_err());
    assert!(ObjectPath::new("a").is_err());
    assert!(ObjectPath::new("/").is_ok());
    assert!(ObjectPath::new("/a").is_ok());
    assert!(ObjectPath::new("//").is_err());
    assert!(ObjectPath::new("/org/example").is_ok());
    assert!(ObjectPath::new("/org/example_1/Obj").is_ok());
    assert!(ObjectPath::new("/org/example/").is_err());
    assert!(ObjectPath::new("/org/ex-ample").is_err());
}

#[test]
fn element_prefix() {
    let root = ObjectPath::new("/").unwrap();
    let foo = ObjectPath::new("/foo").unwrap();
    let foo_bar = ObjectPath::new("/foo/bar").unwrap();
    let foobar = ObjectPath::new("/foobar").unwrap();

    assert!(foo_bar.starts_with(&foo));
    assert!(foo.starts_with(&foo));
    assert!(foo.starts_with(&root));
    assert!(!foobar.starts_with(&foo));
    assert!(!foo.starts_with(&foo_bar));
}

#[test]
fn iterate_elements() {
    let path = ObjectPath::new("/foo/bar/baz").unwrap();
    assert_eq!(path.iter().collect::<Vec<_>>(), ["foo", "bar", "baz"]);
    assert_eq!(path.iter().rev().collect::<Vec<_>>(), ["baz", "bar", "foo"]);
    assert_eq!(ObjectPath::root().iter().count(), 0);
}
