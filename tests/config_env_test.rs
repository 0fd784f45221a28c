//! RSTREE_* environment overrides. Kept in a separate test binary: the process
//! environment is shared by all tests of one binary.

use std::env;
use std::fs;

use tempfile::TempDir;

use rstree::util::testing;
use rstree::{Settings, SortOrder};

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

#[test]
fn given_env_vars_when_load_then_override_file_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rstree.toml");
    fs::write(
        &path,
        "children_field_name = \"deps\"\n[sort]\nkey = \"id\"\norder = \"asc\"\n",
    )
    .unwrap();

    env::set_var("RSTREE_CHILDREN_FIELD_NAME", "items");
    env::set_var("RSTREE_SORT__ORDER", "desc");

    let settings = Settings::load(Some(&path));

    env::remove_var("RSTREE_CHILDREN_FIELD_NAME");
    env::remove_var("RSTREE_SORT__ORDER");

    let settings = settings.expect("load settings");
    assert_eq!(settings.children_field_name, "items");
    let sort = settings.sort.expect("sort settings");
    assert_eq!(sort.key, "id");
    assert_eq!(sort.order, SortOrder::Desc);
}
