mod common;

use common::{registry, started, target, variable};
use oxide_actions::{
    ExtensionPolicy, MacroSyntax, Method, PathParams, RouterConfig, RouterError,
};

fn legacy() -> RouterConfig {
    RouterConfig::new()
        .with_macro_syntax(MacroSyntax::Regex)
        .with_extension_policy(ExtensionPolicy::KeepThenStrip)
}

// ==================== Macros ====================

#[test]
fn test_user_macro() {
    let reg = started(
        legacy(),
        &[
            (Some(Method::Get), "/re/user/{id}/macro", "macro"),
            (Some(Method::Get), "/re/user/image/{id}/{fmt}", "image"),
        ],
    );

    assert_eq!(target(&reg, Method::Get, "/re/user/173/macro"), Some("macro"));
    assert_eq!(
        variable(&reg, Method::Get, "/re/user/173/macro.html", "id").as_deref(),
        Some("173")
    );

    let found = reg.lookup(Method::Get, "/re/user/image/33/png").unwrap();
    assert_eq!(*found.handler().target(), "image");
    assert_eq!(found.variables().get("id"), Some("33"));
    assert_eq!(found.variables().get("fmt"), Some("png"));
    assert_eq!(found.variables().len(), 2);

    assert!(reg.lookup(Method::Get, "/re/user/173").is_none());
    assert!(reg.lookup(Method::Get, "/re/user/173/macro/extra").is_none());
}

#[test]
fn test_wildcards() {
    let reg = started(
        legacy(),
        &[
            (Some(Method::Get), "/re/wild{id}cat", "cat"),
            (Some(Method::Post), "/re/wild{id}dog", "dog"),
        ],
    );

    assert_eq!(target(&reg, Method::Get, "/re/wild123cat"), Some("cat"));
    assert_eq!(
        variable(&reg, Method::Get, "/re/wild123cat", "id").as_deref(),
        Some("123")
    );
    assert_eq!(target(&reg, Method::Get, "/re/wild123cat.html"), Some("cat"));
    assert_eq!(target(&reg, Method::Post, "/re/wild123dog"), Some("dog"));

    assert_eq!(target(&reg, Method::Get, "/re/ild123cat"), None);
    assert_eq!(target(&reg, Method::Get, "/re/wild123ca"), None);
    assert_eq!(target(&reg, Method::Get, "/re/wildcat"), None);
    assert_eq!(target(&reg, Method::Get, "/re/wild123dog"), None);

    assert_eq!(target(&reg, Method::Post, "/re/wild123dog.html"), Some("dog"));
    assert_eq!(
        variable(&reg, Method::Post, "/re/wild123dog.html", "id").as_deref(),
        Some("123")
    );
    assert_eq!(target(&reg, Method::Get, "/re/wild123dog.html"), None);
}

#[test]
fn test_regex_macro_precedence() {
    let reg = started(
        legacy(),
        &[
            (Some(Method::Get), "/re/duplo/{id:^[0-9]+}", "numeric"),
            (Some(Method::Get), "/re/duplo/{sid}", "any"),
        ],
    );

    assert_eq!(target(&reg, Method::Get, "/re/duplo/123"), Some("numeric"));
    assert_eq!(
        variable(&reg, Method::Get, "/re/duplo/123", "id").as_deref(),
        Some("123")
    );
    assert_eq!(target(&reg, Method::Get, "/re/duplo/aaa"), Some("any"));
    assert_eq!(
        variable(&reg, Method::Get, "/re/duplo/aaa", "sid").as_deref(),
        Some("aaa")
    );
    // The constraint must match the whole segment.
    assert_eq!(target(&reg, Method::Get, "/re/duplo/12a"), Some("any"));
}

#[test]
fn test_literal_pass_runs_before_stripped_pass() {
    let reg = started(
        legacy(),
        &[
            (Some(Method::Get), "/re/duplo/{id:^[0-9]+}", "numeric"),
            (Some(Method::Get), "/re/duplo/{sid}", "any"),
            (Some(Method::Get), "/re/user/{id}", "user"),
        ],
    );

    // `123.html` fails the constraint but is accepted by `{sid}` before
    // the stripped `123` is tried.
    assert_eq!(target(&reg, Method::Get, "/re/duplo/123.html"), Some("any"));
    assert_eq!(
        variable(&reg, Method::Get, "/re/duplo/123.html", "sid").as_deref(),
        Some("123.html")
    );
    assert_eq!(
        variable(&reg, Method::Get, "/re/user/173.html", "id").as_deref(),
        Some("173.html")
    );
}

#[test]
fn test_registration_order_decides_between_macros() {
    let reg = started(
        legacy(),
        &[
            (Some(Method::Get), "/re/duplo/{sid}", "any"),
            (Some(Method::Get), "/re/duplo/{id:^[0-9]+}", "numeric"),
        ],
    );
    assert_eq!(target(&reg, Method::Get, "/re/duplo/123"), Some("any"));
}

#[test]
fn test_suffixed_literal_under_macro() {
    let reg = started(
        legacy(),
        &[
            (Some(Method::Get), "/{entityName}/dba.delete_multi.do", "zqq"),
            (Some(Method::Get), "/{entityName}/dba.delete", "single"),
        ],
    );

    let found = reg.lookup(Method::Get, "/config/dba.delete_multi.do").unwrap();
    assert_eq!(*found.handler().target(), "zqq");
    assert_eq!(found.variables().get("entityName"), Some("config"));

    // Stripping `.html` leaves `dba.delete_multi`, which has no route.
    assert_eq!(target(&reg, Method::Get, "/config/dba.delete_multi.html"), None);
    assert_eq!(target(&reg, Method::Get, "/config/dba.delete.do"), Some("single"));
}

#[test]
fn test_literal_beats_macro_with_backtracking() {
    let reg = started(
        RouterConfig::default(),
        &[
            (Some(Method::Get), "/users/admin/settings", "admin_settings"),
            (Some(Method::Get), "/users/{id}/profile", "profile"),
        ],
    );

    assert_eq!(
        target(&reg, Method::Get, "/users/admin/settings"),
        Some("admin_settings")
    );
    // `admin` matches the literal first, then falls back to `{id}`.
    assert_eq!(target(&reg, Method::Get, "/users/admin/profile"), Some("profile"));
    assert_eq!(
        variable(&reg, Method::Get, "/users/admin/profile", "id").as_deref(),
        Some("admin")
    );
}

#[test]
fn test_method_agnostic_fallback() {
    let reg = started(
        RouterConfig::default(),
        &[
            (None, "/xxx", "any"),
            (Some(Method::Delete), "/xxx", "delete"),
        ],
    );

    assert_eq!(target(&reg, Method::Delete, "/xxx"), Some("delete"));
    assert_eq!(target(&reg, Method::Get, "/xxx"), Some("any"));
    assert_eq!(target(&reg, Method::Patch, "/xxx"), Some("any"));
}

#[test]
fn test_root_route() {
    let reg = started(RouterConfig::default(), &[(Some(Method::Get), "/", "index")]);
    assert_eq!(target(&reg, Method::Get, "/"), Some("index"));
    assert_eq!(target(&reg, Method::Get, ""), Some("index"));
    assert_eq!(target(&reg, Method::Get, "/index"), None);
}

// ==================== Count and node chain ====================

#[test]
fn test_count() {
    let reg = started(
        legacy(),
        &[
            (Some(Method::Get), "/re/user/{id}/macro", "macro"),
            (Some(Method::Get), "/re/wild{id}cat", "cat"),
            (Some(Method::Post), "/re/wild{id}dog", "dog"),
            (Some(Method::Post), "/re/user/{id}/macro", "macro_post"),
        ],
    );
    assert_eq!(reg.count(), 4);
    // root, re, user, {id}, macro, wild{id}cat, wild{id}dog
    assert_eq!(reg.node_count(), 7);
}

#[test]
fn test_node_chain() {
    let reg = started(
        legacy(),
        &[(Some(Method::Get), "/re/user/{id}/macro", "macro")],
    );
    let found = reg.lookup(Method::Get, "/re/user/173/macro").unwrap();

    let segments: Vec<String> = found
        .chain()
        .filter_map(|node| node.segment().map(ToString::to_string))
        .collect();
    assert_eq!(segments, vec!["macro", "{id}", "user", "re"]);
    assert!(found.chain().last().unwrap().is_root());

    let macros: Vec<&str> = found
        .chain()
        .filter_map(|node| node.path_macro().map(|m| m.name()))
        .collect();
    assert_eq!(macros, vec!["id"]);

    assert_eq!(found.canonical_pattern(), "/re/user/{id}/macro");
    assert_eq!(found.leaf().handler(Some(Method::Get)).map(|d| *d.target()), Some("macro"));
    let id_macro = found.leaf().parent().and_then(|node| node.path_macro()).unwrap();
    assert_eq!(id_macro.constraint(), None);
}

#[test]
fn test_node_chain_exposes_constraints() {
    let reg = started(
        legacy(),
        &[(Some(Method::Get), "/re/duplo/{id:^[0-9]+}", "numeric")],
    );
    let found = reg.lookup(Method::Get, "/re/duplo/123").unwrap();

    let leaf_macro = found.leaf().path_macro().unwrap();
    assert_eq!(leaf_macro.name(), "id");
    assert_eq!(leaf_macro.constraint(), Some("^[0-9]+"));

    let constraints: Vec<Option<&str>> = found
        .chain()
        .filter_map(|node| node.path_macro())
        .map(|m| m.constraint())
        .collect();
    assert_eq!(constraints, vec![Some("^[0-9]+")]);
    assert_eq!(found.canonical_pattern(), "/re/duplo/{id:^[0-9]+}");
}

#[test]
fn test_method_agnostic_route_serves_extension_methods() {
    let mut reg = registry(MacroSyntax::Plain, ExtensionPolicy::Keep);
    reg.register(None, "/any", "fallback", None).unwrap();
    reg.register(Some("MKCOL".parse().unwrap()), "/dav/{dir}", "mkcol", None)
        .unwrap();
    reg.start().unwrap();

    let found = reg.lookup_str("PROPFIND", "/any").unwrap();
    assert_eq!(*found.handler().target(), "fallback");
    assert_eq!(
        reg.lookup_str("report", "/any").map(|m| *m.handler().target()),
        Some("fallback")
    );

    let found = reg.lookup_str("mkcol", "/dav/docs").unwrap();
    assert_eq!(*found.handler().target(), "mkcol");
    assert_eq!(found.variables().get("dir"), Some("docs"));
    assert!(reg.lookup_str("PROPFIND", "/dav/docs").is_none());
    assert!(reg.lookup_str("NOT A METHOD", "/any").is_none());
}

// ==================== Failures ====================

#[test]
fn test_duplicates_and_aliases() {
    let mut reg = registry(MacroSyntax::Plain, ExtensionPolicy::Keep);
    reg.register(Some(Method::Get), "/a/{id}", "first", Some("a"))
        .unwrap();

    let err = reg
        .register(Some(Method::Get), "/a/{id}", "second", None)
        .unwrap_err();
    assert!(matches!(err, RouterError::DuplicateRoute { .. }));
    assert!(err.to_string().contains("/a/{id}"));

    let err = reg
        .register(Some(Method::Get), "/b", "b", Some("a"))
        .unwrap_err();
    assert!(matches!(err, RouterError::DuplicateAlias { .. }));

    reg.start().unwrap();
    assert_eq!(target(&reg, Method::Get, "/a/1"), Some("first"));
    assert_eq!(target(&reg, Method::Get, "/b"), None);
    assert_eq!(reg.count(), 1);
}

#[test]
fn test_malformed_patterns() {
    let mut reg = registry(MacroSyntax::Regex, ExtensionPolicy::Keep);
    for pattern in ["/re/{id", "/re/id}", "/re/{}", "/re/{a}{b}", "/re//x", "/{id}/{id}"] {
        let err = reg
            .register(Some(Method::Get), pattern, "bad", None)
            .unwrap_err();
        assert!(
            matches!(err, RouterError::MalformedPattern { .. }),
            "{pattern}: {err:?}"
        );
    }
    assert_eq!(reg.count(), 0);
    assert_eq!(reg.node_count(), 1);
}

#[test]
fn test_url_for_requires_all_params() {
    let mut reg = registry(MacroSyntax::Plain, ExtensionPolicy::Keep);
    reg.register(Some(Method::Get), "/re/wild{id}cat", "cat", Some("cat"))
        .unwrap();
    reg.start().unwrap();

    let params: PathParams = [("id", "9")].into_iter().collect();
    assert_eq!(reg.url_for("cat", &params).as_deref(), Some("/re/wild9cat"));
    assert_eq!(reg.url_for("dog", &params), None);
}

#[test]
fn test_config_from_toml() {
    let config = RouterConfig::from_toml_str(
        r#"
        macro_syntax = "regex"
        extension_policy = "keep_then_strip"
        "#,
    )
    .unwrap();
    let reg = started(config, &[(Some(Method::Get), "/n/{id:[0-9]+}", "num")]);
    assert_eq!(target(&reg, Method::Get, "/n/42.json"), Some("num"));
    assert_eq!(target(&reg, Method::Get, "/n/x"), None);
}
