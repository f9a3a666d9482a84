//! Integration tests for the context handle API: overlay, lineage and unwinding

use contextdata::{ContextHandle, CONTEXT_ID_KEY, PARENT_CONTEXT_ID_KEY, ROOT_CONTEXT_ID_KEY};
use serde_json::{json, Value};

fn all_scopes() -> Vec<ContextHandle> {
    vec![
        ContextHandle::shared(),
        ContextHandle::worker(),
        ContextHandle::task(),
    ]
}

#[test]
fn test_overlay_and_restore_on_every_scope() {
    for ctx in all_scopes() {
        let before = ctx.get_current_context();
        {
            let _outer = ctx.start_context([("a", 1)]);
            {
                let _inner = ctx.start_context([("b", 2)]);
                let current = ctx.get_current_context();
                let user_keys: Vec<&String> = current
                    .keys()
                    .filter(|k| !contextdata::frame::is_reserved_key(k))
                    .collect();
                assert_eq!(user_keys, vec!["a", "b"], "scope {}", ctx.name());
                assert_eq!(current["a"], json!(1));
                assert_eq!(current["b"], json!(2));
                for key in [CONTEXT_ID_KEY, PARENT_CONTEXT_ID_KEY, ROOT_CONTEXT_ID_KEY] {
                    assert!(current.contains_key(key), "missing {}", key);
                }
            }
            assert_eq!(ctx.get("b"), None);
            assert_eq!(ctx.get_or("b", "default"), json!("default"));
        }
        assert_eq!(ctx.get_current_context(), before);
    }
}

#[test]
fn test_lineage_of_three_nested_pushes() {
    let ctx = ContextHandle::worker();

    let first = ctx.start_context([("depth", 1)]);
    let c1 = first.context_id().unwrap();
    let second = ctx.start_context([("depth", 2)]);
    let c2 = second.context_id().unwrap();
    let third = ctx.start_context([("depth", 3)]);
    let c3 = third.context_id().unwrap();

    assert_eq!(ctx.parent_context_id().as_deref(), Some(c2.as_str()));
    assert_eq!(ctx.root_context_id().as_deref(), Some(c1.as_str()));
    drop(third);
    assert_eq!(ctx.parent_context_id().as_deref(), Some(c1.as_str()));
    assert_eq!(ctx.root_context_id().as_deref(), Some(c1.as_str()));
    drop(second);
    assert_eq!(ctx.parent_context_id(), None);
    assert_eq!(ctx.get(PARENT_CONTEXT_ID_KEY), Some(Value::Null));
    assert_eq!(ctx.root_context_id().as_deref(), Some(c1.as_str()));

    assert_ne!(c1, c2);
    assert_ne!(c2, c3);
    assert_ne!(c1, c3);
    drop(first);
    assert!(ctx.context_id().is_none());
}

#[test]
fn test_with_context_returns_closure_value() {
    let ctx = ContextHandle::shared();
    let seen = ctx.with_context([("user", "alice")], |ctx| ctx.get("user"));
    assert_eq!(seen, Some(json!("alice")));
    assert_eq!(ctx.get("user"), None);
}

#[test]
fn test_values_of_any_json_shape() {
    let ctx = ContextHandle::shared();
    let _guard = ctx.start_context([
        ("tags", json!(["a", "b"])),
        ("limits", json!({ "max": 10 })),
        ("ratio", json!(0.5)),
        ("flag", json!(null)),
    ]);
    assert_eq!(ctx.get("tags"), Some(json!(["a", "b"])));
    assert_eq!(ctx.get("limits").unwrap()["max"], json!(10));
    assert_eq!(ctx.get("flag"), Some(Value::Null));
}

#[test]
fn test_caller_cannot_forge_lineage() {
    let ctx = ContextHandle::shared();
    let outer = ctx.start_context([("a", 1)]);
    let outer_id = outer.context_id().unwrap();

    let _inner = ctx.start_context([
        (ROOT_CONTEXT_ID_KEY, json!("forged")),
        ("b", json!(2)),
    ]);
    assert_eq!(ctx.root_context_id().as_deref(), Some(outer_id.as_str()));
    assert_eq!(ctx.get("b"), Some(json!(2)));
}

#[test]
fn test_error_inside_nested_block_unwinds() {
    fn load(ctx: &ContextHandle) -> anyhow::Result<()> {
        let _guard = ctx.start_context([("stage", "load")]);
        anyhow::bail!("load failed")
    }

    let ctx = ContextHandle::shared();
    let _outer = ctx.start_context([("job", 7)]);
    assert!(load(&ctx).is_err());
    assert_eq!(ctx.depth(), 1);
    assert_eq!(ctx.get("stage"), None);
    assert_eq!(ctx.get("job"), Some(json!(7)));
}
