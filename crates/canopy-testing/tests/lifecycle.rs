use std::rc::Rc;

use canopy_core::{
    record, ComponentNode, DisplayKind, DisplayNode, Env, LifecycleError, LiveElement, NodeRef,
    Props,
};
use canopy_testing::prelude::*;
use futures::channel::oneshot;

fn parent_child_tree(shell: &TestShell, log: &HookLog) -> ComponentNode {
    let engine = Rc::clone(&shell.engine);
    let child_log = log.clone();
    shell.engine.register("parent", move |node, ctx| {
        let child = engine.child(node, "main", Props::empty(), ctx, || {
            Probe::new("child", "leaf", &child_log).boxed()
        });
        Ok(DisplayNode::element("div", vec![child]))
    });
    shell
        .engine
        .register("leaf", |_, _| Ok(DisplayNode::text("leaf")));
    shell.root(
        Probe::new("root", "parent", log).boxed(),
        Props::empty(),
        Env::empty(),
    )
}

#[test]
fn mount_runs_start_then_fires_mounted_top_down() {
    let shell = TestShell::new();
    let log = HookLog::new();
    let root = parent_child_tree(&shell, &log);

    let result = shell.run(root.mount(&shell.document));
    assert!(matches!(result.borrow().as_ref(), Some(Ok(()))));
    assert_eq!(
        log.take(),
        vec![
            "root:willStart",
            "child:willStart",
            "root:mounted",
            "child:mounted"
        ]
    );
    assert!(root.is_started() && root.is_mounted());
    assert_eq!(shell.document.outline(), "document(div(text:leaf))");
}

#[test]
fn mounting_into_disconnected_target_defers_mounted_hooks() {
    let shell = TestShell::new();
    let log = HookLog::new();
    let root = parent_child_tree(&shell, &log);
    let target = LiveElement::detached("target");

    let result = shell.run(root.mount(&target));
    assert!(matches!(result.borrow().as_ref(), Some(Ok(()))));
    // attached but nothing mounted anywhere in the subtree
    assert!(!root.is_mounted());
    assert!(!log.entries().iter().any(|e| e.ends_with(":mounted")));

    // attach the target to the document, then re-run mount propagation:
    // mounted fires exactly once per component, top-down
    shell.document.append_child(&target);
    log.take();
    root.propagate_mounted().unwrap();
    assert_eq!(log.take(), vec!["root:mounted", "child:mounted"]);

    // already-mounted nodes are skipped on a repeat pass
    root.propagate_mounted().unwrap();
    assert!(log.take().is_empty());
}

#[test]
fn detach_fires_will_unmount_top_down_and_allows_remount() {
    let shell = TestShell::new();
    let log = HookLog::new();
    let root = parent_child_tree(&shell, &log);
    shell.run(root.mount(&shell.document));
    log.take();

    root.detach().unwrap();
    assert_eq!(log.take(), vec!["root:willUnmount", "child:willUnmount"]);
    assert!(!root.is_mounted());
    assert!(shell.document.children().is_empty());

    let result = shell.run(root.mount(&shell.document));
    assert!(matches!(result.borrow().as_ref(), Some(Ok(()))));
    assert_eq!(log.take(), vec!["root:mounted", "child:mounted"]);
    assert_eq!(shell.document.outline(), "document(div(text:leaf))");
}

fn register_counter(shell: &TestShell) {
    shell.engine.register("counter", |node, _| {
        let x = node.with_state(|state| state.get("x").and_then(|v| v.as_int()).unwrap_or(0));
        Ok(DisplayNode::text(format!("{x}")))
    });
}

#[test]
fn updates_while_detached_patch_the_element_before_remount() {
    let shell = TestShell::new();
    let log = HookLog::new();
    register_counter(&shell);
    let root = shell.root(
        Probe::new("root", "counter", &log).boxed(),
        Props::empty(),
        Env::empty(),
    );
    shell.run(root.mount(&shell.document));
    assert_eq!(shell.document.outline(), "document(text:0)");

    root.detach().unwrap();
    let result = shell.run(root.update_state(record! { "x" => 5 }));
    assert!(matches!(result.borrow().as_ref(), Some(Ok(()))));
    log.take();

    shell.run(root.mount(&shell.document));
    assert_eq!(shell.document.outline(), "document(text:5)");
    assert_eq!(log.take(), vec!["root:mounted"]);
}

#[test]
fn updates_before_connection_patch_the_deferred_element() {
    let shell = TestShell::new();
    let log = HookLog::new();
    register_counter(&shell);
    let root = shell.root(
        Probe::new("root", "counter", &log).boxed(),
        Props::empty(),
        Env::empty(),
    );
    let target = LiveElement::detached("target");
    shell.run(root.mount(&target));
    assert!(!root.is_mounted());

    let result = shell.run(root.update_state(record! { "x" => 9 }));
    assert!(matches!(result.borrow().as_ref(), Some(Ok(()))));

    shell.document.append_child(&target);
    root.propagate_mounted().unwrap();
    assert_eq!(shell.document.outline(), "document(target(text:9))");
}

#[test]
fn destroy_reaches_descendants_before_self_and_is_idempotent() {
    let shell = TestShell::new();
    let log = HookLog::new();
    let engine = Rc::clone(&shell.engine);
    let leaf_log = log.clone();
    shell.engine.register("pair", move |node, ctx| {
        let a = engine.child(node, "a", Props::empty(), ctx, || {
            Probe::new("a", "leaf", &leaf_log).boxed()
        });
        let b = engine.child(node, "b", Props::empty(), ctx, || {
            Probe::new("b", "leaf", &leaf_log).boxed()
        });
        Ok(DisplayNode::element("div", vec![a, b]))
    });
    shell
        .engine
        .register("leaf", |_, _| Ok(DisplayNode::text("leaf")));
    let root = shell.root(
        Probe::new("root", "pair", &log).boxed(),
        Props::empty(),
        Env::empty(),
    );
    shell.run(root.mount(&shell.document));
    let children = root.children();
    assert_eq!(children.len(), 2);
    log.take();

    root.destroy().unwrap();
    assert_eq!(
        log.take(),
        vec![
            "root:willUnmount",
            "a:willUnmount",
            "b:willUnmount",
            "a:destroyed",
            "b:destroyed",
            "root:destroyed"
        ]
    );
    assert!(root.is_destroyed());
    assert!(children.iter().all(|c| c.is_destroyed()));
    assert!(root.children().is_empty());
    // no live elements from the subtree remain attached
    assert!(shell.document.children().is_empty());

    // destroying again is a no-op
    root.destroy().unwrap();
    assert!(log.take().is_empty());
}

#[test]
fn destroyed_while_starting_produces_placeholder_and_no_hooks() {
    let shell = TestShell::new();
    let log = HookLog::new();
    shell
        .engine
        .register("leaf", |_, _| Ok(DisplayNode::text("leaf")));
    let (tx, rx) = oneshot::channel();
    let root = shell.root(
        Probe::new("root", "leaf", &log).gated(rx).boxed(),
        Props::empty(),
        Env::empty(),
    );

    let result = shell.run(root.mount(&shell.document));
    assert!(result.borrow().is_none()); // blocked in will_start

    root.destroy().unwrap();
    tx.send(()).unwrap();
    shell.settle();

    assert!(matches!(result.borrow().as_ref(), Some(Ok(()))));
    assert_eq!(log.take(), vec!["root:willStart", "root:destroyed"]);
    assert!(!root.is_started());
    assert!(shell.document.children().is_empty());
    let placeholder = root.committed_vnode().expect("placeholder node");
    assert!(matches!(placeholder.kind, DisplayKind::Empty));
}

#[test]
fn will_start_failure_propagates_to_the_mount_caller() {
    let shell = TestShell::new();
    let log = HookLog::new();
    shell
        .engine
        .register("leaf", |_, _| Ok(DisplayNode::text("leaf")));
    let (tx, rx) = oneshot::channel::<()>();
    let root = shell.root(
        Probe::new("root", "leaf", &log).gated(rx).boxed(),
        Props::empty(),
        Env::empty(),
    );

    let result = shell.run(root.mount(&shell.document));
    drop(tx); // reject the pre-render hook
    shell.settle();

    match result.borrow().as_ref() {
        Some(Err(LifecycleError::Hook(err))) => assert_eq!(err.hook(), "willStart"),
        other => panic!("expected hook failure, got {other:?}"),
    }
    // left part-way through the transition; caller treats it as unusable
    assert!(!root.is_started());
    assert!(!root.is_mounted());
}

#[test]
fn refs_are_non_owning_lookups() {
    let shell = TestShell::new();
    let log = HookLog::new();
    let root = parent_child_tree(&shell, &log);
    shell.run(root.mount(&shell.document));
    let child = root.children().into_iter().next().unwrap();

    root.set_ref("main", NodeRef::Component(child.downgrade()));
    root.set_ref(
        "host",
        NodeRef::Element(root.live_element().unwrap().downgrade()),
    );
    let looked_up = root.get_ref("main").unwrap().component().unwrap();
    assert!(looked_up.ptr_eq(&child));
    assert!(root.get_ref("host").unwrap().element().is_some());
    // a component ref also resolves to the child's live element
    assert!(root.get_ref("main").unwrap().element().is_some());
    drop(looked_up);

    // destroying the child leaves the ref dangling, not keeping it alive
    child.destroy().unwrap();
    drop(child);
    assert!(root.get_ref("main").unwrap().component().is_none());
}

#[test]
fn attach_child_mounts_manually_managed_children() {
    let shell = TestShell::new();
    let log = HookLog::new();
    shell
        .engine
        .register("box", |_, _| Ok(DisplayNode::element("div", vec![])));
    shell
        .engine
        .register("leaf", |_, _| Ok(DisplayNode::text("leaf")));
    let root = shell.root(
        Probe::new("root", "box", &log).boxed(),
        Props::empty(),
        Env::empty(),
    );
    shell.run(root.mount(&shell.document));

    let child = ComponentNode::child_of(&root, Probe::new("child", "leaf", &log).boxed(), Props::empty());
    let staging = LiveElement::detached("staging");
    shell.run(child.mount(&staging));
    assert!(!child.is_mounted());
    log.take();

    let host = root.live_element().expect("root element");
    root.attach_child(&child, &host).unwrap();
    assert!(child.is_mounted());
    assert_eq!(log.take(), vec!["child:mounted"]);
    assert_eq!(shell.document.outline(), "document(div(text:leaf))");
}

#[test]
fn attach_child_adopts_parentless_components() {
    let shell = TestShell::new();
    let log = HookLog::new();
    shell
        .engine
        .register("box", |_, _| Ok(DisplayNode::element("div", vec![])));
    shell
        .engine
        .register("leaf", |_, _| Ok(DisplayNode::text("leaf")));
    let root = shell.root(
        Probe::new("root", "box", &log).boxed(),
        Props::empty(),
        Env::empty(),
    );
    shell.run(root.mount(&shell.document));

    // built standalone, outside any parent's instantiation path
    let orphan = shell.root(
        Probe::new("orphan", "leaf", &log).boxed(),
        Props::empty(),
        Env::empty(),
    );
    let staging = LiveElement::detached("staging");
    shell.run(orphan.mount(&staging));
    assert!(orphan.parent().is_none());
    log.take();

    let host = root.live_element().expect("root element");
    root.attach_child(&orphan, &host).unwrap();
    assert!(orphan.parent().unwrap().ptr_eq(&root));
    assert!(orphan.is_mounted());
    assert_eq!(log.take(), vec!["orphan:mounted"]);

    // adoption puts the orphan on the destruction path of its new parent
    root.destroy().unwrap();
    assert!(orphan.is_destroyed());
    let entries = log.take();
    assert!(entries.contains(&"orphan:willUnmount".to_string()));
    assert!(entries.contains(&"orphan:destroyed".to_string()));
}
