//! Render-id fencing: only the most recently requested render is committed.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use canopy_core::{ComponentNode, DisplayNode, Env, Props, Record};
use canopy_testing::prelude::*;
use futures::channel::oneshot;

type GateQueue = Rc<RefCell<VecDeque<oneshot::Receiver<()>>>>;

/// Registers a template that renders state field `x` as text and, when a
/// gate is queued, suspends the render on it. The gate stands in for an
/// async child render of arbitrary duration.
fn counter_template(shell: &TestShell, gates: &GateQueue, hits: &Rc<Cell<usize>>) {
    let gates = Rc::clone(gates);
    let hits = Rc::clone(hits);
    shell.engine.register("counter", move |node, ctx| {
        hits.set(hits.get() + 1);
        if let Some(gate) = gates.borrow_mut().pop_front() {
            ctx.push_pending(Box::pin(async move {
                let _ = gate.await;
                Ok(())
            }));
        }
        let x = node.with_state(|state| state.get("x").and_then(|v| v.as_int()).unwrap_or(0));
        Ok(DisplayNode::element(
            "div",
            vec![DisplayNode::text(format!("{x}"))],
        ))
    });
}

fn mounted_counter(
    shell: &TestShell,
    log: &HookLog,
    gates: &GateQueue,
    hits: &Rc<Cell<usize>>,
) -> ComponentNode {
    counter_template(shell, gates, hits);
    let root = shell.root(
        Probe::new("root", "counter", log).boxed(),
        Props::empty(),
        Env::empty(),
    );
    let result = shell.run(root.mount(&shell.document));
    assert!(matches!(result.borrow().as_ref(), Some(Ok(()))));
    root
}

#[test]
fn later_render_wins_even_when_earlier_completes_after() {
    let shell = TestShell::new();
    let log = HookLog::new();
    let gates: GateQueue = Rc::default();
    let hits = Rc::new(Cell::new(0));
    let root = mounted_counter(&shell, &log, &gates, &hits);
    log.take();

    let (tx_a, rx_a) = oneshot::channel();
    let (tx_b, rx_b) = oneshot::channel();
    gates.borrow_mut().push_back(rx_a);
    gates.borrow_mut().push_back(rx_b);
    let base_render_id = root.render_id();

    let first = shell.spawn(root.update_state(canopy_core::record! { "x" => 1 }));
    let second = shell.spawn(root.update_state(canopy_core::record! { "x" => 2 }));
    shell.settle();
    assert!(first.borrow().is_none() && second.borrow().is_none());
    assert_eq!(hits.get(), 3); // mount + both attempts rendered immediately
    assert_eq!(root.render_id(), base_render_id + 2);

    // the later-requested render resolves first and commits
    tx_b.send(()).unwrap();
    shell.settle();
    assert!(matches!(second.borrow().as_ref(), Some(Ok(()))));
    assert_eq!(shell.document.outline(), "document(div(text:2))");

    // the earlier render resolves afterwards and is discarded silently
    tx_a.send(()).unwrap();
    shell.settle();
    assert!(matches!(first.borrow().as_ref(), Some(Ok(()))));
    assert_eq!(shell.document.outline(), "document(div(text:2))");
    assert_eq!(log.count_of("root:patched"), 1);
}

#[test]
fn stale_render_resolving_first_never_clobbers_the_newer_one() {
    let shell = TestShell::new();
    let log = HookLog::new();
    let gates: GateQueue = Rc::default();
    let hits = Rc::new(Cell::new(0));
    let root = mounted_counter(&shell, &log, &gates, &hits);
    log.take();

    let (tx_a, rx_a) = oneshot::channel();
    let (tx_b, rx_b) = oneshot::channel();
    gates.borrow_mut().push_back(rx_a);
    gates.borrow_mut().push_back(rx_b);

    let first = shell.spawn(root.update_state(canopy_core::record! { "x" => 1 }));
    let second = shell.spawn(root.update_state(canopy_core::record! { "x" => 2 }));
    shell.settle();

    // the superseded render completes first: discarded, display untouched
    tx_a.send(()).unwrap();
    shell.settle();
    assert!(matches!(first.borrow().as_ref(), Some(Ok(()))));
    assert_eq!(shell.document.outline(), "document(div(text:0))");
    assert_eq!(log.count_of("root:patched"), 0);

    tx_b.send(()).unwrap();
    shell.settle();
    assert!(matches!(second.borrow().as_ref(), Some(Ok(()))));
    assert_eq!(shell.document.outline(), "document(div(text:2))");
    assert_eq!(log.count_of("root:patched"), 1);
}

#[test]
fn empty_state_update_is_a_complete_no_op() {
    let shell = TestShell::new();
    let log = HookLog::new();
    let gates: GateQueue = Rc::default();
    let hits = Rc::new(Cell::new(0));
    let root = mounted_counter(&shell, &log, &gates, &hits);
    log.take();
    let render_id = root.render_id();
    let renders = hits.get();

    let result = shell.run(root.update_state(Record::new()));
    assert!(matches!(result.borrow().as_ref(), Some(Ok(()))));
    assert_eq!(root.render_id(), render_id);
    assert_eq!(hits.get(), renders);
    assert_eq!(log.count_of("root:patched"), 0);
}

#[test]
fn render_on_destroyed_component_is_a_guarded_no_op() {
    let shell = TestShell::new();
    let log = HookLog::new();
    let gates: GateQueue = Rc::default();
    let hits = Rc::new(Cell::new(0));
    let root = mounted_counter(&shell, &log, &gates, &hits);

    root.destroy().unwrap();
    let renders = hits.get();
    let render_id = root.render_id();

    let update = shell.run(root.update_state(canopy_core::record! { "x" => 9 }));
    assert!(matches!(update.borrow().as_ref(), Some(Ok(()))));
    let rerender = shell.run(root.render(false));
    assert!(matches!(rerender.borrow().as_ref(), Some(Ok(()))));
    let remount = shell.run(root.mount(&shell.document));
    assert!(matches!(remount.borrow().as_ref(), Some(Ok(()))));

    assert_eq!(hits.get(), renders);
    assert_eq!(root.render_id(), render_id);
    assert!(shell.document.children().is_empty());
}
