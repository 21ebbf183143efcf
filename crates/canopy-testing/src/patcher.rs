//! Replace-everything patcher.
//!
//! Rebuilds the target element's children from the new display node on every
//! patch instead of diffing. Anchored child elements keep their identity:
//! they are resolved through the anchor lookup, which hands back the child
//! component's existing live element. Good enough to exercise the
//! orchestration contract; not a diff engine.

use canopy_core::{
    AnchorLookup, DisplayKind, DisplayNode, LiveElement, PatchError, PatchTarget, Patcher,
};

#[derive(Debug, Default)]
pub struct ReplacePatcher;

fn realize(node: &DisplayNode, anchors: &dyn AnchorLookup) -> Result<LiveElement, PatchError> {
    match &node.kind {
        DisplayKind::Element { tag, children, .. } => {
            let element = LiveElement::detached(tag.clone());
            for child in children {
                let child = realize(child, anchors)?;
                element.append_child(&child);
            }
            Ok(element)
        }
        DisplayKind::Text(content) => Ok(LiveElement::detached(format!("text:{content}"))),
        DisplayKind::Empty => Ok(LiveElement::detached("empty")),
        DisplayKind::Anchor(id) => anchors.resolve(*id),
    }
}

fn apply(
    element: &LiveElement,
    next: &DisplayNode,
    anchors: &dyn AnchorLookup,
) -> Result<(), PatchError> {
    match &next.kind {
        DisplayKind::Element { tag, children, .. } => {
            element.set_label(tag.clone());
            element.clear_children();
            for child in children {
                let child = realize(child, anchors)?;
                element.append_child(&child);
            }
            Ok(())
        }
        DisplayKind::Text(content) => {
            element.set_label(format!("text:{content}"));
            element.clear_children();
            Ok(())
        }
        DisplayKind::Empty => {
            element.set_label("empty");
            element.clear_children();
            Ok(())
        }
        DisplayKind::Anchor(_) => Err(PatchError::TargetMismatch {
            expected: "element, text, or empty root",
        }),
    }
}

impl Patcher for ReplacePatcher {
    fn patch(
        &self,
        target: PatchTarget<'_>,
        next: &DisplayNode,
        anchors: &dyn AnchorLookup,
    ) -> Result<LiveElement, PatchError> {
        let element = match target {
            PatchTarget::Fresh(element) => element.clone(),
            PatchTarget::Committed { element, .. } => element.clone(),
        };
        apply(&element, next, anchors)?;
        Ok(element)
    }
}
