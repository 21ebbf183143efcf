//! Display-tree nodes: immutable descriptions of UI elements.
//!
//! A [`DisplayNode`] is what the template engine produces and what the
//! patcher diffs against the previous description. The optional key is the
//! owning component's id; the render pipeline tags it onto the produced root
//! so that an ancestor's patch can locate this subtree's slot even after the
//! child has independently re-rendered itself. [`DisplayKind::Anchor`] marks
//! the slot where a child component's own committed tree is spliced in.

use std::rc::Rc;

use crate::{ComponentId, HandlerKey, Record};

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayNode {
    pub key: Option<ComponentId>,
    pub kind: DisplayKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayKind {
    Element {
        tag: Rc<str>,
        attrs: Record,
        handlers: Vec<HandlerKey>,
        children: Vec<DisplayNode>,
    },
    Text(Rc<str>),
    /// Slot filled by the live element of the referenced child component.
    Anchor(ComponentId),
    /// Placeholder produced when a component is destroyed while starting.
    Empty,
}

impl DisplayNode {
    pub fn element(tag: impl Into<Rc<str>>, children: Vec<DisplayNode>) -> Self {
        Self {
            key: None,
            kind: DisplayKind::Element {
                tag: tag.into(),
                attrs: Record::new(),
                handlers: Vec::new(),
                children,
            },
        }
    }

    pub fn text(content: impl Into<Rc<str>>) -> Self {
        Self {
            key: None,
            kind: DisplayKind::Text(content.into()),
        }
    }

    pub fn anchor(component: ComponentId) -> Self {
        Self {
            key: None,
            kind: DisplayKind::Anchor(component),
        }
    }

    pub fn empty() -> Self {
        Self {
            key: None,
            kind: DisplayKind::Empty,
        }
    }

    pub fn with_attrs(mut self, attrs: Record) -> Self {
        if let DisplayKind::Element { attrs: slot, .. } = &mut self.kind {
            *slot = attrs;
        }
        self
    }

    pub fn with_handlers(mut self, handlers: Vec<HandlerKey>) -> Self {
        if let DisplayKind::Element { handlers: slot, .. } = &mut self.kind {
            *slot = handlers;
        }
        self
    }

    /// Tags this node with its owning component's reconciliation key.
    pub fn keyed(mut self, id: ComponentId) -> Self {
        self.key = Some(id);
        self
    }
}
