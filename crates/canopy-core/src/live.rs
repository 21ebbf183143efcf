//! Live elements: the attached, mutable tree the patcher mutates.
//!
//! A [`LiveElement`] is a cheap handle (`Rc` inner, weak parent link). A
//! component counts as mounted only when its live element is a descendant of
//! a document root (see [`LiveElement::is_connected`]), not merely
//! constructed. Once attached, an element is mutated only by the patcher,
//! invoked from the owning component's render-commit step or an ancestor's.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

#[derive(Clone)]
pub struct LiveElement {
    inner: Rc<LiveInner>,
}

struct LiveInner {
    label: RefCell<Rc<str>>,
    document: bool,
    parent: RefCell<Weak<LiveInner>>,
    children: RefCell<Vec<LiveElement>>,
}

impl LiveElement {
    fn with_label(label: Rc<str>, document: bool) -> Self {
        Self {
            inner: Rc::new(LiveInner {
                label: RefCell::new(label),
                document,
                parent: RefCell::new(Weak::new()),
                children: RefCell::new(Vec::new()),
            }),
        }
    }

    /// The displayed document root. Everything reachable from it is
    /// considered part of the visible document.
    pub fn document() -> Self {
        Self::with_label(Rc::from("document"), true)
    }

    /// A constructed element that is not part of any document yet.
    pub fn detached(label: impl Into<Rc<str>>) -> Self {
        Self::with_label(label.into(), false)
    }

    pub fn label(&self) -> Rc<str> {
        self.inner.label.borrow().clone()
    }

    pub fn set_label(&self, label: impl Into<Rc<str>>) {
        *self.inner.label.borrow_mut() = label.into();
    }

    pub fn ptr_eq(&self, other: &LiveElement) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn parent(&self) -> Option<LiveElement> {
        self.inner
            .parent
            .borrow()
            .upgrade()
            .map(|inner| LiveElement { inner })
    }

    pub fn children(&self) -> Vec<LiveElement> {
        self.inner.children.borrow().clone()
    }

    /// Appends `child` under `self`, detaching it from any previous parent.
    pub fn append_child(&self, child: &LiveElement) {
        child.remove();
        *child.inner.parent.borrow_mut() = Rc::downgrade(&self.inner);
        self.inner.children.borrow_mut().push(child.clone());
    }

    /// Detaches `self` from its parent. A no-op for roots.
    pub fn remove(&self) {
        if let Some(parent) = self.parent() {
            parent
                .inner
                .children
                .borrow_mut()
                .retain(|c| !c.ptr_eq(self));
        }
        *self.inner.parent.borrow_mut() = Weak::new();
    }

    pub fn clear_children(&self) {
        let children = std::mem::take(&mut *self.inner.children.borrow_mut());
        for child in children {
            *child.inner.parent.borrow_mut() = Weak::new();
        }
    }

    /// Whether `other` is `self` or a descendant of `self`.
    pub fn contains(&self, other: &LiveElement) -> bool {
        let mut cursor = Some(other.clone());
        while let Some(node) = cursor {
            if node.ptr_eq(self) {
                return true;
            }
            cursor = node.parent();
        }
        false
    }

    /// Whether this element is part of the displayed document.
    pub fn is_connected(&self) -> bool {
        let mut cursor = Some(self.clone());
        while let Some(node) = cursor {
            if node.inner.document {
                return true;
            }
            cursor = node.parent();
        }
        false
    }

    pub fn downgrade(&self) -> WeakLiveElement {
        WeakLiveElement(Rc::downgrade(&self.inner))
    }

    /// Compact structural rendering, e.g. `div(text:hi,span)`. Test helper.
    pub fn outline(&self) -> String {
        let children = self.children();
        if children.is_empty() {
            return self.label().to_string();
        }
        let parts: Vec<String> = children.iter().map(|c| c.outline()).collect();
        format!("{}({})", self.label(), parts.join(","))
    }
}

impl fmt::Debug for LiveElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LiveElement({})", self.outline())
    }
}

/// Non-owning handle, used for refs so a component never keeps a subtree's
/// elements alive.
#[derive(Clone)]
pub struct WeakLiveElement(Weak<LiveInner>);

impl WeakLiveElement {
    pub fn upgrade(&self) -> Option<LiveElement> {
        self.0.upgrade().map(|inner| LiveElement { inner })
    }
}
