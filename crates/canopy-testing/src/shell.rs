//! Test shell: scheduler plus a document root.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use canopy_core::{
    Component, ComponentNode, Env, LiveElement, Patcher, Props, Scheduler, TemplateEngine,
};

use crate::{ReplacePatcher, TestEngine};

pub struct TestShell {
    scheduler: Scheduler,
    pub engine: Rc<TestEngine>,
    pub patcher: Rc<ReplacePatcher>,
    pub document: LiveElement,
}

impl TestShell {
    pub fn new() -> Self {
        Self {
            scheduler: Scheduler::new(),
            engine: TestEngine::new(),
            patcher: Rc::new(ReplacePatcher),
            document: LiveElement::document(),
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Builds a root component wired to this shell's engine and patcher.
    pub fn root(&self, component: Box<dyn Component>, props: Props, env: Env) -> ComponentNode {
        ComponentNode::root(
            component,
            props,
            env,
            Rc::clone(&self.engine) as Rc<dyn TemplateEngine>,
            Rc::clone(&self.patcher) as Rc<dyn Patcher>,
        )
    }

    /// Spawns `future` without driving it; pair with [`TestShell::settle`].
    pub fn spawn<T: 'static>(
        &self,
        future: impl Future<Output = T> + 'static,
    ) -> Rc<RefCell<Option<T>>> {
        let slot = Rc::new(RefCell::new(None));
        let out = Rc::clone(&slot);
        self.scheduler.spawn(async move {
            *out.borrow_mut() = Some(future.await);
        });
        slot
    }

    /// Spawns `future` and runs the scheduler until it settles. The result
    /// slot is `None` if the future is still blocked on external work.
    pub fn run<T: 'static>(
        &self,
        future: impl Future<Output = T> + 'static,
    ) -> Rc<RefCell<Option<T>>> {
        let slot = self.spawn(future);
        self.settle();
        slot
    }

    pub fn settle(&self) {
        self.scheduler.run_until_settled();
    }
}

impl Default for TestShell {
    fn default() -> Self {
        Self::new()
    }
}
