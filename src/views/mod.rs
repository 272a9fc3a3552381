/// Something that can draw itself into its container.
pub trait Renderable {
    fn render(&mut self);
}

/// A mounted view: renderable, and able to release its subtree and
/// event bindings.
pub trait View: Renderable {
    fn teardown(&mut self);
}

/// Keeps exactly one view mounted on a container.
#[derive(Default)]
pub struct ViewLifecycleManager {
    current: Option<Box<dyn View>>,
}

impl ViewLifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tears down the current view, then mounts and renders `view`.
    pub fn show(&mut self, view: Box<dyn View>) {
        if let Some(mut old) = self.current.take() {
            old.teardown();
        }
        let view = self.current.insert(view);
        view.render();
    }

    /// Renders the current view again, e.g. after its data changed.
    pub fn refresh(&mut self) {
        if let Some(view) = self.current.as_mut() {
            view.render();
        }
    }

    pub fn clear(&mut self) {
        if let Some(mut old) = self.current.take() {
            old.teardown();
        }
    }

    pub fn has_view(&self) -> bool {
        self.current.is_some()
    }
}

impl Drop for ViewLifecycleManager {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    /// Records lifecycle calls and fails loudly on overlapping mounts.
    struct Probe {
        name: &'static str,
        log: Log,
        mounted: Rc<RefCell<u32>>,
        live: bool,
    }

    impl Probe {
        fn boxed(name: &'static str, log: &Log, mounted: &Rc<RefCell<u32>>) -> Box<dyn View> {
            Box::new(Self {
                name,
                log: log.clone(),
                mounted: mounted.clone(),
                live: false,
            })
        }
    }

    impl Renderable for Probe {
        fn render(&mut self) {
            if !self.live {
                let mut mounted = self.mounted.borrow_mut();
                assert_eq!(*mounted, 0, "{} mounted over a live view", self.name);
                *mounted += 1;
                self.live = true;
            }
            self.log.borrow_mut().push(format!("render {}", self.name));
        }
    }

    impl View for Probe {
        fn teardown(&mut self) {
            if self.live {
                *self.mounted.borrow_mut() -= 1;
                self.live = false;
            }
            self.log.borrow_mut().push(format!("teardown {}", self.name));
        }
    }

    #[test]
    fn test_show_tears_down_previous_view_first() {
        let log = Log::default();
        let mounted = Rc::new(RefCell::new(0));
        let mut views = ViewLifecycleManager::new();

        views.show(Probe::boxed("v1", &log, &mounted));
        views.show(Probe::boxed("v2", &log, &mounted));

        assert_eq!(
            *log.borrow(),
            vec!["render v1", "teardown v1", "render v2"]
        );
        assert_eq!(*mounted.borrow(), 1);
    }

    #[test]
    fn test_refresh_rerenders_current_only() {
        let log = Log::default();
        let mounted = Rc::new(RefCell::new(0));
        let mut views = ViewLifecycleManager::new();

        views.refresh();
        assert!(log.borrow().is_empty());

        views.show(Probe::boxed("v1", &log, &mounted));
        views.refresh();
        assert_eq!(*log.borrow(), vec!["render v1", "render v1"]);
    }

    #[test]
    fn test_drop_tears_down_current() {
        let log = Log::default();
        let mounted = Rc::new(RefCell::new(0));
        {
            let mut views = ViewLifecycleManager::new();
            views.show(Probe::boxed("v1", &log, &mounted));
            assert!(views.has_view());
        }
        assert_eq!(*mounted.borrow(), 0);
        assert_eq!(log.borrow().last().map(String::as_str), Some("teardown v1"));
    }
}
