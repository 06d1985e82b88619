use super::{Component, Lifecycle, Selector, UiEvent, UiEventKind, UiHandlerTable};
use crate::context::AppContext;
use crate::dom::NodeId;
use crate::event::{DomainEvent, HandlerResult};
use log::debug;
use std::rc::{Rc, Weak};

type SelectCallback = Box<dyn Fn(&str)>;

/// Floating option list appended to the body.
///
/// Selecting an option reports its key and closes the menu. Pointer-ups
/// outside are left to [`super::Overlays::dismiss_outside`].
pub struct MenuComponent {
    this: Weak<Self>,
    ctx: AppContext,
    lifecycle: Lifecycle,
    root: NodeId,
    on_select: SelectCallback,
    handlers: UiHandlerTable<Self>,
}

impl MenuComponent {
    /// Opens a menu with `options` as `(key, label)` pairs, in order.
    pub fn open(
        ctx: &AppContext,
        class: &str,
        options: &[(&str, &str)],
        on_select: impl Fn(&str) + 'static,
    ) -> Rc<Self> {
        let root = {
            let mut doc = ctx.doc().borrow_mut();
            let root = doc.create_element("menu-c");
            doc.add_class(root, class);
            let items = options
                .iter()
                .map(|(key, label)| {
                    let item = doc.create_text_element("li", label);
                    doc.set_attr(item, "data-key", key);
                    item
                })
                .collect::<Vec<_>>();
            doc.replace_children(root, items);
            let body = doc.body();
            doc.append_child(body, root);
            root
        };

        let menu = Rc::new_cyclic(|this| Self {
            this: this.clone(),
            ctx: ctx.clone(),
            lifecycle: Lifecycle::default(),
            root,
            on_select: Box::new(on_select),
            handlers: UiHandlerTable::new().on(
                UiEventKind::PointerUp,
                Selector::TagWithAttr("li", "data-key"),
                Self::on_item,
            ),
        });
        menu.lifecycle.mark_mounted();
        ctx.overlays().open(menu.clone());
        debug!("event=menu_open module=view status=ok options={}", options.len());
        menu
    }

    fn on_item(&self, _: &UiEvent, item: NodeId) {
        let key = self
            .ctx
            .doc()
            .borrow()
            .attr(item, "data-key")
            .map(str::to_string);
        // Keep the menu alive until the callback returns.
        let _guard = self.this.upgrade();
        if let Some(key) = key {
            (self.on_select)(&key);
        }
        self.unmount();
    }
}

impl Component for MenuComponent {
    fn root(&self) -> NodeId {
        self.root
    }

    fn handle_event(&self, _: &DomainEvent) -> HandlerResult {
        Ok(())
    }

    fn dispatch_ui(&self, event: &UiEvent) -> bool {
        self.is_mounted()
            && self
                .handlers
                .dispatch(self, self.ctx.doc(), self.root, event)
    }

    fn unmount(&self) {
        if !self.lifecycle.release() {
            return;
        }
        self.ctx.doc().borrow_mut().remove(self.root);
        self.ctx.overlays().close(self.root);
    }

    fn is_mounted(&self) -> bool {
        self.lifecycle.is_mounted()
    }
}
