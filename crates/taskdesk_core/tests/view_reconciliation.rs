use futures::executor::block_on;
use serde_json::json;
use std::rc::Rc;
use std::time::Duration;
use taskdesk_core::view::{
    Component, ProjectView, TasksDataTable, TASK_MENU_CLASS, WELCOME_TEXT,
};
use taskdesk_core::{
    App, AppConfig, EntityKind, HubEvent, MemoryHost, ModelAction, NodeId, ProjectForUpdate,
    TaskForCreate, TaskForUpdate,
};

const TRANSITION: Duration = Duration::from_millis(100);

fn boot(seed: impl FnOnce(&MemoryHost)) -> (MemoryHost, App) {
    let host = MemoryHost::new();
    seed(&host);
    let mut app = App::init(AppConfig::default(), Rc::new(host.clone()));
    app.settle(&host);
    (host, app)
}

fn project_view(app: &App) -> Rc<ProjectView> {
    app.view().project_view().expect("project view mounted")
}

fn table(app: &App) -> Rc<TasksDataTable> {
    project_view(app).table().expect("task table mounted")
}

fn text(app: &App, node: NodeId) -> String {
    app.context().doc().borrow().text(node)
}

fn row_part(app: &App, task_id: &str, tag: &str, class: &str) -> NodeId {
    let row = table(app).row_node(task_id).expect("row rendered");
    app.context()
        .doc()
        .borrow()
        .first(row, tag, Some(class))
        .expect("row part rendered")
}

fn open_menu_and_pick(app: &App, task_id: &str, key: &str) {
    let more = row_part(app, task_id, "d-ico", "show-more");
    app.pointer_up(more);
    let item = {
        let doc = app.context().doc().borrow();
        let menu = doc
            .first(doc.body(), "menu-c", Some(TASK_MENU_CLASS))
            .expect("menu open");
        doc.find_by_attr(menu, "li", "data-key", key)[0]
    };
    assert!(app.pointer_up(item));
}

#[test]
fn initial_load_lists_projects_and_routes_to_the_first() {
    let mut alpha = String::new();
    let (_, app) = boot(|host| {
        alpha = host.seed_project("Alpha");
        host.seed_project("Beta");
    });

    let nav = app.view().nav();
    assert_eq!(nav.link_ids().len(), 2);
    assert_eq!(
        app.context().router().get_current().project_id.as_deref(),
        Some(alpha.as_str())
    );
    let link = nav.link_node(&alpha).expect("alpha link");
    assert!(app.context().doc().borrow().has_class(link, "sel"));
    assert_eq!(project_view(&app).project().name, "Alpha");
}

#[test]
fn empty_host_shows_welcome_text() {
    let (_, app) = boot(|_| {});

    assert!(app.view().project_view().is_none());
    assert_eq!(text(&app, app.view().main()), WELCOME_TEXT);
}

#[test]
fn created_project_shows_exactly_once_and_gets_routed() {
    let (host, mut app) = boot(|_| {});
    let nav = app.view().nav().clone();

    app.pointer_down(nav.add_button().expect("add button"));
    let input = nav.new_project_input().expect("input open");
    app.enter_text(input.input(), "Alpha");
    app.settle(&host);

    let ids = nav.link_ids();
    assert_eq!(ids.len(), 1);
    assert_eq!(text(&app, nav.root()).matches("Alpha").count(), 1);
    assert_eq!(
        app.context().router().get_current().project_id,
        Some(ids[0].clone())
    );
    assert_eq!(project_view(&app).project().name, "Alpha");
    assert_eq!(input.value(), "");

    // A repeated event refreshes, never duplicates.
    app.deliver_host_event(HubEvent::model(
        ModelAction::Create,
        EntityKind::Project,
        &ids[0],
    ));
    app.settle(&host);
    assert_eq!(text(&app, nav.root()).matches("Alpha").count(), 1);
}

#[test]
fn project_input_closes_on_empty_change_escape_or_second_toggle() {
    let (_, app) = boot(|_| {});
    let nav = app.view().nav().clone();
    let add = nav.add_button().expect("add button");

    app.pointer_down(add);
    let input = nav.new_project_input().expect("input open");
    app.enter_text(input.input(), "   ");
    assert!(nav.new_project_input().is_none());

    app.pointer_down(add);
    let input = nav.new_project_input().expect("input reopened");
    app.key_down(input.input(), "Escape");
    assert!(!input.is_mounted());

    app.pointer_down(add);
    assert!(nav.new_project_input().is_some());
    app.pointer_down(add);
    assert!(nav.new_project_input().is_none());
}

#[test]
fn new_project_input_focus_is_deferred() {
    let (_, mut app) = boot(|_| {});
    let nav = app.view().nav().clone();

    app.pointer_down(nav.add_button().expect("add button"));
    let input = nav.new_project_input().expect("input open");
    assert_ne!(app.context().doc().borrow().focused(), Some(input.input()));

    app.advance(Duration::ZERO);
    assert_eq!(app.context().doc().borrow().focused(), Some(input.input()));
}

#[test]
fn selecting_a_link_swaps_the_project_view() {
    let mut beta = String::new();
    let (host, mut app) = boot(|host| {
        host.seed_project("Alpha");
        beta = host.seed_project("Beta");
    });
    let first_view = project_view(&app);

    let link = app.view().nav().link_node(&beta).expect("beta link");
    app.pointer_down(link);
    app.settle(&host);

    assert!(!first_view.is_mounted());
    assert_eq!(project_view(&app).project().id, beta);
    assert!(app.context().doc().borrow().has_class(link, "sel"));
}

#[test]
fn task_update_refetches_only_that_task_and_keeps_siblings() {
    let mut ids = (String::new(), String::new());
    let (host, mut app) = boot(|host| {
        let project = host.seed_project("Alpha");
        ids.0 = host.seed_task(&project, "write report", false);
        ids.1 = host.seed_task(&project, "read mail", false);
    });
    let (t1, t2) = ids;
    let row1 = table(&app).row_node(&t1).expect("t1 row");
    let row2 = table(&app).row_node(&t2).expect("t2 row");
    let row2_text = text(&app, row2);
    host.clear_calls();

    let check = row_part(&app, &t1, "d-check", "done");
    app.set_checked(check, true);
    app.settle(&host);

    let methods = host
        .calls()
        .into_iter()
        .map(|call| call.method)
        .collect::<Vec<_>>();
    assert_eq!(methods, vec!["update_task", "get_task"]);
    assert_eq!(host.calls_to("get_task")[0].params, json!({"id": t1}));
    assert_eq!(table(&app).row_node(&t1), Some(row1));
    assert_eq!(table(&app).row_node(&t2), Some(row2));
    assert_eq!(text(&app, row2), row2_text);
    assert_eq!(
        app.context().doc().borrow().attr(check, "checked"),
        Some("")
    );

    // Re-committing the value the row already shows issues nothing.
    host.clear_calls();
    app.set_checked(check, true);
    app.settle(&host);
    assert!(host.calls().is_empty());
}

#[test]
fn deleted_row_fades_then_disappears_and_repeat_delete_is_noop() {
    let mut ids = (String::new(), String::new());
    let (host, mut app) = boot(|host| {
        let project = host.seed_project("Alpha");
        ids.0 = host.seed_task(&project, "write report", false);
        ids.1 = host.seed_task(&project, "read mail", false);
    });
    let (t1, t2) = ids;

    open_menu_and_pick(&app, &t1, "delete");
    assert!(app.context().overlays().is_empty());
    app.settle(&host);

    let row = table(&app).row_node(&t1).expect("row kept during transition");
    assert!(app.context().doc().borrow().has_class(row, "anim-delete"));
    assert_eq!(app.advance(TRANSITION), 1);
    assert!(!app.context().doc().borrow().contains(row));
    assert_eq!(table(&app).row_ids(), vec![t2.clone()]);

    app.deliver_host_event(HubEvent::model(ModelAction::Delete, EntityKind::Task, &t1));
    assert_eq!(app.advance(TRANSITION), 0);
    assert_eq!(table(&app).row_ids(), vec![t2]);
}

#[test]
fn create_update_delete_leaves_task_absent() {
    let (host, mut app) = boot(|host| {
        host.seed_project("Alpha");
    });

    app.enter_text(project_view(&app).new_task_input(), "  buy paint ");
    app.settle(&host);
    let ids = table(&app).row_ids();
    assert_eq!(ids.len(), 1);
    let id = ids[0].clone();
    assert_eq!(host.task(&id).expect("task stored").title, "buy paint");

    open_menu_and_pick(&app, &id, "toggle");
    app.settle(&host);
    assert!(host.task(&id).expect("task stored").done);

    open_menu_and_pick(&app, &id, "delete");
    app.settle(&host);
    app.advance(TRANSITION);

    assert!(table(&app).row_ids().is_empty());
    assert!(table(&app).row_node(&id).is_none());
    assert!(host.task(&id).is_none());
}

#[test]
fn late_list_result_does_not_resurrect_deleted_task() {
    let mut t1 = String::new();
    let (host, mut app) = boot(|host| {
        let project = host.seed_project("Alpha");
        t1 = host.seed_task(&project, "write report", false);
    });

    host.hold_responses(true);
    host.emit(HubEvent::model(ModelAction::Create, EntityKind::Task, "task:other"));
    app.settle(&host);
    app.deliver_host_event(HubEvent::model(ModelAction::Delete, EntityKind::Task, &t1));

    host.hold_responses(false);
    assert_eq!(host.release_held(), 1);
    app.run_until_stalled();
    app.advance(TRANSITION);

    assert!(table(&app).row_ids().is_empty());
    assert_eq!(table(&app).tombstone_count(), 1);
}

#[test]
fn task_update_during_list_load_is_applied_after_the_list_renders() {
    let mut seeded = (String::new(), String::new());
    let (host, mut app) = boot(|host| {
        seeded.0 = host.seed_project("Alpha");
        seeded.1 = host.seed_task(&seeded.0, "write report", false);
    });
    let (project, t1) = seeded;

    host.hold_responses(true);
    let t2 = host.seed_task(&project, "read mail", false);
    app.deliver_host_event(HubEvent::model(ModelAction::Create, EntityKind::Task, &t2));
    app.run_until_stalled();
    host.hold_responses(false);

    block_on(app.context().tasks().update(&t1, &TaskForUpdate::done(true))).unwrap();
    app.settle(&host);
    assert!(host.calls_to("get_task").is_empty());

    assert_eq!(host.release_held(), 1);
    app.settle(&host);

    assert_eq!(table(&app).row_ids(), vec![t2, t1.clone()]);
    assert_eq!(host.calls_to("get_task")[0].params, json!({"id": t1}));
    let check = row_part(&app, &t1, "d-check", "done");
    assert_eq!(
        app.context().doc().borrow().attr(check, "checked"),
        Some("")
    );
}

#[test]
fn finished_delete_drops_row_and_fresh_list_drops_tombstone() {
    let mut seeded = (String::new(), String::new(), String::new());
    let (host, mut app) = boot(|host| {
        seeded.0 = host.seed_project("Alpha");
        seeded.1 = host.seed_task(&seeded.0, "write report", false);
        seeded.2 = host.seed_task(&seeded.0, "read mail", false);
    });
    let (project, t1, t2) = seeded;

    block_on(app.context().tasks().delete(&t1)).unwrap();
    app.settle(&host);
    assert_eq!(table(&app).row_ids(), vec![t2.clone(), t1.clone()]);
    assert_eq!(table(&app).tombstone_count(), 1);

    app.advance(TRANSITION);
    assert_eq!(table(&app).row_ids(), vec![t2.clone()]);

    let ack = block_on(
        app.context()
            .tasks()
            .create(&TaskForCreate::new(&project, "call back")),
    )
    .unwrap();
    app.settle(&host);
    assert_eq!(table(&app).row_ids(), vec![ack.id, t2]);
    assert_eq!(table(&app).tombstone_count(), 0);
}

#[test]
fn unmounted_view_discards_pending_results() {
    let host = MemoryHost::new();
    host.seed_project("Alpha");
    host.hold_responses(true);
    let mut app = App::init(AppConfig::default(), Rc::new(host.clone()));
    app.run_until_stalled();

    app.view().unmount();
    host.hold_responses(false);
    assert_eq!(host.release_held(), 1);
    app.settle(&host);

    assert_eq!(app.context().router().get_current().project_id, None);
    assert!(host.calls_to("get_project").is_empty());
    let doc = app.context().doc().borrow();
    assert!(doc.children(doc.body()).is_empty());
}

#[test]
fn search_rebuilds_table_with_contains_filter() {
    let mut ids = (String::new(), String::new());
    let mut project = String::new();
    let (host, mut app) = boot(|host| {
        project = host.seed_project("Alpha");
        ids.0 = host.seed_task(&project, "write report", false);
        ids.1 = host.seed_task(&project, "read mail", false);
    });
    let search = project_view(&app).search_input();

    app.enter_text(search, " write ");
    app.settle(&host);
    assert_eq!(table(&app).row_ids(), vec![ids.0.clone()]);
    let sent = host.calls_to("list_tasks").pop().expect("list call").params;
    assert_eq!(
        sent,
        json!({"filter": {"project_id": project, "title": {"$contains": "write"}}})
    );

    app.enter_text(search, "  ");
    app.settle(&host);
    assert_eq!(table(&app).row_ids(), vec![ids.1, ids.0]);
}

#[test]
fn empty_table_focuses_new_task_input() {
    let (_, app) = boot(|host| {
        host.seed_project("Alpha");
    });

    assert_eq!(
        app.context().doc().borrow().focused(),
        Some(project_view(&app).new_task_input())
    );
}

#[test]
fn task_menu_labels_toggle_and_closes_on_outside_pointer() {
    let mut t1 = String::new();
    let (_, app) = boot(|host| {
        let project = host.seed_project("Alpha");
        t1 = host.seed_task(&project, "write report", true);
    });

    app.pointer_up(row_part(&app, &t1, "d-ico", "show-more"));
    {
        let doc = app.context().doc().borrow();
        let menu = doc
            .first(doc.body(), "menu-c", Some(TASK_MENU_CLASS))
            .expect("menu open");
        let toggle = doc.find_by_attr(menu, "li", "data-key", "toggle")[0];
        assert_eq!(doc.text(toggle), "Mark Undone");
    }
    assert_eq!(app.context().overlays().len(), 1);

    app.pointer_up(app.view().main());
    assert!(app.context().overlays().is_empty());
    let doc = app.context().doc().borrow();
    assert!(doc.first(doc.body(), "menu-c", None).is_none());
}

#[test]
fn show_more_on_another_row_closes_the_open_menu_without_reopening() {
    let mut ids = (String::new(), String::new());
    let (_, app) = boot(|host| {
        let project = host.seed_project("Alpha");
        ids.0 = host.seed_task(&project, "write report", false);
        ids.1 = host.seed_task(&project, "read mail", false);
    });
    let (t1, t2) = ids;

    app.pointer_up(row_part(&app, &t1, "d-ico", "show-more"));
    assert_eq!(app.context().overlays().len(), 1);

    app.pointer_up(row_part(&app, &t2, "d-ico", "show-more"));
    assert!(app.context().overlays().is_empty());
    {
        let doc = app.context().doc().borrow();
        assert!(doc.first(doc.body(), "menu-c", None).is_none());
    }

    app.pointer_up(row_part(&app, &t2, "d-ico", "show-more"));
    assert_eq!(app.context().overlays().len(), 1);
}

#[test]
fn project_update_and_delete_patch_nav_and_main() {
    let mut alpha = String::new();
    let (host, mut app) = boot(|host| {
        alpha = host.seed_project("Alpha");
        host.seed_project("Beta");
    });
    let nav = app.view().nav().clone();
    let link = nav.link_node(&alpha).expect("alpha link");

    let update = ProjectForUpdate {
        name: Some("Alpha 2".to_string()),
    };
    block_on(app.context().projects().update(&alpha, &update))
        .expect("update acked");
    app.settle(&host);
    assert_eq!(nav.link_node(&alpha), Some(link));
    assert_eq!(text(&app, link), "Alpha 2");
    assert_eq!(project_view(&app).project().name, "Alpha 2");

    block_on(app.context().projects().delete(&alpha)).expect("delete acked");
    app.settle(&host);
    let fading = nav.link_node(&alpha).expect("link kept during transition");
    assert!(app.context().doc().borrow().has_class(fading, "anim-delete"));
    assert!(app.view().project_view().is_none());
    assert_eq!(text(&app, app.view().main()), WELCOME_TEXT);

    app.advance(TRANSITION);
    assert!(nav.link_node(&alpha).is_none());
    assert_eq!(nav.link_ids().len(), 1);
}

#[test]
fn project_rename_during_list_load_is_applied_after_the_list_renders() {
    let mut alpha = String::new();
    let (host, mut app) = boot(|host| {
        alpha = host.seed_project("Alpha");
    });

    host.hold_responses(true);
    let beta = host.seed_project("Beta");
    app.deliver_host_event(HubEvent::model(ModelAction::Create, EntityKind::Project, &beta));
    app.run_until_stalled();
    host.hold_responses(false);

    let update = ProjectForUpdate {
        name: Some("Alpha 2".to_string()),
    };
    block_on(app.context().projects().update(&alpha, &update)).unwrap();
    app.settle(&host);
    // The held list predates the rename.
    assert_eq!(host.release_held(), 2);
    app.settle(&host);

    let nav = app.view().nav();
    assert_eq!(nav.link_ids().len(), 2);
    let link = nav.link_node(&alpha).expect("alpha link");
    assert_eq!(text(&app, link), "Alpha 2");
}

#[test]
fn menu_icon_toggles_min_nav() {
    let (_, app) = boot(|_| {});
    let root = app.view().root();
    let menu = app.view().menu_button().expect("menu icon");

    app.pointer_up(menu);
    assert!(app.context().doc().borrow().has_class(root, "min-nav"));
    app.pointer_up(menu);
    assert!(!app.context().doc().borrow().has_class(root, "min-nav"));
}

#[test]
fn header_title_is_split_into_plain_and_prime_spans() {
    let (_, app) = boot(|_| {});
    let doc = app.context().doc().borrow();
    let prime = doc
        .first(app.view().root(), "span", Some("prime"))
        .expect("prime span");
    assert_eq!(doc.text(prime), "App");
}

#[test]
fn shutdown_releases_every_subscription() {
    let (_, app) = boot(|host| {
        let project = host.seed_project("Alpha");
        host.seed_task(&project, "write report", false);
    });
    let bus = app.context().bus().clone();
    assert!(bus.subscriber_count() > 0);

    app.shutdown();
    assert_eq!(bus.subscriber_count(), 0);
}
