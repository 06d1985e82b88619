//! CLI smoke entry point.
//!
//! # Responsibility
//! - Run one scripted session against the in-memory host.
//! - Print the rendered document after each step.

use log::error;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::Duration;
use taskdesk_core::view::{Component, TASK_MENU_CLASS};
use taskdesk_core::{init_logging_from_config, App, AppConfig, MemoryHost};

fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("taskdesk: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = init_logging_from_config(&config) {
        eprintln!("taskdesk: logging disabled: {err}");
    }

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_session module=cli status=error error={err}");
            eprintln!("taskdesk: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: AppConfig) -> Result<(), String> {
    let transition = config.delete_transition;
    let host = MemoryHost::new();
    let inbox = host.seed_project("Inbox");
    host.seed_task(&inbox, "sort mail", false);

    let mut app = App::init(config, Rc::new(host.clone()));
    app.settle(&host);
    step(&app, "initial load");

    let add = app.view().nav().add_button().ok_or("missing add-project button")?;
    app.pointer_down(add);
    let input = app
        .view()
        .nav()
        .new_project_input()
        .ok_or("new-project input did not open")?;
    app.enter_text(input.input(), "Weekend");
    app.settle(&host);
    step(&app, "project created");

    let project = app.view().project_view().ok_or("no project routed")?;
    for title in ["buy paint", "fix fence"] {
        app.enter_text(project.new_task_input(), title);
        app.settle(&host);
    }
    step(&app, "tasks added");

    let table = project.table().ok_or("no task table")?;
    let first = table.row_ids().first().cloned().ok_or("no task rows")?;
    let row = table.row_node(&first).ok_or("row not rendered")?;
    let check = {
        let doc = app.context().doc().borrow();
        doc.first(row, "d-check", Some("done"))
    }
    .ok_or("row has no check")?;
    app.set_checked(check, true);
    app.settle(&host);
    step(&app, "task toggled");

    let more = {
        let doc = app.context().doc().borrow();
        doc.first(row, "d-ico", Some("show-more"))
    }
    .ok_or("row has no menu icon")?;
    app.pointer_up(more);
    let delete = {
        let doc = app.context().doc().borrow();
        let menu = doc
            .first(doc.body(), "menu-c", Some(TASK_MENU_CLASS))
            .ok_or("menu did not open")?;
        doc.find_by_attr(menu, "li", "data-key", "delete")
            .first()
            .copied()
            .ok_or("menu has no delete option")?
    };
    app.pointer_up(delete);
    app.settle(&host);
    app.advance(transition);
    step(&app, "task deleted");

    if !app.view().is_mounted() {
        return Err("app view unmounted unexpectedly".to_string());
    }
    app.shutdown();
    Ok(())
}

fn step(app: &App, label: &str) {
    println!("== {label}");
    println!("{}", app.render());
}
