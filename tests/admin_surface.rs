mod common;

use std::sync::Arc;

use command_bridge::admin::AdminSurface;
use command_bridge::bindings::ListFilter;
use command_bridge::config::{BridgeConfig, ResponseMode};

use common::{harness, session, Harness, ScriptedOutput};

fn admin(h: &Harness) -> AdminSurface {
    AdminSurface::new(Arc::clone(&h.bridge))
}

#[tokio::test]
async fn add_list_disable_enable_remove_flow() {
    let h = harness(BridgeConfig::default());
    let admin = admin(&h);
    let session = session();

    let reply = admin
        .dispatch(&session, "add rmd--ls list_reminders Lists all reminders")
        .await;
    assert_eq!(reply, "Added mapping 'rmd--ls' -> 'list_reminders'.");

    let reply = admin.dispatch(&session, "ls").await;
    assert!(reply.contains("1. rmd--ls -> list_reminders (Lists all reminders)"));

    let reply = admin.dispatch(&session, "disable rmd--ls").await;
    assert_eq!(reply, "Disabled mapping 'rmd--ls'.");

    let reply = admin.dispatch(&session, "ls --disabled").await;
    assert!(reply.contains("rmd--ls"));
    assert!(reply.contains("[disabled]"));

    let reply = admin.dispatch(&session, "ls --enabled").await;
    assert_eq!(reply, "No enabled mappings.");

    let reply = admin.dispatch(&session, "disable rmd--ls").await;
    assert_eq!(reply, "Mapping 'rmd--ls' is already disabled.");

    let reply = admin.dispatch(&session, "enable rmd--ls").await;
    assert_eq!(reply, "Enabled mapping 'rmd--ls'.");

    let reply = admin.dispatch(&session, "rm rmd--ls").await;
    assert_eq!(reply, "Removed mapping 'rmd--ls'.");
    assert!(h.bridge.list_bindings(ListFilter::All).is_empty());
}

#[tokio::test]
async fn duplicate_add_is_rendered_not_swallowed() {
    let h = harness(BridgeConfig::default());
    let admin = admin(&h);
    let session = session();

    admin.dispatch(&session, "add rmd--ls list_reminders").await;
    let reply = admin.dispatch(&session, "add rmd--ls other_fn").await;
    assert!(reply.starts_with("Error:"));
    assert!(reply.contains("already mapped"));
}

#[tokio::test]
async fn exec_runs_the_mapped_command_directly() {
    let mut config = BridgeConfig::default();
    config.execution.response_mode = ResponseMode::TextOnly;
    let h = harness(config);
    let admin = admin(&h);
    let session = session();

    admin.dispatch(&session, "add rmd--ls list_reminders").await;
    h.dispatcher
        .push_script(ScriptedOutput::chunks_then_finish(&["No reminders."]));

    let reply = admin.dispatch(&session, "exec rmd--ls").await;
    assert_eq!(reply, "No reminders.");
    assert_eq!(h.dispatcher.submitted_lines(), vec!["/rmd ls".to_string()]);
}

#[tokio::test]
async fn exec_passes_arguments_through_verbatim() {
    let mut config = BridgeConfig::default();
    config.execution.response_mode = ResponseMode::TextOnly;
    let h = harness(config);
    let admin = admin(&h);
    let session = session();

    admin.dispatch(&session, "add rmd--add add_reminder").await;
    h.dispatcher
        .push_script(ScriptedOutput::chunks_then_finish(&["ok"]));

    admin
        .dispatch(&session, "exec rmd--add text=water time=10:00")
        .await;
    assert_eq!(
        h.dispatcher.submitted_lines(),
        vec!["/rmd add text=water time=10:00".to_string()]
    );
}

#[tokio::test]
async fn exec_of_unknown_command_reports_not_found() {
    let h = harness(BridgeConfig::default());
    let admin = admin(&h);

    let reply = admin.dispatch(&session(), "exec nothing--here").await;
    assert!(reply.starts_with("Error:"));
    assert!(reply.contains("no mapping"));
}

#[tokio::test]
async fn refresh_reports_the_declared_count() {
    let h = harness(BridgeConfig::default());
    let admin = admin(&h);
    let session = session();

    admin.dispatch(&session, "add a fn_a").await;
    admin.dispatch(&session, "add b fn_b").await;

    let reply = admin.dispatch(&session, "refresh").await;
    assert_eq!(reply, "Refreshed; 2 function(s) declared.");
}

#[tokio::test]
async fn help_and_unknown_verbs() {
    let h = harness(BridgeConfig::default());
    let admin = admin(&h);
    let session = session();

    let help = admin.dispatch(&session, "help").await;
    for verb in ["add", "ls", "rm", "enable", "disable", "exec", "refresh"] {
        assert!(help.contains(verb), "help should mention '{verb}'");
    }
    assert_eq!(admin.dispatch(&session, "").await, help);

    let reply = admin.dispatch(&session, "bogus").await;
    assert!(reply.contains("Unknown subcommand 'bogus'"));

    let reply = admin.dispatch(&session, "ls --sideways").await;
    assert!(reply.contains("Invalid filter"));

    let reply = admin.dispatch(&session, "add onlyone").await;
    assert!(reply.starts_with("Usage:"));
}

#[tokio::test]
async fn disabled_bridge_refuses_administration() {
    let mut config = BridgeConfig::default();
    config.basic.enable_plugin = false;
    let h = harness(config);
    let admin = admin(&h);

    let reply = admin.dispatch(&session(), "add a fn_a").await;
    assert!(reply.contains("disabled"));
    assert!(h.bridge.list_bindings(ListFilter::All).is_empty());
}

#[tokio::test]
async fn invalid_command_names_are_rejected() {
    let h = harness(BridgeConfig::default());
    let admin = admin(&h);

    let reply = admin.dispatch(&session(), "add a----b fn_ab").await;
    assert!(reply.starts_with("Error:"));
    assert!(reply.contains("invalid command name"));
}
