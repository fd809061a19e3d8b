use ad_core::command::parse_repository_command;
use ad_core::config::Config;
use ad_core::pipeline::PipelineSnapshot;
use ad_session::{DeploymentStore, EventBus, PollerState, SessionEvent, StatusPoller};

use super::{backend, describe_event, format_snapshot, friendly_error, status_line};

/// Run the `analyze` subcommand: create an analysis task and print its
/// timeline until the poller goes dormant.
pub async fn run(config: &Config, repo_url: &str, token: Option<&str>) -> anyhow::Result<()> {
    follow(config, repo_url, token).await.map(|_| ())
}

/// Returns the last snapshot shown.
async fn follow(
    config: &Config,
    repo_url: &str,
    token: Option<&str>,
) -> anyhow::Result<PipelineSnapshot> {
    let Some(cmd) = parse_repository_command(repo_url) else {
        anyhow::bail!("{repo_url:?} is not a GitHub repository URL (https://github.com/<owner>/<repo>)");
    };
    let token = token.map(str::to_string).or(cmd.token);

    let backend = backend(config);
    let store = DeploymentStore::new();
    let events = EventBus::new();
    let notices = events.subscribe();
    let poller = StatusPoller::spawn(
        store.clone(),
        backend.clone(),
        config.poller.interval(),
        events,
    );

    let task_id = backend
        .create_analysis_task(&cmd.repo_url, &config.backend.default_branch, token.as_deref())
        .await
        .map_err(|e| friendly_error(e, &config.backend.base_url))?;
    println!("Analysis task {task_id} queued for {}", cmd.repo_url);
    if token.is_some() {
        println!("Token provided: changes may be pushed back to the repository.");
    } else {
        println!("No token: local environment analysis only.");
    }

    let mut snapshots = store.subscribe_snapshot();
    let mut state = poller.subscribe_state();
    store.set_active_task(Some(task_id));

    let mut shown: Option<PipelineSnapshot> = None;
    let mut show = |snap: PipelineSnapshot| {
        if shown.as_ref() != Some(&snap) {
            println!("\n{}", format_snapshot(&snap));
            shown = Some(snap);
        }
    };

    loop {
        if matches!(*state.borrow_and_update(), PollerState::Dormant(_)) {
            break;
        }
        tokio::select! {
            Ok(()) = snapshots.changed() => {
                let snap = snapshots.borrow_and_update().clone();
                show(snap);
            }
            Ok(()) = state.changed() => {}
            Ok(event) = notices.recv_async() => {
                if let SessionEvent::Failed(_) = &event {
                    if let Some(line) = describe_event(&event) {
                        eprintln!("{}", status_line(&line));
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    show(store.snapshot());
    poller.shutdown();
    Ok(shown.unwrap_or_else(|| store.snapshot()))
}
