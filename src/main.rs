use std::sync::Arc;

use anyhow::{Context, bail};

use engagement_gate::config::{GatingConfig, state_path_from_env};
use engagement_gate::engagement::EngagementStore;
use engagement_gate::persistence::{FileAdapter, PersistenceAdapter};

const USAGE: &str = "usage: engagement-gate <event>...

events:
  boot                              start a cold session (once per run)
  complete-onboarding               finish the first-run carousel
  shown                             a sign-up prompt was displayed
  guest                             prompt dismissed with \"maybe later\"
  intent                            like, save or follow
  sign-in <method> [name] [email]   record a completed provider sign-in
  sign-out
  reset                             wipe the stored record
  status                            print the current status (default)";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = GatingConfig::from_env().context("invalid gating configuration")?;
    let state_path = state_path_from_env();
    tracing::debug!(path = %state_path.display(), ?config, "Starting");

    let adapter: Arc<dyn PersistenceAdapter> = Arc::new(FileAdapter::new(&state_path));
    let store = EngagementStore::load(adapter).await;

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        println!("{USAGE}");
        return Ok(());
    }

    let events = parse_events(&args)?;

    // init_session must run at most once per process
    let mut session_started = false;
    let mut printed = false;

    for event in events {
        match event {
            Event::Boot => {
                if session_started {
                    tracing::warn!("Session already started in this run, ignoring boot");
                } else {
                    store.init_session().await;
                    session_started = true;
                }
            }
            Event::CompleteOnboarding => store.complete_onboarding().await,
            Event::Shown => store.record_prompt_shown().await,
            Event::Guest => store.continue_as_guest().await,
            Event::Intent => store.track_high_intent_action().await,
            Event::SignIn {
                method,
                name,
                email,
            } => store.sign_in(method, name, email).await,
            Event::SignOut => store.sign_out().await,
            Event::Reset => store.reset_onboarding().await,
            Event::Status => {
                print_status(&store, &config).await?;
                printed = true;
            }
        }
    }

    if !printed {
        print_status(&store, &config).await?;
    }
    Ok(())
}

/// One lifecycle event from the command line.
#[derive(Debug, PartialEq)]
enum Event<'a> {
    Boot,
    CompleteOnboarding,
    Shown,
    Guest,
    Intent,
    SignIn {
        method: &'a str,
        name: Option<&'a str>,
        email: Option<&'a str>,
    },
    SignOut,
    Reset,
    Status,
}

fn parse_events(args: &[String]) -> anyhow::Result<Vec<Event<'_>>> {
    let mut tokens = args.iter().map(String::as_str).peekable();
    let mut events = Vec::new();

    while let Some(token) = tokens.next() {
        let event = match token {
            "boot" => Event::Boot,
            "complete-onboarding" => Event::CompleteOnboarding,
            "shown" => Event::Shown,
            "guest" => Event::Guest,
            "intent" => Event::Intent,
            "sign-in" => {
                let Some(method) = tokens.next_if(|s| !is_event(s)) else {
                    bail!("sign-in needs a method\n\n{USAGE}");
                };
                Event::SignIn {
                    method,
                    name: tokens.next_if(|s| !is_event(s)),
                    email: tokens.next_if(|s| !is_event(s)),
                }
            }
            "sign-out" => Event::SignOut,
            "reset" => Event::Reset,
            "status" => Event::Status,
            other => bail!("unknown event {other:?}\n\n{USAGE}"),
        };
        events.push(event);
    }
    Ok(events)
}

fn is_event(token: &str) -> bool {
    matches!(
        token,
        "boot"
            | "complete-onboarding"
            | "shown"
            | "guest"
            | "intent"
            | "sign-in"
            | "sign-out"
            | "reset"
            | "status"
    )
}

async fn print_status(store: &EngagementStore, config: &GatingConfig) -> anyhow::Result<()> {
    let status = store.status(config).await;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
