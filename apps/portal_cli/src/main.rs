use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use portal_client::{
    actions::{self, Decision},
    config::load_settings,
    resources::{self, APPLICATIONS_FIELD},
    AuthClient, Credential, CredentialStore, DataFetchController, MemoryCredentialStore,
    RequestDescriptor, SessionGate, TracingNavigator,
};
use shared::{
    domain::{ApplicationId, Role},
    protocol::ApplicationRecord,
    status::{legal_actions, Action, ApplicationStatus, StatusCounts, StatusFilter, TRANSITIONS},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Placement portal client")]
struct Cli {
    /// Overrides the configured API base url.
    #[arg(long)]
    api_url: Option<String>,
    /// Bearer token; falls back to PORTAL_TOKEN.
    #[arg(long)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Applications {
        #[arg(long, default_value = "student")]
        role: String,
        #[arg(long, default_value = "all")]
        status: String,
    },
    Decide {
        #[arg(long)]
        id: String,
        /// approve, reject, schedule or hire
        #[arg(long)]
        action: String,
        #[arg(long, default_value = "recruiter")]
        role: String,
        #[arg(long, default_value = "")]
        note: String,
        /// RFC 3339 timestamp, required for `schedule`.
        #[arg(long)]
        interview_date: Option<String>,
    },
    Transitions {
        #[arg(long)]
        role: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings()?;
    if let Some(api_url) = cli.api_url {
        settings.api_base_url = api_url;
    }

    let store = Arc::new(MemoryCredentialStore::new());
    if let Some(token) = cli.token.or_else(|| std::env::var("PORTAL_TOKEN").ok()) {
        store.install(Credential::new(token));
    }
    let gate = Arc::new(SessionGate::new(
        store,
        Arc::new(TracingNavigator),
        settings.login_path.clone(),
        settings.expiry_leeway(),
    ));
    let controller = DataFetchController::new(&settings, gate)?;

    match cli.command {
        Command::Login { email, password } => {
            let response = AuthClient::new(controller).login(&email, &password).await?;
            if let Some(name) = &response.name {
                eprintln!("signed in as {name}");
            }
            println!("{}", response.token);
        }
        Command::Applications { role, status } => {
            let role = parse_role(&role)?;
            let filter =
                StatusFilter::parse(&status).ok_or_else(|| anyhow!("unknown status '{status}'"))?;
            let records = list_applications(&controller, role, filter).await?;
            for record in &records {
                println!(
                    "{}  {:<28} {:<24} {}",
                    record.id,
                    record.job.display_name(),
                    record.student.display_name(),
                    record.presentation().label
                );
            }
            let counts = StatusCounts::tally(records.iter().map(|record| record.status.as_str()));
            println!(
                "{} applications, {} in progress",
                counts.total(),
                counts.in_progress()
            );
        }
        Command::Decide {
            id,
            action,
            role,
            note,
            interview_date,
        } => {
            let role = parse_role(&role)?;
            let action = parse_action(&action, role)?;
            let mut decision = Decision::new(action).with_note(note);
            if let Some(raw) = interview_date {
                let at = DateTime::parse_from_rfc3339(&raw)
                    .with_context(|| format!("invalid interview date '{raw}'"))?;
                decision = decision.scheduled_for(at.with_timezone(&Utc));
            }

            let descriptor = list_descriptor(role, StatusFilter::All);
            let key = descriptor.key().clone();
            let view = controller.mount("decide");
            if let Some(error) = view.fetch(descriptor).await.failure() {
                bail!("{error}");
            }
            let status =
                actions::perform(&view, &key, &ApplicationId::new(id), &decision, role).await?;
            println!("{}", status.presentation().label);
        }
        Command::Transitions { role } => {
            let role = role.as_deref().map(parse_role).transpose()?;
            for (from, action, to) in TRANSITIONS {
                if role.is_some_and(|role| !legal_actions(from, role).contains(&action)) {
                    continue;
                }
                println!(
                    "{:<26} --{:<30}--> {}",
                    from.as_str(),
                    action.describe(),
                    to.as_str()
                );
            }
            for status in ApplicationStatus::ALL {
                if status.is_terminal() {
                    println!("{:<26} (terminal)", status.as_str());
                }
            }
        }
    }

    Ok(())
}

fn parse_role(raw: &str) -> Result<Role> {
    Role::parse(raw).ok_or_else(|| anyhow!("unknown role '{raw}'"))
}

fn parse_action(raw: &str, role: Role) -> Result<Action> {
    match (raw.trim().to_ascii_lowercase().as_str(), role) {
        ("approve", _) => Ok(Action::MentorApprove),
        ("reject", Role::Mentor) => Ok(Action::MentorReject),
        ("reject", _) => Ok(Action::RecruiterReject),
        ("schedule", _) => Ok(Action::ScheduleInterview),
        ("hire", _) => Ok(Action::Hire),
        _ => bail!("unknown action '{raw}'"),
    }
}

fn list_descriptor(role: Role, filter: StatusFilter) -> RequestDescriptor {
    match role {
        Role::Student => resources::my_applications(),
        Role::Mentor => resources::mentor_queue(),
        Role::Recruiter | Role::Admin => resources::recruiter_applications(filter),
    }
}

async fn list_applications(
    controller: &Arc<DataFetchController>,
    role: Role,
    filter: StatusFilter,
) -> Result<Vec<ApplicationRecord>> {
    let descriptor = list_descriptor(role, filter);
    let key = descriptor.key().clone();
    let view = controller.mount("applications");
    if let Some(error) = view.fetch(descriptor).await.failure() {
        bail!("{error}");
    }
    let records: Vec<ApplicationRecord> =
        view.with_state(|state| state.records(&key, APPLICATIONS_FIELD))?;
    Ok(records
        .into_iter()
        .filter(|record| filter.matches(&record.status))
        .collect())
}
