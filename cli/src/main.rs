//! `lendgate` command-line client.
//!
//! SYSTEM CONTEXT
//! ==============
//! Drives the same Session Store and Route Guard as the browser apps against
//! the REST backend. The session lives in a JSON file between invocations,
//! keyed like the browser's `localStorage`.

mod file_storage;
mod http;

#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use lendgate::clock::SystemClock;
use lendgate::endpoints::{self, Endpoint};
use lendgate::envelope::{authorization_header, decode_data};
use lendgate::profile::UserProfile;
use lendgate::revalidate::{RevalidationGate, RevalidationVerdict, revalidate};
use lendgate::watch::{ExpiryWatch, WatchOutcome};
use lendgate::{ApiConfig, ApiError, AppProfile, LoginResponse, Navigation, RouteGuard, SessionConfig, SessionStore};
use serde_json::Value;

use crate::file_storage::FileStorage;
use crate::http::{HttpClient, SessionProbe};

type CliSession = SessionStore<FileStorage, SystemClock>;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] lendgate::config::ConfigError),
    #[error("http client setup failed: {0}")]
    Client(#[from] reqwest::Error),
    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),
    #[error("login response carried no usable credential")]
    Rejected,
    #[error("not logged in; run `lendgate login` first")]
    NotLoggedIn,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AppArg {
    Admin,
    Portal,
}

impl From<AppArg> for AppProfile {
    fn from(arg: AppArg) -> Self {
        match arg {
            AppArg::Admin => Self::Admin,
            AppArg::Portal => Self::Portal,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "lendgate", about = "Session and route-guard client for the lending platform")]
struct Cli {
    #[arg(long, value_enum, env = "LENDGATE_APP", default_value = "admin")]
    app: AppArg,

    /// Overrides `LENDGATE_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    #[arg(long, env = "LENDGATE_SESSION_FILE", default_value = ".lendgate-session.json")]
    session_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and persist the session.
    Login {
        #[arg(long)]
        phone: String,
        #[arg(long, env = "LENDGATE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Notify the server and clear the stored session.
    Logout,
    /// Print the signed-in profile.
    Whoami {
        /// Fetch the full profile from the server.
        #[arg(long, default_value_t = false)]
        refresh: bool,
    },
    /// Print session validity and expiry.
    Status {
        /// Keep checking at the watch interval until the session ends.
        #[arg(long, default_value_t = false)]
        watch: bool,
    },
    /// Run the route guard for a path, revalidating when due.
    Check { path: String },
    /// Authenticated GET against an API path.
    Get { path: String },
}

struct CliContext {
    http: HttpClient,
    store: CliSession,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let app = AppProfile::from(cli.app);

    let mut api = ApiConfig::from_env()?;
    if let Some(base_url) = cli.base_url.as_deref() {
        api.base_url = lendgate::config::normalize_base_url(base_url)?;
    }
    let http = HttpClient::new(api)?;

    let storage = FileStorage::open(cli.session_file);
    tracing::debug!(path = %storage.path().display(), ?app, "session file");
    let mut store = SessionStore::new(SessionConfig::for_app(app), storage, SystemClock);
    store.initialize();
    let mut ctx = CliContext { http, store };

    match cli.command {
        Command::Login { phone, password } => run_login(&mut ctx, &phone, &password).await,
        Command::Logout => run_logout(&mut ctx).await,
        Command::Whoami { refresh } => run_whoami(&mut ctx, refresh).await,
        Command::Status { watch } => run_status(&mut ctx, watch).await,
        Command::Check { path } => run_check(&mut ctx, &path).await,
        Command::Get { path } => run_get(&mut ctx, &path).await,
    }
}

async fn run_login(ctx: &mut CliContext, phone: &str, password: &str) -> Result<(), CliError> {
    let app = ctx.store.config().app;
    let body = serde_json::json!({ "phone": phone, "password": password });
    let value = ctx.http.send(&endpoints::login_for(app), None, Some(&body)).await?;
    let response: LoginResponse = decode_data(value)?;
    if !ctx.store.login(&response) {
        return Err(CliError::Rejected);
    }
    match ctx.http.request(&mut ctx.store, &endpoints::profile_for(app), None).await {
        Ok(value) => match decode_data::<UserProfile>(value) {
            Ok(profile) if !profile.id.is_empty() => ctx.store.set_profile(profile),
            Ok(_) => tracing::warn!("profile response carried no id"),
            Err(e) => tracing::warn!(error = %e, "profile response unreadable"),
        },
        Err(e) => tracing::warn!(error = %e, "profile fetch after login failed"),
    }
    println!("logged in as {}", describe_user(&ctx.store));
    Ok(())
}

async fn run_logout(ctx: &mut CliContext) -> Result<(), CliError> {
    let app = ctx.store.config().app;
    if let Some(authorization) = authorization_header(&ctx.store) {
        if let Err(e) = ctx.http.send(&endpoints::logout_for(app), Some(&authorization), None).await {
            tracing::warn!(error = %e, "server logout failed; clearing local session anyway");
        }
    }
    ctx.store.logout();
    println!("logged out");
    Ok(())
}

async fn run_whoami(ctx: &mut CliContext, refresh: bool) -> Result<(), CliError> {
    if !ctx.store.ensure_valid() {
        return Err(CliError::NotLoggedIn);
    }
    if refresh {
        let app = ctx.store.config().app;
        let value = ctx.http.request(&mut ctx.store, &endpoints::profile_for(app), None).await?;
        let profile: UserProfile = decode_data(value)?;
        ctx.store.set_profile(profile);
    }
    let profile = ctx.store.profile().cloned().unwrap_or_default();
    let mut rendered = serde_json::to_value(&profile)?;
    if let Some(map) = rendered.as_object_mut() {
        map.insert("phone".to_owned(), Value::String(profile.masked_phone()));
    }
    print_json(&rendered)
}

async fn run_status(ctx: &mut CliContext, watch: bool) -> Result<(), CliError> {
    let expiry = ExpiryWatch::from_policy(&ctx.store.config().policy);
    let outcome = expiry.tick(&mut ctx.store);
    println!("{}", describe_outcome(outcome, &ctx.store));
    if !watch || !matches!(outcome, WatchOutcome::Valid | WatchOutcome::ExpiringSoon { .. }) {
        return Ok(());
    }

    let mut interval = tokio::time::interval(expiry.interval());
    interval.tick().await;
    loop {
        interval.tick().await;
        let outcome = expiry.tick(&mut ctx.store);
        println!("{}", describe_outcome(outcome, &ctx.store));
        if matches!(outcome, WatchOutcome::Idle | WatchOutcome::Expired) {
            return Ok(());
        }
    }
}

async fn run_check(ctx: &mut CliContext, path: &str) -> Result<(), CliError> {
    let app = ctx.store.config().app;
    let guard = RouteGuard::for_app(app);
    let nav = Navigation::new(path);
    let outcome = guard.check(&mut ctx.store, &nav);

    let mut report = serde_json::json!({
        "path": &nav.full_path,
        "title": &outcome.title,
        "decision": format!("{:?}", outcome.decision),
        "target": outcome.decision.target(),
        "revalidate": outcome.revalidate,
    });

    if outcome.revalidate {
        let gate = RevalidationGate::default();
        let probe = SessionProbe::new(&ctx.http, endpoints::profile_for(app), authorization_header(&ctx.store));
        let verdict = revalidate(&gate, &mut ctx.store, &probe, &nav.full_path).await;
        if let Some(map) = report.as_object_mut() {
            map.insert("revalidation".to_owned(), Value::String(describe_verdict(&verdict)));
        }
    }
    print_json(&report)
}

async fn run_get(ctx: &mut CliContext, path: &str) -> Result<(), CliError> {
    if !ctx.store.ensure_valid() {
        return Err(CliError::NotLoggedIn);
    }
    let value = ctx.http.request(&mut ctx.store, &Endpoint::get(path), None).await?;
    print_json(&value)
}

fn describe_user(store: &CliSession) -> String {
    let phone = store.masked_phone();
    match (store.user_id(), store.role()) {
        (Some(id), Some(role)) => format!("user {id} ({}) {phone}", role.as_str()),
        (Some(id), None) => format!("user {id} {phone}"),
        _ if !phone.is_empty() => phone,
        _ => "current user".to_owned(),
    }
}

fn describe_outcome(outcome: WatchOutcome, store: &CliSession) -> String {
    match outcome {
        WatchOutcome::Idle => "not logged in".to_owned(),
        WatchOutcome::Valid => {
            let expiry = store.token_expiry_ms().unwrap_or_default();
            let remaining_secs = (expiry - store.now_ms()).max(0) / 1000;
            format!("valid: {} (expires in {remaining_secs}s)", describe_user(store))
        }
        WatchOutcome::ExpiringSoon { remaining_ms } => {
            format!("expiring soon: {}s left, log in again to continue", remaining_ms.max(0) / 1000)
        }
        WatchOutcome::Expired => "session expired; stored credentials cleared".to_owned(),
    }
}

fn describe_verdict(verdict: &RevalidationVerdict) -> String {
    match verdict {
        RevalidationVerdict::Confirmed => "confirmed".to_owned(),
        RevalidationVerdict::Rejected { redirect } => {
            format!("rejected; redirect to {}", redirect.as_deref().unwrap_or("login"))
        }
        RevalidationVerdict::Tolerated => "server unreachable; session kept".to_owned(),
        RevalidationVerdict::Stale => "superseded".to_owned(),
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
