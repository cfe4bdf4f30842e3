use super::*;

// =============================================================================
// ARGUMENTS
// =============================================================================

#[test]
fn parses_check_with_app() {
    let cli = Cli::try_parse_from(["lendgate", "--app", "portal", "check", "/loan/list?page=2"]).expect("parse");
    assert!(matches!(cli.app, AppArg::Portal));
    assert!(matches!(cli.command, Command::Check { ref path } if path == "/loan/list?page=2"));
}

#[test]
fn status_watch_defaults_off() {
    let cli = Cli::try_parse_from(["lendgate", "--app", "admin", "status"]).expect("parse");
    assert!(matches!(cli.command, Command::Status { watch: false }));
}

#[test]
fn login_requires_phone() {
    assert!(Cli::try_parse_from(["lendgate", "login", "--password", "pw"]).is_err());
}

#[test]
fn app_arg_maps_to_profile() {
    assert_eq!(AppProfile::from(AppArg::Admin), AppProfile::Admin);
    assert_eq!(AppProfile::from(AppArg::Portal), AppProfile::Portal);
}

// =============================================================================
// RENDERING
// =============================================================================

#[test]
fn verdicts_render_for_humans() {
    assert_eq!(describe_verdict(&RevalidationVerdict::Confirmed), "confirmed");
    assert_eq!(
        describe_verdict(&RevalidationVerdict::Rejected { redirect: Some("/login?redirect=/dashboard".into()) }),
        "rejected; redirect to /login?redirect=/dashboard"
    );
    assert_eq!(describe_verdict(&RevalidationVerdict::Rejected { redirect: None }), "rejected; redirect to login");
    assert_eq!(describe_verdict(&RevalidationVerdict::Tolerated), "server unreachable; session kept");
}

#[test]
fn logged_out_status_is_idle_text() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SessionStore::new(
        SessionConfig::for_app(AppProfile::Admin),
        FileStorage::open(dir.path().join("s.json")),
        SystemClock,
    );
    assert_eq!(describe_outcome(WatchOutcome::Idle, &store), "not logged in");
    assert_eq!(describe_user(&store), "current user");
}
