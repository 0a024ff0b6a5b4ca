//! Command implementations.

use std::sync::Arc;

use aid_auth::{AuthError, AuthErrorKind, TokenSession};
use aid_core::{HttpTransport, JsonFileSettings, ReqwestTransport, SettingsStore};
use aid_updater::{UpdateState, Updater};
use anyhow::Context;
use chrono::{TimeZone, Utc};
use tracing::{debug, warn};

use crate::cli::{Commands, LoginArgs};
use crate::config::Config;
use crate::ExitCode;

/// Execute `command` against the resolved configuration.
pub async fn execute(command: Commands, config: Config) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Check => check(&config, false).await,
        Commands::Apply => check(&config, true).await,
        Commands::Login(args) => login(&config, args).await,
        Commands::Logout => logout(&config),
        Commands::Status => status(&config),
    }
}

fn transport(config: &Config, show_progress: bool) -> anyhow::Result<Arc<dyn HttpTransport>> {
    let mut transport =
        ReqwestTransport::new(&config.network).context("failed to create HTTP client")?;
    if show_progress {
        transport.set_progress_callback(|progress| eprint!("\rDownloading: {progress}   "));
    }
    Ok(Arc::new(transport))
}

fn settings(config: &Config) -> anyhow::Result<Arc<dyn SettingsStore>> {
    let path = config.settings_path()?;
    debug!(path = %path.display(), "Opening settings");
    let store = JsonFileSettings::open(&path)
        .with_context(|| format!("failed to open settings at {}", path.display()))?;
    Ok(Arc::new(store))
}

fn session(config: &Config, transport: Arc<dyn HttpTransport>) -> anyhow::Result<TokenSession> {
    Ok(TokenSession::new(config.auth.clone(), transport, settings(config)?))
}

async fn check(config: &Config, apply: bool) -> anyhow::Result<ExitCode> {
    let transport = transport(config, apply)?;
    let mut updater = Updater::new(config.updater.clone(), transport.clone())?;

    let state = updater.check().await;
    print_update_status(&updater);

    if let Some(ttl) = updater.token_ttl_hint() {
        match i64::try_from(ttl) {
            Ok(ttl) => {
                if let Err(e) = session(config, transport)?.set_ttl(ttl) {
                    warn!(error = %e, "Failed to store token lifetime");
                }
            }
            Err(_) => warn!(ttl, "Ignoring out-of-range token lifetime"),
        }
    }

    match state {
        UpdateState::FailedCheck => return Ok(ExitCode::ConnectionFailed),
        UpdateState::Available if apply => {}
        _ => return Ok(ExitCode::Success),
    }

    let state = updater.apply().await?;
    eprintln!();
    print_update_status(&updater);

    Ok(match state {
        UpdateState::RestartRequired => {
            println!("Restart the application to use version {}.", updater.current_version());
            ExitCode::Success
        }
        _ => ExitCode::UpdateFailed,
    })
}

fn print_update_status(updater: &Updater) {
    let status = updater.status();
    println!("state:           {}", status.state);
    println!("current version: {}", updater.current_version());
    if !status.latest_version.is_empty() {
        println!("latest version:  {}", status.latest_version);
    }
    if !status.error.is_empty() {
        println!("error:           {}", status.error);
    }
}

async fn login(config: &Config, args: LoginArgs) -> anyhow::Result<ExitCode> {
    let mut session = session(config, transport(config, false)?)?;

    match session.login(&args.username, &args.password).await {
        Ok(()) => {
            println!("Logged in as {}.", session.subject_id());
            Ok(ExitCode::Success)
        }
        Err(e) => {
            eprintln!("Login failed: {e}");
            Ok(exit_code_for(&e))
        }
    }
}

fn exit_code_for(error: &AuthError) -> ExitCode {
    match error.kind() {
        AuthErrorKind::Rejected => ExitCode::AuthenticationFailed,
        AuthErrorKind::Network => ExitCode::ConnectionFailed,
        AuthErrorKind::Input => ExitCode::InvalidInput,
        AuthErrorKind::Protocol | AuthErrorKind::Storage => ExitCode::GeneralError,
    }
}

fn logout(config: &Config) -> anyhow::Result<ExitCode> {
    let mut session = session(config, transport(config, false)?)?;
    session.logout()?;
    println!("Logged out.");
    Ok(ExitCode::Success)
}

fn status(config: &Config) -> anyhow::Result<ExitCode> {
    let mut session = session(config, transport(config, false)?)?;

    if session.is_valid() {
        println!("session:         active");
        println!("worker id:       {}", session.subject_id());
        if let Some(expires) = session
            .record()
            .expires_at()
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
        {
            println!("expires:         {}", expires.to_rfc3339());
        }
    } else {
        println!("session:         none");
    }
    println!("token lifetime:  {}s", session.ttl_seconds());

    println!("manifest url:    {}", config.updater.manifest_url);
    println!("plugin dir:      {}", config.updater.plugin_dir.display());
    println!("current version: {}", config.updater.current_version);
    Ok(ExitCode::Success)
}
