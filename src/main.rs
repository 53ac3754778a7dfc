
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use codespace_auth::config::{AuthConfig, ConfigError};
use codespace_auth::nav::{AUTH_ROUTE, Navigator};
use codespace_auth::notify::{Notification, Notifier, Severity};
use codespace_auth::provider::{GoTrueClient, IdentityProvider, OAuthProvider, ProviderError};
use codespace_auth::screen::{AuthScreen, RequestOutcome, ScreenDeps};
use codespace_auth::state::auth_form::{AuthMode, SubmitRejected};
use reqwest::Url;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Notify;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Provider(#[from] ProviderError),
    #[error("form rejected: {0}")]
    Rejected(#[from] SubmitRejected),
    #[error("invalid screen location: {0}")]
    InvalidLocation(String),
    #[error("request was discarded before it settled")]
    Discarded,
    #[error("no session established within {0}s")]
    NoSession(u64),
    #[error("failed to read callback code: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "codespace-auth", about = "Sign in to CodeSpace from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with email and password.
    SignIn {
        #[arg(long, env = "CODESPACE_EMAIL")]
        email: String,
        #[arg(long, env = "CODESPACE_PASSWORD")]
        password: String,
    },
    /// Create an account.
    SignUp {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign in through an external provider (github or google).
    Oauth { provider: OAuthProvider },
}

/// Prints route changes and wakes the CLI once the screen leaves `/auth`.
#[derive(Default)]
struct CliNavigator {
    navigated: Notify,
}

impl Navigator for CliNavigator {
    fn navigate(&self, route: &str) {
        println!("-> {route}");
        self.navigated.notify_one();
    }

    fn redirect_external(&self, url: &str) {
        println!("Open this URL in your browser to continue:\n  {url}");
    }
}

struct CliNotifier;

impl Notifier for CliNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Default => println!("{}: {}", notification.title, notification.description),
            Severity::Destructive => eprintln!("{}: {}", notification.title, notification.description),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = AuthConfig::from_env()?;
    let client = Arc::new(GoTrueClient::new(&config)?);
    let navigator = Arc::new(CliNavigator::default());

    let mode = match cli.command {
        Command::SignUp { .. } => AuthMode::SignUp,
        Command::SignIn { .. } | Command::Oauth { .. } => AuthMode::SignIn,
    };
    let location = screen_location(&config.app_origin, mode)?;
    let deps = ScreenDeps::from_config(
        &config,
        Arc::clone(&client) as Arc<dyn IdentityProvider>,
        Arc::clone(&navigator) as Arc<dyn Navigator>,
        Arc::new(CliNotifier),
    );
    let screen = AuthScreen::mount(deps, &location);

    match cli.command {
        Command::SignIn { email, password } => {
            screen.form.set_email(email);
            screen.form.set_password(password);
            expect_success(screen.form.submit_credentials()?.settled().await)?;
        }
        Command::SignUp { name, email, password } => {
            screen.form.set_name(name);
            screen.form.set_email(email);
            screen.form.set_password(password);
            if expect_success(screen.form.submit_credentials()?.settled().await)? == Settled::AwaitingConfirmation {
                screen.unmount();
                println!("Confirm your email address, then run `codespace-auth sign-in`.");
                return Ok(());
            }
        }
        Command::Oauth { provider } => {
            expect_success(screen.form.sign_in_with_provider(provider).settled().await)?;
            let code = read_callback_code().await?;
            client.exchange_code_for_session(&code).await?;
        }
    }

    let wait_secs = config.timeouts.request_secs;
    let navigated = tokio::time::timeout(Duration::from_secs(wait_secs), navigator.navigated.notified()).await;
    screen.unmount();

    if navigated.is_err() {
        return Err(CliError::NoSession(wait_secs));
    }

    if let Some(user) = client
        .get_current_session()
        .await?
        .and_then(|session| session.user)
    {
        let who = user.display_name().or(user.email.as_deref()).unwrap_or("unknown");
        println!("signed in as {who} ({})", user.id);
    }
    Ok(())
}

fn screen_location(app_origin: &str, mode: AuthMode) -> Result<Url, CliError> {
    let mut url = Url::parse(app_origin)
        .and_then(|origin| origin.join(AUTH_ROUTE))
        .map_err(|e| CliError::InvalidLocation(e.to_string()))?;
    if mode == AuthMode::SignUp {
        url.set_query(Some("mode=signup"));
    }
    Ok(url)
}

/// How a successful request left things.
#[derive(Debug, PartialEq, Eq)]
enum Settled {
    SessionExpected,
    AwaitingConfirmation,
}

fn expect_success(outcome: RequestOutcome) -> Result<Settled, CliError> {
    match outcome {
        RequestOutcome::Succeeded => Ok(Settled::SessionExpected),
        RequestOutcome::ConfirmationPending => Ok(Settled::AwaitingConfirmation),
        RequestOutcome::Failed(e) => Err(CliError::Provider(e)),
        RequestOutcome::Discarded => Err(CliError::Discarded),
    }
}

/// The OAuth callback lands on `/editor?code=...`; the user pastes the code
/// (or the whole callback URL) back into the terminal.
async fn read_callback_code() -> Result<String, CliError> {
    println!("Paste the callback URL or its `code` parameter:");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    Ok(extract_code(line.trim()))
}

fn extract_code(input: &str) -> String {
    Url::parse(input)
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "code")
                .map(|(_, value)| value.into_owned())
        })
        .unwrap_or_else(|| input.to_owned())
}
