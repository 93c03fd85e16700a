use anyhow::Context;
use service_core::observability::{init_tracing, LogFormat};
use tenant_identity::config::get_configuration;
use tenant_identity::flow::{AuthEvent, AuthFlowState};
use tenant_identity::guards::RouteData;
use tenant_identity::models::{ChallengeChannel, SessionStatus};
use tenant_identity::IdentityContext;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration - fail fast if invalid
    let settings = get_configuration().context("Failed to load configuration")?;

    init_tracing(
        &settings.client.name,
        &settings.client.log_level,
        LogFormat::parse(&settings.client.log_format),
    )?;

    tracing::info!(
        client = %settings.client.name,
        api = %settings.api.base_url,
        location = %settings.client.location_url,
        "Starting identity client"
    );

    let identity = IdentityContext::from_settings(settings)?;

    if std::env::args().any(|a| a == "--logout") {
        identity.session.init().await;
        identity.logout(Some("signed_out")).await;
        println!("Signed out.");
        return Ok(());
    }

    let mut input = BufReader::new(tokio::io::stdin()).lines();

    if identity.session.init().await != SessionStatus::Authenticated {
        sign_in(&identity, &mut input).await?;
    }

    let return_url = std::env::args().nth(1).filter(|a| a.starts_with('/'));
    let destination = identity.post_login_router().route(return_url.as_deref()).await;
    println!("Landing on {}", destination);

    if let Some(tenant) = identity.tenant_context.active() {
        println!("Active tenant: {} ({})", tenant.tenant_name, tenant.tenant_slug);
        let outcome = identity
            .tenant_guard()
            .can_activate(&RouteData::protected())
            .await;
        tracing::info!(?outcome, "Tenant guard check for protected routes");
    }

    Ok(())
}

async fn sign_in(identity: &IdentityContext, input: &mut Input) -> anyhow::Result<()> {
    let flow = identity.auth_flow();
    flow.dispatch(AuthEvent::Reset).await;

    loop {
        let state = flow.state();
        if let Some(message) = state.message() {
            println!("{}", message);
        }

        let prompt = match &state {
            AuthFlowState::Authenticated { redirect_url } => {
                tracing::info!(redirect = %redirect_url, "Signed in");
                return Ok(());
            }
            AuthFlowState::CollectIdentifier { channel, .. } => {
                format!("Email or phone [{}] (:email, :sms to switch): ", channel)
            }
            AuthFlowState::ChallengeSent { challenge, .. } => format!(
                "Code (:resend in {}s, :cancel): ",
                challenge.cooldown_remaining
            ),
            AuthFlowState::MfaRequired { providers, .. } => {
                format!("Second factor code [{}]: ", providers.join(", "))
            }
            AuthFlowState::LockedOut { until, .. } => {
                anyhow::bail!("Locked out until {}", until)
            }
            AuthFlowState::Error { .. } => "Press enter to start over: ".to_string(),
            _ => String::new(),
        };

        print!("{}", prompt);
        std::io::Write::flush(&mut std::io::stdout())?;
        let Some(line) = input.next_line().await? else {
            anyhow::bail!("Input closed before sign-in finished");
        };
        let line = line.trim().to_string();

        let event = match (&state, line.as_str()) {
            (_, ":cancel") | (AuthFlowState::Error { .. }, _) => AuthEvent::Reset,
            (_, ":email") => AuthEvent::ChooseChannel(ChallengeChannel::EmailOtp),
            (_, ":sms") => AuthEvent::ChooseChannel(ChallengeChannel::SmsOtp),
            (_, ":resend") => AuthEvent::Resend,
            (AuthFlowState::CollectIdentifier { .. }, _) => AuthEvent::SubmitIdentifier {
                identifier: line.clone(),
            },
            (AuthFlowState::ChallengeSent { .. }, _) => AuthEvent::SubmitOtp { code: line.clone() },
            (AuthFlowState::MfaRequired { .. }, _) => AuthEvent::SubmitMfa {
                code: line.clone(),
                provider: None,
            },
            _ => continue,
        };
        flow.dispatch(event).await;
    }
}
