use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use ferdi_session::authz::{self, RoleId};
use ferdi_session::clock::{Clock, SystemClock};
use ferdi_session::guards::{AuthGate, GateOutcome, RoleGate, RoleOutcome};
use ferdi_session::models::{CompanyDetails, ManagerDetails, SignupRequest};
use ferdi_session::session::{LogoutReason, SessionController};
use ferdi_session::storage::{FileStore, SessionStorage};
use ferdi_session::utils::format_remaining;
use ferdi_session::{HttpIdentityApi, SessionConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "FERDI session client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in and persist the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "FERDI_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Close the current session
    Logout,
    /// Show the signed-in identity and session countdown
    Whoami,
    /// Run an authentication check
    Check {
        /// Ignore the identity cache and ask the backend
        #[arg(long)]
        skip_cache: bool,
    },
    /// Check a permission for the current session or for an explicit role
    Can {
        permission: String,
        #[arg(long)]
        role: Option<String>,
    },
    /// Simulate navigating to a route through both gates
    Open {
        path: String,
        /// Role ids allowed on the page (repeatable)
        #[arg(long = "allow-role")]
        allow_roles: Vec<String>,
        /// Permissions required on the page (repeatable)
        #[arg(long = "require")]
        required_permissions: Vec<String>,
    },
    /// Create a user account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long, env = "FERDI_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        mobile: Option<String>,
        #[arg(long)]
        company_code: Option<String>,
    },
    /// Register a company together with its manager account
    RegisterCompany {
        #[arg(long)]
        name: String,
        #[arg(long)]
        siret: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        postal_code: Option<String>,
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        company_email: Option<String>,
        #[arg(long)]
        manager_email: String,
        #[arg(long, env = "FERDI_PASSWORD", hide_env_values = true)]
        manager_password: String,
        #[arg(long)]
        manager_first_name: String,
        #[arg(long)]
        manager_last_name: String,
        #[arg(long)]
        manager_phone: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let cli = Cli::parse();
    let config = SessionConfig::from_env().context("invalid FERDI_* configuration")?;
    let controller = build_controller(config)?;

    match cli.command {
        Commands::Login { email, password } => {
            let identity = controller.login(&email, &password).await?;
            println!(
                "Signed in as {} ({}), home: {}",
                identity.display_name(),
                controller.role_name(),
                controller.dashboard_path()
            );
        }
        Commands::Logout => {
            if controller.logout(LogoutReason::UserRequested) {
                println!("Signed out");
            } else {
                println!("No active session");
            }
        }
        Commands::Whoami => whoami(&controller).await?,
        Commands::Check { skip_cache } => {
            let check = controller.check_auth(skip_cache).await?;
            println!("{}", serde_json::to_string_pretty(&check)?);
        }
        Commands::Can { permission, role } => {
            let allowed = match role {
                Some(role) => authz::role_satisfies(&RoleId::new(role), &permission),
                None => {
                    controller.check_auth(false).await?;
                    controller.has_permission(&permission)
                }
            };
            println!("{}", if allowed { "yes" } else { "no" });
            if !allowed {
                std::process::exit(1);
            }
        }
        Commands::Open {
            path,
            allow_roles,
            required_permissions,
        } => {
            let gate = RoleGate::new()
                .allow_roles(allow_roles)
                .require_permissions(required_permissions);
            open(controller, &path, gate).await?;
        }
        Commands::Signup {
            email,
            password,
            first_name,
            last_name,
            mobile,
            company_code,
        } => {
            let identity = controller
                .register_user(SignupRequest {
                    email,
                    password,
                    first_name,
                    last_name,
                    mobile,
                    company_code,
                })
                .await?;
            println!("Account created for {}", identity.email);
        }
        Commands::RegisterCompany {
            name,
            siret,
            address,
            city,
            postal_code,
            country,
            phone,
            company_email,
            manager_email,
            manager_password,
            manager_first_name,
            manager_last_name,
            manager_phone,
        } => {
            let company = CompanyDetails {
                name,
                siret,
                address,
                city,
                postal_code,
                country,
                phone,
                email: company_email,
            };
            let manager = ManagerDetails {
                email: manager_email,
                password: manager_password,
                first_name: manager_first_name,
                last_name: manager_last_name,
                phone: manager_phone,
            };
            let registration = controller.register_company(company, manager).await?;
            println!("Company code: {}", registration.company_code);
            if let Some(message) = registration.message {
                println!("{message}");
            }
        }
    }

    Ok(())
}

fn build_controller(config: SessionConfig) -> anyhow::Result<Arc<SessionController>> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(FileStore::new(config.store_path.clone()));
    let storage = SessionStorage::new(store, clock.clone(), config.storage_retention);
    let api = Arc::new(HttpIdentityApi::from_config(&config)?);

    Ok(Arc::new(SessionController::new(api, storage, clock, config)))
}

async fn whoami(controller: &SessionController) -> anyhow::Result<()> {
    let check = controller.check_auth(false).await?;
    if !check.authenticated {
        println!("Not signed in ({})", check.reason);
        return Ok(());
    }

    let identity = controller
        .identity()
        .context("session reported authenticated without an identity")?;
    println!("{} <{}>", identity.display_name(), identity.email);
    println!("role:      {} ({})", controller.role_name(), identity.role);
    if let Some(organization) = controller.organization() {
        println!("company:   {} [{}]", organization.name, organization.status.as_str());
    }
    println!("dashboard: {}", controller.dashboard_path());
    if let Some(info) = controller.session_info() {
        println!("session:   {} left", format_remaining(info.remaining));
    }
    Ok(())
}

async fn open(controller: Arc<SessionController>, path: &str, gate: RoleGate) -> anyhow::Result<()> {
    let mut auth_gate = AuthGate::new(controller.clone());

    match auth_gate.navigate(path).await {
        GateOutcome::Render { .. } if auth_gate.is_public(path) => {
            println!("render {path} (public)");
            return Ok(());
        }
        GateOutcome::Render { notice } => {
            if let Some(notice) = notice {
                println!("{}", notice.message());
            }
        }
        GateOutcome::Redirect { to, notice } => {
            if let Some(notice) = notice {
                println!("{}", notice.message());
            }
            println!("redirect {to}");
            return Ok(());
        }
        GateOutcome::Failed { message, retries_left } => {
            anyhow::bail!("{message} ({retries_left} retries left)");
        }
        GateOutcome::RetriesExhausted => anyhow::bail!("too many attempts"),
    }

    if let Some(principal) = controller.principal() {
        if !authz::can_access_path(&principal.role, path) {
            println!("redirect {}", controller.dashboard_path());
            return Ok(());
        }
    }

    match gate.check(&controller).await? {
        RoleOutcome::Authorized => println!("render {path}"),
        RoleOutcome::Unauthorized(view) => print!("{view}"),
        RoleOutcome::Redirect(to) => println!("redirect {to}"),
    }
    Ok(())
}

fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
