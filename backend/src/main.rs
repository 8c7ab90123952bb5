//! Command-line front end for the EggGo client core.
//!
//! Each invocation behaves like one page load of a browser tab: restore the
//! tab's session snapshot, mount the auth synchronizer, run one command, then
//! tear the synchronizer down and persist the provider session.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use eggo::auth::{Access, RegisterForm, SessionStore, SignInForm};
use eggo::config::Config;
use eggo::errors::AppError;
use eggo::navigation::{routes, MAINTENANCE_MENU};
use eggo::storage::{FileSessionStorage, SessionStorage};
use eggo::AppContext;
use eggo_adapters::{Session, SupabaseClient};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Storage key of the provider session, next to the store snapshot.
const PROVIDER_SESSION_KEY: &str = "provider-session";

const USAGE: &str = "eggo <command>

COMMANDS:
  status                                  Show identity, roles and sidebar
  sign-in <email> <password>
  register <email> <password> <full name> <username> [--admin <code>]
  sign-out
  refresh                                 Refresh the provider session
  open <path>                             Check access to a route
  dashboard                               Recent orders
  admin <users|condominiums|delivery-windows|payment-methods|egg-sizes>

ENVIRONMENT:
  SUPABASE_URL, SUPABASE_ANON_KEY (required), ADMIN_SECRET_CODE,
  EGGGO_SESSION_DIR, EGGGO_TAB_ID, EGGGO_REQUEST_TIMEOUT_SECS";

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"));
    match filter {
        Ok(filter) => fmt().with_env_filter(filter).init(),
        Err(_) => fmt().init(),
    }

    let args: Vec<String> = env::args().skip(1).collect();
    if let Err(err) = run(&args).await {
        warn!(error = %err, "command failed");
        eprintln!("{}", err.user_message());
        std::process::exit(1);
    }
}

async fn run(args: &[String]) -> Result<(), AppError> {
    let Some(command) = args.first().map(String::as_str) else {
        println!("{}", USAGE);
        return Ok(());
    };
    if matches!(command, "help" | "--help" | "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = Config::load()?;
    let storage: Arc<dyn SessionStorage> =
        Arc::new(FileSessionStorage::new(&config.session_dir, &config.tab_id)?);

    let client = Arc::new(
        SupabaseClient::new(
            &config.supabase_url,
            &config.supabase_anon_key,
            config.request_timeout,
        )?
        .with_session(load_provider_session(storage.as_ref())),
    );
    let store = Arc::new(SessionStore::restore(storage.clone()));
    let ctx = AppContext::new(
        client.clone(),
        client.clone(),
        store,
        config.admin_secret_code.clone(),
    );
    info!(tab = %config.tab_id, "mounting auth synchronizer");
    let handle = ctx.mount().await;

    let result = dispatch(&ctx, &client, command, &args[1..], config.request_timeout).await;

    handle.teardown().await;
    save_provider_session(storage.as_ref(), client.session())?;
    result
}

async fn dispatch(
    ctx: &AppContext,
    client: &SupabaseClient,
    command: &str,
    args: &[String],
    timeout: Duration,
) -> Result<(), AppError> {
    match command {
        "status" => {
            print_status(ctx);
            Ok(())
        }
        "sign-in" => {
            let [email, password] = args else {
                return Err(usage("sign-in <email> <password>"));
            };
            let navigation = ctx.router.watch();
            ctx.auth.sign_in(&SignInForm::new(email, password)).await?;
            settle(navigation, timeout).await;
            print_status(ctx);
            Ok(())
        }
        "register" => {
            let form = register_form(args)?;
            let navigation = ctx.router.watch();
            let outcome = ctx.auth.sign_up(&form).await?;
            if outcome.session.is_some() {
                settle(navigation, timeout).await;
            } else {
                println!("Check your email to confirm the account, then sign in.");
            }
            print_status(ctx);
            Ok(())
        }
        "sign-out" => {
            let navigation = ctx.router.watch();
            ctx.auth.sign_out().await?;
            settle(navigation, timeout).await;
            println!("Signed out.");
            Ok(())
        }
        "refresh" => {
            let navigation = ctx.router.watch();
            client.refresh_session().await?;
            settle(navigation, timeout).await;
            print_status(ctx);
            Ok(())
        }
        "open" => {
            let [path] = args else {
                return Err(usage("open <path>"));
            };
            match ctx.authorize(path) {
                Access::Allowed => println!("{}: allowed", path),
                Access::RequiresLogin => println!("{}: sign in first ({})", path, routes::HOME),
                Access::Forbidden => println!("{}: not available for your role", path),
            }
            Ok(())
        }
        "dashboard" => {
            if ctx.authorize(routes::DASHBOARD) != Access::Allowed {
                println!("Sign in to see the dashboard.");
                return Ok(());
            }
            let orders = ctx.dashboard.recent_orders(&ctx.store).await;
            if orders.is_empty() {
                println!("No orders yet.");
            }
            for order in orders {
                println!(
                    "{}  {}  {:.2}  {}",
                    order.short_label(),
                    order.status_name().unwrap_or("-"),
                    order.total_amount,
                    order.created_at.format("%Y-%m-%d %H:%M"),
                );
            }
            Ok(())
        }
        "admin" => admin(ctx, args).await,
        other => Err(usage(&format!("unknown command `{}`", other))),
    }
}

async fn admin(ctx: &AppContext, args: &[String]) -> Result<(), AppError> {
    let Some(screen) = args.first() else {
        for link in MAINTENANCE_MENU {
            println!("{:<18} {}", link.label, link.description);
        }
        return Ok(());
    };
    let path = format!("/admin/{}", screen);
    match ctx.authorize(&path) {
        Access::Allowed => {}
        Access::RequiresLogin => return Err(usage("sign in first")),
        Access::Forbidden => return Err(usage("the admin screens need the admin role")),
    }

    match screen.as_str() {
        "users" => {
            for user in ctx.admin.users().await {
                println!(
                    "{}  {}  {}",
                    user.id,
                    user.email.as_deref().unwrap_or("-"),
                    user.full_name.as_deref().unwrap_or("-"),
                );
            }
        }
        "condominiums" => {
            for condo in ctx.admin.condominiums().await {
                println!(
                    "{}  {}  lobby={}  active={}",
                    condo.name,
                    condo.kind.as_ref().map(|k| k.name.as_str()).unwrap_or("-"),
                    condo.has_lobby,
                    condo.is_active,
                );
            }
        }
        "delivery-windows" => {
            for window in ctx.admin.delivery_windows().await {
                println!(
                    "{:<9} {}-{}  {}",
                    window.day_label(),
                    window.start_time,
                    window.end_time,
                    window.condominium.as_ref().map(|c| c.name.as_str()).unwrap_or("-"),
                );
            }
        }
        "payment-methods" => {
            for method in ctx.admin.payment_methods().await {
                println!("{}  active={}", method.name, method.is_active);
            }
        }
        "egg-sizes" => {
            for size in ctx.admin.egg_sizes().await {
                println!("{}  {:.2}", size.name, size.price);
            }
        }
        other => return Err(usage(&format!("unknown admin screen `{}`", other))),
    }
    Ok(())
}

fn register_form(args: &[String]) -> Result<RegisterForm, AppError> {
    let (admin_code, rest) = match args {
        [rest @ .., flag, code] if flag == "--admin" => (Some(code.clone()), rest),
        rest => (None, rest),
    };
    let [email, password, full_name, username] = rest else {
        return Err(usage(
            "register <email> <password> <full name> <username> [--admin <code>]",
        ));
    };
    Ok(RegisterForm {
        email: email.clone(),
        password: password.clone(),
        full_name: full_name.clone(),
        username: username.clone(),
        as_admin: admin_code.is_some(),
        admin_code,
    })
}

fn print_status(ctx: &AppContext) {
    match ctx.store.identity() {
        Some(identity) => println!(
            "Signed in as {}",
            identity.email.as_deref().unwrap_or(&identity.id)
        ),
        None => println!("Not signed in."),
    }
    let roles = ctx.store.held_roles();
    if !roles.is_empty() {
        println!("Roles: {}", roles.join(", "));
    }
    for entry in ctx.sidebar() {
        println!("  {:<12} {}", entry.label, entry.href);
    }
}

/// Waits for the synchronizer to navigate after an auth call.
async fn settle(mut navigation: watch::Receiver<String>, timeout: Duration) {
    if tokio::time::timeout(timeout, navigation.changed()).await.is_err() {
        warn!("timed out waiting for the session change to apply");
    }
}

fn usage(message: &str) -> AppError {
    AppError::Usage(format!("{}\n\n{}", message, USAGE))
}

fn load_provider_session(storage: &dyn SessionStorage) -> Option<Session> {
    match storage.get(PROVIDER_SESSION_KEY) {
        Ok(Some(raw)) => serde_json::from_str(&raw)
            .map_err(|err| warn!(error = %err, "discarding undecodable provider session"))
            .ok(),
        Ok(None) => None,
        Err(err) => {
            warn!(error = %err, "failed to read provider session");
            None
        }
    }
}

fn save_provider_session(
    storage: &dyn SessionStorage,
    session: Option<Session>,
) -> Result<(), AppError> {
    let Some(session) = session else {
        storage.remove(PROVIDER_SESSION_KEY)?;
        return Ok(());
    };
    match serde_json::to_string(&session) {
        Ok(raw) => storage.set(PROVIDER_SESSION_KEY, &raw)?,
        Err(err) => warn!(error = %err, "failed to encode provider session"),
    }
    Ok(())
}
