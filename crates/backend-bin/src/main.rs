// ============================
// dropmate-backend-bin/src/main.rs
// ============================
//! `dropmate` entry point: the relay server and the rich-menu tool.
use anyhow::Context;
use clap::{Parser, Subcommand};
use dropmate_backend_lib::{
    config::{LogFormat, RichMenuSettings, Settings},
    richmenu::{RichMenuClient, DEFAULT_IMAGE},
    router, AppState,
};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "dropmate", version, about = "LINE-approved locker access relay")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Manage the owner's LINE rich menu
    Richmenu {
        #[command(subcommand)]
        action: RichMenuAction,
    },
}

#[derive(Debug, Subcommand)]
enum RichMenuAction {
    /// Create the control menu, upload its image and make it the default
    Setup {
        #[arg(long, default_value = DEFAULT_IMAGE)]
        image: PathBuf,
    },
    /// List menus on the channel
    List,
    /// Delete every menu on the channel
    Clean,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Richmenu { action } => {
            init_tracing(LogFormat::Pretty);
            rich_menu(action).await
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

async fn serve() -> anyhow::Result<()> {
    let settings = Settings::load().context("invalid configuration")?;
    init_tracing(settings.log_format);

    let addr = settings.bind_addr();
    let public_base = settings.public_base().to_string();
    let app = router::create_router(AppState::new(settings));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    tracing::info!(%addr, "DROPMATE listening");
    tracing::info!("public base: {public_base}");
    tracing::info!("webhook URL: {public_base}/webhook");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

async fn rich_menu(action: RichMenuAction) -> anyhow::Result<()> {
    let settings = RichMenuSettings::load().context("invalid configuration")?;
    let client = RichMenuClient::new(settings.line_channel_access_token);

    match action {
        RichMenuAction::Setup { image } => {
            let id = client
                .setup(&settings.default_locker_id, &image)
                .await
                .context("rich menu setup failed")?;
            println!("✅ Rich menu {id} is now the default");
        }
        RichMenuAction::List => {
            let menus = client.list().await.context("cannot list rich menus")?;
            if menus.is_empty() {
                println!("No rich menus.");
            }
            for menu in menus {
                let size = menu
                    .size
                    .map(|s| format!("{}x{}", s.width, s.height))
                    .unwrap_or_else(|| "-".to_string());
                println!("{}\t{}\t{}", menu.rich_menu_id, menu.name, size);
            }
        }
        RichMenuAction::Clean => {
            let removed = client.clean().await.context("cannot clean rich menus")?;
            println!("✅ Removed {} rich menu(s)", removed.len());
        }
    }
    Ok(())
}
