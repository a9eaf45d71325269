mod cli;
mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::http::{
    Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use clap::Parser;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use weathermail_api::AppStateInner;
use weathermail_db::Database;
use weathermail_report::{
    HttpMailer, LogMailer, Mailer, Notifier, ReportPipeline, WeatherResolver, run_daily_loop,
};
use weathermail_weather::OpenWeatherClient;

use crate::cli::{Cli, Command, parse_city_arg};
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weathermail=debug,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::SendNow { city } => send_now(config, city).await,
        Command::Check => check(&config),
    }
}

async fn serve(config: Config) -> Result<()> {
    let Some(jwt_secret) = config.jwt_secret.clone() else {
        eprintln!("FATAL: WEATHERMAIL_JWT_SECRET is unset or still a placeholder.");
        eprintln!("       Set it in your .env file and restart.");
        std::process::exit(1);
    };

    let db = Arc::new(Database::open(&config.db_path)?);
    let pipeline = Arc::new(build_pipeline(&config, db.clone())?);

    // Daily report task
    tokio::spawn(run_daily_loop(pipeline.clone(), config.report_time));

    let state = Arc::new(AppStateInner {
        db,
        jwt_secret,
        pipeline,
        admin_users: config.admin_users.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(false);

    let app = weathermail_api::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Weathermail listening on {}", addr);
    info!(
        "Daily report at {} UTC, cache window {} minutes",
        config.report_time.format("%H:%M"),
        config.cache_window_minutes
    );

    if config.admin_users.is_empty() {
        info!("WEATHERMAIL_ADMIN_USERS is empty; manual report runs are CLI-only");
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn send_now(config: Config, city: Option<String>) -> Result<()> {
    let only = city.as_deref().map(parse_city_arg).transpose()?;

    let db = Arc::new(Database::open(&config.db_path)?);
    let pipeline = build_pipeline(&config, db)?;

    let report = pipeline.run_once(only).await?;
    println!("{}", report.summary);
    Ok(())
}

fn check(config: &Config) -> Result<()> {
    let db = Database::open(&config.db_path)?;
    let stats = db.subscription_stats()?;

    println!("Database: {}", config.db_path.display());
    println!("Subscriptions: {} total, {} active", stats.total, stats.active);
    for entry in &stats.by_city {
        println!("  {:<10} {}", entry.city, entry.subscribers);
    }

    let status = |present: bool| if present { "set" } else { "MISSING" };
    println!("WEATHERMAIL_JWT_SECRET: {}", status(config.jwt_secret.is_some()));
    println!("WEATHER_API_KEY:        {}", status(config.weather_api_key.is_some()));
    println!("Report operators:       {}", config.admin_users.len());
    println!(
        "Mail transport:         {}",
        config.mail_api_url.as_deref().unwrap_or("log only (MAIL_API_URL unset)")
    );
    Ok(())
}

fn build_pipeline(config: &Config, db: Arc<Database>) -> Result<ReportPipeline> {
    let source = OpenWeatherClient::new(config.weather_api_key.clone(), &config.weather_api_url)?;
    if !source.has_api_key() {
        warn!("WEATHER_API_KEY is not set; every weather fetch will fail until it is");
    }

    let mailer: Arc<dyn Mailer> = match &config.mail_api_url {
        Some(url) => Arc::new(HttpMailer::new(
            url,
            config.mail_api_token.clone(),
            &config.mail_from,
        )?),
        None => {
            warn!("MAIL_API_URL is not set; reports will be written to the log instead of sent");
            Arc::new(LogMailer::new(&config.mail_from))
        }
    };

    let resolver = WeatherResolver::new(
        db.clone(),
        Arc::new(source),
        chrono::Duration::minutes(config.cache_window_minutes),
    );
    Ok(ReportPipeline::new(resolver, Notifier::new(db, mailer)))
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
