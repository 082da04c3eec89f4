//! cadence - entry point for the campaign delivery engine

use std::sync::Arc;

use anyhow::{Context, Result};

use cadence::config::{self, Settings};
use cadence::dns::MxValidator;
use cadence::providers::crm::{CrmBridge, HttpCrmBridge};
use cadence::providers::mail::{HttpMailProvider, MailSender};
use cadence::providers::personalization::{HttpPersonalizer, Personalizer};
use cadence::services::{
    CampaignScheduler, SendWindow, StatusReconciler, StepExecutor, WarmupPolicy,
};
use cadence::storage::SqliteRepository;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting cadence");

    let settings = Settings::load()?;

    let db_path = settings
        .database
        .path
        .clone()
        .or_else(config::default_database_path)
        .context("no database path available")?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let repository = SqliteRepository::open(&db_path).await?.into_arc();
    tracing::info!(path = %db_path.display(), "database opened");

    let mail: Arc<dyn MailSender> = Arc::new(HttpMailProvider::from_settings(&settings.mail)?);
    let mx = Arc::new(MxValidator::new(&settings.dns)?);

    let personalizer: Option<Arc<dyn Personalizer>> = match &settings.personalization {
        Some(config) => match HttpPersonalizer::from_settings(config) {
            Ok(service) => Some(Arc::new(service)),
            Err(err) => {
                tracing::warn!(error = %err, "personalization disabled");
                None
            }
        },
        None => None,
    };

    let crm: Option<Arc<dyn CrmBridge>> = match &settings.crm {
        Some(config) => match HttpCrmBridge::from_settings(config) {
            Ok(bridge) => Some(Arc::new(bridge)),
            Err(err) => {
                tracing::warn!(error = %err, "CRM sync disabled");
                None
            }
        },
        None => None,
    };

    let window = SendWindow::from_settings(&settings.sending);
    let warmup = WarmupPolicy::from_settings(&settings.sending);

    let executor = Arc::new(StepExecutor::new(
        repository.clone(),
        mail.clone(),
        mx,
        personalizer,
        window,
        warmup,
        settings.sending.inter_send_delay(),
    ));

    let scheduler = Arc::new(CampaignScheduler::new(
        repository.clone(),
        executor,
        window,
        settings.scheduler.tick_interval(),
    ));
    Arc::clone(&scheduler).start_background();

    let reconciler = Arc::new(StatusReconciler::new(
        repository,
        mail,
        crm,
        settings.scheduler.reconcile_window,
        settings.scheduler.reconcile_poll_delay(),
        settings.scheduler.reconcile_interval(),
    ));
    Arc::clone(&reconciler).start_background();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    scheduler.stop();
    reconciler.stop();

    Ok(())
}
