//! Server module managing process lifecycle.
//!
//! The composition root: builds the connection pool, repositories,
//! notification providers, the job scheduler, and the HTTP server, then
//! runs until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;

use crate::api::routes::create_router;
use crate::config::{Environment, settings::Settings};
use crate::db::{establish_async_connection_pool, run_pending_migrations};
use crate::error::{AppError, AppResult};
use crate::external::HttpEventCollector;
use crate::jobs::tasks::{DataCollectionTask, EventCollector, NotificationDispatchTask};
use crate::jobs::{FailureNotifier, JobDescriptor, JobKind, JobRegistry, JobScheduler};
use crate::models::ChannelType;
use crate::repositories::Repositories;
use crate::services::notifications::{
    EmailProvider, NoopFailureNotifier, NotificationDispatcher, Notifier, NotifierRegistry,
    OpsNotifier, WebhookProvider,
};
use crate::state::AppState;

/// HTTP server manager
pub struct Server {
    settings: Settings,
}

impl Server {
    /// Create a new server with the given settings
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Start the server and run until shutdown signal.
    pub async fn run(self) -> anyhow::Result<()> {
        tracing::info!(
            app_name = %self.settings.application.name,
            app_version = %self.settings.application.version,
            environment = %Environment::from_env().as_str(),
            "Application starting"
        );
        tracing::info!(
            host = %self.settings.server.host,
            port = %self.settings.server.port,
            "Server configuration loaded"
        );
        tracing::info!(
            jobs_enabled = %self.settings.jobs.enabled,
            collector_interval_hours = %self.settings.jobs.collector_interval_hours,
            dispatch_interval_hours = %self.settings.jobs.dispatch_interval_hours,
            failure_threshold = %self.settings.jobs.failure_threshold,
            "Jobs configuration loaded"
        );

        tracing::info!("Initializing database connection pool...");
        let pool = establish_async_connection_pool(&self.settings.database).await?;
        tracing::info!("Database connection pool initialized");

        if self.settings.database.auto_migrate {
            let applied = run_pending_migrations(&self.settings.database).await?;
            tracing::info!(applied, "Pending migrations applied");
        }

        let repos = Repositories::new(pool.clone());

        let scheduler = if self.settings.jobs.enabled {
            let scheduler = Arc::new(build_scheduler(&self.settings, &repos).await?);
            scheduler.start().await?;
            Some(scheduler)
        } else {
            tracing::info!("Job scheduling is disabled in settings");
            None
        };

        let state = AppState::new(pool, scheduler.clone());
        let router = create_router(state);

        let address = self.settings.server.address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!(error = %e, address = %address, "Failed to bind to address");
            anyhow::anyhow!("Failed to bind to {}: {}", address, e)
        })?;
        tracing::info!(address = %address, "Server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        // The HTTP side is down; stop dispatching new job ticks. In-flight
        // ticks finish on their own.
        if let Some(scheduler) = &scheduler {
            if let Err(e) = scheduler.shutdown().await {
                tracing::error!(error = %e, "Error shutting down job scheduler");
            }
        }

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// Wires the two recurring jobs and everything they depend on.
async fn build_scheduler(settings: &Settings, repos: &Repositories) -> AppResult<JobScheduler> {
    let mut notifiers = NotifierRegistry::new();
    notifiers.register(ChannelType::Webhook, Arc::new(WebhookProvider::new()));
    if settings.notifications.smtp.host.is_empty() {
        tracing::info!("SMTP host not configured, email delivery is unavailable");
    } else {
        notifiers.register(
            ChannelType::Email,
            Arc::new(EmailProvider::new(&settings.notifications.smtp)?),
        );
    }

    let failure_notifier: Arc<dyn FailureNotifier> = if settings.notifications.ops.enabled {
        let ops = &settings.notifications.ops;
        let channel = match ops.channel.as_str() {
            "email" => ChannelType::Email,
            _ => ChannelType::Webhook,
        };
        let provider: Arc<dyn Notifier> =
            notifiers.get(channel).ok_or_else(|| AppError::Configuration {
                key: "notifications.ops.channel".to_string(),
                source: anyhow::Error::msg(format!(
                    "No provider available for ops alert channel {:?}",
                    channel
                )),
            })?;
        Arc::new(OpsNotifier::new(provider, ops.destination_address.clone()))
    } else {
        Arc::new(NoopFailureNotifier)
    };

    let collector: Arc<dyn EventCollector> = Arc::new(HttpEventCollector::new(
        &settings.collector,
        repos.events.clone(),
    ));
    let dispatcher = Arc::new(NotificationDispatcher::new(
        Arc::new(repos.notify_settings.clone()),
        Arc::new(repos.events.clone()),
        Arc::new(notifiers),
        settings.notifications.digest_subject.clone(),
        settings.jobs.unprocessed_page_size,
    ));

    let mut registry = JobRegistry::new();
    registry.register(JobDescriptor {
        kind: JobKind::DataCollection,
        interval: Duration::from_secs(settings.jobs.collector_interval_hours * 3600),
        startup_delay: Some(Duration::from_secs(
            settings.jobs.collector_startup_delay_seconds,
        )),
        max_instances: 1,
        task: Arc::new(DataCollectionTask::new(collector)),
    });
    registry.register(JobDescriptor {
        kind: JobKind::NotificationDispatch,
        interval: Duration::from_secs(settings.jobs.dispatch_interval_hours * 3600),
        startup_delay: Some(Duration::from_secs(
            settings.jobs.dispatch_startup_delay_seconds,
        )),
        max_instances: 1,
        task: Arc::new(NotificationDispatchTask::new(dispatcher)),
    });

    JobScheduler::new(
        registry,
        Arc::new(repos.executions.clone()),
        failure_notifier,
        &settings.jobs,
    )
    .await
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
