use legis_alerts::config::AppConfig;
use legis_alerts::error::AppError;
use legis_alerts::workflows::monitoring::{
    CamaraClient, Channel, ChannelKind, Dispatcher, EmailChannel, FetchOrchestrator, LogChannel,
    MonitorService, MonitorSettings, NotificationStore, StatusCache, SystemClock, TelegramChannel,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type Monitor<N> = MonitorService<CamaraClient, N>;

/// Wire the Câmara client, status cache, and dispatcher around `store`.
pub(crate) fn build_monitor<N>(
    config: &AppConfig,
    store: Arc<N>,
    channels: Vec<Box<dyn Channel>>,
) -> Result<Arc<Monitor<N>>, AppError>
where
    N: NotificationStore + 'static,
{
    let monitor = &config.monitor;
    let client = CamaraClient::new(monitor.camara_api_base.clone(), monitor.http_timeout)?;
    let orchestrator = FetchOrchestrator::new(
        Arc::new(client),
        Arc::new(StatusCache::new(monitor.status_cache_capacity)),
        monitor.fetch_concurrency,
    );
    let dispatcher = Dispatcher::new(channels, Arc::new(SystemClock::new(monitor.timezone)));

    info!(
        channels = ?dispatcher.channel_names(),
        timezone = %monitor.timezone,
        profile = %monitor.profile_path.display(),
        "monitor assembled"
    );

    Ok(Arc::new(MonitorService::new(
        orchestrator,
        store,
        dispatcher,
        MonitorSettings::from_config(monitor),
    )))
}

/// Telegram and e-mail channels for every configured credential set. A
/// channel that fails to build is skipped; the others are still wired.
pub(crate) fn live_channels(config: &AppConfig) -> Vec<Box<dyn Channel>> {
    let mut channels: Vec<Box<dyn Channel>> = Vec::new();
    let timeout = config.monitor.http_timeout;

    match config.telegram.credentials() {
        Some((token, chat_id)) => match TelegramChannel::new(token, chat_id, timeout) {
            Ok(telegram) => channels.push(Box::new(telegram)),
            Err(error) => warn!(%error, "telegram channel disabled"),
        },
        None => warn!("telegram channel disabled or missing credentials"),
    }

    let branding = MonitorSettings::from_config(&config.monitor).branding;
    match EmailChannel::from_config(&config.email, branding, timeout) {
        Ok(Some(email)) => channels.push(Box::new(email)),
        Ok(None) => warn!("e-mail channel disabled or incomplete"),
        Err(error) => warn!(%error, "e-mail channel disabled"),
    }

    if channels.is_empty() {
        warn!("no notification channel configured, notifications will only be logged");
        channels.push(Box::new(LogChannel::new("log", ChannelKind::RealTime)));
    }

    channels
}

pub(crate) fn dry_run_channels() -> Vec<Box<dyn Channel>> {
    vec![
        Box::new(LogChannel::new("telegram (dry run)", ChannelKind::RealTime)),
        Box::new(LogChannel::new("email (dry run)", ChannelKind::Consolidated)),
    ]
}
