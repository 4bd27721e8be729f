//! Координатор жизненного цикла: запуск компонентов и упорядоченная
//! остановка с ограничением по времени.

pub mod banner;
pub mod signal;

use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};

use relaygate_error::{
    ErrorExt, GatewayResult, GenericError, LifecycleError, LogLevel, ResultExt, StackError,
    StatusCode,
};
use tokio::sync::watch;
use tracing::{error, info, warn};

pub use self::signal::shutdown_signal;
use crate::{
    broker::{self, BrokerClients, Subscriber},
    config::GatewaySettings,
    consumer::{DispatchReport, DispatcherSet, JoinOutcome, LoggingProcessor, MessageProcessor},
    context::GatewayContext,
    gateway::{build_router, HttpServer, ServerHandle},
};

/// Фаза жизненного цикла шлюза.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Итог остановки: ошибки, которые были залогированы, и счётчики
/// диспетчеров.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub failures: Vec<StackError>,
    pub dispatchers: Vec<DispatchReport>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(
        &mut self,
        err: StackError,
    ) {
        match err.log_level() {
            LogLevel::Error => {
                error!(error = %err, status = %err.status_code(), "shutdown step failed")
            }
            LogLevel::Warn => {
                warn!(error = %err, status = %err.status_code(), "shutdown step failed")
            }
            _ => info!(error = %err, status = %err.status_code(), "shutdown step failed"),
        }
        self.failures.push(err);
    }
}

/// Запущенный шлюз: HTTP-сервер и диспетчеры по топикам.
pub struct Gateway {
    ctx: Arc<GatewayContext>,
    server: Option<ServerHandle>,
    dispatchers: DispatcherSet,
    state: watch::Sender<GatewayState>,
}

impl Gateway {
    /// Запускает шлюз с клиентами брокера из настроек.
    ///
    /// Настройки должны быть уже загружены и провалидированы.
    pub async fn start(settings: Arc<GatewaySettings>) -> GatewayResult<Self> {
        let clients = broker::connect(&settings).context("building broker clients")?;
        Self::start_with(settings, clients, Arc::new(LoggingProcessor)).await
    }

    /// Запускает шлюз с готовыми клиентами брокера и обработчиком.
    pub async fn start_with(
        settings: Arc<GatewaySettings>,
        clients: BrokerClients,
        processor: Arc<dyn MessageProcessor>,
    ) -> GatewayResult<Self> {
        let (state, _) = watch::channel(GatewayState::Starting);
        let ctx = Arc::new(GatewayContext::new(settings.clone(), clients));

        let mut dispatchers = DispatcherSet::new();
        let subscriber = active_subscriber(&ctx);
        if let Some(subscriber) = &subscriber {
            for topic in &settings.consumer.topics {
                match subscriber.subscribe(topic).await {
                    Ok(subscription) => dispatchers.spawn(subscription, processor.clone()),
                    Err(source) => {
                        abort_startup(subscriber.as_ref(), dispatchers).await;
                        return Err(LifecycleError::SubscriptionSetup {
                            topic: topic.clone(),
                            source,
                        }
                        .into());
                    }
                }
            }
        }

        let bound = match bind(&settings).await {
            Ok(server) => server,
            Err(e) => {
                if let Some(subscriber) = &subscriber {
                    abort_startup(subscriber.as_ref(), dispatchers).await;
                }
                return Err(e);
            }
        };
        let local_addr = bound.local_addr();
        let server = bound.spawn(build_router(ctx.clone()));

        banner::print_banner(&banner::BannerInfo::new(&settings, local_addr));
        if !dispatchers.is_empty() {
            info!(topics = ?dispatchers.topics(), group_id = %settings.consumer.group_id, "consumer ready");
        }
        info!(address = %local_addr, "gateway started");

        state.send_replace(GatewayState::Running);
        Ok(Self {
            ctx,
            server: Some(server),
            dispatchers,
            state,
        })
    }

    /// Наблюдение за фазой жизненного цикла.
    pub fn state(&self) -> watch::Receiver<GatewayState> {
        self.state.subscribe()
    }

    pub fn current_state(&self) -> GatewayState {
        *self.state.borrow()
    }

    /// Фактический адрес HTTP-слушателя.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(ServerHandle::local_addr)
    }

    pub fn context(&self) -> &Arc<GatewayContext> {
        &self.ctx
    }

    /// Ждёт сигнала остановки или самопроизвольного завершения HTTP-сервера.
    ///
    /// Во втором случае возвращает ошибку `Serve`. Остановку всё равно
    /// выполняет [`shutdown`](Self::shutdown).
    pub async fn wait<F>(
        &self,
        signal: F,
    ) -> GatewayResult<()>
    where
        F: Future<Output = ()>,
    {
        let server_failed = async {
            match &self.server {
                Some(server) => server.failed().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = signal => {
                info!("shutdown requested");
                Ok(())
            }
            err = server_failed => {
                error!(error = %err, "http server stopped unexpectedly");
                Err(StackError::new(err).context("serving http"))
            }
        }
    }

    /// Останавливает компоненты по порядку: HTTP-сервер, subscriber,
    /// диспетчеры. Сбой одного шага логируется и не отменяет следующие.
    pub async fn shutdown(mut self) -> ShutdownReport {
        self.state.send_replace(GatewayState::Stopping);
        let timeout = self.ctx.settings.shutdown_timeout();
        let mut report = ShutdownReport::default();

        info!(timeout_secs = timeout.as_secs(), "stopping gateway");

        if let Some(server) = self.server.take() {
            if let Err(e) = server.shutdown(timeout).await {
                report.record(StackError::new(e).context("stopping http server"));
            }
        }

        if let Some(subscriber) = active_subscriber(&self.ctx) {
            if let Err(e) = subscriber.close().await {
                report.record(StackError::new(e).context("closing subscriber"));
            }
        }

        let outcome = std::mem::take(&mut self.dispatchers).join(timeout).await;
        for r in &outcome.reports {
            info!(topic = %r.topic, processed = r.processed, "consumer stopped");
        }
        for topic in outcome.aborted {
            report.record(StackError::new(LifecycleError::ShutdownTimeout {
                component: format!("dispatcher `{topic}`"),
                timeout,
            }));
        }
        for topic in outcome.failed {
            report.record(StackError::new(GenericError::new(
                StatusCode::Internal,
                format!("dispatcher `{topic}` panicked"),
            )));
        }
        report.dispatchers = outcome.reports;

        self.state.send_replace(GatewayState::Stopped);
        info!(failures = report.failures.len(), "gateway stopped");
        report
    }
}

/// Полный цикл: запуск, ожидание сигнала, остановка.
///
/// Если HTTP-сервер упал, компоненты всё равно останавливаются, а ошибка
/// возвращается вызывающему.
pub async fn run<F>(
    settings: Arc<GatewaySettings>,
    signal: F,
) -> GatewayResult<ShutdownReport>
where
    F: Future<Output = ()>,
{
    let gateway = Gateway::start(settings).await?;
    let waited = gateway.wait(signal).await;
    let report = gateway.shutdown().await;
    waited.map(|()| report)
}

fn active_subscriber(ctx: &GatewayContext) -> Option<Arc<dyn Subscriber>> {
    if ctx.consumer_enabled() {
        ctx.subscriber.clone()
    } else {
        None
    }
}

async fn bind(settings: &GatewaySettings) -> GatewayResult<HttpServer> {
    let addr = settings.server.socket_addr()?;
    Ok(HttpServer::bind(addr).await?)
}

const STARTUP_ROLLBACK_TIMEOUT: Duration = Duration::from_secs(1);

/// Откат частично выполненного запуска.
async fn abort_startup(
    subscriber: &dyn Subscriber,
    dispatchers: DispatcherSet,
) -> JoinOutcome {
    if let Err(e) = subscriber.close().await {
        error!(error = %e, code = e.status_code().code(), "closing subscriber after failed startup");
    }

    let outcome = dispatchers.join(STARTUP_ROLLBACK_TIMEOUT).await;
    for topic in &outcome.aborted {
        warn!(topic = %topic, "dispatcher aborted during startup rollback");
    }
    for topic in &outcome.failed {
        error!(topic = %topic, "dispatcher panicked during startup rollback");
    }
    outcome
}
