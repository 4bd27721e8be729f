use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::Instant};
use tracing::{debug, error, warn};

use super::MessageProcessor;
use crate::broker::Subscription;

/// Итог работы одного диспетчера.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub topic: String,
    pub processed: u64,
}

/// Цикл диспетчера одного топика.
///
/// Каждое сообщение обрабатывается полностью (включая ack) до чтения
/// следующего. Завершается, когда поток подписки закончился.
pub async fn run(
    mut subscription: Subscription,
    processor: Arc<dyn MessageProcessor>,
) -> DispatchReport {
    let topic = subscription.topic().to_string();
    debug!(topic = %topic, "dispatcher started");

    let mut processed = 0u64;
    while let Some(message) = subscription.recv().await {
        processor.process(message).await;
        processed += 1;
    }

    debug!(topic = %topic, processed, "dispatcher stopped");
    DispatchReport { topic, processed }
}

/// Результат ожидания всех диспетчеров.
#[derive(Debug, Default)]
pub struct JoinOutcome {
    pub reports: Vec<DispatchReport>,
    /// Топики, чьи циклы не успели завершиться и были прерваны.
    pub aborted: Vec<String>,
    /// Топики, чьи задачи завершились паникой.
    pub failed: Vec<String>,
}

impl JoinOutcome {
    pub fn is_clean(&self) -> bool {
        self.aborted.is_empty() && self.failed.is_empty()
    }
}

/// Набор запущенных диспетчеров, принадлежащий координатору.
#[derive(Default)]
pub struct DispatcherSet {
    tasks: Vec<(String, JoinHandle<DispatchReport>)>,
}

impl DispatcherSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Запускает цикл для подписки в отдельной задаче.
    pub fn spawn(
        &mut self,
        subscription: Subscription,
        processor: Arc<dyn MessageProcessor>,
    ) {
        let topic = subscription.topic().to_string();
        let handle = tokio::spawn(run(subscription, processor));
        self.tasks.push((topic, handle));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn topics(&self) -> Vec<&str> {
        self.tasks.iter().map(|(t, _)| t.as_str()).collect()
    }

    /// Ждёт завершения всех циклов, суммарно не дольше `timeout`.
    ///
    /// Вызывается после закрытия subscriber'а. Не успевшие циклы
    /// прерываются.
    pub async fn join(
        self,
        timeout: Duration,
    ) -> JoinOutcome {
        let deadline = Instant::now() + timeout;
        let mut outcome = JoinOutcome::default();

        for (topic, mut handle) in self.tasks {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(report)) => {
                    debug!(topic = %report.topic, processed = report.processed, "dispatcher joined");
                    outcome.reports.push(report);
                }
                Ok(Err(e)) => {
                    error!(topic = %topic, error = %e, "dispatcher task failed");
                    outcome.failed.push(topic);
                }
                Err(_) => {
                    handle.abort();
                    warn!(topic = %topic, timeout_ms = timeout.as_millis() as u64, "dispatcher did not stop in time, aborted");
                    outcome.aborted.push(topic);
                }
            }
        }
        outcome
    }
}
