use std::{future::Future, io, net::SocketAddr, time::Duration};

use axum::Router;
use relaygate_error::LifecycleError;
use tokio::{
    net::TcpListener,
    sync::{oneshot, watch},
    task::JoinHandle,
};
use tracing::{error, info};

/// Привязанный, но ещё не запущенный HTTP-сервер.
#[derive(Debug)]
pub struct HttpServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

/// Запущенный HTTP-сервер.
///
/// Прерывание по таймауту останавливает только цикл приёма соединений:
/// задачи уже принятых соединений, созданные `axum::serve`, доживают до
/// завершения своих запросов или до выхода процесса.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    failure_rx: watch::Receiver<Option<String>>,
    task: JoinHandle<io::Result<()>>,
}

impl HttpServer {
    pub async fn bind(addr: SocketAddr) -> Result<Self, LifecycleError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| LifecycleError::Bind {
                address: addr.to_string(),
                reason: e.to_string(),
            })?;
        let local_addr = listener.local_addr().map_err(|e| LifecycleError::Bind {
            address: addr.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Запускает сервер в отдельной задаче.
    pub fn spawn(
        self,
        router: Router,
    ) -> ServerHandle {
        let listener = self.listener;
        ServerHandle::launch(self.local_addr, move |shutdown_rx| async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        })
    }
}

impl ServerHandle {
    /// Запускает цикл обслуживания в отдельной задаче. `serve` получает
    /// приёмник сигнала graceful shutdown.
    pub(crate) fn launch<F, Fut>(
        local_addr: SocketAddr,
        serve: F,
    ) -> Self
    where
        F: FnOnce(oneshot::Receiver<()>) -> Fut,
        Fut: Future<Output = io::Result<()>> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (failure_tx, failure_rx) = watch::channel(None);
        let serving = serve(shutdown_rx);

        let task = tokio::spawn(async move {
            info!(address = %local_addr, "http server listening");
            let result = serving.await;
            if let Err(e) = &result {
                error!(error = %e, "http server failed");
                failure_tx.send_replace(Some(e.to_string()));
            }
            result
        });

        Self {
            local_addr,
            shutdown_tx: Some(shutdown_tx),
            failure_rx,
            task,
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Завершается, только если сервер остановился сам: ошибкой цикла
    /// обслуживания или паникой задачи. Штатная остановка идёт через
    /// [`shutdown`](Self::shutdown), которая поглощает handle.
    pub async fn failed(&self) -> LifecycleError {
        let mut failure_rx = self.failure_rx.clone();
        let reason = match failure_rx.wait_for(Option::is_some).await {
            Ok(reason) => reason.clone().unwrap_or_default(),
            Err(_) => "http server task exited unexpectedly".to_string(),
        };
        LifecycleError::Serve { reason }
    }

    /// Запускает graceful shutdown и ждёт не дольше `timeout`.
    ///
    /// Если сервер не успел остановиться, задача прерывается.
    pub async fn shutdown(
        mut self,
        timeout: Duration,
    ) -> Result<(), LifecycleError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        match tokio::time::timeout(timeout, &mut self.task).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) => Err(LifecycleError::Serve {
                reason: e.to_string(),
            }),
            Ok(Err(join_err)) => Err(LifecycleError::Serve {
                reason: join_err.to_string(),
            }),
            Err(_) => {
                self.task.abort();
                Err(LifecycleError::ShutdownTimeout {
                    component: "http server".to_string(),
                    timeout,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::routing::get;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpStream,
    };

    use super::*;

    async fn get_body(addr: SocketAddr) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /hello HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut buf = String::new();
        stream.read_to_string(&mut buf).await.unwrap();
        buf
    }

    /// Тест проверяет запуск на эфемерном порту и корректную остановку.
    #[tokio::test]
    async fn test_spawn_and_shutdown() {
        let server = HttpServer::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = server.local_addr();
        assert_ne!(addr.port(), 0);

        let handle = server.spawn(Router::new().route("/hello", get(|| async { "hi" })));
        let response = get_body(addr).await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("hi"));

        handle.shutdown(Duration::from_secs(5)).await.unwrap();
        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        let first = HttpServer::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let err = HttpServer::bind(first.local_addr()).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Bind { .. }));
    }

    /// Тест проверяет, что ошибка цикла обслуживания видна через `failed`,
    /// а работающий сервер через него не завершается.
    #[tokio::test]
    async fn test_serve_error_is_reported() {
        let healthy = HttpServer::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap()
            .spawn(Router::new());
        assert!(
            tokio::time::timeout(Duration::from_millis(100), healthy.failed())
                .await
                .is_err()
        );

        let broken = ServerHandle::launch("127.0.0.1:0".parse().unwrap(), |_shutdown| async {
            Err(io::Error::other("accept loop died"))
        });
        let err = tokio::time::timeout(Duration::from_secs(1), broken.failed())
            .await
            .unwrap();
        match err {
            LifecycleError::Serve { reason } => assert!(reason.contains("accept loop died")),
            other => panic!("unexpected error: {other:?}"),
        }

        healthy.shutdown(Duration::from_secs(1)).await.unwrap();
    }

    /// Тест проверяет, что зависшее соединение не блокирует остановку дольше
    /// таймаута.
    #[tokio::test]
    async fn test_shutdown_timeout_with_stuck_request() {
        let server = HttpServer::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = server.local_addr();
        let handle = server.spawn(Router::new().route(
            "/hello",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "late"
            }),
        ));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /hello HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let err = handle
            .shutdown(Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::ShutdownTimeout { .. }));
    }
}
