//! End-to-end tests of assembled pipelines over an in-memory transport.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use assert2::{check, let_assert};
use strata::telemetry::{AtomicCounter, RecordingHistogram};
use strata::{
    Balancing, CancellationToken, Error, Method, Pipeline, PipelineConfig, Request, Response,
    RoundRobin, SendFuture, Sender,
};
use tokio::time::Instant;

/// What the transport saw on one call.
#[derive(Debug, Clone)]
struct Attempt {
    host: String,
    authorizations: usize,
    tenant: Option<String>,
}

/// Transport failing a fixed number of times, then answering with `status`.
#[derive(Clone)]
struct Transport {
    failures: u32,
    status: u16,
    calls: Arc<AtomicU32>,
    attempts: Arc<Mutex<Vec<Attempt>>>,
}

impl Transport {
    fn failing_times(failures: u32) -> Self {
        Self {
            failures,
            status: 200,
            calls: Arc::default(),
            attempts: Arc::default(),
        }
    }

    fn answering(status: u16) -> Self {
        Self {
            status,
            ..Self::failing_times(0)
        }
    }

    fn attempts(&self) -> Vec<Attempt> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn hosts(&self) -> Vec<String> {
        self.attempts()
            .into_iter()
            .map(|attempt| attempt.host)
            .collect()
    }
}

impl Sender for Transport {
    fn send<'a>(&'a self, request: &'a mut Request) -> SendFuture<'a> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Attempt {
                host: request.host().unwrap_or_default().to_string(),
                authorizations: request.headers().get_all("authorization").iter().count(),
                tenant: request.header("x-tenant").map(str::to_string),
            });

        Box::pin(async move {
            if call <= self.failures {
                Err(Error::connection(format!("connection refused ({call})")))
            } else {
                Ok(Response::with_status(self.status))
            }
        })
    }
}

#[derive(Clone, Default)]
struct Lines(Arc<Mutex<Vec<String>>>);

impl Lines {
    fn sink(&self) -> impl Fn(&str) + Send + Sync + 'static {
        let lines = Arc::clone(&self.0);
        move |line: &str| {
            lines
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(line.to_string());
        }
    }

    fn get(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

fn create_request() -> Request {
    Request::try_builder(Method::Get, "https://api.example.com/users")
        .and_then(|builder| builder.user_agent("strata-it").build())
        .expect("valid request")
}

const HOSTS: [&str; 3] = ["web01", "web02", "web03"];

#[tokio::test(start_paused = true)]
async fn canonical_pipeline_retries_through_every_layer() {
    let transport = Transport::failing_times(2);
    let lines = Lines::default();
    let counter = Arc::new(AtomicCounter::new());
    let histogram = Arc::new(RecordingHistogram::new());

    let_assert!(Ok(director) = RoundRobin::from_hosts(0, HOSTS));
    let_assert!(Ok(builder) = Pipeline::builder(transport.clone()).with_authorization("token"));
    let pipeline = builder
        .with_load_balancing(director)
        .with_log_sink(lines.sink())
        .with_instrumentation(Arc::clone(&counter), Arc::clone(&histogram))
        .with_fault_tolerance(5, Duration::from_millis(100))
        .build();

    let start = Instant::now();
    let mut request = create_request();
    let_assert!(Ok(response) = pipeline.send(&mut request).await);

    check!(response.status() == 200);
    check!(transport.hosts() == ["web02", "web03", "web01"]);
    // The same request goes through every attempt, headers pile up.
    let authorizations: Vec<_> = transport
        .attempts()
        .iter()
        .map(|attempt| attempt.authorizations)
        .collect();
    check!(authorizations == [1, 2, 3]);
    // Logging wraps load balancing: each line shows the host left on the
    // request by the previous attempt, before the director moves it.
    check!(
        lines.get()
            == [
                "strata-it: GET https://api.example.com/users",
                "strata-it: GET https://web02/users",
                "strata-it: GET https://web03/users",
            ]
    );
    check!(counter.get() == 3);
    check!(histogram.count() == 3);
    // 100ms + 200ms
    check!(start.elapsed() >= Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn outer_layers_run_once_per_call() {
    let transport = Transport::failing_times(2);
    let lines = Lines::default();
    let counter = Arc::new(AtomicCounter::new());

    let pipeline = Pipeline::builder(transport.clone())
        .with_fault_tolerance(5, Duration::from_millis(10))
        .with_log_sink(lines.sink())
        .with_instrumentation(Arc::clone(&counter), RecordingHistogram::new())
        .build();

    let mut request = create_request();
    let_assert!(Ok(_) = pipeline.send(&mut request).await);

    check!(transport.attempts().len() == 3);
    check!(lines.get().len() == 1);
    check!(counter.get() == 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_return_last_failure() {
    let transport = Transport::failing_times(10);
    let counter = Arc::new(AtomicCounter::new());
    let pipeline = Pipeline::builder(transport.clone())
        .with_instrumentation(Arc::clone(&counter), RecordingHistogram::new())
        .with_fault_tolerance(2, Duration::from_millis(10))
        .build();

    let mut request = create_request();
    let_assert!(Err(Error::Connection(message)) = pipeline.send(&mut request).await);

    check!(message == "connection refused (3)");
    check!(counter.get() == 3);
}

#[tokio::test(start_paused = true)]
async fn error_status_is_a_response() {
    let transport = Transport::answering(503);
    let pipeline = Pipeline::builder(transport.clone())
        .with_fault_tolerance(5, Duration::from_millis(10))
        .build();

    let mut request = create_request();
    let_assert!(Ok(response) = pipeline.send(&mut request).await);

    check!(response.is_server_error());
    check!(transport.attempts().len() == 1);
}

#[tokio::test(start_paused = true)]
async fn pipeline_from_config() {
    let config = PipelineConfig::builder()
        .authorization("token")
        .header("x-tenant", "acme")
        .backends(HOSTS)
        .balancing(Balancing::RoundRobin { start: 2 })
        .without_metrics()
        .fault_tolerance(3, Duration::from_millis(50))
        .build();
    let transport = Transport::failing_times(1);

    let_assert!(Ok(pipeline) = Pipeline::from_config(transport.clone(), &config));
    check!(pipeline.depth() == 5);

    let mut request = create_request();
    let_assert!(Ok(_) = pipeline.send(&mut request).await);

    let attempts = transport.attempts();
    check!(transport.hosts() == ["web01", "web02"]);
    check!(attempts.iter().all(|attempt| attempt.tenant.as_deref() == Some("acme")));
    check!(request.url().as_str() == "https://web02/users");
}

#[tokio::test]
async fn pipeline_from_json_config() {
    let json = r#"{
        "backends": ["web01:8080"],
        "logging": { "level": "debug" },
        "metrics": null,
        "fault_tolerance": null
    }"#;
    let_assert!(Ok(config) = PipelineConfig::from_json(json));
    let transport = Transport::answering(200);

    let_assert!(Ok(pipeline) = Pipeline::from_config(transport.clone(), &config));
    let mut request = create_request();
    let_assert!(Ok(_) = pipeline.send(&mut request).await);

    check!(request.url().as_str() == "https://web01:8080/users");
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_retries() {
    let transport = Transport::failing_times(u32::MAX);
    let pipeline = Pipeline::builder(transport.clone())
        .with_fault_tolerance(5, Duration::from_secs(60))
        .build();

    let token = CancellationToken::new();
    let mut request = Request::try_builder(Method::Post, "https://api.example.com/jobs")
        .and_then(|builder| builder.body("{}").cancellation(token.clone()).build())
        .expect("valid request");

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        token.cancel();
    });

    let_assert!(Err(Error::Cancelled) = pipeline.send(&mut request).await);
    check!(transport.attempts().len() == 1);
    canceller.await.expect("canceller");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_calls_share_one_director() {
    const TASKS: usize = 30;

    let transport = Transport::answering(200);
    let_assert!(Ok(director) = RoundRobin::from_hosts(0, HOSTS));
    let pipeline = Arc::new(
        Pipeline::builder(transport.clone())
            .with_load_balancing(director)
            .build(),
    );

    let tasks: Vec<_> = (0..TASKS)
        .map(|_| {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move {
                let mut request = create_request();
                pipeline.send(&mut request).await.map(|_| ())
            })
        })
        .collect();

    for task in tasks {
        let_assert!(Ok(Ok(())) = task.await);
    }

    let mut counts = HashMap::new();
    for host in transport.hosts() {
        *counts.entry(host).or_insert(0) += 1;
    }
    check!(counts.len() == 3);
    check!(counts.values().all(|count| *count == TASKS / 3));
}
