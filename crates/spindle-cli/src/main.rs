use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::time::{Duration, sleep};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use spindle_core::app::{Worker, WorkerBuilder, WorkerConfig};
use spindle_core::domain::{ContentType, Direction, TaskError, TaskValue};
use spindle_core::typed::{
    CallArgs, CallEnvelope, CallOutput, ClassDef, Module, TaskCallable, callable_fn,
};

const CONFIG_ENV: &str = "SPINDLE_CONFIG";

/// Receiver state of the demo `Counter` class.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Counter {
    value: i64,
}

/// `demo.models.Counter.increment(step)`: receiver は INOUT
struct Increment;

#[async_trait]
impl TaskCallable for Increment {
    async fn call(&self, args: CallArgs) -> Result<CallEnvelope, TaskError> {
        let mut counter: Counter = match args.value(0) {
            TaskValue::Object(state) => serde_json::from_value(state)
                .map_err(|e| TaskError::Attribute(format!("not a counter: {e}")))?,
            TaskValue::Null => Counter::default(),
            other => return Err(TaskError::Attribute(format!("not a counter: {other:?}"))),
        };
        counter.value += args.value(1).as_i64().unwrap_or(1);

        let state = serde_json::to_value(&counter).map_err(|e| TaskError::failed(e.to_string()))?;
        Ok(CallEnvelope::from(
            CallOutput::new(vec![Some(ContentType::Long)], vec![TaskValue::Long(counter.value)])
                .with_target_direction(Direction::InOut)
                .with_updated_args(vec![TaskValue::Object(state)]),
        ))
    }
}

fn add() -> Arc<dyn TaskCallable> {
    callable_fn(|args: CallArgs| async move {
        let (Some(a), Some(b)) = (args.value(0).as_i64(), args.value(1).as_i64()) else {
            return Err(TaskError::raised("add expects two integers"));
        };
        Ok(CallEnvelope::from(CallOutput::new(
            vec![Some(ContentType::Long)],
            vec![TaskValue::Long(a + b)],
        )))
    })
}

fn echo() -> Arc<dyn TaskCallable> {
    callable_fn(|args: CallArgs| async move {
        Ok(CallEnvelope::from(CallOutput::new(
            vec![Some(ContentType::String)],
            vec![args.value(0)],
        )))
    })
}

fn nap() -> Arc<dyn TaskCallable> {
    callable_fn(|args: CallArgs| async move {
        let secs = args.value(0).as_i64().unwrap_or(1).max(0) as u64;
        sleep(Duration::from_secs(secs)).await;
        Ok(CallEnvelope::from(CallOutput::empty()))
    })
}

fn fail() -> Arc<dyn TaskCallable> {
    callable_fn(|args: CallArgs| async move {
        match args.value(0).as_str() {
            Some(message) if !message.is_empty() => {
                Err::<CallEnvelope, _>(TaskError::raised(message))
            }
            _ => Err(TaskError::raised_without_message()),
        }
    })
}

fn load_config() -> Result<WorkerConfig, Box<dyn std::error::Error>> {
    let config = match std::env::var_os(CONFIG_ENV) {
        Some(path) => WorkerConfig::from_json_file(&PathBuf::from(path))?,
        None => WorkerConfig::default(),
    };
    Ok(config.with_env_overrides())
}

fn init_tracing(level: &str) {
    // RUST_LOG が優先、無ければ設定ファイルのレベル
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_worker(config: WorkerConfig) -> Result<Worker, Box<dyn std::error::Error>> {
    let tasks = Module::new("demo.tasks")
        .with_function("add", add())?
        .with_function("echo", echo())?
        .with_function("sleep", nap())?
        .with_function("fail", fail())?;
    let models = Module::new("demo.models")
        .with_class(ClassDef::new("Counter").with_method("increment", Arc::new(Increment))?)?;

    let worker = WorkerBuilder::new()
        .config(config)
        .module(tasks)
        .module(models)
        .expect_targets(&[
            "demo.tasks.add",
            "demo.tasks.echo",
            "demo.tasks.sleep",
            "demo.tasks.fail",
            "demo.models.Counter.increment",
        ])
        .build()?;
    Ok(worker)
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("spindle: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.log_level);

    let worker = match build_worker(config) {
        Ok(worker) => worker,
        Err(e) => {
            error!(error = %e, "cannot build worker");
            return ExitCode::FAILURE;
        }
    };
    info!(
        storage_enabled = worker.storage_enabled(),
        process = %worker.config().process_name,
        "worker ready"
    );

    // 引数ベクタ = argv（プログラム名を除く）
    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match worker.execute(&args).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "invocation rejected");
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string(&result) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "cannot encode result");
            ExitCode::FAILURE
        }
    }
}
