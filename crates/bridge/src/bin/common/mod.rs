use std::thread;
use std::time::Duration;

use bridge::{ActionsSet, RegistrationError};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bridge=info,replay=info,desktop=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// `demo:echo`, `demo:fail` and `demo:later`, used by the bundled hosts.
pub fn demo_actions() -> Result<ActionsSet, RegistrationError> {
    ActionsSet::new("demo")
        .add_native("echo", |args| Ok(args))
        .and_then(|set| {
            set.add_native("fail", |args| {
                let reason = args
                    .as_ref()
                    .and_then(|args| args.get("reason"))
                    .and_then(Value::as_str)
                    .unwrap_or("requested failure")
                    .to_string();
                anyhow::bail!(reason)
            })
        })
        .and_then(|set| {
            set.add_native_callback("later", |args, sink| {
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(10));
                    let mut result = args.unwrap_or_default();
                    result.insert("deferred".to_string(), Value::Bool(true));
                    sink.resolve(Some(result));
                });
            })
        })
}
