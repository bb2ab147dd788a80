//! Window with a demo page wired to a bridge.

use std::thread;
use std::time::Duration;

use bridge::webview::{self, HostEvent};
use bridge::{Bridge, BridgeConfig};
use parking_lot::Mutex;
use tao::{
    dpi::LogicalSize,
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoopBuilder},
    window::WindowBuilder,
};
use wry::WebViewBuilder;

mod common;

const PAGE: &str = r#"<!doctype html>
<html>
  <body>
    <button id="echo">echo</button>
    <button id="fail">fail</button>
    <button id="later">later</button>
    <pre id="out"></pre>
    <script>
      var bridge = __OBJECT__;
      var out = document.getElementById("out");
      function log(line) { out.textContent += line + "\n"; }

      bridge.addWebAction("demo", "ping", function () { return { pong: true }; });

      ["echo", "fail", "later"].forEach(function (name) {
        document.getElementById(name).addEventListener("click", function () {
          bridge.callNative("demo", name, { clicked: name })
            .then(function (result) { log(name + " -> " + JSON.stringify(result)); })
            .catch(function (err) { log(name + " !! " + err.message); });
        });
      });
    </script>
  </body>
</html>
"#;

fn main() -> anyhow::Result<()> {
    common::init_logging();

    let config = BridgeConfig::load();
    let object = config.object_name().to_string();

    let event_loop = EventLoopBuilder::<HostEvent>::with_user_event().build();
    let reload_proxy = Mutex::new(event_loop.create_proxy());

    let (bridge, receiver) = Bridge::builder()
        .config(config)
        .actions_set(common::demo_actions()?)?
        .on_reload(move || {
            if reload_proxy.lock().send_event(HostEvent::Reload).is_err() {
                tracing::debug!("Event loop closed, dropping reload request");
            }
        })
        .build();

    webview::forward_outbound(receiver, event_loop.create_proxy())?;

    if let Some(timeout) = bridge.call_timeout() {
        let bridge = bridge.clone();
        let period = (timeout / 2).max(Duration::from_millis(50));
        thread::Builder::new()
            .name("bridge-expiry".to_string())
            .spawn(move || expire_periodically(bridge, period))?;
    }

    bridge.call_web(
        "demo",
        "ping",
        None,
        |result| tracing::info!("demo:ping resolved: {:?}", result),
        |err| tracing::warn!("demo:ping failed: {}", err),
    );

    let window = WindowBuilder::new()
        .with_title("Bridge Demo")
        .with_inner_size(LogicalSize::new(800, 600))
        .build(&event_loop)?;

    let page = PAGE.replace("__OBJECT__", &object);
    let webview = WebViewBuilder::new()
        .with_initialization_script(&webview::init_script(&object))
        .with_ipc_handler(webview::ipc_handler(bridge.clone()))
        .with_html(page.clone())
        .build(&window)?;

    tracing::info!("Window opened");

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::UserEvent(HostEvent::Evaluate(script)) => {
                if let Err(err) = webview.evaluate_script(&script) {
                    tracing::warn!("Failed to evaluate script: {}", err);
                }
            }
            Event::UserEvent(HostEvent::Reload) => {
                if let Err(err) = webview.load_html(&page) {
                    tracing::warn!("Failed to reload page: {}", err);
                }
            }
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } => {
                tracing::info!("Window closed");
                *control_flow = ControlFlow::Exit;
            }
            _ => (),
        }
    });
}

fn expire_periodically(bridge: Bridge, period: Duration) {
    loop {
        thread::sleep(period);
        bridge.expire_stale();
    }
}
