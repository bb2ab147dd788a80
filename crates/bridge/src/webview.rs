//! Glue for hosting a bridge inside a wry web view on a tao event loop.
//!
//! Web to native traffic arrives through the web view's IPC handler. Native to
//! web commands are forwarded from the outbound channel to the event loop as
//! [`HostEvent::Evaluate`], because only the event loop thread may call
//! `evaluate_script`.

use std::thread::{self, JoinHandle};

use tao::event_loop::EventLoopProxy;

use crate::bridge::Bridge;
use crate::outbound::OutboundReceiver;

/// Installed into every page before its own scripts run.
const INIT_SCRIPT: &str = r#"(function () {
  var pending = {};
  var handlers = {};
  var nextId = 0;

  function post(message) {
    window.ipc.postMessage(JSON.stringify(message));
  }

  var bridge = {
    addWebAction: function (setName, actionName, handler) {
      handlers[setName + ":" + actionName] = handler;
    },
    callNative: function (setName, actionName, args) {
      var actionId = nextId++;
      return new Promise(function (resolve, reject) {
        pending[actionId] = { resolve: resolve, reject: reject };
        post({
          messageType: "callNative",
          actionId: actionId,
          actionsSetName: setName,
          actionName: actionName,
          actionArgs: args === undefined ? null : args
        });
      });
    },
    onNativeResult: function (actionId, result, error) {
      var entry = pending[actionId];
      if (!entry) {
        console.error("Cannot find native action '" + actionId + "' callback.");
        return;
      }
      delete pending[actionId];
      if (error !== null) {
        entry.reject(new Error(error));
      } else {
        entry.resolve(result);
      }
    },
    callWeb: function (actionId, setName, actionName, args) {
      var handler = handlers[setName + ":" + actionName];
      var reply = function (result, error) {
        post({
          messageType: "onWebResult",
          actionId: actionId,
          result: result === undefined ? null : result,
          error: error === undefined ? null : error
        });
      };
      if (!handler) {
        reply(null, "Web Action '" + setName + ":" + actionName + "' not implemented.");
        return;
      }
      Promise.resolve()
        .then(function () { return handler(args); })
        .then(function (result) { reply(result, null); },
              function (err) { reply(null, String(err && err.message || err)); });
    },
    errorNative: function (message) {
      console.error(message);
    },
    reload: function () {
      post({ messageType: "reload" });
    }
  };

  var target = window;
  var path = "__OBJECT__".split(".");
  for (var i = 0; i < path.length - 1; i++) {
    target = target[path[i]] = target[path[i]] || {};
  }
  target[path[path.length - 1]] = bridge;

  window.addEventListener("error", function (event) {
    post({
      messageType: "onError",
      error: {
        message: String(event.message),
        url: String(event.filename || ""),
        stack: String(event.error && event.error.stack || "")
      }
    });
  });

  window.addEventListener("DOMContentLoaded", function () {
    post({ messageType: "webViewInitialized" });
  });
})();
"#;

/// Events the bridge sends to the event loop.
#[derive(Debug, Clone)]
pub enum HostEvent {
    Evaluate(String),
    Reload,
}

/// The page shim with the bridge object installed under `object`.
pub fn init_script(object: &str) -> String {
    INIT_SCRIPT.replace("__OBJECT__", object)
}

/// IPC handler that feeds every posted message into `bridge`.
pub fn ipc_handler(bridge: Bridge) -> impl Fn(wry::http::Request<String>) + 'static {
    move |request| bridge.handle_message(request.body())
}

/// Pump rendered commands from `receiver` to the event loop on a dedicated
/// thread. The thread ends when every sender is gone or the event loop has
/// exited.
pub fn forward_outbound(
    mut receiver: OutboundReceiver,
    proxy: EventLoopProxy<HostEvent>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("bridge-outbound".to_string())
        .spawn(move || {
            while let Some(script) = receiver.blocking_recv_script() {
                if proxy.send_event(HostEvent::Evaluate(script)).is_err() {
                    tracing::debug!("Event loop closed, stopping outbound forwarding");
                    break;
                }
            }
        })
}
