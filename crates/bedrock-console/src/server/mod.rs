//! The HTTP console server.

use std::collections::HashSet;
use std::io;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

use axum::Router;
use axum::routing::get;
use bedrock_core::{Console, LoadContext, Module, ModuleError};
use bedrock_flags::{FlagDefinition, FlagRegistry};
use tokio::sync::oneshot;
use tracing::{error, info};

use crate::widget::Widget;

/// Switch flag controlling whether the console binds at all.
pub const ENABLED_FLAG: &str = "console-enabled";

/// Integer flag selecting the listen port; `0` picks a free one.
pub const PORT_FLAG: &str = "console-port";

const CONSOLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::server");

const HEALTH_PATH: &str = "/healthz";

/// Handle to the serving thread, present only while the console runs.
struct ServeHandle {
    stop: oneshot::Sender<()>,
    thread: thread::JoinHandle<()>,
}

#[derive(Default)]
struct ServerState {
    port: Option<u16>,
    handle: Option<ServeHandle>,
}

struct Inner {
    widgets: Vec<Arc<dyn Widget>>,
    state: Mutex<ServerState>,
}

/// HTTP introspection console serving `/healthz` and widget routes.
///
/// Cheap to clone; all clones share the same server. One clone typically
/// goes into the coordinator's module list while the console slot holds
/// another.
#[derive(Clone)]
pub struct HttpConsole {
    inner: Arc<Inner>,
}

impl HttpConsole {
    /// Creates a console serving the given widgets once started.
    #[must_use]
    pub fn new(widgets: Vec<Arc<dyn Widget>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                widgets,
                state: Mutex::new(ServerState::default()),
            }),
        }
    }

    fn lock_state(&self) -> io::Result<std::sync::MutexGuard<'_, ServerState>> {
        self.inner
            .state
            .lock()
            .map_err(|_| io::Error::other("console state poisoned"))
    }
}

impl Module for HttpConsole {
    fn name(&self) -> &str {
        "http-console"
    }

    fn load(&mut self, ctx: &mut LoadContext<'_>) -> Result<(), ModuleError> {
        ctx.flags().register(
            FlagDefinition::switch(ENABLED_FLAG, true)
                .with_description("serve the introspection console"),
        )?;
        ctx.flags().register(
            FlagDefinition::integer(PORT_FLAG, 0)
                .with_description("console listen port, 0 picks a free one"),
        )?;
        ctx.claim_console(Arc::new(self.clone()))?;
        Ok(())
    }
}

impl Console for HttpConsole {
    fn start(&self, flags: &FlagRegistry) -> io::Result<()> {
        if !flags.switch(ENABLED_FLAG).unwrap_or(true) {
            info!(target: CONSOLE_TARGET, "console disabled, not binding");
            return Ok(());
        }
        let configured = flags.integer(PORT_FLAG).unwrap_or(0);
        let requested = u16::try_from(configured).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("console port {configured} out of range"),
            )
        })?;

        validate_widget_paths(&self.inner.widgets)?;

        let mut state = self.lock_state()?;
        if state.handle.is_some() {
            // start() is idempotent while the server runs.
            return Ok(());
        }

        let listener = TcpListener::bind(("0.0.0.0", requested))?;
        let port = listener.local_addr()?.port();
        listener.set_nonblocking(true)?;

        let router = build_router(&self.inner.widgets);
        let (stop, stopped) = oneshot::channel();
        let thread = thread::Builder::new()
            .name("bedrock-console".to_owned())
            .spawn(move || serve(listener, router, stopped))?;

        state.port = Some(port);
        state.handle = Some(ServeHandle { stop, thread });
        info!(target: CONSOLE_TARGET, port, "console listening");
        Ok(())
    }

    fn shutdown(&self) -> io::Result<()> {
        let handle = {
            let mut state = self.lock_state()?;
            state.handle.take()
        };
        let Some(ServeHandle { stop, thread }) = handle else {
            return Ok(());
        };
        stop.send(()).ok();
        if thread.join().is_err() {
            return Err(io::Error::other("console serving thread panicked"));
        }
        info!(target: CONSOLE_TARGET, "console stopped");
        Ok(())
    }

    fn port(&self) -> Option<u16> {
        self.lock_state().ok().and_then(|state| state.port)
    }
}

async fn healthz() -> &'static str {
    "Healthy"
}

/// Rejects widget path sets the router cannot mount.
///
/// The router treats an overlapping or malformed route as a programming
/// error, so every path is checked here, before the socket binds, and the
/// fault surfaces through the ordinary startup error path.
fn validate_widget_paths(widgets: &[Arc<dyn Widget>]) -> io::Result<()> {
    let invalid = |message: String| io::Error::new(io::ErrorKind::InvalidInput, message);
    let mut seen = HashSet::new();
    for widget in widgets {
        let path = widget.path();
        if !path.starts_with('/') {
            return Err(invalid(format!("widget path '{path}' must start with '/'")));
        }
        if path == HEALTH_PATH {
            return Err(invalid(format!("widget path '{path}' is reserved")));
        }
        if path.contains(['{', '}']) {
            return Err(invalid(format!(
                "widget path '{path}' must not use route parameter syntax"
            )));
        }
        if !seen.insert(path) {
            return Err(invalid(format!("widget path '{path}' is mounted twice")));
        }
    }
    Ok(())
}

fn build_router(widgets: &[Arc<dyn Widget>]) -> Router {
    let mut router = Router::new().route(HEALTH_PATH, get(healthz));
    for widget in widgets {
        let path = widget.path().to_owned();
        info!(target: CONSOLE_TARGET, path = %path, "mounting console widget");
        let handler_widget = Arc::clone(widget);
        router = router.route(
            &path,
            get(move || {
                let current = Arc::clone(&handler_widget);
                async move { current.render() }
            }),
        );
    }
    router
}

fn serve(listener: TcpListener, router: Router, stopped: oneshot::Receiver<()>) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(fault) => {
            error!(target: CONSOLE_TARGET, error = %fault, "could not build console runtime");
            return;
        }
    };
    runtime.block_on(async move {
        let accepted = match tokio::net::TcpListener::from_std(listener) {
            Ok(accepted) => accepted,
            Err(fault) => {
                error!(target: CONSOLE_TARGET, error = %fault, "could not adopt console listener");
                return;
            }
        };
        let server = axum::serve(accepted, router).with_graceful_shutdown(async move {
            stopped.await.ok();
        });
        if let Err(fault) = server.await {
            error!(target: CONSOLE_TARGET, error = %fault, "console server failed");
        }
    });
}
