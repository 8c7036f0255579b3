//! Runnable example service built on the bedrock bootstrap.
//!
//! Wires a greeter module, an uptime widget, and the HTTP console into the
//! coordinator. Try:
//!
//! ```text
//! bedrock-demo --greeting=howdy --repeat=3 --console-port=8001
//! bedrock-demo --help
//! ```
//!
//! Then `curl localhost:8001/healthz` and `curl localhost:8001/uptime`.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use bedrock_console::{HttpConsole, Widget};
use bedrock_core::{Bedrock, LoadContext, Module, ModuleError};
use bedrock_flags::{FlagDefinition, FlagRegistry};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEMO_TARGET: &str = env!("CARGO_PKG_NAME");

/// Module contributing the demo's own flags.
struct GreeterModule;

impl Module for GreeterModule {
    fn name(&self) -> &str {
        "greeter"
    }

    fn load(&mut self, ctx: &mut LoadContext<'_>) -> Result<(), ModuleError> {
        ctx.flags().register(
            FlagDefinition::text("greeting", "hello").with_description("what to say"),
        )?;
        ctx.flags().register(
            FlagDefinition::integer("repeat", 1).with_description("how often to say it"),
        )?;
        Ok(())
    }
}

/// Widget reporting how long the process has been up.
struct UptimeWidget {
    started: Instant,
}

impl Widget for UptimeWidget {
    fn path(&self) -> &str {
        "/uptime"
    }

    fn render(&self) -> String {
        format!("uptime_seconds {}\n", self.started.elapsed().as_secs())
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let console = HttpConsole::new(vec![Arc::new(UptimeWidget {
        started: Instant::now(),
    })]);
    let modules: Vec<Box<dyn Module>> =
        vec![Box::new(GreeterModule), Box::new(console.clone())];
    let flags = FlagRegistry::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let argv = std::env::args().skip(1).collect();
    let mut base = Bedrock::with_flags(argv, modules, flags);
    if let Err(fault) = base.run() {
        error!(target: DEMO_TARGET, error = %fault, "startup failed");
        return ExitCode::FAILURE;
    }

    greet(base.flags());
    if let Some(port) = base.console_port() {
        info!(target: DEMO_TARGET, port, "console is up");
    }

    // The cleanup thread stops the console when SIGTERM/SIGINT arrives;
    // block here until that has happened.
    base.wait_for_termination();
    ExitCode::SUCCESS
}

fn greet(flags: &FlagRegistry) {
    let greeting = flags.text("greeting").unwrap_or("hello");
    let repeat = flags.integer("repeat").unwrap_or(1).max(0);
    for _ in 0..repeat {
        info!(target: DEMO_TARGET, "{greeting}");
    }
}
