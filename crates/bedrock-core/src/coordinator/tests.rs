//! Unit tests for the lifecycle coordinator.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bedrock_flags::{FlagDefinition, FlagRegistry};
use rstest::rstest;

use super::*;
use crate::console::MockConsole;
use crate::shutdown::test_support::ChannelShutdownSignal;

/// Module that records how often and in which order it was loaded.
struct CountingModule {
    name: &'static str,
    loads: Arc<AtomicUsize>,
    order: Arc<Mutex<Vec<&'static str>>>,
}

impl CountingModule {
    fn new(name: &'static str, order: &Arc<Mutex<Vec<&'static str>>>) -> (Self, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        (
            Self {
                name,
                loads: Arc::clone(&loads),
                order: Arc::clone(order),
            },
            loads,
        )
    }
}

impl Module for CountingModule {
    fn name(&self) -> &str {
        self.name
    }

    fn load(&mut self, _ctx: &mut LoadContext<'_>) -> Result<(), ModuleError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut order) = self.order.lock() {
            order.push(self.name);
        }
        Ok(())
    }
}

/// Module that contributes one text flag.
struct FlagModule {
    flag: &'static str,
}

impl Module for FlagModule {
    fn name(&self) -> &str {
        "flag-module"
    }

    fn load(&mut self, ctx: &mut LoadContext<'_>) -> Result<(), ModuleError> {
        ctx.flags()
            .register(FlagDefinition::text(self.flag, "default"))?;
        Ok(())
    }
}

/// Module that always fails its load hook.
struct BrokenModule;

impl Module for BrokenModule {
    fn name(&self) -> &str {
        "broken"
    }

    fn load(&mut self, _ctx: &mut LoadContext<'_>) -> Result<(), ModuleError> {
        Err(io::Error::other("boom").into())
    }
}

/// Module that claims the console slot with a prepared mock.
struct ConsoleModule {
    console: Option<Arc<MockConsole>>,
}

impl ConsoleModule {
    fn new(console: MockConsole) -> Self {
        Self {
            console: Some(Arc::new(console)),
        }
    }
}

impl Module for ConsoleModule {
    fn name(&self) -> &str {
        "console-module"
    }

    fn load(&mut self, ctx: &mut LoadContext<'_>) -> Result<(), ModuleError> {
        let console = self.console.take().ok_or_else(|| {
            Box::<dyn std::error::Error + Send + Sync>::from("console already taken")
        })?;
        ctx.claim_console(console)?;
        Ok(())
    }
}

fn argv(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|token| (*token).to_owned()).collect()
}

// ---------------------------------------------------------------------------
// Module loading
// ---------------------------------------------------------------------------

#[test]
fn modules_load_once_each_in_list_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let (first, first_loads) = CountingModule::new("first", &order);
    let (second, second_loads) = CountingModule::new("second", &order);
    let mut base = Bedrock::new(argv(&[]), vec![Box::new(first), Box::new(second)]);

    let outcome = base.start_with(&mut Vec::new()).expect("startup succeeds");

    assert_eq!(outcome, StartOutcome::Running);
    assert_eq!(first_loads.load(Ordering::SeqCst), 1);
    assert_eq!(second_loads.load(Ordering::SeqCst), 1);
    assert_eq!(
        order.lock().expect("order log").as_slice(),
        &["first", "second"]
    );
}

#[test]
fn startup_cannot_run_twice() {
    let mut base = Bedrock::new(argv(&[]), Vec::new());
    base.start_with(&mut Vec::new()).expect("first startup");
    let error = base
        .start_with(&mut Vec::new())
        .expect_err("second startup must fail");
    assert!(matches!(
        error,
        StartupError::AlreadyStarted { phase: Phase::Running }
    ));
}

#[test]
fn module_failure_aborts_startup_before_parsing() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let (first, _) = CountingModule::new("first", &order);
    let (last, last_loads) = CountingModule::new("last", &order);
    let mut base = Bedrock::new(
        argv(&[]),
        vec![Box::new(first), Box::new(BrokenModule), Box::new(last)],
    );

    let error = base
        .start_with(&mut Vec::new())
        .expect_err("broken module aborts startup");

    assert!(matches!(error, StartupError::Module { name, .. } if name == "broken"));
    // No further phase transitions and no later loads.
    assert_eq!(base.phase(), Phase::Created);
    assert_eq!(last_loads.load(Ordering::SeqCst), 0);
}

#[test]
fn duplicate_flag_across_modules_fails_the_second_load() {
    let mut base = Bedrock::new(
        argv(&[]),
        vec![
            Box::new(FlagModule { flag: "shared" }),
            Box::new(FlagModule { flag: "shared" }),
        ],
    );
    let error = base
        .start_with(&mut Vec::new())
        .expect_err("duplicate flag aborts startup");
    assert!(matches!(error, StartupError::Module { name, .. } if name == "flag-module"));
}

#[test]
fn second_console_claim_fails_that_module() {
    let mut first_console = MockConsole::new();
    first_console.expect_start().never();
    let second_console = MockConsole::new();
    let mut base = Bedrock::new(
        argv(&[]),
        vec![
            Box::new(ConsoleModule::new(first_console)),
            Box::new(ConsoleModule::new(second_console)),
        ],
    );
    let error = base
        .start_with(&mut Vec::new())
        .expect_err("second claim aborts startup");
    assert!(matches!(error, StartupError::Module { name, .. } if name == "console-module"));
}

// ---------------------------------------------------------------------------
// Parsing and help/version
// ---------------------------------------------------------------------------

#[test]
fn parsed_values_reach_the_registry() {
    let mut base = Bedrock::new(
        argv(&["--greeting=howdy"]),
        vec![Box::new(FlagModule { flag: "greeting" })],
    );
    base.start_with(&mut Vec::new()).expect("startup succeeds");
    assert_eq!(base.flags().text("greeting"), Some("howdy"));
    assert_eq!(base.phase(), Phase::Running);
}

#[test]
fn parse_failure_is_fatal() {
    let mut base = Bedrock::new(argv(&["--nope"]), Vec::new());
    let error = base
        .start_with(&mut Vec::new())
        .expect_err("unknown flag aborts startup");
    assert!(matches!(error, StartupError::Parse { .. }));
}

#[rstest]
#[case::help("--help", StartOutcome::HelpPrinted)]
#[case::version("--version", StartOutcome::VersionPrinted)]
fn help_and_version_short_circuit_before_console_start(
    #[case] token: &str,
    #[case] expected: StartOutcome,
) {
    let mut console = MockConsole::new();
    console.expect_start().never();
    let mut base = Bedrock::with_flags(
        argv(&[token]),
        vec![Box::new(ConsoleModule::new(console))],
        FlagRegistry::new("svc", "9.9.9"),
    );

    let mut out = Vec::new();
    let outcome = base.start_with(&mut out).expect("short-circuit succeeds");

    assert_eq!(outcome, expected);
    assert_eq!(base.phase(), Phase::HelpOrVersion);
    assert!(!out.is_empty(), "text must be written");
}

#[test]
fn help_output_contains_module_flags() {
    let mut base = Bedrock::new(
        argv(&["--help"]),
        vec![Box::new(FlagModule { flag: "greeting" })],
    );
    let mut out = Vec::new();
    base.start_with(&mut out).expect("help succeeds");
    let text = String::from_utf8(out).expect("utf8");
    assert!(text.contains("--greeting"));
    assert!(text.contains("--help"));
}

// ---------------------------------------------------------------------------
// Console lifecycle
// ---------------------------------------------------------------------------

#[test]
fn console_starts_after_parse_and_reports_its_port() {
    let mut console = MockConsole::new();
    console.expect_start().times(1).returning(|_| Ok(()));
    console.expect_port().returning(|| Some(4321));
    let mut base = Bedrock::new(argv(&[]), vec![Box::new(ConsoleModule::new(console))]);

    let outcome = base.start_with(&mut Vec::new()).expect("startup succeeds");

    assert_eq!(outcome, StartOutcome::Running);
    assert_eq!(base.console_port(), Some(4321));
}

#[test]
fn console_start_failure_aborts_startup() {
    let mut console = MockConsole::new();
    console
        .expect_start()
        .times(1)
        .returning(|_| Err(io::Error::new(io::ErrorKind::AddrInUse, "taken")));
    let mut base = Bedrock::new(argv(&[]), vec![Box::new(ConsoleModule::new(console))]);

    let error = base
        .start_with(&mut Vec::new())
        .expect_err("bind failure aborts startup");

    assert!(matches!(error, StartupError::Console { .. }));
    assert_ne!(base.phase(), Phase::Running);
}

#[test]
fn explicit_shutdown_stops_the_console_once() {
    let mut console = MockConsole::new();
    console.expect_start().times(1).returning(|_| Ok(()));
    console.expect_port().returning(|| Some(1));
    console.expect_shutdown().times(1).returning(|| Ok(()));
    let mut base = Bedrock::new(argv(&[]), vec![Box::new(ConsoleModule::new(console))]);
    base.start_with(&mut Vec::new()).expect("startup succeeds");

    base.shutdown();
    assert_eq!(base.phase(), Phase::Terminated);
    // Idempotent: the mock's times(1) would fail on a second call.
    base.shutdown();
    assert_eq!(base.phase(), Phase::Terminated);
}

#[test]
fn shutdown_fault_is_downgraded_to_a_diagnostic() {
    let mut console = MockConsole::new();
    console.expect_start().times(1).returning(|_| Ok(()));
    console.expect_port().returning(|| Some(1));
    console
        .expect_shutdown()
        .times(1)
        .returning(|| Err(io::Error::other("teardown fault")));
    let mut base = Bedrock::new(argv(&[]), vec![Box::new(ConsoleModule::new(console))]);
    base.start_with(&mut Vec::new()).expect("startup succeeds");

    base.shutdown();
    assert_eq!(base.phase(), Phase::Terminated);
}

#[test]
fn termination_signal_triggers_console_cleanup_exactly_once() {
    let mut console = MockConsole::new();
    console.expect_start().times(1).returning(|_| Ok(()));
    console.expect_port().returning(|| Some(1));
    console.expect_shutdown().times(1).returning(|| Ok(()));
    let (fire, signal) = ChannelShutdownSignal::pair();
    let mut base = Bedrock::new(argv(&[]), vec![Box::new(ConsoleModule::new(console))])
        .with_shutdown_signal(Box::new(signal));
    base.start_with(&mut Vec::new()).expect("startup succeeds");
    assert_eq!(base.phase(), Phase::Running);

    fire.send(()).expect("cleanup thread is listening");
    base.wait_for_termination();

    assert_eq!(base.phase(), Phase::Terminated);
}
