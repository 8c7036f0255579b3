//! HTTP introspection console for bedrock services.
//!
//! [`HttpConsole`] is both a [`bedrock_core::Module`] and a
//! [`bedrock_core::Console`]: its `load` hook registers the console flags
//! and claims the coordinator's console slot, and the coordinator then drives
//! it through the three-operation console contract. It serves `GET /healthz`
//! plus one route per constructor-supplied [`Widget`].
//!
//! Serving happens on a dedicated thread owning a current-thread tokio
//! runtime, so the strictly synchronous startup path never touches an async
//! executor.
//!
//! # Example
//!
//! ```no_run
//! use bedrock_console::HttpConsole;
//! use bedrock_core::{Bedrock, Module};
//!
//! let console = HttpConsole::new(Vec::new());
//! let modules: Vec<Box<dyn Module>> = vec![Box::new(console.clone())];
//! let mut base = Bedrock::new(std::env::args().skip(1).collect(), modules);
//! base.run().expect("startup succeeds");
//! println!("console on port {:?}", base.console_port());
//! # base.shutdown();
//! ```

pub mod server;
pub mod widget;

pub use self::server::{ENABLED_FLAG, HttpConsole, PORT_FLAG};
pub use self::widget::Widget;
