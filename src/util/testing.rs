use std::sync::Once;

use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::{CalculatorNode, CalculatorTree, Variable};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");

    // Create a filter for noisy modules
    let noisy_modules = ["config"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    // RUST_LOG wins, otherwise debug
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_test_writer()
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Reference project used across tests:
///
/// ```text
/// R (A + B)
/// ├── A (x * 2), x = 3
/// └── B (no expression), result = 5
/// ```
pub fn sample_tree() -> CalculatorTree {
    let mut root = CalculatorNode::new(1, 1, "R", None);
    root.expression = Some("A + B".into());
    let mut tree = CalculatorTree::new(root);

    let mut a = CalculatorNode::new(2, 1, "A", Some(1));
    a.expression = Some("x * 2".into());
    a.variables = vec![Variable::new(10, "x", "X", 3.0)];
    let mut b = CalculatorNode::new(3, 1, "B", Some(1));
    b.result = Some(5.0);

    tree.insert_node(a).expect("insert A");
    tree.insert_node(b).expect("insert B");
    tree
}
