//! Browser entry point: mounts the explorer app.

use kg_explorer::{App, init_logging};

fn main() {
	init_logging();
	leptos::mount::mount_to_body(App)
}
