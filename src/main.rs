// src/main.rs

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() {
    hexvault_scene::run().await;
}

// The browser build enters through `mount_scene` instead.
#[cfg(target_arch = "wasm32")]
fn main() {}
