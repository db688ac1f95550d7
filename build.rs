//! Build script for framearena.
//!
//! Prints feature notes for users integrating framearena into a renderer.

use std::env;

fn main() {
    // Re-run if features change
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_GPU_VULKAN");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_DEBUG");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_PARKING_LOT");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_TRACY");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_LOG");

    let vulkan_enabled = env::var("CARGO_FEATURE_GPU_VULKAN").is_ok();
    let debug_enabled = env::var("CARGO_FEATURE_DEBUG").is_ok();
    let parking_lot_enabled = env::var("CARGO_FEATURE_PARKING_LOT").is_ok();
    let tracy_enabled = env::var("CARGO_FEATURE_TRACY").is_ok();
    let log_enabled = env::var("CARGO_FEATURE_LOG").is_ok();

    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let is_release = profile == "release";

    // =========================================================================
    // Feature-specific notes
    // =========================================================================

    if vulkan_enabled {
        emit_info("Vulkan backend enabled");
        emit_note("Wrap your logical device and allocator:");
        emit_note("  let device = Arc::new(VulkanDevice::new(&instance, physical_device, device));");
        emit_note("  let memory = Arc::new(GpuAllocatorMemory::new(allocator));");
        emit_note("Images that share an alias block are created with VK_IMAGE_CREATE_ALIAS_BIT.");
    }

    if debug_enabled {
        emit_info("Debug features enabled");
        emit_note("Untracked images reported by the leak sweep carry creation backtraces.");

        if is_release {
            emit_warning("Debug features enabled in release build!");
            emit_note("Backtrace capture on every image creation is slow.");
        }
    }

    if parking_lot_enabled {
        emit_info("Using parking_lot for mutexes");
    }

    if tracy_enabled {
        emit_info("Tracy profiler integration enabled");
        emit_note("Resident byte counts are plotted on every begin_frame.");
    }

    if !log_enabled && !is_release {
        emit_note("Tip: Enable 'log' to route FR diagnostics through the log crate:");
        emit_note("  framearena = { version = \"0.1\", features = [\"log\"] }");
    }
}

// =============================================================================
// Diagnostic emission helpers
// =============================================================================

fn emit_info(msg: &str) {
    println!("cargo:warning=[framearena] {}", msg);
}

fn emit_note(msg: &str) {
    println!("cargo:warning=[framearena]    {}", msg);
}

fn emit_warning(msg: &str) {
    println!("cargo:warning=[framearena] warning: {}", msg);
}
