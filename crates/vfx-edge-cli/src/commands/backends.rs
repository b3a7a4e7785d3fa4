//! Backends command

use anyhow::Result;
use vfx_edge::{detect_backends, describe_backends};

pub fn run(verbose: u8) -> Result<()> {
    print!("{}", describe_backends());

    if verbose > 0 {
        let default = detect_backends().into_iter().find(|b| b.available);
        if let Some(info) = default {
            println!("\nFirst available: {}", info.name);
        }
        print_gpu();
    }
    Ok(())
}

#[cfg(feature = "wgpu")]
fn print_gpu() {
    match vfx_edge::backend::GpuContext::new() {
        Ok(ctx) => println!("GPU: {} ({:?})", ctx.device_name(), ctx.backend()),
        Err(e) => println!("GPU: {e}"),
    }
}

#[cfg(not(feature = "wgpu"))]
fn print_gpu() {}
