//! Backend detection.

use super::Backend;

/// Information about an execution backend.
#[derive(Debug, Clone)]
pub struct BackendInfo {
    /// Backend type.
    pub backend: Backend,
    /// Human-readable name.
    pub name: &'static str,
    /// Whether backend is available.
    pub available: bool,
    /// Description.
    pub description: &'static str,
}

/// Detect all backends compiled into this build.
pub fn detect_backends() -> Vec<BackendInfo> {
    #[allow(unused_mut)]
    let mut backends = Vec::new();

    #[cfg(feature = "wgpu")]
    {
        backends.push(BackendInfo {
            backend: Backend::Wgpu,
            name: "wgpu",
            available: super::WgpuPrimitives::is_available(),
            description: "GPU compute shaders via wgpu (Vulkan/Metal/DX12)",
        });
    }

    backends.push(BackendInfo {
        backend: Backend::Reference,
        name: "reference",
        available: true,
        description: "Reference kernels on the CPU with rayon, for validation",
    });

    backends
}

/// Get description of available backends.
pub fn describe_backends() -> String {
    let mut desc = String::new();

    for info in detect_backends() {
        let status = if info.available { "+" } else { "-" };
        desc.push_str(&format!("[{}] {}: {}\n", status, info.name, info.description));
    }

    desc
}
