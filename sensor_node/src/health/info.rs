// health/info.rs: facts printed by the `info` command
use parking_lot::Mutex;
use sysinfo::System;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemFacts {
    pub cores: usize,
    pub cpu_mhz: u64,
    pub total_memory_bytes: u64,
    pub available_memory_bytes: u64,
    pub uptime_s: u64,
    pub os: Option<String>,
}

impl SystemFacts {
    /// The block written to the output sink, header first.
    pub fn lines(&self) -> Vec<String> {
        let mut out = vec![
            "System information:".to_string(),
            format!("Core count: {}", self.cores),
            format!("CPU frequency: {} MHz", self.cpu_mhz),
            format!("Total memory: {} bytes", self.total_memory_bytes),
            format!("Available memory: {} bytes", self.available_memory_bytes),
            format!("Uptime: {} s", self.uptime_s),
        ];
        if let Some(os) = &self.os {
            out.push(format!("OS: {os}"));
        }
        out
    }
}

pub trait FactSource: Send + Sync {
    fn collect(&self) -> SystemFacts;
}

/// Facts about the machine the node runs on.
pub struct HostFacts {
    sys: Mutex<System>,
}

impl HostFacts {
    pub fn new() -> Self {
        Self { sys: Mutex::new(System::new()) }
    }
}

impl Default for HostFacts {
    fn default() -> Self {
        Self::new()
    }
}

impl FactSource for HostFacts {
    fn collect(&self) -> SystemFacts {
        let mut sys = self.sys.lock();
        sys.refresh_cpu_all();
        sys.refresh_memory();

        SystemFacts {
            cores: sys.cpus().len(),
            cpu_mhz: sys.cpus().first().map(|c| c.frequency()).unwrap_or(0),
            total_memory_bytes: sys.total_memory(),
            available_memory_bytes: sys.available_memory(),
            uptime_s: System::uptime(),
            os: System::long_os_version(),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub struct FixedFacts(pub SystemFacts);

    impl FactSource for FixedFacts {
        fn collect(&self) -> SystemFacts {
            self.0.clone()
        }
    }

    pub fn board() -> SystemFacts {
        SystemFacts {
            cores: 2,
            cpu_mhz: 240,
            total_memory_bytes: 327_680,
            available_memory_bytes: 254_312,
            uptime_s: 42,
            os: None,
        }
    }
}
