//! Aggregators that fold probe primitives into results
//!
//! - Repeated probes with an inter-probe interval and optional parallelism
//! - Port ranges over a fixed-size worker pool with a hard deadline
//! - Hop-by-hop discovery, strictly sequential
//! - Resolver timing across (domain, server) pairs

pub mod dns_bench;
pub mod hops;
pub mod port_range;
pub mod repeated;

pub use dns_bench::benchmark_resolvers;
pub use hops::{trace_hops, HopTrace};
pub use port_range::scan_ports;
pub use repeated::{run_repeated, RepeatPlan};

/// System resource information used to size worker pools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemResources {
    /// Number of logical CPU cores
    pub cpu_cores: usize,
    /// Default connect-probe pool size
    pub scan_concurrency: usize,
}

impl SystemResources {
    /// Detect system resources and calculate pool sizes
    pub fn detect() -> Self {
        Self::for_cores(num_cpus::get())
    }

    pub fn for_cores(cpu_cores: usize) -> Self {
        // Connect probes are I/O bound: 2x cores, within sane limits
        let scan_concurrency = (cpu_cores * 2).clamp(4, 50);

        Self {
            cpu_cores,
            scan_concurrency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_resources_detection() {
        let resources = SystemResources::detect();

        assert!(resources.cpu_cores > 0);
        assert!(resources.scan_concurrency >= 4);
        assert!(resources.scan_concurrency <= 50);
    }

    #[test]
    fn test_scan_concurrency_clamps() {
        assert_eq!(SystemResources::for_cores(1).scan_concurrency, 4);
        assert_eq!(SystemResources::for_cores(8).scan_concurrency, 16);
        assert_eq!(SystemResources::for_cores(64).scan_concurrency, 50);
    }
}
