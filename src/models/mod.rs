//! Data models and structures for the diagnostics engine

pub mod annotated;
pub mod config;
pub mod metrics;
pub mod results;

// Re-export main model types
pub use annotated::{AnnotatedResult, AnnotationTemplate};
pub use config::Config;
pub use metrics::{LatencyStats, ProbeSample};
pub use results::{
    BandwidthReport, BulkLookup, DiagnosticResult, DnsBenchmark, DnsInfo, DnsRecord, GatewayInfo, HopRecord,
    InterfaceInfo, InterfaceKind, LocalIpInfo, NetworkConfig, PortResult, PortScanReport, PublicIpInfo,
    QualityRating, QualityScore, QueryFailure, ResolvedHostname, ResolvedRecords, ResolverTiming, ResultRecorder, ReverseEntry, ScoreBreakdown, TraceRoute,
};
