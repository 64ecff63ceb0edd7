//! Fairplay Oracle
//!
//! Fairness analysis for casino ecosystems: per-session anomaly detection
//! over spin telemetry, advisory casino grading from aggregate telemetry,
//! and a trust ledger that scores casinos and players from behavioural
//! events.
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── lib.rs         - Crate root with re-exports
//! ├── config.rs      - Configuration management
//! ├── logging.rs     - Tracing subscriber setup
//! ├── gameplay/      - Session anomaly detection
//! │   ├── models.rs    - Spin telemetry & session views
//! │   ├── buffer.rs    - Per-session spin storage
//! │   ├── stats.rs     - Session statistics
//! │   └── detector.rs  - Anomaly detectors & fairness reports
//! ├── grading/       - Casino grading engine
//! │   ├── models.rs    - Telemetry inputs & report types
//! │   ├── stats.rs     - Statistical helpers
//! │   ├── metrics.rs   - Metric calculators
//! │   ├── category.rs  - Category tables & scoring
//! │   └── grader.rs    - Composite grade
//! ├── trust/         - Trust ledger
//! │   ├── record.rs    - Casino & degen records
//! │   ├── severity.rs  - Severity scale
//! │   ├── events.rs    - Inbound events & outbound updates
//! │   ├── ledger.rs    - Ledger orchestrator
//! │   └── recovery.rs  - Tilt recovery scheduler
//! ├── persistence/   - JSON snapshots
//! │   ├── snapshot.rs  - Snapshot files
//! │   └── writer.rs    - Debounced writer
//! ├── bus.rs         - Event bus adapter
//! └── service.rs     - Service lifecycle
//! ```

pub mod bus;
pub mod config;
pub mod gameplay;
pub mod grading;
pub mod logging;
pub mod persistence;
pub mod service;
pub mod trust;

// Re-export main types for convenience
pub use bus::{BusMessage, Dispatcher, EventBus, SPIN_RECORDED_TOPIC};
pub use config::{
    BusConfig, GameplayConfig, GradingConfig, LoggingConfig, OracleConfig, PersistenceConfig,
    RecoveryConfig, TrustConfig,
};
pub use gameplay::{AnomalyDetection, AnomalyDetector, FairnessReport, SessionStats, SpinEvent, Verdict};
pub use grading::{CasinoTelemetry, CompositeGrader, GradingReport};
pub use logging::init_logging;
pub use persistence::{SnapshotStore, SnapshotWriter};
pub use service::TrustService;
pub use trust::{
    CasinoTrustRecord, DegenTrustRecord, TrustEvent, TrustLedger, TrustLevel, TrustUpdate,
    TrustUpdateSink,
};
