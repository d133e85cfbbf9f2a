/// Worker configuration loaded from environment variables.
///
/// All fields except `DATABASE_URL` have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Postgres connection string (required).
    pub database_url: String,
    /// Base URL of the pricing/flavor-lookup service.
    pub pricing_url: String,
    /// Base URL of the utilization-metrics service.
    pub metrics_url: String,
    /// Reporting currency passed to pricing lookups (default: `USD`).
    pub currency: String,
    /// Seconds between scheduling ticks (default: `3600`).
    pub tick_interval_secs: u64,
    /// Maximum organization runs in flight at once (default: `4`).
    pub max_parallel_runs: usize,
    /// Per-request timeout for external service calls (default: `30`).
    pub request_timeout_secs: u64,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                  |
    /// |-------------------------|--------------------------|
    /// | `DATABASE_URL`          | (required)               |
    /// | `PRICING_URL`           | `http://localhost:8180`  |
    /// | `METRICS_URL`           | `http://localhost:8190`  |
    /// | `CURRENCY`              | `USD`                    |
    /// | `TICK_INTERVAL_SECS`    | `3600`                   |
    /// | `MAX_PARALLEL_RUNS`     | `4`                      |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                     |
    pub fn from_env() -> Self {
        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let pricing_url =
            std::env::var("PRICING_URL").unwrap_or_else(|_| "http://localhost:8180".into());

        let metrics_url =
            std::env::var("METRICS_URL").unwrap_or_else(|_| "http://localhost:8190".into());

        let currency = std::env::var("CURRENCY").unwrap_or_else(|_| "USD".into());

        let tick_interval_secs: u64 = std::env::var("TICK_INTERVAL_SECS")
            .unwrap_or_else(|_| "3600".into())
            .parse()
            .expect("TICK_INTERVAL_SECS must be a valid u64");

        let max_parallel_runs: usize = std::env::var("MAX_PARALLEL_RUNS")
            .unwrap_or_else(|_| "4".into())
            .parse()
            .expect("MAX_PARALLEL_RUNS must be a valid usize");

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            database_url,
            pricing_url,
            metrics_url,
            currency,
            tick_interval_secs,
            max_parallel_runs,
            request_timeout_secs,
        }
    }
}
