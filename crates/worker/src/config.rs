use std::path::PathBuf;

/// Worker configuration loaded once from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// AMQP connection string of the Celery broker.
    pub broker_url: String,
    /// Queue the producer publishes benchmark tasks to.
    pub queue: String,
    /// Endpoint receiving result and error envelopes.
    pub callback_url: String,
    /// Directory the benchmark library runs in and writes artifacts to.
    pub work_dir: PathBuf,
    /// Run each task in its own scratch subdirectory of `work_dir`.
    pub task_isolation: bool,
    /// Python interpreter with the benchmark library installed.
    pub python: String,
    /// Driver script path. `None` runs the bundled driver.
    pub driver: Option<PathBuf>,
    /// Upper bound on a single benchmark run.
    pub task_timeout_secs: u64,
    /// Per-request timeout of the result callback.
    pub callback_timeout_secs: u64,
    /// Callback retries after the first failed attempt.
    pub callback_max_retries: usize,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                                 |
    /// |-------------------------|-----------------------------------------|
    /// | `BROKER_URL`            | `pyamqp://guest@localhost//`            |
    /// | `CELERY_QUEUE`          | `celery`                                |
    /// | `DJANGO_API_URL`        | `http://localhost:8000/handleResult`    |
    /// | `WORK_DIR`              | current directory                       |
    /// | `TASK_ISOLATION`        | `false`                                 |
    /// | `QUANTMARK_PYTHON`      | `python3`                               |
    /// | `QUANTMARK_DRIVER`      | bundled driver                          |
    /// | `TASK_TIMEOUT_SECS`     | `3600`                                  |
    /// | `CALLBACK_TIMEOUT_SECS` | `10`                                    |
    /// | `CALLBACK_MAX_RETRIES`  | `3`                                     |
    pub fn from_env() -> Self {
        let broker_url =
            std::env::var("BROKER_URL").unwrap_or_else(|_| "pyamqp://guest@localhost//".into());

        let queue = std::env::var("CELERY_QUEUE").unwrap_or_else(|_| "celery".into());

        let callback_url = std::env::var("DJANGO_API_URL")
            .unwrap_or_else(|_| "http://localhost:8000/handleResult".into());

        let work_dir = std::env::var("WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        let task_isolation = std::env::var("TASK_ISOLATION")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);

        let python = std::env::var("QUANTMARK_PYTHON").unwrap_or_else(|_| "python3".into());

        let driver = std::env::var("QUANTMARK_DRIVER")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let task_timeout_secs: u64 = std::env::var("TASK_TIMEOUT_SECS")
            .unwrap_or_else(|_| "3600".into())
            .parse()
            .expect("TASK_TIMEOUT_SECS must be a valid u64");

        let callback_timeout_secs: u64 = std::env::var("CALLBACK_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("CALLBACK_TIMEOUT_SECS must be a valid u64");

        let callback_max_retries: usize = std::env::var("CALLBACK_MAX_RETRIES")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("CALLBACK_MAX_RETRIES must be a valid usize");

        Self {
            broker_url,
            queue,
            callback_url,
            work_dir,
            task_isolation,
            python,
            driver,
            task_timeout_secs,
            callback_timeout_secs,
            callback_max_retries,
        }
    }
}

/// `1`, `true`, `yes` and `on` (any case) enable a flag.
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
