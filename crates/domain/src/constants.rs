//! Domain constants
//!
//! Centralized location for wire names, environment variable names and
//! defaults shared by the client and the object store.

// Object store layout
pub const OBJECT_NAMESPACE: &str = "protocoldagresult";
pub const OBJECT_FILENAME: &str = "obj.json.zst";
pub const RESULTS_ROUTE: &str = "results";
pub const FAILURES_ROUTE: &str = "failures";
pub const STORE_CHECK_KEY: &str = "_check_test";

// Identifier syntax
pub const KEY_DELIMITER: char = '-';
pub const SCOPE_WILDCARD: &str = "*";

// Client connection parameters
pub const ENV_API_URL: &str = "CRUCIBLE_URL";
pub const ENV_IDENTIFIER: &str = "CRUCIBLE_ID";
pub const ENV_KEY: &str = "CRUCIBLE_KEY";

// Object store backend parameters
pub const ENV_AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const ENV_AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
pub const ENV_AWS_DEFAULT_REGION: &str = "AWS_DEFAULT_REGION";
pub const ENV_AWS_S3_BUCKET: &str = "AWS_S3_BUCKET";
pub const ENV_AWS_S3_PREFIX: &str = "AWS_S3_PREFIX";

// Client tunables
pub const DEFAULT_CACHE_SIZE_LIMIT: i64 = 1_073_741_824; // 1 GiB
pub const DEFAULT_MAX_RETRIES: i32 = 5;
pub const UNLIMITED_RETRIES: i32 = -1;
pub const DEFAULT_RETRY_BASE_SECONDS: f64 = 2.0;
pub const DEFAULT_RETRY_MAX_SECONDS: f64 = 60.0;
pub const RETRYABLE_STATUS_CODES: [u16; 4] = [404, 502, 503, 504];
pub const CACHE_DIR_NAME: &str = "crucible";
