//! Constants used throughout the HealthDesk core crate.
//!
//! This module contains path, filename and default-value constants so the binaries and the
//! store agree on them.

/// Default directory for HealthDesk data when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "healthdesk_data";

/// Filename for the JSON record store.
pub const RECORDS_JSON_FILENAME: &str = "records.json";

/// Filename for the CSV record store.
pub const RECORDS_CSV_FILENAME: &str = "records.csv";

/// Directory name (under the data directory) for uploaded files.
pub const UPLOADS_DIR_NAME: &str = "uploads";

/// Keywords scanned for in text uploads when none are configured, in match-priority order.
pub const DEFAULT_UPLOAD_KEYWORDS: &[&str] = &[
    "diabetes",
    "hypertension",
    "asthma",
    "cholesterol",
    "allergy",
    "thyroid",
    "anemia",
];

/// Attempts at drawing an unused short id before giving up.
pub const MAX_ID_GENERATION_ATTEMPTS: usize = 32;

/// Oldest accepted age in years.
pub const MAX_AGE_YEARS: u32 = 150;
