//! The vault schema

use crate::ddl::DdlStatement;

pub const CONFIG_TABLE: &str = "Config";
pub const USERS_TABLE: &str = "Users";
pub const PATIENTS_TABLE: &str = "Patients";
pub const CLINICAL_RECORDS_TABLE: &str = "ClinicalRecords";
pub const CLINICAL_RECORDS_PATIENT_INDEX: &str = "idx_ClinicalRecords_patient_id";

/// Tables a fully provisioned store must contain
pub const REQUIRED_TABLES: [&str; 4] = [CONFIG_TABLE, USERS_TABLE, PATIENTS_TABLE, CLINICAL_RECORDS_TABLE];

const CREATE_CONFIG: &str = "CREATE TABLE Config (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    key         TEXT NOT NULL UNIQUE,
    value       TEXT,
    description TEXT,
    modified_at TEXT NOT NULL
)";

const CREATE_USERS: &str = "CREATE TABLE Users (
    id                    INTEGER PRIMARY KEY AUTOINCREMENT,
    username              TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash         TEXT NOT NULL,
    password_salt         TEXT NOT NULL,
    full_name             TEXT,
    role                  TEXT NOT NULL,
    is_active             INTEGER NOT NULL DEFAULT 1,
    created_at            TEXT NOT NULL,
    last_login            TEXT,
    password_changed_at   TEXT,
    failed_attempts       INTEGER NOT NULL DEFAULT 0,
    force_password_change INTEGER NOT NULL DEFAULT 0
)";

const CREATE_PATIENTS: &str = "CREATE TABLE Patients (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    encrypted_name    TEXT NOT NULL,
    encrypted_name_iv TEXT NOT NULL,
    date_of_birth     TEXT,
    gender            TEXT,
    created_at        TEXT NOT NULL,
    modified_at       TEXT
)";

const CREATE_CLINICAL_RECORDS: &str = "CREATE TABLE ClinicalRecords (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_id  INTEGER NOT NULL REFERENCES Patients(id),
    record_type TEXT NOT NULL,
    record_date TEXT NOT NULL,
    diagnosis   TEXT,
    treatment   TEXT,
    notes       TEXT,
    created_at  TEXT NOT NULL,
    created_by  TEXT,
    modified_at TEXT,
    modified_by TEXT
)";

const CREATE_CLINICAL_RECORDS_PATIENT_INDEX: &str =
    "CREATE INDEX idx_ClinicalRecords_patient_id ON ClinicalRecords (patient_id)";

/// Every schema object, independent tables before the tables and indexes
/// that reference them
pub fn schema_statements() -> Vec<DdlStatement> {
    vec![
        DdlStatement::table(CONFIG_TABLE, CREATE_CONFIG),
        DdlStatement::table(USERS_TABLE, CREATE_USERS),
        DdlStatement::table(PATIENTS_TABLE, CREATE_PATIENTS),
        DdlStatement::table(CLINICAL_RECORDS_TABLE, CREATE_CLINICAL_RECORDS),
        DdlStatement::index(CLINICAL_RECORDS_PATIENT_INDEX, CREATE_CLINICAL_RECORDS_PATIENT_INDEX),
    ]
}
