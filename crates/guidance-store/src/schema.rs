//! Database schema definitions.
//!
//! This module defines the tables used by the PostgreSQL backend. Tables are
//! created if missing at startup; there is no migration history.

/// Table names.
pub mod table {
    /// Live roster, one row per enrolled student, unique by phone.
    pub const STUDENTS: &str = "students";

    /// Mentor profiles and capacity counters, unique by name and phone.
    pub const MENTORS: &str = "mentors";

    /// Re-enrollment history, one row per student phone.
    pub const HISTORY: &str = "re_enrollments";

    /// Mentor logins, unique by email.
    pub const MENTOR_LOGINS: &str = "mentor_logins";

    /// Owner accounts, unique by email.
    pub const OWNERS: &str = "owners";
}

/// `CREATE TABLE` statements, in dependency order.
pub const CREATE_TABLES: [&str; 5] = [
    r"
    CREATE TABLE IF NOT EXISTS students (
        id          BIGSERIAL PRIMARY KEY,
        name        TEXT NOT NULL,
        phone       TEXT NOT NULL UNIQUE,
        email       TEXT NOT NULL,
        date        DATE NOT NULL,
        class       TEXT NOT NULL,
        sub         TEXT NOT NULL,
        mentor_name TEXT
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS mentors (
        id      BIGSERIAL PRIMARY KEY,
        name    TEXT NOT NULL UNIQUE,
        college TEXT NOT NULL,
        date    DATE NOT NULL,
        phone   TEXT NOT NULL UNIQUE,
        handle  INTEGER NOT NULL DEFAULT 0,
        onn     INTEGER NOT NULL DEFAULT 0,
        total   INTEGER NOT NULL DEFAULT 0,
        CHECK (onn >= 0 AND onn <= handle AND total >= onn)
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS re_enrollments (
        id          BIGSERIAL PRIMARY KEY,
        name        TEXT NOT NULL,
        phone       TEXT NOT NULL UNIQUE,
        email       TEXT NOT NULL,
        date        DATE NOT NULL,
        class       TEXT NOT NULL,
        sub         TEXT NOT NULL,
        mentor_name TEXT,
        renrollment INTEGER NOT NULL DEFAULT 0
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS mentor_logins (
        id            BIGSERIAL PRIMARY KEY,
        email         TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        mentor_name   TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS owners (
        id            BIGSERIAL PRIMARY KEY,
        email         TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        owner_name    TEXT NOT NULL
    )
    ",
];

/// Returns all table names.
#[must_use]
pub fn all_tables() -> Vec<&'static str> {
    vec![
        table::STUDENTS,
        table::MENTORS,
        table::HISTORY,
        table::MENTOR_LOGINS,
        table::OWNERS,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_table_has_a_create_statement() {
        for name in all_tables() {
            let needle = format!("CREATE TABLE IF NOT EXISTS {name} (");
            assert!(
                CREATE_TABLES.iter().any(|ddl| ddl.contains(&needle)),
                "missing DDL for {name}"
            );
        }
    }
}
