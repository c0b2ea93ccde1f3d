//! PostgreSQL storage implementation.
//!
//! Compound operations run inside one transaction. Mentor rows are taken
//! with `SELECT ... FOR UPDATE` (in name order when more than one is
//! involved), so a capacity check and its write are never interleaved with
//! another request touching the same mentor.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgPool;
use sqlx::PgConnection;

use guidance_core::{
    DeletionWindow, Email, HistoryRecord, Mentor, MentorCredential, MentorLink,
    MentorProfileUpdate, NewHistory, NewMentor, NewOwner, NewStudent, Owner, Phone, ReEnrollment, Student,
    StudentTransfer,
};

use crate::error::{Result, StoreError};
use crate::schema::CREATE_TABLES;
use crate::Store;

/// PostgreSQL-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create any missing tables.
    ///
    /// # Errors
    ///
    /// Returns an error if a DDL statement fails.
    pub async fn ensure_schema(&self) -> Result<()> {
        for ddl in CREATE_TABLES {
            sqlx::query(ddl).execute(&self.pool).await?;
        }
        Ok(())
    }
}

// =============================================================================
// Row types
// =============================================================================

#[derive(sqlx::FromRow)]
struct StudentRow {
    id: i64,
    name: String,
    phone: String,
    email: String,
    date: NaiveDate,
    class: String,
    sub: String,
    mentor_name: Option<String>,
}

impl TryFrom<StudentRow> for Student {
    type Error = StoreError;

    fn try_from(row: StudentRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            name: row.name,
            phone: decode_phone(row.phone)?,
            email: decode_email(row.email)?,
            date: row.date,
            class: row.class,
            sub: row.sub,
            mentor: row.mentor_name,
        })
    }
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    id: i64,
    name: String,
    phone: String,
    email: String,
    date: NaiveDate,
    class: String,
    sub: String,
    mentor_name: Option<String>,
    renrollment: i32,
}

impl TryFrom<HistoryRow> for HistoryRecord {
    type Error = StoreError;

    fn try_from(row: HistoryRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            name: row.name,
            phone: decode_phone(row.phone)?,
            email: decode_email(row.email)?,
            date: row.date,
            class: row.class,
            sub: row.sub,
            mentor: row.mentor_name,
            renrollment: row.renrollment,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MentorRow {
    id: i64,
    name: String,
    college: String,
    date: NaiveDate,
    phone: String,
    handle: i32,
    onn: i32,
    total: i32,
}

impl TryFrom<MentorRow> for Mentor {
    type Error = StoreError;

    fn try_from(row: MentorRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            name: row.name,
            college: row.college,
            date: row.date,
            phone: decode_phone(row.phone)?,
            handle: row.handle,
            onn: row.onn,
            total: row.total,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LoginRow {
    id: i64,
    email: String,
    password_hash: String,
    mentor_name: String,
}

impl TryFrom<LoginRow> for MentorCredential {
    type Error = StoreError;

    fn try_from(row: LoginRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            email: decode_email(row.email)?,
            password_hash: row.password_hash,
            mentor_name: row.mentor_name,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OwnerRow {
    id: i64,
    email: String,
    password_hash: String,
    owner_name: String,
}

impl TryFrom<OwnerRow> for Owner {
    type Error = StoreError;

    fn try_from(row: OwnerRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            email: decode_email(row.email)?,
            password_hash: row.password_hash,
            owner_name: row.owner_name,
        })
    }
}

fn decode_phone(raw: String) -> Result<Phone> {
    Phone::try_from(raw).map_err(|e| StoreError::Decode(e.to_string()))
}

fn decode_email(raw: String) -> Result<Email> {
    Email::try_from(raw).map_err(|e| StoreError::Decode(e.to_string()))
}

fn decode_all<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Map a unique-constraint violation to `StoreError::Duplicate`.
fn conflict(
    err: sqlx::Error,
    entity: &'static str,
    field: &'static str,
    value: impl ToString,
) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::duplicate(entity, field, value)
        }
        _ => err.into(),
    }
}

// =============================================================================
// Shared statements
// =============================================================================

const SELECT_STUDENT: &str =
    "SELECT id, name, phone, email, date, class, sub, mentor_name FROM students";
const SELECT_HISTORY: &str =
    "SELECT id, name, phone, email, date, class, sub, mentor_name, renrollment FROM re_enrollments";
const SELECT_MENTOR: &str =
    "SELECT id, name, college, date, phone, handle, onn, total FROM mentors";
const SELECT_LOGIN: &str = "SELECT id, email, password_hash, mentor_name FROM mentor_logins";

async fn student_by_id_for_update(conn: &mut PgConnection, id: i64) -> Result<Option<Student>> {
    let row = sqlx::query_as::<_, StudentRow>(&format!(
        "{SELECT_STUDENT} WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Student::try_from).transpose()
}

async fn student_by_phone_for_update(
    conn: &mut PgConnection,
    phone: &Phone,
) -> Result<Option<Student>> {
    let row = sqlx::query_as::<_, StudentRow>(&format!(
        "{SELECT_STUDENT} WHERE phone = $1 FOR UPDATE"
    ))
    .bind(phone.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Student::try_from).transpose()
}

async fn history_by_phone_for_update(
    conn: &mut PgConnection,
    phone: &Phone,
) -> Result<Option<HistoryRecord>> {
    let row = sqlx::query_as::<_, HistoryRow>(&format!(
        "{SELECT_HISTORY} WHERE phone = $1 FOR UPDATE"
    ))
    .bind(phone.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    row.map(HistoryRecord::try_from).transpose()
}

async fn mentor_by_name_for_update(conn: &mut PgConnection, name: &str) -> Result<Mentor> {
    let row = sqlx::query_as::<_, MentorRow>(&format!(
        "{SELECT_MENTOR} WHERE name = $1 FOR UPDATE"
    ))
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| StoreError::not_found("mentor", name))?;

    Mentor::try_from(row)
}

async fn mentors_by_name_for_update(
    conn: &mut PgConnection,
    names: &[String],
) -> Result<Vec<Mentor>> {
    let rows = sqlx::query_as::<_, MentorRow>(&format!(
        "{SELECT_MENTOR} WHERE name = ANY($1) ORDER BY name FOR UPDATE"
    ))
    .bind(names)
    .fetch_all(&mut *conn)
    .await?;

    decode_all(rows)
}

async fn exists(conn: &mut PgConnection, sql: &str, value: &str) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar(sql)
        .bind(value)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

async fn write_counters(conn: &mut PgConnection, mentor: &Mentor) -> Result<()> {
    sqlx::query("UPDATE mentors SET handle = $2, onn = $3, total = $4 WHERE id = $1")
        .bind(mentor.id)
        .bind(mentor.handle)
        .bind(mentor.onn)
        .bind(mentor.total)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // =========================================================================
    // Roster
    // =========================================================================

    async fn list_students(&self) -> Result<Vec<Student>> {
        let rows = sqlx::query_as::<_, StudentRow>(&format!("{SELECT_STUDENT} ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        decode_all(rows)
    }

    async fn list_unassigned_students(&self) -> Result<Vec<Student>> {
        let rows = sqlx::query_as::<_, StudentRow>(&format!(
            "{SELECT_STUDENT} WHERE mentor_name IS NULL ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        decode_all(rows)
    }

    async fn get_student(&self, id: i64) -> Result<Option<Student>> {
        let row = sqlx::query_as::<_, StudentRow>(&format!("{SELECT_STUDENT} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Student::try_from).transpose()
    }

    async fn get_student_by_phone(&self, phone: &Phone) -> Result<Option<Student>> {
        let row = sqlx::query_as::<_, StudentRow>(&format!("{SELECT_STUDENT} WHERE phone = $1"))
            .bind(phone.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Student::try_from).transpose()
    }

    async fn update_student(&self, student: &Student) -> Result<()> {
        let result = sqlx::query(
            r"
            UPDATE students
            SET name = $2, phone = $3, email = $4, date = $5, class = $6, sub = $7,
                mentor_name = $8
            WHERE id = $1
            ",
        )
        .bind(student.id)
        .bind(&student.name)
        .bind(student.phone.as_str())
        .bind(student.email.as_str())
        .bind(student.date)
        .bind(&student.class)
        .bind(&student.sub)
        .bind(student.mentor.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| conflict(e, "student", "phone", &student.phone))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("student", student.id));
        }
        Ok(())
    }

    async fn enroll(&self, student: &NewStudent) -> Result<Student> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, StudentRow>(
            r"
            INSERT INTO students (name, phone, email, date, class, sub, mentor_name)
            VALUES ($1, $2, $3, $4, $5, $6, NULL)
            RETURNING id, name, phone, email, date, class, sub, mentor_name
            ",
        )
        .bind(&student.name)
        .bind(student.phone.as_str())
        .bind(student.email.as_str())
        .bind(student.date)
        .bind(&student.class)
        .bind(&student.sub)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict(e, "student", "phone", &student.phone))?;

        sqlx::query(
            r"
            INSERT INTO re_enrollments (name, phone, email, date, class, sub, mentor_name, renrollment)
            VALUES ($1, $2, $3, $4, $5, $6, NULL, 0)
            ON CONFLICT (phone) DO UPDATE
            SET name = EXCLUDED.name, email = EXCLUDED.email, date = EXCLUDED.date,
                class = EXCLUDED.class, sub = EXCLUDED.sub, mentor_name = NULL
            ",
        )
        .bind(&student.name)
        .bind(student.phone.as_str())
        .bind(student.email.as_str())
        .bind(student.date)
        .bind(&student.class)
        .bind(&student.sub)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Student::try_from(row)
    }

    async fn transfer_student(
        &self,
        phone: &Phone,
        transfer: &StudentTransfer,
    ) -> Result<Student> {
        let mut tx = self.pool.begin().await?;
        let phone_changes = &transfer.phone != phone;

        let mut student = student_by_phone_for_update(&mut tx, phone)
            .await?
            .ok_or_else(|| StoreError::not_found("student", phone))?;

        if phone_changes
            && exists(
                &mut tx,
                "SELECT id FROM students WHERE phone = $1",
                transfer.phone.as_str(),
            )
            .await?
        {
            return Err(StoreError::duplicate("student", "phone", &transfer.phone));
        }

        let history = history_by_phone_for_update(&mut tx, phone).await?;
        if phone_changes
            && history.is_some()
            && exists(
                &mut tx,
                "SELECT id FROM re_enrollments WHERE phone = $1",
                transfer.phone.as_str(),
            )
            .await?
        {
            return Err(StoreError::duplicate("history", "phone", &transfer.phone));
        }

        let mut names = vec![transfer.new_mentor.clone()];
        names.extend(student.mentor.clone());
        names.sort();
        names.dedup();
        let locked = mentors_by_name_for_update(&mut tx, &names).await?;

        let mut new_mentor = locked
            .iter()
            .find(|m| m.name == transfer.new_mentor)
            .cloned()
            .ok_or_else(|| StoreError::not_found("mentor", &transfer.new_mentor))?;

        if student.mentor.as_deref() != Some(new_mentor.name.as_str()) {
            new_mentor.reserve(1)?;
            write_counters(&mut tx, &new_mentor).await?;

            let old_mentor = student
                .mentor
                .as_deref()
                .and_then(|name| locked.iter().find(|m| m.name == name));
            if let Some(old) = old_mentor {
                let mut old = old.clone();
                old.vacate();
                write_counters(&mut tx, &old).await?;
            }
        }

        student.apply_profile(transfer);
        student.mentor = Some(new_mentor.name.clone());

        sqlx::query(
            r"
            UPDATE students
            SET name = $2, phone = $3, email = $4, date = $5, class = $6, mentor_name = $7
            WHERE id = $1
            ",
        )
        .bind(student.id)
        .bind(&student.name)
        .bind(student.phone.as_str())
        .bind(student.email.as_str())
        .bind(student.date)
        .bind(&student.class)
        .bind(student.mentor.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict(e, "student", "phone", &transfer.phone))?;

        if let Some(history) = history {
            sqlx::query("UPDATE re_enrollments SET phone = $2, mentor_name = $3 WHERE id = $1")
                .bind(history.id)
                .bind(transfer.phone.as_str())
                .bind(student.mentor.as_deref())
                .execute(&mut *tx)
                .await
                .map_err(|e| conflict(e, "history", "phone", &transfer.phone))?;
        }

        tx.commit().await?;
        Ok(student)
    }

    async fn link_student(&self, id: i64, mentor: &str) -> Result<MentorLink> {
        let mut tx = self.pool.begin().await?;

        let student = student_by_id_for_update(&mut tx, id)
            .await?
            .ok_or_else(|| StoreError::not_found("student", id))?;
        if let Some(current) = student.mentor {
            return Err(StoreError::AlreadyLinked {
                student: id,
                mentor: current,
            });
        }

        let history = history_by_phone_for_update(&mut tx, &student.phone)
            .await?
            .ok_or_else(|| StoreError::not_found("history", &student.phone))?;

        sqlx::query("UPDATE students SET mentor_name = $2 WHERE id = $1")
            .bind(id)
            .bind(mentor)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE re_enrollments SET mentor_name = $2 WHERE id = $1")
            .bind(history.id)
            .bind(mentor)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(MentorLink {
            student_id: id,
            phone: student.phone,
            mentor: mentor.to_string(),
            previous_history: history.mentor,
        })
    }

    async fn unlink_student(&self, link: &MentorLink) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let Some(student) = student_by_id_for_update(&mut tx, link.student_id).await? else {
            return Ok(false);
        };
        if student.mentor.as_deref() != Some(link.mentor.as_str()) {
            return Ok(false);
        }

        sqlx::query("UPDATE students SET mentor_name = NULL WHERE id = $1")
            .bind(link.student_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "UPDATE re_enrollments SET mentor_name = $3 WHERE phone = $1 AND mentor_name = $2",
        )
        .bind(student.phone.as_str())
        .bind(&link.mentor)
        .bind(link.previous_history.as_deref())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn delete_recent_student(
        &self,
        id: i64,
        window: DeletionWindow,
    ) -> Result<Option<Student>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, StudentRow>(
            r"
            DELETE FROM students
            WHERE id = $1 AND date > $2 AND date < $3
            RETURNING id, name, phone, email, date, class, sub, mentor_name
            ",
        )
        .bind(id)
        .bind(window.after())
        .bind(window.before())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let student = Student::try_from(row)?;

        if let Some(name) = student.mentor.as_deref() {
            let result =
                sqlx::query("UPDATE mentors SET onn = GREATEST(onn - 1, 0) WHERE name = $1")
                    .bind(name)
                    .execute(&mut *tx)
                    .await?;
            if result.rows_affected() == 0 {
                tracing::warn!(student_id = id, mentor = %name, "Deleted student linked to unknown mentor");
            }
        }

        tx.commit().await?;
        Ok(Some(student))
    }

    // =========================================================================
    // History
    // =========================================================================

    async fn list_history(&self) -> Result<Vec<HistoryRecord>> {
        let rows = sqlx::query_as::<_, HistoryRow>(&format!("{SELECT_HISTORY} ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        decode_all(rows)
    }

    async fn get_history_by_phone(&self, phone: &Phone) -> Result<Option<HistoryRecord>> {
        let row = sqlx::query_as::<_, HistoryRow>(&format!("{SELECT_HISTORY} WHERE phone = $1"))
            .bind(phone.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(HistoryRecord::try_from).transpose()
    }

    async fn update_history(&self, record: &HistoryRecord) -> Result<()> {
        let result = sqlx::query(
            r"
            UPDATE re_enrollments
            SET name = $2, phone = $3, email = $4, date = $5, class = $6, sub = $7,
                mentor_name = $8, renrollment = $9
            WHERE id = $1
            ",
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(record.phone.as_str())
        .bind(record.email.as_str())
        .bind(record.date)
        .bind(&record.class)
        .bind(&record.sub)
        .bind(record.mentor.as_deref())
        .bind(record.renrollment)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict(e, "history", "phone", &record.phone))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("history", record.id));
        }
        Ok(())
    }

    async fn reenroll(&self, request: &ReEnrollment) -> Result<HistoryRecord> {
        let mut tx = self.pool.begin().await?;

        let mentor: Option<Option<String>> =
            sqlx::query_scalar("SELECT mentor_name FROM students WHERE phone = $1")
                .bind(request.phone.as_str())
                .fetch_optional(&mut *tx)
                .await?;
        let mentor = mentor.flatten();

        let record = match history_by_phone_for_update(&mut tx, &request.phone).await? {
            Some(mut record) => {
                record.reenroll(request, mentor)?;
                sqlx::query(
                    r"
                    UPDATE re_enrollments
                    SET name = $2, email = $3, date = $4, class = $5, sub = $6,
                        mentor_name = $7, renrollment = $8
                    WHERE id = $1
                    ",
                )
                .bind(record.id)
                .bind(&record.name)
                .bind(record.email.as_str())
                .bind(record.date)
                .bind(&record.class)
                .bind(&record.sub)
                .bind(record.mentor.as_deref())
                .bind(record.renrollment)
                .execute(&mut *tx)
                .await?;
                record
            }
            None => {
                let new = NewHistory::first_enrollment(request, mentor);
                let id: i64 = sqlx::query_scalar(
                    r"
                    INSERT INTO re_enrollments (name, phone, email, date, class, sub, mentor_name, renrollment)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    RETURNING id
                    ",
                )
                .bind(&new.name)
                .bind(new.phone.as_str())
                .bind(new.email.as_str())
                .bind(new.date)
                .bind(&new.class)
                .bind(&new.sub)
                .bind(new.mentor.as_deref())
                .bind(new.renrollment)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| conflict(e, "history", "phone", &request.phone))?;
                new.into_record(id)
            }
        };

        tx.commit().await?;
        Ok(record)
    }

    // =========================================================================
    // Mentors
    // =========================================================================

    async fn list_mentors(&self) -> Result<Vec<Mentor>> {
        let rows = sqlx::query_as::<_, MentorRow>(&format!("{SELECT_MENTOR} ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        decode_all(rows)
    }

    async fn list_idle_mentors(&self) -> Result<Vec<Mentor>> {
        let rows =
            sqlx::query_as::<_, MentorRow>(&format!("{SELECT_MENTOR} WHERE onn = 0 ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;
        decode_all(rows)
    }

    async fn get_mentor_by_name(&self, name: &str) -> Result<Option<Mentor>> {
        let row = sqlx::query_as::<_, MentorRow>(&format!("{SELECT_MENTOR} WHERE name = $1"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Mentor::try_from).transpose()
    }

    async fn get_mentor_by_phone(&self, phone: &Phone) -> Result<Option<Mentor>> {
        let row = sqlx::query_as::<_, MentorRow>(&format!("{SELECT_MENTOR} WHERE phone = $1"))
            .bind(phone.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Mentor::try_from).transpose()
    }

    async fn register_mentor(&self, mentor: &NewMentor, password_hash: &str) -> Result<Mentor> {
        let mut tx = self.pool.begin().await?;

        if exists(
            &mut tx,
            "SELECT id FROM mentors WHERE phone = $1",
            mentor.phone.as_str(),
        )
        .await?
        {
            return Err(StoreError::duplicate("mentor", "phone", &mentor.phone));
        }
        if exists(&mut tx, "SELECT id FROM mentors WHERE name = $1", &mentor.name).await? {
            return Err(StoreError::duplicate("mentor", "name", &mentor.name));
        }
        if exists(
            &mut tx,
            "SELECT id FROM mentor_logins WHERE email = $1",
            mentor.email.as_str(),
        )
        .await?
        {
            return Err(StoreError::duplicate("mentor login", "email", &mentor.email));
        }

        let row = sqlx::query_as::<_, MentorRow>(
            r"
            INSERT INTO mentors (name, college, date, phone, handle, onn, total)
            VALUES ($1, $2, $3, $4, 0, 0, 0)
            RETURNING id, name, college, date, phone, handle, onn, total
            ",
        )
        .bind(&mentor.name)
        .bind(&mentor.college)
        .bind(mentor.date)
        .bind(mentor.phone.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict(e, "mentor", "name", &mentor.name))?;

        sqlx::query(
            "INSERT INTO mentor_logins (email, password_hash, mentor_name) VALUES ($1, $2, $3)",
        )
        .bind(mentor.email.as_str())
        .bind(password_hash)
        .bind(&mentor.name)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict(e, "mentor login", "email", &mentor.email))?;

        tx.commit().await?;
        Mentor::try_from(row)
    }

    async fn reserve_capacity(&self, name: &str, count: i32) -> Result<Mentor> {
        let mut tx = self.pool.begin().await?;
        let mut mentor = mentor_by_name_for_update(&mut tx, name).await?;

        mentor.reserve(count)?;
        write_counters(&mut tx, &mentor).await?;

        tx.commit().await?;
        Ok(mentor)
    }

    async fn release_capacity(&self, name: &str, count: i32) -> Result<Mentor> {
        let mut tx = self.pool.begin().await?;
        let mut mentor = mentor_by_name_for_update(&mut tx, name).await?;

        mentor.release(count);
        write_counters(&mut tx, &mentor).await?;

        tx.commit().await?;
        Ok(mentor)
    }

    async fn set_capacity(&self, name: &str, handle: i32) -> Result<Mentor> {
        let mut tx = self.pool.begin().await?;
        let mut mentor = mentor_by_name_for_update(&mut tx, name).await?;

        mentor.set_capacity(handle)?;
        write_counters(&mut tx, &mentor).await?;

        tx.commit().await?;
        Ok(mentor)
    }

    async fn update_mentor_profile(
        &self,
        phone: &Phone,
        update: &MentorProfileUpdate,
    ) -> Result<Mentor> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, MentorRow>(&format!(
            "{SELECT_MENTOR} WHERE phone = $1 FOR UPDATE"
        ))
        .bind(phone.as_str())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::not_found("mentor", phone))?;
        let mut mentor = Mentor::try_from(row)?;
        let old_name = mentor.name.clone();
        let renamed = update.name != old_name;

        if renamed
            && exists(&mut tx, "SELECT id FROM mentors WHERE name = $1", &update.name).await?
        {
            return Err(StoreError::duplicate("mentor", "name", &update.name));
        }
        if &update.phone != phone
            && exists(
                &mut tx,
                "SELECT id FROM mentors WHERE phone = $1",
                update.phone.as_str(),
            )
            .await?
        {
            return Err(StoreError::duplicate("mentor", "phone", &update.phone));
        }

        let login = sqlx::query_as::<_, LoginRow>(&format!(
            "{SELECT_LOGIN} WHERE mentor_name = $1 FOR UPDATE"
        ))
        .bind(&old_name)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::not_found("mentor login", &old_name))?;
        let login = MentorCredential::try_from(login)?;

        if update.email != login.email
            && exists(
                &mut tx,
                "SELECT id FROM mentor_logins WHERE email = $1",
                update.email.as_str(),
            )
            .await?
        {
            return Err(StoreError::duplicate("mentor login", "email", &update.email));
        }

        sqlx::query("UPDATE mentors SET name = $2, phone = $3 WHERE id = $1")
            .bind(mentor.id)
            .bind(&update.name)
            .bind(update.phone.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| conflict(e, "mentor", "name", &update.name))?;

        sqlx::query("UPDATE mentor_logins SET email = $2, mentor_name = $3 WHERE id = $1")
            .bind(login.id)
            .bind(update.email.as_str())
            .bind(&update.name)
            .execute(&mut *tx)
            .await
            .map_err(|e| conflict(e, "mentor login", "email", &update.email))?;

        if renamed {
            sqlx::query("UPDATE students SET mentor_name = $2 WHERE mentor_name = $1")
                .bind(&old_name)
                .bind(&update.name)
                .execute(&mut *tx)
                .await?;
            sqlx::query("UPDATE re_enrollments SET mentor_name = $2 WHERE mentor_name = $1")
                .bind(&old_name)
                .bind(&update.name)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        mentor.name.clone_from(&update.name);
        mentor.phone = update.phone.clone();
        Ok(mentor)
    }

    async fn delete_idle_mentor(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let name: Option<String> =
            sqlx::query_scalar("DELETE FROM mentors WHERE id = $1 AND onn = 0 RETURNING name")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(name) = name else {
            return Ok(false);
        };

        sqlx::query("DELETE FROM mentor_logins WHERE mentor_name = $1")
            .bind(&name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    // =========================================================================
    // Credentials
    // =========================================================================

    async fn get_credential_by_email(&self, email: &Email) -> Result<Option<MentorCredential>> {
        let row = sqlx::query_as::<_, LoginRow>(&format!("{SELECT_LOGIN} WHERE email = $1"))
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(MentorCredential::try_from).transpose()
    }

    async fn update_password(&self, email: &Email, password_hash: &str) -> Result<()> {
        let result = sqlx::query("UPDATE mentor_logins SET password_hash = $2 WHERE email = $1")
            .bind(email.as_str())
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("mentor login", email));
        }
        Ok(())
    }

    // =========================================================================
    // Owners
    // =========================================================================

    async fn list_owners(&self) -> Result<Vec<Owner>> {
        let rows = sqlx::query_as::<_, OwnerRow>(
            "SELECT id, email, password_hash, owner_name FROM owners ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        decode_all(rows)
    }

    async fn create_owner(&self, owner: &NewOwner, password_hash: &str) -> Result<Owner> {
        let row = sqlx::query_as::<_, OwnerRow>(
            r"
            INSERT INTO owners (email, password_hash, owner_name)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, owner_name
            ",
        )
        .bind(owner.email.as_str())
        .bind(password_hash)
        .bind(&owner.owner_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict(e, "owner", "email", &owner.email))?;

        Owner::try_from(row)
    }
}

#[cfg(test)]
mod tests {
    //! These run against a live database named by `DATABASE_URL`:
    //! `cargo test -p guidance-store -- --ignored`.

    use super::*;
    use sqlx::postgres::PgPoolOptions;

    async fn store() -> PgStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(&url)
            .await
            .unwrap();
        let store = PgStore::new(pool);
        store.ensure_schema().await.unwrap();
        sqlx::query(
            "TRUNCATE students, mentors, re_enrollments, mentor_logins, owners RESTART IDENTITY",
        )
        .execute(store.pool())
        .await
        .unwrap();
        store
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_mentor() -> NewMentor {
        NewMentor {
            name: "Meera".into(),
            college: "IIT".into(),
            date: ymd(2024, 1, 1),
            phone: Phone::parse("9100000001").unwrap(),
            email: Email::parse("meera@example.com").unwrap(),
        }
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn reserve_and_release_round_trip() {
        let store = store().await;
        store.register_mentor(&new_mentor(), "hash").await.unwrap();
        store.set_capacity("Meera", 2).await.unwrap();

        store.reserve_capacity("Meera", 2).await.unwrap();
        let err = store.reserve_capacity("Meera", 1).await.unwrap_err();
        assert!(matches!(err, StoreError::Rule(_)));

        let mentor = store.release_capacity("Meera", 1).await.unwrap();
        assert_eq!((mentor.onn, mentor.total), (1, 1));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn enroll_keeps_history_counter() {
        let store = store().await;
        let student = NewStudent {
            name: "Asha".into(),
            phone: Phone::parse("9000000001").unwrap(),
            email: Email::parse("asha@example.com").unwrap(),
            date: ymd(2024, 1, 1),
            class: "10".into(),
            sub: "Normal".into(),
        };
        let request = ReEnrollment {
            name: student.name.clone(),
            phone: student.phone.clone(),
            email: student.email.clone(),
            date: ymd(2024, 3, 1),
            class: student.class.clone(),
            sub: student.sub.clone(),
        };

        let enrolled = store.enroll(&student).await.unwrap();
        store.reenroll(&request).await.unwrap();

        let window = DeletionWindow::ending(ymd(2024, 1, 10));
        store
            .delete_recent_student(enrolled.id, window)
            .await
            .unwrap()
            .unwrap();
        store.enroll(&student).await.unwrap();

        let history = store
            .get_history_by_phone(&student.phone)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(history.renrollment, 1);
        assert_eq!(history.date, ymd(2024, 1, 1));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn concurrent_links_claim_student_once() {
        let store = store().await;
        let student = NewStudent {
            name: "Asha".into(),
            phone: Phone::parse("9000000001").unwrap(),
            email: Email::parse("asha@example.com").unwrap(),
            date: ymd(2024, 3, 1),
            class: "10".into(),
            sub: "Normal".into(),
        };
        let enrolled = store.enroll(&student).await.unwrap();

        let (meera, ravi) = tokio::join!(
            store.link_student(enrolled.id, "Meera"),
            store.link_student(enrolled.id, "Ravi"),
        );
        let link = match (meera, ravi) {
            (Ok(link), Err(e)) | (Err(e), Ok(link)) => {
                assert!(matches!(e, StoreError::AlreadyLinked { .. }));
                link
            }
            other => panic!("exactly one link should win: {other:?}"),
        };

        let history = store
            .get_history_by_phone(&student.phone)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(history.mentor.as_deref(), Some(link.mentor.as_str()));

        assert!(store.unlink_student(&link).await.unwrap());
        assert!(!store.unlink_student(&link).await.unwrap());
        let student = store.get_student(enrolled.id).await.unwrap().unwrap();
        assert_eq!(student.mentor, None);
    }
}
