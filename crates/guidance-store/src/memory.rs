//! In-memory storage implementation.
//!
//! Every table lives behind one `tokio::sync::Mutex`, so each trait method is
//! a single critical section and compound operations are atomic exactly like
//! their PostgreSQL counterparts.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};

use guidance_core::{
    DeletionWindow, Email, HistoryRecord, Mentor, MentorCredential, MentorLink,
    MentorProfileUpdate, NewHistory, NewMentor, NewOwner, NewStudent, Owner, Phone, ReEnrollment, Student,
    StudentTransfer,
};

use crate::error::{Result, StoreError};
use crate::Store;

#[derive(Debug, Default)]
struct Tables {
    last_id: i64,
    students: BTreeMap<i64, Student>,
    mentors: BTreeMap<i64, Mentor>,
    history: BTreeMap<i64, HistoryRecord>,
    logins: BTreeMap<i64, MentorCredential>,
    owners: BTreeMap<i64, Owner>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn student_by_phone(&self, phone: &Phone) -> Option<&Student> {
        self.students.values().find(|s| &s.phone == phone)
    }

    fn history_by_phone(&self, phone: &Phone) -> Option<&HistoryRecord> {
        self.history.values().find(|h| &h.phone == phone)
    }

    fn history_by_phone_mut(&mut self, phone: &Phone) -> Option<&mut HistoryRecord> {
        self.history.values_mut().find(|h| &h.phone == phone)
    }

    fn mentor_by_name(&self, name: &str) -> Option<&Mentor> {
        self.mentors.values().find(|m| m.name == name)
    }

    fn mentor_by_name_mut(&mut self, name: &str) -> Option<&mut Mentor> {
        self.mentors.values_mut().find(|m| m.name == name)
    }

    fn mentor_by_phone(&self, phone: &Phone) -> Option<&Mentor> {
        self.mentors.values().find(|m| &m.phone == phone)
    }

    fn login_by_email(&self, email: &Email) -> Option<&MentorCredential> {
        self.logins.values().find(|l| &l.email == email)
    }

    fn login_by_mentor(&self, name: &str) -> Option<&MentorCredential> {
        self.logins.values().find(|l| l.mentor_name == name)
    }
}

/// Process-local storage backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    latency: Option<Duration>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that waits `latency` before every operation,
    /// the way a network round-trip would.
    #[must_use]
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            tables: Mutex::default(),
            latency: Some(latency),
        }
    }

    /// Insert a roster record without a history row.
    ///
    /// Fixture helper for data that predates history tracking.
    ///
    /// # Errors
    ///
    /// `StoreError::Duplicate` if the phone is already on the roster.
    pub async fn insert_roster_only(
        &self,
        student: &NewStudent,
        mentor: Option<String>,
    ) -> Result<Student> {
        let mut tables = self.lock().await;

        if tables.student_by_phone(&student.phone).is_some() {
            return Err(StoreError::duplicate("student", "phone", &student.phone));
        }

        let id = tables.next_id();
        let mut record = Student::enrolled(id, student);
        record.mentor = mentor;
        tables.students.insert(id, record.clone());
        Ok(record)
    }

    async fn lock(&self) -> MutexGuard<'_, Tables> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.tables.lock().await
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<()> {
        drop(self.lock().await);
        Ok(())
    }

    // =========================================================================
    // Roster
    // =========================================================================

    async fn list_students(&self) -> Result<Vec<Student>> {
        Ok(self.lock().await.students.values().cloned().collect())
    }

    async fn get_student(&self, id: i64) -> Result<Option<Student>> {
        Ok(self.lock().await.students.get(&id).cloned())
    }

    async fn get_student_by_phone(&self, phone: &Phone) -> Result<Option<Student>> {
        Ok(self.lock().await.student_by_phone(phone).cloned())
    }

    async fn update_student(&self, student: &Student) -> Result<()> {
        let mut tables = self.lock().await;

        if !tables.students.contains_key(&student.id) {
            return Err(StoreError::not_found("student", student.id));
        }

        if tables
            .student_by_phone(&student.phone)
            .is_some_and(|other| other.id != student.id)
        {
            return Err(StoreError::duplicate("student", "phone", &student.phone));
        }

        tables.students.insert(student.id, student.clone());
        Ok(())
    }

    async fn enroll(&self, student: &NewStudent) -> Result<Student> {
        let mut tables = self.lock().await;

        if tables.student_by_phone(&student.phone).is_some() {
            return Err(StoreError::duplicate("student", "phone", &student.phone));
        }

        let id = tables.next_id();
        let record = Student::enrolled(id, student);
        tables.students.insert(id, record.clone());

        if let Some(history) = tables.history_by_phone_mut(&student.phone) {
            history.refresh_for_enrollment(student);
        } else {
            let history_id = tables.next_id();
            let history = NewHistory::from(student).into_record(history_id);
            tables.history.insert(history_id, history);
        }

        Ok(record)
    }

    async fn transfer_student(
        &self,
        phone: &Phone,
        transfer: &StudentTransfer,
    ) -> Result<Student> {
        let mut tables = self.lock().await;
        let phone_changes = &transfer.phone != phone;

        let mut student = tables
            .student_by_phone(phone)
            .cloned()
            .ok_or_else(|| StoreError::not_found("student", phone))?;

        if phone_changes && tables.student_by_phone(&transfer.phone).is_some() {
            return Err(StoreError::duplicate("student", "phone", &transfer.phone));
        }

        let mut history = tables.history_by_phone(phone).cloned();
        if phone_changes
            && tables
                .history_by_phone(&transfer.phone)
                .is_some_and(|other| history.as_ref().map(|h| h.id) != Some(other.id))
        {
            return Err(StoreError::duplicate("history", "phone", &transfer.phone));
        }

        let mut new_mentor = tables
            .mentor_by_name(&transfer.new_mentor)
            .cloned()
            .ok_or_else(|| StoreError::not_found("mentor", &transfer.new_mentor))?;

        let moving = student.mentor.as_deref() != Some(new_mentor.name.as_str());
        let mut old_mentor = None;
        if moving {
            new_mentor.reserve(1)?;
            old_mentor = student
                .mentor
                .as_deref()
                .and_then(|name| tables.mentor_by_name(name))
                .cloned();
            if let Some(old) = old_mentor.as_mut() {
                old.vacate();
            }
        }

        student.apply_profile(transfer);
        student.mentor = Some(new_mentor.name.clone());
        if let Some(history) = history.as_mut() {
            history.phone = transfer.phone.clone();
            history.mentor.clone_from(&student.mentor);
        }

        if moving {
            tables.mentors.insert(new_mentor.id, new_mentor);
            if let Some(old) = old_mentor {
                tables.mentors.insert(old.id, old);
            }
        }
        if let Some(history) = history {
            tables.history.insert(history.id, history);
        }
        tables.students.insert(student.id, student.clone());

        Ok(student)
    }

    async fn link_student(&self, id: i64, mentor: &str) -> Result<MentorLink> {
        let mut tables = self.lock().await;

        let student = tables
            .students
            .get(&id)
            .ok_or_else(|| StoreError::not_found("student", id))?;
        if let Some(current) = &student.mentor {
            return Err(StoreError::AlreadyLinked {
                student: id,
                mentor: current.clone(),
            });
        }
        let phone = student.phone.clone();

        let history = tables
            .history_by_phone_mut(&phone)
            .ok_or_else(|| StoreError::not_found("history", &phone))?;
        let previous_history = history.mentor.replace(mentor.to_string());

        if let Some(student) = tables.students.get_mut(&id) {
            student.mentor = Some(mentor.to_string());
        }

        Ok(MentorLink {
            student_id: id,
            phone,
            mentor: mentor.to_string(),
            previous_history,
        })
    }

    async fn unlink_student(&self, link: &MentorLink) -> Result<bool> {
        let mut tables = self.lock().await;

        let Some(student) = tables.students.get_mut(&link.student_id) else {
            return Ok(false);
        };
        if student.mentor.as_deref() != Some(link.mentor.as_str()) {
            return Ok(false);
        }
        student.mentor = None;
        let phone = student.phone.clone();

        if let Some(history) = tables.history_by_phone_mut(&phone) {
            if history.mentor.as_deref() == Some(link.mentor.as_str()) {
                history.mentor.clone_from(&link.previous_history);
            }
        }

        Ok(true)
    }

    async fn delete_recent_student(
        &self,
        id: i64,
        window: DeletionWindow,
    ) -> Result<Option<Student>> {
        let mut tables = self.lock().await;

        let in_window = tables
            .students
            .get(&id)
            .is_some_and(|s| window.contains(s.date));
        if !in_window {
            return Ok(None);
        }

        let Some(student) = tables.students.remove(&id) else {
            return Ok(None);
        };

        if let Some(name) = student.mentor.as_deref() {
            if let Some(mentor) = tables.mentor_by_name_mut(name) {
                mentor.vacate();
            } else {
                tracing::warn!(student_id = id, mentor = %name, "Deleted student linked to unknown mentor");
            }
        }

        Ok(Some(student))
    }

    // =========================================================================
    // History
    // =========================================================================

    async fn list_history(&self) -> Result<Vec<HistoryRecord>> {
        Ok(self.lock().await.history.values().cloned().collect())
    }

    async fn get_history_by_phone(&self, phone: &Phone) -> Result<Option<HistoryRecord>> {
        Ok(self.lock().await.history_by_phone(phone).cloned())
    }

    async fn update_history(&self, record: &HistoryRecord) -> Result<()> {
        let mut tables = self.lock().await;

        let Some(existing) = tables.history.get_mut(&record.id) else {
            return Err(StoreError::not_found("history", record.id));
        };

        existing.clone_from(record);
        Ok(())
    }

    async fn reenroll(&self, request: &ReEnrollment) -> Result<HistoryRecord> {
        let mut tables = self.lock().await;

        let mentor = tables
            .student_by_phone(&request.phone)
            .and_then(|s| s.mentor.clone());

        if let Some(history) = tables.history_by_phone_mut(&request.phone) {
            history.reenroll(request, mentor)?;
            return Ok(history.clone());
        }

        let id = tables.next_id();
        let history = NewHistory::first_enrollment(request, mentor).into_record(id);
        tables.history.insert(id, history.clone());
        Ok(history)
    }

    // =========================================================================
    // Mentors
    // =========================================================================

    async fn list_mentors(&self) -> Result<Vec<Mentor>> {
        Ok(self.lock().await.mentors.values().cloned().collect())
    }

    async fn get_mentor_by_name(&self, name: &str) -> Result<Option<Mentor>> {
        Ok(self.lock().await.mentor_by_name(name).cloned())
    }

    async fn get_mentor_by_phone(&self, phone: &Phone) -> Result<Option<Mentor>> {
        Ok(self.lock().await.mentor_by_phone(phone).cloned())
    }

    async fn register_mentor(&self, mentor: &NewMentor, password_hash: &str) -> Result<Mentor> {
        let mut tables = self.lock().await;

        if tables.mentor_by_phone(&mentor.phone).is_some() {
            return Err(StoreError::duplicate("mentor", "phone", &mentor.phone));
        }
        if tables.mentor_by_name(&mentor.name).is_some() {
            return Err(StoreError::duplicate("mentor", "name", &mentor.name));
        }
        if tables.login_by_email(&mentor.email).is_some() {
            return Err(StoreError::duplicate("mentor login", "email", &mentor.email));
        }

        let id = tables.next_id();
        let record = Mentor::registered(id, mentor);
        tables.mentors.insert(id, record.clone());

        let login_id = tables.next_id();
        tables.logins.insert(
            login_id,
            MentorCredential {
                id: login_id,
                email: mentor.email.clone(),
                password_hash: password_hash.to_string(),
                mentor_name: mentor.name.clone(),
            },
        );

        Ok(record)
    }

    async fn reserve_capacity(&self, name: &str, count: i32) -> Result<Mentor> {
        let mut tables = self.lock().await;
        let mentor = tables
            .mentor_by_name_mut(name)
            .ok_or_else(|| StoreError::not_found("mentor", name))?;

        mentor.reserve(count)?;
        Ok(mentor.clone())
    }

    async fn release_capacity(&self, name: &str, count: i32) -> Result<Mentor> {
        let mut tables = self.lock().await;
        let mentor = tables
            .mentor_by_name_mut(name)
            .ok_or_else(|| StoreError::not_found("mentor", name))?;

        mentor.release(count);
        Ok(mentor.clone())
    }

    async fn set_capacity(&self, name: &str, handle: i32) -> Result<Mentor> {
        let mut tables = self.lock().await;
        let mentor = tables
            .mentor_by_name_mut(name)
            .ok_or_else(|| StoreError::not_found("mentor", name))?;

        mentor.set_capacity(handle)?;
        Ok(mentor.clone())
    }

    async fn update_mentor_profile(
        &self,
        phone: &Phone,
        update: &MentorProfileUpdate,
    ) -> Result<Mentor> {
        let mut tables = self.lock().await;

        let mut mentor = tables
            .mentor_by_phone(phone)
            .cloned()
            .ok_or_else(|| StoreError::not_found("mentor", phone))?;
        let old_name = mentor.name.clone();
        let renamed = update.name != old_name;

        if renamed && tables.mentor_by_name(&update.name).is_some() {
            return Err(StoreError::duplicate("mentor", "name", &update.name));
        }
        if update.phone != mentor.phone && tables.mentor_by_phone(&update.phone).is_some() {
            return Err(StoreError::duplicate("mentor", "phone", &update.phone));
        }

        let mut login = tables
            .login_by_mentor(&old_name)
            .cloned()
            .ok_or_else(|| StoreError::not_found("mentor login", &old_name))?;
        if update.email != login.email && tables.login_by_email(&update.email).is_some() {
            return Err(StoreError::duplicate("mentor login", "email", &update.email));
        }

        mentor.name.clone_from(&update.name);
        mentor.phone = update.phone.clone();
        login.mentor_name.clone_from(&update.name);
        login.email = update.email.clone();

        if renamed {
            let linked = Some(old_name);
            for student in tables.students.values_mut().filter(|s| s.mentor == linked) {
                student.mentor = Some(update.name.clone());
            }
            for history in tables.history.values_mut().filter(|h| h.mentor == linked) {
                history.mentor = Some(update.name.clone());
            }
        }

        tables.logins.insert(login.id, login);
        tables.mentors.insert(mentor.id, mentor.clone());
        Ok(mentor)
    }

    async fn delete_idle_mentor(&self, id: i64) -> Result<bool> {
        let mut tables = self.lock().await;

        let name = match tables.mentors.get(&id) {
            Some(mentor) if mentor.is_idle() => mentor.name.clone(),
            _ => return Ok(false),
        };

        tables.mentors.remove(&id);
        tables.logins.retain(|_, login| login.mentor_name != name);
        Ok(true)
    }

    // =========================================================================
    // Credentials
    // =========================================================================

    async fn get_credential_by_email(&self, email: &Email) -> Result<Option<MentorCredential>> {
        Ok(self.lock().await.login_by_email(email).cloned())
    }

    async fn update_password(&self, email: &Email, password_hash: &str) -> Result<()> {
        let mut tables = self.lock().await;

        let login = tables
            .logins
            .values_mut()
            .find(|l| &l.email == email)
            .ok_or_else(|| StoreError::not_found("mentor login", email))?;

        login.password_hash = password_hash.to_string();
        Ok(())
    }

    // =========================================================================
    // Owners
    // =========================================================================

    async fn list_owners(&self) -> Result<Vec<Owner>> {
        Ok(self.lock().await.owners.values().cloned().collect())
    }

    async fn create_owner(&self, owner: &NewOwner, password_hash: &str) -> Result<Owner> {
        let mut tables = self.lock().await;

        if tables.owners.values().any(|o| o.email == owner.email) {
            return Err(StoreError::duplicate("owner", "email", &owner.email));
        }

        let id = tables.next_id();
        let record = Owner {
            id,
            email: owner.email.clone(),
            password_hash: password_hash.to_string(),
            owner_name: owner.owner_name.clone(),
        };
        tables.owners.insert(id, record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use guidance_core::GuidanceError;

    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn phone(raw: &str) -> Phone {
        Phone::parse(raw).unwrap()
    }

    fn new_student(name: &str, raw_phone: &str, date: NaiveDate) -> NewStudent {
        NewStudent {
            name: name.into(),
            phone: phone(raw_phone),
            email: Email::parse(&format!("{}@example.com", name.to_lowercase())).unwrap(),
            date,
            class: "10".into(),
            sub: "Normal".into(),
        }
    }

    fn new_mentor(name: &str, raw_phone: &str) -> NewMentor {
        NewMentor {
            name: name.into(),
            college: "IIT".into(),
            date: ymd(2024, 1, 1),
            phone: phone(raw_phone),
            email: Email::parse(&format!("{}@mentors.example.com", name.to_lowercase()))
                .unwrap(),
        }
    }

    async fn mentor_with_capacity(store: &MemoryStore, name: &str, raw_phone: &str, handle: i32) {
        store
            .register_mentor(&new_mentor(name, raw_phone), "hash")
            .await
            .unwrap();
        store.set_capacity(name, handle).await.unwrap();
    }

    #[tokio::test]
    async fn enroll_creates_roster_and_history() {
        let store = MemoryStore::new();
        let student = store
            .enroll(&new_student("Asha", "9000000001", ymd(2024, 3, 1)))
            .await
            .unwrap();

        assert_eq!(student.mentor, None);
        let history = store
            .get_history_by_phone(&student.phone)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(history.renrollment, 0);
        assert_eq!(history.date, ymd(2024, 3, 1));

        let err = store
            .enroll(&new_student("Asha", "9000000001", ymd(2024, 3, 2)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "phone", .. }));
        assert_eq!(store.list_students().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reservation_stops_at_capacity() {
        let store = MemoryStore::new();
        mentor_with_capacity(&store, "Meera", "9100000001", 5).await;
        store.reserve_capacity("Meera", 3).await.unwrap();

        let mentor = store.reserve_capacity("Meera", 2).await.unwrap();
        assert_eq!((mentor.onn, mentor.total), (5, 5));

        let err = store.reserve_capacity("Meera", 1).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Rule(GuidanceError::CapacityExceeded { load: 5, .. })
        ));

        let mentor = store.release_capacity("Meera", 2).await.unwrap();
        assert_eq!((mentor.onn, mentor.total), (3, 3));
    }

    #[tokio::test]
    async fn concurrent_reservations_never_oversubscribe() {
        let store = Arc::new(MemoryStore::new());
        mentor_with_capacity(&store, "Meera", "9100000001", 4).await;

        let mut tasks = Vec::new();
        for _ in 0..10 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store.reserve_capacity("Meera", 1).await.is_ok()
            }));
        }

        let mut granted = 0;
        for task in tasks {
            if task.await.unwrap() {
                granted += 1;
            }
        }

        assert_eq!(granted, 4);
        let mentor = store.get_mentor_by_name("Meera").await.unwrap().unwrap();
        assert_eq!(mentor.onn, 4);
    }

    #[tokio::test]
    async fn link_claims_unassigned_student_once() {
        let store = Arc::new(MemoryStore::new());
        let student = store
            .enroll(&new_student("Asha", "9000000001", ymd(2024, 3, 1)))
            .await
            .unwrap();
        let id = student.id;

        let mut tasks = Vec::new();
        for mentor in ["Meera", "Ravi", "Kiran"] {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move { store.link_student(id, mentor).await }));
        }

        let mut winners = Vec::new();
        for task in tasks {
            match task.await.unwrap() {
                Ok(link) => winners.push(link),
                Err(e) => assert!(matches!(e, StoreError::AlreadyLinked { .. })),
            }
        }
        assert_eq!(winners.len(), 1);

        let linked = store.get_student(student.id).await.unwrap().unwrap();
        assert_eq!(linked.mentor.as_deref(), Some(winners[0].mentor.as_str()));
        let history = store
            .get_history_by_phone(&student.phone)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(history.mentor, linked.mentor);
        assert_eq!(winners[0].previous_history, None);
    }

    #[tokio::test]
    async fn link_without_history_writes_nothing() {
        let store = MemoryStore::new();
        let orphan = store
            .insert_roster_only(&new_student("Asha", "9000000001", ymd(2024, 3, 1)), None)
            .await
            .unwrap();

        let err = store.link_student(orphan.id, "Meera").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "history", .. }));
        let student = store.get_student(orphan.id).await.unwrap().unwrap();
        assert_eq!(student.mentor, None);

        assert!(matches!(
            store.link_student(424_242, "Meera").await,
            Err(StoreError::NotFound { entity: "student", .. })
        ));
    }

    #[tokio::test]
    async fn unlink_leaves_moved_students_alone() {
        let store = MemoryStore::new();
        mentor_with_capacity(&store, "Meera", "9100000001", 2).await;
        mentor_with_capacity(&store, "Ravi", "9100000002", 2).await;
        let student = store
            .enroll(&new_student("Asha", "9000000001", ymd(2024, 3, 1)))
            .await
            .unwrap();
        store.reserve_capacity("Meera", 1).await.unwrap();
        let link = store.link_student(student.id, "Meera").await.unwrap();

        let transfer = StudentTransfer {
            name: "Asha".into(),
            phone: student.phone.clone(),
            email: student.email.clone(),
            class: "11".into(),
            date: student.date,
            new_mentor: "Ravi".into(),
        };
        store.transfer_student(&student.phone, &transfer).await.unwrap();

        assert!(!store.unlink_student(&link).await.unwrap());
        let moved = store.get_student(student.id).await.unwrap().unwrap();
        assert_eq!(moved.mentor.as_deref(), Some("Ravi"));
        let history = store
            .get_history_by_phone(&student.phone)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(history.mentor.as_deref(), Some("Ravi"));
    }

    #[tokio::test]
    async fn unlink_restores_previous_history() {
        let store = MemoryStore::new();
        let student = store
            .enroll(&new_student("Asha", "9000000001", ymd(2024, 3, 1)))
            .await
            .unwrap();
        let mut history = store
            .get_history_by_phone(&student.phone)
            .await
            .unwrap()
            .unwrap();
        history.mentor = Some("Kiran".into());
        store.update_history(&history).await.unwrap();

        let link = store.link_student(student.id, "Meera").await.unwrap();
        assert_eq!(link.previous_history.as_deref(), Some("Kiran"));

        assert!(store.unlink_student(&link).await.unwrap());
        let student = store.get_student(student.id).await.unwrap().unwrap();
        assert_eq!(student.mentor, None);
        let history = store
            .get_history_by_phone(&student.phone)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(history.mentor.as_deref(), Some("Kiran"));
    }

    #[tokio::test]
    async fn capacity_cannot_drop_below_load() {
        let store = MemoryStore::new();
        mentor_with_capacity(&store, "Meera", "9100000001", 3).await;
        store.reserve_capacity("Meera", 2).await.unwrap();

        let err = store.set_capacity("Meera", 1).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Rule(GuidanceError::CapacityBelowLoad { .. })
        ));
        assert!(matches!(
            store.set_capacity("Nobody", 1).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn transfer_moves_load_and_history() {
        let store = MemoryStore::new();
        mentor_with_capacity(&store, "Meera", "9100000001", 2).await;
        mentor_with_capacity(&store, "Ravi", "9100000002", 2).await;

        let student = store
            .enroll(&new_student("Asha", "9000000001", ymd(2024, 3, 1)))
            .await
            .unwrap();
        store.reserve_capacity("Meera", 1).await.unwrap();
        let mut linked = student.clone();
        linked.mentor = Some("Meera".into());
        store.update_student(&linked).await.unwrap();

        let transfer = StudentTransfer {
            name: "Asha K".into(),
            phone: phone("9000000009"),
            email: student.email.clone(),
            class: "11".into(),
            date: ymd(2024, 3, 5),
            new_mentor: "Ravi".into(),
        };
        let moved = store
            .transfer_student(&student.phone, &transfer)
            .await
            .unwrap();

        assert_eq!(moved.mentor.as_deref(), Some("Ravi"));
        assert_eq!(moved.phone, phone("9000000009"));

        let meera = store.get_mentor_by_name("Meera").await.unwrap().unwrap();
        let ravi = store.get_mentor_by_name("Ravi").await.unwrap().unwrap();
        assert_eq!((meera.onn, meera.total), (0, 1));
        assert_eq!((ravi.onn, ravi.total), (1, 1));

        let history = store
            .get_history_by_phone(&phone("9000000009"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(history.mentor.as_deref(), Some("Ravi"));
    }

    #[tokio::test]
    async fn transfer_to_full_mentor_changes_nothing() {
        let store = MemoryStore::new();
        mentor_with_capacity(&store, "Ravi", "9100000002", 0).await;
        let student = store
            .enroll(&new_student("Asha", "9000000001", ymd(2024, 3, 1)))
            .await
            .unwrap();

        let transfer = StudentTransfer {
            name: "Changed".into(),
            phone: student.phone.clone(),
            email: student.email.clone(),
            class: student.class.clone(),
            date: student.date,
            new_mentor: "Ravi".into(),
        };
        let err = store
            .transfer_student(&student.phone, &transfer)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::Rule(GuidanceError::CapacityExceeded { .. })
        ));
        let unchanged = store.get_student(student.id).await.unwrap().unwrap();
        assert_eq!(unchanged, student);
    }

    #[tokio::test]
    async fn sweep_deletes_inside_window_and_frees_slot() {
        let store = MemoryStore::new();
        mentor_with_capacity(&store, "Meera", "9100000001", 3).await;
        store.reserve_capacity("Meera", 1).await.unwrap();
        let recent = store
            .insert_roster_only(
                &new_student("Asha", "9000000001", ymd(2024, 6, 10)),
                Some("Meera".into()),
            )
            .await
            .unwrap();
        let old = store
            .insert_roster_only(&new_student("Bala", "9000000002", ymd(2024, 4, 1)), None)
            .await
            .unwrap();

        let window = DeletionWindow::ending(ymd(2024, 6, 20));
        let deleted = store.delete_recent_student(recent.id, window).await.unwrap();
        assert_eq!(deleted.map(|s| s.id), Some(recent.id));
        assert!(store
            .delete_recent_student(old.id, window)
            .await
            .unwrap()
            .is_none());
        assert!(store.delete_recent_student(999, window).await.unwrap().is_none());

        let meera = store.get_mentor_by_name("Meera").await.unwrap().unwrap();
        assert_eq!((meera.onn, meera.total), (0, 1));
        assert_eq!(store.list_students().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reenroll_honours_thirty_day_gate() {
        let store = MemoryStore::new();
        let request = |date| ReEnrollment {
            name: "Asha".into(),
            phone: phone("9000000001"),
            email: Email::parse("asha@example.com").unwrap(),
            date,
            class: "10".into(),
            sub: "Normal".into(),
        };

        let first = store.reenroll(&request(ymd(2024, 1, 1))).await.unwrap();
        assert_eq!(first.renrollment, 0);

        let err = store.reenroll(&request(ymd(2024, 1, 20))).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Rule(GuidanceError::TooSoon {
                elapsed_days: 19,
                ..
            })
        ));

        let second = store.reenroll(&request(ymd(2024, 2, 5))).await.unwrap();
        assert_eq!(second.renrollment, 1);
        assert_eq!(second.date, ymd(2024, 2, 5));
    }

    #[tokio::test]
    async fn rename_follows_linkages() {
        let store = MemoryStore::new();
        mentor_with_capacity(&store, "Meera", "9100000001", 3).await;
        let student = store
            .enroll(&new_student("Asha", "9000000001", ymd(2024, 3, 1)))
            .await
            .unwrap();
        let mut linked = student.clone();
        linked.mentor = Some("Meera".into());
        store.update_student(&linked).await.unwrap();

        let update = MentorProfileUpdate {
            name: "Meera S".into(),
            phone: phone("9100000001"),
            email: Email::parse("meera.s@example.com").unwrap(),
        };
        let mentor = store
            .update_mentor_profile(&phone("9100000001"), &update)
            .await
            .unwrap();
        assert_eq!(mentor.name, "Meera S");

        let student = store.get_student(student.id).await.unwrap().unwrap();
        assert_eq!(student.mentor.as_deref(), Some("Meera S"));
        let login = store
            .get_credential_by_email(&update.email)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(login.mentor_name, "Meera S");
    }

    #[tokio::test]
    async fn only_idle_mentors_are_deleted() {
        let store = MemoryStore::new();
        mentor_with_capacity(&store, "Meera", "9100000001", 3).await;
        let meera = store.reserve_capacity("Meera", 1).await.unwrap();

        assert!(!store.delete_idle_mentor(meera.id).await.unwrap());
        store.release_capacity("Meera", 1).await.unwrap();
        assert!(store.delete_idle_mentor(meera.id).await.unwrap());
        assert!(store.list_mentors().await.unwrap().is_empty());

        let email = Email::parse("meera@mentors.example.com").unwrap();
        assert!(store.get_credential_by_email(&email).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn registration_rejects_taken_keys() {
        let store = MemoryStore::new();
        store
            .register_mentor(&new_mentor("Meera", "9100000001"), "hash")
            .await
            .unwrap();

        let err = store
            .register_mentor(&new_mentor("Meera", "9100000002"), "hash")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "name", .. }));

        let err = store
            .register_mentor(&new_mentor("Ravi", "9100000001"), "hash")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "phone", .. }));
    }
}
