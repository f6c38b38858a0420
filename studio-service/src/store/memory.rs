//! In-process store for tests and local runs without PostgreSQL.

use async_trait::async_trait;
use chrono::Utc;
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::StudioStore;
use crate::models::{
    NewUser, Student, StudentProfileUpdate, StudioClient, StudioInstructor, StudioStudent,
    UserRecord, UserType,
};

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: Vec<(UserType, UserRecord)>,
    students: HashMap<i64, Student>,
    studio_instructors: Vec<StudioInstructor>,
    studio_students: Vec<StudioStudent>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Mutex-guarded store with the same read-your-writes semantics as `PgStore`.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "Memory store marked unavailable"
            )));
        }
        self.inner
            .lock()
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Memory store mutex poisoned: {}", e)))
    }

    /// Insert a relationship fact between an instructor and a studio.
    pub fn link_instructor(
        &self,
        studio_id: i64,
        instructor_id: i64,
        is_approved: bool,
        is_admin: bool,
    ) -> Result<StudioInstructor, AppError> {
        let mut inner = self.lock()?;
        let link = StudioInstructor {
            id: inner.next_id(),
            studio_id,
            instructor_id,
            is_approved,
            is_admin,
        };
        inner.studio_instructors.push(link.clone());
        Ok(link)
    }

    /// Insert a relationship fact between a student and a studio.
    pub fn link_student(
        &self,
        studio_id: i64,
        student_id: i64,
        is_approved: bool,
    ) -> Result<StudioStudent, AppError> {
        let mut inner = self.lock()?;
        let link = StudioStudent {
            id: inner.next_id(),
            studio_id,
            student_id,
            is_approved,
        };
        inner.studio_students.push(link.clone());
        Ok(link)
    }

    pub fn unlink_instructor(&self, studio_id: i64, instructor_id: i64) -> Result<(), AppError> {
        let mut inner = self.lock()?;
        inner
            .studio_instructors
            .retain(|l| !(l.studio_id == studio_id && l.instructor_id == instructor_id));
        Ok(())
    }
}

#[async_trait]
impl StudioStore for MemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        self.lock().map(|_| ())
    }

    async fn find_user(
        &self,
        user_type: UserType,
        email: &str,
    ) -> Result<Option<UserRecord>, AppError> {
        let inner = self.lock()?;
        Ok(inner
            .users
            .iter()
            .find(|(t, u)| *t == user_type && u.email.eq_ignore_ascii_case(email))
            .map(|(_, u)| u.clone()))
    }

    async fn insert_user(
        &self,
        user_type: UserType,
        user: NewUser,
    ) -> Result<UserRecord, AppError> {
        let mut inner = self.lock()?;
        if inner
            .users
            .iter()
            .any(|(t, u)| *t == user_type && u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(AppError::Conflict(anyhow::anyhow!("Email already registered")));
        }

        let record = UserRecord {
            id: inner.next_id(),
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };

        if user_type == UserType::Student {
            inner.students.insert(
                record.id,
                Student {
                    id: record.id,
                    email: record.email.clone(),
                    first_name: record.first_name.clone(),
                    last_name: record.last_name.clone(),
                    phone: None,
                    notes: None,
                    profile_picture_url: None,
                },
            );
        }

        inner.users.push((user_type, record.clone()));
        Ok(record)
    }

    async fn set_user_password(
        &self,
        user_type: UserType,
        user_id: i64,
        password_hash: &str,
    ) -> Result<(), AppError> {
        let mut inner = self.lock()?;
        if let Some((_, user)) = inner
            .users
            .iter_mut()
            .find(|(t, u)| *t == user_type && u.id == user_id)
        {
            user.password_hash = Some(password_hash.to_string());
        }
        Ok(())
    }

    async fn find_studio_instructor(
        &self,
        instructor_id: i64,
        studio_id: i64,
    ) -> Result<Option<StudioInstructor>, AppError> {
        let inner = self.lock()?;
        Ok(inner
            .studio_instructors
            .iter()
            .find(|l| l.instructor_id == instructor_id && l.studio_id == studio_id)
            .cloned())
    }

    async fn find_studio_instructor_by_id(
        &self,
        id: i64,
    ) -> Result<Option<StudioInstructor>, AppError> {
        let inner = self.lock()?;
        Ok(inner.studio_instructors.iter().find(|l| l.id == id).cloned())
    }

    async fn find_studio_student_by_id(
        &self,
        id: i64,
    ) -> Result<Option<StudioStudent>, AppError> {
        let inner = self.lock()?;
        Ok(inner.studio_students.iter().find(|l| l.id == id).cloned())
    }

    async fn set_studio_instructor_approval(
        &self,
        id: i64,
        approved: bool,
    ) -> Result<bool, AppError> {
        let mut inner = self.lock()?;
        match inner.studio_instructors.iter_mut().find(|l| l.id == id) {
            Some(link) => {
                link.is_approved = approved;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_studio_student_approval(
        &self,
        id: i64,
        approved: bool,
    ) -> Result<bool, AppError> {
        let mut inner = self.lock()?;
        match inner.studio_students.iter_mut().find(|l| l.id == id) {
            Some(link) => {
                link.is_approved = approved;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_studio_clients(&self, studio_id: i64) -> Result<Vec<StudioClient>, AppError> {
        let inner = self.lock()?;
        let mut clients: Vec<StudioClient> = inner
            .studio_students
            .iter()
            .filter(|l| l.studio_id == studio_id)
            .filter_map(|l| {
                inner.students.get(&l.student_id).map(|s| StudioClient {
                    relationship_id: l.id,
                    studio_id: l.studio_id,
                    is_approved: l.is_approved,
                    student: s.clone(),
                })
            })
            .collect();
        clients.sort_by(|a, b| client_order(a).cmp(&client_order(b)));
        Ok(clients)
    }

    async fn find_studio_client(
        &self,
        studio_id: i64,
        student_id: i64,
    ) -> Result<Option<StudioClient>, AppError> {
        let inner = self.lock()?;
        let link = inner
            .studio_students
            .iter()
            .find(|l| l.studio_id == studio_id && l.student_id == student_id);
        Ok(link.and_then(|l| {
            inner.students.get(&l.student_id).map(|s| StudioClient {
                relationship_id: l.id,
                studio_id: l.studio_id,
                is_approved: l.is_approved,
                student: s.clone(),
            })
        }))
    }

    async fn find_student(&self, student_id: i64) -> Result<Option<Student>, AppError> {
        let inner = self.lock()?;
        Ok(inner.students.get(&student_id).cloned())
    }

    async fn update_student_profile(
        &self,
        student_id: i64,
        update: &StudentProfileUpdate,
    ) -> Result<Option<Student>, AppError> {
        let mut inner = self.lock()?;
        let Some(student) = inner.students.get_mut(&student_id) else {
            return Ok(None);
        };

        if let Some(v) = &update.first_name {
            student.first_name = Some(v.clone());
        }
        if let Some(v) = &update.last_name {
            student.last_name = Some(v.clone());
        }
        if let Some(v) = &update.phone {
            student.phone = Some(v.clone());
        }
        if let Some(v) = &update.notes {
            student.notes = Some(v.clone());
        }
        let updated = student.clone();

        if let Some((_, user)) = inner
            .users
            .iter_mut()
            .find(|(t, u)| *t == UserType::Student && u.id == student_id)
        {
            user.first_name = updated.first_name.clone();
            user.last_name = updated.last_name.clone();
        }

        Ok(Some(updated))
    }

    async fn set_student_profile_picture(
        &self,
        student_id: i64,
        url: &str,
    ) -> Result<(), AppError> {
        let mut inner = self.lock()?;
        if let Some(student) = inner.students.get_mut(&student_id) {
            student.profile_picture_url = Some(url.to_string());
        }
        Ok(())
    }
}

/// `ORDER BY last_name, first_name` with Postgres' NULLS LAST default.
fn client_order(client: &StudioClient) -> (bool, Option<&str>, bool, Option<&str>) {
    let student = &client.student;
    (
        student.last_name.is_none(),
        student.last_name.as_deref(),
        student.first_name.is_none(),
        student.first_name.as_deref(),
    )
}
