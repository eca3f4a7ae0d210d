//! In-memory `Store` used by unit tests
//!
//! Mirrors the Postgres constraints the services rely on: unique usernames
//! and class names, and class references from students and attendance.

use crate::domain::{
    parse_date, Attendance, AttendanceUpdate, Class, ClassUpdate, NewAttendance, NewClass,
    NewStudent, Student, StudentStatus, StudentUpdate, User,
};
use crate::infrastructure::{DatabaseError, Result, Store};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use parking_lot::Mutex;
use serde_json::Value;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    classes: Vec<Class>,
    students: Vec<Student>,
    attendance: Vec<Attendance>,
    next_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn require_class(&self, id: i32) -> Result<()> {
        if self.classes.iter().any(|c| c.id == id) {
            Ok(())
        } else {
            Err(DatabaseError::ForeignKeyViolation("classe_id_fkey".to_string()))
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    /// When set, `ping` fails
    pub offline: Mutex<bool>,
}

impl MemoryStore {
    pub fn seed_class(&self, nome: &str, professor: &str) -> i32 {
        let mut t = self.tables.lock();
        let id = t.next_id();
        t.classes.push(Class {
            id,
            nome: nome.to_string(),
            professor: professor.to_string(),
        });
        id
    }

    pub fn seed_student(&self, nome: &str, birth: &str, classe_id: i32) -> i32 {
        let mut t = self.tables.lock();
        let id = t.next_id();
        t.students.push(Student {
            id,
            nome: nome.to_string(),
            data_nascimento: parse_date(birth).unwrap(),
            status: StudentStatus::Enrolled,
            classe_id,
        });
        id
    }

    pub fn seed_attendance(&self, classe_id: i32, data: &str, presencas: Value) -> i32 {
        let mut t = self.tables.lock();
        let id = t.next_id();
        t.attendance.push(Attendance {
            id,
            classe_id,
            data: parse_date(data).unwrap(),
            total_biblia: 0,
            total_present: 0,
            total_absent: 0,
            total_visitors: 0,
            total_general: 0,
            presencas: Some(presencas),
        });
        id
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        if *self.offline.lock() {
            return Err(DatabaseError::ConnectionError(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    async fn close(&self) {
        *self.offline.lock() = true;
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User> {
        let mut t = self.tables.lock();
        if t.users.iter().any(|u| u.username == username) {
            return Err(DatabaseError::UniqueViolation("users_username_key".to_string()));
        }
        let user = User {
            id: t.next_id(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let t = self.tables.lock();
        Ok(t.users.iter().find(|u| u.username == username).cloned())
    }

    async fn list_classes(&self) -> Result<Vec<Class>> {
        Ok(self.tables.lock().classes.clone())
    }

    async fn create_class(&self, class: NewClass) -> Result<Class> {
        let mut t = self.tables.lock();
        if t.classes.iter().any(|c| c.nome == class.nome) {
            return Err(DatabaseError::UniqueViolation("classes_nome_key".to_string()));
        }
        let created = Class {
            id: t.next_id(),
            nome: class.nome,
            professor: class.professor,
        };
        t.classes.push(created.clone());
        Ok(created)
    }

    async fn update_class(&self, id: i32, update: ClassUpdate) -> Result<Option<Class>> {
        let mut t = self.tables.lock();
        if let Some(nome) = &update.nome {
            if t.classes.iter().any(|c| &c.nome == nome && c.id != id) {
                return Err(DatabaseError::UniqueViolation("classes_nome_key".to_string()));
            }
        }
        let Some(class) = t.classes.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(nome) = update.nome {
            class.nome = nome;
        }
        if let Some(professor) = update.professor {
            class.professor = professor;
        }
        Ok(Some(class.clone()))
    }

    async fn delete_class(&self, id: i32) -> Result<bool> {
        let mut t = self.tables.lock();
        let referenced = t.students.iter().any(|s| s.classe_id == id)
            || t.attendance.iter().any(|a| a.classe_id == id);
        if referenced {
            return Err(DatabaseError::ForeignKeyViolation("alunos_classe_id_fkey".to_string()));
        }
        let before = t.classes.len();
        t.classes.retain(|c| c.id != id);
        Ok(t.classes.len() < before)
    }

    async fn list_students(&self) -> Result<Vec<Student>> {
        Ok(self.tables.lock().students.clone())
    }

    async fn create_student(&self, student: NewStudent) -> Result<Student> {
        let mut t = self.tables.lock();
        t.require_class(student.classe_id)?;
        let created = Student {
            id: t.next_id(),
            nome: student.nome,
            data_nascimento: student.data_nascimento,
            status: student.status,
            classe_id: student.classe_id,
        };
        t.students.push(created.clone());
        Ok(created)
    }

    async fn update_student(&self, id: i32, update: StudentUpdate) -> Result<Option<Student>> {
        let mut t = self.tables.lock();
        if let Some(classe_id) = update.classe_id {
            t.require_class(classe_id)?;
        }
        let Some(student) = t.students.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        if let Some(nome) = update.nome {
            student.nome = nome;
        }
        if let Some(date) = update.data_nascimento {
            student.data_nascimento = date;
        }
        if let Some(classe_id) = update.classe_id {
            student.classe_id = classe_id;
        }
        if let Some(status) = update.status {
            student.status = status;
        }
        Ok(Some(student.clone()))
    }

    async fn delete_student(&self, id: i32) -> Result<bool> {
        let mut t = self.tables.lock();
        let before = t.students.len();
        t.students.retain(|s| s.id != id);
        Ok(t.students.len() < before)
    }

    async fn students_born_on(&self, month: u32, day: u32) -> Result<Vec<Student>> {
        let t = self.tables.lock();
        Ok(t.students
            .iter()
            .filter(|s| s.data_nascimento.month() == month && s.data_nascimento.day() == day)
            .cloned()
            .collect())
    }

    async fn list_attendance(&self) -> Result<Vec<Attendance>> {
        Ok(self.tables.lock().attendance.clone())
    }

    async fn create_attendance(&self, attendance: NewAttendance) -> Result<Attendance> {
        let mut t = self.tables.lock();
        t.require_class(attendance.classe_id)?;
        let created = Attendance {
            id: t.next_id(),
            classe_id: attendance.classe_id,
            data: attendance.data,
            total_biblia: attendance.total_biblia,
            total_present: attendance.total_present,
            total_absent: attendance.total_absent,
            total_visitors: attendance.total_visitors,
            total_general: attendance.total_general,
            presencas: Some(attendance.presencas),
        };
        t.attendance.push(created.clone());
        Ok(created)
    }

    async fn update_attendance(
        &self,
        id: i32,
        update: AttendanceUpdate,
    ) -> Result<Option<Attendance>> {
        let mut t = self.tables.lock();
        if let Some(classe_id) = update.classe_id {
            t.require_class(classe_id)?;
        }
        let Some(record) = t.attendance.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        if let Some(v) = update.classe_id {
            record.classe_id = v;
        }
        if let Some(v) = update.data {
            record.data = v;
        }
        if let Some(v) = update.total_biblia {
            record.total_biblia = v;
        }
        if let Some(v) = update.total_present {
            record.total_present = v;
        }
        if let Some(v) = update.total_absent {
            record.total_absent = v;
        }
        if let Some(v) = update.total_visitors {
            record.total_visitors = v;
        }
        if let Some(v) = update.total_general {
            record.total_general = v;
        }
        if let Some(v) = update.presencas {
            record.presencas = Some(v);
        }
        Ok(Some(record.clone()))
    }

    async fn delete_attendance(&self, id: i32) -> Result<bool> {
        let mut t = self.tables.lock();
        let before = t.attendance.len();
        t.attendance.retain(|a| a.id != id);
        Ok(t.attendance.len() < before)
    }

    async fn attendance_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Attendance>> {
        let t = self.tables.lock();
        let mut records: Vec<Attendance> = t
            .attendance
            .iter()
            .filter(|a| a.data >= start && a.data <= end)
            .cloned()
            .collect();
        records.sort_by_key(|a| (a.data, a.id));
        Ok(records)
    }
}
