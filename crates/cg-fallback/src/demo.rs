//! Synthetic data for demo mode.
//!
//! Payloads are produced by serializing the same typed records a live
//! client decodes, so demo and live responses for one logical endpoint share
//! a schema.

use std::sync::atomic::{AtomicU64, Ordering};

use campusgate_client::RequestMethod;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A source of synthetic responses.
pub trait DemoSource: Send + Sync + std::fmt::Debug {
    /// Produce the payload for `method path`.
    ///
    /// `None` means the path names a record the source does not have.
    fn respond(&self, method: RequestMethod, path: &str, body: Option<&Value>) -> Option<Value>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct School {
    pub id: String,
    pub name: String,
    pub district: String,
    pub city: String,
    pub student_count: u32,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub school_id: String,
    pub title: String,
    pub teacher_id: String,
    pub enrolled: u32,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Teacher,
    Student,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub school_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub schools: u32,
    pub active_schools: u32,
    pub courses: u32,
    pub users: u32,
    pub students: u32,
    pub teachers: u32,
}

/// Built-in sample data for the dashboard's endpoints.
#[derive(Debug)]
pub struct DemoCatalog {
    schools: Vec<School>,
    courses: Vec<Course>,
    users: Vec<UserAccount>,
    next_id: AtomicU64,
}

impl Default for DemoCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoCatalog {
    pub fn new() -> Self {
        Self::with_records(sample_schools(), sample_courses(), sample_users())
    }

    /// A catalogue over caller-supplied records.
    pub fn with_records(
        schools: Vec<School>,
        courses: Vec<Course>,
        users: Vec<UserAccount>,
    ) -> Self {
        Self {
            schools,
            courses,
            users,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn schools(&self) -> &[School] {
        &self.schools
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn users(&self) -> &[UserAccount] {
        &self.users
    }

    /// Totals computed from the catalogue's own records.
    pub fn summary(&self) -> DashboardSummary {
        let count_role = |role| self.users.iter().filter(|u| u.role == role).count() as u32;
        DashboardSummary {
            schools: self.schools.len() as u32,
            active_schools: self.schools.iter().filter(|s| s.active).count() as u32,
            courses: self.courses.len() as u32,
            users: self.users.len() as u32,
            students: count_role(UserRole::Student),
            teachers: count_role(UserRole::Teacher),
        }
    }

    fn get(&self, segments: &[&str]) -> Option<Value> {
        match segments {
            ["schools"] => Some(to_value(&self.schools)),
            ["schools", id] => self.schools.iter().find(|s| s.id == *id).map(to_value),
            ["schools", id, "courses"] => Some(to_value(
                &self
                    .courses
                    .iter()
                    .filter(|c| c.school_id == *id)
                    .collect::<Vec<_>>(),
            )),
            ["courses"] => Some(to_value(&self.courses)),
            ["courses", id] => self.courses.iter().find(|c| c.id == *id).map(to_value),
            ["users"] => Some(to_value(&self.users)),
            ["users", id] => self.users.iter().find(|u| u.id == *id).map(to_value),
            ["dashboard", "summary"] => Some(to_value(&self.summary())),
            [.., last] if is_identifier(last) => Some(Value::Object(Map::new())),
            _ => Some(Value::Array(Vec::new())),
        }
    }

    fn existing(&self, collection: &str, id: &str) -> Option<Value> {
        match collection {
            "schools" => self.schools.iter().find(|s| s.id == id).map(to_value),
            "courses" => self.courses.iter().find(|c| c.id == id).map(to_value),
            "users" => self.users.iter().find(|u| u.id == id).map(to_value),
            _ => Some(Value::Object(Map::new())),
        }
    }

    fn create(&self, body: Option<&Value>) -> Value {
        match body {
            Some(Value::Object(fields)) => {
                let mut record = fields.clone();
                if !record.contains_key("id") {
                    let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                    record.insert("id".to_string(), Value::String(format!("demo-{id}")));
                }
                Value::Object(record)
            }
            Some(other) => other.clone(),
            None => Value::Object(Map::new()),
        }
    }

    fn update(&self, segments: &[&str], body: Option<&Value>) -> Option<Value> {
        let (collection, id) = match segments {
            [.., collection, id] => (*collection, *id),
            _ => return Some(body.cloned().unwrap_or(Value::Null)),
        };

        let mut record = self.existing(collection, id)?;
        if let (Value::Object(record), Some(Value::Object(changes))) = (&mut record, body) {
            for (key, value) in changes {
                if key != "id" {
                    record.insert(key.clone(), value.clone());
                }
            }
        }
        Some(record)
    }
}

impl DemoSource for DemoCatalog {
    fn respond(&self, method: RequestMethod, path: &str, body: Option<&Value>) -> Option<Value> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match method {
            RequestMethod::Get => self.get(&segments),
            RequestMethod::Post => Some(self.create(body)),
            RequestMethod::Put | RequestMethod::Patch => self.update(&segments, body),
            RequestMethod::Delete => Some(Value::Null),
        }
    }
}

fn to_value<T: Serialize + ?Sized>(record: &T) -> Value {
    // Serializing plain derived structs cannot fail.
    serde_json::to_value(record).unwrap_or(Value::Null)
}

fn is_identifier(segment: &str) -> bool {
    segment.chars().all(|c| c.is_ascii_digit()) || segment.starts_with("demo-")
}

fn sample_schools() -> Vec<School> {
    vec![
        School {
            id: "1".to_string(),
            name: "Northside Elementary".to_string(),
            district: "North Valley USD".to_string(),
            city: "Riverton".to_string(),
            student_count: 412,
            active: true,
        },
        School {
            id: "2".to_string(),
            name: "Lakeview Middle School".to_string(),
            district: "North Valley USD".to_string(),
            city: "Riverton".to_string(),
            student_count: 638,
            active: true,
        },
        School {
            id: "3".to_string(),
            name: "Cedar Ridge High School".to_string(),
            district: "Cedar County Schools".to_string(),
            city: "Millbrook".to_string(),
            student_count: 1104,
            active: true,
        },
        School {
            id: "4".to_string(),
            name: "Old Mill Academy".to_string(),
            district: "Cedar County Schools".to_string(),
            city: "Millbrook".to_string(),
            student_count: 0,
            active: false,
        },
    ]
}

fn sample_courses() -> Vec<Course> {
    let course = |id: &str, school: &str, title: &str, teacher: &str, enrolled| Course {
        id: id.to_string(),
        school_id: school.to_string(),
        title: title.to_string(),
        teacher_id: teacher.to_string(),
        enrolled,
        active: true,
    };
    vec![
        course("101", "1", "Reading Foundations", "12", 24),
        course("102", "1", "Numbers and Shapes", "12", 22),
        course("201", "2", "Earth Science", "13", 28),
        course("301", "3", "Algebra II", "14", 31),
        course("302", "3", "World History", "14", 27),
    ]
}

fn sample_users() -> Vec<UserAccount> {
    let user = |id: &str, name: &str, email: &str, role, school: Option<&str>| UserAccount {
        id: id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        role,
        school_id: school.map(str::to_string),
    };
    vec![
        user("11", "Dana Whitfield", "dana.whitfield@example.edu", UserRole::Admin, None),
        user("12", "Marcus Ortega", "marcus.ortega@example.edu", UserRole::Teacher, Some("1")),
        user("13", "Priya Raman", "priya.raman@example.edu", UserRole::Teacher, Some("2")),
        user("14", "Samuel Okafor", "samuel.okafor@example.edu", UserRole::Teacher, Some("3")),
        user("21", "Lena Fischer", "lena.fischer@example.edu", UserRole::Student, Some("1")),
        user("22", "Tomás Rivera", "tomas.rivera@example.edu", UserRole::Student, Some("3")),
    ]
}
