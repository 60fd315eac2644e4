//! Per-entity CRUD over the request pipeline.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use chrono::NaiveDate;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::api::{ApiClient, RequestOptions};
use crate::error::ApiError;
use crate::models::*;

/// Backend entity collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Entity {
    Users,
    Roles,
    Teachers,
    Students,
    Courses,
    Enrollments,
    Grades,
    Schedule,
}

impl Entity {
    pub const ALL: [Entity; 8] = [
        Entity::Users,
        Entity::Roles,
        Entity::Teachers,
        Entity::Students,
        Entity::Courses,
        Entity::Enrollments,
        Entity::Grades,
        Entity::Schedule,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Entity::Users => "users",
            Entity::Roles => "roles",
            Entity::Teachers => "teachers",
            Entity::Students => "students",
            Entity::Courses => "courses",
            Entity::Enrollments => "enrollments",
            Entity::Grades => "grades",
            Entity::Schedule => "schedule",
        }
    }

    /// List/create endpoint, with the trailing slash the backend routes on
    pub fn collection_path(&self) -> String {
        format!("/{}/", self.name())
    }

    pub fn item_path(&self, id: impl fmt::Display) -> String {
        format!("/{}/{}", self.name(), id)
    }

    /// Teachers and students take partial updates; the rest replace
    pub fn update_method(&self) -> Method {
        match self {
            Entity::Teachers | Entity::Students => Method::PATCH,
            _ => Method::PUT,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Paging and filters for list endpoints
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
    pub filters: Vec<(String, Option<String>)>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, skip: u32, limit: u32) -> Self {
        self.skip = Some(skip);
        self.limit = Some(limit);
        self
    }

    pub fn filter<V: ToString>(mut self, key: &str, value: Option<V>) -> Self {
        self.filters.push((key.to_string(), value.map(|v| v.to_string())));
        self
    }

    /// Build from a JSON object such as `{"limit": 10, "student_id": 3}`
    pub fn from_json(filter: &Value) -> Result<Self, ApiError> {
        let Value::Object(map) = filter else {
            return Err(ApiError::decode("filter must be a JSON object", filter.clone()));
        };
        let mut query = ListQuery::new();
        for (key, value) in map {
            let value = match value {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            };
            query.filters.push((key.clone(), value));
        }
        Ok(query)
    }

    pub fn into_options(self) -> RequestOptions {
        let mut options = RequestOptions::new()
            .query("skip", self.skip)
            .query("limit", self.limit);
        for (key, value) in self.filters {
            options = options.query(&key, value);
        }
        options
    }
}

/// Typed CRUD for one entity collection
pub struct Collection<'a, T, C, U> {
    api: &'a ApiClient,
    entity: Entity,
    _types: PhantomData<fn() -> (T, C, U)>,
}

impl<'a, T, C, U> Collection<'a, T, C, U>
where
    T: DeserializeOwned,
    C: Serialize,
    U: Serialize,
{
    pub fn new(api: &'a ApiClient, entity: Entity) -> Self {
        Self {
            api,
            entity,
            _types: PhantomData,
        }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub async fn list(&self, query: ListQuery) -> Result<Vec<T>, ApiError> {
        self.api
            .request_as(Method::GET, &self.entity.collection_path(), query.into_options())
            .await
    }

    pub async fn get(&self, id: i64) -> Result<T, ApiError> {
        self.api
            .request_as(Method::GET, &self.entity.item_path(id), RequestOptions::new())
            .await
    }

    pub async fn create(&self, payload: &C) -> Result<T, ApiError> {
        let body = to_body(payload)?;
        self.api
            .request_as(
                Method::POST,
                &self.entity.collection_path(),
                RequestOptions::new().body(body),
            )
            .await
    }

    pub async fn update(&self, id: i64, payload: &U) -> Result<T, ApiError> {
        let body = to_body(payload)?;
        self.api
            .request_as(
                self.entity.update_method(),
                &self.entity.item_path(id),
                RequestOptions::new().body(body),
            )
            .await
    }

    /// Delete and return whatever the backend answered (often empty)
    pub async fn delete(&self, id: i64) -> Result<Value, ApiError> {
        self.api
            .delete(&self.entity.item_path(id), RequestOptions::new())
            .await
    }
}

fn to_body<P: Serialize>(payload: &P) -> Result<Value, ApiError> {
    serde_json::to_value(payload).map_err(|e| ApiError::decode(format!("cannot encode payload: {e}"), Value::Null))
}

pub type Users<'a> = Collection<'a, User, UserCreate, UserUpdate>;
pub type Roles<'a> = Collection<'a, Role, RoleCreate, RoleUpdate>;
pub type Teachers<'a> = Collection<'a, Teacher, TeacherCreate, TeacherUpdate>;
pub type Students<'a> = Collection<'a, Student, StudentCreate, StudentUpdate>;
pub type Courses<'a> = Collection<'a, Course, CourseCreate, CourseUpdate>;
pub type Grades<'a> = Collection<'a, Grade, GradeCreate, GradeUpdate>;
pub type Schedule<'a> = Collection<'a, ScheduleItem, ScheduleCreate, ScheduleUpdate>;

impl ApiClient {
    pub fn users(&self) -> Users<'_> {
        Collection::new(self, Entity::Users)
    }

    pub fn roles(&self) -> Roles<'_> {
        Collection::new(self, Entity::Roles)
    }

    pub fn teachers(&self) -> Teachers<'_> {
        Collection::new(self, Entity::Teachers)
    }

    pub fn students(&self) -> Students<'_> {
        Collection::new(self, Entity::Students)
    }

    pub fn courses(&self) -> Courses<'_> {
        Collection::new(self, Entity::Courses)
    }

    pub fn grades(&self) -> Grades<'_> {
        Collection::new(self, Entity::Grades)
    }

    pub fn schedule(&self) -> Schedule<'_> {
        Collection::new(self, Entity::Schedule)
    }

    pub fn enrollments(&self) -> Enrollments<'_> {
        Enrollments { api: self }
    }
}

impl Users<'_> {
    /// Upload a profile photo as multipart form data (field `file`)
    pub async fn upload_photo(&self, id: i64, filename: &str, bytes: Vec<u8>, mime: &str) -> Result<Value, ApiError> {
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime)
            .map_err(|e| ApiError::decode(format!("invalid mime type '{mime}': {e}"), Value::Null))?;
        let form = Form::new().part("file", part);
        self.api
            .upload(&format!("/users/{id}/upload-photo"), form, RequestOptions::new())
            .await
    }
}

impl Courses<'_> {
    /// Enrollments of a course, with student details
    pub async fn students(&self, course_id: i64) -> Result<Vec<Enrollment>, ApiError> {
        self.api
            .request_as(Method::GET, &format!("/courses/{course_id}/students"), RequestOptions::new())
            .await
    }

    pub async fn grades(&self, course_id: i64) -> Result<Value, ApiError> {
        self.api
            .get(&format!("/courses/{course_id}/grades"), RequestOptions::new())
            .await
    }

    pub async fn statistics(&self, course_id: i64) -> Result<Value, ApiError> {
        self.api
            .get(&format!("/courses/{course_id}/statistics"), RequestOptions::new())
            .await
    }
}

impl Grades<'_> {
    pub async fn average(&self, student_id: i64, course_id: i64) -> Result<Value, ApiError> {
        self.api
            .get(&format!("/grades/average/{student_id}/{course_id}"), RequestOptions::new())
            .await
    }
}

impl Schedule<'_> {
    pub async fn daily(&self, day: NaiveDate) -> Result<Value, ApiError> {
        self.api
            .get(&format!("/schedule/daily/{day}"), RequestOptions::new())
            .await
    }

    pub async fn for_student(&self, student_id: i64) -> Result<Value, ApiError> {
        self.api
            .get(&format!("/schedule/student/{student_id}"), RequestOptions::new())
            .await
    }

    pub async fn for_teacher(&self, teacher_id: i64) -> Result<Value, ApiError> {
        self.api
            .get(&format!("/schedule/teacher/{teacher_id}"), RequestOptions::new())
            .await
    }
}

/// Composite key of an enrollment, written `student_id:course_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrollmentKey {
    pub student_id: i64,
    pub course_id: i64,
}

impl FromStr for EnrollmentKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (student, course) = s
            .split_once(':')
            .ok_or_else(|| format!("expected student_id:course_id, got '{s}'"))?;
        let student_id = student
            .trim()
            .parse()
            .map_err(|_| format!("invalid student id '{student}'"))?;
        let course_id = course
            .trim()
            .parse()
            .map_err(|_| format!("invalid course id '{course}'"))?;
        Ok(Self { student_id, course_id })
    }
}

impl fmt::Display for EnrollmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.student_id, self.course_id)
    }
}

impl EnrollmentKey {
    fn options(&self) -> RequestOptions {
        RequestOptions::new()
            .query("student_id", Some(self.student_id))
            .query("course_id", Some(self.course_id))
    }
}

/// Enrollments are addressed by query parameters instead of a path id
pub struct Enrollments<'a> {
    api: &'a ApiClient,
}

impl Enrollments<'_> {
    pub async fn list(&self, query: ListQuery) -> Result<Vec<Enrollment>, ApiError> {
        self.api
            .request_as(Method::GET, &Entity::Enrollments.collection_path(), query.into_options())
            .await
    }

    /// Look an enrollment up among the filtered listing
    pub async fn find(&self, key: EnrollmentKey) -> Result<Option<Enrollment>, ApiError> {
        let query = ListQuery::new()
            .filter("student_id", Some(key.student_id))
            .filter("course_id", Some(key.course_id));
        let rows = self.list(query).await?;
        Ok(rows
            .into_iter()
            .find(|e| e.student_id == key.student_id && e.course_id == key.course_id))
    }

    pub async fn create(&self, payload: &EnrollmentCreate) -> Result<Enrollment, ApiError> {
        let body = to_body(payload)?;
        self.api
            .request_as(
                Method::POST,
                &Entity::Enrollments.collection_path(),
                RequestOptions::new().body(body),
            )
            .await
    }

    pub async fn update_grade(&self, key: EnrollmentKey, grade: Option<f64>) -> Result<Enrollment, ApiError> {
        let body = to_body(&EnrollmentUpdate { grade })?;
        self.api
            .request_as(
                Method::PUT,
                &Entity::Enrollments.collection_path(),
                key.options().body(body),
            )
            .await
    }

    pub async fn remove(&self, key: EnrollmentKey) -> Result<Value, ApiError> {
        self.api
            .delete(&Entity::Enrollments.collection_path(), key.options())
            .await
    }
}

/// Record id as typed on the command line: a number, or
/// `student_id:course_id` for enrollments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordId {
    Id(i64),
    Enrollment(EnrollmentKey),
}

impl FromStr for RecordId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains(':') {
            return s.parse().map(RecordId::Enrollment);
        }
        s.trim()
            .parse()
            .map(RecordId::Id)
            .map_err(|_| format!("invalid record id '{s}': expected a number or student_id:course_id"))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Id(id) => write!(f, "{id}"),
            RecordId::Enrollment(key) => write!(f, "{key}"),
        }
    }
}

/// Untyped operations used by the generic `data` commands
pub mod raw {
    use super::*;

    enum Target {
        Item(String),
        Enrollment(EnrollmentKey),
    }

    // Enrollments take a composite key, every other entity a numeric id
    fn target(entity: Entity, id: RecordId) -> Result<Target, ApiError> {
        match (entity, id) {
            (Entity::Enrollments, RecordId::Enrollment(key)) => Ok(Target::Enrollment(key)),
            (Entity::Enrollments, RecordId::Id(_)) => Err(mismatch(entity, id, "student_id:course_id")),
            (_, RecordId::Id(n)) => Ok(Target::Item(entity.item_path(n))),
            (_, RecordId::Enrollment(_)) => Err(mismatch(entity, id, "a numeric id")),
        }
    }

    pub async fn select(api: &ApiClient, entity: Entity, id: Option<RecordId>, query: ListQuery) -> Result<Value, ApiError> {
        let Some(id) = id else {
            return api.get(&entity.collection_path(), query.into_options()).await;
        };
        match target(entity, id)? {
            Target::Item(path) => api.get(&path, RequestOptions::new()).await,
            Target::Enrollment(key) => match api.enrollments().find(key).await? {
                Some(e) => serde_json::to_value(e).map_err(|e| ApiError::decode(e.to_string(), Value::Null)),
                None => Err(not_found(entity, id)),
            },
        }
    }

    pub async fn create(api: &ApiClient, entity: Entity, body: Value) -> Result<Value, ApiError> {
        api.post(&entity.collection_path(), body, RequestOptions::new()).await
    }

    pub async fn update(api: &ApiClient, entity: Entity, id: RecordId, body: Value) -> Result<Value, ApiError> {
        match target(entity, id)? {
            Target::Item(path) => {
                api.request(entity.update_method(), &path, RequestOptions::new().body(body))
                    .await
            }
            Target::Enrollment(key) => api.put(&entity.collection_path(), body, key.options()).await,
        }
    }

    pub async fn delete(api: &ApiClient, entity: Entity, id: RecordId) -> Result<Value, ApiError> {
        match target(entity, id)? {
            Target::Item(path) => api.delete(&path, RequestOptions::new()).await,
            Target::Enrollment(key) => api.enrollments().remove(key).await,
        }
    }

    fn mismatch(entity: Entity, id: RecordId, expected: &str) -> ApiError {
        ApiError::decode(
            format!("{entity} ids are {expected}, got '{id}'"),
            json!({ "id": id.to_string() }),
        )
    }

    fn not_found(entity: Entity, id: RecordId) -> ApiError {
        ApiError::Http {
            message: format!("{} '{}' not found", entity, id),
            status: 404,
            body: Value::Null,
            headers: Vec::new(),
        }
    }
}
