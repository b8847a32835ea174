use sqlx::PgConnection;
use time::PrimitiveDateTime;

use crate::db::models::Class;
use crate::db::types::ClassType;

pub(crate) const COLUMNS: &str =
    "id, teacher_id, student_id, class_type, notes, created_at, updated_at";

pub(crate) struct CreateClass<'a> {
    pub(crate) teacher_id: i64,
    pub(crate) student_id: i64,
    pub(crate) class_type: ClassType,
    pub(crate) notes: Option<&'a str>,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    conn: &mut PgConnection,
    class: CreateClass<'_>,
) -> Result<Class, sqlx::Error> {
    sqlx::query_as::<_, Class>(&format!(
        "INSERT INTO classes (teacher_id, student_id, class_type, notes, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $5)
         RETURNING {COLUMNS}"
    ))
    .bind(class.teacher_id)
    .bind(class.student_id)
    .bind(class.class_type)
    .bind(class.notes)
    .bind(class.created_at)
    .fetch_one(conn)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: i64,
) -> Result<Option<Class>, sqlx::Error> {
    sqlx::query_as::<_, Class>(&format!("SELECT {COLUMNS} FROM classes WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn teacher_has_student(
    executor: impl sqlx::PgExecutor<'_>,
    teacher_id: i64,
    student_id: i64,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM classes WHERE teacher_id = $1 AND student_id = $2)",
    )
    .bind(teacher_id)
    .bind(student_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn count_by_student(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM classes WHERE student_id = $1")
        .bind(student_id)
        .fetch_one(executor)
        .await
}

pub(crate) async fn latest_for_student(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: i64,
) -> Result<Option<Class>, sqlx::Error> {
    sqlx::query_as::<_, Class>(&format!(
        "SELECT {COLUMNS} FROM classes
         WHERE student_id = $1
         ORDER BY created_at DESC, id DESC
         LIMIT 1"
    ))
    .bind(student_id)
    .fetch_optional(executor)
    .await
}
