use sqlx::PgPool;

use crate::core::time::primitive_now_utc;
use crate::db::models::{Class, Test};
use crate::db::types::ClassType;
use crate::repositories::{classes, recitation_tests};

#[derive(Debug)]
pub(crate) struct CreatedClass {
    pub(crate) class: Class,
    pub(crate) test: Option<Test>,
}

/// Creates a class. A test class gets its single not-started test in the same transaction.
pub(crate) async fn create_class(
    pool: &PgPool,
    teacher_id: i64,
    student_id: i64,
    class_type: ClassType,
    notes: Option<&str>,
) -> Result<CreatedClass, sqlx::Error> {
    let now = primitive_now_utc();
    let mut tx = pool.begin().await?;

    let class = classes::create(
        &mut tx,
        classes::CreateClass { teacher_id, student_id, class_type, notes, created_at: now },
    )
    .await?;

    let test = match class_type {
        ClassType::Test => {
            Some(recitation_tests::create(&mut tx, class.id, student_id, now).await?)
        }
        ClassType::Lesson => None,
    };

    tx.commit().await?;

    tracing::info!(
        action = "class_create",
        class_id = class.id,
        teacher_id,
        student_id,
        test_id = test.as_ref().map(|test| test.id),
        "Class created"
    );

    Ok(CreatedClass { class, test })
}
