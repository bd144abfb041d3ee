//! Deterministic seed data for sandbox stores.
//!
//! Every sandbox starts from exactly this schema and these rows.

use sqlx::{Executor, SqliteConnection};

/// Tables created in every sandbox.
pub const SEED_TABLES: &[&str] = &["users", "courses", "enrollments"];

const SEED_SQL: &str = r#"
CREATE TABLE users (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    age INTEGER,
    created_at TEXT NOT NULL
);

INSERT INTO users (id, name, email, age, created_at) VALUES
    (1, 'Alice Johnson', 'alice@example.com', 28, '2024-01-15 09:30:00'),
    (2, 'Bob Smith', 'bob@example.com', 35, '2024-02-03 14:12:00'),
    (3, 'Carol White', 'carol@example.com', 42, '2024-02-20 11:45:00'),
    (4, 'David Brown', 'david@example.com', 23, '2024-03-08 16:05:00'),
    (5, 'Eve Davis', 'eve@example.com', 31, '2024-03-22 08:50:00');

CREATE TABLE courses (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    level TEXT NOT NULL,
    credits INTEGER NOT NULL
);

INSERT INTO courses (id, title, level, credits) VALUES
    (1, 'Intro to SQL', 'beginner', 3),
    (2, 'Joins in Depth', 'intermediate', 4),
    (3, 'Window Functions', 'advanced', 4),
    (4, 'Data Modeling', 'intermediate', 3);

CREATE TABLE enrollments (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(id),
    course_id INTEGER NOT NULL REFERENCES courses(id),
    grade REAL,
    enrolled_at TEXT NOT NULL
);

INSERT INTO enrollments (id, user_id, course_id, grade, enrolled_at) VALUES
    (1, 1, 1, 92.5, '2024-04-01'),
    (2, 1, 2, 88.0, '2024-04-15'),
    (3, 2, 1, 75.0, '2024-04-02'),
    (4, 3, 3, NULL, '2024-05-10'),
    (5, 4, 1, 64.5, '2024-05-12'),
    (6, 5, 2, 91.0, '2024-05-20'),
    (7, 5, 4, 85.5, '2024-06-01');
"#;

/// Creates the seed schema and rows, then makes the store read-only.
pub async fn seed(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    (&mut *conn).execute(sqlx::raw_sql(SEED_SQL)).await?;
    (&mut *conn)
        .execute(sqlx::raw_sql("PRAGMA query_only = ON"))
        .await?;
    Ok(())
}
