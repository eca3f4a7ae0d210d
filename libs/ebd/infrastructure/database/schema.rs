use sqlx::PgPool;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, SchemaError>;

/// Database schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize database schema
///
/// Every statement is idempotent so that restarts of the `web` container
/// against an existing `postgres_data` volume are safe.
pub async fn initialize_schema(pool: &PgPool) -> Result<()> {
    // Enrollment status enum (CREATE TYPE has no IF NOT EXISTS)
    sqlx::query(
        r#"
        DO $$
        BEGIN
            IF NOT EXISTS (
                SELECT 1 FROM pg_type WHERE typname = 'status_aluno'
            ) THEN
                CREATE TYPE status_aluno AS ENUM ('MATRICULADO', 'DESMATRICULADO');
            END IF;
        END $$;
        "#,
    )
    .execute(pool)
    .await?;

    // Create users table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id SERIAL PRIMARY KEY,
            username VARCHAR(80) NOT NULL UNIQUE,
            password_hash VARCHAR(255) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create classes table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS classes (
            id SERIAL PRIMARY KEY,
            nome VARCHAR(255) NOT NULL UNIQUE,
            professor VARCHAR(255) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create students table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS alunos (
            id SERIAL PRIMARY KEY,
            nome VARCHAR(255) NOT NULL,
            data_nascimento DATE NOT NULL,
            status status_aluno NOT NULL DEFAULT 'MATRICULADO',
            classe_id INTEGER NOT NULL REFERENCES classes(id),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_alunos_classe ON alunos(classe_id)")
        .execute(pool)
        .await?;

    // Create attendance table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS frequencias (
            id SERIAL PRIMARY KEY,
            classe_id INTEGER NOT NULL REFERENCES classes(id),
            data DATE NOT NULL,
            total_biblia INTEGER NOT NULL DEFAULT 0,
            total_present INTEGER NOT NULL DEFAULT 0,
            total_absent INTEGER NOT NULL DEFAULT 0,
            total_visitors INTEGER NOT NULL DEFAULT 0,
            total_general INTEGER NOT NULL DEFAULT 0,
            presencas JSON,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_frequencias_data ON frequencias(data)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_frequencias_classe ON frequencias(classe_id)")
        .execute(pool)
        .await?;

    // Create schema version table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Insert current schema version
    sqlx::query(
        "INSERT INTO schema_version (version, applied_at) VALUES ($1, NOW()) ON CONFLICT DO NOTHING",
    )
    .bind(SCHEMA_VERSION)
    .execute(pool)
    .await?;

    Ok(())
}
