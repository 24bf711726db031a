use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use conforma_application::{QuestionQuery, QuestionRepository, RoleClause};

use super::PostgresQuestionRepository;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres question repository tests: {error}");
    }

    Some(pool)
}

async fn seed_question(
    pool: &PgPool,
    key: &str,
    referential_id: Option<i64>,
    economic_role: Option<&str>,
    applicable_processes: &[&str],
) {
    let applicable: Vec<String> = applicable_processes
        .iter()
        .map(|label| (*label).to_owned())
        .collect();
    let insert = sqlx::query(
        r#"
        INSERT INTO questions (question_key, referential_id, text, economic_role,
                               applicable_processes)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (question_key) DO UPDATE
        SET referential_id = EXCLUDED.referential_id,
            economic_role = EXCLUDED.economic_role,
            applicable_processes = EXCLUDED.applicable_processes
        "#,
    )
    .bind(key)
    .bind(referential_id)
    .bind(format!("question {key}"))
    .bind(economic_role)
    .bind(&applicable)
    .execute(pool)
    .await;

    assert!(insert.is_ok());
}

#[tokio::test]
async fn applicability_query_applies_the_process_disjunction() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresQuestionRepository::new(pool.clone());

    seed_question(&pool, "pq_label_match", Some(3), None, &["traceability_udi"]).await;
    seed_question(&pool, "pq_generic", Some(3), None, &[]).await;
    seed_question(&pool, "pq_other_process", Some(3), None, &["purchasing"]).await;
    seed_question(&pool, "pq_other_referential", Some(4), None, &["traceability_udi"]).await;

    let query = QuestionQuery {
        referential_ids: vec![3],
        process_ids: Vec::new(),
        process_labels: vec!["traceability_udi".to_owned()],
        role_clause: RoleClause::Any,
    };
    let questions = repository
        .find_applicable(&query)
        .await
        .unwrap_or_else(|_| unreachable!());

    let keys: Vec<&str> = questions
        .iter()
        .map(|question| question.question_key())
        .filter(|key| key.starts_with("pq_"))
        .collect();
    assert!(keys.contains(&"pq_label_match"));
    assert!(keys.contains(&"pq_generic"));
    assert!(!keys.contains(&"pq_other_process"));
    assert!(!keys.contains(&"pq_other_referential"));
}

#[tokio::test]
async fn role_clause_matches_synonyms_across_languages() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresQuestionRepository::new(pool.clone());

    seed_question(&pool, "pr_french_role", Some(3), Some("distributeur"), &[]).await;
    seed_question(&pool, "pr_generic_role", Some(3), Some("all"), &[]).await;
    seed_question(&pool, "pr_other_role", Some(3), Some("importer"), &[]).await;

    let query = QuestionQuery {
        referential_ids: vec![3],
        process_ids: Vec::new(),
        process_labels: Vec::new(),
        role_clause: RoleClause::Declared("distributor".to_owned()),
    };
    let questions = repository
        .find_applicable(&query)
        .await
        .unwrap_or_else(|_| unreachable!());

    let keys: Vec<&str> = questions
        .iter()
        .map(|question| question.question_key())
        .filter(|key| key.starts_with("pr_"))
        .collect();
    assert!(keys.contains(&"pr_french_role"));
    assert!(keys.contains(&"pr_generic_role"));
    assert!(!keys.contains(&"pr_other_role"));
}

#[tokio::test]
async fn generic_only_clause_excludes_role_scoped_rows() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresQuestionRepository::new(pool.clone());

    seed_question(&pool, "pg_generic", Some(3), None, &[]).await;
    seed_question(&pool, "pg_all_roles", Some(3), Some("tous"), &[]).await;
    seed_question(&pool, "pg_manufacturer", Some(3), Some("manufacturer"), &[]).await;

    let query = QuestionQuery {
        referential_ids: vec![3],
        process_ids: Vec::new(),
        process_labels: Vec::new(),
        role_clause: RoleClause::GenericOnly,
    };
    let questions = repository
        .find_applicable(&query)
        .await
        .unwrap_or_else(|_| unreachable!());

    let keys: Vec<&str> = questions
        .iter()
        .map(|question| question.question_key())
        .filter(|key| key.starts_with("pg_"))
        .collect();
    assert!(keys.contains(&"pg_generic"));
    assert!(keys.contains(&"pg_all_roles"));
    assert!(!keys.contains(&"pg_manufacturer"));
}

#[tokio::test]
async fn process_overlap_ignores_the_case_of_stored_entries() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresQuestionRepository::new(pool.clone());

    // Rows imported outside the API are not guaranteed lower-cased.
    seed_question(&pool, "pc_upper_entry", Some(3), None, &["Traceability_UDI"]).await;
    seed_question(&pool, "pc_other_entry", Some(3), None, &["Purchasing"]).await;

    let query = QuestionQuery {
        referential_ids: vec![3],
        process_ids: Vec::new(),
        process_labels: vec!["traceability_udi".to_owned()],
        role_clause: RoleClause::Any,
    };
    let questions = repository
        .find_applicable(&query)
        .await
        .unwrap_or_else(|_| unreachable!());

    let keys: Vec<&str> = questions
        .iter()
        .map(|question| question.question_key())
        .filter(|key| key.starts_with("pc_"))
        .collect();
    assert!(keys.contains(&"pc_upper_entry"));
    assert!(!keys.contains(&"pc_other_entry"));
}
