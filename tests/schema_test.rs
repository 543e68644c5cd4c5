use pprogramist_db::config::DatabaseConfig;
use pprogramist_db::db::{self, schema, StoreError};
use pprogramist_db::model::{NewCourse, NewCustomer, NewNews, NewVacancy, StudyTime, VacancySource};
use std::collections::HashSet;

async fn setup_pool() -> db::Pool {
    let pool = db::memory_pool().await.unwrap();
    schema::apply(&pool).await.unwrap();
    pool
}

fn customer(chat_id: i64, department_id: Option<i64>) -> NewCustomer {
    NewCustomer {
        chat_id,
        first_name: "Aziz".into(),
        last_name: None,
        phone: Some(998_901_234_567),
        time: Some(StudyTime::Evening),
        department_id,
    }
}

#[tokio::test]
async fn identities_are_unique_and_never_reused() {
    let pool = setup_pool().await;
    let mut seen = HashSet::new();
    for name in ["Python", "Go", "Rust", "C#"] {
        let d = db::create_department(&pool, name).await.unwrap();
        assert!(seen.insert(d.id), "duplicate id {}", d.id);
    }

    // deleting the newest row must not free its id
    let last = db::find_department_by_name(&pool, "C#").await.unwrap().unwrap();
    db::delete_department(&pool, last.id).await.unwrap();
    let next = db::create_department(&pool, "Haskell").await.unwrap();
    assert!(next.id > last.id);

    let c1 = db::create_customer(&pool, &customer(1, None)).await.unwrap();
    let c2 = db::create_customer(&pool, &customer(1, None)).await.unwrap();
    assert_ne!(c1.id, c2.id);
}

#[tokio::test]
async fn duplicate_department_name_is_unique_violation() {
    let pool = setup_pool().await;
    db::create_department(&pool, "Python").await.unwrap();
    let err = db::create_department(&pool, "Python").await.unwrap_err();
    assert!(matches!(err, StoreError::UniqueViolation(_)), "got {err:?}");
    assert!(err.is_constraint_violation());

    let java = db::create_department(&pool, "Java").await.unwrap();
    let err = db::rename_department(&pool, java.id, "Python").await.unwrap_err();
    assert!(matches!(err, StoreError::UniqueViolation(_)));
}

#[tokio::test]
async fn dangling_department_reference_is_foreign_key_violation() {
    let pool = setup_pool().await;
    let missing = Some(404);

    let err = db::create_customer(&pool, &customer(7, missing)).await.unwrap_err();
    assert!(matches!(err, StoreError::ForeignKeyViolation(_)), "got {err:?}");

    let err = db::create_course(
        &pool,
        &NewCourse { department_id: missing, department_info: "x".into() },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StoreError::ForeignKeyViolation(_)));

    let err = db::create_vacancy(
        &pool,
        &NewVacancy {
            vacancy_type: 1,
            department_id: missing,
            vacancy_label: "Junior".into(),
            vacancy_info: "Remote".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StoreError::ForeignKeyViolation(_)));

    let err = db::create_news(
        &pool,
        &NewNews { department_id: missing, news_source: "habr".into(), news_label: "Hi".into() },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StoreError::ForeignKeyViolation(_)));

    assert!(db::list_customers(&pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_department_with_dependents_fails() {
    let pool = setup_pool().await;
    let python = db::create_department(&pool, "Python").await.unwrap();
    db::create_course(
        &pool,
        &NewCourse { department_id: Some(python.id), department_info: "text".into() },
    )
    .await
    .unwrap();

    let err = db::delete_department(&pool, python.id).await.unwrap_err();
    assert!(matches!(err, StoreError::ForeignKeyViolation(_)), "got {err:?}");
    assert!(db::get_department(&pool, python.id).await.is_ok());
}

#[tokio::test]
async fn updates_move_updated_at_forward() {
    let pool = setup_pool().await;
    let d = db::create_department(&pool, "Python").await.unwrap();
    assert_eq!(d.created_at, d.updated_at);

    let first = db::rename_department(&pool, d.id, "Python 3").await.unwrap();
    assert!(first.updated_at > first.created_at);
    assert_eq!(first.created_at, d.created_at);

    let second = db::rename_department(&pool, d.id, "Python 3.12").await.unwrap();
    assert!(second.updated_at > first.updated_at);

    let c = db::create_customer(&pool, &customer(5, Some(d.id))).await.unwrap();
    let c2 = db::update_customer_phone(&pool, c.id, None).await.unwrap();
    assert!(c2.updated_at > c.updated_at);
    assert_eq!(c2.phone, None);
    let c3 = db::update_customer_time(&pool, c.id, Some(StudyTime::Morning)).await.unwrap();
    assert!(c3.updated_at > c2.updated_at);
    assert_eq!(c3.study_time(), Some(StudyTime::Morning));

    let course = db::create_course(
        &pool,
        &NewCourse { department_id: Some(d.id), department_info: "old".into() },
    )
    .await
    .unwrap();
    let course2 = db::update_course_info(&pool, course.id, "new").await.unwrap();
    assert!(course2.updated_at > course.updated_at);

    let v = db::create_vacancy(
        &pool,
        &NewVacancy {
            vacancy_type: 2,
            department_id: Some(d.id),
            vacancy_label: "Middle".into(),
            vacancy_info: "Office".into(),
        },
    )
    .await
    .unwrap();
    let v2 = db::update_vacancy_info(&pool, v.id, "Senior", "Remote").await.unwrap();
    assert!(v2.updated_at > v.updated_at);

    let n = db::create_news(
        &pool,
        &NewNews { department_id: Some(d.id), news_source: "TIOBE".into(), news_label: "a".into() },
    )
    .await
    .unwrap();
    let n2 = db::update_news_label(&pool, n.id, "b").await.unwrap();
    assert!(n2.updated_at > n.updated_at);
}

#[tokio::test]
async fn updating_missing_rows_is_not_found() {
    let pool = setup_pool().await;
    assert!(matches!(
        db::rename_department(&pool, 9, "x").await,
        Err(StoreError::NotFound { entity: "department", id: 9 })
    ));
    assert!(matches!(
        db::update_course_info(&pool, 9, "x").await,
        Err(StoreError::NotFound { entity: "course", .. })
    ));
    assert!(matches!(
        db::update_news_label(&pool, 9, "x").await,
        Err(StoreError::NotFound { entity: "news", .. })
    ));
}

#[tokio::test]
async fn department_relationships_navigate_both_ways() {
    let pool = setup_pool().await;
    let python = db::create_department(&pool, "Python").await.unwrap();
    let java = db::create_department(&pool, "Java").await.unwrap();

    let alice = db::create_customer(&pool, &customer(11, Some(python.id))).await.unwrap();
    db::create_customer(&pool, &customer(12, Some(java.id))).await.unwrap();
    let course = db::create_course(
        &pool,
        &NewCourse { department_id: Some(python.id), department_info: "4 months".into() },
    )
    .await
    .unwrap();
    let vacancy = db::create_vacancy(
        &pool,
        &NewVacancy {
            vacancy_type: 1,
            department_id: Some(python.id),
            vacancy_label: "Backend".into(),
            vacancy_info: "Django".into(),
        },
    )
    .await
    .unwrap();
    let news = db::create_news(
        &pool,
        &NewNews {
            department_id: Some(python.id),
            news_source: "TIOBE".into(),
            news_label: "Python tops the index".into(),
        },
    )
    .await
    .unwrap();

    let tree = db::department_tree(&pool, python.id).await.unwrap();
    assert_eq!(tree.department, python);
    assert_eq!(tree.customers, vec![alice.clone()]);
    assert_eq!(tree.courses, vec![course.clone()]);
    assert_eq!(tree.vacancies, vec![vacancy.clone()]);
    assert_eq!(tree.news, vec![news.clone()]);
    assert_eq!(vacancy.source(), VacancySource::Internal);

    let java_tree = db::department_tree(&pool, java.id).await.unwrap();
    assert_eq!(java_tree.customers.len(), 1);
    assert!(java_tree.courses.is_empty());

    assert_eq!(db::department_of(&pool, &alice).await.unwrap(), Some(python.clone()));
    assert_eq!(db::department_of(&pool, &course).await.unwrap(), Some(python.clone()));
    assert_eq!(db::department_of(&pool, &vacancy).await.unwrap(), Some(python.clone()));
    assert_eq!(db::department_of(&pool, &news).await.unwrap(), Some(python.clone()));

    let orphan = db::create_customer(&pool, &customer(13, None)).await.unwrap();
    assert_eq!(db::department_of(&pool, &orphan).await.unwrap(), None);

    assert_eq!(
        db::course_for_department(&pool, python.id).await.unwrap().map(|c| c.id),
        Some(course.id)
    );
    assert!(db::course_for_department(&pool, java.id).await.unwrap().is_none());
}

#[tokio::test]
async fn required_fields_are_enforced() {
    let pool = setup_pool().await;
    let err = sqlx::query("INSERT INTO customer (chat_id) VALUES (1)")
        .execute(&pool)
        .await
        .map_err(StoreError::from)
        .unwrap_err();
    assert!(matches!(err, StoreError::NotNullViolation(_)), "got {err:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_presses_share_one_reception_row() {
    let td = tempfile::tempdir().unwrap();
    for round in 0..10 {
        let url = format!("sqlite://{}/reception-{round}.db", td.path().display());
        let pool = db::init_pool(&DatabaseConfig::new(url)).await.unwrap();
        schema::apply(&pool).await.unwrap();

        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let pool = pool.clone();
                tokio::spawn(async move { db::current_reception(&pool).await })
            })
            .collect();
        let mut ids = HashSet::new();
        for task in tasks {
            let reception = task.await.unwrap().unwrap();
            ids.insert(reception.id);
        }
        assert_eq!(ids.len(), 1, "round {round} saw several rows");

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reception")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
        db::close_pool(pool).await;
    }
}
