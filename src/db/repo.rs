use super::error::{StoreError, StoreResult};
use super::schema;
use crate::config::DatabaseConfig;
use crate::model::{
    BelongsToDepartment, Course, Customer, Department, DepartmentTree, NewCourse, NewCustomer,
    NewNews, NewVacancy, News, Reception, ReceptionButton, StudyTime, Vacancy,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, instrument};

pub type Pool = SqlitePool;

/// Open the pool every repository call goes through.
///
/// Each connection enforces foreign keys. File databases run in WAL mode with
/// full durability; in-memory databases get a single connection that never
/// expires, otherwise the data would vanish with it.
pub async fn init_pool(cfg: &DatabaseConfig) -> StoreResult<Pool> {
    let in_memory = is_memory_url(&cfg.url);

    let options = SqliteConnectOptions::from_str(&cfg.url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(cfg.busy_timeout_ms))
        .journal_mode(if in_memory {
            SqliteJournalMode::Memory
        } else {
            SqliteJournalMode::Wal
        })
        .synchronous(SqliteSynchronous::Full);
    if !in_memory {
        ensure_parent_dir(&options.clone().get_filename())?;
    }

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(cfg.max_connections)
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(StoreError::Connection)?;
    info!(in_memory, "database pool opened");
    Ok(pool)
}

/// Private in-memory database, mostly for tests.
pub async fn memory_pool() -> StoreResult<Pool> {
    init_pool(&DatabaseConfig::new("sqlite::memory:")).await
}

pub async fn close_pool(pool: Pool) {
    pool.close().await;
    info!("database pool closed");
}

fn is_memory_url(url: &str) -> bool {
    url.starts_with("sqlite::memory") || url.contains("mode=memory")
}

/// A fresh deployment points at `./data/<name>.db` before `data/` exists.
fn ensure_parent_dir(db_file: &Path) -> StoreResult<()> {
    match db_file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.is_dir() => {
            debug!(dir = %dir.display(), "creating database directory");
            std::fs::create_dir_all(dir).map_err(|e| StoreError::Connection(sqlx::Error::Io(e)))
        }
        _ => Ok(()),
    }
}

/// Row count of every table, in catalogue order.
pub async fn table_counts(pool: &Pool) -> StoreResult<Vec<(&'static str, i64)>> {
    let mut counts = Vec::with_capacity(schema::TABLES.len());
    for table in schema::TABLES {
        let n: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await?;
        counts.push((table, n));
    }
    Ok(counts)
}

fn not_found(entity: &'static str, id: i64) -> StoreError {
    StoreError::NotFound { entity, id }
}

// ---------------------------------------------------------------------------
// department

#[instrument(skip_all)]
pub async fn create_department(pool: &Pool, name: &str) -> StoreResult<Department> {
    let mut tx = pool.begin().await?;
    let department = insert_department_tx(&mut tx, None, name).await?;
    tx.commit().await?;
    Ok(department)
}

/// Insert a department with a caller-chosen identity.
#[instrument(skip_all)]
pub async fn create_department_with_id(pool: &Pool, id: i64, name: &str) -> StoreResult<Department> {
    let mut tx = pool.begin().await?;
    let department = insert_department_tx(&mut tx, Some(id), name).await?;
    tx.commit().await?;
    Ok(department)
}

pub(crate) async fn insert_department_tx(
    tx: &mut Transaction<'_, Sqlite>,
    id: Option<i64>,
    name: &str,
) -> StoreResult<Department> {
    let department = sqlx::query_as::<_, Department>(
        "INSERT INTO department (id, department_name) VALUES (?, ?) RETURNING *",
    )
    .bind(id)
    .bind(name)
    .fetch_one(&mut **tx)
    .await?;
    debug!(id = department.id, name, "department inserted");
    Ok(department)
}

pub async fn get_department(pool: &Pool, id: i64) -> StoreResult<Department> {
    sqlx::query_as::<_, Department>("SELECT * FROM department WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| not_found("department", id))
}

pub async fn find_department_by_name(pool: &Pool, name: &str) -> StoreResult<Option<Department>> {
    let department =
        sqlx::query_as::<_, Department>("SELECT * FROM department WHERE department_name = ?")
            .bind(name)
            .fetch_optional(pool)
            .await?;
    Ok(department)
}

pub async fn list_departments(pool: &Pool) -> StoreResult<Vec<Department>> {
    let rows = sqlx::query_as::<_, Department>("SELECT * FROM department ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

#[instrument(skip_all)]
pub async fn rename_department(pool: &Pool, id: i64, name: &str) -> StoreResult<Department> {
    let res = sqlx::query("UPDATE department SET department_name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(not_found("department", id));
    }
    get_department(pool, id).await
}

/// Delete a department. There is no cascade: a department that still has
/// dependents fails with [`StoreError::ForeignKeyViolation`].
#[instrument(skip_all)]
pub async fn delete_department(pool: &Pool, id: i64) -> StoreResult<()> {
    let res = sqlx::query("DELETE FROM department WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(not_found("department", id));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// relationships

pub async fn customers_of(pool: &Pool, department_id: i64) -> StoreResult<Vec<Customer>> {
    let rows =
        sqlx::query_as::<_, Customer>("SELECT * FROM customer WHERE department_id = ? ORDER BY id")
            .bind(department_id)
            .fetch_all(pool)
            .await?;
    Ok(rows)
}

pub async fn courses_of(pool: &Pool, department_id: i64) -> StoreResult<Vec<Course>> {
    let rows =
        sqlx::query_as::<_, Course>("SELECT * FROM course WHERE department_id = ? ORDER BY id")
            .bind(department_id)
            .fetch_all(pool)
            .await?;
    Ok(rows)
}

pub async fn vacancies_of(pool: &Pool, department_id: i64) -> StoreResult<Vec<Vacancy>> {
    let rows =
        sqlx::query_as::<_, Vacancy>("SELECT * FROM vacancy WHERE department_id = ? ORDER BY id")
            .bind(department_id)
            .fetch_all(pool)
            .await?;
    Ok(rows)
}

pub async fn news_of(pool: &Pool, department_id: i64) -> StoreResult<Vec<News>> {
    let rows = sqlx::query_as::<_, News>("SELECT * FROM news WHERE department_id = ? ORDER BY id")
        .bind(department_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Load a department with all four dependent collections.
#[instrument(skip_all)]
pub async fn department_tree(pool: &Pool, department_id: i64) -> StoreResult<DepartmentTree> {
    let department = get_department(pool, department_id).await?;
    Ok(DepartmentTree {
        customers: customers_of(pool, department.id).await?,
        courses: courses_of(pool, department.id).await?,
        vacancies: vacancies_of(pool, department.id).await?,
        news: news_of(pool, department.id).await?,
        department,
    })
}

/// Back-reference from any dependent record. `None` when the record is not
/// attached to a department.
pub async fn department_of<T: BelongsToDepartment>(
    pool: &Pool,
    record: &T,
) -> StoreResult<Option<Department>> {
    match record.department_id() {
        Some(id) => get_department(pool, id).await.map(Some),
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// customer

#[instrument(skip_all)]
pub async fn create_customer(pool: &Pool, new: &NewCustomer) -> StoreResult<Customer> {
    let customer = sqlx::query_as::<_, Customer>(
        "INSERT INTO customer (chat_id, first_name, last_name, phone, time, department_id) VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(new.chat_id)
    .bind(&new.first_name)
    .bind(new.last_name.as_deref())
    .bind(new.phone)
    .bind(new.time.map(|t| t.as_i16()))
    .bind(new.department_id)
    .fetch_one(pool)
    .await?;
    info!(id = customer.id, chat_id = customer.chat_id, "customer registered");
    Ok(customer)
}

pub async fn get_customer(pool: &Pool, id: i64) -> StoreResult<Customer> {
    sqlx::query_as::<_, Customer>("SELECT * FROM customer WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| not_found("customer", id))
}

pub async fn list_customers(pool: &Pool) -> StoreResult<Vec<Customer>> {
    let rows = sqlx::query_as::<_, Customer>("SELECT * FROM customer ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

#[instrument(skip_all)]
pub async fn update_customer_phone(pool: &Pool, id: i64, phone: Option<i64>) -> StoreResult<Customer> {
    let res = sqlx::query("UPDATE customer SET phone = ? WHERE id = ?")
        .bind(phone)
        .bind(id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(not_found("customer", id));
    }
    get_customer(pool, id).await
}

#[instrument(skip_all)]
pub async fn update_customer_time(
    pool: &Pool,
    id: i64,
    time: Option<StudyTime>,
) -> StoreResult<Customer> {
    let res = sqlx::query("UPDATE customer SET time = ? WHERE id = ?")
        .bind(time.map(|t| t.as_i16()))
        .bind(id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(not_found("customer", id));
    }
    get_customer(pool, id).await
}

// ---------------------------------------------------------------------------
// course

#[instrument(skip_all)]
pub async fn create_course(pool: &Pool, new: &NewCourse) -> StoreResult<Course> {
    let mut tx = pool.begin().await?;
    let course = insert_course_tx(&mut tx, new).await?;
    tx.commit().await?;
    Ok(course)
}

pub(crate) async fn insert_course_tx(
    tx: &mut Transaction<'_, Sqlite>,
    new: &NewCourse,
) -> StoreResult<Course> {
    let course = sqlx::query_as::<_, Course>(
        "INSERT INTO course (department_id, department_info) VALUES (?, ?) RETURNING *",
    )
    .bind(new.department_id)
    .bind(&new.department_info)
    .fetch_one(&mut **tx)
    .await?;
    debug!(id = course.id, department_id = course.department_id, "course inserted");
    Ok(course)
}

pub async fn get_course(pool: &Pool, id: i64) -> StoreResult<Course> {
    sqlx::query_as::<_, Course>("SELECT * FROM course WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| not_found("course", id))
}

pub async fn list_courses(pool: &Pool) -> StoreResult<Vec<Course>> {
    let rows = sqlx::query_as::<_, Course>("SELECT * FROM course ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// The course text shown for a department; the oldest one wins if several exist.
pub async fn course_for_department(pool: &Pool, department_id: i64) -> StoreResult<Option<Course>> {
    let course = sqlx::query_as::<_, Course>(
        "SELECT * FROM course WHERE department_id = ? ORDER BY id LIMIT 1",
    )
    .bind(department_id)
    .fetch_optional(pool)
    .await?;
    Ok(course)
}

#[instrument(skip_all)]
pub async fn update_course_info(pool: &Pool, id: i64, info: &str) -> StoreResult<Course> {
    let res = sqlx::query("UPDATE course SET department_info = ? WHERE id = ?")
        .bind(info)
        .bind(id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(not_found("course", id));
    }
    get_course(pool, id).await
}

// ---------------------------------------------------------------------------
// vacancy

#[instrument(skip_all)]
pub async fn create_vacancy(pool: &Pool, new: &NewVacancy) -> StoreResult<Vacancy> {
    let vacancy = sqlx::query_as::<_, Vacancy>(
        "INSERT INTO vacancy (vacancy_type, department_id, vacancy_label, vacancy_info) VALUES (?, ?, ?, ?) RETURNING *",
    )
    .bind(new.vacancy_type)
    .bind(new.department_id)
    .bind(&new.vacancy_label)
    .bind(&new.vacancy_info)
    .fetch_one(pool)
    .await?;
    Ok(vacancy)
}

pub async fn get_vacancy(pool: &Pool, id: i64) -> StoreResult<Vacancy> {
    sqlx::query_as::<_, Vacancy>("SELECT * FROM vacancy WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| not_found("vacancy", id))
}

pub async fn list_vacancies(pool: &Pool) -> StoreResult<Vec<Vacancy>> {
    let rows = sqlx::query_as::<_, Vacancy>("SELECT * FROM vacancy ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

#[instrument(skip_all)]
pub async fn update_vacancy_info(
    pool: &Pool,
    id: i64,
    label: &str,
    info: &str,
) -> StoreResult<Vacancy> {
    let res = sqlx::query("UPDATE vacancy SET vacancy_label = ?, vacancy_info = ? WHERE id = ?")
        .bind(label)
        .bind(info)
        .bind(id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(not_found("vacancy", id));
    }
    get_vacancy(pool, id).await
}

// ---------------------------------------------------------------------------
// news

#[instrument(skip_all)]
pub async fn create_news(pool: &Pool, new: &NewNews) -> StoreResult<News> {
    let news = sqlx::query_as::<_, News>(
        "INSERT INTO news (department_id, news_source, news_label) VALUES (?, ?, ?) RETURNING *",
    )
    .bind(new.department_id)
    .bind(&new.news_source)
    .bind(&new.news_label)
    .fetch_one(pool)
    .await?;
    Ok(news)
}

pub async fn get_news(pool: &Pool, id: i64) -> StoreResult<News> {
    sqlx::query_as::<_, News>("SELECT * FROM news WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| not_found("news", id))
}

pub async fn list_news(pool: &Pool) -> StoreResult<Vec<News>> {
    let rows = sqlx::query_as::<_, News>("SELECT * FROM news ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

#[instrument(skip_all)]
pub async fn update_news_label(pool: &Pool, id: i64, label: &str) -> StoreResult<News> {
    let res = sqlx::query("UPDATE news SET news_label = ? WHERE id = ?")
        .bind(label)
        .bind(id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(not_found("news", id));
    }
    get_news(pool, id).await
}

// ---------------------------------------------------------------------------
// reception

/// Insert a fresh counter row; every counter starts at 1.
#[instrument(skip_all)]
pub async fn create_reception(pool: &Pool) -> StoreResult<Reception> {
    let reception = sqlx::query_as::<_, Reception>("INSERT INTO reception DEFAULT VALUES RETURNING *")
        .fetch_one(pool)
        .await?;
    Ok(reception)
}

pub async fn get_reception(pool: &Pool, id: i64) -> StoreResult<Reception> {
    sqlx::query_as::<_, Reception>("SELECT * FROM reception WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| not_found("reception", id))
}

/// The counter row the bot writes to: the oldest one, created if the table is empty.
#[instrument(skip_all)]
pub async fn current_reception(pool: &Pool) -> StoreResult<Reception> {
    // Write first: a read-then-insert transaction cannot upgrade its lock
    // when two first presses race, while a lone INSERT waits on busy_timeout.
    sqlx::query("INSERT INTO reception (apply) SELECT 1 WHERE NOT EXISTS (SELECT 1 FROM reception)")
        .execute(pool)
        .await?;
    let reception = sqlx::query_as::<_, Reception>("SELECT * FROM reception ORDER BY id LIMIT 1")
        .fetch_one(pool)
        .await?;
    Ok(reception)
}

/// Count one press of `button`. The increment happens inside SQL so
/// concurrent presses are never lost.
#[instrument(skip_all, fields(button = button.column()))]
pub async fn record_click(pool: &Pool, id: i64, button: ReceptionButton) -> StoreResult<Reception> {
    let column = button.column();
    let res = sqlx::query(&format!(
        "UPDATE reception SET {column} = {column} + 1 WHERE id = ?"
    ))
    .bind(id)
    .execute(pool)
    .await?;
    if res.rows_affected() == 0 {
        return Err(not_found("reception", id));
    }
    get_reception(pool, id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_pool() -> Pool {
        let pool = memory_pool().await.unwrap();
        schema::apply(&pool).await.unwrap();
        pool
    }

    #[test]
    fn memory_urls_are_detected() {
        assert!(is_memory_url("sqlite::memory:"));
        assert!(is_memory_url("sqlite://bot.db?mode=memory&cache=shared"));
        assert!(!is_memory_url("sqlite://./data/bot.db"));
    }

    #[test]
    fn parent_dir_is_created_for_file_databases() {
        let td = tempfile::tempdir().unwrap();
        let db_path = td.path().join("nested").join("deeper").join("bot.db");
        ensure_parent_dir(&db_path).unwrap();
        assert!(td.path().join("nested").join("deeper").is_dir());
        // bare file name: nothing to create
        ensure_parent_dir(Path::new("bot.db")).unwrap();
    }

    #[test]
    fn parent_dir_blocked_by_file_is_connection_error() {
        let td = tempfile::tempdir().unwrap();
        let blocker = td.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let err = ensure_parent_dir(&blocker.join("bot.db")).unwrap_err();
        assert!(matches!(err, StoreError::Connection(_)));
    }

    #[tokio::test]
    async fn department_crud() {
        let pool = setup_pool().await;
        let python = create_department(&pool, "Python").await.unwrap();
        let java = create_department(&pool, "Java").await.unwrap();
        assert_ne!(python.id, java.id);

        let found = find_department_by_name(&pool, "Java").await.unwrap();
        assert_eq!(found.map(|d| d.id), Some(java.id));
        assert!(find_department_by_name(&pool, "Go").await.unwrap().is_none());

        let renamed = rename_department(&pool, java.id, "Kotlin").await.unwrap();
        assert_eq!(renamed.department_name, "Kotlin");

        delete_department(&pool, java.id).await.unwrap();
        assert!(matches!(
            get_department(&pool, java.id).await,
            Err(StoreError::NotFound { entity: "department", .. })
        ));
        assert_eq!(list_departments(&pool).await.unwrap(), vec![python]);
    }

    #[tokio::test]
    async fn reception_counters_start_at_one() {
        let pool = setup_pool().await;
        let r = current_reception(&pool).await.unwrap();
        for button in ReceptionButton::ALL {
            assert_eq!(r.count(button), 1);
        }
        // same row on second call
        assert_eq!(current_reception(&pool).await.unwrap().id, r.id);
    }

    #[tokio::test]
    async fn record_click_touches_one_counter() {
        let pool = setup_pool().await;
        let r = create_reception(&pool).await.unwrap();
        record_click(&pool, r.id, ReceptionButton::Vacancies).await.unwrap();
        let after = record_click(&pool, r.id, ReceptionButton::Vacancies).await.unwrap();
        assert_eq!(after.vacancies, 3);
        assert_eq!(after.apply, 1);
        assert_eq!(after.news, 1);
        assert!(after.updated_at > r.updated_at);

        assert!(matches!(
            record_click(&pool, r.id + 100, ReceptionButton::News).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn table_counts_cover_every_table() {
        let pool = setup_pool().await;
        create_department(&pool, "Python").await.unwrap();
        let counts = table_counts(&pool).await.unwrap();
        assert_eq!(counts.len(), schema::TABLES.len());
        assert_eq!(counts[0], ("department", 1));
        assert!(counts[1..].iter().all(|(_, n)| *n == 0));
    }
}
