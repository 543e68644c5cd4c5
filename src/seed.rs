//! Starter content and the destructive reset that installs it.
//!
//! [`reset`] drops every table, recreates the schema and inserts the seed
//! rows. It only runs with a [`ResetConfirmation`], which can be obtained
//! from an explicit opt-in and nowhere else.

use crate::config::Config;
use crate::db::repo::{insert_course_tx, insert_department_tx, Pool};
use crate::db::{schema, StoreError, StoreResult};
use crate::model::NewCourse;
use tracing::{info, instrument, warn};

/// Departments installed by [`reset`], with their fixed identities.
pub const DEPARTMENTS: [(i64, &str); 4] = [
    (1, "Python"),
    (2, "System Administrator"),
    (3, "Javascript"),
    (4, "Java"),
];

pub const PYTHON_DEPARTMENT_ID: i64 = 1;
pub const SYS_ADMIN_DEPARTMENT_ID: i64 = 2;

/// Course description for the Python track (Telegram Markdown).
pub const PYTHON_COURSE_INFO: &str = concat!(
    "*Длительность:* 4️⃣ месяца\n",
    "*Стоимость:* 150$ / за месяц 🤏\n",
    "*Программа обучения:*\x20\n",
    "    Месяц 1: *Английский + Математика + Linux*\n",
    "    Месяц 2: *Знакомство с синтаксисом языка Python*\n",
    "    Месяц 3: *Углубленное изучения языка + Базы Данных*\n",
    "    Месяц 4: *Изучения фрэймворка Django*\n",
    "\x20\x20\x20\x20\n",
    "*Дополнительная информация:*\n",
    "    Во время изучения языка программирования(ЯП) Python вы также получаете:\n",
    "    1. Изучение необходимых библиотек относящихся к ЯП Python 😱😱😱\n",
    "    2. Изучение нескольких Баз Данных 🧐\n",
    "    3. Возможность научиться создавать Telegram боты 🤖\n",
    "    4. Изучить вёрстку на HTML+CSS 👩‍🎤🧑‍🎤\n",
    "    5. Возможность работать на оплачиваемых проектах 🤑\n",
    "    6. Участие в локальных Хакатонах 🏆\n",
    "    7. Коворкинг и новые знакомства 🧍‍♀️🧍🐼🦉👽\n",
    "    8. Многое многое другое... 🤤😍🤩\n",
    "\n",
);

/// Course description for the System Administrator track (Telegram Markdown).
pub const SYS_ADMIN_COURSE_INFO: &str = concat!(
    "*Длительность:* 4️⃣ месяца\n",
    "*Стоимость:* 140$ / за месяц 🤏\n",
    "*Программа обучения:*\x20\n",
    "    Месяц 1: *Английский + Математика + Linux*\n",
    "    Месяц 2: *Знакомство с синтаксисом языка Python*\n",
    "    Месяц 3: *Углубленное изучения языка + Базы Данных*\n",
    "    Месяц 4: *Изучения фрэймворка Django*\n",
    "\x20\x20\x20\x20\n",
    "*Дополнительная информация:*\n",
    "    Во время изучения языка программирования(ЯП) Python вы также получаете:\n",
    "    1. Изучение необходимых библиотек относящихся к ЯП Python 😱😱😱\n",
    "    2. Изучение нескольких Баз Данных 🧐\n",
    "    3. Возможность научиться создавать Telegram боты 🤖\n",
    "    4. Изучить вёрстку на HTML+CSS 👩‍🎤🧑‍🎤\n",
    "    5. Возможность работать на оплачиваемых проектах 🤑\n",
    "    6. Участие в локальных Хакатонах 🏆\n",
    "    7. Коворкинг и новые знакомства 🧍‍♀️🧍🐼🦉👽\n",
    "    8. Многое многое другое... 🤤😍🤩\n",
    "\n",
);

/// Seed courses as (department id, description).
pub fn courses() -> [NewCourse; 2] {
    [
        NewCourse {
            department_id: Some(PYTHON_DEPARTMENT_ID),
            department_info: PYTHON_COURSE_INFO.to_string(),
        },
        NewCourse {
            department_id: Some(SYS_ADMIN_DEPARTMENT_ID),
            department_info: SYS_ADMIN_COURSE_INFO.to_string(),
        },
    ]
}

/// Proof that an operator opted in to destroying the database.
#[derive(Debug, Clone, Copy)]
pub struct ResetConfirmation {
    _private: (),
}

impl ResetConfirmation {
    /// Confirmation given by hand, e.g. a `--yes-destroy-data` flag.
    pub fn explicit() -> Self {
        Self { _private: () }
    }

    /// Confirmation from `reset.allow` in the config or the
    /// `PPROGRAMIST_ALLOW_RESET` environment variable.
    pub fn from_config(cfg: &Config) -> StoreResult<Self> {
        if cfg.reset_allowed() {
            Ok(Self::explicit())
        } else {
            Err(StoreError::ResetNotConfirmed)
        }
    }
}

/// Summary of what [`reset`] installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub departments: usize,
    pub courses: usize,
}

/// Drop all tables, recreate the schema and insert the seed rows.
///
/// All existing data is lost. The seed rows go in within one transaction, so
/// a failure leaves an empty schema rather than half the seed.
#[instrument(skip_all)]
pub async fn reset(pool: &Pool, _confirmation: ResetConfirmation) -> StoreResult<SeedReport> {
    warn!("dropping all tables");
    schema::drop_all(pool).await?;
    schema::apply(pool).await?;
    let report = seed(pool).await?;
    info!(
        departments = report.departments,
        courses = report.courses,
        "database reset and seeded"
    );
    Ok(report)
}

async fn seed(pool: &Pool) -> StoreResult<SeedReport> {
    insert_seed(pool, &DEPARTMENTS, &courses()).await
}

/// Insert departments then courses; either all rows land or none do.
async fn insert_seed(
    pool: &Pool,
    departments: &[(i64, &str)],
    courses: &[NewCourse],
) -> StoreResult<SeedReport> {
    let mut tx = pool.begin().await?;
    for &(id, name) in departments {
        insert_department_tx(&mut tx, Some(id), name).await?;
    }
    for course in courses {
        insert_course_tx(&mut tx, course).await?;
    }
    tx.commit().await?;
    Ok(SeedReport {
        departments: departments.len(),
        courses: courses.len(),
    })
}
