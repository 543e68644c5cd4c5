use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Preferred group schedule picked by a customer at registration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StudyTime {
    Morning,
    Evening,
}

impl StudyTime {
    pub fn as_i16(&self) -> i16 {
        match self {
            StudyTime::Morning => 1,
            StudyTime::Evening => 2,
        }
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(StudyTime::Morning),
            2 => Some(StudyTime::Evening),
            _ => None,
        }
    }
}

/// Where a vacancy was sourced from. Stored as `vacancy_type`: 1 is internal,
/// any other value is external.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VacancySource {
    Internal,
    External,
}

impl VacancySource {
    pub fn from_i16(value: i16) -> Self {
        if value == 1 {
            VacancySource::Internal
        } else {
            VacancySource::External
        }
    }

    pub fn as_i16(&self) -> i16 {
        match self {
            VacancySource::Internal => 1,
            VacancySource::External => 2,
        }
    }
}

/// Top-level bot menu buttons counted in the `reception` table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReceptionButton {
    Apply,
    AboutCourses,
    AboutCompany,
    Vacancies,
    News,
}

impl ReceptionButton {
    pub const ALL: [ReceptionButton; 5] = [
        ReceptionButton::Apply,
        ReceptionButton::AboutCourses,
        ReceptionButton::AboutCompany,
        ReceptionButton::Vacancies,
        ReceptionButton::News,
    ];

    /// Column holding the counter for this button.
    pub fn column(&self) -> &'static str {
        match self {
            ReceptionButton::Apply => "apply",
            ReceptionButton::AboutCourses => "about_courses",
            ReceptionButton::AboutCompany => "about_company",
            ReceptionButton::Vacancies => "vacancies",
            ReceptionButton::News => "news",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Department {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    /// Programming language name, unique.
    pub department_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Customer {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    /// Chat of the user who applied for registration.
    pub chat_id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone: Option<i64>,
    /// Raw schedule value; see [`Customer::study_time`].
    pub time: Option<i16>,
    pub department_id: Option<i64>,
}

impl Customer {
    pub fn study_time(&self) -> Option<StudyTime> {
        self.time.and_then(StudyTime::from_i16)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Course {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub department_id: Option<i64>,
    /// Course description, Telegram Markdown. Treated as opaque text.
    pub department_info: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Vacancy {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub vacancy_type: i16,
    pub department_id: Option<i64>,
    /// The header of the vacancy.
    pub vacancy_label: String,
    pub vacancy_info: String,
}

impl Vacancy {
    pub fn source(&self) -> VacancySource {
        VacancySource::from_i16(self.vacancy_type)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct News {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub department_id: Option<i64>,
    /// Where the statistic has been taken from.
    pub news_source: String,
    /// The header of the article.
    pub news_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Reception {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub apply: i64,
    pub about_courses: i64,
    pub about_company: i64,
    pub vacancies: i64,
    pub news: i64,
}

impl Reception {
    pub fn count(&self, button: ReceptionButton) -> i64 {
        match button {
            ReceptionButton::Apply => self.apply,
            ReceptionButton::AboutCourses => self.about_courses,
            ReceptionButton::AboutCompany => self.about_company,
            ReceptionButton::Vacancies => self.vacancies,
            ReceptionButton::News => self.news,
        }
    }
}

/// Records that hang off a [`Department`].
pub trait BelongsToDepartment {
    fn department_id(&self) -> Option<i64>;
}

impl BelongsToDepartment for Customer {
    fn department_id(&self) -> Option<i64> {
        self.department_id
    }
}

impl BelongsToDepartment for Course {
    fn department_id(&self) -> Option<i64> {
        self.department_id
    }
}

impl BelongsToDepartment for Vacancy {
    fn department_id(&self) -> Option<i64> {
        self.department_id
    }
}

impl BelongsToDepartment for News {
    fn department_id(&self) -> Option<i64> {
        self.department_id
    }
}

/// A department together with every record that references it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentTree {
    pub department: Department,
    pub customers: Vec<Customer>,
    pub courses: Vec<Course>,
    pub vacancies: Vec<Vacancy>,
    pub news: Vec<News>,
}

// Insert payloads. Identity, timestamps and counter defaults come from the database.

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewCustomer {
    pub chat_id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone: Option<i64>,
    pub time: Option<StudyTime>,
    pub department_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewCourse {
    pub department_id: Option<i64>,
    pub department_info: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewVacancy {
    pub vacancy_type: i16,
    pub department_id: Option<i64>,
    pub vacancy_label: String,
    pub vacancy_info: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewNews {
    pub department_id: Option<i64>,
    pub news_source: String,
    pub news_label: String,
}
