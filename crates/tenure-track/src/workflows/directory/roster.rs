//! Importer for the legacy payroll roster export (CSV).
//!
//! The export carries one row per appointment with the legacy short codes for
//! tenure, rank, and dedication. Rows with unknown codes or unparseable dates
//! are skipped and reported in the summary rather than failing the import.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{Category, Dedication, DeliveryTerm, Tenure};
use super::repository::DirectoryStore;
use super::service::{DirectoryService, DirectoryServiceError, NewCourse, NewFaculty, NewPosition};

#[derive(Debug)]
pub enum RosterImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Directory(DirectoryServiceError),
}

impl std::fmt::Display for RosterImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterImportError::Io(err) => write!(f, "failed to read roster export: {}", err),
            RosterImportError::Csv(err) => write!(f, "invalid roster CSV data: {}", err),
            RosterImportError::Directory(err) => {
                write!(f, "could not apply roster data to the directory: {}", err)
            }
        }
    }
}

impl std::error::Error for RosterImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RosterImportError::Io(err) => Some(err),
            RosterImportError::Csv(err) => Some(err),
            RosterImportError::Directory(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for RosterImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RosterImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<DirectoryServiceError> for RosterImportError {
    fn from(err: DirectoryServiceError) -> Self {
        Self::Directory(err)
    }
}

#[derive(Debug, Clone)]
struct RosterRow {
    surname: String,
    given_name: String,
    national_id: u64,
    payroll_id: u64,
    email: Option<String>,
    course: String,
    department: String,
    tenure: Tenure,
    category: Category,
    dedication: Dedication,
    start: NaiveDate,
    expiry: Option<NaiveDate>,
}

/// Parsed roster export, ready to be applied to a directory.
#[derive(Debug)]
pub struct RosterImport {
    rows: Vec<RosterRow>,
    skipped: Vec<String>,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct RosterImportSummary {
    pub faculty_created: usize,
    pub courses_created: usize,
    pub positions_created: usize,
    pub skipped: Vec<String>,
}

impl RosterImport {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RosterImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RosterImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let index = |name: &str| {
            headers
                .iter()
                .position(|header| clean(header).eq_ignore_ascii_case(name))
        };

        let surname_idx = index("surname");
        let given_idx = index("given name");
        let national_idx = index("national id");
        let payroll_idx = index("payroll id");
        let email_idx = index("email");
        let course_idx = index("course");
        let department_idx = index("department");
        let tenure_idx = index("tenure");
        let category_idx = index("category");
        let dedication_idx = index("dedication");
        let start_idx = index("start");
        let expiry_idx = index("expiry");

        let mut rows = Vec::new();
        let mut skipped = Vec::new();

        for (row_number, record) in csv_reader.records().enumerate() {
            let record = record?;
            let line = row_number + 2;
            let field = |idx: Option<usize>| {
                idx.and_then(|i| record.get(i))
                    .map(clean)
                    .unwrap_or_default()
            };

            let surname = field(surname_idx).to_lowercase();
            let course = field(course_idx).to_lowercase();
            if surname.is_empty() || course.is_empty() {
                skipped.push(format!("line {line}: missing surname or course"));
                continue;
            }

            let tenure = match parse_tenure(&field(tenure_idx)) {
                Some(value) => value,
                None => {
                    skipped.push(format!("line {line}: unknown tenure code"));
                    continue;
                }
            };
            let category = match parse_category(&field(category_idx)) {
                Some(value) => value,
                None => {
                    skipped.push(format!("line {line}: unknown category code"));
                    continue;
                }
            };
            let dedication = match parse_dedication(&field(dedication_idx)) {
                Some(value) => value,
                None => {
                    skipped.push(format!("line {line}: unknown dedication code"));
                    continue;
                }
            };
            let start = match parse_date(&field(start_idx)) {
                Some(value) => value,
                None => {
                    skipped.push(format!("line {line}: unparseable start date"));
                    continue;
                }
            };
            let national_id = match field(national_idx).parse::<u64>() {
                Ok(value) => value,
                Err(_) => {
                    skipped.push(format!("line {line}: national id is not numeric"));
                    continue;
                }
            };
            let payroll_id = field(payroll_idx).parse::<u64>().unwrap_or(national_id);

            let email = {
                let raw = field(email_idx).to_lowercase();
                if raw.contains('@') {
                    Some(raw)
                } else {
                    None
                }
            };

            rows.push(RosterRow {
                surname,
                given_name: field(given_idx).to_lowercase(),
                national_id,
                payroll_id,
                email,
                course,
                department: field(department_idx).to_lowercase(),
                tenure,
                category,
                dedication,
                start,
                expiry: parse_date(&field(expiry_idx)),
            });
        }

        Ok(Self { rows, skipped })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Apply the parsed rows, deduplicating faculty by national id and courses
    /// by name.
    pub fn apply<S>(
        &self,
        directory: &DirectoryService<S>,
    ) -> Result<RosterImportSummary, RosterImportError>
    where
        S: DirectoryStore + 'static,
    {
        let store = directory.store();
        let mut summary = RosterImportSummary {
            skipped: self.skipped.clone(),
            ..RosterImportSummary::default()
        };

        for row in &self.rows {
            let faculty_id = match store
                .list_faculty()
                .map_err(DirectoryServiceError::from)?
                .into_iter()
                .find(|faculty| faculty.national_id == row.national_id)
            {
                Some(existing) => existing.id,
                None => {
                    let created = directory.register_faculty(NewFaculty {
                        given_name: row.given_name.clone(),
                        surname: row.surname.clone(),
                        national_id: row.national_id,
                        payroll_id: row.payroll_id,
                        birth_date: NaiveDate::from_ymd_opt(1900, 1, 1)
                            .expect("constant date is valid"),
                    })?;
                    summary.faculty_created += 1;
                    if let Some(address) = &row.email {
                        directory.add_email(created.id, address, true)?;
                    }
                    created.id
                }
            };

            let course_id = match store
                .list_courses()
                .map_err(DirectoryServiceError::from)?
                .into_iter()
                .find(|course| course.name == row.course)
            {
                Some(existing) => existing.id,
                None => {
                    let created = directory.register_course(NewCourse {
                        name: row.course.clone(),
                        department: row.department.clone(),
                        speciality: row.department.clone(),
                        level: None,
                        weekly_hours: 0,
                        total_hours: 0,
                        delivery: DeliveryTerm::Annual,
                        mandatory: true,
                        score: 0,
                    })?;
                    summary.courses_created += 1;
                    created.id
                }
            };

            directory.register_position(NewPosition {
                faculty: faculty_id,
                course: course_id,
                tenure: row.tenure,
                category: row.category,
                dedication: row.dedication,
                weekly_load: 1.0,
                start: row.start,
                end: None,
                expiry: row.expiry,
            })?;
            summary.positions_created += 1;
        }

        Ok(summary)
    }
}

fn clean(value: &str) -> String {
    value.trim_start_matches('\u{feff}').trim().to_string()
}

fn parse_tenure(code: &str) -> Option<Tenure> {
    match code.to_ascii_lowercase().as_str() {
        "ord" | "ordinary" => Some(Tenure::Ordinary),
        "reg" | "regular" => Some(Tenure::Regular),
        "int" | "interim" => Some(Tenure::Interim),
        "adh" | "honorary" => Some(Tenure::Honorary),
        _ => None,
    }
}

fn parse_category(code: &str) -> Option<Category> {
    match code.to_ascii_lowercase().as_str() {
        "tit" | "full" => Some(Category::Full),
        "aso" | "associate" => Some(Category::Associate),
        "adj" | "adjunct" => Some(Category::Adjunct),
        "jtp" => Some(Category::HeadAssistant),
        "atp1" => Some(Category::FirstAssistant),
        "atp2" => Some(Category::SecondAssistant),
        _ => None,
    }
}

fn parse_dedication(code: &str) -> Option<Dedication> {
    match code.to_ascii_lowercase().as_str() {
        "ds" | "simple" => Some(Dedication::Simple),
        "se" | "semi" => Some(Dedication::SemiExclusive),
        "de" | "exclusive" => Some(Dedication::Exclusive),
        _ => None,
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d/%m/%Y"))
        .ok()
}
