//! Aggregate statistics over the equivalence request population.

use std::collections::{BTreeSet, HashMap};

use chrono::Datelike;
use serde::Serialize;

use crate::workflows::directory::CourseId;

use super::domain::{EquivalenceRequest, ItemStatus, RequestId, RequestItem, RequestStatus};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyActivity {
    pub month: u32,
    pub label: String,
    pub opened: f64,
    pub completed: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RulingCount {
    pub status: ItemStatus,
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseCount {
    pub course: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProblemCourse {
    pub course: String,
    pub status_label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseDelay {
    pub course: String,
    pub days: i64,
}

/// Dashboard statistics for one year, or the per-calendar-month historical
/// average when no year is selected.
#[derive(Debug, Clone, Serialize)]
pub struct EquivalenceStatistics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub total_requests: usize,
    pub total_items: usize,
    pub monthly: Vec<MonthlyActivity>,
    pub ruling_distribution: Vec<RulingCount>,
    pub top_requested: Vec<CourseCount>,
    pub problem_courses: Vec<ProblemCourse>,
    pub avg_resolution_days: i64,
    pub avg_ruling_days: i64,
    pub top_delays: Vec<CourseDelay>,
}

pub fn compute(
    requests: &[EquivalenceRequest],
    items: &[RequestItem],
    course_names: &HashMap<CourseId, String>,
    selected_year: Option<i32>,
) -> EquivalenceStatistics {
    let requests: Vec<&EquivalenceRequest> = requests
        .iter()
        .filter(|request| match selected_year {
            Some(year) => request.opened_at.year() == year,
            None => true,
        })
        .collect();
    let request_index: HashMap<RequestId, &EquivalenceRequest> = requests
        .iter()
        .map(|request| (request.id, *request))
        .collect();
    let items: Vec<&RequestItem> = items
        .iter()
        .filter(|item| request_index.contains_key(&item.request))
        .collect();

    let course_name = |course: CourseId| {
        course_names
            .get(&course)
            .cloned()
            .unwrap_or_else(|| format!("course #{}", course.0))
    };

    let monthly = monthly_series(&requests, selected_year);

    let mut ruling_counts: HashMap<ItemStatus, usize> = HashMap::new();
    for item in &items {
        if item.status.is_final() {
            *ruling_counts.entry(item.status).or_default() += 1;
        }
    }
    let mut ruling_distribution: Vec<RulingCount> = ruling_counts
        .into_iter()
        .map(|(status, count)| RulingCount {
            status,
            label: status.label(),
            count,
        })
        .collect();
    ruling_distribution.sort_by(|a, b| a.count.cmp(&b.count).then(a.label.cmp(b.label)));

    let mut per_course: HashMap<CourseId, usize> = HashMap::new();
    for item in &items {
        *per_course.entry(item.course).or_default() += 1;
    }
    let mut top_requested: Vec<CourseCount> = per_course
        .into_iter()
        .map(|(course, count)| CourseCount {
            course: course_name(course),
            count,
        })
        .collect();
    top_requested.sort_by(|a, b| b.count.cmp(&a.count).then(a.course.cmp(&b.course)));
    top_requested.truncate(10);

    let mut per_problem: HashMap<(CourseId, ItemStatus), usize> = HashMap::new();
    for item in &items {
        if matches!(item.status, ItemStatus::Denied | ItemStatus::RequiresSupplement) {
            *per_problem.entry((item.course, item.status)).or_default() += 1;
        }
    }
    let mut problem_courses: Vec<ProblemCourse> = per_problem
        .into_iter()
        .map(|((course, status), count)| ProblemCourse {
            course: course_name(course),
            status_label: status.label(),
            count,
        })
        .collect();
    problem_courses.sort_by(|a, b| b.count.cmp(&a.count).then(a.course.cmp(&b.course)));
    problem_courses.truncate(10);

    let resolution_days: Vec<i64> = requests
        .iter()
        .filter(|request| request.status == RequestStatus::Completed)
        .filter_map(|request| {
            request
                .completed_at
                .map(|completed| (completed - request.opened_at).num_days())
        })
        .collect();
    let avg_resolution_days = mean(&resolution_days);

    let mut ruling_days = Vec::new();
    let mut delay_by_course: HashMap<CourseId, Vec<i64>> = HashMap::new();
    for item in &items {
        let Some(ruled_at) = item.ruled_at else { continue };
        let Some(request) = request_index.get(&item.request) else {
            continue;
        };
        let days = (ruled_at - request.opened_at).num_days();
        ruling_days.push(days);
        delay_by_course.entry(item.course).or_default().push(days);
    }
    let avg_ruling_days = mean(&ruling_days);

    let mut top_delays: Vec<CourseDelay> = delay_by_course
        .into_iter()
        .map(|(course, days)| CourseDelay {
            course: course_name(course),
            days: mean(&days),
        })
        .collect();
    top_delays.sort_by(|a, b| b.days.cmp(&a.days).then(a.course.cmp(&b.course)));
    top_delays.truncate(5);

    EquivalenceStatistics {
        year: selected_year,
        total_requests: requests.len(),
        total_items: items.len(),
        monthly,
        ruling_distribution,
        top_requested,
        problem_courses,
        avg_resolution_days,
        avg_ruling_days,
        top_delays,
    }
}

/// Twelve calendar buckets. A selected year counts raw openings/completions;
/// the historical view averages each calendar month across the distinct years
/// present.
fn monthly_series(
    requests: &[&EquivalenceRequest],
    selected_year: Option<i32>,
) -> Vec<MonthlyActivity> {
    let mut opened = [0usize; 12];
    let mut completed = [0usize; 12];

    for request in requests {
        opened[request.opened_at.month0() as usize] += 1;
        if request.status == RequestStatus::Completed {
            if let Some(at) = request.completed_at {
                completed[at.month0() as usize] += 1;
            }
        }
    }

    let divisor = match selected_year {
        Some(_) => 1.0,
        None => {
            let years: BTreeSet<i32> = requests
                .iter()
                .map(|request| request.opened_at.year())
                .collect();
            years.len().max(1) as f64
        }
    };

    (0..12)
        .map(|index| MonthlyActivity {
            month: index as u32 + 1,
            label: match selected_year {
                Some(year) => format!("{} {}", MONTH_NAMES[index], year),
                None => MONTH_NAMES[index].to_string(),
            },
            opened: opened[index] as f64 / divisor,
            completed: completed[index] as f64 / divisor,
        })
        .collect()
}

fn mean(values: &[i64]) -> i64 {
    if values.is_empty() {
        return 0;
    }
    values.iter().sum::<i64>() / values.len() as i64
}
