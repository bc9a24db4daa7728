//! List filters and sort orders for employees and trainings.
//!
//! The filter structs deserialize straight from query strings; list values
//! such as `status=planned,confirmed` are comma separated.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use crate::api::{CourseId, Employee, ProviderId, Training, TrainingStatus};
use crate::define_text_enum;

define_text_enum!(
    SortDirection {
        Asc => "asc",
        Desc => "desc",
    }
);

impl Default for SortDirection {
    fn default() -> Self {
        SortDirection::Asc
    }
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

define_text_enum!(
    EmployeeSort {
        LastName => "last_name",
        FirstName => "first_name",
        EmployeeNumber => "employee_number",
        HireDate => "hire_date",
    }
);

impl Default for EmployeeSort {
    fn default() -> Self {
        EmployeeSort::LastName
    }
}

define_text_enum!(
    TrainingSort {
        FirstDate => "first_date",
        Title => "title",
    }
);

impl Default for TrainingSort {
    fn default() -> Self {
        TrainingSort::FirstDate
    }
}

pub(crate) fn comma_separated<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr<Err = String>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().map_err(serde::de::Error::custom))
        .collect()
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn normalized_search(search: &Option<String>) -> Option<String> {
    search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EmployeeFilter {
    /// Case-insensitive match on name, employee number or email.
    pub search: Option<String>,
    pub department: Option<String>,
    pub active: Option<bool>,
    pub is_driver: Option<bool>,
    pub sort: EmployeeSort,
    pub direction: SortDirection,
}

impl EmployeeFilter {
    pub fn matches(&self, employee: &Employee) -> bool {
        if let Some(active) = self.active {
            if employee.active != active {
                return false;
            }
        }
        if let Some(is_driver) = self.is_driver {
            if employee.is_driver != is_driver {
                return false;
            }
        }
        if let Some(department) = self.department.as_deref().map(str::trim) {
            let same = employee
                .department
                .as_deref()
                .map_or(false, |d| d.eq_ignore_ascii_case(department));
            if !department.is_empty() && !same {
                return false;
            }
        }
        match normalized_search(&self.search) {
            None => true,
            Some(needle) => {
                contains_ci(&employee.full_name(), &needle)
                    || contains_ci(&employee.employee_number, &needle)
                    || employee
                        .email
                        .as_deref()
                        .map_or(false, |e| contains_ci(e, &needle))
            }
        }
    }

    fn compare(&self, a: &Employee, b: &Employee) -> Ordering {
        let by_name = |a: &Employee, b: &Employee| {
            a.last_name
                .to_lowercase()
                .cmp(&b.last_name.to_lowercase())
                .then_with(|| a.first_name.to_lowercase().cmp(&b.first_name.to_lowercase()))
        };
        let ordering = match self.sort {
            EmployeeSort::LastName => by_name(a, b),
            EmployeeSort::FirstName => a
                .first_name
                .to_lowercase()
                .cmp(&b.first_name.to_lowercase())
                .then_with(|| by_name(a, b)),
            EmployeeSort::EmployeeNumber => a.employee_number.cmp(&b.employee_number),
            // Employees without a hire date sort last.
            EmployeeSort::HireDate => match (a.hire_date, b.hire_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        };
        self.direction.apply(ordering).then_with(|| a.id.cmp(&b.id))
    }

    pub fn apply(&self, employees: Vec<Employee>) -> Vec<Employee> {
        let mut filtered: Vec<Employee> =
            employees.into_iter().filter(|e| self.matches(e)).collect();
        filtered.sort_by(|a, b| self.compare(a, b));
        filtered
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrainingFilter {
    #[serde(deserialize_with = "comma_separated")]
    pub status: Vec<TrainingStatus>,
    pub course_id: Option<CourseId>,
    pub provider_id: Option<ProviderId>,
    /// Keep trainings with a session on or after this date.
    pub from: Option<NaiveDate>,
    /// Keep trainings with a session on or before this date.
    pub to: Option<NaiveDate>,
    /// Case-insensitive match on title, location or instructor.
    pub search: Option<String>,
    pub sort: TrainingSort,
    pub direction: SortDirection,
}

impl TrainingFilter {
    /// `course_titles` supplies the title of trainings without an override.
    pub fn matches(&self, training: &Training, course_titles: &HashMap<CourseId, String>) -> bool {
        if !self.status.is_empty() && !self.status.contains(&training.status) {
            return false;
        }
        if self.course_id.map_or(false, |id| id != training.course_id) {
            return false;
        }
        if self.provider_id.is_some() && self.provider_id != training.provider_id {
            return false;
        }
        if (self.from.is_some() || self.to.is_some()) && !training.overlaps(self.from, self.to) {
            return false;
        }
        match normalized_search(&self.search) {
            None => true,
            Some(needle) => [
                Some(title_of(training, course_titles)),
                training.location.as_deref(),
                training.instructor.as_deref(),
            ]
            .into_iter()
            .flatten()
            .any(|field| contains_ci(field, &needle)),
        }
    }

    pub fn apply(
        &self,
        trainings: Vec<Training>,
        course_titles: &HashMap<CourseId, String>,
    ) -> Vec<Training> {
        let mut filtered: Vec<Training> = trainings
            .into_iter()
            .filter(|t| self.matches(t, course_titles))
            .collect();
        filtered.sort_by(|a, b| {
            let ordering = match self.sort {
                TrainingSort::FirstDate => a.first_date().cmp(&b.first_date()),
                TrainingSort::Title => title_of(a, course_titles)
                    .to_lowercase()
                    .cmp(&title_of(b, course_titles).to_lowercase()),
            };
            self.direction.apply(ordering).then_with(|| a.id.cmp(&b.id))
        });
        filtered
    }
}

/// Display title: the training's override, else its course title.
pub fn title_of<'a>(training: &'a Training, course_titles: &'a HashMap<CourseId, String>) -> &'a str {
    training
        .title
        .as_deref()
        .or_else(|| course_titles.get(&training.course_id).map(String::as_str))
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{EmployeeDraft, EmployeeId, TrainingDraft, TrainingId, TrainingSession};
    use chrono::{NaiveTime, Utc};

    fn employee(id: i64, number: &str, first: &str, last: &str) -> Employee {
        Employee::from_draft(EmployeeId(id), &EmployeeDraft::new(number, first, last), Utc::now())
    }

    fn training(id: i64, course: i64, day: u32, status: TrainingStatus) -> Training {
        let session = TrainingSession::new(
            NaiveDate::from_ymd_opt(2026, 4, day).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        );
        let mut draft = TrainingDraft::new(CourseId(course), vec![session]);
        draft.status = status;
        Training::from_draft(TrainingId(id), &draft, Utc::now())
    }

    #[test]
    fn test_employee_search_is_case_insensitive() {
        let employees = vec![
            employee(1, "E-100", "Anna", "Bakker"),
            employee(2, "E-200", "Bram", "Jansen"),
        ];
        let filter = EmployeeFilter {
            search: Some("BAK".into()),
            ..Default::default()
        };
        let result = filter.apply(employees.clone());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, EmployeeId(1));

        let by_number = EmployeeFilter {
            search: Some("e-2".into()),
            ..Default::default()
        };
        assert_eq!(by_number.apply(employees)[0].id, EmployeeId(2));
    }

    #[test]
    fn test_employee_sort_desc() {
        let employees = vec![
            employee(1, "3", "Anna", "Bakker"),
            employee(2, "1", "Bram", "Visser"),
            employee(3, "2", "Cor", "de Boer"),
        ];
        let filter = EmployeeFilter {
            sort: EmployeeSort::EmployeeNumber,
            direction: SortDirection::Desc,
            ..Default::default()
        };
        let ids: Vec<_> = filter.apply(employees).iter().map(|e| e.id.0).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn test_training_filter_by_status_and_window() {
        let trainings = vec![
            training(1, 1, 1, TrainingStatus::Planned),
            training(2, 1, 15, TrainingStatus::Confirmed),
            training(3, 2, 20, TrainingStatus::Cancelled),
        ];
        let filter = TrainingFilter {
            status: vec![TrainingStatus::Planned, TrainingStatus::Confirmed],
            from: NaiveDate::from_ymd_opt(2026, 4, 10),
            ..Default::default()
        };
        let result = filter.apply(trainings, &HashMap::new());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, TrainingId(2));
    }

    #[test]
    fn test_training_search_uses_course_title() {
        let titles = HashMap::from([(CourseId(1), "First aid".to_string())]);
        let filter = TrainingFilter {
            search: Some("aid".into()),
            ..Default::default()
        };
        let result = filter.apply(vec![training(1, 1, 3, TrainingStatus::Planned)], &titles);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_status_list_from_query_string() {
        let filter: TrainingFilter =
            serde_json::from_value(serde_json::json!({"status": "planned, completed"})).unwrap();
        assert_eq!(
            filter.status,
            vec![TrainingStatus::Planned, TrainingStatus::Completed]
        );
        let bad: Result<TrainingFilter, _> =
            serde_json::from_value(serde_json::json!({"status": "paused"}));
        assert!(bad.is_err());
    }
}
