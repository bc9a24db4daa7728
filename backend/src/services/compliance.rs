//! Certificate expiry and Code 95 compliance.
//!
//! Drivers need [`CODE95_REQUIRED_POINTS`] points of continuing education per
//! five-year cycle. A cycle ends when the employee's Code 95 license expires.
//! Without such a license the cycle is anchored on the first completed Code 95
//! training (or the hire date) and rolls forward in five-year steps.

use std::collections::{BTreeMap, HashMap};

use chrono::{Months, NaiveDate};
use log::warn;
use serde::Serialize;

use crate::api::*;
use crate::db::repository::{FullRepository, RepositoryResult};
use crate::define_text_enum;
use crate::services::i18n::{Language, Localized};

pub const CODE95_REQUIRED_POINTS: u32 = 35;
pub const CODE95_CYCLE_MONTHS: u32 = 60;
/// A short cycle ending within this many months is at risk.
pub const CODE95_RISK_MONTHS: u32 = 12;

define_text_enum!(
    /// Code 95 standing of one employee.
    Code95Status {
        Compliant => "compliant",
        InProgress => "in_progress",
        AtRisk => "at_risk",
        NonCompliant => "non_compliant",
        NotApplicable => "not_applicable",
    }
);

impl Code95Status {
    pub fn needs_attention(&self) -> bool {
        matches!(self, Code95Status::AtRisk | Code95Status::NonCompliant)
    }
}

/// Expiry status of one license on a given day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LicenseStatus {
    pub license: EmployeeLicense,
    pub certificate_name: String,
    pub is_code95: bool,
    pub status: ExpiryStatus,
    pub status_label: &'static str,
    pub days_remaining: Option<i64>,
}

pub fn license_status(
    license: &EmployeeLicense,
    certificate: &CertificateDefinition,
    today: NaiveDate,
    lang: Language,
) -> LicenseStatus {
    let status = license.status_on(today, certificate.reminder_days);
    LicenseStatus {
        license: license.clone(),
        certificate_name: certificate.name.clone(),
        is_code95: certificate.is_code95,
        status,
        status_label: status.label(lang),
        days_remaining: license.days_remaining(today),
    }
}

/// Points earned by completing one training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Code95Credit {
    pub training_id: TrainingId,
    /// Last session date of the training.
    pub date: NaiveDate,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Code95Progress {
    pub employee_id: EmployeeId,
    pub status: Code95Status,
    pub status_label: &'static str,
    pub points: u32,
    pub required_points: u32,
    pub cycle_start: Option<NaiveDate>,
    pub cycle_end: Option<NaiveDate>,
    pub days_remaining: Option<i64>,
    pub credits: Vec<Code95Credit>,
}

fn add_cycle(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(CODE95_CYCLE_MONTHS))
}

/// Cycle `[start, end]` that applies on `today`.
fn current_cycle(
    employee: &Employee,
    code95_expiry: Option<NaiveDate>,
    credits: &[Code95Credit],
    today: NaiveDate,
) -> Option<(NaiveDate, NaiveDate)> {
    if let Some(end) = code95_expiry {
        let start = end.checked_sub_months(Months::new(CODE95_CYCLE_MONTHS))?;
        return Some((start, end));
    }

    let anchor = credits
        .iter()
        .filter(|c| c.points > 0)
        .map(|c| c.date)
        .min()
        .or(employee.hire_date)
        .unwrap_or(today);
    let mut start = anchor;
    let mut end = add_cycle(start)?;
    while end < today {
        start = end;
        end = add_cycle(start)?;
    }
    Some((start, end))
}

/// Code 95 standing of `employee` on `today`.
///
/// `code95_expiry` is the latest expiry among the employee's Code 95
/// licenses; `credits` are their completed trainings.
pub fn code95_progress(
    employee: &Employee,
    code95_expiry: Option<NaiveDate>,
    credits: &[Code95Credit],
    today: NaiveDate,
    lang: Language,
) -> Code95Progress {
    let mut progress = Code95Progress {
        employee_id: employee.id,
        status: Code95Status::NotApplicable,
        status_label: Code95Status::NotApplicable.label(lang),
        points: 0,
        required_points: CODE95_REQUIRED_POINTS,
        cycle_start: None,
        cycle_end: None,
        days_remaining: None,
        credits: Vec::new(),
    };
    if !employee.is_driver {
        return progress;
    }

    let Some((start, end)) = current_cycle(employee, code95_expiry, credits, today) else {
        return progress;
    };
    let counted: Vec<Code95Credit> = credits
        .iter()
        .filter(|c| c.points > 0 && c.date >= start && c.date <= end)
        .copied()
        .collect();
    let points = counted.iter().map(|c| c.points).sum();
    let risk_horizon = today
        .checked_add_months(Months::new(CODE95_RISK_MONTHS))
        .unwrap_or(today);

    let status = if points >= CODE95_REQUIRED_POINTS {
        Code95Status::Compliant
    } else if end < today {
        Code95Status::NonCompliant
    } else if end <= risk_horizon {
        Code95Status::AtRisk
    } else {
        Code95Status::InProgress
    };

    progress.status = status;
    progress.status_label = status.label(lang);
    progress.points = points;
    progress.cycle_start = Some(start);
    progress.cycle_end = Some(end);
    progress.days_remaining = Some((end - today).num_days());
    progress.credits = counted;
    progress
}

/// Compliance of one employee, as listed in the overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeCompliance {
    pub employee_id: EmployeeId,
    pub employee_number: String,
    pub name: String,
    pub department: Option<String>,
    pub licenses: Vec<LicenseStatus>,
    pub code95: Code95Progress,
    pub needs_attention: bool,
}

/// Shared lookups for a compliance run.
struct Catalog {
    certificates: BTreeMap<CertificateId, CertificateDefinition>,
    trainings: HashMap<TrainingId, Training>,
}

impl Catalog {
    async fn load<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<Self> {
        let certificates = repo
            .list_certificates()
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
        let trainings = repo
            .list_trainings()
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();
        Ok(Self {
            certificates,
            trainings,
        })
    }

    fn credits(&self, participations: &[TrainingParticipant]) -> Vec<Code95Credit> {
        participations
            .iter()
            .filter(|p| p.status == ParticipantStatus::Completed)
            .filter_map(|p| {
                let training = self.trainings.get(&p.training_id)?;
                Some(Code95Credit {
                    training_id: training.id,
                    date: training.last_date()?,
                    points: p.code95_points_awarded,
                })
            })
            .collect()
    }

    fn evaluate(
        &self,
        employee: &Employee,
        licenses: &[EmployeeLicense],
        participations: &[TrainingParticipant],
        today: NaiveDate,
        lang: Language,
    ) -> EmployeeCompliance {
        let mut statuses = Vec::with_capacity(licenses.len());
        let mut code95_expiry = None;
        for license in licenses {
            let Some(certificate) = self.certificates.get(&license.certificate_id) else {
                warn!(
                    "License {} references unknown certificate {}",
                    license.id, license.certificate_id
                );
                continue;
            };
            if certificate.is_code95 {
                code95_expiry = code95_expiry.max(license.expires_on);
            }
            statuses.push(license_status(license, certificate, today, lang));
        }

        let credits = self.credits(participations);
        let code95 = code95_progress(employee, code95_expiry, &credits, today, lang);
        let needs_attention =
            code95.status.needs_attention() || statuses.iter().any(|s| s.status.needs_attention());

        EmployeeCompliance {
            employee_id: employee.id,
            employee_number: employee.employee_number.clone(),
            name: employee.full_name(),
            department: employee.department.clone(),
            licenses: statuses,
            code95,
            needs_attention,
        }
    }
}

/// Compliance of a single employee.
pub async fn employee_compliance<R: FullRepository + ?Sized>(
    repo: &R,
    employee_id: EmployeeId,
    today: NaiveDate,
    lang: Language,
) -> RepositoryResult<EmployeeCompliance> {
    let employee = repo.get_employee(employee_id).await?;
    let catalog = Catalog::load(repo).await?;
    let licenses = repo.list_licenses_for_employee(employee_id).await?;
    let participations = repo.list_participations(employee_id).await?;
    Ok(catalog.evaluate(&employee, &licenses, &participations, today, lang))
}

/// Every active employee's compliance, optionally restricted to those who
/// need attention.
pub async fn compliance_overview<R: FullRepository + ?Sized>(
    repo: &R,
    today: NaiveDate,
    lang: Language,
    attention_only: bool,
) -> RepositoryResult<Vec<EmployeeCompliance>> {
    let catalog = Catalog::load(repo).await?;
    let mut licenses_by_employee: HashMap<EmployeeId, Vec<EmployeeLicense>> = HashMap::new();
    for license in repo.list_licenses().await? {
        licenses_by_employee
            .entry(license.employee_id)
            .or_default()
            .push(license);
    }

    let mut overview = Vec::new();
    for employee in repo.list_employees().await? {
        if !employee.active {
            continue;
        }
        let participations = repo.list_participations(employee.id).await?;
        let licenses = licenses_by_employee
            .get(&employee.id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let entry = catalog.evaluate(&employee, licenses, &participations, today, lang);
        if !attention_only || entry.needs_attention {
            overview.push(entry);
        }
    }
    log::debug!(
        "Compliance overview: {} employees (attention_only={})",
        overview.len(),
        attention_only
    );
    Ok(overview)
}
