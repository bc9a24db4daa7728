//! License expiry and Code 95 progress.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{today, HandlerResult};
use crate::api::{EmployeeId, Permission};
use crate::http::dto::{ComplianceQuery, ListResponse};
use crate::http::error::AppError;
use crate::http::extract::{CurrentUser, Lang};
use crate::http::state::AppState;
use crate::services::compliance::{self, Code95Progress, EmployeeCompliance};

/// Employees may follow their own compliance without `view_compliance`.
fn require_compliance_access(user: &CurrentUser, employee_id: EmployeeId) -> Result<(), AppError> {
    let own = user.context.employee_id == Some(employee_id)
        && user.context.has(Permission::ViewOwnRecords);
    if own {
        Ok(())
    } else {
        user.require(Permission::ViewCompliance)
    }
}

/// GET /v1/compliance/overview?attention_only=true&date=YYYY-MM-DD
///
/// License and Code 95 status of every active employee.
pub async fn overview(
    State(state): State<AppState>,
    user: CurrentUser,
    Lang(lang): Lang,
    Query(query): Query<ComplianceQuery>,
) -> HandlerResult<ListResponse<EmployeeCompliance>> {
    user.require(Permission::ViewCompliance)?;
    let date = query.date.unwrap_or_else(today);
    let rows = compliance::compliance_overview(
        state.repository.as_ref(),
        date,
        lang,
        query.attention_only,
    )
    .await?;
    Ok(Json(rows.into()))
}

/// GET /v1/employees/{id}/compliance
pub async fn employee_compliance(
    State(state): State<AppState>,
    user: CurrentUser,
    Lang(lang): Lang,
    Path(id): Path<EmployeeId>,
) -> HandlerResult<EmployeeCompliance> {
    require_compliance_access(&user, id)?;
    let row = compliance::employee_compliance(state.repository.as_ref(), id, today(), lang).await?;
    Ok(Json(row))
}

/// GET /v1/employees/{id}/code95
///
/// Points in the current five-year cycle and the credits behind them.
pub async fn employee_code95(
    State(state): State<AppState>,
    user: CurrentUser,
    Lang(lang): Lang,
    Path(id): Path<EmployeeId>,
) -> HandlerResult<Code95Progress> {
    require_compliance_access(&user, id)?;
    let row = compliance::employee_compliance(state.repository.as_ref(), id, today(), lang).await?;
    Ok(Json(row.code95))
}
