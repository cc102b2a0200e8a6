//! HTTP request handlers for the attendance API.
//!
//! This module contains the handler functions for all API endpoints. Every
//! handler tags its log lines with a fresh correlation ID.

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculation::format_work_time;
use crate::error::EngineError;
use crate::services::{ManualRecord, OfficeUpdate, SalarySummary};

use super::request::{
    AdjustmentRequest, AllAttendanceQuery, CalculateSalaryRequest, CheckInRequest,
    CheckOutRequest, CreateOfficeRequest, DateRangeQuery, ManualCheckOutRequest,
    ManualRecordRequest, MonthRef, RateChangeRequest, SalaryHistoryQuery, UpdateMonthRequest,
    UpdateOfficeRequest,
};
use super::response::{
    ApiError, ApiErrorResponse, AttendanceHistoryResponse, AttendanceListResponse,
    CheckInResponse, CheckOutResponse, FailedJobListResponse, ManualRecordResponse,
    OfficeDeletedResponse, OfficeListResponse, PayrollUser, PayrollUserListResponse,
    RateChangeResponse, ReplayResponse, SalaryCalculationResponse, SalaryHistoryResponse,
    SalaryMessageResponse,
};
use super::state::AppState;

/// Success or an already rendered error response.
type HandlerResult = Result<Response, Response>;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/attendance/checkin", post(check_in_handler))
        .route("/attendance/checkout", post(check_out_handler))
        .route("/attendance/manual-checkout", post(manual_check_out_handler))
        .route("/attendance/manual-record", post(manual_record_handler))
        .route("/attendance/all", get(all_attendance_handler))
        .route("/attendance/:user_id", get(attendance_history_handler))
        .route("/offices", get(list_offices_handler).post(create_office_handler))
        .route(
            "/offices/:office_id",
            get(get_office_handler)
                .put(update_office_handler)
                .delete(delete_office_handler),
        )
        .route("/salary/calculate", post(calculate_salary_handler))
        .route("/salary/rate/:user_id", put(rate_change_handler))
        .route("/salary/update-month", put(update_month_handler))
        .route("/salary/recalculate-month", post(recalculate_month_handler))
        .route("/salary/user/:user_id", get(salary_history_handler))
        .route("/salary/monthly", get(monthly_salaries_handler))
        .route("/salary/users", get(payroll_users_handler))
        .route("/salary/adjustments", post(adjustment_handler))
        .route("/salary/recompute/failed", get(failed_recomputes_handler))
        .route("/salary/recompute/replay", post(replay_recomputes_handler))
        .with_state(state)
}

/// Handler for POST /attendance/checkin.
async fn check_in_handler(
    State(state): State<AppState>,
    payload: Result<Json<CheckInRequest>, JsonRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing check-in request");
    let request = parse_body(correlation_id, payload)?;

    let attendance = state
        .attendance()
        .check_in(request.into())
        .await
        .map_err(|err| engine_error(correlation_id, err))?;

    Ok(json_response(
        StatusCode::CREATED,
        CheckInResponse {
            message: "Check-in successful".to_string(),
            attendance,
            is_valid: true,
        },
    ))
}

/// Handler for POST /attendance/checkout.
async fn check_out_handler(
    State(state): State<AppState>,
    payload: Result<Json<CheckOutRequest>, JsonRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing check-out request");
    let request = parse_body(correlation_id, payload)?;

    let outcome = state
        .attendance()
        .check_out(request.into())
        .await
        .map_err(|err| engine_error(correlation_id, err))?;

    Ok(json_response(
        StatusCode::OK,
        CheckOutResponse {
            message: "Check-out successful".to_string(),
            is_valid: true,
            outcome,
        },
    ))
}

/// Handler for POST /attendance/manual-checkout.
async fn manual_check_out_handler(
    State(state): State<AppState>,
    payload: Result<Json<ManualCheckOutRequest>, JsonRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing manual check-out request");
    let request = parse_body(correlation_id, payload)?;

    let outcome = state
        .attendance()
        .manual_check_out(request.into())
        .await
        .map_err(|err| engine_error(correlation_id, err))?;

    Ok(json_response(
        StatusCode::OK,
        CheckOutResponse {
            message: "Manual check-out recorded".to_string(),
            is_valid: true,
            outcome,
        },
    ))
}

/// Handler for POST /attendance/manual-record.
async fn manual_record_handler(
    State(state): State<AppState>,
    payload: Result<Json<ManualRecordRequest>, JsonRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing manual record request");
    let request = parse_body(correlation_id, payload)?;
    let record =
        ManualRecord::try_from(request).map_err(|err| engine_error(correlation_id, err))?;

    let attendance = state
        .attendance()
        .manual_record(record)
        .await
        .map_err(|err| engine_error(correlation_id, err))?;

    Ok(json_response(
        StatusCode::CREATED,
        ManualRecordResponse {
            message: "Manual attendance record created".to_string(),
            work_time_formatted: attendance.work_duration.map(format_work_time),
            attendance,
        },
    ))
}

/// Handler for GET /attendance/all.
async fn all_attendance_handler(
    State(state): State<AppState>,
    query: Result<Query<AllAttendanceQuery>, QueryRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let Query(query) = parse_query(correlation_id, query)?;
    info!(
        correlation_id = %correlation_id,
        user_id = ?query.user_id,
        "Listing attendance"
    );

    let attendance = state
        .attendance()
        .all_attendance(query.user_id.as_deref(), query.start_date, query.end_date)
        .await
        .map_err(|err| engine_error(correlation_id, err))?;

    Ok(json_response(
        StatusCode::OK,
        AttendanceListResponse {
            count: attendance.len(),
            attendance,
        },
    ))
}

/// Handler for GET /attendance/:userId.
async fn attendance_history_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    query: Result<Query<DateRangeQuery>, QueryRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let Query(query) = parse_query(correlation_id, query)?;
    info!(correlation_id = %correlation_id, user_id = %user_id, "Fetching attendance history");

    let attendance = state
        .attendance()
        .history(&user_id, query.start_date, query.end_date)
        .await
        .map_err(|err| engine_error(correlation_id, err))?;

    Ok(json_response(
        StatusCode::OK,
        AttendanceHistoryResponse {
            user_id,
            count: attendance.len(),
            attendance,
        },
    ))
}

/// Handler for GET /offices.
async fn list_offices_handler(State(state): State<AppState>) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Listing offices");

    let offices = state
        .offices()
        .list_offices()
        .await
        .map_err(|err| engine_error(correlation_id, err))?;

    Ok(json_response(
        StatusCode::OK,
        OfficeListResponse {
            count: offices.len(),
            offices,
        },
    ))
}

/// Handler for GET /offices/:officeId.
async fn get_office_handler(
    State(state): State<AppState>,
    Path(office_id): Path<String>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, office_id = %office_id, "Fetching office");

    let office = state
        .offices()
        .get_office(&office_id)
        .await
        .map_err(|err| engine_error(correlation_id, err))?;

    Ok(json_response(StatusCode::OK, office))
}

/// Handler for POST /offices.
async fn create_office_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateOfficeRequest>, JsonRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing office creation");
    let request = parse_body(correlation_id, payload)?;

    let office = state
        .offices()
        .create_office(request.into())
        .await
        .map_err(|err| engine_error(correlation_id, err))?;

    Ok(json_response(StatusCode::CREATED, office))
}

/// Handler for PUT /offices/:officeId.
async fn update_office_handler(
    State(state): State<AppState>,
    Path(office_id): Path<String>,
    payload: Result<Json<UpdateOfficeRequest>, JsonRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, office_id = %office_id, "Processing office update");
    let request = parse_body(correlation_id, payload)?;
    let update =
        OfficeUpdate::try_from(request).map_err(|err| engine_error(correlation_id, err))?;

    let office = state
        .offices()
        .update_office(&office_id, update)
        .await
        .map_err(|err| engine_error(correlation_id, err))?;

    Ok(json_response(StatusCode::OK, office))
}

/// Handler for DELETE /offices/:officeId.
async fn delete_office_handler(
    State(state): State<AppState>,
    Path(office_id): Path<String>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, office_id = %office_id, "Processing office deletion");

    state
        .offices()
        .delete_office(&office_id)
        .await
        .map_err(|err| engine_error(correlation_id, err))?;

    Ok(json_response(
        StatusCode::OK,
        OfficeDeletedResponse {
            message: "Office deleted".to_string(),
            office_id,
        },
    ))
}

/// Handler for POST /salary/calculate.
///
/// Computes the month at the user's current hourly rate.
async fn calculate_salary_handler(
    State(state): State<AppState>,
    payload: Result<Json<CalculateSalaryRequest>, JsonRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing salary calculation");
    let request = parse_body(correlation_id, payload)?;

    let (user, salary) = state
        .salaries()
        .calculate_for_user(&request.user_id, request.month, request.year)
        .await
        .map_err(|err| engine_error(correlation_id, err))?;

    info!(
        correlation_id = %correlation_id,
        user_id = %user.id,
        month = salary.month,
        year = salary.year,
        total_salary = %salary.total_salary,
        "Salary calculated"
    );
    Ok(json_response(
        StatusCode::OK,
        SalaryCalculationResponse {
            summary: SalarySummary::from(&salary),
            user: user.into(),
            salary,
        },
    ))
}

/// Handler for PUT /salary/rate/:userId.
async fn rate_change_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<RateChangeRequest>, JsonRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, user_id = %user_id, "Processing rate change");
    let request = parse_body(correlation_id, payload)?;
    let recompute_from = request
        .recompute_from
        .map(|MonthRef { month, year }| (month, year));

    let outcome = state
        .rates()
        .on_rate_changed(&user_id, request.hourly_rate, recompute_from)
        .await
        .map_err(|err| engine_error(correlation_id, err))?;

    Ok(json_response(StatusCode::OK, RateChangeResponse::from(outcome)))
}

/// Handler for PUT /salary/update-month.
async fn update_month_handler(
    State(state): State<AppState>,
    payload: Result<Json<UpdateMonthRequest>, JsonRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing single-month salary update");
    let request = parse_body(correlation_id, payload)?;

    let salary = state
        .salaries()
        .update_salary_for_specific_month(
            &request.user_id,
            request.month,
            request.year,
            request.hourly_rate,
        )
        .await
        .map_err(|err| engine_error(correlation_id, err))?;

    Ok(json_response(
        StatusCode::OK,
        SalaryMessageResponse {
            message: format!("Salary for {}/{} updated", salary.month, salary.year),
            salary,
        },
    ))
}

/// Handler for POST /salary/recalculate-month.
async fn recalculate_month_handler(
    State(state): State<AppState>,
    payload: Result<Json<MonthRef>, JsonRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing bulk salary recompute");
    let MonthRef { month, year } = parse_body(correlation_id, payload)?;

    let report = state
        .rates()
        .recalculate_all_salaries_for_month(month, year)
        .await
        .map_err(|err| engine_error(correlation_id, err))?;

    Ok(json_response(StatusCode::OK, report))
}

/// Handler for GET /salary/recompute/failed.
async fn failed_recomputes_handler(State(state): State<AppState>) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Listing failed payroll recomputes");

    let jobs = state.recompute_queue().failed_jobs();
    Ok(json_response(
        StatusCode::OK,
        FailedJobListResponse {
            count: jobs.len(),
            jobs,
        },
    ))
}

/// Handler for POST /salary/recompute/replay.
async fn replay_recomputes_handler(State(state): State<AppState>) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Replaying failed payroll recomputes");

    let replayed = state.recompute_queue().replay_failed();
    Ok(json_response(
        StatusCode::OK,
        ReplayResponse {
            message: format!("{} failed recompute job(s) resubmitted", replayed),
            replayed,
        },
    ))
}

/// Handler for GET /salary/user/:userId.
async fn salary_history_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    query: Result<Query<SalaryHistoryQuery>, QueryRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let Query(query) = parse_query(correlation_id, query)?;
    info!(correlation_id = %correlation_id, user_id = %user_id, "Fetching salary history");

    let salary_history = state
        .salaries()
        .salary_history(&user_id, query.year)
        .await
        .map_err(|err| engine_error(correlation_id, err))?;

    Ok(json_response(
        StatusCode::OK,
        SalaryHistoryResponse {
            count: salary_history.len(),
            salary_history,
        },
    ))
}

/// Handler for GET /salary/monthly.
async fn monthly_salaries_handler(
    State(state): State<AppState>,
    query: Result<Query<MonthRef>, QueryRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let Query(MonthRef { month, year }) = parse_query(correlation_id, query)?;
    info!(correlation_id = %correlation_id, month, year, "Fetching monthly salaries");

    let report = state
        .salaries()
        .monthly_salaries(month, year)
        .await
        .map_err(|err| engine_error(correlation_id, err))?;

    Ok(json_response(StatusCode::OK, report))
}

/// Handler for GET /salary/users.
async fn payroll_users_handler(State(state): State<AppState>) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Listing payroll users");

    let users: Vec<PayrollUser> = state
        .salaries()
        .payroll_users()
        .await
        .map_err(|err| engine_error(correlation_id, err))?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(json_response(
        StatusCode::OK,
        PayrollUserListResponse {
            count: users.len(),
            users,
        },
    ))
}

/// Handler for POST /salary/adjustments.
async fn adjustment_handler(
    State(state): State<AppState>,
    payload: Result<Json<AdjustmentRequest>, JsonRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing salary adjustment");
    let request = parse_body(correlation_id, payload)?;

    let salary = state
        .salaries()
        .add_adjustment(
            &request.user_id,
            request.month,
            request.year,
            request.kind,
            request.amount,
            &request.reason,
        )
        .await
        .map_err(|err| engine_error(correlation_id, err))?;

    Ok(json_response(
        StatusCode::OK,
        SalaryMessageResponse {
            message: "Salary adjustment recorded".to_string(),
            salary,
        },
    ))
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        Json(body),
    )
        .into_response()
}

/// Logs a service error and renders it.
fn engine_error(correlation_id: Uuid, err: EngineError) -> Response {
    match &err {
        EngineError::GeofenceViolation { .. } => {
            info!(correlation_id = %correlation_id, error = %err, "Request rejected by geofence");
        }
        EngineError::Persistence { .. } => {}
        _ => {
            warn!(correlation_id = %correlation_id, error = %err, "Request failed");
        }
    }
    ApiErrorResponse::from(err).into_response()
}

/// Unwraps a JSON body or renders the rejection as a 400.
fn parse_body<T>(
    correlation_id: Uuid,
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, Response> {
    let rejection = match payload {
        Ok(Json(request)) => return Ok(request),
        Err(rejection) => rejection,
    };

    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            // Get the body text which contains the detailed error from serde
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            if body_text.contains("missing field") {
                ApiError::validation_error(body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    Err(ApiErrorResponse::bad_request(error).into_response())
}

/// Unwraps a query string or renders the rejection as a 400.
fn parse_query<T>(
    correlation_id: Uuid,
    query: Result<Query<T>, QueryRejection>,
) -> Result<Query<T>, Response> {
    query.map_err(|rejection| {
        let body_text = rejection.body_text();
        warn!(
            correlation_id = %correlation_id,
            error = %body_text,
            "Query string error"
        );
        ApiErrorResponse::bad_request(ApiError::validation_error(body_text)).into_response()
    })
}
