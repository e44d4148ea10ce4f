//! Coordinator HTTP surface. Route wiring and handler bodies follow the
//! teacher's `hosting/server.rs` shape (`web::Data<T>` state, handlers
//! returning `impl Responder`), generalized from Casino's single websocket
//! table to the curriculum's reserve/register/status surface.

use super::ApiConfig;
use super::dto::{
    CurriculumSummaryResponse, OkResponse, StudyQuery, StudyRegisteredResponse, StudyRegistration,
    StudyResponse, TrialRegisterParam, TrialReserveParam, TrialReserveResponse,
};
use crate::curriculum::Curriculum;
use crate::space::aligned::AlignedSpace;
use crate::strategy::StudyStrategy;
use crate::study::{Study, StudyStatus};
use crate::suggest::SequentialSuggest;
use crate::trial::Trial;
use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

pub async fn ping() -> impl Responder {
    HttpResponse::Ok().json(OkResponse { ok: true })
}

pub async fn status(curriculum: web::Data<Curriculum>) -> impl Responder {
    let summaries = curriculum.to_summaries().await;
    HttpResponse::Ok().json(CurriculumSummaryResponse { summaries })
}

pub async fn register_study(
    curriculum: web::Data<Curriculum>,
    config: web::Data<ApiConfig>,
    body: web::Json<StudyRegistration>,
) -> impl Responder {
    let body = body.into_inner();

    let study_strategy = match StudyStrategy::from_model(&body.study_strategy) {
        Ok(s) => s,
        Err(e) => return HttpResponse::BadRequest().body(e.to_string()),
    };
    let suggest_strategy = match SequentialSuggest::from_model(&body.suggest_strategy) {
        Ok(s) => s,
        Err(e) => return HttpResponse::BadRequest().body(e.to_string()),
    };
    let parameter_space = match AlignedSpace::from_model(&body.parameter_space) {
        Ok(s) => s,
        Err(e) => return HttpResponse::BadRequest().body(e.to_string()),
    };

    let study_id = uuid::Uuid::new_v4().to_string();
    let study = Arc::new(Study::new(
        study_id.clone(),
        body.name,
        body.required_capacity,
        Utc::now(),
        study_strategy,
        suggest_strategy,
        parameter_space,
        body.result_type,
        body.result_value_type,
        crate::trial_table::TrialTable::new(config.default_timeout_minutes),
    ));
    curriculum.insert_study(study).await;
    log::info!("registered study {study_id}");
    HttpResponse::Ok().json(StudyRegisteredResponse { study_id })
}

pub async fn reserve_trial(
    curriculum: web::Data<Curriculum>,
    body: web::Json<TrialReserveParam>,
) -> impl Responder {
    let body = body.into_inner();
    let capability_set: HashSet<String> = body.retaining_capacity.into_iter().collect();
    let Some(study) = curriculum.get_available_study(&capability_set).await else {
        return HttpResponse::Accepted().json(TrialReserveResponse { trial: None });
    };
    let trial = match study.suggest_next_trial(body.max_size).await {
        Ok(t) => t,
        Err(e) => return HttpResponse::build(status_from(e.status_code())).body(e.to_string()),
    };
    let Some(trial) = trial else {
        return HttpResponse::Accepted().json(TrialReserveResponse { trial: None });
    };
    match trial.to_model() {
        Ok(model) => HttpResponse::Ok().json(TrialReserveResponse { trial: Some(model) }),
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

pub async fn register_trial(
    curriculum: web::Data<Curriculum>,
    body: web::Json<TrialRegisterParam>,
) -> impl Responder {
    let model = body.into_inner().trial;
    let trial: Trial = match Trial::from_model(model) {
        Ok(t) => t,
        Err(e) => return HttpResponse::BadRequest().body(e.to_string()),
    };
    let study = match curriculum.register_trial_owner(&trial.study_id).await {
        Ok(s) => s,
        Err(e) => return HttpResponse::NotFound().body(e.to_string()),
    };
    match study.receipt_trial(&trial.trial_id, trial.result).await {
        Ok(()) => {
            study.update_status().await;
            HttpResponse::Ok().json(OkResponse { ok: true })
        }
        Err(e) => HttpResponse::NotFound().body(e.to_string()),
    }
}

pub async fn fetch_study(
    curriculum: web::Data<Curriculum>,
    query: web::Query<StudyQuery>,
) -> impl Responder {
    let query = query.into_inner();
    if query.study_id.is_some() == query.name.is_some() {
        return HttpResponse::BadRequest().body("exactly one of study_id or name must be set");
    }
    let study_id = query.study_id.as_deref();
    let name = query.name.as_deref();

    if let Some(storage) = curriculum.pop_storage(study_id, name).await {
        let model = match storage.to_model() {
            Ok(m) => m,
            Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
        };
        return HttpResponse::Ok().json(StudyResponse {
            status: StudyStatus::Done,
            result: Some(model),
        });
    }
    match curriculum.get_study_status(study_id, name).await {
        // migrate_done may have moved it to storage between the two locks above; the next poll's pop_storage picks it up.
        Some(StudyStatus::Done) => HttpResponse::Accepted().json(StudyResponse { status: StudyStatus::Running, result: None }),
        Some(status) => HttpResponse::Accepted().json(StudyResponse { status, result: None }),
        None => HttpResponse::NotFound().body("study not found"),
    }
}

fn status_from(code: u16) -> actix_web::http::StatusCode {
    actix_web::http::StatusCode::from_u16(code).unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR)
}
