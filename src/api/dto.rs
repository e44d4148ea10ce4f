//! Wire DTOs for the coordinator HTTP surface. Field shapes mirror
//! `table_param.py`/`table_node_api/table_response.py`.

use crate::codec::ValueType;
use crate::curriculum::Summary;
use crate::space::aligned::AlignedSpaceModel;
use crate::strategy::StudyStrategyModel;
use crate::study::{StudyStorageModel, StudyStatus};
use crate::suggest::SuggestStrategyModel;
use crate::trial::{ResultType, TrialModel};
use serde::{Deserialize, Serialize};

/// `POST /study/register` body.
#[derive(Debug, Clone, Deserialize)]
pub struct StudyRegistration {
    pub name: Option<String>,
    #[serde(default)]
    pub required_capacity: Vec<String>,
    pub study_strategy: StudyStrategyModel,
    pub suggest_strategy: SuggestStrategyModel,
    pub parameter_space: AlignedSpaceModel,
    pub result_type: ResultType,
    pub result_value_type: ValueType,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudyRegisteredResponse {
    pub study_id: String,
}

/// `POST /trial/reserve` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialReserveParam {
    pub retaining_capacity: Vec<String>,
    pub max_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialReserveResponse {
    pub trial: Option<TrialModel>,
}

/// `POST /trial/register` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialRegisterParam {
    pub trial: TrialModel,
}

#[derive(Debug, Clone, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// `GET /study?study_id=…` or `?name=…` query params.
#[derive(Debug, Clone, Deserialize)]
pub struct StudyQuery {
    pub study_id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudyResponse {
    pub status: StudyStatus,
    pub result: Option<StudyStorageModel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurriculumSummaryResponse {
    pub summaries: Vec<Summary>,
}
