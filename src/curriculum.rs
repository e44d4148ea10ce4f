//! The collection of all studies (running, waiting, or freshly registered)
//! and the storages of studies that have finished. Mirrors
//! `curriculum_models/curriculum.py`'s `Curriculum`, trading its
//! `threading.Lock` for `tokio::sync::Mutex` and adding atomic snapshot
//! persistence per spec.md §4.11/§6.

use crate::error::{NotFoundError, SerializationError};
use crate::study::{Study, StudyModel, StudyStatus, StudyStorage, StudyStorageModel};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

pub struct Curriculum {
    inner: tokio::sync::Mutex<Inner>,
}

struct Inner {
    studies: Vec<Arc<Study>>,
    storages: Vec<StudyStorage>,
}

impl Curriculum {
    pub fn new(studies: Vec<Arc<Study>>, storages: Vec<StudyStorage>) -> Self {
        Self { inner: tokio::sync::Mutex::new(Inner { studies, storages }) }
    }

    pub async fn insert_study(&self, study: Arc<Study>) {
        self.inner.lock().await.studies.push(study);
    }

    /// Two-pass: prefer an already-running study over a waiting one, both
    /// filtered to `required_capacity ⊆ capability_set`. The returned
    /// handle is cloned out from under the lock before the caller locks the
    /// study itself, per the lock-order discipline in spec.md §5.
    pub async fn get_available_study(&self, capability_set: &HashSet<String>) -> Option<Arc<Study>> {
        let studies = self.inner.lock().await.studies.clone();
        let fits = |s: &Arc<Study>| s.required_capacity.iter().all(|c| capability_set.contains(c));
        studies
            .iter()
            .find(|s| s.status() == StudyStatus::Running && fits(s))
            .or_else(|| studies.iter().find(|s| s.status() == StudyStatus::Wait && fits(s)))
            .cloned()
    }

    /// Recomputes each study's status; done studies are moved into
    /// `storages` and dropped from `studies`.
    pub async fn migrate_done(&self) {
        let mut inner = self.inner.lock().await;
        let studies = std::mem::take(&mut inner.studies);
        let mut remaining = Vec::with_capacity(studies.len());
        for study in studies {
            if study.update_status().await == StudyStatus::Done {
                match study.to_storage().await {
                    Ok(storage) => inner.storages.push(storage),
                    Err(e) => log::error!("failed to extract storage for study {}: {e}", study.study_id),
                }
            } else {
                remaining.push(study);
            }
        }
        inner.studies = remaining;
    }

    /// Removes and returns the first storage matching `study_id` or `name`.
    /// Callers must enforce exactly one of the two keys (spec.md's Open
    /// Question resolves the xor requirement at the API boundary, not here).
    pub async fn pop_storage(&self, study_id: Option<&str>, name: Option<&str>) -> Option<StudyStorage> {
        let mut inner = self.inner.lock().await;
        let pos = inner.storages.iter().position(|s| match (study_id, name) {
            (Some(id), _) => s.study_id == id,
            (None, Some(n)) => s.name == n,
            (None, None) => false,
        })?;
        Some(inner.storages.remove(pos))
    }

    pub async fn get_study_status(&self, study_id: Option<&str>, name: Option<&str>) -> Option<StudyStatus> {
        let inner = self.inner.lock().await;
        for study in &inner.studies {
            match (study_id, name) {
                (Some(id), _) if study.study_id == id => return Some(study.status()),
                (None, Some(n)) if study.name == n => return Some(study.status()),
                _ => {}
            }
        }
        for storage in &inner.storages {
            match (study_id, name) {
                (Some(id), _) if storage.study_id == id => return Some(StudyStatus::Done),
                (None, Some(n)) if storage.name == n => return Some(StudyStatus::Done),
                _ => {}
            }
        }
        None
    }

    pub async fn to_summaries(&self) -> Vec<Summary> {
        let inner = self.inner.lock().await;
        let mut summaries: Vec<Summary> = Vec::with_capacity(inner.studies.len() + inner.storages.len());
        for study in &inner.studies {
            summaries.push(Summary {
                study_id: study.study_id.clone(),
                name: study.name.clone(),
                status: study.status(),
                registered_timestamp: study.registered_timestamp,
            });
        }
        for storage in &inner.storages {
            summaries.push(Summary {
                study_id: storage.study_id.clone(),
                name: storage.name.clone(),
                status: StudyStatus::Done,
                registered_timestamp: storage.registered_timestamp,
            });
        }
        summaries
    }

    pub async fn register_trial_owner(&self, study_id: &str) -> Result<Arc<Study>, NotFoundError> {
        let inner = self.inner.lock().await;
        inner
            .studies
            .iter()
            .find(|s| s.study_id == study_id)
            .cloned()
            .ok_or_else(|| NotFoundError(format!("study {study_id} not found or already archived")))
    }

    pub async fn to_model(&self) -> Result<CurriculumModel, crate::error::CodecError> {
        let inner = self.inner.lock().await;
        Ok(CurriculumModel {
            studies: {
                let mut out = Vec::with_capacity(inner.studies.len());
                for s in &inner.studies {
                    out.push(s.to_model().await?);
                }
                out
            },
            storages: inner
                .storages
                .iter()
                .map(|s| s.to_model())
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    /// Writes the full snapshot to `path` atomically: serialize, write to a
    /// sibling tmp file, fsync, then rename over the target.
    pub async fn save(&self, path: &Path) -> Result<(), SerializationError> {
        let start = std::time::Instant::now();
        let model = self
            .to_model()
            .await
            .map_err(|e| SerializationError(e.to_string()))?;
        let json = serde_json::to_vec(&model)?;
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = std::fs::File::create(&tmp)?;
            use std::io::Write;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, path)?;
        log::info!("saved curriculum in {:.3}ms", start.elapsed().as_secs_f64() * 1000.0);
        Ok(())
    }

    /// Parses an existing snapshot, or returns an empty curriculum if none
    /// exists yet. A corrupt snapshot is fatal: the caller should abort
    /// startup rather than silently discard state.
    pub fn load_or_create(path: &Path) -> Result<Self, crate::error::TypeError> {
        if !path.exists() {
            return Ok(Curriculum::new(Vec::new(), Vec::new()));
        }
        let bytes = std::fs::read(path).map_err(|e| crate::error::TypeError::new("curriculum_file", e.to_string()))?;
        let model: CurriculumModel = serde_json::from_slice(&bytes)
            .map_err(|e| crate::error::TypeError::new("curriculum_snapshot", e.to_string()))?;
        let studies = model
            .studies
            .into_iter()
            .map(|m| Study::from_model(m).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        let storages = model
            .storages
            .into_iter()
            .map(StudyStorage::from_model)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| crate::error::TypeError::new("study_storage", e.to_string()))?;
        Ok(Curriculum::new(studies, storages))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub study_id: String,
    pub name: String,
    pub status: StudyStatus,
    pub registered_timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurriculumModel {
    pub studies: Vec<StudyModel>,
    pub storages: Vec<StudyStorageModel>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ValueType;
    use crate::space::aligned::AlignedSpace;
    use crate::space::segment::{Axis, IntAxis};
    use crate::strategy::StudyStrategy;
    use crate::suggest::SequentialSuggest;
    use crate::trial::ResultType;
    use crate::trial_table::TrialTable;
    use chrono::Utc;

    fn study(id: &str, capacity: Vec<String>) -> Arc<Study> {
        Arc::new(Study::new(
            id.into(),
            None,
            capacity,
            Utc::now(),
            StudyStrategy::AllCalculation,
            SequentialSuggest::new(true),
            AlignedSpace::new(
                vec![Axis::Int(IntAxis {
                    name: Some("x".into()),
                    start: 0,
                    step: 1,
                    size: Some(4),
                    ambient_index: 0,
                    ambient_size: Some(4),
                })],
                true,
            )
            .unwrap(),
            ResultType::Scalar,
            ValueType::Int,
            TrialTable::new(60),
        ))
    }

    #[tokio::test]
    async fn prefers_running_over_waiting_within_capability_subset() {
        let curriculum = Curriculum::new(Vec::new(), Vec::new());
        let gpu_study = study("gpu-study", vec!["gpu".into()]);
        let cpu_study = study("cpu-study", vec![]);
        cpu_study.suggest_next_trial(4).await.unwrap();
        cpu_study.update_status().await;
        curriculum.insert_study(gpu_study.clone()).await;
        curriculum.insert_study(cpu_study.clone()).await;

        let cpu_only: HashSet<String> = ["cpu".to_string()].into_iter().collect();
        let picked = curriculum.get_available_study(&cpu_only).await.unwrap();
        assert_eq!(picked.study_id, "cpu-study");

        let both: HashSet<String> = ["cpu".to_string(), "gpu".to_string()].into_iter().collect();
        let picked = curriculum.get_available_study(&both).await.unwrap();
        assert_eq!(picked.study_id, "cpu-study");
    }

    #[tokio::test]
    async fn migrate_done_moves_completed_studies_to_storage() {
        let curriculum = Curriculum::new(Vec::new(), Vec::new());
        let s = study("s1", vec![]);
        curriculum.insert_study(s.clone()).await;
        let trial = s.suggest_next_trial(4).await.unwrap().unwrap();
        s.receipt_trial(
            &trial.trial_id,
            Some(
                (0..4)
                    .map(|i| crate::trial::Mapping {
                        params: vec![crate::codec::Primitive::Int(i)],
                        result: crate::trial::ResultValue::Scalar(crate::codec::Primitive::Int(i)),
                    })
                    .collect(),
            ),
        )
        .await
        .unwrap();

        curriculum.migrate_done().await;
        assert_eq!(curriculum.get_study_status(Some("s1"), None).await, Some(StudyStatus::Done));
        let storage = curriculum.pop_storage(Some("s1"), None).await.unwrap();
        assert_eq!(storage.result.len(), 4);
        assert!(curriculum.pop_storage(Some("s1"), None).await.is_none());
    }
}
